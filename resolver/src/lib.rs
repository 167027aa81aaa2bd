//! License resolution and acquisition engine.
//!
//! A [`LicenseResolver`] describes where a license may come from and which
//! offers are acceptable. Resolving it against a [`LicenseProvider`] selects the
//! source, enumerates candidates lazily, filters them, lets a
//! [`DecisionStrategy`](decision::DecisionStrategy) pick at most one, and acquires
//! it with the right worker count. The crate is organised as:
//!
//! - **[`core`]**: Pure, deterministic logic (source mapping, filter predicates,
//!   worker negotiation, summaries). No I/O.
//! - **[`io`]**: Provider boundary, callbacks, the process-wide registry endpoint,
//!   policy files, and the offer-sheet provider.
//!
//! Orchestration modules ([`policy`], [`resolve`], [`chain`], [`decision`]) tie
//! core logic to a provider.

pub mod chain;
pub mod core;
pub mod decision;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod policy;
pub mod resolve;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use chain::ResolverChain;
pub use error::LicenseError;
pub use io::provider::{LicenseCandidate, LicenseProvider};
pub use policy::{LicenseResolver, ResolverBuilder};
pub use resolve::{ResolveLicense, Resolution};
