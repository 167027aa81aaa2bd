//! Side-effecting boundaries of license resolution.
//!
//! Provider and candidate traits, the process-wide registry endpoint, credential
//! and certificate-trust callbacks, policy files, and the offer-sheet provider.

pub mod callbacks;
pub mod endpoint;
pub mod offers;
pub mod policy_file;
pub mod provider;
