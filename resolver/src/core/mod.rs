//! Deterministic, pure logic shared by the resolver.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod filter;
pub mod negotiate;
pub mod source;
pub mod summary;
pub mod types;
