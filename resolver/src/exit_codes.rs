//! Stable exit codes for resolver CLI commands.

/// Command succeeded; for `resolve`, a license was acquired.
pub const OK: i32 = 0;
/// Invalid policy or offer sheet, or a propagated resolution error.
pub const INVALID: i32 = 1;
/// `resolver resolve` found no candidate satisfying the policy.
pub const NOT_FOUND: i32 = 2;
