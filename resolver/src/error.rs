//! Error taxonomy for license resolution.
//!
//! Errors raised by a provider during enumeration or acquisition are returned to
//! the resolution caller unmodified. The resolver never retries and never swallows
//! a provider error. "No candidate satisfied the filters" is not an error: it is
//! reported as a plain `false` / empty resolution.

use thiserror::Error;

/// Errors surfaced by license resolution.
#[derive(Error, Debug)]
pub enum LicenseError {
    /// Invalid or missing configuration (e.g. empty host for a server source).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The license source could not be reached during enumeration.
    #[error("license source unreachable: {0}")]
    Connectivity(String),

    /// The provider rejected the credentials supplied through the credentials callback.
    #[error("license authentication failed: {0}")]
    Authentication(String),

    /// The trust callback did not mark the presented certificate as trusted.
    #[error("certificate trust rejected: {0}")]
    TrustRejected(String),

    /// A candidate was selected but reserving it failed (e.g. the last seat was taken).
    #[error("failed to acquire license '{short_name}': {reason}")]
    Acquisition {
        /// Short name of the candidate that could not be acquired.
        short_name: String,
        /// Provider-reported reason.
        reason: String,
    },

    /// A decision strategy failed while choosing among candidates.
    #[error("decision strategy failed: {0}")]
    Decision(String),

    /// Any other provider failure, passed through as-is.
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl LicenseError {
    /// Convenience constructor for [`LicenseError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
