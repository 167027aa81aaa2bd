//! Credential and certificate-trust callbacks handed to providers.
//!
//! Providers invoke these zero or more times during enumeration or acquisition,
//! possibly from a thread they own, so every callback is `Send + Sync`. A callback
//! answers by mutating the request it is given; it never returns a verdict.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

/// Default environment variable holding the license username.
pub const DEFAULT_USERNAME_ENV_VAR: &str = "NUIX_USERNAME";
/// Default environment variable holding the license password.
pub const DEFAULT_PASSWORD_ENV_VAR: &str = "NUIX_PASSWORD";

/// A source asking for credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsRequest {
    /// Where the request comes from (e.g. `cloud-server`, `nms.internal:27443`).
    pub location: String,
    username: Option<String>,
    password: Option<String>,
}

impl CredentialsRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// A source presenting a certificate. Untrusted until a callback says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateTrustRequest {
    pub subject: String,
    /// Hex SHA-256 fingerprint as reported by the provider.
    pub fingerprint: String,
    trusted: bool,
}

impl CertificateTrustRequest {
    pub fn new(subject: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            fingerprint: fingerprint.into(),
            trusted: false,
        }
    }

    pub fn set_trusted(&mut self, trusted: bool) {
        self.trusted = trusted;
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }
}

pub type CredentialsCallback = Arc<dyn Fn(&mut CredentialsRequest) + Send + Sync>;
pub type TrustCallback = Arc<dyn Fn(&mut CertificateTrustRequest) + Send + Sync>;

/// Answer every credentials request with fixed values.
pub fn static_credentials(
    username: impl Into<String>,
    password: impl Into<String>,
) -> CredentialsCallback {
    let username = username.into();
    let password = password.into();
    Arc::new(move |request: &mut CredentialsRequest| {
        request.set_username(Some(username.clone()));
        request.set_password(Some(password.clone()));
    })
}

/// Read credentials from environment variables each time a source asks.
///
/// Unset variables leave the corresponding field empty; the provider decides
/// whether that is an authentication failure.
pub fn env_credentials(
    username_var: impl Into<String>,
    password_var: impl Into<String>,
) -> CredentialsCallback {
    let username_var = username_var.into();
    let password_var = password_var.into();
    Arc::new(move |request: &mut CredentialsRequest| {
        let username = std::env::var(&username_var).ok();
        let password = std::env::var(&password_var).ok();
        if username.is_none() || password.is_none() {
            warn!(
                username_var = %username_var,
                password_var = %password_var,
                "license credential environment variables not fully set"
            );
        }
        request.set_username(username);
        request.set_password(password);
    })
}

/// [`env_credentials`] using `NUIX_USERNAME` / `NUIX_PASSWORD`.
pub fn default_env_credentials() -> CredentialsCallback {
    env_credentials(DEFAULT_USERNAME_ENV_VAR, DEFAULT_PASSWORD_ENV_VAR)
}

/// Trust every certificate. This is the resolver's default trust policy.
pub fn trust_all() -> TrustCallback {
    Arc::new(|request: &mut CertificateTrustRequest| {
        info!(subject = %request.subject, "blindly trusting certificate");
        request.set_trusted(true);
    })
}

/// Trust only certificates whose fingerprint is in `fingerprints` (case-insensitive).
pub fn trust_fingerprints<I, S>(fingerprints: I) -> TrustCallback
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let pinned: BTreeSet<String> = fingerprints
        .into_iter()
        .map(|f| normalize_fingerprint(f.as_ref()))
        .collect();
    Arc::new(move |request: &mut CertificateTrustRequest| {
        let trusted = pinned.contains(&normalize_fingerprint(&request.fingerprint));
        if !trusted {
            warn!(subject = %request.subject, fingerprint = %request.fingerprint, "certificate not pinned");
        }
        request.set_trusted(trusted);
    })
}

fn normalize_fingerprint(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_credentials_fill_request() {
        let callback = static_credentials("alice", "s3cret");
        let mut request = CredentialsRequest::new("cloud-server");
        callback(&mut request);
        assert_eq!(request.username(), Some("alice"));
        assert_eq!(request.password(), Some("s3cret"));
    }

    #[test]
    fn env_credentials_read_at_call_time() {
        let callback = env_credentials("PATH", "RESOLVER_TEST_DEFINITELY_UNSET_VAR");
        let mut request = CredentialsRequest::new("server");
        callback(&mut request);
        assert_eq!(request.username(), std::env::var("PATH").ok().as_deref());
        assert_eq!(request.password(), None);
    }

    #[test]
    fn trust_request_starts_untrusted() {
        let request = CertificateTrustRequest::new("CN=licence-api", "ab:cd");
        assert!(!request.is_trusted());
    }

    #[test]
    fn trust_all_marks_trusted() {
        let mut request = CertificateTrustRequest::new("CN=licence-api", "ab:cd");
        trust_all()(&mut request);
        assert!(request.is_trusted());
    }

    #[test]
    fn pinned_fingerprints_ignore_case_and_colons() {
        let callback = trust_fingerprints(["AB:CD:EF"]);
        let mut pinned = CertificateTrustRequest::new("CN=nms", "abcdef");
        callback(&mut pinned);
        assert!(pinned.is_trusted());

        let mut other = CertificateTrustRequest::new("CN=evil", "00:11:22");
        callback(&mut other);
        assert!(!other.is_trusted());
    }
}
