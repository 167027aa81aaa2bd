//! Resolver configuration and its staged builder.
//!
//! A resolver is configured in two stages: pick the source with one of the
//! `LicenseResolver::from_*` constructors, then refine it with chained `with_*`
//! calls and finish with [`ResolverBuilder::build`]. The built [`LicenseResolver`]
//! is immutable; clone it to reuse a configuration across resolutions.
//!
//! ```no_run
//! use resolver::policy::LicenseResolver;
//!
//! // Cloud license with at least 4 workers, credentials from NUIX_USERNAME/NUIX_PASSWORD.
//! let cloud = LicenseResolver::from_cloud()
//!     .with_license_credentials_resolved_from_default_env_vars()
//!     .with_min_worker_count(4)
//!     .with_required_features(["CASE_CREATION"])
//!     .build()?;
//!
//! // Any dongle license.
//! let dongle = LicenseResolver::from_dongle().build()?;
//! # Ok::<(), resolver::error::LicenseError>(())
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::filter::FilterCriteria;
use crate::core::source::{DEFAULT_SERVER_PORT, LicenseSource, resolve_source};
use crate::decision::{Decision, DecisionStrategy, FirstMatch, FnStrategy};
use crate::error::LicenseError;
use crate::io::callbacks::{
    CertificateTrustRequest, CredentialsCallback, CredentialsRequest, TrustCallback,
    default_env_credentials, env_credentials, static_credentials, trust_all, trust_fingerprints,
};
use crate::io::provider::BoxedCandidate;

/// A fully configured license resolver.
#[derive(Clone)]
pub struct LicenseResolver {
    source: LicenseSource,
    required_features: BTreeSet<String>,
    min_workers: u32,
    max_workers: u32,
    target_short_name: Option<String>,
    pub(crate) decision: Arc<dyn DecisionStrategy>,
    pub(crate) credentials: Option<CredentialsCallback>,
    pub(crate) trust: TrustCallback,
}

impl LicenseResolver {
    /// Resolve from a management server on the default port (27443).
    pub fn from_server(host: impl Into<String>) -> ResolverBuilder {
        Self::from_server_with_port(host, DEFAULT_SERVER_PORT)
    }

    /// Resolve from a management server.
    pub fn from_server_with_port(host: impl Into<String>, port: u16) -> ResolverBuilder {
        ResolverBuilder::new(LicenseSource::Server {
            host: host.into(),
            port,
        })
    }

    /// Resolve from the cloud license service.
    pub fn from_cloud() -> ResolverBuilder {
        ResolverBuilder::new(LicenseSource::Cloud)
    }

    /// Resolve from physical dongles attached to this machine.
    pub fn from_dongle() -> ResolverBuilder {
        ResolverBuilder::new(LicenseSource::Dongle)
    }

    /// Resolve from wherever the provider can find a license. No `sources`
    /// option is sent.
    pub fn from_any_source() -> ResolverBuilder {
        ResolverBuilder::new(LicenseSource::Any)
    }

    /// Resolve using a caller-supplied `sources` value, passed through verbatim.
    pub fn from_custom_source(value: impl Into<String>) -> ResolverBuilder {
        ResolverBuilder::new(LicenseSource::Custom {
            value: value.into(),
        })
    }

    pub fn builder(source: LicenseSource) -> ResolverBuilder {
        ResolverBuilder::new(source)
    }

    pub fn source(&self) -> &LicenseSource {
        &self.source
    }

    /// Features a license should have. Informational: the filter pipeline does
    /// not enforce these; decision strategies may (see `HavingFeatures`).
    pub fn required_features(&self) -> &BTreeSet<String> {
        &self.required_features
    }

    pub fn min_worker_count(&self) -> u32 {
        self.min_workers
    }

    pub fn max_worker_count(&self) -> u32 {
        self.max_workers
    }

    pub fn target_short_name(&self) -> Option<&str> {
        self.target_short_name.as_deref()
    }

    pub fn has_credentials_provider(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn filter_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            min_workers: self.min_workers,
            max_workers: self.max_workers,
            target_short_name: self.target_short_name.clone(),
        }
    }
}

impl fmt::Display for LicenseResolver {
    /// Never includes credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features: Vec<&str> = self.required_features.iter().map(String::as_str).collect();
        write!(
            f,
            "LicenseResolver{{source={}, required_features=[{}], min_workers={}, max_workers={}, target_short_name={}, decision={}}}",
            self.source,
            features.join(", "),
            self.min_workers,
            self.max_workers,
            self.target_short_name.as_deref().unwrap_or("none"),
            self.decision.label(),
        )
    }
}

impl fmt::Debug for LicenseResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseResolver")
            .field("source", &self.source)
            .field("required_features", &self.required_features)
            .field("min_workers", &self.min_workers)
            .field("max_workers", &self.max_workers)
            .field("target_short_name", &self.target_short_name)
            .field("decision", &self.decision.label())
            .field("credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

/// Second stage of resolver configuration.
///
/// Defaults: no worker bounds, no target short name, [`FirstMatch`] decision,
/// no credentials callback, and a trust callback that accepts every certificate.
#[must_use]
pub struct ResolverBuilder {
    source: LicenseSource,
    required_features: BTreeSet<String>,
    min_workers: u32,
    max_workers: u32,
    target_short_name: Option<String>,
    decision: Arc<dyn DecisionStrategy>,
    credentials: Option<CredentialsCallback>,
    trust: TrustCallback,
}

impl ResolverBuilder {
    fn new(source: LicenseSource) -> Self {
        Self {
            source,
            required_features: BTreeSet::new(),
            min_workers: 0,
            max_workers: 0,
            target_short_name: None,
            decision: Arc::new(FirstMatch),
            credentials: None,
            trust: trust_all(),
        }
    }

    /// Add features a license must have. Repeated calls accumulate.
    pub fn with_required_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_features
            .extend(features.into_iter().map(Into::into));
        self
    }

    /// Minimum declared worker count. `0` means no minimum.
    pub fn with_min_worker_count(mut self, min_workers: u32) -> Self {
        self.min_workers = min_workers;
        self
    }

    /// Maximum declared worker count for shared-pool licenses. `0` means no
    /// maximum. Fixed-allotment licenses are never excluded by this bound.
    pub fn with_max_worker_count(mut self, max_workers: u32) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Only accept the license with this short name (case-insensitive).
    pub fn with_target_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.target_short_name = Some(short_name.into());
        self
    }

    /// Let `decide` make the final choice among filtered candidates.
    pub fn with_final_decision_made_by<F>(self, decide: F) -> Self
    where
        F: Fn(&mut dyn Iterator<Item = BoxedCandidate>) -> Decision + Send + Sync + 'static,
    {
        self.with_decision_strategy(FnStrategy(decide))
    }

    pub fn with_decision_strategy(mut self, strategy: impl DecisionStrategy + 'static) -> Self {
        self.decision = Arc::new(strategy);
        self
    }

    /// Share an existing strategy (and its state) with other resolvers.
    pub fn with_shared_decision_strategy(mut self, strategy: Arc<dyn DecisionStrategy>) -> Self {
        self.decision = strategy;
        self
    }

    pub fn with_license_credentials_provider<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut CredentialsRequest) + Send + Sync + 'static,
    {
        self.credentials = Some(Arc::new(callback));
        self
    }

    pub fn with_license_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(static_credentials(username, password));
        self
    }

    /// Read username and password from the named environment variables whenever
    /// a source asks.
    pub fn with_license_credentials_resolved_from_env_vars(
        mut self,
        username_var: impl Into<String>,
        password_var: impl Into<String>,
    ) -> Self {
        self.credentials = Some(env_credentials(username_var, password_var));
        self
    }

    /// Same as above with `NUIX_USERNAME` and `NUIX_PASSWORD`.
    pub fn with_license_credentials_resolved_from_default_env_vars(mut self) -> Self {
        self.credentials = Some(default_env_credentials());
        self
    }

    pub fn with_certificate_trust_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut CertificateTrustRequest) + Send + Sync + 'static,
    {
        self.trust = Arc::new(callback);
        self
    }

    /// Trust every certificate (the default).
    pub fn with_trust_all_certificates(mut self) -> Self {
        self.trust = trust_all();
        self
    }

    /// Trust only certificates with one of these fingerprints.
    pub fn with_pinned_certificates<I, S>(mut self, fingerprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.trust = trust_fingerprints(fingerprints);
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<LicenseResolver, LicenseError> {
        resolve_source(&self.source)?;
        Ok(LicenseResolver {
            source: self.source,
            required_features: self.required_features,
            min_workers: self.min_workers,
            max_workers: self.max_workers,
            target_short_name: self.target_short_name,
            decision: self.decision,
            credentials: self.credentials,
            trust: self.trust,
        })
    }
}
