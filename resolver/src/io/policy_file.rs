//! Declarative resolver policy stored as TOML.
//!
//! ```toml
//! decision = "most-workers"
//!
//! [source]
//! kind = "server"
//! host = "nms.internal"
//! port = 27443
//!
//! [filters]
//! min_workers = 4
//! max_workers = 16
//! short_name = "enterprise-workstation"
//! required_features = ["CASE_CREATION"]
//!
//! [credentials]
//! mode = "env"
//! username_var = "NUIX_USERNAME"
//! password_var = "NUIX_PASSWORD"
//!
//! [trust]
//! mode = "fingerprints"
//! fingerprints = ["AB:CD:EF"]
//! ```
//!
//! Every section is optional; a missing section means "no constraint" (any
//! source, no filters, no credentials, trust all certificates, first match).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::core::source::{LicenseSource, resolve_source};
use crate::decision::{HavingFeatures, MostWorkers};
use crate::io::callbacks::{DEFAULT_PASSWORD_ENV_VAR, DEFAULT_USERNAME_ENV_VAR};
use crate::policy::LicenseResolver;

/// Resolver policy (TOML).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyFile {
    pub decision: DecisionKind,
    pub source: LicenseSource,
    pub filters: FilterSection,
    pub credentials: CredentialsSection,
    pub trust: TrustSection,
}

impl Default for PolicyFile {
    fn default() -> Self {
        Self {
            decision: DecisionKind::default(),
            source: LicenseSource::Any,
            filters: FilterSection::default(),
            credentials: CredentialsSection::default(),
            trust: TrustSection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSection {
    pub min_workers: u32,
    pub max_workers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    pub required_features: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CredentialsSection {
    #[default]
    None,
    Static {
        username: String,
        password: String,
    },
    Env {
        #[serde(default = "default_username_var")]
        username_var: String,
        #[serde(default = "default_password_var")]
        password_var: String,
    },
}

fn default_username_var() -> String {
    DEFAULT_USERNAME_ENV_VAR.to_string()
}

fn default_password_var() -> String {
    DEFAULT_PASSWORD_ENV_VAR.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TrustSection {
    #[default]
    All,
    Fingerprints { fingerprints: Vec<String> },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionKind {
    #[default]
    First,
    MostWorkers,
    RequiredFeatures,
}

impl PolicyFile {
    pub fn validate(&self) -> Result<()> {
        resolve_source(&self.source).map_err(|err| anyhow!("source: {err}"))?;
        match &self.credentials {
            CredentialsSection::None => {}
            CredentialsSection::Static { username, .. } => {
                if username.trim().is_empty() {
                    bail!("credentials.username must be non-empty");
                }
            }
            CredentialsSection::Env {
                username_var,
                password_var,
            } => {
                if username_var.trim().is_empty() || password_var.trim().is_empty() {
                    bail!("credentials.username_var and credentials.password_var must be non-empty");
                }
            }
        }
        if let TrustSection::Fingerprints { fingerprints } = &self.trust
            && fingerprints.iter().all(|fp| fp.trim().is_empty())
        {
            bail!("trust.fingerprints must list at least one fingerprint");
        }
        if self.decision == DecisionKind::RequiredFeatures && self.filters.required_features.is_empty()
        {
            bail!("decision \"required-features\" needs filters.required_features");
        }
        Ok(())
    }

    /// Build the resolver this policy describes.
    pub fn to_resolver(&self) -> Result<LicenseResolver> {
        self.validate()?;
        let mut builder = LicenseResolver::builder(self.source.clone())
            .with_min_worker_count(self.filters.min_workers)
            .with_max_worker_count(self.filters.max_workers)
            .with_required_features(self.filters.required_features.iter().cloned());
        if let Some(short_name) = &self.filters.short_name {
            builder = builder.with_target_short_name(short_name.clone());
        }
        builder = match &self.credentials {
            CredentialsSection::None => builder,
            CredentialsSection::Static { username, password } => {
                builder.with_license_credentials(username.clone(), password.clone())
            }
            CredentialsSection::Env {
                username_var,
                password_var,
            } => builder.with_license_credentials_resolved_from_env_vars(
                username_var.clone(),
                password_var.clone(),
            ),
        };
        builder = match &self.trust {
            TrustSection::All => builder.with_trust_all_certificates(),
            TrustSection::Fingerprints { fingerprints } => {
                builder.with_pinned_certificates(fingerprints)
            }
        };
        builder = match self.decision {
            DecisionKind::First => builder,
            DecisionKind::MostWorkers => builder.with_decision_strategy(MostWorkers),
            DecisionKind::RequiredFeatures => builder.with_decision_strategy(HavingFeatures::new(
                self.filters.required_features.iter().cloned(),
            )),
        };
        builder.build().context("build resolver from policy")
    }
}

pub fn parse_policy(contents: &str) -> Result<PolicyFile> {
    let policy: PolicyFile = toml::from_str(contents).context("parse policy toml")?;
    policy.validate()?;
    Ok(policy)
}

/// Load and validate a policy file.
pub fn load_policy(path: &Path) -> Result<PolicyFile> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_policy(&contents).with_context(|| format!("load policy {}", path.display()))
}

/// Atomically write a policy to disk (temp file + rename).
pub fn write_policy(path: &Path, policy: &PolicyFile) -> Result<()> {
    policy.validate()?;
    let mut buf = toml::to_string_pretty(policy).context("serialize policy toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("policy path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp policy {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace policy {}", path.display()))?;
    Ok(())
}
