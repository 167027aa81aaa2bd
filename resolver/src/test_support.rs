//! Test-only providers and candidates with scripted behaviour.
//!
//! [`ScriptedProvider`] replays a fixed list of candidates (and optional
//! mid-stream disconnects) on every enumeration, and every candidate it hands out
//! records `acquire` calls into a log shared with the provider.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::source::LicenseOptions;
use crate::core::types::AcquireParams;
use crate::error::LicenseError;
use crate::io::callbacks::{CredentialsCallback, TrustCallback};
use crate::io::offers::{OfferSheet, write_offer_sheet};
use crate::io::provider::{
    BoxedCandidate, CandidateItem, CandidateStream, LicenseCandidate, LicenseProvider,
};

/// One recorded `acquire` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireCall {
    pub short_name: String,
    pub params: Option<AcquireParams>,
}

pub type AcquireLog = Arc<Mutex<Vec<AcquireCall>>>;

/// Candidate with fixed properties that records every acquire attempt.
#[derive(Debug, Clone)]
pub struct ScriptedCandidate {
    pub short_name: String,
    pub worker_count: Option<u32>,
    pub can_choose_workers: bool,
    pub features: Vec<String>,
    /// When set, `acquire` records the call and then fails with this reason.
    pub acquire_failure: Option<String>,
    log: AcquireLog,
}

impl ScriptedCandidate {
    pub fn new(short_name: &str, worker_count: Option<u32>, can_choose_workers: bool) -> Self {
        Self {
            short_name: short_name.to_string(),
            worker_count,
            can_choose_workers,
            features: Vec::new(),
            acquire_failure: None,
            log: AcquireLog::default(),
        }
    }

    /// Fixed-allotment candidate.
    pub fn fixed(short_name: &str, workers: u32) -> Self {
        Self::new(short_name, Some(workers), false)
    }

    /// Shared-pool candidate.
    pub fn shared(short_name: &str, workers: u32) -> Self {
        Self::new(short_name, Some(workers), true)
    }

    /// Candidate without a declared worker count.
    pub fn undeclared(short_name: &str) -> Self {
        Self::new(short_name, None, false)
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn failing_acquire(mut self, reason: &str) -> Self {
        self.acquire_failure = Some(reason.to_string());
        self
    }

    /// Calls recorded by this candidate (and any clones sharing its log).
    pub fn acquire_calls(&self) -> Vec<AcquireCall> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LicenseCandidate for ScriptedCandidate {
    fn short_name(&self) -> &str {
        &self.short_name
    }

    fn worker_count(&self) -> Option<u32> {
        self.worker_count
    }

    fn can_choose_workers(&self) -> bool {
        self.can_choose_workers
    }

    fn enabled_features(&self) -> Vec<String> {
        self.features.clone()
    }

    fn acquire(&self, params: Option<AcquireParams>) -> Result<(), LicenseError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AcquireCall {
                short_name: self.short_name.clone(),
                params,
            });
        match &self.acquire_failure {
            Some(reason) => Err(LicenseError::Acquisition {
                short_name: self.short_name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// One scripted element of a provider stream.
#[derive(Debug, Clone)]
pub enum ScriptedItem {
    Candidate(ScriptedCandidate),
    /// Connectivity failure raised at this point of the stream.
    Disconnect(String),
}

/// Provider replaying a scripted candidate list.
#[derive(Default)]
pub struct ScriptedProvider {
    items: Vec<ScriptedItem>,
    unreachable: Option<String>,
    log: AcquireLog,
    pub credentials: Option<CredentialsCallback>,
    pub trust: Option<TrustCallback>,
    /// Options received by each enumeration, in order.
    pub enumerations: Vec<LicenseOptions>,
    /// Callbacks registered when each enumeration started.
    pub callbacks_at_enumeration: Vec<RegisteredCallbacks>,
    pulled: Arc<Mutex<usize>>,
}

/// Which callbacks a provider held at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredCallbacks {
    pub credentials: bool,
    pub trust: bool,
}

impl ScriptedProvider {
    pub fn new(candidates: Vec<ScriptedCandidate>) -> Self {
        Self::with_items(candidates.into_iter().map(ScriptedItem::Candidate).collect())
    }

    pub fn with_items(items: Vec<ScriptedItem>) -> Self {
        let log = AcquireLog::default();
        let items = items
            .into_iter()
            .map(|item| match item {
                ScriptedItem::Candidate(mut candidate) => {
                    candidate.log = Arc::clone(&log);
                    ScriptedItem::Candidate(candidate)
                }
                other => other,
            })
            .collect();
        Self {
            items,
            log,
            ..Self::default()
        }
    }

    /// Provider whose enumeration fails up front.
    pub fn unreachable(reason: &str) -> Self {
        Self {
            unreachable: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Every acquire call made on candidates from this provider.
    pub fn acquire_calls(&self) -> Vec<AcquireCall> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of candidates pulled from streams so far.
    pub fn pulled(&self) -> usize {
        *self.pulled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LicenseProvider for ScriptedProvider {
    fn when_asked_for_credentials(&mut self, callback: CredentialsCallback) {
        self.credentials = Some(callback);
    }

    fn when_asked_for_certificate_trust(&mut self, callback: TrustCallback) {
        self.trust = Some(callback);
    }

    fn find_available_licences(
        &mut self,
        options: &LicenseOptions,
    ) -> Result<CandidateStream<'_>, LicenseError> {
        self.callbacks_at_enumeration.push(RegisteredCallbacks {
            credentials: self.credentials.is_some(),
            trust: self.trust.is_some(),
        });
        self.enumerations.push(options.clone());
        if let Some(reason) = &self.unreachable {
            return Err(LicenseError::Connectivity(reason.clone()));
        }
        let pulled = Arc::clone(&self.pulled);
        let stream = self.items.clone().into_iter().map(move |item| -> CandidateItem {
            *pulled.lock().unwrap_or_else(PoisonError::into_inner) += 1;
            match item {
                ScriptedItem::Candidate(candidate) => Ok(Box::new(candidate) as BoxedCandidate),
                ScriptedItem::Disconnect(reason) => Err(LicenseError::Connectivity(reason)),
            }
        });
        Ok(Box::new(stream))
    }
}

/// Temporary directory holding a policy file and an offer sheet for CLI tests.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_policy(&self, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join("policy.toml");
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_offers(&self, sheet: &OfferSheet) -> Result<PathBuf> {
        let path = self.dir.path().join("offers.json");
        write_offer_sheet(&path, sheet)?;
        Ok(path)
    }
}
