//! Offer-sheet provider: a [`LicenseProvider`] backed by a JSON file.
//!
//! The sheet lists license offers per source plus optional per-source connection
//! settings (offline flag, expected credentials, presented certificate). The
//! provider performs a simulated handshake the first time a stream reaches each
//! source, invoking the registered callbacks exactly the way a live provider
//! would, and tracks seats consumed by acquisitions. Used for dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::source::LicenseOptions;
use crate::core::summary::LicenseDetails;
use crate::core::types::AcquireParams;
use crate::error::LicenseError;
use crate::io::callbacks::{
    CertificateTrustRequest, CredentialsCallback, CredentialsRequest, TrustCallback,
};
use crate::io::endpoint::registry_servers;
use crate::io::provider::{CandidateItem, CandidateStream, LicenseCandidate, LicenseProvider};

const OFFER_SHEET_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/offer_sheet/v1.schema.json"
));

/// Offer sheet document (`schemas/offer_sheet/v1.schema.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSheet {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourceSettings>,
    pub offers: Vec<Offer>,
}

/// Connection behaviour of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ExpectedCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PresentedCertificate>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            online: true,
            credentials: None,
            certificate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedCertificate {
    pub subject: String,
    pub fingerprint: String,
}

/// One license offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub source: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub workers: Option<u32>,
    #[serde(default)]
    pub can_choose_workers: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Seats left to acquire; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// A successful acquisition made through the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionRecord {
    pub source: String,
    pub short_name: String,
    pub params: Option<AcquireParams>,
}

/// Load and validate an offer sheet from disk.
pub fn load_offer_sheet(path: &Path) -> Result<OfferSheet> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read offer sheet {}", path.display()))?;
    parse_offer_sheet(&contents).with_context(|| format!("load offer sheet {}", path.display()))
}

/// Parse and schema-validate offer sheet JSON.
pub fn parse_offer_sheet(contents: &str) -> Result<OfferSheet> {
    let value: Value = serde_json::from_str(contents).context("parse offer sheet json")?;
    validate_schema(&value)?;
    serde_json::from_value(value).context("deserialize offer sheet")
}

/// Write an offer sheet as pretty JSON with a trailing newline.
pub fn write_offer_sheet(path: &Path, sheet: &OfferSheet) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(sheet).context("serialize offer sheet")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write offer sheet {}", path.display()))
}

fn validate_schema(sheet: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(OFFER_SHEET_SCHEMA).context("parse offer sheet schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(sheet) {
        let messages = compiled
            .iter_errors(sheet)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "offer sheet schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct SheetState {
    seats_used: BTreeMap<usize, u32>,
    acquisitions: Vec<AcquisitionRecord>,
}

/// Provider serving the offers of an [`OfferSheet`].
pub struct OfferSheetProvider {
    sheet: Arc<OfferSheet>,
    state: Arc<Mutex<SheetState>>,
    credentials: Option<CredentialsCallback>,
    trust: Option<TrustCallback>,
}

impl OfferSheetProvider {
    pub fn new(sheet: OfferSheet) -> Self {
        Self {
            sheet: Arc::new(sheet),
            state: Arc::new(Mutex::new(SheetState::default())),
            credentials: None,
            trust: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(load_offer_sheet(path)?))
    }

    /// Acquisitions made so far, in order.
    pub fn acquisitions(&self) -> Vec<AcquisitionRecord> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .acquisitions
            .clone()
    }

    /// Simulated handshake with `source`. Returns the location reported by offers.
    fn connect(&self, source: &str) -> Result<String, LicenseError> {
        let settings = self.sheet.sources.get(source).cloned().unwrap_or_default();
        if !settings.online {
            return Err(LicenseError::Connectivity(format!(
                "source '{source}' is offline"
            )));
        }

        let location = if uses_registry(source) {
            registry_servers().ok_or_else(|| {
                LicenseError::Connectivity(format!(
                    "no registry endpoint configured for source '{source}'"
                ))
            })?
        } else {
            "local".to_string()
        };

        if let Some(certificate) = &settings.certificate {
            let mut request =
                CertificateTrustRequest::new(&certificate.subject, &certificate.fingerprint);
            if let Some(callback) = &self.trust {
                callback(&mut request);
            }
            if !request.is_trusted() {
                return Err(LicenseError::TrustRejected(format!(
                    "{} ({})",
                    certificate.subject, certificate.fingerprint
                )));
            }
        }

        if let Some(expected) = &settings.credentials {
            let callback = self.credentials.as_ref().ok_or_else(|| {
                LicenseError::Authentication(format!(
                    "source '{source}' requires credentials but no credentials callback is registered"
                ))
            })?;
            let mut request = CredentialsRequest::new(location.clone());
            callback(&mut request);
            let accepted = request.username() == Some(expected.username.as_str())
                && request.password() == Some(expected.password.as_str());
            if !accepted {
                return Err(LicenseError::Authentication(format!(
                    "credentials rejected by source '{source}'"
                )));
            }
        }

        debug!(source, location = %location, "connected to license source");
        Ok(location)
    }
}

fn uses_registry(source: &str) -> bool {
    matches!(source, "server" | "cloud-server")
}

/// `None` means every source in the sheet.
fn requested_sources(options: &LicenseOptions) -> Option<BTreeSet<String>> {
    options.sources.as_ref().map(|sources| {
        sources
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

impl LicenseProvider for OfferSheetProvider {
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
        info!(sources = ?options.sources, offers = self.sheet.offers.len(), "enumerating offer sheet");
        Ok(Box::new(OfferStream {
            provider: &*self,
            requested: requested_sources(options),
            next_index: 0,
            connected: BTreeMap::new(),
            halted: false,
        }))
    }
}

struct OfferStream<'a> {
    provider: &'a OfferSheetProvider,
    requested: Option<BTreeSet<String>>,
    next_index: usize,
    /// Source name -> location, for sources whose handshake succeeded.
    connected: BTreeMap<String, String>,
    halted: bool,
}

impl Iterator for OfferStream<'_> {
    type Item = CandidateItem;

    fn next(&mut self) -> Option<Self::Item> {
        let provider = self.provider;
        loop {
            if self.halted {
                return None;
            }
            let index = self.next_index;
            let offer = provider.sheet.offers.get(index)?;
            self.next_index += 1;

            match &self.requested {
                Some(requested) if !requested.contains(&offer.source) => continue,
                // Unconstrained enumeration only covers sources that can be located.
                None if uses_registry(&offer.source)
                    && !self.connected.contains_key(&offer.source)
                    && registry_servers().is_none() =>
                {
                    debug!(
                        source = %offer.source,
                        short_name = %offer.short_name,
                        "skipping offer: no registry endpoint configured"
                    );
                    continue;
                }
                _ => {}
            }

            let location = match self.connected.get(&offer.source) {
                Some(location) => location.clone(),
                None => match provider.connect(&offer.source) {
                    Ok(location) => {
                        self.connected
                            .insert(offer.source.clone(), location.clone());
                        location
                    }
                    Err(err) => {
                        self.halted = true;
                        return Some(Err(err));
                    }
                },
            };

            return Some(Ok(Box::new(SheetCandidate {
                index,
                offer: offer.clone(),
                location,
                state: Arc::clone(&provider.state),
            })));
        }
    }
}

struct SheetCandidate {
    index: usize,
    offer: Offer,
    location: String,
    state: Arc<Mutex<SheetState>>,
}

impl LicenseCandidate for SheetCandidate {
    fn short_name(&self) -> &str {
        &self.offer.short_name
    }

    fn worker_count(&self) -> Option<u32> {
        self.offer.workers
    }

    fn can_choose_workers(&self) -> bool {
        self.offer.can_choose_workers
    }

    fn enabled_features(&self) -> Vec<String> {
        self.offer.features.clone()
    }

    fn details(&self) -> LicenseDetails {
        LicenseDetails {
            location: Some(self.location.clone()),
            source_type: Some(self.offer.source.clone()),
            short_name: self.offer.short_name.clone(),
            description: self.offer.description.clone(),
            count: self.offer.count,
            workers: self.offer.workers,
            features: self.offer.features.clone(),
        }
    }

    fn acquire(&self, params: Option<AcquireParams>) -> Result<(), LicenseError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let used = state.seats_used.get(&self.index).copied().unwrap_or(0);
        if let Some(seats) = self.offer.seats
            && used >= seats
        {
            return Err(self.acquisition_error("no seats left".to_string()));
        }
        if let (Some(requested), Some(pool)) = (params, self.offer.workers)
            && requested.worker_count > pool
        {
            return Err(self.acquisition_error(format!(
                "requested {} workers but the pool has {}",
                requested.worker_count, pool
            )));
        }
        state.seats_used.insert(self.index, used + 1);
        state.acquisitions.push(AcquisitionRecord {
            source: self.offer.source.clone(),
            short_name: self.offer.short_name.clone(),
            params,
        });
        info!(short_name = %self.offer.short_name, ?params, "offer acquired");
        Ok(())
    }
}

impl SheetCandidate {
    fn acquisition_error(&self, reason: String) -> LicenseError {
        LicenseError::Acquisition {
            short_name: self.offer.short_name.clone(),
            reason,
        }
    }
}
