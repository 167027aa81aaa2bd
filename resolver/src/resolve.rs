//! A single license resolution: source → enumerate → filter → decide → acquire.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::core::filter::{FilterCriteria, Rejection, evaluate};
use crate::core::negotiate::{AcquirePlan, plan_acquisition};
use crate::core::source::resolve_source;
use crate::core::summary::{LicenseDetails, feature_matrix, summarize};
use crate::core::types::ResolutionPhase;
use crate::error::LicenseError;
use crate::io::endpoint::set_registry_servers;
use crate::io::provider::{CandidateCursor, LicenseCandidate, LicenseProvider};
use crate::policy::LicenseResolver;

/// Anything that can try to obtain a license from a provider.
pub trait ResolveLicense: fmt::Display {
    /// `Ok(true)` when a license was acquired, `Ok(false)` when nothing matched.
    fn resolve_license(&self, provider: &mut dyn LicenseProvider) -> Result<bool, LicenseError>;
}

/// A candidate dropped by the filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub short_name: String,
    pub rejection: Rejection,
}

/// The license a resolution ended up holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredLicense {
    pub short_name: String,
    pub plan: AcquirePlan,
    pub summary: String,
    pub details: LicenseDetails,
}

/// Report of a finished resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `Acquired` or `NotFound`. Failures are returned as errors instead.
    pub phase: ResolutionPhase,
    /// Candidates pulled from the provider stream.
    pub inspected: usize,
    pub rejected: Vec<RejectedCandidate>,
    pub acquired: Option<AcquiredLicense>,
}

impl Resolution {
    pub fn is_acquired(&self) -> bool {
        self.acquired.is_some()
    }
}

struct PhaseTracker {
    current: ResolutionPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: ResolutionPhase::Idle,
        }
    }

    fn advance(&mut self, next: ResolutionPhase) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal phase transition {} -> {}",
            self.current,
            next
        );
        debug!(from = %self.current, to = %next, "resolution phase");
        self.current = next;
    }

    fn fail(&mut self, err: LicenseError) -> LicenseError {
        self.advance(ResolutionPhase::Failed);
        warn!(error = %err, "license resolution failed");
        err
    }
}

impl LicenseResolver {
    /// Run one resolution against `provider`.
    ///
    /// Sets the process-wide registry endpoint for cloud and server sources,
    /// registers the callbacks, then pulls candidates lazily through the filter
    /// pipeline into the decision strategy. At most one candidate is acquired.
    /// Provider errors are returned unmodified.
    #[instrument(skip_all, fields(source = %self.source()))]
    pub fn resolve(&self, provider: &mut dyn LicenseProvider) -> Result<Resolution, LicenseError> {
        let mut phase = PhaseTracker::new();

        let source = resolve_source(self.source()).inspect_err(|err| {
            warn!(error = %err, "license source rejected");
        })?;
        if let Some(endpoint) = &source.endpoint {
            set_registry_servers(endpoint);
        }
        phase.advance(ResolutionPhase::SourceResolved);

        if let Some(credentials) = &self.credentials {
            provider.when_asked_for_credentials(Arc::clone(credentials));
        }
        provider.when_asked_for_certificate_trust(Arc::clone(&self.trust));

        phase.advance(ResolutionPhase::Enumerating);
        let stream = provider
            .find_available_licences(&source.options)
            .map_err(|err| phase.fail(err))?;
        let mut cursor = CandidateCursor::new(stream);

        phase.advance(ResolutionPhase::Filtering);
        let criteria = self.filter_criteria();
        let mut rejected = Vec::new();
        let decision = {
            let mut filtered = cursor
                .by_ref()
                .filter(|candidate| admit(&**candidate, &criteria, &mut rejected));
            phase.advance(ResolutionPhase::Deciding);
            self.decision.decide(&mut filtered)
        };
        let inspected = cursor.yielded();

        if let Some(err) = cursor.take_failure() {
            return Err(phase.fail(err));
        }
        let selected = decision.map_err(|err| phase.fail(err))?;
        drop(cursor);

        let Some(candidate) = selected else {
            phase.advance(ResolutionPhase::NotFound);
            info!(inspected, rejected = rejected.len(), "no license candidate matched");
            return Ok(Resolution {
                phase: phase.current,
                inspected,
                rejected,
                acquired: None,
            });
        };

        let plan = plan_acquisition(candidate.can_choose_workers(), self.min_worker_count());
        let details = candidate.details();
        let summary = summarize(&details);
        info!(%summary, %plan, "acquiring license");
        debug!("{}", feature_matrix(&details));
        candidate
            .acquire(plan.params())
            .map_err(|err| phase.fail(err))?;
        phase.advance(ResolutionPhase::Acquired);
        info!(short_name = candidate.short_name(), "license acquired");

        Ok(Resolution {
            phase: phase.current,
            inspected,
            rejected,
            acquired: Some(AcquiredLicense {
                short_name: candidate.short_name().to_string(),
                plan,
                summary,
                details,
            }),
        })
    }
}

impl ResolveLicense for LicenseResolver {
    fn resolve_license(&self, provider: &mut dyn LicenseProvider) -> Result<bool, LicenseError> {
        self.resolve(provider).map(|resolution| resolution.is_acquired())
    }
}

fn admit(
    candidate: &dyn LicenseCandidate,
    criteria: &FilterCriteria,
    rejected: &mut Vec<RejectedCandidate>,
) -> bool {
    info!(summary = %summarize(&candidate.details()), "inspecting license candidate");
    match evaluate(&candidate.facts(), criteria) {
        Ok(()) => true,
        Err(rejection) => {
            info!(
                short_name = candidate.short_name(),
                reason = %rejection,
                "skipping license candidate"
            );
            rejected.push(RejectedCandidate {
                short_name: candidate.short_name().to_string(),
                rejection,
            });
            false
        }
    }
}
