//! Strategies that pick at most one candidate from the filtered stream.
//!
//! A strategy receives the candidates that survived the filter pipeline as a lazy,
//! single-pass iterator. It may stop at the first element or drain the whole
//! stream; it may also block (e.g. to ask an operator). Strategies are shared
//! behind an `Arc`, so one that keeps state across resolutions must use interior
//! mutability.

use std::collections::BTreeSet;

use tracing::info;

use crate::error::LicenseError;
use crate::io::provider::BoxedCandidate;

/// Outcome of a decision: the chosen candidate, if any.
pub type Decision = Result<Option<BoxedCandidate>, LicenseError>;

/// Picks the license to acquire from the filtered candidates.
pub trait DecisionStrategy: Send + Sync {
    fn decide(&self, candidates: &mut dyn Iterator<Item = BoxedCandidate>) -> Decision;

    /// Short label for resolver descriptions.
    fn label(&self) -> &str {
        "custom"
    }
}

/// Default strategy: take the first candidate the provider yields.
///
/// Provider enumeration order is unspecified, so this gives no ordering
/// guarantee. Supply another strategy when the choice must be deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl DecisionStrategy for FirstMatch {
    fn decide(&self, candidates: &mut dyn Iterator<Item = BoxedCandidate>) -> Decision {
        info!("picking first available license candidate");
        Ok(candidates.next())
    }

    fn label(&self) -> &str {
        "first"
    }
}

/// Drain the stream and take the candidate declaring the most workers.
///
/// Undeclared counts rank lowest. Ties keep the earliest candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostWorkers;

impl DecisionStrategy for MostWorkers {
    fn decide(&self, candidates: &mut dyn Iterator<Item = BoxedCandidate>) -> Decision {
        let mut best: Option<BoxedCandidate> = None;
        let mut seen = 0usize;
        for candidate in candidates {
            seen += 1;
            let better = match &best {
                Some(current) => rank(&candidate) > rank(current),
                None => true,
            };
            if better {
                best = Some(candidate);
            }
        }
        info!(
            seen,
            selected = ?best.as_ref().map(|c| c.short_name().to_string()),
            "picked candidate with most workers"
        );
        Ok(best)
    }

    fn label(&self) -> &str {
        "most-workers"
    }
}

fn rank(candidate: &BoxedCandidate) -> Option<u32> {
    candidate.worker_count()
}

/// Take the first candidate enabling every listed feature.
#[derive(Debug, Clone, Default)]
pub struct HavingFeatures {
    features: BTreeSet<String>,
}

impl HavingFeatures {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
        }
    }
}

impl DecisionStrategy for HavingFeatures {
    fn decide(&self, candidates: &mut dyn Iterator<Item = BoxedCandidate>) -> Decision {
        for candidate in candidates {
            let missing: Vec<&str> = self
                .features
                .iter()
                .filter(|feature| !candidate.has_feature(feature))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                return Ok(Some(candidate));
            }
            info!(
                short_name = candidate.short_name(),
                missing = %missing.join(", "),
                "candidate lacks required features"
            );
        }
        Ok(None)
    }

    fn label(&self) -> &str {
        "required-features"
    }
}

/// Adapter turning a closure into a [`DecisionStrategy`].
pub struct FnStrategy<F>(pub F);

impl<F> DecisionStrategy for FnStrategy<F>
where
    F: Fn(&mut dyn Iterator<Item = BoxedCandidate>) -> Decision + Send + Sync,
{
    fn decide(&self, candidates: &mut dyn Iterator<Item = BoxedCandidate>) -> Decision {
        (self.0)(candidates)
    }
}
