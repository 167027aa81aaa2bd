//! Exclusion predicates applied to each license candidate.
//!
//! Predicates run in a fixed order and each one decides independently, with no
//! state shared across candidates, so they can be applied while the candidate
//! stream is still being read from the provider. Every predicate is monotonic:
//! relaxing a threshold (or disabling it with `0` / `None`) never drops a
//! candidate that passed the stricter setting.

use std::fmt;

use crate::core::types::CandidateFacts;

/// Short name of licenses that can only run a license-server component.
pub const RESERVED_SERVER_SHORT_NAME: &str = "server";

/// Thresholds the pipeline filters on. `0` disables a worker bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub min_workers: u32,
    pub max_workers: u32,
    pub target_short_name: Option<String>,
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ReservedServerLicense,
    BelowMinimumWorkers { available: u32, minimum: u32 },
    AboveMaximumWorkers { available: u32, maximum: u32 },
    ShortNameMismatch { actual: String, target: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedServerLicense => write!(
                f,
                "short name '{RESERVED_SERVER_SHORT_NAME}' is reserved for license server components"
            ),
            Self::BelowMinimumWorkers { available, minimum } => write!(
                f,
                "license has {available} workers, filter specifies a minimum of {minimum}"
            ),
            Self::AboveMaximumWorkers { available, maximum } => write!(
                f,
                "license has {available} workers, filter specifies a maximum of {maximum}"
            ),
            Self::ShortNameMismatch { actual, target } => write!(
                f,
                "license short name '{actual}' does not match target '{target}'"
            ),
        }
    }
}

type Predicate = fn(&CandidateFacts<'_>, &FilterCriteria) -> Option<Rejection>;

/// Pipeline order. Do not reorder: rejections report the first failing rule.
const PIPELINE: [Predicate; 4] = [
    reserved_short_name,
    minimum_workers,
    maximum_workers,
    target_short_name,
];

/// Run every predicate in order and return the first rejection, if any.
pub fn evaluate(candidate: &CandidateFacts<'_>, criteria: &FilterCriteria) -> Result<(), Rejection> {
    match PIPELINE
        .iter()
        .find_map(|predicate| predicate(candidate, criteria))
    {
        Some(rejection) => Err(rejection),
        None => Ok(()),
    }
}

/// True if the candidate passes every predicate.
pub fn accepts(candidate: &CandidateFacts<'_>, criteria: &FilterCriteria) -> bool {
    evaluate(candidate, criteria).is_ok()
}

fn reserved_short_name(candidate: &CandidateFacts<'_>, _: &FilterCriteria) -> Option<Rejection> {
    candidate
        .short_name
        .eq_ignore_ascii_case(RESERVED_SERVER_SHORT_NAME)
        .then_some(Rejection::ReservedServerLicense)
}

/// Undeclared worker counts are retained: missing information is not a failure.
fn minimum_workers(candidate: &CandidateFacts<'_>, criteria: &FilterCriteria) -> Option<Rejection> {
    let available = candidate.worker_count?;
    if criteria.min_workers > 0 && available < criteria.min_workers {
        return Some(Rejection::BelowMinimumWorkers {
            available,
            minimum: criteria.min_workers,
        });
    }
    None
}

/// Only shared-pool candidates are bounded from above; a fixed allotment is never
/// dropped here even when it exceeds the maximum.
fn maximum_workers(candidate: &CandidateFacts<'_>, criteria: &FilterCriteria) -> Option<Rejection> {
    let available = candidate.worker_count?;
    if criteria.max_workers > 0 && candidate.can_choose_workers && available > criteria.max_workers
    {
        return Some(Rejection::AboveMaximumWorkers {
            available,
            maximum: criteria.max_workers,
        });
    }
    None
}

fn target_short_name(candidate: &CandidateFacts<'_>, criteria: &FilterCriteria) -> Option<Rejection> {
    let target = criteria.target_short_name.as_deref()?;
    if candidate.short_name.eq_ignore_ascii_case(target) {
        return None;
    }
    Some(Rejection::ShortNameMismatch {
        actual: candidate.short_name.to_string(),
        target: target.to_string(),
    })
}
