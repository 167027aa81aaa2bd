//! Shared deterministic types for resolver core logic.
//!
//! These types define stable contracts between core components. They do not
//! depend on a provider connection and must remain deterministic across runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Read-only view of the candidate properties the filter pipeline inspects.
///
/// Built fresh from a live candidate for every predicate evaluation; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateFacts<'a> {
    pub short_name: &'a str,
    /// `None` when the candidate does not declare a worker count.
    pub worker_count: Option<u32>,
    /// `true` for shared-pool candidates whose worker count is negotiable.
    pub can_choose_workers: bool,
}

/// Parameters passed to a candidate's `acquire` call.
///
/// Serializes to the provider's parameter map shape: `{"workerCount": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireParams {
    pub worker_count: u32,
}

/// Phases of a single resolution call.
///
/// ```text
/// Idle -> SourceResolved -> Enumerating -> Filtering -> Deciding -> Acquired | NotFound
///                               |                          |     \
///                               +--------> Failed <--------+------+ (acquire)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    Idle,
    SourceResolved,
    Enumerating,
    Filtering,
    Deciding,
    Acquired,
    NotFound,
    Failed,
}

impl ResolutionPhase {
    /// Terminal phases end the resolution call; there is no retry or rollback.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Acquired | Self::NotFound | Self::Failed)
    }

    /// Whether `next` is a legal transition from this phase.
    ///
    /// `Failed` is only reachable from enumeration, decision, and the acquire step
    /// (which runs while still in `Deciding`).
    pub fn can_advance_to(self, next: ResolutionPhase) -> bool {
        use ResolutionPhase::{
            Acquired, Deciding, Enumerating, Failed, Filtering, Idle, NotFound, SourceResolved,
        };
        matches!(
            (self, next),
            (Idle, SourceResolved)
                | (SourceResolved, Enumerating)
                | (Enumerating, Filtering)
                | (Enumerating, Failed)
                | (Filtering, Deciding)
                | (Deciding, Acquired)
                | (Deciding, NotFound)
                | (Deciding, Failed)
        )
    }
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::SourceResolved => "source_resolved",
            Self::Enumerating => "enumerating",
            Self::Filtering => "filtering",
            Self::Deciding => "deciding",
            Self::Acquired => "acquired",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_params_serialize_as_provider_map() {
        let params = AcquireParams { worker_count: 4 };
        let value = serde_json::to_value(params).expect("serialize");
        assert_eq!(value, serde_json::json!({ "workerCount": 4 }));
    }

    #[test]
    fn failed_is_not_reachable_from_filtering() {
        assert!(!ResolutionPhase::Filtering.can_advance_to(ResolutionPhase::Failed));
        assert!(ResolutionPhase::Enumerating.can_advance_to(ResolutionPhase::Failed));
        assert!(ResolutionPhase::Deciding.can_advance_to(ResolutionPhase::Failed));
    }

    #[test]
    fn terminal_phases_have_no_successor() {
        let all = [
            ResolutionPhase::Idle,
            ResolutionPhase::SourceResolved,
            ResolutionPhase::Enumerating,
            ResolutionPhase::Filtering,
            ResolutionPhase::Deciding,
            ResolutionPhase::Acquired,
            ResolutionPhase::NotFound,
            ResolutionPhase::Failed,
        ];
        for phase in all.iter().filter(|phase| phase.is_terminal()) {
            assert!(all.iter().all(|next| !phase.can_advance_to(*next)));
        }
    }
}
