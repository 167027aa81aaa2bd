//! Worker-count negotiation for the selected candidate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::AcquireParams;

/// Floor applied to shared-pool requests; a single worker is rarely useful.
pub const MIN_SHARED_POOL_WORKERS: u32 = 2;

/// How the selected candidate will be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AcquirePlan {
    /// Request an explicit number of workers from a shared pool.
    Workers { count: u32 },
    /// Take the candidate's entire fixed allotment (no parameters).
    WholeAllotment,
}

impl AcquirePlan {
    /// Parameters for the acquire call; `None` means "call with no parameters".
    pub fn params(self) -> Option<AcquireParams> {
        match self {
            Self::Workers { count } => Some(AcquireParams {
                worker_count: count,
            }),
            Self::WholeAllotment => None,
        }
    }
}

impl fmt::Display for AcquirePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workers { count } => write!(f, "{count} workers"),
            Self::WholeAllotment => f.write_str("whole allotment"),
        }
    }
}

/// Decide how to acquire a candidate.
///
/// Shared pools get `max(min_workers, 2)`; fixed allotments are taken whole and
/// ignore the configured bounds.
pub fn plan_acquisition(can_choose_workers: bool, min_workers: u32) -> AcquirePlan {
    if can_choose_workers {
        AcquirePlan::Workers {
            count: min_workers.max(MIN_SHARED_POOL_WORKERS),
        }
    } else {
        AcquirePlan::WholeAllotment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_pool_floor_is_two() {
        for min in [0, 1, 2] {
            assert_eq!(
                plan_acquisition(true, min),
                AcquirePlan::Workers { count: 2 }
            );
        }
    }

    #[test]
    fn shared_pool_uses_minimum_above_floor() {
        assert_eq!(
            plan_acquisition(true, 5),
            AcquirePlan::Workers { count: 5 }
        );
    }

    #[test]
    fn fixed_allotment_has_no_params() {
        let plan = plan_acquisition(false, 7);
        assert_eq!(plan, AcquirePlan::WholeAllotment);
        assert_eq!(plan.params(), None);
    }

    #[test]
    fn worker_plan_maps_to_params() {
        assert_eq!(
            AcquirePlan::Workers { count: 3 }.params(),
            Some(AcquireParams { worker_count: 3 })
        );
    }
}
