//! Solution representation returned by dispatch solvers.

use mcg_core::CapacityMap;
use serde::{Deserialize, Serialize};

use crate::PROTOCOL_VERSION;

/// Status of the solver solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Timeout,
    IterationLimit,
    NumericalError,
    Error,
    Unknown,
}

impl SolutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success() && !matches!(self, SolutionStatus::Unknown)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Timeout => write!(f, "timeout"),
            SolutionStatus::IterationLimit => write!(f, "iteration_limit"),
            SolutionStatus::NumericalError => write!(f, "numerical_error"),
            SolutionStatus::Error => write!(f, "error"),
            SolutionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of one dispatch solve.
///
/// `optimized` holds the solver's capacity for every extendable component it
/// reports on; it may be partial or empty when the solve failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSolution {
    #[serde(default = "default_protocol")]
    pub protocol_version: i32,
    pub status: SolutionStatus,
    /// Total system cost; `None` when no feasible point was found.
    #[serde(default)]
    pub objective: Option<f64>,
    #[serde(default)]
    pub optimized: CapacityMap,
    #[serde(default)]
    pub solve_time_ms: i64,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_protocol() -> i32 {
    PROTOCOL_VERSION
}

impl DispatchSolution {
    pub fn optimal(objective: f64, optimized: CapacityMap) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            status: SolutionStatus::Optimal,
            objective: Some(objective),
            optimized,
            solve_time_ms: 0,
            message: None,
        }
    }

    /// A failed solve, optionally with whatever capacities were produced.
    pub fn failed(status: SolutionStatus, message: &str) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            status,
            objective: None,
            optimized: CapacityMap::new(),
            solve_time_ms: 0,
            message: Some(message.to_string()),
        }
    }

    pub fn error(message: &str) -> Self {
        Self::failed(SolutionStatus::Error, message)
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::failed(
            SolutionStatus::Timeout,
            &format!("Solver timed out after {} seconds", seconds),
        )
    }

    pub fn with_partial(mut self, optimized: CapacityMap) -> Self {
        self.optimized = optimized;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_success()
    }
}

impl Default for DispatchSolution {
    fn default() -> Self {
        Self::error("No solution")
    }
}
