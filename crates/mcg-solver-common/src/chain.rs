//! The dispatch-solver seam and an ordered fallback over several solvers.

use mcg_core::Network;
use tracing::{info, warn};

use crate::error::{SolverError, SolverResult};
use crate::solution::DispatchSolution;

/// Anything that can solve the dispatch/expansion problem for a network.
pub trait DispatchSolver {
    fn name(&self) -> &str;

    /// Solve `network`. A solver that ran but found no optimum returns `Ok`
    /// with a non-optimal status; `Err` means it could not run at all.
    fn solve(&self, network: &Network) -> SolverResult<DispatchSolution>;
}

impl<S: DispatchSolver + ?Sized> DispatchSolver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, network: &Network) -> SolverResult<DispatchSolution> {
        (**self).solve(network)
    }
}

/// Tries solvers in order until one reports an optimal solution.
#[derive(Default)]
pub struct SolverChain {
    solvers: Vec<Box<dyn DispatchSolver>>,
}

impl SolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, solver: impl DispatchSolver + 'static) -> Self {
        self.solvers.push(Box::new(solver));
        self
    }

    pub fn push(&mut self, solver: Box<dyn DispatchSolver>) {
        self.solvers.push(solver);
    }

    pub fn len(&self) -> usize {
        self.solvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }
}

impl DispatchSolver for SolverChain {
    fn name(&self) -> &str {
        "chain"
    }

    /// The first optimal outcome wins. Otherwise the last outcome is returned,
    /// preferring a non-optimal solution over an error.
    fn solve(&self, network: &Network) -> SolverResult<DispatchSolution> {
        let mut last: Option<SolverResult<DispatchSolution>> = None;
        for solver in &self.solvers {
            match solver.solve(network) {
                Ok(solution) if solution.is_optimal() => {
                    info!(solver = solver.name(), "solver reported an optimal solution");
                    return Ok(solution);
                }
                Ok(solution) => {
                    warn!(solver = solver.name(), status = %solution.status, "solver did not reach optimality");
                    last = Some(Ok(solution));
                }
                Err(err) => {
                    warn!(solver = solver.name(), error = %err, "solver failed to run");
                    if !matches!(last, Some(Ok(_))) {
                        last = Some(Err(err));
                    }
                }
            }
        }
        last.unwrap_or(Err(SolverError::NoSolver))
    }
}
