//! Plugin harness for solver binaries.
//!
//! Provides common infrastructure for solver plugin binaries: tracing setup,
//! JSON IPC on stdin/stdout and exit-code handling.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcg_solver_common::plugin::{run_solver_plugin, SolverPlugin};
//! use mcg_solver_common::{DispatchProblem, DispatchSolution};
//! use anyhow::Result;
//!
//! struct HighsDispatch;
//!
//! impl SolverPlugin for HighsDispatch {
//!     fn name(&self) -> &'static str { "mcg-highs" }
//!     fn solve(&self, problem: &DispatchProblem) -> Result<DispatchSolution> {
//!         // build and solve the LP
//!     }
//! }
//!
//! fn main() {
//!     run_solver_plugin(HighsDispatch);
//! }
//! ```

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::error::ExitCode;
use crate::ipc::{read_problem, write_solution};
use crate::solution::DispatchSolution;
use crate::{DispatchProblem, PROTOCOL_VERSION};

/// Trait for implementing a solver plugin.
pub trait SolverPlugin {
    /// The solver name (e.g., "mcg-highs").
    fn name(&self) -> &'static str;

    /// Solve the dispatch problem.
    ///
    /// A solve that ran but found no optimum should return `Ok` with a
    /// non-optimal status so partial capacities still reach the caller.
    fn solve(&self, problem: &DispatchProblem) -> Result<DispatchSolution>;

    /// Called after tracing is initialized but before reading the problem.
    fn init(&self) -> Result<()> {
        Ok(())
    }
}

/// Run a solver plugin with the standard harness and exit the process.
///
/// # Exit Codes
///
/// - `0`: Success (optimality is reported in the solution)
/// - `1`: Invalid input (empty stdin, malformed JSON, protocol mismatch)
/// - `2`: Solver error (init or solve failed)
pub fn run_solver_plugin<P: SolverPlugin>(plugin: P) -> ! {
    // Initialize tracing to stderr (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    info!(
        "{} v{} (protocol v{})",
        plugin.name(),
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    );

    let exit_code = serve(&plugin, io::stdin().lock(), io::stdout().lock());
    std::process::exit(exit_code as i32);
}

/// Read one problem from `input`, solve it and write the solution to `output`.
pub fn serve<P, R, W>(plugin: &P, mut input: R, mut output: W) -> ExitCode
where
    P: SolverPlugin,
    R: Read,
    W: Write,
{
    if let Err(e) = plugin.init() {
        error!("Solver initialization failed: {:?}", e);
        return ExitCode::SolverError;
    }

    let problem = match read_input(&mut input) {
        Ok(problem) => problem,
        Err(e) => {
            error!("Invalid input: {:?}", e);
            return ExitCode::InvalidInput;
        }
    };

    info!(
        "Problem: {} buses, {} generators, {} links, {} snapshots",
        problem.network.buses.len(),
        problem.network.generators.len(),
        problem.network.links.len(),
        problem.network.snapshot_count()
    );

    let solution = match plugin.solve(&problem) {
        Ok(solution) => solution,
        Err(e) => {
            error!("Solver error: {:?}", e);
            return ExitCode::SolverError;
        }
    };

    if let Err(e) = write_output(&solution, &mut output) {
        error!("Failed to write solution: {:?}", e);
        return ExitCode::SolverError;
    }

    info!(
        "Solution written: status={}, objective={:?}",
        solution.status, solution.objective
    );
    ExitCode::Success
}

fn read_input<R: Read>(input: &mut R) -> Result<DispatchProblem> {
    debug!("Reading problem from stdin...");
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .context("Failed to read problem from stdin")?;
    if bytes.is_empty() {
        anyhow::bail!("Empty input - no problem data received");
    }
    debug!("Received {} bytes of problem data", bytes.len());
    read_problem(bytes.as_slice()).context("Failed to parse JSON problem")
}

fn write_output<W: Write>(solution: &DispatchSolution, output: &mut W) -> Result<()> {
    write_solution(solution, &mut *output).context("Failed to serialize solution")?;
    output.flush().context("Failed to flush solution")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{read_solution, write_problem};
    use mcg_core::{CapacityMap, ComponentKind, Network, TimeAxis};

    struct FixedCapacity;

    impl SolverPlugin for FixedCapacity {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, problem: &DispatchProblem) -> Result<DispatchSolution> {
            let mut optimized = CapacityMap::new();
            for name in problem.network.generators.keys() {
                optimized.insert(ComponentKind::Generator, name.clone(), 10.0);
            }
            Ok(DispatchSolution::optimal(0.0, optimized))
        }
    }

    struct Broken;

    impl SolverPlugin for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn solve(&self, _problem: &DispatchProblem) -> Result<DispatchSolution> {
            anyhow::bail!("license expired")
        }
    }

    fn problem_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        let problem = DispatchProblem::new(Network::new(TimeAxis::hourly_steps(3)));
        write_problem(&problem, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn serves_one_problem() {
        let mut out = Vec::new();
        let code = serve(&FixedCapacity, problem_bytes().as_slice(), &mut out);
        assert_eq!(code, ExitCode::Success);
        let solution = read_solution(out.as_slice()).unwrap();
        assert!(solution.is_optimal());
    }

    #[test]
    fn empty_or_malformed_input_is_invalid() {
        let mut out = Vec::new();
        assert_eq!(serve(&FixedCapacity, io::empty(), &mut out), ExitCode::InvalidInput);
        assert_eq!(
            serve(&FixedCapacity, "{\"protocol_version\": 1".as_bytes(), &mut out),
            ExitCode::InvalidInput
        );
        assert!(out.is_empty());
    }

    #[test]
    fn solve_failure_is_solver_error() {
        let mut out = Vec::new();
        assert_eq!(serve(&Broken, problem_bytes().as_slice(), &mut out), ExitCode::SolverError);
        assert!(out.is_empty());
    }
}
