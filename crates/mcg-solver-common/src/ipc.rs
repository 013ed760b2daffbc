//! JSON IPC for solver communication.
//!
//! A problem is one JSON document on the solver's stdin, the solution one
//! JSON document on its stdout. Both carry `protocol_version`; a reader
//! rejects any other version than [`PROTOCOL_VERSION`].

use std::io::{Read, Write};

use mcg_core::Network;
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::solution::DispatchSolution;
use crate::PROTOCOL_VERSION;

/// Dispatch problem handed to a solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchProblem {
    pub protocol_version: i32,
    pub network: Network,
    /// Wall-clock limit the solver should respect, if any.
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
}

impl DispatchProblem {
    pub fn new(network: Network) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            network,
            time_limit_seconds: None,
        }
    }

    pub fn with_time_limit(mut self, seconds: u64) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }
}

fn check_version(found: i32) -> SolverResult<()> {
    if found != PROTOCOL_VERSION {
        return Err(SolverError::ProtocolMismatch {
            expected: PROTOCOL_VERSION,
            found,
        });
    }
    Ok(())
}

pub fn write_problem<W: Write>(problem: &DispatchProblem, writer: W) -> SolverResult<()> {
    serde_json::to_writer(writer, problem)?;
    Ok(())
}

pub fn read_problem<R: Read>(reader: R) -> SolverResult<DispatchProblem> {
    let problem: DispatchProblem = serde_json::from_reader(reader)?;
    check_version(problem.protocol_version)?;
    Ok(problem)
}

pub fn write_solution<W: Write>(solution: &DispatchSolution, writer: W) -> SolverResult<()> {
    serde_json::to_writer(writer, solution)?;
    Ok(())
}

pub fn read_solution<R: Read>(reader: R) -> SolverResult<DispatchSolution> {
    let solution: DispatchSolution = serde_json::from_reader(reader)?;
    check_version(solution.protocol_version)?;
    Ok(solution)
}
