//! Solver seam and JSON IPC protocol for multi-carrier dispatch solvers.
//!
//! The assembled [`mcg_core::Network`] is solved either in process, through
//! any [`DispatchSolver`], or by an external plugin binary spoken to over
//! JSON on stdin/stdout ([`SolverProcess`] on the calling side,
//! [`run_solver_plugin`] on the plugin side).
//!
//! ```text
//! mcg (main) ──stdin──> mcg-highs (subprocess)
//!            <─stdout──
//!            <─stderr── (logs/errors)
//! ```
//!
//! Several solvers can be chained with [`SolverChain`]; the first one to
//! report an optimal solution wins.
//!
//! # Protocol Version
//!
//! Problems and solutions carry [`PROTOCOL_VERSION`]; breaking changes to the
//! JSON layout increment it.

pub mod chain;
pub mod error;
pub mod ipc;
pub mod plugin;
pub mod solution;
pub mod subprocess;

pub use chain::{DispatchSolver, SolverChain};
pub use error::{ExitCode, SolverError, SolverResult};
pub use ipc::{read_problem, read_solution, write_problem, write_solution, DispatchProblem};
pub use plugin::{run_solver_plugin, serve, SolverPlugin};
pub use solution::{DispatchSolution, SolutionStatus};
pub use subprocess::{is_solver_installed, SolverProcess};

/// Protocol version for IPC compatibility checking.
/// Increment when making breaking changes to the schema.
pub const PROTOCOL_VERSION: i32 = 1;
