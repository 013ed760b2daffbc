//! Error types and exit codes for solver communication.

use thiserror::Error;

/// Exit codes for solver subprocess communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success (check status in solution for optimality)
    Success = 0,
    /// Invalid input (malformed JSON, protocol mismatch)
    InvalidInput = 1,
    /// Solver error (license, numerical issues)
    SolverError = 2,
    Timeout = 3,
    /// Segfault (SIGSEGV) - native crash
    Segfault = 139,
}

impl ExitCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            1 => ExitCode::InvalidInput,
            2 => ExitCode::SolverError,
            3 => ExitCode::Timeout,
            139 => ExitCode::Segfault,
            _ => ExitCode::SolverError, // Unknown codes treated as solver error
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Errors that can occur during solver operations.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver {solver} is not installed (looked in ~/.mcg/solvers and PATH)")]
    NotInstalled { solver: String },

    #[error("No solver configured")]
    NoSolver,

    #[error("Failed to start solver process: {0}")]
    ProcessStart(#[source] std::io::Error),

    #[error("Solver process failed with exit code {exit_code:?}: {message}")]
    ProcessFailed { exit_code: ExitCode, message: String },

    #[error("Solver timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Protocol mismatch: expected v{expected}, got v{found}")]
    ProtocolMismatch { expected: i32, found: i32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// In-process solver failure.
    #[error("Solver {solver} failed: {message}")]
    Failed { solver: String, message: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
