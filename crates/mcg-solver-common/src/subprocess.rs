//! Subprocess management for solver plugins.
//!
//! Handles spawning solver binaries and managing their lifecycle.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use mcg_core::Network;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::chain::DispatchSolver;
use crate::error::{ExitCode, SolverError, SolverResult};
use crate::ipc::{read_solution, write_problem, DispatchProblem};
use crate::solution::DispatchSolution;

/// A solver subprocess handle.
///
/// The problem goes to the child's stdin as JSON, the solution comes back on
/// stdout. Anything on stderr becomes the failure message.
#[derive(Debug, Clone)]
pub struct SolverProcess {
    name: String,
    binary_path: PathBuf,
    args: Vec<String>,
    /// Zero means one hour.
    timeout_seconds: u64,
}

impl SolverProcess {
    pub fn new(name: impl Into<String>, binary_path: PathBuf, timeout_seconds: u64) -> Self {
        Self {
            name: name.into(),
            binary_path,
            args: Vec::new(),
            timeout_seconds,
        }
    }

    /// Locate `binary_name` and wrap it.
    pub fn locate(binary_name: &str, timeout_seconds: u64) -> SolverResult<Self> {
        let path = Self::find_binary(binary_name)?;
        Ok(Self::new(binary_name, path, timeout_seconds))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Find the solver binary in standard locations.
    ///
    /// Search order:
    /// 1. ~/.mcg/solvers/<binary_name>
    /// 2. System PATH
    pub fn find_binary(binary_name: &str) -> SolverResult<PathBuf> {
        if let Some(home) = dirs::home_dir() {
            let mcg_path = home.join(".mcg").join("solvers").join(binary_name);
            if mcg_path.exists() {
                return Ok(mcg_path);
            }
        }

        if let Ok(path) = which::which(binary_name) {
            return Ok(path);
        }

        Err(SolverError::NotInstalled {
            solver: binary_name.to_string(),
        })
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn problem_bytes(&self, network: &Network) -> SolverResult<Vec<u8>> {
        let mut problem = DispatchProblem::new(network.clone());
        if self.timeout_seconds > 0 {
            problem = problem.with_time_limit(self.timeout_seconds);
        }
        let mut bytes = Vec::new();
        write_problem(&problem, &mut bytes)?;
        Ok(bytes)
    }

    fn finish(exit: Option<i32>, stdout: &[u8], stderr: &[u8]) -> SolverResult<DispatchSolution> {
        let exit_code = ExitCode::from_raw(exit.unwrap_or(-1));
        if !exit_code.is_success() {
            return Err(SolverError::ProcessFailed {
                exit_code,
                message: String::from_utf8_lossy(stderr).trim().to_string(),
            });
        }
        if stdout.is_empty() {
            return Err(SolverError::Ipc("Empty solution from solver".to_string()));
        }
        read_solution(stdout)
    }

    fn timeout_duration(&self) -> Duration {
        if self.timeout_seconds > 0 {
            Duration::from_secs(self.timeout_seconds)
        } else {
            Duration::from_secs(3600)
        }
    }

    /// Solve by spawning the solver subprocess, killing it on timeout.
    ///
    /// The time limit covers the whole exchange: writing the problem, reading
    /// the solution and waiting for the process to exit.
    pub async fn solve_async(&self, network: &Network) -> SolverResult<DispatchSolution> {
        let problem_bytes = self.problem_bytes(network)?;

        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SolverError::ProcessStart)?;

        let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(SolverError::Ipc("solver pipes unavailable".to_string()));
        };

        let exchange = async {
            let write = async move {
                match stdin.write_all(&problem_bytes).await {
                    // a solver may exit without reading its input; its exit code decides
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                        return Err(SolverError::Ipc(format!("Failed to write problem: {}", e)));
                    }
                    _ => {}
                }
                drop(stdin); // Close stdin to signal end of input
                Ok(())
            };
            let mut solution_bytes = Vec::new();
            let mut stderr_bytes = Vec::new();
            let (written, read, _) = tokio::join!(
                write,
                stdout.read_to_end(&mut solution_bytes),
                stderr.read_to_end(&mut stderr_bytes),
            );
            written?;
            read.map_err(|e| SolverError::Ipc(format!("Failed to read solution: {}", e)))?;
            let status = child.wait().await.map_err(SolverError::ProcessStart)?;
            Ok::<_, SolverError>((status, solution_bytes, stderr_bytes))
        };

        let outcome = timeout(self.timeout_duration(), exchange).await;
        match outcome {
            Ok(Ok((status, solution_bytes, stderr_bytes))) => {
                Self::finish(status.code(), &solution_bytes, &stderr_bytes)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(solver = %self.name, seconds = self.timeout_seconds, "solver timed out, killing it");
                let _ = child.kill().await;
                Err(SolverError::Timeout {
                    seconds: self.timeout_seconds,
                })
            }
        }
    }

    /// Blocking variant of [`SolverProcess::solve_async`] on a current-thread
    /// runtime. Must not be called from inside a tokio runtime.
    pub fn solve_blocking(&self, network: &Network) -> SolverResult<DispatchSolution> {
        let start = Instant::now();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let mut solution = runtime.block_on(self.solve_async(network))?;
        if solution.solve_time_ms == 0 {
            solution.solve_time_ms = start.elapsed().as_millis() as i64;
        }
        debug!(solver = %self.name, status = %solution.status, ms = solution.solve_time_ms, "solver process finished");
        Ok(solution)
    }
}

impl DispatchSolver for SolverProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn solve(&self, network: &Network) -> SolverResult<DispatchSolution> {
        self.solve_blocking(network)
    }
}

pub fn is_solver_installed(binary_name: &str) -> bool {
    SolverProcess::find_binary(binary_name).is_ok()
}
