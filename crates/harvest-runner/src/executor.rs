//! Simulation execution.
//!
//! Runs the external simulation as a child process inside a unit's run
//! directory and captures its output.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use harvest_core::config::DssatConfig;
use harvest_plugin::hooks::definitions::RunUnit;

use crate::error::RunnerError;

/// Captured output of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutput {
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
    /// Exit code, `-1` when the process was terminated by a signal
    pub exit_code: i32,
}

/// Executes one simulation unit.
#[async_trait]
pub trait SimulationExecutor: Send + Sync {
    /// Runs `unit` and returns its captured output.
    ///
    /// A process that starts and exits is never an error here, whatever its
    /// exit code; callers classify the output.
    async fn execute(
        &self,
        unit: &RunUnit,
        dssat: &DssatConfig,
    ) -> Result<SimulationOutput, RunnerError>;
}

/// Runs the configured DSSAT executable as `<executable> <mode> <file>`
/// with the unit's directory as working directory.
#[derive(Debug, Clone, Default)]
pub struct DssatExecutor;

impl DssatExecutor {
    /// Create a new executor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SimulationExecutor for DssatExecutor {
    async fn execute(
        &self,
        unit: &RunUnit,
        dssat: &DssatConfig,
    ) -> Result<SimulationOutput, RunnerError> {
        let start = Instant::now();
        let mode = dssat.mode();

        tracing::debug!(
            "Executing simulation: executable='{}', mode={}, dir='{}', file='{}'",
            dssat.executable.display(),
            mode,
            unit.dir.display(),
            unit.file
        );

        let output = Command::new(&dssat.executable)
            .arg(&mode)
            .arg(&unit.file)
            .current_dir(&unit.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                executable: dssat.executable.display().to_string(),
                source,
            })?;

        tracing::debug!(
            "Simulation finished: unit='{}', exit_code={:?}, duration={}ms",
            unit,
            output.status.code(),
            start.elapsed().as_millis()
        );

        Ok(SimulationOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
