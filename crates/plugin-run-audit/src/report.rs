//! Audit report model.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use harvest_plugin::hooks::definitions::{ExecutionFailed, RunUnit};

/// One run whose output reported errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRun {
    /// The unit that ran
    pub unit: RunUnit,
    /// Number of error lines on stdout
    pub error_lines: usize,
    /// Process exit code
    pub exit_code: i32,
    /// The error lines themselves
    pub report: String,
}

impl From<&ExecutionFailed> for FailedRun {
    fn from(payload: &ExecutionFailed) -> Self {
        Self {
            unit: payload.unit.clone(),
            error_lines: payload.error_line_count(),
            exit_code: payload.exit_code,
            report: payload.report(),
        }
    }
}

/// Per-batch audit report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// When the batch finished
    pub generated_at: Option<DateTime<Utc>>,
    /// Units submitted for execution
    pub submitted: usize,
    /// Units started
    pub started: usize,
    /// Units whose output reported no errors
    pub succeeded: usize,
    /// Units whose output reported errors
    pub failed: Vec<FailedRun>,
}

impl AuditReport {
    /// Writes the report as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reads a report written by [`AuditReport::write_to`].
    pub fn read_from(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
