//! Simulation executable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Run modes that read a batch file instead of a single experiment file.
const BATCH_RUN_MODES: [&str; 9] = ["B", "E", "F", "L", "N", "Q", "S", "T", "Y"];

/// Settings for the external DSSAT-compatible simulation executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DssatConfig {
    /// Path to the simulation executable.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Run mode passed as the first argument (`A` runs every treatment).
    #[serde(default = "default_run_mode")]
    pub run_mode: String,
    /// Batch file name to look for when running in a batch mode.
    #[serde(default, alias = "batchFile", alias = "batchfile")]
    pub batch_file: Option<String>,
    /// Experiment file name to look for when not running in a batch mode.
    #[serde(default)]
    pub filex: Option<String>,
}

impl DssatConfig {
    /// Normalized (upper case) run mode.
    pub fn mode(&self) -> String {
        self.run_mode.trim().to_uppercase()
    }

    /// Whether the configured run mode consumes a batch file.
    pub fn is_batch_mode(&self) -> bool {
        let mode = self.mode();
        BATCH_RUN_MODES.contains(&mode.as_str())
    }

    /// The explicit file name targeted by the current run mode, if any.
    pub fn target_file(&self) -> Option<&str> {
        if self.is_batch_mode() {
            self.batch_file.as_deref()
        } else {
            self.filex.as_deref()
        }
    }
}

impl Default for DssatConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            run_mode: default_run_mode(),
            batch_file: None,
            filex: None,
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("dscsm048")
}

fn default_run_mode() -> String {
    "A".to_string()
}
