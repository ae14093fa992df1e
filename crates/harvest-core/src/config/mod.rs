//! Application configuration schemas.
//!
//! The configuration is deserialized via the `config` crate from the file
//! given on the command line (JSON, TOML or YAML, picked by extension),
//! overlaid with `HARVEST__*` environment variables.
//!
//! Keys not covered by the schema are kept in [`AppConfig::extra`]. Hook
//! handlers receive the configuration mutably, so plugins may stash values
//! there for later handlers and for the rest of the pipeline.

pub mod dssat;
pub mod logging;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use self::dssat::DssatConfig;
pub use self::logging::{LogFormat, LoggingConfig};

use crate::error::AppError;

/// One run definition from the `runs` list (arbitrary key/value pairs).
pub type RunDefinition = Map<String, Value>;

/// Prefix of environment variables overriding file configuration.
pub const ENV_PREFIX: &str = "HARVEST";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory that holds one sub-directory per simulation unit.
    #[serde(default = "default_work_dir", alias = "workDir", alias = "workdir")]
    pub work_dir: PathBuf,
    /// Number of simulations executed in parallel.
    #[serde(default = "default_cores", alias = "threads")]
    pub cores: usize,
    /// Suppress progress output on the terminal.
    #[serde(default)]
    pub silence: bool,
    /// Write `run_list.txt` into the work directory after composing.
    #[serde(default, alias = "exportRunlist", alias = "exportrunlist")]
    pub export_runlist: bool,
    /// Directory holding weather files linked into every run directory.
    #[serde(default, alias = "weatherDir", alias = "weatherdir")]
    pub weather_dir: Option<PathBuf>,
    /// Directory holding input file templates.
    #[serde(default = "default_template_dir", alias = "templateDir", alias = "templatedir")]
    pub template_dir: PathBuf,
    /// Optional cap on the number of peers generated per run.
    #[serde(default)]
    pub sample: Option<usize>,
    /// Simulation executable settings.
    #[serde(default)]
    pub dssat: DssatConfig,
    /// Run definitions used to build per-unit contexts.
    #[serde(default)]
    pub runs: Vec<RunDefinition>,
    /// Ordered plugin descriptors, each `{ "plugin": "<id>", ... }`.
    ///
    /// Entries are kept raw so the plugin loader can validate their shape.
    #[serde(default)]
    pub plugins: Vec<Value>,
    /// Directory searched for dynamically loaded plugin libraries.
    #[serde(default = "default_plugin_dir", alias = "pluginDir", alias = "plugindir")]
    pub plugin_dir: PathBuf,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Every key not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    /// Load configuration from a file plus `HARVEST__*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::not_found(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        tracing::debug!(
            path = %path.display(),
            plugins = loaded.plugins.len(),
            runs = loaded.runs.len(),
            "Configuration loaded"
        );

        Ok(loaded)
    }

    /// Parse configuration from an in-memory JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Returns an extra (schema-less) value by key.
    pub fn extra_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Sets an extra (schema-less) value, returning the previous one.
    pub fn set_extra_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.extra.insert(key.into(), value)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            cores: default_cores(),
            silence: false,
            export_runlist: false,
            weather_dir: None,
            template_dir: default_template_dir(),
            sample: None,
            dssat: DssatConfig::default(),
            runs: Vec::new(),
            plugins: Vec::new(),
            plugin_dir: default_plugin_dir(),
            logging: LoggingConfig::default(),
            extra: Map::new(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_cores() -> usize {
    num_cpus::get()
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("./plugins")
}
