//! All hook point definitions with typed payloads.
//!
//! Every pipeline event is its own Rust type implementing [`HookPayload`].
//! The registry and dispatcher key on the concrete type, so adding an
//! event only means adding a type here (or in any downstream crate).

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use harvest_core::config::AppConfig;

/// Mutable key/value execution context of one unit of work.
pub type Context = Map<String, Value>;

/// Marker trait for hook payloads.
///
/// `NAME` is the stable snake_case name used in logs and errors.
pub trait HookPayload: Any + Send + fmt::Debug {
    /// Stable event name.
    const NAME: &'static str;
}

/// Identifies a payload type; the key of the hook registry.
#[derive(Debug, Clone, Copy)]
pub struct HookType {
    id: TypeId,
    name: &'static str,
}

impl HookType {
    /// Returns the hook type of payload `P`.
    pub fn of<P: HookPayload>() -> Self {
        Self {
            id: TypeId::of::<P>(),
            name: P::NAME,
        }
    }

    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for HookType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HookType {}

impl Hash for HookType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One simulation run: a directory and the input file executed in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunUnit {
    /// Directory the simulation is executed in.
    pub dir: PathBuf,
    /// Input file name, relative to `dir`.
    pub file: String,
}

impl RunUnit {
    /// Creates a new run unit.
    pub fn new(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file: file.into(),
        }
    }

    /// Full path of the input file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl fmt::Display for RunUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// The inputs a unit context was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitInputs {
    /// The run definition from configuration.
    pub run: Context,
    /// The peer (site) this unit was generated for.
    pub peer: Context,
}

/// Counts error lines in captured simulation stdout.
///
/// The simulation prints nothing on stdout unless something went wrong,
/// so every line is treated as one reported failure. Exit code and stderr
/// are not consulted.
pub fn count_error_lines(stdout: &[u8]) -> usize {
    stdout.iter().filter(|b| **b == b'\n').count()
}

// ── Configuration ──

/// Fired once the configuration has been loaded.
///
/// `config` is a snapshot of the configuration as loaded; handlers that
/// want to change settings mutate the configuration argument instead.
#[derive(Debug, Clone)]
pub struct ConfigLoaded {
    /// Configuration as loaded from disk.
    pub config: AppConfig,
}

// ── Context building ──

/// Fired after a unit's run directory exists and before it is composed.
/// Handlers may mutate the context; composition uses the mutated value.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilt {
    /// The unit's execution context.
    pub context: Context,
}

/// Fired when a unit context was built successfully.
#[derive(Debug, Clone)]
pub struct UnitSuccess {
    /// The built context.
    pub context: Context,
    /// The inputs it was built from.
    pub inputs: UnitInputs,
}

/// Fired when no context could be built for a unit.
#[derive(Debug, Clone)]
pub struct UnitSkipped {
    /// The inputs that failed to produce a context.
    pub inputs: UnitInputs,
}

// ── Composition ──

/// Fired after a context has been written to its run directory.
#[derive(Debug, Clone)]
pub struct ComposeSuccess {
    /// The composed context.
    pub context: Context,
}

/// Fired when a unit had no context to compose.
#[derive(Debug, Clone, Default)]
pub struct ComposeSkipped;

/// Fired once after every unit has been composed.
#[derive(Debug, Clone, Default)]
pub struct ComposeAllComplete {
    /// Absolute run directories that were composed.
    pub run_list: Vec<PathBuf>,
}

// ── Execution ──

/// Fired right before the simulation is started for a unit.
#[derive(Debug, Clone)]
pub struct ExecutionStarting {
    /// The unit about to run.
    pub unit: RunUnit,
}

/// Fired after a simulation whose stdout reported no errors.
#[derive(Debug, Clone)]
pub struct ExecutionSuccess {
    /// The unit that ran.
    pub unit: RunUnit,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Process exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
}

/// Fired after a simulation whose stdout reported at least one error line.
#[derive(Debug, Clone)]
pub struct ExecutionFailed {
    /// The unit that ran.
    pub unit: RunUnit,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Process exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
}

impl ExecutionFailed {
    /// Number of error lines reported on stdout.
    pub fn error_line_count(&self) -> usize {
        count_error_lines(&self.stdout)
    }

    /// Stdout decoded lossily, without the trailing newline.
    pub fn report(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim_end().to_string()
    }
}

impl ExecutionSuccess {
    /// Number of error lines reported on stdout (always zero for a success).
    pub fn error_line_count(&self) -> usize {
        count_error_lines(&self.stdout)
    }
}

/// Fired once after every submitted unit has finished.
#[derive(Debug, Clone, Default)]
pub struct ExecutionAllComplete {
    /// Units submitted for execution.
    pub run_list: Vec<RunUnit>,
}

// ── Analytics ──

/// Fired before an analytics phase starts.
#[derive(Debug, Clone, Default)]
pub struct PreAnalytics;

/// Fired after an analytics phase finished.
#[derive(Debug, Clone, Default)]
pub struct PostAnalytics {
    /// Output files produced by the runs.
    pub run_outputs: Vec<String>,
    /// Files with calculated results.
    pub calculated: Vec<String>,
    /// Files with filtered results.
    pub filtered: Vec<String>,
}

crate::impl_hook_payload!(ConfigLoaded, "config_loaded");
crate::impl_hook_payload!(ContextBuilt, "context_built");
crate::impl_hook_payload!(UnitSuccess, "unit_success");
crate::impl_hook_payload!(UnitSkipped, "unit_skipped");
crate::impl_hook_payload!(ComposeSuccess, "compose_success");
crate::impl_hook_payload!(ComposeSkipped, "compose_skipped");
crate::impl_hook_payload!(ComposeAllComplete, "compose_all_complete");
crate::impl_hook_payload!(ExecutionStarting, "execution_starting");
crate::impl_hook_payload!(ExecutionSuccess, "execution_success");
crate::impl_hook_payload!(ExecutionFailed, "execution_failed");
crate::impl_hook_payload!(ExecutionAllComplete, "execution_all_complete");
crate::impl_hook_payload!(PreAnalytics, "pre_analytics");
crate::impl_hook_payload!(PostAnalytics, "post_analytics");
