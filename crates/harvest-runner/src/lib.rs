//! # harvest-runner
//!
//! Pipeline stages that produce hook notifications:
//!
//! - Context building and composition of run directories
//! - Run-list generation from the work directory
//! - Parallel execution of the simulation over a run list

pub mod batch;
pub mod compose;
pub mod context;
pub mod error;
pub mod executor;
pub mod runlist;

pub use batch::{BatchSummary, ExecutionBatch};
pub use compose::{ComposeStage, PlaceholderRenderer, TemplateRenderer};
pub use context::{ContextBuilder, MergeContextBuilder};
pub use error::RunnerError;
pub use executor::{DssatExecutor, SimulationExecutor, SimulationOutput};
pub use runlist::generate_run_list;
