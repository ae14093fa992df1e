//! Run audit plugin for Harvest.
//!
//! Tracks every simulation of a batch and, once the batch completes, writes
//! a JSON report listing the runs whose output reported errors.
//!
//! ```json
//! { "plugin": "run_audit", "params": { "output": "audit/run_audit.json" } }
//! ```
//!
//! Without `output` the report goes to `<work_dir>/run_audit.json`.

pub mod plugin;
pub mod report;

pub use plugin::RunAuditPlugin;
pub use report::{AuditReport, FailedRun};
