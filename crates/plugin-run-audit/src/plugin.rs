//! Run audit plugin implementation.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use harvest_plugin::prelude::*;

use crate::report::{AuditReport, FailedRun};

/// Identifier the run audit plugin is registered under.
pub const PLUGIN_ID: &str = "run_audit";

/// Default report file name, inside the work directory.
pub const DEFAULT_REPORT_FILE: &str = "run_audit.json";

/// Config key receiving the path of the last written report.
pub const REPORT_PATH_KEY: &str = "run_audit_report";

/// Records failed runs and writes one report per batch.
#[derive(Debug, Default)]
pub struct RunAuditPlugin {
    state: Arc<Mutex<AuditReport>>,
}

impl RunAuditPlugin {
    /// Create a new run audit plugin
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock(state: &Mutex<AuditReport>) -> anyhow::Result<MutexGuard<'_, AuditReport>> {
    state.lock().map_err(|_| anyhow!("run audit state is poisoned"))
}

impl Plugin for RunAuditPlugin {
    fn initialize(
        &mut self,
        config: &AppConfig,
        descriptor: &PluginDescriptor,
        hooks: &mut HookRegistrar<'_>,
        logger: &PluginLogger,
    ) -> anyhow::Result<()> {
        let output = descriptor
            .param_str("output")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.work_dir.join(DEFAULT_REPORT_FILE));
        logger.info(&format!("Writing run audit reports to {}", output.display()));

        let state = Arc::clone(&self.state);
        hooks.register(move |_: &mut ExecutionStarting, _: &mut AppConfig| {
            lock(&state)?.started += 1;
            Ok(())
        });

        let state = Arc::clone(&self.state);
        hooks.register(move |_: &mut ExecutionSuccess, _: &mut AppConfig| {
            lock(&state)?.succeeded += 1;
            Ok(())
        });

        let state = Arc::clone(&self.state);
        hooks.register(move |payload: &mut ExecutionFailed, _: &mut AppConfig| {
            warn!(
                plugin_id = PLUGIN_ID,
                unit = %payload.unit,
                error_lines = payload.error_line_count(),
                "Simulation run failed"
            );
            lock(&state)?.failed.push(FailedRun::from(&*payload));
            Ok(())
        });

        let state = Arc::clone(&self.state);
        let log = logger.clone();
        hooks.register(
            move |payload: &mut ExecutionAllComplete, config: &mut AppConfig| {
                let mut report = std::mem::take(&mut *lock(&state)?);
                report.generated_at = Some(Utc::now());
                report.submitted = payload.run_list.len();
                report
                    .failed
                    .sort_by(|a, b| a.unit.path().cmp(&b.unit.path()));

                report.write_to(&output)?;
                config.set_extra_value(REPORT_PATH_KEY, json!(output.to_string_lossy()));

                log.info(&format!(
                    "Run audit: {} submitted, {} succeeded, {} failed",
                    report.submitted,
                    report.succeeded,
                    report.failed.len()
                ));
                Ok(())
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use harvest_plugin::{PluginCatalog, PluginManager};

    use super::*;

    fn manager(output: &std::path::Path) -> PluginManager {
        let catalog = PluginCatalog::new().with(PLUGIN_ID, || Box::new(RunAuditPlugin::new()));
        let config = AppConfig {
            plugins: vec![json!({
                "plugin": PLUGIN_ID,
                "params": {"output": output.to_string_lossy()}
            })],
            ..AppConfig::default()
        };
        PluginManager::load(&config, &catalog).expect("load")
    }

    fn failed(dir: &str, stdout: &str) -> ExecutionFailed {
        ExecutionFailed {
            unit: RunUnit::new(dir, "RUN.MZX"),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            exit_code: 0,
        }
    }

    #[test]
    fn test_report_lists_failed_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("reports/audit.json");
        let dispatcher = manager(&output).dispatcher();
        let mut config = AppConfig::default();

        let units = vec![
            RunUnit::new("/w/2", "RUN.MZX"),
            RunUnit::new("/w/1", "RUN.MZX"),
            RunUnit::new("/w/3", "RUN.MZX"),
        ];
        for unit in &units {
            dispatcher
                .notify(&mut ExecutionStarting { unit: unit.clone() }, &mut config)
                .expect("starting");
        }
        dispatcher
            .notify(&mut failed("/w/2", "bad weather\n"), &mut config)
            .expect("failed");
        dispatcher
            .notify(&mut failed("/w/1", "e1\ne2\n"), &mut config)
            .expect("failed");
        dispatcher
            .notify(
                &mut ExecutionSuccess {
                    unit: units[2].clone(),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    exit_code: 0,
                },
                &mut config,
            )
            .expect("success");
        dispatcher
            .notify(&mut ExecutionAllComplete { run_list: units }, &mut config)
            .expect("all complete");

        let report = AuditReport::read_from(&output).expect("report");
        assert!(report.generated_at.is_some());
        assert_eq!(report.submitted, 3);
        assert_eq!(report.started, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].unit.dir, PathBuf::from("/w/1"));
        assert_eq!(report.failed[0].error_lines, 2);
        assert_eq!(report.failed[1].report, "bad weather");
        assert_eq!(
            config.extra_value(REPORT_PATH_KEY),
            Some(&json!(output.to_string_lossy()))
        );
    }

    #[test]
    fn test_state_resets_between_batches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("audit.json");
        let dispatcher = manager(&output).dispatcher();
        let mut config = AppConfig::default();

        dispatcher
            .notify(&mut failed("/w/1", "e\n"), &mut config)
            .expect("failed");
        dispatcher
            .notify(&mut ExecutionAllComplete::default(), &mut config)
            .expect("first batch");
        dispatcher
            .notify(&mut ExecutionAllComplete::default(), &mut config)
            .expect("second batch");

        let report = AuditReport::read_from(&output).expect("report");
        assert!(report.failed.is_empty());
    }
}
