//! Execution batch: runs every unit of a run list in parallel.
//!
//! - At most `cores` simulations run at once, bounded by a semaphore.
//! - Every worker gets its own copy of the configuration; hook handlers that
//!   mutate it during per-unit notifications only affect that unit.
//! - Units finish in any order. `execution_all_complete` is notified once,
//!   after the last unit, with the batch's configuration.
//! - Unless `silence` is set, each finished unit prints a progress marker:
//!   `.` for a success and `X` otherwise.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use harvest_core::config::AppConfig;
use harvest_plugin::HookDispatcher;
use harvest_plugin::hooks::definitions::{
    ExecutionAllComplete, ExecutionFailed, ExecutionStarting, ExecutionSuccess, RunUnit,
    count_error_lines,
};

use crate::error::RunnerError;
use crate::executor::SimulationExecutor;

/// What happened to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Succeeded,
    /// Number of error lines on stdout
    Failed(usize),
    /// The executable could not be started
    NotRun,
}

impl UnitOutcome {
    /// Terminal progress marker.
    fn marker(self) -> char {
        match self {
            Self::Succeeded => '.',
            Self::Failed(_) | Self::NotRun => 'X',
        }
    }
}

fn print_marker(marker: char) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "{marker}");
    let _ = stdout.flush();
}

/// Tally of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Units submitted
    pub submitted: usize,
    /// Units whose output reported no errors
    pub succeeded: usize,
    /// Units whose output reported errors, with the error-line count
    pub failed: Vec<(RunUnit, usize)>,
    /// Units whose simulation could not be started
    pub not_run: Vec<RunUnit>,
}

impl BatchSummary {
    /// Whether any unit failed or did not run.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.not_run.is_empty()
    }

    fn record(&mut self, unit: RunUnit, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Succeeded => self.succeeded += 1,
            UnitOutcome::Failed(errors) => self.failed.push((unit, errors)),
            UnitOutcome::NotRun => self.not_run.push(unit),
        }
    }

    fn sort(&mut self) {
        self.failed.sort_by_key(|(unit, _)| unit.path());
        self.not_run.sort_by_key(RunUnit::path);
    }
}

/// Runs simulations and notifies the execution hooks.
#[derive(Clone)]
pub struct ExecutionBatch {
    /// Runs one unit
    executor: Arc<dyn SimulationExecutor>,
    /// Notifies plugins
    dispatcher: HookDispatcher,
}

impl ExecutionBatch {
    /// Create a new execution batch
    pub fn new(executor: Arc<dyn SimulationExecutor>, dispatcher: HookDispatcher) -> Self {
        Self {
            executor,
            dispatcher,
        }
    }

    /// Executes every unit of `run_list`.
    ///
    /// A unit is a failure when its stdout contains at least one line; exit
    /// code and stderr are not consulted. A failing hook handler does not
    /// cancel the other units: the first such error is returned once every
    /// unit has finished, and `execution_all_complete` is not notified.
    pub async fn run(
        &self,
        config: &mut AppConfig,
        run_list: Vec<RunUnit>,
    ) -> Result<BatchSummary, RunnerError> {
        let workers = config.cores.max(1);
        info!(units = run_list.len(), workers, "Starting simulation batch");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for unit in run_list.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let executor = Arc::clone(&self.executor);
            let dispatcher = self.dispatcher.clone();
            let mut worker_config = config.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| RunnerError::Task(e.to_string()))?;
                run_unit(executor.as_ref(), &dispatcher, &mut worker_config, unit).await
            });
        }

        let mut summary = BatchSummary {
            submitted: run_list.len(),
            ..BatchSummary::default()
        };
        let mut first_error: Option<RunnerError> = None;
        let show_progress = !config.silence;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((unit, outcome))) => {
                    if show_progress {
                        print_marker(outcome.marker());
                    }
                    summary.record(unit, outcome);
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Simulation unit aborted");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(error = %e, "Simulation worker task failed");
                    first_error.get_or_insert(RunnerError::Task(e.to_string()));
                }
            }
        }

        if show_progress && summary.submitted > 0 {
            println!();
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        summary.sort();
        info!(
            submitted = summary.submitted,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            not_run = summary.not_run.len(),
            "Simulation batch complete"
        );

        self.dispatcher
            .notify(&mut ExecutionAllComplete { run_list }, config)?;

        Ok(summary)
    }
}

impl std::fmt::Debug for ExecutionBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionBatch")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

async fn run_unit(
    executor: &dyn SimulationExecutor,
    dispatcher: &HookDispatcher,
    config: &mut AppConfig,
    unit: RunUnit,
) -> Result<(RunUnit, UnitOutcome), RunnerError> {
    dispatcher.notify(&mut ExecutionStarting { unit: unit.clone() }, config)?;

    let output = match executor.execute(&unit, &config.dssat).await {
        Ok(output) => output,
        Err(e) => {
            error!(unit = %unit, error = %e, "Simulation could not be started");
            return Ok((unit, UnitOutcome::NotRun));
        }
    };

    let errors = count_error_lines(&output.stdout);
    if errors > 0 {
        let mut payload = ExecutionFailed {
            unit: unit.clone(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        };
        warn!(
            "Check the DSSAT summary file in {}. {} failures occurred\n{}",
            unit.dir.display(),
            errors,
            payload.report()
        );
        dispatcher.notify(&mut payload, config)?;
        Ok((unit, UnitOutcome::Failed(errors)))
    } else {
        let mut payload = ExecutionSuccess {
            unit: unit.clone(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        };
        dispatcher.notify(&mut payload, config)?;
        Ok((unit, UnitOutcome::Succeeded))
    }
}
