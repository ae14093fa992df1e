//! Harvest: batch crop-simulation runner.
//!
//! Loads the configuration, loads the configured plugins and runs the
//! compose and simulation stages.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use harvest_core::config::{AppConfig, LogFormat};
use harvest_core::error::AppError;
use harvest_plugin::hooks::definitions::ConfigLoaded;
use harvest_plugin::{PluginCatalog, PluginManager};
use harvest_runner::{ComposeStage, DssatExecutor, ExecutionBatch, generate_run_list};
use plugin_demo::DemoPlugin;
use plugin_run_audit::RunAuditPlugin;

/// Harvest command line
#[derive(Debug, Parser)]
#[command(name = "harvest", version, about = "Batch crop-simulation runner")]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Compose run directories, then run the simulations (default)
    #[arg(long, conflicts_with_all = ["setup", "run"])]
    all: bool,

    /// Only compose run directories
    #[arg(long)]
    setup: bool,

    /// Only run the simulations found in the work directory
    #[arg(long)]
    run: bool,

    /// Suppress terminal output
    #[arg(long)]
    silence: bool,
}

impl Cli {
    /// `(compose, simulate)`; nothing selected means everything.
    fn stages(&self) -> (bool, bool) {
        if self.all || (!self.setup && !self.run) {
            (true, true)
        } else {
            (self.setup, self.run)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    if cli.silence {
        config.silence = true;
    }

    init_logging(&config);

    if let Err(e) = run(&cli, config).await {
        tracing::error!("Harvest error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Plugins compiled into the binary.
fn plugin_catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(plugin_demo::plugin::PLUGIN_ID, || Box::new(DemoPlugin::new()))
        .with(plugin_run_audit::plugin::PLUGIN_ID, || {
            Box::new(RunAuditPlugin::new())
        })
}

async fn run(cli: &Cli, mut config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Harvest v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Plugins ──────────────────────────────────────────
    let plugins = PluginManager::load(&config, &plugin_catalog())?;
    let dispatcher = plugins.dispatcher();

    let mut loaded = ConfigLoaded {
        config: config.clone(),
    };
    dispatcher.notify(&mut loaded, &mut config)?;

    let (compose, simulate) = cli.stages();

    // ── Step 2: Compose run directories ──────────────────────────
    if compose {
        let stage = ComposeStage::with_defaults(&config, dispatcher.clone());
        let run_list = stage.run(&mut config).await?;
        tracing::info!("Composed {} run directories", run_list.len());
    }

    // ── Step 3: Run simulations ──────────────────────────────────
    if simulate {
        let run_list = generate_run_list(&config);
        let batch = ExecutionBatch::new(Arc::new(DssatExecutor::new()), dispatcher.clone());
        let summary = batch.run(&mut config, run_list).await?;

        if summary.has_failures() && !config.silence {
            println!(
                "One or more simulations had failures. Please check the harvest log for more details"
            );
        }
    }

    tracing::info!(plugins = plugins.loaded_plugins().len(), "Harvest finished");
    Ok(())
}
