//! Compose stage: turns run definitions into populated run directories.
//!
//! For every run and each of its sites a context is built (in parallel,
//! bounded by `cores`), then every complete context is written to its own
//! directory as it arrives:
//!
//! 1. the directory is created and `context_built` is notified; handlers
//!    may still change the context
//! 2. include, weather and soil files are linked into the directory
//! 3. the context's template is rendered into the directory
//! 4. `compose_success` is notified
//!
//! Incomplete contexts notify `compose_skipped`. After the last unit the
//! run list is optionally exported and `compose_all_complete` is notified.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use harvest_core::config::AppConfig;
use harvest_plugin::HookDispatcher;
use harvest_plugin::hooks::definitions::{
    ComposeAllComplete, ComposeSkipped, ComposeSuccess, Context, ContextBuilt, UnitInputs,
};

use crate::context::{self, CONTEXT_WORK_DIR, ContextBuilder, MergeContextBuilder};
use crate::error::RunnerError;

/// File the run list is exported to, inside the work directory.
pub const RUN_LIST_FILE: &str = "run_list.txt";

/// Renders an input file template against a context.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template` (a name relative to the renderer's template
    /// source) with `context`.
    fn render(&self, template: &str, context: &Context) -> Result<String, RunnerError>;
}

/// Reads templates from a directory and substitutes `{{ key }}`
/// placeholders with context values.
///
/// String values are inserted verbatim, other values as JSON.
#[derive(Debug, Clone)]
pub struct PlaceholderRenderer {
    template_dir: PathBuf,
}

impl PlaceholderRenderer {
    /// Create a renderer reading from `template_dir`
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    /// Substitute placeholders in `source`.
    pub fn substitute(
        &self,
        template: &str,
        source: &str,
        context: &Context,
    ) -> Result<String, RunnerError> {
        let mut rendered = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| RunnerError::Template {
                template: template.to_string(),
                reason: "unterminated placeholder".to_string(),
            })?;

            let key = after[..close].trim();
            match context.get(key) {
                Some(Value::String(value)) => rendered.push_str(value),
                Some(value) => rendered.push_str(&value.to_string()),
                None => {
                    return Err(RunnerError::Template {
                        template: template.to_string(),
                        reason: format!("no value for placeholder '{key}'"),
                    });
                }
            }
            rest = &after[close + 2..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String, RunnerError> {
        let path = self.template_dir.join(template);
        let source = std::fs::read_to_string(&path).map_err(|e| RunnerError::io(&path, e))?;
        self.substitute(template, &source, context)
    }
}

/// Builds and writes every unit's run directory.
#[derive(Clone)]
pub struct ComposeStage {
    builder: Arc<dyn ContextBuilder>,
    renderer: Arc<dyn TemplateRenderer>,
    dispatcher: HookDispatcher,
}

impl ComposeStage {
    /// Create a compose stage
    pub fn new(
        builder: Arc<dyn ContextBuilder>,
        renderer: Arc<dyn TemplateRenderer>,
        dispatcher: HookDispatcher,
    ) -> Self {
        Self {
            builder,
            renderer,
            dispatcher,
        }
    }

    /// A stage merging run and site values and rendering templates from
    /// `config.template_dir`.
    pub fn with_defaults(config: &AppConfig, dispatcher: HookDispatcher) -> Self {
        Self::new(
            Arc::new(MergeContextBuilder::new()),
            Arc::new(PlaceholderRenderer::new(&config.template_dir)),
            dispatcher,
        )
    }

    /// Composes every unit of `config.runs`.
    ///
    /// Returns the absolute directories that were composed, in completion
    /// order. Without runs nothing is notified.
    pub async fn run(&self, config: &mut AppConfig) -> Result<Vec<PathBuf>, RunnerError> {
        if config.runs.is_empty() {
            info!("No runs configured, nothing to compose");
            return Ok(Vec::new());
        }

        for run in &config.runs {
            let name = run
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RunnerError::MissingKey("name".to_string()))?;
            make_dir(&config.work_dir.join(name)).await?;
        }

        let workers = config.cores.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for run in &config.runs {
            for peer in context::peers(run, config.sample) {
                let inputs = UnitInputs {
                    run: run.clone(),
                    peer,
                };
                let semaphore = Arc::clone(&semaphore);
                let builder = Arc::clone(&self.builder);
                let dispatcher = self.dispatcher.clone();
                let mut worker_config = config.clone();

                tasks.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| RunnerError::Task(e.to_string()))?;
                    tokio::task::spawn_blocking(move || {
                        context::build_unit(
                            builder.as_ref(),
                            inputs,
                            &mut worker_config,
                            &dispatcher,
                        )
                    })
                    .await
                    .map_err(|e| RunnerError::Task(e.to_string()))?
                });
            }
        }

        info!(units = tasks.len(), workers, "Composing run directories");

        let mut run_list = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let built = joined.map_err(|e| RunnerError::Task(e.to_string()))??;
            match built {
                Some(context) => run_list.push(self.compose(context, config).await?),
                None => self.dispatcher.notify(&mut ComposeSkipped, config)?,
            }
        }

        if config.export_runlist {
            export_run_list(&config.work_dir, &run_list).await?;
        }

        info!(composed = run_list.len(), "Compose complete");

        self.dispatcher.notify(
            &mut ComposeAllComplete {
                run_list: run_list.clone(),
            },
            config,
        )?;

        Ok(run_list)
    }

    /// Writes one complete context to its directory.
    async fn compose(&self, context: Context, config: &mut AppConfig) -> Result<PathBuf, RunnerError> {
        let dir = context
            .get(CONTEXT_WORK_DIR)
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| RunnerError::MissingKey(CONTEXT_WORK_DIR.to_string()))?;
        make_dir(&dir).await?;

        let mut built = ContextBuilt { context };
        self.dispatcher.notify(&mut built, config)?;
        let context = built.context;

        link_inputs(&dir, &context, config).await?;

        let template = context
            .get("template")
            .and_then(Value::as_str)
            .ok_or_else(|| RunnerError::MissingKey("template".to_string()))?;
        let rendered = self.renderer.render(template, &context)?;
        let file_name = Path::new(template)
            .file_name()
            .ok_or_else(|| RunnerError::Template {
                template: template.to_string(),
                reason: "template name has no file name".to_string(),
            })?;
        let target = dir.join(file_name);
        tokio::fs::write(&target, rendered)
            .await
            .map_err(|e| RunnerError::io(&target, e))?;

        debug!(dir = %dir.display(), "Run directory composed");

        self.dispatcher
            .notify(&mut ComposeSuccess { context }, config)?;

        std::path::absolute(&dir).map_err(|e| RunnerError::io(&dir, e))
    }
}

impl std::fmt::Debug for ComposeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposeStage")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

async fn make_dir(dir: &Path) -> Result<(), RunnerError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RunnerError::io(dir, e))
}

/// Links include, weather and soil files into `dir`.
async fn link_inputs(dir: &Path, context: &Context, config: &AppConfig) -> Result<(), RunnerError> {
    for include in string_list(context, "include") {
        let source = Path::new(include);
        if tokio::fs::try_exists(source).await.unwrap_or(false) {
            link_into(dir, source, None).await?;
        }
    }

    if let Some(weather_dir) = &config.weather_dir {
        let station = context.get("wsta").and_then(Value::as_str);
        let file = context.get("wthFile").and_then(Value::as_str);
        match (station, file) {
            (Some(station), Some(file)) => {
                let name = format!("{station}.WTH");
                link_into(dir, &weather_dir.join(file), Some(&name)).await?;
            }
            _ => debug!(dir = %dir.display(), "No weather station in context"),
        }
    }

    for soil in string_list(context, "soilFiles") {
        link_into(dir, Path::new(soil), None).await?;
    }

    Ok(())
}

fn string_list<'a>(context: &'a Context, key: &str) -> impl Iterator<Item = &'a str> {
    context
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Links `source` into `dir` (as `name` or its own file name) unless the
/// target already exists.
async fn link_into(dir: &Path, source: &Path, name: Option<&str>) -> Result<(), RunnerError> {
    let file_name = match name {
        Some(name) => name.into(),
        None => match source.file_name() {
            Some(file_name) => file_name.to_os_string(),
            None => return Ok(()),
        },
    };
    let target = dir.join(file_name);
    if tokio::fs::symlink_metadata(&target).await.is_ok() {
        return Ok(());
    }

    let source = std::path::absolute(source).map_err(|e| RunnerError::io(source, e))?;

    #[cfg(unix)]
    tokio::fs::symlink(&source, &target)
        .await
        .map_err(|e| RunnerError::io(&target, e))?;

    #[cfg(not(unix))]
    tokio::fs::copy(&source, &target)
        .await
        .map_err(|e| RunnerError::io(&target, e))
        .map(|_| ())?;

    Ok(())
}

async fn export_run_list(work_dir: &Path, run_list: &[PathBuf]) -> Result<(), RunnerError> {
    let path = work_dir.join(RUN_LIST_FILE);
    let contents: String = run_list
        .iter()
        .map(|dir| format!("{}\n", dir.display()))
        .collect();
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| RunnerError::io(&path, e))?;
    info!(path = %path.display(), entries = run_list.len(), "Run list exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use harvest_plugin::hooks::registry::{HookRegistrar, HookRegistry};
    use serde_json::json;

    use super::*;

    fn context(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_substitute_placeholders() {
        let renderer = PlaceholderRenderer::new("templates");
        let ctx = context(json!({"wsta": "UFGA", "pdate": 120}));

        let out = renderer
            .substitute("x", "*EXP {{wsta}} on {{ pdate }}.", &ctx)
            .expect("render");
        assert_eq!(out, "*EXP UFGA on 120.");

        let err = renderer
            .substitute("x", "{{missing}}", &ctx)
            .expect_err("unknown key");
        assert!(err.to_string().contains("missing"));

        assert!(renderer.substitute("x", "{{wsta", &ctx).is_err());
    }

    fn recording_dispatcher(events: Arc<Mutex<Vec<String>>>) -> HookDispatcher {
        let mut registry = HookRegistry::new();
        let mut hooks = HookRegistrar::new(&mut registry, "recorder");

        let log = Arc::clone(&events);
        hooks.register(move |p: &mut ContextBuilt, _: &mut AppConfig| {
            let site = p.context["id"].as_str().unwrap_or_default().to_string();
            p.context.insert("crop".to_string(), json!(format!("maize-{site}")));
            log.lock().expect("lock").push(format!("built:{site}"));
            Ok(())
        });
        let log = Arc::clone(&events);
        hooks.register(move |p: &mut ComposeSuccess, _: &mut AppConfig| {
            log.lock()
                .expect("lock")
                .push(format!("success:{}", p.context["id"].as_str().unwrap_or_default()));
            Ok(())
        });
        let log = Arc::clone(&events);
        hooks.register(move |_: &mut ComposeSkipped, _: &mut AppConfig| {
            log.lock().expect("lock").push("skipped".to_string());
            Ok(())
        });
        let log = Arc::clone(&events);
        hooks.register(move |p: &mut ComposeAllComplete, _: &mut AppConfig| {
            log.lock()
                .expect("lock")
                .push(format!("all_complete:{}", p.run_list.len()));
            Ok(())
        });

        HookDispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_compose_writes_directories_and_notifies() {
        let root = tempfile::tempdir().expect("tempdir");
        let templates = root.path().join("templates");
        let weather = root.path().join("weather");
        std::fs::create_dir_all(&templates).expect("mkdir");
        std::fs::create_dir_all(&weather).expect("mkdir");
        std::fs::write(templates.join("MAIZE.MZX"), "crop={{crop}} wsta={{wsta}}\n")
            .expect("template");
        std::fs::write(weather.join("ufga.wth"), "weather").expect("weather");
        let soil = root.path().join("SOIL.SOL");
        std::fs::write(&soil, "soil").expect("soil");

        let mut config = AppConfig::default();
        config.work_dir = root.path().join("work");
        config.template_dir = templates.clone();
        config.weather_dir = Some(weather);
        config.export_runlist = true;
        config.cores = 2;
        config.runs = vec![context(json!({
            "name": "maize",
            "template": "MAIZE.MZX",
            "wsta": "UFGA",
            "wthFile": "ufga.wth",
            "soilFiles": [soil.to_string_lossy()],
            "sites": [{"id": "s1"}, {"lat": 1.0}]
        }))];

        let events = Arc::new(Mutex::new(Vec::new()));
        let stage = ComposeStage::with_defaults(&config, recording_dispatcher(Arc::clone(&events)));
        let run_list = stage.run(&mut config).await.expect("compose");

        let unit_dir = root.path().join("work/maize/s1");
        assert_eq!(run_list.len(), 1);
        assert!(run_list[0].is_absolute());
        assert_eq!(
            std::fs::read_to_string(unit_dir.join("MAIZE.MZX")).expect("rendered"),
            "crop=maize-s1 wsta=UFGA\n"
        );
        assert!(unit_dir.join("UFGA.WTH").exists());
        assert!(unit_dir.join("SOIL.SOL").exists());

        let exported =
            std::fs::read_to_string(config.work_dir.join(RUN_LIST_FILE)).expect("run list");
        assert_eq!(exported, format!("{}\n", run_list[0].display()));

        let mut events = events.lock().expect("lock").clone();
        assert_eq!(events.pop(), Some("all_complete:1".to_string()));
        events.sort();
        assert_eq!(events, vec!["built:s1", "skipped", "success:s1"]);
    }

    #[tokio::test]
    async fn test_no_runs_notifies_nothing() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut config = AppConfig::default();
        let stage = ComposeStage::with_defaults(&config, recording_dispatcher(Arc::clone(&events)));

        let run_list = stage.run(&mut config).await.expect("compose");
        assert!(run_list.is_empty());
        assert!(events.lock().expect("lock").is_empty());
    }
}
