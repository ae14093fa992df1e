//! Per-unit context building.
//!
//! A unit is one run definition combined with one of its sites (its
//! "peer"). The resulting context is a flat key/value map that the compose
//! stage renders into the unit's run directory.

use serde_json::Value;
use tracing::{debug, warn};

use harvest_core::config::AppConfig;
use harvest_plugin::HookDispatcher;
use harvest_plugin::hooks::definitions::{Context, UnitInputs, UnitSkipped, UnitSuccess};

use crate::error::RunnerError;

/// Context key holding the unit's run directory.
pub const CONTEXT_WORK_DIR: &str = "contextWorkDir";

/// Run definition key listing its sites.
pub const SITES_KEY: &str = "sites";

/// Builds the context of one unit.
///
/// `Ok(None)` means the unit cannot be simulated and is skipped.
pub trait ContextBuilder: Send + Sync {
    fn build(
        &self,
        run: &Context,
        peer: &Context,
        config: &AppConfig,
    ) -> Result<Option<Context>, RunnerError>;
}

/// Merges the run definition with the peer, peer values winning.
///
/// The unit directory is `<work_dir>/<run name>/<site>`, where the site is
/// the peer's `id` or, failing that, a name derived from its `lat`/`lng`.
/// Units missing any of the required keys are skipped.
#[derive(Debug, Clone)]
pub struct MergeContextBuilder {
    required: Vec<String>,
}

impl MergeContextBuilder {
    /// Requires only a `template`.
    pub fn new() -> Self {
        Self {
            required: vec!["template".to_string()],
        }
    }

    /// Also require `key` in every context.
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }
}

impl Default for MergeContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder for MergeContextBuilder {
    fn build(
        &self,
        run: &Context,
        peer: &Context,
        config: &AppConfig,
    ) -> Result<Option<Context>, RunnerError> {
        let run_name = run
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RunnerError::MissingKey("name".to_string()))?;

        let mut context = run.clone();
        context.remove(SITES_KEY);
        context.extend(peer.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(missing) = self.required.iter().find(|key| !context.contains_key(*key)) {
            debug!(run = %run_name, key = %missing, "Context incomplete, skipping unit");
            return Ok(None);
        }

        let Some(site) = site_dir(peer) else {
            debug!(run = %run_name, "Peer has neither id nor coordinates, skipping unit");
            return Ok(None);
        };

        let dir = config.work_dir.join(run_name).join(site);
        context.insert(
            CONTEXT_WORK_DIR.to_string(),
            Value::String(dir.to_string_lossy().into_owned()),
        );

        Ok(Some(context))
    }
}

/// Directory name of a site.
fn site_dir(peer: &Context) -> Option<String> {
    match peer.get("id") {
        Some(Value::String(id)) if !id.is_empty() => return Some(id.clone()),
        Some(Value::Number(id)) => return Some(id.to_string()),
        _ => {}
    }

    let lat = peer.get("lat").and_then(Value::as_f64)?;
    let lng = peer.get("lng").and_then(Value::as_f64)?;
    Some(format!(
        "{}_{}",
        coordinate(lat, 'N', 'S'),
        coordinate(lng, 'E', 'W')
    ))
}

/// `12.5` → `12_5N`, `-3.25` → `3_25S`.
fn coordinate(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let digits = format!("{:.4}", value.abs());
    let digits = digits.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", digits.replace('.', "_"), hemisphere)
}

/// Sites of a run definition, capped at `sample` when set.
///
/// Entries that are not objects are ignored.
pub fn peers(run: &Context, sample: Option<usize>) -> Vec<Context> {
    let Some(sites) = run.get(SITES_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    sites
        .iter()
        .filter_map(|site| match site {
            Value::Object(site) => Some(site.clone()),
            other => {
                warn!(site = %other, "Ignoring site that is not an object");
                None
            }
        })
        .take(sample.unwrap_or(usize::MAX))
        .collect()
}

/// Builds one unit's context and notifies `unit_success` or `unit_skipped`.
///
/// Returns the context as left by the handlers.
pub fn build_unit(
    builder: &dyn ContextBuilder,
    inputs: UnitInputs,
    config: &mut AppConfig,
    dispatcher: &HookDispatcher,
) -> Result<Option<Context>, RunnerError> {
    match builder.build(&inputs.run, &inputs.peer, config)? {
        Some(context) => {
            let mut payload = UnitSuccess { context, inputs };
            dispatcher.notify(&mut payload, config)?;
            Ok(Some(payload.context))
        }
        None => {
            dispatcher.notify(&mut UnitSkipped { inputs }, config)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use harvest_plugin::hooks::registry::{HookRegistrar, HookRegistry};
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            work_dir: PathBuf::from("/work"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_merge_peer_wins_and_sets_work_dir() {
        let run = object(json!({
            "name": "maize",
            "template": "MZX.tmpl",
            "pdate": 100,
            "sites": [{"lat": 1.0, "lng": 2.0}]
        }));
        let peer = object(json!({"id": "site-7", "pdate": 120}));

        let context = MergeContextBuilder::new()
            .build(&run, &peer, &config())
            .expect("build")
            .expect("complete");

        assert_eq!(context["pdate"], json!(120));
        assert!(!context.contains_key("sites"));
        assert_eq!(
            context[CONTEXT_WORK_DIR],
            json!(PathBuf::from("/work/maize/site-7").to_string_lossy())
        );
    }

    #[test]
    fn test_incomplete_context_is_skipped() {
        let run = object(json!({"name": "maize"}));
        let peer = object(json!({"lat": 1.0, "lng": 2.0}));

        let built = MergeContextBuilder::new()
            .build(&run, &peer, &config())
            .expect("build");
        assert!(built.is_none());

        let run = object(json!({"name": "maize", "template": "t"}));
        let built = MergeContextBuilder::new()
            .require("soilFiles")
            .build(&run, &peer, &config())
            .expect("build");
        assert!(built.is_none());
    }

    #[test]
    fn test_unnamed_run_is_an_error() {
        let err = MergeContextBuilder::new()
            .build(&Context::new(), &Context::new(), &config())
            .expect_err("name required");
        assert!(matches!(err, RunnerError::MissingKey(ref key) if key == "name"));
    }

    #[test]
    fn test_site_dir_from_coordinates() {
        assert_eq!(
            site_dir(&object(json!({"lat": 12.5, "lng": -3.25}))),
            Some("12_5N_3_25W".to_string())
        );
        assert_eq!(
            site_dir(&object(json!({"lat": -10.0, "lng": 0.0}))),
            Some("10S_0E".to_string())
        );
        assert_eq!(site_dir(&object(json!({"id": 42}))), Some("42".to_string()));
        assert_eq!(site_dir(&object(json!({"lat": 1.0}))), None);
    }

    #[test]
    fn test_peers_sampled() {
        let run = object(json!({"sites": [{"id": "a"}, 5, {"id": "b"}, {"id": "c"}]}));
        assert_eq!(peers(&run, None).len(), 3);
        let sampled = peers(&run, Some(2));
        assert_eq!(sampled.len(), 2);
        assert_eq!(sampled[1]["id"], json!("b"));
        assert!(peers(&Context::new(), None).is_empty());
    }

    #[test]
    fn test_build_unit_notifies_and_keeps_mutations() {
        let mut registry = HookRegistry::new();
        let mut hooks = HookRegistrar::new(&mut registry, "tagger");
        hooks.register(|p: &mut UnitSuccess, _: &mut AppConfig| {
            p.context.insert("tagged".to_string(), json!(true));
            Ok(())
        });
        hooks.register(|_: &mut UnitSkipped, config: &mut AppConfig| {
            config.set_extra_value("skipped", json!(true));
            Ok(())
        });
        let dispatcher = HookDispatcher::new(Arc::new(registry));
        let mut config = config();

        let inputs = UnitInputs {
            run: object(json!({"name": "maize", "template": "t"})),
            peer: object(json!({"id": "s1"})),
        };
        let context = build_unit(&MergeContextBuilder::new(), inputs, &mut config, &dispatcher)
            .expect("build")
            .expect("complete");
        assert_eq!(context["tagged"], json!(true));
        assert!(config.extra_value("skipped").is_none());

        let inputs = UnitInputs {
            run: object(json!({"name": "maize"})),
            peer: object(json!({"id": "s1"})),
        };
        let skipped = build_unit(&MergeContextBuilder::new(), inputs, &mut config, &dispatcher)
            .expect("build");
        assert!(skipped.is_none());
        assert_eq!(config.extra_value("skipped"), Some(&json!(true)));
    }
}
