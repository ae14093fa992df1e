//! Run-list generation: finds the simulation input files under the work directory.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use harvest_core::config::{AppConfig, DssatConfig};
use harvest_plugin::hooks::definitions::RunUnit;

/// Prefix of batch files in batch run modes.
const BATCH_FILE_PREFIX: &str = "DSSBATCH";

/// Walks `config.work_dir` and returns one unit per matching input file.
///
/// An explicitly configured file name (`batch_file` in batch modes, `filex`
/// otherwise) must match exactly. Without one, batch modes pick files
/// starting with `DSSBATCH` and other modes pick files ending in `X`, both
/// case-insensitively. Directories are visited deepest first.
pub fn generate_run_list(config: &AppConfig) -> Vec<RunUnit> {
    let run_list = collect(&config.work_dir, &config.dssat);
    debug!(
        work_dir = %config.work_dir.display(),
        units = run_list.len(),
        "Run list generated"
    );
    run_list
}

fn collect(root: &Path, dssat: &DssatConfig) -> Vec<RunUnit> {
    let batch_mode = dssat.is_batch_mode();
    let target = dssat.target_file();

    WalkDir::new(root)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry in work directory");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let selected = match target {
                Some(target) => name == target,
                None if batch_mode => name.to_uppercase().starts_with(BATCH_FILE_PREFIX),
                None => name.to_uppercase().ends_with('X'),
            };
            if !selected {
                return None;
            }
            let dir = entry.path().parent()?.to_path_buf();
            Some(RunUnit::new(dir, name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, b"").expect("write");
    }

    fn config_for(root: &Path, run_mode: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.work_dir = root.to_path_buf();
        config.dssat.run_mode = run_mode.to_string();
        config
    }

    fn files(units: &[RunUnit]) -> Vec<String> {
        units.iter().map(|u| u.file.clone()).collect()
    }

    #[test]
    fn test_non_batch_mode_selects_x_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "maize/1/UFGA8201.MZX");
        touch(dir.path(), "maize/1/soil.SOL");
        touch(dir.path(), "maize/2/exp.mzx");
        touch(dir.path(), "maize/2/DSSBATCH.V48");

        let units = generate_run_list(&config_for(dir.path(), "a"));
        assert_eq!(files(&units), vec!["UFGA8201.MZX", "exp.mzx"]);
        assert_eq!(units[0].dir, dir.path().join("maize/1"));
    }

    #[test]
    fn test_batch_mode_selects_batch_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "1/DSSBATCH.V48");
        touch(dir.path(), "2/dssbatch.v48");
        touch(dir.path(), "2/UFGA8201.MZX");

        let units = generate_run_list(&config_for(dir.path(), "B"));
        assert_eq!(files(&units), vec!["DSSBATCH.V48", "dssbatch.v48"]);
    }

    #[test]
    fn test_explicit_target_matches_exactly() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "1/RUN.MZX");
        touch(dir.path(), "1/OTHER.MZX");
        touch(dir.path(), "2/run.mzx");

        let mut config = config_for(dir.path(), "A");
        config.dssat.filex = Some("RUN.MZX".to_string());
        // Ignored outside batch modes.
        config.dssat.batch_file = Some("OTHER.MZX".to_string());

        let units = generate_run_list(&config);
        assert_eq!(files(&units), vec!["RUN.MZX"]);
    }

    #[test]
    fn test_missing_work_dir_yields_empty_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let units = generate_run_list(&config_for(&dir.path().join("absent"), "A"));
        assert!(units.is_empty());
    }
}
