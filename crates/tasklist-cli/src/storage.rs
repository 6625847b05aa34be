use std::path::{Path, PathBuf};

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use tasklist_storage::JsonFileStore;
use tracing::debug;

const TASK_FILE: &str = "tasks.json";

/// Resolve the default data directory for tasklist.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("tasklist"))
}

/// Pick the task file: explicit flag first, then config, then the data dir.
pub fn task_file(config: &Config, flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.data_file {
        return Ok(path.clone());
    }
    Ok(default_data_dir()?.join(TASK_FILE))
}

/// Build the JSON file store for the resolved task file.
pub fn store_from_config(config: &Config, flag: Option<&Path>) -> Result<JsonFileStore> {
    let path = task_file(config, flag)?;
    debug!(?path, "using task file");
    Ok(JsonFileStore::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_config() {
        let config = Config {
            data_file: Some(PathBuf::from("/from/config.json")),
            default_sort: None,
        };
        let path = task_file(&config, Some(Path::new("/from/flag.json"))).expect("path");
        assert_eq!(path, PathBuf::from("/from/flag.json"));

        let path = task_file(&config, None).expect("path");
        assert_eq!(path, PathBuf::from("/from/config.json"));
    }

    #[test]
    fn store_backup_follows_resolved_path() {
        let config = Config::default();
        let store = store_from_config(&config, Some(Path::new("/tmp/t.json"))).expect("store");
        assert_eq!(store.backup_path(), Path::new("/tmp/t.json.bak"));
    }
}
