use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const CONFIG_FILE: &str = ".termfeed.json";

/// What to do when a fetch re-observes a post URL that is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the stored post untouched (posts are immutable once ingested).
    #[default]
    Ignore,
    /// Refresh title, description and publish date from the newer item.
    Update,
}

/// On-disk configuration, a JSON document in the user's home directory.
/// Rewritten whenever the logged-in user changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub db_url: String,
    #[serde(default)]
    pub current_user_name: Option<String>,
    #[serde(default)]
    pub duplicate_posts: DuplicatePolicy,
    #[serde(skip)]
    path: PathBuf,
}

impl Config {
    pub fn read() -> Result<Config, AppError> {
        Config::read_from(default_path()?)
    }

    pub fn read_from(path: PathBuf) -> Result<Config, AppError> {
        let data = fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        let mut config: Config = serde_json::from_str(&data).map_err(|e| {
            AppError::Config(format!("malformed config '{}': {e}", path.display()))
        })?;
        config.path = path;
        Ok(config)
    }

    /// Record `name` as the logged-in user and persist the change.
    pub fn set_user(&mut self, name: &str) -> Result<(), AppError> {
        self.current_user_name = Some(name.to_string());
        self.write()
    }

    pub fn write(&self) -> Result<(), AppError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("failed to serialize config: {e}")))?;
        fs::write(&self.path, data).map_err(|e| {
            AppError::Config(format!("failed to write '{}': {e}", self.path.display()))
        })
    }
}

fn default_path() -> Result<PathBuf, AppError> {
    let home = env::var("HOME").map_err(|_| AppError::Config("HOME is not set".to_string()))?;
    Ok(Path::new(&home).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_db_url_and_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"db_url": "termfeed.db", "current_user_name": "ada"}"#,
        );

        let config = Config::read_from(path).unwrap();
        assert_eq!(config.db_url, "termfeed.db");
        assert_eq!(config.current_user_name.as_deref(), Some("ada"));
        assert_eq!(config.duplicate_posts, DuplicatePolicy::Ignore);
    }

    #[test]
    fn duplicate_policy_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"db_url": "termfeed.db", "duplicate_posts": "update"}"#,
        );

        let config = Config::read_from(path).unwrap();
        assert_eq!(config.duplicate_posts, DuplicatePolicy::Update);
        assert_eq!(config.current_user_name, None);
    }

    #[test]
    fn set_user_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"db_url": "termfeed.db"}"#);

        let mut config = Config::read_from(path.clone()).unwrap();
        config.set_user("grace").unwrap();

        let reread = Config::read_from(path).unwrap();
        assert_eq!(reread.current_user_name.as_deref(), Some("grace"));
        assert_eq!(reread.db_url, "termfeed.db");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::read_from(dir.path().join(CONFIG_FILE));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "db_url = termfeed.db");
        let result = Config::read_from(path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
