//! Configuration parsing for LoopList.
//!
//! Plain `key=value` lines; `#` starts a comment and values may be quoted.
//! Precedence: CLI flags > `--config` file > `.looplist/config` > defaults.

use crate::types::StreakPolicy;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Workspace-local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = ".looplist/config";

/// Number of loops returned by trending queries.
pub const DEFAULT_TRENDING_LIMIT: usize = 6;

/// Chance that a generated demo check-in is completed.
pub const DEFAULT_SEED_COMPLETION_RATE: f64 = 0.8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid config line: {0}")]
    InvalidLine(String),
    #[error("invalid boolean value for {key}: {value}")]
    InvalidBool { key: String, value: String },
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
    #[error("invalid number for {key}: {value} (expected 0.0 to 1.0)")]
    InvalidRate { key: String, value: String },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the snapshot.
    pub db_path: PathBuf,
    /// User id to act as when none is given on the command line.
    pub user: Option<String>,
    pub trending_limit: usize,
    pub streak_policy: StreakPolicy,
    /// Install the demo loops when the store is empty.
    pub seed_demo_data: bool,
    pub seed_completion_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user: None,
            trending_limit: DEFAULT_TRENDING_LIMIT,
            streak_policy: StreakPolicy::Legacy,
            seed_demo_data: true,
            seed_completion_rate: DEFAULT_SEED_COMPLETION_RATE,
        }
    }
}

/// `~/.local/share/looplist/looplist.db` or the platform equivalent.
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("looplist")
        .join("looplist.db")
}

impl Config {
    /// Defaults, then `<workspace_root>/.looplist/config` when present, then
    /// `explicit` when given. Relative paths resolve against `workspace_root`.
    pub fn load(workspace_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let local = workspace_root.join(LOCAL_CONFIG_PATH);
        if local.is_file() {
            config.load_file(&local)?;
        }
        if let Some(path) = explicit {
            config.load_file(path)?;
        }
        config.resolve_paths(workspace_root);
        Ok(config)
    }

    /// Load and merge values from a config file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    /// Parse config content (key=value format).
    fn parse_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine(line.to_string()));
            };

            let key = key.trim();
            let value = Self::unquote(value.trim());

            self.apply_value(key, &value)?;
        }
        Ok(())
    }

    /// Remove surrounding quotes from a value.
    fn unquote(value: &str) -> String {
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }
        value.to_string()
    }

    /// Apply a single config value.
    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "db_path" => self.db_path = PathBuf::from(value),
            "user" => {
                self.user = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "trending_limit" => {
                self.trending_limit = value.parse().map_err(|_| ConfigError::InvalidInt {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "streak_policy" => {
                self.streak_policy = value.parse().map_err(ConfigError::InvalidLine)?;
            }
            "seed_demo_data" => self.seed_demo_data = Self::parse_bool(key, value)?,
            "seed_completion_rate" => {
                self.seed_completion_rate = Self::parse_rate(key, value)?;
            }
            _ => {
                // Unknown keys are tolerated so older binaries can read newer files.
                eprintln!("Warning: unknown config key: {key}");
            }
        }
        Ok(())
    }

    fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "on" => Ok(true),
            "false" | "0" | "no" | "n" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    fn parse_rate(key: &str, value: &str) -> Result<f64, ConfigError> {
        value
            .parse::<f64>()
            .ok()
            .filter(|rate| (0.0..=1.0).contains(rate))
            .ok_or_else(|| ConfigError::InvalidRate {
                key: key.to_string(),
                value: value.to_string(),
            })
    }

    /// Resolve relative paths against a workspace root.
    pub fn resolve_paths(&mut self, workspace_root: &Path) {
        if self.db_path.is_relative() {
            self.db_path = workspace_root.join(&self.db_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.trending_limit, 6);
        assert_eq!(config.streak_policy, StreakPolicy::Legacy);
        assert!(config.seed_demo_data);
        assert!((config.seed_completion_rate - 0.8).abs() < f64::EPSILON);
        assert!(config.user.is_none());
        assert!(config.db_path.ends_with("looplist/looplist.db"));
    }

    #[test]
    fn parse_simple_config() {
        let mut config = Config::default();
        let content = r#"
# local overrides
user="1"
trending_limit=10
streak_policy=consecutive
seed_demo_data=off
seed_completion_rate=0.5
"#;
        config.parse_content(content).unwrap();
        assert_eq!(config.user.as_deref(), Some("1"));
        assert_eq!(config.trending_limit, 10);
        assert_eq!(config.streak_policy, StreakPolicy::Consecutive);
        assert!(!config.seed_demo_data);
        assert!((config.seed_completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unquote_removes_quotes() {
        assert_eq!(Config::unquote("\"hello\""), "hello");
        assert_eq!(Config::unquote("'world'"), "world");
        assert_eq!(Config::unquote("noquotes"), "noquotes");
    }

    #[test]
    fn parse_bool_accepts_variants() {
        assert!(Config::parse_bool("test", "true").unwrap());
        assert!(Config::parse_bool("test", "yes").unwrap());
        assert!(!Config::parse_bool("test", "0").unwrap());
        assert!(!Config::parse_bool("test", "off").unwrap());
        assert!(Config::parse_bool("test", "maybe").is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.parse_content("trending_limit=lots").is_err());
        assert!(config.parse_content("streak_policy=generous").is_err());
        assert!(config.parse_content("seed_completion_rate=1.5").is_err());
        assert!(config.parse_content("just a line").is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut config = Config::default();
        config.parse_content("theme=dark").unwrap();
        assert_eq!(config.trending_limit, DEFAULT_TRENDING_LIMIT);
    }

    #[test]
    fn load_merges_local_then_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".looplist")).unwrap();
        std::fs::write(
            dir.path().join(LOCAL_CONFIG_PATH),
            "db_path=data/loops.db\ntrending_limit=3\n",
        )
        .unwrap();
        let explicit = dir.path().join("override.conf");
        std::fs::write(&explicit, "trending_limit=8\n").unwrap();

        let config = Config::load(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.trending_limit, 8);
        assert_eq!(config.db_path, dir.path().join("data/loops.db"));
    }

    #[test]
    fn load_without_files_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.trending_limit, DEFAULT_TRENDING_LIMIT);
        assert!(config.db_path.is_absolute() || config.db_path.starts_with(dir.path()));
    }
}
