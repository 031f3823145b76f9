use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::database::{database_path, DatabaseOptions, EngineTuning};

/// Default database name
pub const DEFAULT_DATABASE_NAME: &str = "sqlite_tables";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqltConfig {
    /// Directory holding the database file
    pub data_dir: String,

    /// Database name; the file is `<data_dir>/<database_name>.db`
    pub database_name: String,

    /// Verbose diagnostics and table statistics on connect
    pub debug_mode: bool,

    /// Optional `PRAGMA journal_mode`
    pub journal_mode: Option<String>,

    /// Optional `PRAGMA synchronous`
    pub synchronous: Option<String>,

    /// Optional `PRAGMA cache_size`
    pub cache_size: Option<i64>,

    /// Enforce foreign keys
    pub foreign_keys: bool,
}

const EMPTY_CONFIG: &str = r#"### sqlt configuration file

### directory holding the database file
# data_dir = "~/.sqlt"

### database name, stored as <data_dir>/<database_name>.db
# database_name = "sqlite_tables"

### verbose logging and table statistics on connect
# debug_mode = false

### engine tuning (left at SQLite defaults when unset)
# journal_mode = "WAL"
# synchronous = "NORMAL"
# cache_size = 2000
# foreign_keys = false
"#;

fn home_dir_string() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl Default for SqltConfig {
    fn default() -> Self {
        Self {
            data_dir: format!("{}/.sqlt", home_dir_string()),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            debug_mode: false,
            journal_mode: None,
            synchronous: None,
            cache_size: None,
            foreign_keys: false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SqltConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<SqltConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.sqlt/sqlt.toml as the configuration file path
        let sqlt_dir = format!("{}/.sqlt", home_dir_string());

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(sqlt_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create sqlt directory: {}", e))?;
                let p = format!("{}/sqlt.toml", sqlt_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of SQLT)
        // E.g., `SQLT_DEBUG_MODE=true ./sqlt status` turns on debug mode
        builder = builder.add_source(config::Environment::with_prefix("SQLT"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Build a configuration from already-flattened key/value settings
    pub fn from_map(config: &HashMap<String, String>) -> Result<SqltConfig> {
        let defaults = SqltConfig::default();

        let data_dir = match non_empty(config.get("data_dir")) {
            Some(dir) => expand_home(&dir),
            None => defaults.data_dir,
        };

        let database_name =
            non_empty(config.get("database_name")).unwrap_or(defaults.database_name);

        let debug_mode = match config.get("debug_mode") {
            Some(v) => parse_bool(v)
                .ok_or_else(|| anyhow!("debug_mode must be true or false, got '{}'", v))?,
            None => defaults.debug_mode,
        };

        let cache_size = match non_empty(config.get("cache_size")) {
            Some(v) => Some(
                v.parse::<i64>()
                    .map_err(|e| anyhow!("cache_size must be an integer: {}", e))?,
            ),
            None => None,
        };

        let foreign_keys = config
            .get("foreign_keys")
            .and_then(|v| parse_bool(v))
            .unwrap_or(defaults.foreign_keys);

        Ok(SqltConfig {
            data_dir,
            database_name,
            debug_mode,
            journal_mode: non_empty(config.get("journal_mode")),
            synchronous: non_empty(config.get("synchronous")),
            cache_size,
            foreign_keys,
        })
    }

    /// Get the path to the database file
    pub fn database_path(&self) -> PathBuf {
        database_path(Path::new(&self.data_dir), &self.database_name)
    }

    /// Options handed to the `DatabaseManager`
    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions::new(&self.data_dir, &self.database_name)
            .verbose(self.debug_mode)
            .with_tuning(EngineTuning {
                journal_mode: self.journal_mode.clone(),
                synchronous: self.synchronous.clone(),
                cache_size: self.cache_size,
                foreign_keys: self.foreign_keys,
            })
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Config File:        {}", Self::config_file_path()),
            format!("Data Directory:     {}", self.data_dir),
            format!("Database Path:      {}", self.database_path().display()),
            format!("Debug Mode:         {}", self.debug_mode),
        ];

        if let Some(mode) = &self.journal_mode {
            lines.push(format!("Journal Mode:       {}", mode));
        }
        if let Some(sync) = &self.synchronous {
            lines.push(format!("Synchronous:        {}", sync));
        }
        if let Some(size) = self.cache_size {
            lines.push(format!("Cache Size:         {}", size));
        }
        if self.foreign_keys {
            lines.push("Foreign Keys:       on".to_string());
        }

        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        format!("{}/.sqlt/sqlt.toml", home_dir_string())
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> String {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            format!("{}{}", home_dir_string(), rest)
        }
        _ => path.to_string(),
    }
}
