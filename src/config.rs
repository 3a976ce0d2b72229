//! Layered configuration, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env`)
//! 3. TOML config file (`~/.config/taskflow/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that cannot be read is.

use std::path::{Path, PathBuf};

use crate::models::{Priority, DEFAULT_CATEGORY};
use crate::recurrence::ExpansionLimits;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    defaults: DefaultsFileConfig,
    recurrence: RecurrenceFileConfig,
    log: LogFileConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DefaultsFileConfig {
    category: Option<String>,
    priority: Option<Priority>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RecurrenceFileConfig {
    max_iterations: Option<u32>,
    max_instances: Option<usize>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LogFileConfig {
    level: Option<String>,
    file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Flags shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Path to config file (default: `~/.config/taskflow/config.toml`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the tasks database file
    #[arg(long, global = true, env = "TASKFLOW_DB")]
    pub db: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TASKFLOW_LOG")]
    pub log_level: Option<String>,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where `tasks.json` lives; `categories.json` sits next to it.
    pub tasks_path: PathBuf,
    /// Category used when an added task does not name one.
    pub default_category: String,
    pub default_priority: Priority,
    /// Bounds for recurring task expansion.
    pub limits: ExpansionLimits,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            tasks_path: dir.join("tasks.json"),
            default_category: DEFAULT_CATEGORY.to_string(),
            default_priority: Priority::Medium,
            limits: ExpansionLimits::default(),
            log_level: "info".to_string(),
            log_file: dir.join("taskflow.log"),
        }
    }
}

impl Config {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or any config file cannot be parsed.
    pub fn load(args: &GlobalArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(args.config.as_deref())?;
        Ok(Self::resolve(args, &file))
    }

    /// Priority: CLI/env > file > default.
    fn resolve(args: &GlobalArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            tasks_path: args
                .db
                .clone()
                .or_else(|| file.storage.path.clone())
                .unwrap_or(defaults.tasks_path),
            default_category: file
                .defaults
                .category
                .clone()
                .unwrap_or(defaults.default_category),
            default_priority: file.defaults.priority.unwrap_or(defaults.default_priority),
            limits: ExpansionLimits {
                max_iterations: file
                    .recurrence
                    .max_iterations
                    .unwrap_or(defaults.limits.max_iterations),
                max_instances: file
                    .recurrence
                    .max_instances
                    .unwrap_or(defaults.limits.max_instances),
            },
            log_level: args
                .log_level
                .clone()
                .or_else(|| file.log.level.clone())
                .unwrap_or(defaults.log_level),
            log_file: args
                .log_file
                .clone()
                .or_else(|| file.log.file.clone())
                .unwrap_or(defaults.log_file),
        }
    }
}

/// `~/.local/share/taskflow` on Linux, `./` when no data dir is known.
fn data_dir() -> PathBuf {
    let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("taskflow");
    p
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskflow").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.default_category, "Personal");
        assert_eq!(config.limits, ExpansionLimits { max_iterations: 365, max_instances: 30 });
        assert!(config.tasks_path.ends_with("taskflow/tasks.json"));
    }

    #[test]
    fn toml_parsing_full() {
        let toml_str = r#"
[storage]
path = "/tmp/tf/tasks.json"

[defaults]
category = "Work"
priority = "high"

[recurrence]
max_iterations = 730
max_instances = 52

[log]
level = "debug"
file = "/tmp/tf/tf.log"
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let config = Config::resolve(&GlobalArgs::default(), &file);

        assert_eq!(config.tasks_path, PathBuf::from("/tmp/tf/tasks.json"));
        assert_eq!(config.default_category, "Work");
        assert_eq!(config.default_priority, Priority::High);
        assert_eq!(config.limits.max_iterations, 730);
        assert_eq!(config.limits.max_instances, 52);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file, PathBuf::from("/tmp/tf/tf.log"));
    }

    #[test]
    fn toml_parsing_partial() {
        let file: ConfigFile = toml::from_str("[recurrence]\nmax_instances = 10\n").unwrap();
        let config = Config::resolve(&GlobalArgs::default(), &file);

        assert_eq!(config.limits.max_instances, 10);
        assert_eq!(config.limits.max_iterations, 365); // default
        assert_eq!(config.default_category, "Personal"); // default
    }

    #[test]
    fn cli_overrides_file() {
        let file: ConfigFile = toml::from_str("[storage]\npath = \"/from/file.json\"\n[log]\nlevel = \"warn\"\n").unwrap();
        let args = GlobalArgs {
            db: Some(PathBuf::from("/from/cli.json")),
            ..Default::default()
        };
        let config = Config::resolve(&args, &file);

        assert_eq!(config.tasks_path, PathBuf::from("/from/cli.json"));
        assert_eq!(config.log_level, "warn"); // from file
    }

    #[test]
    fn unknown_priority_in_file_is_a_parse_error() {
        let result: Result<ConfigFile, _> = toml::from_str("[defaults]\npriority = \"urgent\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_missing_config_file_returns_error() {
        let result = load_config_file(Some(Path::new("/nonexistent/taskflow.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
