//! Logging configuration file.
//!
//! ```yaml
//! version: 1              # accepted and ignored
//! root:
//!   level: info
//! loggers:
//!   es_semantic.search: debug     # dotted names become es_semantic::search
//!   reqwest:
//!     level: warn
//! format: compact         # compact | full | json (startup only)
//! file: logs/essearch.log # optional extra sink (startup only)
//! ```
//!
//! A `.json` file is read in the legacy form
//! `{"level": "DBGX", "debugFlags": [{"pkg": "name"}]}`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LogConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown log level '{0}'")]
    Level(String),

    #[error("invalid filter directives '{directives}': {message}")]
    Filter { directives: String, message: String },

    #[error("could not watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("could not apply log configuration: {0}")]
    Apply(String),
}

/// Severity threshold. Accepts the usual spellings from other ecosystems
/// (`warning`, `critical`, `notset`, `DBGX`, `ERR`), case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" | "notset" => Ok(Self::Trace),
            "debug" | "dbgx" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "err" | "critical" | "fatal" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            _ => Err(LogConfigError::Level(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = LogConfigError;

    fn try_from(value: String) -> Result<Self, LogConfigError> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub level: LogLevel,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

/// `name: debug` or `name: {level: debug}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LoggerConfig {
    Level(LogLevel),
    Table {
        #[serde(default)]
        level: Option<LogLevel>,
    },
}

impl LoggerConfig {
    pub fn level(&self) -> Option<LogLevel> {
        match self {
            Self::Level(level) => Some(*level),
            Self::Table { level } => *level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub root: RootConfig,
    pub loggers: BTreeMap<String, LoggerConfig>,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

/// Logger names may use dots (`a.b.c`); tracing targets use `::`.
pub fn normalize_target(name: &str) -> String {
    name.trim().replace('.', "::").replace('-', "_")
}

impl LogConfig {
    /// Read `path`, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, LogConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| LogConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_logit_json(&content).map_err(|source| LogConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        } else {
            Self::from_yaml(&content).map_err(|source| LogConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Translate the legacy JSON form.
    ///
    /// `DBGX` maps to debug, `ERR` to error, anything unrecognised to debug.
    /// Each `debugFlags[].pkg` other than `main` becomes a logger at the
    /// root level.
    pub fn from_logit_json(content: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Logit {
            level: Option<String>,
            #[serde(rename = "debugFlags", default)]
            debug_flags: Vec<DebugFlag>,
        }

        #[derive(Deserialize)]
        struct DebugFlag {
            pkg: String,
        }

        let logit: Logit = serde_json::from_str(content)?;
        let mut config = Self::default();
        if let Some(level) = logit.level {
            config.root.level = match level.as_str() {
                "DBGX" | "DEBUG" => LogLevel::Debug,
                "INFO" => LogLevel::Info,
                "WARN" => LogLevel::Warn,
                "ERR" => LogLevel::Error,
                _ => LogLevel::Debug,
            };
        }
        for flag in logit.debug_flags {
            if flag.pkg != "main" {
                config
                    .loggers
                    .entry(flag.pkg)
                    .or_insert(LoggerConfig::Level(config.root.level));
            }
        }
        Ok(config)
    }

    /// `EnvFilter` directive string: root level first, then one
    /// `target=level` per logger that sets a level.
    pub fn directives(&self) -> String {
        let mut parts = vec![self.root.level.to_string()];
        for (name, logger) in &self.loggers {
            let target = normalize_target(name);
            if target.is_empty() {
                continue;
            }
            if let Some(level) = logger.level() {
                parts.push(format!("{target}={level}"));
            }
        }
        parts.join(",")
    }

    pub fn to_filter(&self) -> Result<EnvFilter, LogConfigError> {
        let directives = self.directives();
        EnvFilter::try_new(&directives).map_err(|e| LogConfigError::Filter {
            message: e.to_string(),
            directives,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_yaml() {
        let yaml = r#"
version: 1
root:
  level: WARNING
loggers:
  es_semantic.search: debug
  reqwest:
    level: error
  hyper: {}
format: json
file: logs/out.log
handlers:
  console: {class: logging.StreamHandler}
"#;
        let cfg = LogConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.root.level, LogLevel::Warn);
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.file.as_deref(), Some(Path::new("logs/out.log")));
        assert_eq!(
            cfg.directives(),
            "warn,es_semantic::search=debug,reqwest=error"
        );
        assert!(cfg.to_filter().is_ok());
    }

    #[test]
    fn empty_yaml_is_default() {
        let cfg = LogConfig::from_yaml("  \n").unwrap();
        assert_eq!(cfg, LogConfig::default());
        assert_eq!(cfg.directives(), "info");
    }

    #[test]
    fn bad_level_is_rejected() {
        let err = LogConfig::from_yaml("root:\n  level: loud\n").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn level_from_owned_string() {
        assert_eq!(LogLevel::try_from("Error".to_string()).unwrap(), LogLevel::Error);
        assert!(LogLevel::try_from("loud".to_string()).is_err());
    }

    #[test]
    fn level_spellings() {
        for (input, level) in [
            ("NOTSET", LogLevel::Trace),
            ("dbgx", LogLevel::Debug),
            ("Info", LogLevel::Info),
            ("warning", LogLevel::Warn),
            ("CRITICAL", LogLevel::Error),
            ("off", LogLevel::Off),
        ] {
            assert_eq!(input.parse::<LogLevel>().unwrap(), level, "{input}");
        }
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn logit_json_translation() {
        let json = r#"{"level": "ERR", "debugFlags": [{"pkg": "main"}, {"pkg": "es_semantic.corpus"}]}"#;
        let cfg = LogConfig::from_logit_json(json).unwrap();
        assert_eq!(cfg.root.level, LogLevel::Error);
        assert_eq!(cfg.loggers.len(), 1);
        assert_eq!(cfg.directives(), "error,es_semantic::corpus=error");

        let cfg = LogConfig::from_logit_json(r#"{"level": "DBGX"}"#).unwrap();
        assert_eq!(cfg.root.level, LogLevel::Debug);

        let cfg = LogConfig::from_logit_json(r#"{"level": "CHATTY"}"#).unwrap();
        assert_eq!(cfg.root.level, LogLevel::Debug);
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("logging.yaml");
        std::fs::write(&yaml, "root:\n  level: debug\n").unwrap();
        assert_eq!(LogConfig::load(&yaml).unwrap().root.level, LogLevel::Debug);

        let json = dir.path().join("logitcfg.json");
        std::fs::write(&json, r#"{"level": "WARN"}"#).unwrap();
        assert_eq!(LogConfig::load(&json).unwrap().root.level, LogLevel::Warn);

        let missing = LogConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, LogConfigError::Io { .. }));
    }

    #[test]
    fn normalizes_dotted_names() {
        assert_eq!(normalize_target("src.dataset.search"), "src::dataset::search");
        assert_eq!(normalize_target("es-semantic"), "es_semantic");
    }
}
