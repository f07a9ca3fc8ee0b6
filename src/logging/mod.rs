//! Logging setup.
//!
//! Every module logs through `tracing` macros; a module's target (its path,
//! e.g. `es_semantic::corpus`) is its logger name. Formatting of the message
//! is deferred until an enabled subscriber records it.
//!
//! Thresholds come from a YAML file (see [`config`]) when it exists, then
//! `RUST_LOG`, then `info`. The file is watched and reloaded while the
//! process runs; output format and the optional file sink are read once at
//! startup.

pub mod config;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

pub use config::{LogConfig, LogConfigError, LogFormat, LogLevel, normalize_target};
pub use watcher::{ApplyLogConfig, LogConfigWatcher};

use crate::config::DEFAULT_LOG_CONFIG;

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub config_path: PathBuf,
    /// A path the user asked for; a missing file is warned about.
    pub explicit: bool,
    pub watch: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_LOG_CONFIG),
            explicit: false,
            watch: true,
        }
    }
}

impl LoggingOptions {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(config_path) => Self {
                config_path,
                explicit: true,
                ..Self::default()
            },
            None => Self::default(),
        }
    }
}

/// Keeps the watcher thread and the file writer alive.
pub struct LoggingGuard {
    watcher: Option<LogConfigWatcher>,
    _appender: Option<WorkerGuard>,
}

impl LoggingGuard {
    pub fn watcher(&self) -> Option<&LogConfigWatcher> {
        self.watcher.as_ref()
    }
}

struct FilterReloader(reload::Handle<EnvFilter, Registry>);

impl ApplyLogConfig for FilterReloader {
    fn apply(&self, config: &LogConfig) -> Result<(), LogConfigError> {
        let filter = config.to_filter()?;
        self.0
            .reload(filter)
            .map_err(|e| LogConfigError::Apply(e.to_string()))
    }
}

fn env_or_default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .with_context(|| format!("log file path {} has no file name", path.display()))?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(&dir, name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber and start watching the config file.
pub fn init(options: &LoggingOptions) -> Result<LoggingGuard> {
    let path = &options.config_path;
    let (file_config, load_error) = if path.is_file() {
        match LogConfig::load(path) {
            Ok(config) => (Some(config), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let (filter, filter_error) = match file_config.as_ref().map(LogConfig::to_filter) {
        Some(Ok(filter)) => (filter, None),
        Some(Err(e)) => (env_or_default_filter(), Some(e)),
        None => (env_or_default_filter(), None),
    };
    let format = file_config.as_ref().map(|c| c.format).unwrap_or_default();

    let (writer, appender_guard) = match file_config.as_ref().and_then(|c| c.file.as_deref()) {
        Some(file) => {
            let (writer, guard) = file_writer(file)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };
    let file_layer = writer.map(|w| fmt::layer().with_writer(w).with_ansi(false));

    let (filter_layer, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer);
    match format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Full => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .try_init(),
    }
    .context("installing tracing subscriber")?;

    // A started watcher reloads the file and reports the same error itself.
    if !options.watch
        && let Some(e) = load_error.or(filter_error)
    {
        tracing::error!("Could not load config file {}: {}", path.display(), e);
    }

    let mut watcher = LogConfigWatcher::new(path.clone(), Arc::new(FilterReloader(handle)));
    if options.watch {
        if !options.explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no log configuration file");
        } else if let Err(e) = watcher.start() {
            tracing::warn!(error = %e, "log configuration will not be reloaded");
        }
    }

    Ok(LoggingGuard {
        watcher: Some(watcher),
        _appender: appender_guard,
    })
}

/// Log `err` with its cause chain and the calling location.
#[track_caller]
pub fn log_error(err: &anyhow::Error) {
    let caller = std::panic::Location::caller();
    tracing::error!(
        caller = %format_args!("{}:{}", caller.file(), caller.line()),
        "{}:{} raised: {:#}",
        caller.file(),
        caller.line(),
        err
    );
}
