//! Hot reload of the logging configuration file.
//!
//! The watcher observes the file's parent directory (editors often replace
//! files instead of writing them in place) and only reacts to events on a
//! path with the config file's name. Bursts of events are coalesced before
//! the file is read again. A file that fails to load leaves the previous
//! configuration in force.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::config::{LogConfig, LogConfigError};

/// Quiet period before a burst of file events triggers a reload.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Installs a freshly loaded configuration.
pub trait ApplyLogConfig: Send + Sync {
    fn apply(&self, config: &LogConfig) -> Result<(), LogConfigError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Created,
    Modified,
}

impl Change {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
        }
    }
}

enum WatchMsg {
    Fs(Event),
    Stop,
}

struct Running {
    // Dropped before the thread is joined so no further events arrive.
    watcher: Option<RecommendedWatcher>,
    tx: Sender<WatchMsg>,
    thread: Option<JoinHandle<()>>,
}

struct Shared {
    path: PathBuf,
    applier: Arc<dyn ApplyLogConfig>,
    current: Mutex<Option<LogConfig>>,
}

impl Shared {
    fn reload(&self) -> Result<(), LogConfigError> {
        let config = LogConfig::load(&self.path)?;
        self.applier.apply(&config)?;
        *self.current.lock() = Some(config);
        Ok(())
    }

    fn reload_logged(&self, change: Change) {
        match self.reload() {
            Ok(()) => tracing::info!(
                "{} {}.  Reloading log configuration.",
                self.path.display(),
                change.as_str()
            ),
            Err(e) => tracing::error!(
                "Could not reload config file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

pub struct LogConfigWatcher {
    shared: Arc<Shared>,
    debounce: Duration,
    running: Option<Running>,
}

impl LogConfigWatcher {
    pub fn new(path: impl Into<PathBuf>, applier: Arc<dyn ApplyLogConfig>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.into(),
                applier,
                current: Mutex::new(None),
            }),
            debounce: DEFAULT_DEBOUNCE,
            running: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Last configuration that loaded and applied cleanly.
    pub fn current(&self) -> Option<LogConfig> {
        self.shared.current.lock().clone()
    }

    /// Load the file, apply it, and start watching for changes.
    ///
    /// Returns `Ok(false)` when already running or when the file does not
    /// exist (nothing is watched in that case).
    pub fn start(&mut self) -> Result<bool, LogConfigError> {
        if self.running.is_some() {
            return Ok(false);
        }
        let path = self.shared.path.clone();
        if !path.is_file() {
            tracing::warn!(
                "Could not open {} for reading. Logging will use default thresholds.",
                path.display()
            );
            return Ok(false);
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = unbounded();
        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(WatchMsg::Fs(event));
            }
            Err(e) => tracing::warn!(error = %e, "log config watch error"),
        })
        .map_err(|source| LogConfigError::Watch {
            path: dir.clone(),
            source,
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| LogConfigError::Watch {
                path: dir.clone(),
                source,
            })?;

        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        let thread = std::thread::Builder::new()
            .name("log-config-watcher".into())
            .spawn(move || watch_loop(&shared, &rx, debounce))
            .map_err(|e| LogConfigError::Apply(format!("could not spawn watcher thread: {e}")))?;

        self.running = Some(Running {
            watcher: Some(watcher),
            tx,
            thread: Some(thread),
        });

        tracing::debug!(path = %path.display(), dir = %dir.display(), "watching log configuration");
        tracing::info!("Loading log configuration.");
        if let Err(e) = self.reload_now() {
            tracing::error!("Could not reload config file {}: {}", path.display(), e);
        }
        Ok(true)
    }

    /// Read and apply the file immediately.
    pub fn reload_now(&self) -> Result<(), LogConfigError> {
        self.shared.reload()
    }

    /// Stop watching. Safe to call when not running; `start` may be called
    /// again afterwards.
    pub fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        drop(running.watcher.take());
        let _ = running.tx.send(WatchMsg::Stop);
        if let Some(thread) = running.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("log config watcher thread panicked");
        }
        tracing::debug!(path = %self.shared.path.display(), "stopped watching log configuration");
    }
}

impl Drop for LogConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify(event: &Event, file_name: &std::ffi::OsStr) -> Option<Change> {
    let change = match event.kind {
        EventKind::Create(_) => Change::Created,
        EventKind::Modify(_) => Change::Modified,
        _ => return None,
    };
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name))
        .then_some(change)
}

fn watch_loop(shared: &Shared, rx: &Receiver<WatchMsg>, debounce: Duration) {
    let Some(file_name) = shared.path.file_name().map(|n| n.to_os_string()) else {
        return;
    };
    // First change of the current burst and when the burst goes quiet.
    let mut pending: Option<(Change, Instant)> = None;

    loop {
        let msg = match pending {
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(_) => return,
            },
            Some((change, deadline)) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(msg) => msg,
                    Err(RecvTimeoutError::Timeout) => {
                        pending = None;
                        shared.reload_logged(change);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        };

        match msg {
            WatchMsg::Stop => return,
            WatchMsg::Fs(event) => {
                if let Some(change) = classify(&event, &file_name) {
                    let first = pending.map_or(change, |(c, _)| c);
                    pending = Some((first, Instant::now() + debounce));
                }
            }
        }
    }
}
