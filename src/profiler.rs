//! Wall-time and memory profiling for a single call.
//!
//! ```rust,ignore
//! let profiler = Profiler::new().with_log_file("profile.log");
//! let report = profiler.run("embed_directory", || embed_directory(..))?;
//! ```
//!
//! Memory figures are deltas of the current process:
//! - RSS: resident set size
//! - VMS: virtual memory size

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sysinfo::{ProcessRefreshKind, System};

/// Target used for profiling events.
pub const PROFILER_TARGET: &str = "profiler";

/// Measurements from one profiled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileReport {
    pub name: String,
    pub elapsed: Duration,
    pub rss_delta: i64,
    pub vms_delta: i64,
}

impl ProfileReport {
    pub fn lines(&self) -> [String; 3] {
        [
            format!("Time & Memory Profiling Report for {}().", self.name),
            format!("Time : {}", format_elapsed(self.elapsed)),
            format!(
                "RSS  : {} VMS : {}",
                format_bytes(self.rss_delta),
                format_bytes(self.vms_delta)
            ),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct Profiler {
    log_file: Option<PathBuf>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every report to `path`. An empty path disables the file.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.log_file = (!path.as_os_str().is_empty()).then_some(path);
        self
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Run `f`, report its cost, and hand back its result.
    pub fn run<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let (value, report) = measure(name, f);
        self.report(&report);
        value
    }

    fn report(&self, report: &ProfileReport) {
        let lines = report.lines();
        for line in &lines {
            tracing::debug!(target: PROFILER_TARGET, "{line}");
        }

        if let Some(path) = &self.log_file
            && let Err(e) = append_report(path, &lines)
        {
            tracing::warn!(
                target: PROFILER_TARGET,
                path = %path.display(),
                error = %e,
                "could not write profiling report"
            );
        }
    }
}

/// Run `f` with the default profiler.
pub fn profile<T>(name: &str, f: impl FnOnce() -> T) -> T {
    Profiler::new().run(name, f)
}

/// Run `f` and return its result with the measurements.
pub fn measure<T>(name: &str, f: impl FnOnce() -> T) -> (T, ProfileReport) {
    let before = process_memory();
    let start = Instant::now();

    let value = f();

    let elapsed = start.elapsed();
    let after = process_memory();
    let (rss_delta, vms_delta) = match (before, after) {
        (Some((rss0, vms0)), Some((rss1, vms1))) => (delta(rss0, rss1), delta(vms0, vms1)),
        _ => (0, 0),
    };

    (
        value,
        ProfileReport {
            name: name.to_string(),
            elapsed,
            rss_delta,
            vms_delta,
        },
    )
}

fn delta(before: u64, after: u64) -> i64 {
    i64::try_from(after).unwrap_or(i64::MAX) - i64::try_from(before).unwrap_or(i64::MAX)
}

/// (rss, vms) of the current process in bytes.
fn process_memory() -> Option<(u64, u64)> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_process_specifics(pid, ProcessRefreshKind::new().with_memory());
    sys.process(pid)
        .map(|p| (p.memory(), p.virtual_memory()))
}

fn append_report(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
    let pid = std::process::id();
    for line in lines {
        writeln!(file, "DEBUG    | {now} | PID={pid} | {PROFILER_TARGET}: {line}")?;
    }
    Ok(())
}

/// Two decimals with trailing zeros dropped: `1.50` -> `1.5`, `3.00` -> `3`.
fn two_decimals(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `ms` below a second, then `s`, `min`, `hrs`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", two_decimals(secs * 1000.0))
    } else if secs < 60.0 {
        format!("{}s", two_decimals(secs))
    } else if secs < 3600.0 {
        format!("{}min", two_decimals(secs / 60.0))
    } else {
        format!("{}hrs", two_decimals(secs / 3600.0))
    }
}

/// Decimal units: `B`, `kB`, `MB`, `GB`. Negative deltas keep their sign.
pub fn format_bytes(bytes: i64) -> String {
    let b = bytes as f64;
    if b.abs() < 1e3 {
        format!("{bytes}B")
    } else if b.abs() < 1e6 {
        format!("{}kB", two_decimals(b / 1e3))
    } else if b.abs() < 1e9 {
        format!("{}MB", two_decimals(b / 1e6))
    } else {
        format!("{}GB", two_decimals(b / 1e9))
    }
}
