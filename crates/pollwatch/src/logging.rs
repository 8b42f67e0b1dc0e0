//! Logging setup shared by the watcher binaries.
//!
//! Console output always; a daily-rolling file next to it when a log directory
//! is given. Timestamps use the local timezone.

use std::path::PathBuf;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter used when neither a flag nor `RUST_LOG` says otherwise.
pub const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn";

#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Logging options, usually straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log debug events.
    pub verbose: bool,
    /// Only log errors. Wins over `verbose`.
    pub quiet: bool,
    /// Directory for the rolling log file.
    pub log_dir: Option<PathBuf>,
    /// Log file name prefix, e.g. the binary name.
    pub file_prefix: String,
}

impl LogOptions {
    pub fn new(file_prefix: impl Into<String>) -> Self {
        Self {
            file_prefix: file_prefix.into(),
            ..Default::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.quiet {
            EnvFilter::new("error")
        } else if self.verbose {
            EnvFilter::new("debug,hyper=info,hyper_util=info")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the life of the program.
pub fn init_logging(options: &LogOptions) -> crate::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let prefix = if options.file_prefix.is_empty() {
                "pollwatch"
            } else {
                options.file_prefix.as_str()
            };
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", prefix));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTimer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(options.filter())
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_target(options.verbose)
                .with_timer(LocalTimer),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        let options = LogOptions {
            verbose: true,
            quiet: true,
            ..LogOptions::new("test")
        };
        assert_eq!(options.filter().to_string(), "error");
    }

    #[test]
    fn test_verbose_filter() {
        let options = LogOptions {
            verbose: true,
            ..LogOptions::new("test")
        };
        let filter = options.filter().to_string();
        let directives: Vec<&str> = filter.split(',').collect();
        assert!(directives.contains(&"debug"));
        assert!(directives.contains(&"hyper=info"));
    }

    #[test]
    fn test_local_timer_format() {
        let mut out = String::new();
        LocalTimer.format_time(&mut Writer::new(&mut out)).unwrap();
        // 2026-01-01T00:00:00.000+00:00
        assert_eq!(out.len(), 29);
        assert_eq!(&out[10..11], "T");
    }
}
