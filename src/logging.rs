use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use fitconnect_core::Config;

pub const LOG_FILE_NAME: &str = "fitconnect.log";

/// Keeps the file writer thread alive. Hold it until the program exits.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config.log_level.parse::<EnvFilter>().unwrap_or_else(|e| {
            eprintln!(
                "WARN: FITCONNECT_LOG='{}' is not a valid filter ({}); falling back to 'info'",
                config.log_level, e
            );
            EnvFilter::new("info")
        })
    })
}

/// Log to stderr, as JSON when `log_json` is set.
pub fn init_stderr(config: &Config) -> LogGuard {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    let layer = if config.log_json {
        layer.json().flatten_event(true).boxed()
    } else {
        layer.boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(layer)
        .try_init();

    LogGuard { _file_guard: None }
}

/// Log to `<dir>/fitconnect.log`; used while the terminal UI owns the screen.
pub fn init_file(config: &Config, dir: &Path) -> LogGuard {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Failed to create log directory {}: {}", dir.display(), e);
        return LogGuard { _file_guard: None };
    }

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);
    let layer = if config.log_json {
        layer.json().flatten_event(true).boxed()
    } else {
        layer.boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(layer)
        .try_init();

    LogGuard {
        _file_guard: Some(guard),
    }
}
