//! Logging initialization.
//!
//! Verbosity sets the default level; the `LOG` environment variable
//! overrides it with a full filter. When the `log.file` property names a
//! path prefix, a daily-rolling file keeps dated logs next to it.

use std::path::Path;

use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

pub struct TelemetryGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init(verbosity: u8, log_file: Option<&str>) -> std::io::Result<TelemetryGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var("LOG")
        .from_env_lossy();

    let mut guard = None;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(Box::new(tracing_subscriber::fmt::layer()));

    if let Some(prefix) = log_file {
        let path = Path::new(prefix);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();

        let appender = tracing_appender::rolling::daily(dir, file_name);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        layers.push(Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        ));
    }

    layers.push(Box::new(filter));
    Registry::default().with(layers).init();

    Ok(TelemetryGuard { _guard: guard })
}

fn level_from_verbosity(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}
