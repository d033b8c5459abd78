//! Tracing setup for hosts that do not bring their own subscriber.
//!
//! The engine emits structured `tracing` events throughout; library
//! consumers normally install their own subscriber. For standalone tools
//! and tests, [`init`] wires up a compact stdout layer (and optionally a
//! non-blocking file layer) filtered through `RUST_LOG` (default `info`).

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the file writer alive; dropping it flushes and closes the log.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install a global subscriber.
///
/// Pass a directory to also mirror events into `voxrange.log` there (the
/// directory is created if needed). Fails if a global subscriber is
/// already set.
pub fn init(log_dir: Option<&Path>) -> Result<LogGuard, io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer().compact();

    let mut file_guard = None;
    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, "voxrange.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
