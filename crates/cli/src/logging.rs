//! Log sink for the `log` records emitted by the library crates.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink<'a> {
    File(&'a Path),
    Stderr,
    /// Full-screen mode without a log file: stderr would corrupt the display.
    Off,
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init(sink: LogSink<'_>) -> Result<(), CliError> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match sink {
        LogSink::Off => return Ok(()),
        LogSink::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .try_init(),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    CliError::persistence(format!("cannot open log file {}: {}", path.display(), e))
                })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
    };

    installed.map_err(|e| CliError::general(format!("failed to install logger: {}", e)))
}
