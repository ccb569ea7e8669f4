// crates/strata-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Subscriber setup and in-memory log capture.
// Purpose: Route library tracing output to stderr and, optionally, a job log.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! [`init`] installs a `fmt` subscriber filtered by `RUST_LOG` when set and by
//! the given level otherwise. A [`LogCapture`] adds a second, uncolored
//! layer writing into a shared buffer whose contents the run command stores
//! as the job's log object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

use crate::error::CliError;
use crate::error::CliResult;

// ============================================================================
// SECTION: Capture
// ============================================================================

/// Shared buffer receiving formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    /// Captured bytes.
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything captured so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        match self.buffer.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Writer handed out per event.
#[derive(Debug)]
pub struct CaptureWriter {
    /// Buffer shared with the owning capture.
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.buffer.lock().map_err(|_| io::Error::other("log capture buffer poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

// ============================================================================
// SECTION: Subscriber
// ============================================================================

/// Builds the level filter: `RUST_LOG` first, then `level`.
///
/// # Errors
///
/// Returns [`CliError::Logging`] when `level` is not a valid directive.
pub fn filter(level: &str) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_ascii_lowercase()))
        .map_err(|err| CliError::Logging(err.to_string()))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`CliError::Logging`] when the filter is invalid or a subscriber
/// is already installed.
pub fn init(level: &str, capture: Option<LogCapture>) -> CliResult<()> {
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);
    let capture_layer = capture.map(|capture| fmt::layer().with_writer(capture).with_ansi(false));
    tracing_subscriber::registry()
        .with(filter(level)?)
        .with(stderr_layer)
        .with(capture_layer)
        .try_init()
        .map_err(|err| CliError::Logging(err.to_string()))
}
