//! Injectable log sink
//!
//! Every [`crate::http::Client`] owns its own [`Logger`]. There is no
//! process-wide switch: silence a client by giving it a [`NoopLogger`].

use crate::types::LogLevel;
use std::fmt;
use std::sync::Arc;

/// Sink for the messages the retry executor reports.
///
/// Logging is best-effort. Implementations must not panic and the executor
/// never looks at what they do.
pub trait Logger: Send + Sync {
    /// Record a message at the given level
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>);

    /// Record an error message
    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }

    /// Record an informational message
    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }
}

/// Forwards messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        match level {
            LogLevel::Info => tracing::info!(target: "resilient_http", "{}", args),
            LogLevel::Error => tracing::error!(target: "resilient_http", "{}", args),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        (**self).log(level, args);
    }
}

/// The logger a client uses when none is injected
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}
