//! # Logger
//!
//! Subscriber setup shared by every stash binary.
//! Console output is a compact ANSI layer; an optional rolling file layer writes
//! plain text or JSON lines through a non-blocking worker.
//!
//! * Filtering starts from [`LoggerBuilder::level`], is refined by
//!   [`LoggerBuilder::env_filter`] (e.g., `"stash_storage=debug,tower_http=info"`),
//!   and falls back to `RUST_LOG` when no explicit filter is given.
//! * Keep the returned [`Logger`] alive until shutdown so buffered file output is flushed.
//!
//! ## Example
//!
//! ```rust
//! # use stash_logger::{Logger, LevelFilter};
//!
//! let _logger = Logger::builder()
//!     .name("stash")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod builder;
mod error;

pub use crate::builder::{LoggerBuilder, NoFile, NoName, WithFile, WithName};
pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use tracing_appender::non_blocking::WorkerGuard;

/// A handle to the initialized logging system.
///
/// Holds the background file writer, if any. Drop it only when the
/// application is shutting down.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Returns a new [`LoggerBuilder`].
    ///
    /// The `name` is used as the prefix of rolling log files (e.g., `stash.2026-10-18.log`).
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Whether a file writer is attached.
    #[must_use]
    pub const fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }

    /// Returns a reference to the underlying worker guard, if present.
    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}
