//! # Stash Server
//!
//! A minimal paste service over HTTP, built on `Axum` and the sharded filesystem blob store.
//!
//! | Route | Effect |
//! |---|---|
//! | `GET /` | usage (plain text, or an upload page for browsers) |
//! | `GET /{id}` | stream a blob, `404` when absent |
//! | `PUT /{id}` | store or replace |
//! | `POST /{id}` | store unless it exists (`409`) |
//! | `POST /`, `PUT /` | store under a generated id |
//! | `DELETE /{id}` | remove (idempotent) |
//!
//! ## Example
//! ```no_run
//! use stash_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(3000)
//!         .data_dir("db")
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod error;
mod extract;
mod handlers;
mod router;
mod state;

pub use error::{ApiError, ApiErrorExt};
pub use extract::{DeclaredSize, UrlPrefix, View};
pub use state::{AppState, AppStateInner};

use anyhow::{Context, Result};
use axum::Router;
use axum_server::Handle;
use stash_domain::config::{AppConfig, LogConfig};
use stash_domain::constants::APP_NAME;
use stash_logger::{LevelFilter, Logger};
use stash_storage::{BlobStore, FsBlobStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// Time in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: AppConfig,
    store: Option<Arc<dyn BlobStore>>,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: AppConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.storage.data_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.cfg.storage.max_upload_bytes = bytes;
        self
    }

    /// Serves from an already opened store instead of opening `storage.data_dir`.
    pub fn store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Consumes the builder and initializes the server.
    ///
    /// Opens the filesystem blob store under `storage.data_dir` (creating it and
    /// purging stale temp files) unless a store was injected with [`ServerBuilder::store`].
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created or resolved.
    pub async fn build(self) -> Result<Server> {
        let store = match self.store {
            Some(store) => store,
            None => {
                let storage = &self.cfg.storage;
                let store = FsBlobStore::builder()
                    .root(&storage.data_dir)
                    .depth(storage.shard_depth)
                    .limit(storage.max_upload_bytes)
                    .open()
                    .await
                    .with_context(|| {
                        format!("Failed to open blob store at {}", storage.data_dir.display())
                    })?;
                Arc::new(store) as Arc<dyn BlobStore>
            },
        };

        info!(address = %self.cfg.server.socket_addr(), limit = store.limit(), "Initializing server");

        Ok(Server { state: AppState::new(self.cfg, store) })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: AppState,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// The complete application router, with tracing and state attached.
    #[must_use]
    pub fn router(&self) -> Router {
        router::init(self.state.clone())
    }

    /// Starts the server and runs until a shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address.
    pub async fn run(self) -> Result<()> {
        let address = self.state.config.server.socket_addr();
        let app = self.router();

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        info!("Starting HTTP server on http://{address}");

        axum_server::bind(address)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTP server failed")?;

        info!("Server shutdown complete");
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }
}

/// Installs the global subscriber described by `cfg`.
///
/// # Errors
/// Returns an error for an unknown level name, an unusable log directory,
/// or when a subscriber is already installed.
pub fn init_logging(cfg: &LogConfig) -> Result<Logger> {
    let level: LevelFilter =
        cfg.level.parse().with_context(|| format!("Unknown log level '{}'", cfg.level))?;

    let builder = Logger::builder().name(APP_NAME).level(level);
    let logger = match &cfg.dir {
        Some(dir) => builder.path(dir).json(cfg.json).init(),
        None => builder.init(),
    };

    logger.context("Failed to initialize logging")
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
