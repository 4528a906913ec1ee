use chrono::{DateTime, Utc};
use stash_domain::config::AppConfig;
use stash_storage::BlobStore;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug)]
pub struct AppStateInner {
    pub config: AppConfig,
    pub store: Arc<dyn BlobStore>,
    /// Drives `Last-Modified` and `ETag` of the usage page.
    pub started: DateTime<Utc>,
}

/// Shared handler state; cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn BlobStore>) -> Self {
        Self { inner: Arc::new(AppStateInner { config, store, started: Utc::now() }) }
    }
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
