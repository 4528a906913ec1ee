use crate::engine::{FsBlobStore, FsBlobStoreInner};
use crate::error::{StorageError, StorageErrorExt};
use crate::locks::KeyedLocks;
use crate::shard::DEFAULT_SHARD_DEPTH;
use crate::store::DEFAULT_LIMIT;
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone)]
struct StoreConfig {
    depth: usize,
    limit: u64,
    create: bool,
    purge: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { depth: DEFAULT_SHARD_DEPTH, limit: DEFAULT_LIMIT, create: true, purge: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct FsBlobStoreBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StoreConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> FsBlobStoreBuilder<S> {
    /// Number of two-hex-character directory levels. Defaults to 2.
    #[must_use = "Sets the shard depth of the blob store"]
    pub const fn depth(mut self, depth: usize) -> Self {
        self.config.depth = depth;
        self
    }

    /// Cap used by `put`. Defaults to 10 MiB.
    #[must_use = "Sets the default upload limit of the blob store"]
    pub const fn limit(mut self, bytes: u64) -> Self {
        self.config.limit = bytes;
        self
    }

    #[must_use = "Sets whether the root directory should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    #[must_use = "Sets whether stale temp files are removed while opening"]
    pub const fn purge_on_open(mut self, enable: bool) -> Self {
        self.config.purge = enable;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> FsBlobStoreBuilder<N> {
        FsBlobStoreBuilder { state, config: self.config }
    }
}

impl FsBlobStoreBuilder<NoRoot> {
    #[must_use = "Creates a new blob store builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory of the blob store"]
    pub fn root(self, path: impl Into<PathBuf>) -> FsBlobStoreBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl FsBlobStoreBuilder<WithRoot> {
    /// Consumes the configuration and opens the blob store.
    ///
    /// 1. Creates the root directory if `create(true)` (the default) was set.
    /// 2. Canonicalizes the root.
    /// 3. Removes temp files older than five minutes left behind by crashed writers,
    ///    unless `purge_on_open(false)` was set. Cleanup failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root cannot be created or resolved.
    pub async fn open(self) -> Result<FsBlobStore, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap blob root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve blob root: {}", root.display()))?;

        info!(
            path = %canonical.display(),
            depth = self.config.depth,
            limit = self.config.limit,
            "Blob store opened"
        );

        let store = FsBlobStore {
            inner: Arc::new(FsBlobStoreInner {
                root: canonical,
                depth: self.config.depth,
                limit: self.config.limit,
                tmp_counter: AtomicU64::new(1),
                locks: KeyedLocks::default(),
            }),
        };

        if self.config.purge {
            store.purge_tmp().await;
        }

        Ok(store)
    }
}
