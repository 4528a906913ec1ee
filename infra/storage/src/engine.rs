//! Filesystem-backed [`BlobStore`] with sharded layout and atomic replacement.
//!
//! Every blob lives at `root/<seg_0>/.../<seg_{depth-1}>/<id>` (see [`crate::shard`]).
//! Writes stream into a hidden temp file next to the target and are renamed into
//! place only after the whole payload passed the size cap and hit the disk, so a
//! reader always sees either the previous blob or the complete new one.

use crate::builder::FsBlobStoreBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::identifier::Identifier;
use crate::item::{ByteStream, Item, ItemMetadata};
use crate::limit::LimitStream;
use crate::locks::KeyedLocks;
use crate::maintenance;
use crate::shard;
use crate::store::BlobStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Suffix of in-flight temp files. Blob identifiers never start with `.`, so
/// `.<id>.<pid>-<n>.stashtmp` cannot collide with a stored blob.
pub(crate) const TMP_SUFFIX: &str = ".stashtmp";

/// Buffer size for lazy reads.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// The internal shared state of a [`FsBlobStore`] instance.
#[derive(Debug)]
pub struct FsBlobStoreInner {
    /// The canonicalized directory every blob lives under.
    pub(crate) root: PathBuf,
    /// Number of two-hex-character directory levels between `root` and a blob.
    pub(crate) depth: usize,
    /// Cap used by [`BlobStore::put`].
    pub(crate) limit: u64,
    pub(crate) tmp_counter: AtomicU64,
    pub(crate) locks: KeyedLocks,
}

/// A thread-safe handle to a sharded blob directory.
///
/// Cheap to clone; all clones share the same root, temp counter and write locks.
///
/// # Example
///
/// ```rust
/// use stash_storage::{BlobStore, FsBlobStore, Identifier, Item, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let store = FsBlobStore::builder().root(tmp.path().join("db")).open().await?;
///     let id = Identifier::try_from("abc")?;
///
///     store.put(&id, Item::from_bytes("hello")).await?;
///     assert!(store.resolve(&id).ends_with("00/01/abc"));
///
///     let item = store.get(&id).await?;
///     assert_eq!(item.into_bytes().await.unwrap(), "hello");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    pub(crate) inner: Arc<FsBlobStoreInner>,
}

impl Deref for FsBlobStore {
    type Target = FsBlobStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FsBlobStore {
    #[must_use = "The blob store is not initialized until you call .open()"]
    pub fn builder() -> FsBlobStoreBuilder {
        FsBlobStoreBuilder::new()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Physical location of `id`. Pure; does not touch the disk.
    #[must_use]
    pub fn resolve(&self, id: &Identifier) -> PathBuf {
        shard::shard_path(&self.root, id, self.depth)
    }

    /// Removes temp files abandoned by crashed writers.
    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root).await;
    }

    /// Streams `source` into a freshly created temp file and syncs it.
    async fn write_temp(
        temp: &Path,
        source: Option<ByteStream>,
        limit: u64,
    ) -> Result<u64, StorageError> {
        let file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp)
            .await
            .context(format!("Temp creation failed: {}", temp.display()))?;
        let mut writer = BufWriter::new(file);
        let mut written = 0_u64;

        if let Some(source) = source {
            let mut limited = LimitStream::new(source, limit);
            while let Some(chunk) = limited.try_next().await? {
                writer.write_all(&chunk).await.context("Write failed")?;
            }
            written = limited.bytes_seen();
        }

        writer.flush().await.context("Flush failed")?;
        writer.get_ref().sync_all().await.context("Hardware sync failed")?;
        Ok(written)
    }

    async fn commit(temp: &Path, target: &Path) -> Result<(), StorageError> {
        if let Err(err) = fs::rename(temp, target).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(target)
                    .await
                    .context(format!("Failed to replace existing file: {}", target.display()))?;
                fs::rename(temp, target).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    target.display()
                ))?;
            } else {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), target.display())
                            .into(),
                    ),
                });
            }
        }

        if let Some(parent) = target.parent() {
            Self::sync_dir(parent).await;
        }
        Ok(())
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, id: &Identifier) -> Result<Item, StorageError> {
        let path = self.resolve(id);

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Item::empty()),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Open failed: {}", path.display()).into()),
                });
            },
        };

        let meta =
            file.metadata().await.context(format!("Failed to get metadata: {}", path.display()))?;
        if !meta.is_file() || meta.len() == 0 {
            return Ok(Item::empty());
        }

        let mtime = meta.modified().map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
        let metadata = ItemMetadata { size: meta.len(), mtime };
        let stream = ReaderStream::with_capacity(file, READ_CHUNK_SIZE);

        debug!(%id, size = metadata.size, "Blob opened");
        Ok(Item::new(Box::pin(stream), metadata))
    }

    async fn set(&self, id: &Identifier, item: Item, limit: u64) -> Result<(), StorageError> {
        let (stream, metadata) = item.into_parts();

        if metadata.size > limit {
            debug!(%id, declared = metadata.size, limit, "Upload rejected by declared size");
            return Err(StorageError::TooLarge {
                limit,
                context: Some(format!("Declared {} bytes", metadata.size).into()),
            });
        }

        let target = self.resolve(id);
        let _lock = self.locks.lock(id.as_str()).await;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create shards for {}", target.display()))?;
        }

        let temp = TempFile::new(unique_tmp_path(&target, &self.tmp_counter));

        let written = match Self::write_temp(temp.path(), stream, limit).await {
            Ok(written) => written,
            Err(err) => {
                temp.discard().await;
                if err.is_too_large() {
                    debug!(%id, limit, "Upload exceeded the size limit");
                }
                return Err(err);
            },
        };

        if let Err(err) = Self::commit(temp.path(), &target).await {
            temp.discard().await;
            return Err(err);
        }
        temp.disarm();

        debug!(%id, path = %target.display(), size = written, "Blob saved atomically");
        Ok(())
    }

    async fn exists(&self, id: &Identifier) -> Result<bool, StorageError> {
        let path = self.resolve(id);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to get metadata: {}", path.display()).into()),
            }),
        }
    }

    async fn delete(&self, id: &Identifier) -> Result<(), StorageError> {
        let path = self.resolve(id);
        let _lock = self.locks.lock(id.as_str()).await;

        match fs::remove_file(&path).await {
            Ok(()) => debug!(%id, path = %path.display(), "Blob deleted"),
            Err(err) if err.kind() == ErrorKind::NotFound => {},
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Failed to delete: {}", path.display()).into()),
                });
            },
        }
        Ok(())
    }

    fn limit(&self) -> u64 {
        self.inner.limit
    }
}

/// A temp file that removes itself unless it was renamed into place.
///
/// Covers writers whose future is dropped mid-upload (client disconnects).
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    const fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }

    async fn discard(mut self) {
        self.armed = false;
        if let Err(err) = fs::remove_file(&self.path).await
            && err.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %err, "Failed to remove temp file");
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed
            && let Err(err) = std::fs::remove_file(&self.path)
            && err.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %err, "Failed to remove abandoned temp file");
        }
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("blob");
    let tmp_name = format!(".{file_name}.{}-{counter}{TMP_SUFFIX}", std::process::id());
    target.with_file_name(tmp_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_names_are_hidden_and_unique() {
        let counter = AtomicU64::new(1);
        let target = Path::new("/data/00/01/abc");
        let first = unique_tmp_path(target, &counter);
        let second = unique_tmp_path(target, &counter);

        assert_ne!(first, second);
        assert_eq!(first.parent(), target.parent());
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".abc."));
        assert!(name.ends_with(TMP_SUFFIX));
    }
}
