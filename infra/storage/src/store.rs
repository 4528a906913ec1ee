use crate::error::StorageError;
use crate::identifier::Identifier;
use crate::item::Item;
use async_trait::async_trait;
use std::fmt;

/// Upload cap applied by [`BlobStore::put`] unless a store says otherwise: 10 MiB.
pub const DEFAULT_LIMIT: u64 = 10 * 1024 * 1024;

/// Storage abstraction for opaque blobs addressed by [`Identifier`].
///
/// A missing blob is never an error: [`get`](Self::get) yields [`Item::empty`],
/// [`exists`](Self::exists) yields `false` and [`delete`](Self::delete) succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Fetches a blob as a lazily read stream.
    async fn get(&self, id: &Identifier) -> Result<Item, StorageError>;

    /// Stores `item` under `id`, rejecting it with [`StorageError::TooLarge`] once more
    /// than `limit` bytes arrive. A rejected write leaves any previous blob untouched.
    async fn set(&self, id: &Identifier, item: Item, limit: u64) -> Result<(), StorageError>;

    async fn exists(&self, id: &Identifier) -> Result<bool, StorageError>;

    /// Removes a blob. Deleting an absent blob succeeds.
    async fn delete(&self, id: &Identifier) -> Result<(), StorageError>;

    /// Cap used by [`put`](Self::put).
    fn limit(&self) -> u64 {
        DEFAULT_LIMIT
    }

    /// [`set`](Self::set) with the store's configured limit.
    async fn put(&self, id: &Identifier, item: Item) -> Result<(), StorageError> {
        self.set(id, item, self.limit()).await
    }
}
