//! A streaming, sharded blob store on top of the local filesystem.
//!
//! Blobs are opaque byte payloads addressed by an [`Identifier`]. They are spread
//! over a fixed-depth directory tree derived from a hash of the identifier, written
//! through a hard size cap, and replaced atomically.
//!
//! # Core Features
//!
//! - **Deterministic Sharding**: `root/<2 hex>/<2 hex>/<id>` from a 32-bit string hash ([`shard`]).
//! - **Bounded Uploads**: [`LimitStream`] fails with [`StorageError::TooLarge`] the moment a payload crosses its cap.
//! - **Atomic Writes**: unique temp file + `fsync` + `rename`; a failed or oversized upload never replaces the previous blob.
//! - **Lazy Reads**: [`Item`] carries a stream that reads the file in 64 KiB chunks only when consumed.
//! - **Self-Healing**: stale temp files from crashed writers are removed when the store opens.
//!
//! # Architectural Overview
//!
//! 1.  **[`BlobStore`]**: the storage contract consumed by the HTTP layer.
//! 2.  **[`FsBlobStore`]**: the filesystem implementation, a cheap-to-clone handle.
//! 3.  **[`FsBlobStoreBuilder`]**: a type-safe fluent builder for configuration.
//!
//! # Examples
//!
//! ```rust
//! use stash_storage::{BlobStore, FsBlobStore, Identifier, Item, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let store = FsBlobStore::builder()
//!         .root(tmp.path().join("db"))
//!         .limit(1024)
//!         .open()
//!         .await?;
//!
//!     let id: Identifier = "notes".parse()?;
//!     store.put(&id, Item::from_bytes("remember the milk")).await?;
//!     assert!(store.exists(&id).await?);
//!
//!     let too_big = Item::from_bytes(vec![0_u8; 2048]);
//!     assert!(store.put(&id, too_big).await.unwrap_err().is_too_large());
//!
//!     // The rejected upload did not touch the stored blob.
//!     let kept = store.get(&id).await?.into_bytes().await.unwrap();
//!     assert_eq!(kept, "remember the milk");
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod identifier;
mod item;
mod limit;
mod locks;
mod maintenance;
pub mod shard;
mod store;

pub use builder::FsBlobStoreBuilder;
pub use engine::{FsBlobStore, READ_CHUNK_SIZE};
pub use error::{StorageError, StorageErrorExt};
pub use identifier::{Identifier, MAX_IDENTIFIER_LEN};
pub use item::{ByteStream, Item, ItemMetadata};
pub use limit::LimitStream;
pub use store::{BlobStore, DEFAULT_LIMIT};
