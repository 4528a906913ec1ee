use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use stash_storage::*;
use std::io;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

async fn open(temp: &TempDir) -> FsBlobStore {
    FsBlobStore::builder().root(temp.path().join("db")).open().await.unwrap()
}

fn id(name: &str) -> Identifier {
    Identifier::try_from(name).unwrap()
}

fn chunked(parts: Vec<Vec<u8>>) -> Item {
    Item::from_stream(stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p)))), 0)
}

fn temp_files(root: &Path) -> Vec<String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .filter(|name| name.ends_with(".stashtmp"))
        .collect()
}

#[tokio::test]
async fn test_set_get_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("hello");

    store.set(&key, Item::from_bytes("hello world"), 100).await.unwrap();

    let item = store.get(&key).await.unwrap();
    assert_eq!(item.size(), 11);
    assert!(!item.is_empty());
    assert_eq!(item.into_bytes().await.unwrap(), "hello world");
}

#[tokio::test]
async fn test_scenario_layout_for_abc() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("abc");

    store.set(&key, Item::from_bytes("hello"), 10).await.unwrap();

    let expected = store.root().join("00").join("01").join("abc");
    assert_eq!(store.resolve(&key), expected);
    assert_eq!(std::fs::read(&expected).unwrap(), b"hello");
    assert!(store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_missing_blob_is_empty_not_error() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("nope");

    let item = store.get(&key).await.unwrap();
    assert!(item.is_empty());
    assert!(!store.exists(&key).await.unwrap());
    assert!(!store.resolve(&key).exists(), "reads must not create files");
}

#[tokio::test]
async fn test_oversized_stream_is_rejected_and_previous_blob_kept() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("abc");

    store.set(&key, Item::from_bytes("hello"), 10).await.unwrap();

    // Declared size unknown, so the cap trips mid-stream.
    let upload = chunked(vec![vec![b'x'; 6], vec![b'y'; 6], vec![b'z'; 6]]);
    let err = store.set(&key, upload, 10).await.unwrap_err();
    assert!(matches!(err, StorageError::TooLarge { limit: 10, .. }));

    let kept = store.get(&key).await.unwrap().into_bytes().await.unwrap();
    assert_eq!(kept, "hello");
    assert!(temp_files(store.root()).is_empty());
}

#[tokio::test]
async fn test_oversized_first_write_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("fresh");

    let err = store.set(&key, chunked(vec![vec![0; 8], vec![0; 8]]), 10).await.unwrap_err();
    assert!(err.is_too_large());
    assert!(!store.exists(&key).await.unwrap());
    assert!(temp_files(store.root()).is_empty());
}

#[tokio::test]
async fn test_declared_size_over_limit_rejected_early() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("declared");

    let pending = stream::pending::<io::Result<Bytes>>();
    let item = Item::from_stream(pending, 11);

    // The body is never polled, so this must not hang.
    let err = tokio::time::timeout(Duration::from_secs(5), store.set(&key, item, 10))
        .await
        .expect("declared size should be checked before reading")
        .unwrap_err();
    assert!(err.is_too_large());
}

#[tokio::test]
async fn test_exact_limit_is_accepted() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("exact");

    store.set(&key, chunked(vec![vec![1; 4], vec![2; 6]]), 10).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap().size(), 10);
}

#[tokio::test]
async fn test_zero_byte_blob_reads_as_empty() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("blank");

    store.set(&key, Item::from_bytes(Bytes::new()), 10).await.unwrap();
    assert!(store.exists(&key).await.unwrap());
    assert!(store.get(&key).await.unwrap().is_empty());

    store.set(&key, Item::empty(), 10).await.unwrap();
    assert!(store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("doc");

    store.put(&key, Item::from_bytes("first version")).await.unwrap();
    store.put(&key, Item::from_bytes("second")).await.unwrap();

    assert_eq!(store.get(&key).await.unwrap().into_bytes().await.unwrap(), "second");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("gone");

    store.delete(&key).await.unwrap();

    store.put(&key, Item::from_bytes("x")).await.unwrap();
    assert!(store.exists(&key).await.unwrap());

    store.delete(&key).await.unwrap();
    assert!(!store.exists(&key).await.unwrap());
    assert!(store.get(&key).await.unwrap().is_empty());

    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_put_uses_configured_limit() {
    let temp = TempDir::new().unwrap();
    let store = FsBlobStore::builder().root(temp.path()).limit(4).open().await.unwrap();
    let key = id("small");

    assert_eq!(store.limit(), 4);
    store.put(&key, Item::from_bytes("four")).await.unwrap();
    assert!(store.put(&key, chunked(vec![b"fives".to_vec()])).await.unwrap_err().is_too_large());
}

#[tokio::test]
async fn test_default_limit_is_ten_mebibytes() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    assert_eq!(store.limit(), DEFAULT_LIMIT);
    assert_eq!(DEFAULT_LIMIT, 10 * 1024 * 1024);
}

#[tokio::test]
async fn test_deep_shards_pad_with_zeros() {
    let temp = TempDir::new().unwrap();
    let store = FsBlobStore::builder().root(temp.path()).depth(5).open().await.unwrap();
    let key = id("abc");

    store.put(&key, Item::from_bytes("deep")).await.unwrap();

    let expected = ["00", "01", "78", "62", "00", "abc"]
        .iter()
        .fold(store.root().to_path_buf(), |path, part| path.join(part));
    assert_eq!(store.resolve(&key), expected);
    assert!(expected.is_file());
}

#[tokio::test]
async fn test_large_blob_streams_in_chunks() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("large");
    let payload: Vec<u8> = (0..200_000_u32).map(|i| u8::try_from(i % 251).unwrap()).collect();

    store.put(&key, Item::from_bytes(payload.clone())).await.unwrap();

    let mut stream = store.get(&key).await.unwrap().into_stream().unwrap();
    let mut chunks = 0;
    let mut read = Vec::new();
    while let Some(chunk) = stream.try_next().await.unwrap() {
        assert!(chunk.len() <= READ_CHUNK_SIZE);
        read.extend_from_slice(&chunk);
        chunks += 1;
    }
    assert!(chunks > 1);
    assert_eq!(read, payload);
}

#[tokio::test]
async fn test_source_error_aborts_write() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("broken");

    let source = stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
    ]);
    let err = store.set(&key, Item::from_stream(source, 0), 100).await.unwrap_err();

    assert!(matches!(err, StorageError::Io { .. }));
    assert!(!store.exists(&key).await.unwrap());
    assert!(temp_files(store.root()).is_empty());
}

#[tokio::test]
async fn test_dropped_upload_cleans_temp_file() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("abandoned");

    let source = stream::iter(vec![Ok(Bytes::from_static(b"head"))])
        .chain(stream::pending::<io::Result<Bytes>>());
    let item = Item::from_stream(source, 0);

    let result = tokio::time::timeout(Duration::from_millis(200), store.set(&key, item, 100)).await;
    assert!(result.is_err(), "upload should still be waiting for data");

    assert!(temp_files(store.root()).is_empty());
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_writers_leave_one_complete_blob() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp).await;
    let key = id("contended");

    let mut handles = Vec::new();
    for n in 0..8_u8 {
        let store = store.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.put(&key, Item::from_bytes(vec![n; 4096])).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let data = store.get(&key).await.unwrap().into_bytes().await.unwrap();
    assert_eq!(data.len(), 4096);
    assert!(data.iter().all(|b| *b == data[0]));
    assert!(temp_files(store.root()).is_empty());
}

#[tokio::test]
async fn test_open_purges_stale_temp_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("db");
    let shard = root.join("00").join("01");
    std::fs::create_dir_all(&shard).unwrap();

    let stale = shard.join(".abc.1-1.stashtmp");
    let file = std::fs::File::create(&stale).unwrap();
    let old = std::time::SystemTime::now() - Duration::from_secs(3600);
    file.set_modified(old).unwrap();
    drop(file);

    let fresh = shard.join(".abc.1-2.stashtmp");
    std::fs::write(&fresh, b"in flight").unwrap();

    let store = FsBlobStore::builder().root(&root).open().await.unwrap();

    assert!(!stale.exists());
    assert!(fresh.exists());
    assert!(shard.is_dir(), "shard directories are never removed");
    assert!(!store.exists(&id("abc")).await.unwrap());
}

#[tokio::test]
async fn test_open_without_create_requires_root() {
    let temp = TempDir::new().unwrap();
    let result = FsBlobStore::builder().root(temp.path().join("missing")).create(false).open().await;
    assert!(matches!(result, Err(StorageError::Io { .. })));
}

#[tokio::test]
async fn test_works_through_trait_object() {
    let temp = TempDir::new().unwrap();
    let store: std::sync::Arc<dyn BlobStore> = std::sync::Arc::new(open(&temp).await);
    let key = id("dyn");

    store.put(&key, Item::from_bytes("via dyn")).await.unwrap();
    assert!(store.exists(&key).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap().into_bytes().await.unwrap(), "via dyn");
}
