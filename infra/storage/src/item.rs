use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::io;

/// A boxed stream of byte chunks, the currency of every [`Item`].
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Size and modification time of a stored blob.
///
/// On writes, `size` is what the caller declared (0 when unknown); on reads it is
/// the size of the file that was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMetadata {
    pub size: u64,
    pub mtime: DateTime<Utc>,
}

impl ItemMetadata {
    #[must_use]
    pub fn now(size: u64) -> Self {
        Self { size, mtime: Utc::now() }
    }
}

/// A blob in transit: an optional, lazily consumed byte stream plus metadata.
///
/// The empty item (no stream, size 0) stands for "not found" on reads.
pub struct Item {
    stream: Option<ByteStream>,
    metadata: ItemMetadata,
}

impl Item {
    #[must_use]
    pub fn empty() -> Self {
        Self { stream: None, metadata: ItemMetadata::now(0) }
    }

    #[must_use]
    pub fn new(stream: ByteStream, metadata: ItemMetadata) -> Self {
        Self { stream: Some(stream), metadata }
    }

    /// Wraps an upload stream. `declared_size` of 0 means the size is unknown.
    pub fn from_stream<S>(stream: S, declared_size: u64) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::new(stream.boxed(), ItemMetadata::now(declared_size))
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
        Self::from_stream(stream::iter([Ok(data)]), size)
    }

    #[must_use]
    pub const fn metadata(&self) -> &ItemMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.metadata.size
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stream.is_none() && self.metadata.size == 0
    }

    #[must_use]
    pub fn into_parts(self) -> (Option<ByteStream>, ItemMetadata) {
        (self.stream, self.metadata)
    }

    #[must_use]
    pub fn into_stream(self) -> Option<ByteStream> {
        self.stream
    }

    /// Drains the stream into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the underlying stream.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        let Some(mut stream) = self.stream else {
            return Ok(Bytes::new());
        };

        let mut buf = BytesMut::with_capacity(usize::try_from(self.metadata.size).unwrap_or(0));
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("stream", &self.stream.as_ref().map(|_| "<stream>"))
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_item_has_no_content() {
        let item = Item::empty();
        assert!(item.is_empty());
        assert_eq!(item.size(), 0);
        assert!(item.into_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn from_bytes_declares_its_length() {
        let item = Item::from_bytes("hello");
        assert!(!item.is_empty());
        assert_eq!(item.size(), 5);
        assert_eq!(item.into_bytes().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn into_bytes_concatenates_chunks() {
        let chunks = stream::iter(["ab", "cd", "e"].map(|c| Ok(Bytes::from_static(c.as_bytes()))));
        let item = Item::from_stream(chunks, 0);
        assert_eq!(item.size(), 0);
        assert_eq!(item.into_bytes().await.unwrap(), "abcde");
    }

    #[test]
    fn debug_hides_stream() {
        let rendered = format!("{:?}", Item::from_bytes("x"));
        assert!(rendered.contains("<stream>"));
    }
}
