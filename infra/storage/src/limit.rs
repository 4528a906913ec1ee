use crate::error::StorageError;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Forwards chunks unchanged while counting bytes, and fails once the running
/// total exceeds `limit`.
///
/// The chunk that crosses the limit is never yielded. After the first error
/// (either [`StorageError::TooLarge`] or a source failure) the stream is
/// finished and polls `None`, without pulling from the source again.
#[derive(Debug)]
pub struct LimitStream<S> {
    inner: S,
    limit: u64,
    seen: u64,
    done: bool,
}

impl<S> LimitStream<S> {
    pub const fn new(inner: S, limit: u64) -> Self {
        Self { inner, limit, seen: 0, done: false }
    }

    /// Bytes seen so far, including a chunk that tripped the limit.
    pub const fn bytes_seen(&self) -> u64 {
        self.seen
    }

    pub const fn limit(&self) -> u64 {
        self.limit
    }
}

impl<S> Stream for LimitStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = Result<Bytes, StorageError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            Some(Ok(chunk)) => {
                let len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
                this.seen = this.seen.saturating_add(len);
                if this.seen > this.limit {
                    this.done = true;
                    return Poll::Ready(Some(Err(StorageError::too_large(this.limit))));
                }
                Poll::Ready(Some(Ok(chunk)))
            },
            Some(Err(err)) => {
                this.done = true;
                Poll::Ready(Some(Err(StorageError::Io {
                    source: err,
                    context: Some("Reading upload stream".into()),
                })))
            },
            None => {
                this.done = true;
                Poll::Ready(None)
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done { (0, Some(0)) } else { (0, self.inner.size_hint().1) }
    }
}
