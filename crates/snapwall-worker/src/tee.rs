//! Reader wrappers used while a thumbnail is streamed into storage.

use snapwall_storage::ByteReader;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Bytes copied by a [`TeeReader`].
#[derive(Clone, Debug, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn extend(&self, data: &[u8]) {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
    }

    /// Take everything captured so far.
    pub fn take(&self) -> Vec<u8> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buf)
    }
}

/// Passes reads through unchanged and copies every byte into a [`Captured`].
pub struct TeeReader {
    inner: ByteReader,
    captured: Captured,
}

impl TeeReader {
    pub fn new(inner: ByteReader) -> (Self, Captured) {
        let captured = Captured::default();
        (
            Self {
                inner,
                captured: captured.clone(),
            },
            captured,
        )
    }
}

impl AsyncRead for TeeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match this.inner.as_mut().poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                this.captured.extend(&buf.filled()[before..]);
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

/// The generator's output, either handed to storage as-is or teed so the
/// stored bytes can also be offered to the cache.
pub enum ThumbnailSource {
    Plain(ByteReader),
    Teed(TeeReader, Captured),
}

impl ThumbnailSource {
    pub fn new(reader: ByteReader, tee: bool) -> Self {
        if tee {
            let (reader, captured) = TeeReader::new(reader);
            ThumbnailSource::Teed(reader, captured)
        } else {
            ThumbnailSource::Plain(reader)
        }
    }

    pub fn into_parts(self) -> (ByteReader, Option<Captured>) {
        match self {
            ThumbnailSource::Plain(reader) => (reader, None),
            ThumbnailSource::Teed(reader, captured) => (Box::pin(reader), Some(captured)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn reader(data: &[u8]) -> ByteReader {
        Box::pin(io::Cursor::new(data.to_vec()))
    }

    #[tokio::test]
    async fn test_tee_copies_every_byte() {
        let data: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        let (mut tee, captured) = TeeReader::new(reader(&data));

        let mut out = Vec::new();
        tee.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, data);
        assert_eq!(captured.take(), data);
        assert!(captured.take().is_empty());
    }

    #[tokio::test]
    async fn test_plain_source_captures_nothing() {
        let (mut reader, captured) = ThumbnailSource::new(reader(b"THUMB"), false).into_parts();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"THUMB");
        assert!(captured.is_none());
    }

    #[tokio::test]
    async fn test_teed_source_captures() {
        let (mut reader, captured) = ThumbnailSource::new(reader(b"THUMB"), true).into_parts();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(captured.unwrap().take(), b"THUMB");
    }
}
