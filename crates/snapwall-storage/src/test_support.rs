use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use crate::traits::ByteReader;

/// Yields `prefix`, then fails.
pub struct FailingReader {
    prefix: Option<Vec<u8>>,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.prefix.take() {
            Some(prefix) => {
                buf.put_slice(&prefix);
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "source went away",
            ))),
        }
    }
}

pub fn failing_reader(prefix: &[u8]) -> ByteReader {
    Box::pin(FailingReader {
        prefix: Some(prefix.to_vec()),
    })
}

pub fn reader(data: &[u8]) -> ByteReader {
    Box::pin(io::Cursor::new(data.to_vec()))
}
