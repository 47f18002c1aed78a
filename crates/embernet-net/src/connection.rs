//! A write-buffered wrapper around any `AsyncWrite`.
//!
//! Writing small chunks directly to a raw socket one `write_all` call at a
//! time is slow once a kernel syscall (or, on the embedded original this is
//! modeled on, an SPI transaction to a Wiznet chip) sits behind every call.
//! `WriteBufferedConnection` accumulates writes into a fixed-capacity buffer
//! and only flushes to the underlying writer when the buffer fills or the
//! caller asks for it explicitly.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use embernet_core::{Error, Result};

/// Safety valve against spinning forever if the underlying writer keeps
/// accepting zero bytes without returning an error.
const MAX_FLUSH_ATTEMPTS: u32 = 64;

/// Buffers writes to `W` up to a fixed capacity, flushing automatically when
/// full.
///
/// Dropping a connection with unflushed bytes logs a warning rather than
/// flushing, since `Drop` cannot run async code; call
/// [`WriteBufferedConnection::flush`] explicitly before dropping if that
/// matters.
#[derive(Debug)]
pub struct WriteBufferedConnection<W> {
    writer: W,
    buffer: BytesMut,
    capacity: usize,
}

impl<W: AsyncWrite + Unpin> WriteBufferedConnection<W> {
    /// Wrap `writer`, buffering up to `capacity` bytes before flushing.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(writer: W, capacity: usize) -> Self {
        assert!(capacity > 0, "write buffer capacity must be positive");
        Self {
            writer,
            buffer: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes of buffer room left before the next write forces a flush.
    #[must_use]
    pub fn available_for_write(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Buffer `buf`, flushing to the underlying writer as many times as
    /// needed to make room.
    pub async fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let room = self.available_for_write();
            if room == 0 {
                self.flush_internal().await?;
                continue;
            }
            let take = room.min(buf.len());
            self.buffer.extend_from_slice(&buf[..take]);
            buf = &buf[take..];
        }
        Ok(())
    }

    /// Flush any buffered bytes to the underlying writer. A no-op if the
    /// buffer is empty.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.flush_internal().await
    }

    /// Access the underlying writer, e.g. to call `shutdown()`.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    async fn flush_internal(&mut self) -> Result<()> {
        let mut attempts = 0u32;
        while !self.buffer.is_empty() {
            attempts += 1;
            if attempts > MAX_FLUSH_ATTEMPTS {
                return Err(Error::FlushExhausted { attempts });
            }
            let wrote = self.writer.write(&self.buffer).await?;
            if wrote == 0 {
                return Err(Error::FlushExhausted { attempts });
            }
            self.buffer.advance(wrote);
        }
        Ok(())
    }
}

impl<W> Drop for WriteBufferedConnection<W> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            tracing::warn!(
                unflushed_bytes = self.buffer.len(),
                "WriteBufferedConnection dropped with unflushed data"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// A writer that accepts at most `chunk` bytes per call, to exercise the
    /// "client writes less than asked" loop in `flush_internal`.
    struct ChunkyWriter {
        written: Vec<u8>,
        chunk: usize,
    }

    impl AsyncWrite for ChunkyWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            let take = buf.len().min(self.chunk);
            self.written.extend_from_slice(&buf[..take]);
            Poll::Ready(Ok(take))
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn buffers_small_writes_without_flushing() {
        let writer = ChunkyWriter { written: Vec::new(), chunk: 1024 };
        let mut conn = WriteBufferedConnection::new(writer, 16);
        conn.write_all(b"hello").await.unwrap();
        assert!(conn.get_mut().written.is_empty());
        assert_eq!(conn.available_for_write(), 11);
    }

    #[tokio::test]
    async fn flush_pushes_buffered_bytes_through() {
        let writer = ChunkyWriter { written: Vec::new(), chunk: 1024 };
        let mut conn = WriteBufferedConnection::new(writer, 16);
        conn.write_all(b"hello").await.unwrap();
        conn.flush().await.unwrap();
        assert_eq!(conn.get_mut().written, b"hello");
        assert_eq!(conn.available_for_write(), 16);
    }

    #[tokio::test]
    async fn write_larger_than_capacity_flushes_as_it_goes() {
        let writer = ChunkyWriter { written: Vec::new(), chunk: 1024 };
        let mut conn = WriteBufferedConnection::new(writer, 4);
        conn.write_all(b"0123456789").await.unwrap();
        conn.flush().await.unwrap();
        assert_eq!(conn.get_mut().written, b"0123456789");
    }

    #[tokio::test]
    async fn partial_underlying_writes_are_retried_until_drained() {
        let writer = ChunkyWriter { written: Vec::new(), chunk: 3 };
        let mut conn = WriteBufferedConnection::new(writer, 16);
        conn.write_all(b"0123456789").await.unwrap();
        conn.flush().await.unwrap();
        assert_eq!(conn.get_mut().written, b"0123456789");
    }
}
