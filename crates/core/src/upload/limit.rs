//! Upload size limit.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project::pin_project;
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

use crate::storage::StorageError;

/// Process-wide maximum upload size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimit(u64);

impl UploadLimit {
    /// Creates a limit of `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self(max_bytes)
    }

    /// Maximum number of bytes accepted.
    #[must_use]
    pub const fn max_bytes(self) -> u64 {
        self.0
    }

    /// Admission check on the size a request declares before its body is read.
    ///
    /// A missing or zero declared size is rejected like an oversized one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PayloadTooLarge` unless `0 < declared <= max`.
    pub fn check_declared(self, declared: Option<u64>) -> Result<u64, StorageError> {
        match declared {
            Some(len) if len > 0 && len <= self.0 => Ok(len),
            _ => Err(StorageError::PayloadTooLarge { limit: self.0 }),
        }
    }

    /// Wraps `inner` so that reading more than the limit fails.
    pub fn reader<R>(self, inner: R) -> LimitedReader<R> {
        LimitedReader {
            inner,
            remaining: self.0,
            limit: self.0,
        }
    }
}

/// Error carried inside `io::Error` when a [`LimitedReader`] overflows.
#[derive(Debug, Error)]
#[error("upload exceeds maximum allowed {limit} bytes")]
pub struct LimitExceeded {
    /// Limit that was exceeded.
    pub limit: u64,
}

/// Reader that fails once more than the configured number of bytes arrive.
#[pin_project]
#[derive(Debug)]
pub struct LimitedReader<R> {
    #[pin]
    inner: R,
    remaining: u64,
    limit: u64,
}

impl<R: AsyncRead> AsyncRead for LimitedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();
        ready!(this.inner.poll_read(cx, buf))?;

        let read = (buf.filled().len() - before) as u64;
        if read > *this.remaining {
            // Nothing may be reported as filled alongside an error.
            buf.set_filled(before);
            *this.remaining = 0;
            return Poll::Ready(Err(io::Error::other(LimitExceeded {
                limit: *this.limit,
            })));
        }
        *this.remaining -= read;
        Poll::Ready(Ok(()))
    }
}
