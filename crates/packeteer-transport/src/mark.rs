use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{Result, TransportError};
use crate::traits::Markable;

/// Default number of bytes a [`MarkReader`] can rewind over: 64 KiB.
pub const DEFAULT_MARK_CAPACITY: usize = 64 * 1024;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Buffers any `Read` stream so it can be marked and rewound.
///
/// Bytes are pulled from the inner stream in chunks. While a mark is active,
/// everything read since the mark is retained (up to the mark's read limit)
/// so that [`reset`](Markable::reset) can replay it.
pub struct MarkReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    mark: Option<usize>,
    mark_limit: usize,
    capacity: usize,
}

impl<R: Read> MarkReader<R> {
    /// Wrap a stream with the default mark capacity.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_MARK_CAPACITY)
    }

    /// Wrap a stream, allowing marks with read limits up to `capacity` bytes.
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK_SIZE.min(capacity.max(1))),
            pos: 0,
            mark: None,
            mark_limit: 0,
            capacity,
        }
    }

    /// Bytes buffered but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Reading from it directly skips over buffered bytes.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the adapter and return the inner stream. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> std::io::Result<usize> {
        match self.mark {
            Some(mark) if self.buf.len() - mark < self.mark_limit => {
                // Keep everything from the mark onwards, drop the rest.
                self.buf.drain(..mark);
                self.pos -= mark;
                self.mark = Some(0);
            }
            Some(_) => {
                tracing::trace!(limit = self.mark_limit, "mark read limit exceeded, mark dropped");
                self.mark = None;
                self.buf.clear();
                self.pos = 0;
            }
            None => {
                self.buf.clear();
                self.pos = 0;
            }
        }

        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK_SIZE, 0);
        let read = loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(err);
                }
            }
        };
        self.buf.truncate(start + read);
        Ok(read)
    }
}

impl<R: Read> Read for MarkReader<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.pos == self.buf.len() && self.fill()? == 0 {
            return Ok(0);
        }

        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R: Read> Markable for MarkReader<R> {
    fn mark(&mut self, read_limit: usize) -> Result<()> {
        if read_limit > self.capacity {
            return Err(TransportError::MarkLimitExceeded {
                requested: read_limit,
                capacity: self.capacity,
            });
        }
        self.mark = Some(self.pos);
        self.mark_limit = read_limit;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        match self.mark {
            Some(mark) => {
                self.pos = mark;
                Ok(())
            }
            None => Err(TransportError::MarkInvalidated),
        }
    }

    fn mark_capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

impl<R> std::fmt::Debug for MarkReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkReader")
            .field("buffered", &(self.buf.len() - self.pos))
            .field("mark", &self.mark)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Marks a seekable stream by remembering its position.
///
/// Works for `std::io::Cursor`, files and anything else that is
/// `Read + Seek`. There is no read limit: the whole stream stays reachable.
#[derive(Debug)]
pub struct SeekMark<S> {
    inner: S,
    mark: Option<u64>,
}

impl<S: Read + Seek> SeekMark<S> {
    /// Wrap a seekable stream.
    pub fn new(inner: S) -> Self {
        Self { inner, mark: None }
    }

    /// Current position of the underlying stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read> Read for SeekMark<S> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(out)
    }
}

impl<S: Read + Seek> Markable for SeekMark<S> {
    fn mark(&mut self, _read_limit: usize) -> Result<()> {
        self.mark = Some(self.inner.stream_position()?);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let mark = self.mark.ok_or(TransportError::MarkInvalidated)?;
        self.inner.seek(SeekFrom::Start(mark))?;
        Ok(())
    }

    fn mark_capacity(&self) -> Option<usize> {
        None
    }
}
