use std::io::Read;

use crate::error::{Result, TransportError};

/// A readable stream that can remember a position and return to it.
///
/// The contract mirrors a classic buffered input stream: after
/// [`mark`](Markable::mark), up to `read_limit` bytes may be read and
/// [`reset`](Markable::reset) still returns to the marked position. Reading
/// further may invalidate the mark.
pub trait Markable: Read {
    /// Remember the current position.
    fn mark(&mut self, read_limit: usize) -> Result<()>;

    /// Rewind to the last mark. The mark stays in place.
    fn reset(&mut self) -> Result<()>;

    /// Largest read limit this stream can honour, `None` when unbounded.
    fn mark_capacity(&self) -> Option<usize>;

    /// Discard exactly `n` bytes.
    fn skip(&mut self, n: usize) -> Result<()> {
        let mut limited = Read::take(&mut *self, n as u64);
        let skipped = std::io::copy(&mut limited, &mut std::io::sink())?;
        if skipped < n as u64 {
            return Err(TransportError::Truncated {
                expected: n,
                actual: skipped as usize,
            });
        }
        Ok(())
    }
}

impl<M: Markable + ?Sized> Markable for &mut M {
    fn mark(&mut self, read_limit: usize) -> Result<()> {
        (**self).mark(read_limit)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn mark_capacity(&self) -> Option<usize> {
        (**self).mark_capacity()
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        (**self).skip(n)
    }
}

impl<M: Markable + ?Sized> Markable for Box<M> {
    fn mark(&mut self, read_limit: usize) -> Result<()> {
        (**self).mark(read_limit)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn mark_capacity(&self) -> Option<usize> {
        (**self).mark_capacity()
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        (**self).skip(n)
    }
}
