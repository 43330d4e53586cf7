use crate::error::StreamError;
use crate::memory::MemoryBlock;

/// A source of raw byte chunks.
///
/// Implementations return `Ok(None)` once the underlying bytes are exhausted
/// and keep returning it on every later call.
pub trait Stream: Send {
    /// Read the next chunk, or `None` at end of stream.
    ///
    /// # Errors
    /// Returns a [`StreamError`] if the underlying read or decode fails.
    fn read_chunk(&mut self) -> Result<Option<MemoryBlock>, StreamError>;

    /// Drain the stream into a single buffer.
    ///
    /// # Errors
    /// Propagates the first error returned by [`Stream::read_chunk`].
    fn read_to_end(&mut self) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.read_chunk()? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn read_chunk(&mut self) -> Result<Option<MemoryBlock>, StreamError> {
        (**self).read_chunk()
    }
}
