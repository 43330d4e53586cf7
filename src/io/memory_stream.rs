use crate::error::StreamError;
use crate::io::Stream;
use crate::memory::MemoryBlock;

/// A stream over a single pre-existing [`MemoryBlock`].
///
/// Each read hands out a zero-copy sub-span of the block; once the block is
/// exhausted the stream stays at end. It cannot be rewound.
pub struct MemoryStream {
    remaining: MemoryBlock,
    chunk_size: Option<usize>,
}

impl MemoryStream {
    /// Return the whole block in a single read.
    pub fn new(block: MemoryBlock) -> Self {
        Self {
            remaining: block,
            chunk_size: None,
        }
    }

    /// Return the block in sub-spans of at most `chunk_size` bytes.
    pub fn with_chunk_size(block: MemoryBlock, chunk_size: usize) -> Self {
        Self {
            remaining: block,
            chunk_size: Some(chunk_size.max(1)),
        }
    }
}

impl Stream for MemoryStream {
    fn read_chunk(&mut self) -> Result<Option<MemoryBlock>, StreamError> {
        if self.remaining.is_empty() {
            return Ok(None);
        }

        let mid = self
            .chunk_size
            .map_or(self.remaining.len(), |size| size.min(self.remaining.len()));

        let (chunk, rest) = self.remaining.split_at(mid);
        self.remaining = rest;
        Ok(Some(chunk))
    }
}
