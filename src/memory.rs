//! Immutable, reference-counted byte spans.
//!
//! A [`MemoryBlock`] either owns a heap buffer produced by a chunked read or
//! shares a memory-mapped region with every other block sliced from it. The
//! bytes are never mutated after the block is created, so blocks can be cloned
//! and sent across threads freely.

use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

type Holder = Arc<dyn AsRef<[u8]> + Send + Sync>;

#[derive(Clone)]
pub struct MemoryBlock {
    holder: Holder,
    offset: usize,
    len: usize,
}

impl MemoryBlock {
    /// An empty block.
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Take ownership of `bytes`.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            holder: Arc::new(bytes),
            offset: 0,
            len,
        }
    }

    /// Share an existing region (e.g. a memory map) for the lifetime of the block
    /// and of every slice taken from it.
    pub fn from_shared<H>(holder: H) -> Self
    where
        H: AsRef<[u8]> + Send + Sync + 'static,
    {
        let len = holder.as_ref().len();
        Self {
            holder: Arc::new(holder),
            offset: 0,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        let bytes: &[u8] = AsRef::<[u8]>::as_ref(&*self.holder);
        &bytes[self.offset..self.offset + self.len]
    }

    /// A zero-copy sub-span sharing this block's storage.
    ///
    /// # Panics
    /// Panics if `range` is out of bounds, like slice indexing does.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "range {range:?} out of bounds for a block of {} bytes",
            self.len
        );
        Self {
            holder: Arc::clone(&self.holder),
            offset: self.offset + range.start,
            len: range.end - range.start,
        }
    }

    /// Split the block at `mid`, returning `[0, mid)` and `[mid, len)`.
    pub fn split_at(&self, mid: usize) -> (Self, Self) {
        (self.slice(0..mid), self.slice(mid..self.len))
    }
}

impl Deref for MemoryBlock {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for MemoryBlock {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for MemoryBlock {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for MemoryBlock {}

impl From<Vec<u8>> for MemoryBlock {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
