//! Position tapes.
//!
//! A [`Tape`] is an append-only log of typed entries. Data sources record their
//! resumption state to it in a fixed order (local state first, then the
//! upstream source) and read it back in exactly the same order on reload.
//!
//! Each entry is a postcard-encoded value tagged with the name of the type it
//! was recorded as, so reading an entry back as the wrong type fails with
//! [`TapeError::TypeMismatch`] instead of silently decoding garbage.
//!
//! ```
//! use ironpipe::Tape;
//! # fn main() -> Result<(), ironpipe::TapeError> {
//! let mut t = Tape::new();
//! t.record(&3usize)?;
//! t.record(&vec![Some(1i64), None])?;
//!
//! t.rewind();
//! assert_eq!(t.read::<usize>()?, 3);
//! assert_eq!(t.read::<Vec<Option<i64>>>()?, vec![Some(1), None]);
//! # Ok(())
//! # }
//! ```

use crate::error::TapeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::type_name;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct TapeEntry {
    type_name: String,
    bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tape {
    entries: Vec<TapeEntry>,
    #[serde(skip)]
    cursor: usize,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the end of the tape.
    ///
    /// The entry is tagged with the exact type `T`. It must be read back with
    /// [`read::<T>`](Tape::read) for that same `T`: recording a `str` and
    /// reading a `String`, or a `u32` and reading a `usize`, is a
    /// [`TapeError::TypeMismatch`] even where the encoded bytes would agree.
    ///
    /// # Errors
    /// Returns [`TapeError::Encode`] if `value` cannot be serialized.
    pub fn record<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TapeError> {
        let bytes = postcard::to_allocvec(value).map_err(TapeError::Encode)?;
        self.entries.push(TapeEntry {
            type_name: type_name::<T>().to_owned(),
            bytes,
        });
        Ok(())
    }

    /// Read the entry under the cursor as a `T` and advance the cursor.
    ///
    /// `T` must be the exact type the entry was recorded as. Type tags come
    /// from [`std::any::type_name`], whose output is not guaranteed to be
    /// stable across compiler versions, so a tape written by one build is only
    /// guaranteed to be readable by the same build.
    ///
    /// # Errors
    /// Fails if the tape is exhausted, the entry was recorded as another type,
    /// or its bytes cannot be decoded.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, TapeError> {
        let position = self.cursor;
        let entry = self
            .entries
            .get(position)
            .ok_or(TapeError::EndOfTape { position })?;

        let expected = type_name::<T>();
        if entry.type_name != expected {
            return Err(TapeError::TypeMismatch {
                position,
                expected: expected.to_owned(),
                found: entry.type_name.clone(),
            });
        }

        let value = postcard::from_bytes(&entry.bytes)
            .map_err(|source| TapeError::Decode { position, source })?;
        self.cursor += 1;
        Ok(value)
    }

    /// Move the read cursor back to the first entry.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Number of entries recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries left to read before the end of the tape.
    pub fn remaining(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor)
    }

    /// Serialize the recorded entries. The read cursor is not persisted.
    ///
    /// # Errors
    /// Returns [`TapeError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TapeError> {
        postcard::to_allocvec(self).map_err(TapeError::Encode)
    }

    /// Restore a tape written by [`Tape::to_bytes`], positioned at its start.
    ///
    /// # Errors
    /// Returns [`TapeError::Decode`] if `bytes` is not a serialized tape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TapeError> {
        postcard::from_bytes(bytes).map_err(|source| TapeError::Decode {
            position: 0,
            source,
        })
    }
}
