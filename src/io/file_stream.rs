use crate::error::StreamError;
use crate::io::Stream;
use crate::memory::MemoryBlock;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;

/// A stream issuing one bounded read per chunk from an owned file handle.
///
/// The handle is closed when the stream is dropped.
pub struct FileStream {
    file: File,
    pathname: PathBuf,
    chunk_size: usize,
    is_eod: bool,
}

impl FileStream {
    pub fn new(file: File, pathname: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            file,
            pathname: pathname.into(),
            chunk_size: chunk_size.max(1),
            is_eod: false,
        }
    }
}

impl Stream for FileStream {
    fn read_chunk(&mut self) -> Result<Option<MemoryBlock>, StreamError> {
        if self.is_eod {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.file.read(&mut buf) {
                Ok(0) => {
                    self.is_eod = true;
                    return Ok(None);
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(MemoryBlock::from_vec(buf)));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(StreamError::Read {
                        pathname: self.pathname.clone(),
                        source,
                    });
                }
            }
        }
    }
}
