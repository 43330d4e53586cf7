//! Opening files as byte or text streams.
//!
//! [`read_file`] is the single entry point: it opens a path, classifies OS
//! errors, chooses between a whole-file memory map and chunked reads, and
//! optionally layers text decoding on top.
//!
//! ```no_run
//! use ironpipe::io::{read_file, FileMode, FileOptions, Stream};
//!
//! # fn main() -> Result<(), ironpipe::StreamError> {
//! let opts = FileOptions {
//!     memory_map: true,
//!     mode: FileMode::Text,
//!     ..Default::default()
//! };
//! let mut s = read_file("corpus.txt", &opts)?;
//! while let Some(chunk) = s.read_chunk()? {
//!     // `chunk` holds whole UTF-8 characters only.
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::StreamError;
use crate::io::{FileStream, MemoryStream, Stream, TextEncoding, TextStream};
use crate::memory::MemoryBlock;
use memmap2::Mmap;
use std::fs::File;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::Path;

/// Chunk size used when [`FileOptions::block_size`] is not set (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 0x0010_0000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileMode {
    #[default]
    Binary,
    Text,
}

/// How [`read_file`] acquires and presents a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Map the whole file into memory instead of reading it in chunks.
    pub memory_map: bool,
    /// Chunk size for reads and decoding; `None` means [`DEFAULT_BLOCK_SIZE`].
    pub block_size: Option<NonZeroUsize>,
    pub mode: FileMode,
    /// Only used when `mode` is [`FileMode::Text`].
    pub text_encoding: TextEncoding,
}

impl FileOptions {
    /// Options for a text stream in `encoding`.
    pub fn text(encoding: TextEncoding) -> Self {
        Self {
            mode: FileMode::Text,
            text_encoding: encoding,
            ..Default::default()
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.block_size.map_or(DEFAULT_BLOCK_SIZE, NonZeroUsize::get)
    }
}

/// Open `pathname` as a stream configured by `opts`.
///
/// The returned stream owns the file handle (chunked reads) or shares the
/// mapping (memory map); both are released when the stream is dropped.
///
/// # Errors
/// - [`StreamError::NotFound`] if the path does not exist
/// - [`StreamError::PermissionDenied`] if access is refused
/// - [`StreamError::Open`] for any other failure to open
/// - [`StreamError::MemoryMap`] if mapping was requested and fails
pub fn read_file(
    pathname: impl AsRef<Path>,
    opts: &FileOptions,
) -> Result<Box<dyn Stream>, StreamError> {
    let pathname = pathname.as_ref();

    let file = open_file(pathname)?;

    let chunk_size = opts.chunk_size();

    let mut stream: Box<dyn Stream> = if opts.memory_map {
        log::debug!("memory mapping {}", pathname.display());

        let block = memory_map_file(&file, pathname)?;

        Box::new(MemoryStream::new(block))
    } else {
        log::debug!("reading {} in chunks of {chunk_size} bytes", pathname.display());

        Box::new(FileStream::new(file, pathname, chunk_size))
    };

    if opts.mode == FileMode::Text {
        log::debug!("decoding {} as {}", pathname.display(), opts.text_encoding);

        stream = Box::new(TextStream::new(stream, opts.text_encoding, chunk_size));
    }

    Ok(stream)
}

pub(crate) fn open_file(pathname: &Path) -> Result<File, StreamError> {
    File::open(pathname).map_err(|source| match source.kind() {
        ErrorKind::NotFound => StreamError::NotFound {
            pathname: pathname.to_path_buf(),
        },
        ErrorKind::PermissionDenied => StreamError::PermissionDenied {
            pathname: pathname.to_path_buf(),
        },
        _ => StreamError::Open {
            pathname: pathname.to_path_buf(),
            source,
        },
    })
}

fn memory_map_file(file: &File, pathname: &Path) -> Result<MemoryBlock, StreamError> {
    let map_error = |source| StreamError::MemoryMap {
        pathname: pathname.to_path_buf(),
        source,
    };

    // Zero-length mappings are rejected by some platforms.
    if file.metadata().map_err(map_error)?.len() == 0 {
        return Ok(MemoryBlock::empty());
    }

    // SAFETY: the mapping is read-only. As with any file-backed map, another
    // process truncating the file while it is mapped is outside our control.
    let mmap = unsafe { Mmap::map(file) }.map_err(map_error)?;

    hint_sequential_memory(&mmap, pathname);

    Ok(MemoryBlock::from_shared(mmap))
}

#[cfg(unix)]
fn hint_sequential_memory(mmap: &Mmap, pathname: &Path) {
    if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
        log::warn!(
            "the sequential access hint for {} was rejected: {e}",
            pathname.display()
        );
    }
}

#[cfg(not(unix))]
fn hint_sequential_memory(_mmap: &Mmap, _pathname: &Path) {}
