//! Byte-level acquisition: streams over files and memory, text decoding and
//! file listing.
//!
//! Streams are an internal concern of file-backed pipeline sources; consumers
//! of a pipeline only ever see [`Data`](crate::Data) records.

mod file_stream;
mod memory_stream;
mod stream;
mod text_stream;

pub mod file;
pub mod glob;

pub use file::{DEFAULT_BLOCK_SIZE, FileMode, FileOptions, read_file};
pub use file_stream::FileStream;
pub use memory_stream::MemoryStream;
pub use stream::Stream;
pub use text_stream::{TextEncoding, TextStream};
