//! # Ironpipe
//!
//! A **resumable data streaming pipeline engine** for Rust. Ironpipe chains lazy
//! stages (read from a file, read from a zip archive, map, ...) over a stream of
//! records, runs them on demand, and records the exact execution position so a
//! long-running consumer such as a training loop can checkpoint and resume
//! without reprocessing or skipping records.
//!
//! ## Key Features
//!
//! - **Lazy pull-based stages** - records are produced only when the consumer asks
//! - **Parallel map** - transforms run over a window of records on a rayon pool,
//!   results always come out in input order
//! - **Skip-on-error policy** - `warn_only` drops failing records instead of failing
//! - **Exact resumption** - positions are recorded to a [`Tape`] and reloaded
//!   into a fresh pipeline
//! - **File acquisition** - memory-mapped or chunked reads, with text decoding
//! - **Zip archives** - one record per archive entry (feature `archive`)
//! - **On-disk checkpoints** - persist tapes between runs (feature `checkpointing`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironpipe::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut pipeline = read_text("corpus.txt", FileOptions::default())
//!     .map(
//!         |line: Data| {
//!             let line = line.into_string().unwrap_or_default();
//!             Ok(Data::from(line.to_uppercase()))
//!         },
//!         MapOptions::parallel(),
//!     )
//!     .build()?;
//!
//! // Consume a few records, then record the position.
//! for _ in 0..100 {
//!     pipeline.next()?;
//! }
//! let mut tape = Tape::new();
//! pipeline.record_position(&mut tape)?;
//!
//! // Later, possibly in another process: rebuild and resume.
//! let mut resumed = read_text("corpus.txt", FileOptions::default())
//!     .map(|line: Data| Ok(line), MapOptions::parallel())
//!     .build()?;
//! resumed.reload_position(&mut tape)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Data sources
//!
//! Every stage implements [`DataSource`]: `next`, `skip`, `reset`,
//! `record_position` and `reload_position`. Producers sit at the bottom of a
//! chain; the map stage owns the source it wraps and forwards reset and
//! position calls to it.
//!
//! ### Pipelines
//!
//! A [`DataPipelineBuilder`] describes a chain; [`DataPipelineBuilder::build`]
//! constructs it into a [`DataPipeline`] driven by a single consumer.
//!
//! ### Streams
//!
//! The [`io`] module turns files into byte or text [`Stream`](io::Stream)s.
//! Streams are an internal concern of file-backed producers such as
//! [`read_text`].
//!
//! ## Module Overview
//!
//! - [`data`] - the record value
//! - [`data_source`] - the stage protocol
//! - [`source`] - producers and the map stage
//! - [`pipeline`] - builder and driver
//! - [`tape`] - position recording
//! - [`io`] - byte streams, text decoding, file listing
//! - [`memory`] - shared byte spans
//! - [`checkpoint`] - on-disk tape persistence
//! - [`testing`] - helpers for testing pipelines

pub mod checkpoint;
pub mod data;
pub mod data_source;
pub mod error;
pub mod io;
pub mod memory;
pub mod pipeline;
pub mod source;
pub mod tape;
pub mod testing;

// General re-exports
pub use data::Data;
pub use data_source::DataSource;
pub use error::{DataPipelineError, Result, StreamError, TapeError};
pub use io::{FileMode, FileOptions, TextEncoding, read_file};
pub use memory::MemoryBlock;
pub use pipeline::{DataPipeline, DataPipelineBuilder};
pub use source::{MapOptions, list_files, read_sequence, read_text, zip_data_pipelines};
pub use tape::Tape;

// Gated re-exports
#[cfg(feature = "archive")]
pub use source::read_zipped_records;
