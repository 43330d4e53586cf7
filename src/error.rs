//! Error types for ironpipe.
//!
//! Errors are split by the layer that raises them:
//! - [`StreamError`] - opening, mapping, reading and decoding files
//! - [`TapeError`] - recording and replaying positions
//! - [`DataPipelineError`] - everything a consumer driving a pipeline can see
//!
//! Producer-level failures are normalized into [`DataPipelineError::ReadFailure`]
//! naming the offending pathname, with the underlying error kept as `source()`.

use crate::io::TextEncoding;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried in `#[source]` fields.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DataPipelineError>;

/// Errors raised by the byte stream layer.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("'{}' does not exist.", .pathname.display())]
    NotFound { pathname: PathBuf },

    #[error("The permission to read '{}' has been denied.", .pathname.display())]
    PermissionDenied { pathname: PathBuf },

    #[error("'{}' cannot be opened.", .pathname.display())]
    Open {
        pathname: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' cannot be memory mapped.", .pathname.display())]
    MemoryMap {
        pathname: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' cannot be read.", .pathname.display())]
    Read {
        pathname: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The byte at `offset` (counted from the start of the stream) starts an
    /// invalid or truncated sequence for `encoding`.
    #[error("The input at byte offset {offset} is not valid {encoding}.")]
    Decode { encoding: TextEncoding, offset: u64 },

    #[error("'{0}' is not a supported text encoding.")]
    UnsupportedEncoding(String),
}

impl StreamError {
    /// The pathname the error refers to, if any.
    pub fn pathname(&self) -> Option<&std::path::Path> {
        match self {
            Self::NotFound { pathname }
            | Self::PermissionDenied { pathname }
            | Self::Open { pathname, .. }
            | Self::MemoryMap { pathname, .. }
            | Self::Read { pathname, .. } => Some(pathname),
            Self::Decode { .. } | Self::UnsupportedEncoding(_) => None,
        }
    }
}

/// Errors raised while recording to or reading from a [`Tape`](crate::Tape).
#[derive(Debug, Error)]
pub enum TapeError {
    #[error("A value cannot be recorded to the tape.")]
    Encode(#[source] postcard::Error),

    #[error("The tape entry at position {position} cannot be decoded.")]
    Decode {
        position: usize,
        #[source]
        source: postcard::Error,
    },

    #[error("The tape entry at position {position} holds a `{found}`, but a `{expected}` was requested.")]
    TypeMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("The tape has no entry at position {position}.")]
    EndOfTape { position: usize },
}

/// Errors surfaced to the consumer of a data pipeline.
#[derive(Debug, Error)]
pub enum DataPipelineError {
    #[error("The data pipeline cannot read from '{}'.", .pathname.display())]
    ReadFailure {
        pathname: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("The map operation has failed. See the nested error for details.")]
    MapFailure {
        #[source]
        source: BoxError,
    },

    /// Raised deliberately by a transform to reject a record.
    #[error("{message}")]
    Record { message: String },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Tape(#[from] TapeError),

    #[error("The worker pool of the map operation cannot be created.")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("The data pipeline is broken by a previous operation and cannot be used.")]
    Broken,
}

impl DataPipelineError {
    /// Wrap `source` as a read failure of `pathname`.
    pub fn read_failure(pathname: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::ReadFailure {
            pathname: pathname.into(),
            source: source.into(),
        }
    }

    /// A record-level error a transform can return to drop or reject a record.
    pub fn record(message: impl Into<String>) -> Self {
        Self::Record {
            message: message.into(),
        }
    }
}
