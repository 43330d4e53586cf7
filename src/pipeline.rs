//! Pipeline construction and driving.
//!
//! A [`DataPipelineBuilder`] holds a one-shot factory for the root
//! [`DataSource`] of a chain; stages such as [`map`](DataPipelineBuilder::map)
//! wrap the factory. [`build`](DataPipelineBuilder::build) runs it, so
//! construction errors (a missing file, a corrupt archive) surface right away.
//!
//! ```no_run
//! use ironpipe::*;
//!
//! # fn main() -> ironpipe::Result<()> {
//! let mut pipeline = read_zipped_records("data.zip")
//!     .map(
//!         |d: Data| Ok(Data::Int(d.as_str().map_or(0, str::len) as i64)),
//!         MapOptions { num_parallel_calls: 8, warn_only: true, ..Default::default() },
//!     )
//!     .build()?;
//!
//! while let Some(d) = pipeline.next()? {
//!     println!("{d:?}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::data::Data;
use crate::data_source::DataSource;
use crate::error::{DataPipelineError, Result};
use crate::source::{MapDataSource, MapFn, MapOptions};
use crate::tape::Tape;
use std::sync::Arc;

type SourceFactory = Box<dyn FnOnce() -> Result<Box<dyn DataSource>> + Send>;

pub struct DataPipelineBuilder {
    factory: SourceFactory,
}

impl DataPipelineBuilder {
    /// A builder whose root source is produced by `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn DataSource>> + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }

    /// Apply `f` to every record.
    pub fn map<F>(self, f: F, opts: MapOptions) -> Self
    where
        F: Fn(Data) -> anyhow::Result<Data> + Send + Sync + 'static,
    {
        self.filter_map(move |d| f(d).map(Some), opts)
    }

    /// Apply `f` to every record, dropping those it maps to `None`.
    pub fn filter_map<F>(self, f: F, opts: MapOptions) -> Self
    where
        F: Fn(Data) -> anyhow::Result<Option<Data>> + Send + Sync + 'static,
    {
        let map_fn: MapFn = Arc::new(f);
        let inner = self.factory;

        Self::new(move || {
            let source = MapDataSource::new(inner()?, map_fn, &opts)?;
            Ok(Box::new(source) as Box<dyn DataSource>)
        })
    }

    /// Construct the chain of sources.
    ///
    /// # Errors
    /// Returns the first error raised while constructing a stage.
    pub fn build(self) -> Result<DataPipeline> {
        let source = (self.factory)()?;

        Ok(DataPipeline {
            source,
            is_broken: false,
        })
    }
}

/// A built chain of data sources driven by a single consumer.
///
/// Once an operation fails the pipeline is *broken*: `next`, `skip` and
/// `record_position` fail with [`DataPipelineError::Broken`] until `reset` or
/// a successful `reload_position`.
pub struct DataPipeline {
    source: Box<dyn DataSource>,
    is_broken: bool,
}

impl DataPipeline {
    /// # Errors
    /// See [`DataSource::next`].
    pub fn next(&mut self) -> Result<Option<Data>> {
        self.check_if_broken()?;

        let r = self.source.next();
        self.is_broken = r.is_err();
        r
    }

    /// Skip up to `num_examples` records, returning how many were skipped.
    ///
    /// # Errors
    /// See [`DataSource::skip`].
    pub fn skip(&mut self, num_examples: usize) -> Result<usize> {
        self.check_if_broken()?;

        let r = self.source.skip(num_examples);
        self.is_broken = r.is_err();
        r
    }

    /// Rewind to the start. Also clears a broken state.
    pub fn reset(&mut self) {
        self.source.reset();

        self.is_broken = false;
    }

    /// # Errors
    /// See [`DataSource::record_position`].
    pub fn record_position(&self, tape: &mut Tape) -> Result<()> {
        self.check_if_broken()?;

        self.source.record_position(tape)
    }

    /// # Errors
    /// See [`DataSource::reload_position`].
    pub fn reload_position(&mut self, tape: &mut Tape) -> Result<()> {
        let r = self.source.reload_position(tape);
        self.is_broken = r.is_err();
        r
    }

    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    /// Iterate over the remaining records. The iterator ends after yielding
    /// the first error.
    pub fn iter(&mut self) -> impl Iterator<Item = Result<Data>> + '_ {
        let mut failed = false;
        std::iter::from_fn(move || {
            if failed {
                return None;
            }
            let r = self.next().transpose();
            failed = matches!(r, Some(Err(_)));
            r
        })
    }

    fn check_if_broken(&self) -> Result<()> {
        if self.is_broken {
            return Err(DataPipelineError::Broken);
        }
        Ok(())
    }
}
