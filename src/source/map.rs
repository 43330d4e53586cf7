//! The map stage.
//!
//! [`MapDataSource`] applies a transform to every record of its upstream
//! source. With `num_parallel_calls > 1` it pulls a window of records, runs the
//! transform over the window on a rayon pool, and yields the results in the
//! order the records were pulled: each result is written back to the slot its
//! input came from, whatever order the workers finish in.
//!
//! # Failure policy
//!
//! A transform returning a [`DataPipelineError`] (inside the `anyhow::Error`)
//! fails with that error as is; any other error is wrapped in
//! [`DataPipelineError::MapFailure`]. With `warn_only` the error is logged
//! and the record is dropped instead.

use crate::data::Data;
use crate::data_source::DataSource;
use crate::error::{DataPipelineError, Result};
use crate::tape::Tape;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::error::Error;
use std::sync::Arc;

/// A transform applied by the map stage. Returning `Ok(None)` drops the record.
pub type MapFn = Arc<dyn Fn(Data) -> anyhow::Result<Option<Data>> + Send + Sync>;

/// Configuration of a map stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapOptions {
    /// Size of the window of records transformed together. `<= 1` disables
    /// buffering and parallelism.
    pub num_parallel_calls: usize,
    /// Drop records whose transform fails instead of failing the pipeline.
    pub warn_only: bool,
    /// Run on a dedicated pool of this many threads instead of the global
    /// rayon pool.
    pub num_threads: Option<usize>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            num_parallel_calls: 1,
            warn_only: false,
            num_threads: None,
        }
    }
}

impl MapOptions {
    /// A window as wide as the number of logical CPUs.
    pub fn parallel() -> Self {
        Self {
            num_parallel_calls: num_cpus::get(),
            ..Default::default()
        }
    }
}

pub struct MapDataSource {
    inner: Box<dyn DataSource>,
    map_fn: MapFn,
    num_parallel_calls: usize,
    warn_only: bool,
    pool: Option<Arc<ThreadPool>>,
    buffer: Vec<Option<Data>>,
    buffer_pos: usize,
}

impl MapDataSource {
    /// # Errors
    /// Returns [`DataPipelineError::ThreadPool`] if a dedicated pool was
    /// requested and cannot be started.
    pub fn new(inner: Box<dyn DataSource>, map_fn: MapFn, opts: &MapOptions) -> Result<Self> {
        let pool = match opts.num_threads {
            Some(n) if opts.num_parallel_calls > 1 => {
                Some(Arc::new(ThreadPoolBuilder::new().num_threads(n).build()?))
            }
            _ => None,
        };

        Ok(Self {
            inner,
            map_fn,
            num_parallel_calls: opts.num_parallel_calls,
            warn_only: opts.warn_only,
            pool,
            // Grown by `fill_buffer`.
            buffer: Vec::new(),
            buffer_pos: 0,
        })
    }

    /// Refill the window from upstream and transform it. Returns `false` if
    /// upstream had nothing left.
    fn fill_buffer(&mut self) -> Result<bool> {
        self.buffer.clear();
        self.buffer_pos = 0;

        for _ in 0..self.num_parallel_calls {
            let Some(d) = self.inner.next()? else {
                break;
            };
            self.buffer.push(Some(d));
        }

        if self.buffer.is_empty() {
            return Ok(false);
        }

        let Self {
            buffer,
            map_fn,
            warn_only,
            pool,
            ..
        } = self;
        let (map_fn, warn_only) = (&*map_fn, *warn_only);

        let apply = |slot: &mut Option<Data>| -> Result<()> {
            if let Some(d) = slot.take() {
                *slot = invoke_function(map_fn, warn_only, d)?;
            }
            Ok(())
        };

        // A single record is not worth dispatching to the pool.
        if buffer.len() == 1 {
            apply(&mut buffer[0])?;
        } else {
            let mut run = || buffer.par_iter_mut().map(apply).collect::<Vec<_>>();

            let outcomes = match pool {
                Some(pool) => pool.install(run),
                None => run(),
            };

            // Report the failure of the earliest record.
            outcomes.into_iter().collect::<Result<()>>()?;
        }

        Ok(true)
    }
}

fn invoke_function(map_fn: &MapFn, warn_only: bool, d: Data) -> Result<Option<Data>> {
    let err = match map_fn(d) {
        Ok(out) => return Ok(out),
        Err(e) => e,
    };

    let err = match err.downcast::<DataPipelineError>() {
        Ok(e) => e,
        Err(e) => DataPipelineError::MapFailure { source: e.into() },
    };

    if !warn_only {
        return Err(err);
    }

    log::warn!("dropping a record: {}", error_chain(&err));

    Ok(None)
}

fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}

impl DataSource for MapDataSource {
    fn next(&mut self) -> Result<Option<Data>> {
        if self.num_parallel_calls <= 1 {
            while let Some(d) = self.inner.next()? {
                if let Some(out) = invoke_function(&self.map_fn, self.warn_only, d)? {
                    return Ok(Some(out));
                }
            }
            return Ok(None);
        }

        loop {
            while self.buffer_pos < self.buffer.len() {
                let slot = self.buffer[self.buffer_pos].take();
                self.buffer_pos += 1;
                if slot.is_some() {
                    return Ok(slot);
                }
            }

            if !self.fill_buffer()? {
                return Ok(None);
            }
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.buffer_pos = 0;

        self.inner.reset();
    }

    fn record_position(&self, tape: &mut Tape) -> Result<()> {
        tape.record(&self.buffer)?;
        tape.record(&self.buffer_pos)?;

        self.inner.record_position(tape)
    }

    fn reload_position(&mut self, tape: &mut Tape) -> Result<()> {
        self.buffer = tape.read::<Vec<Option<Data>>>()?;
        self.buffer_pos = tape.read::<usize>()?;

        self.inner.reload_position(tape)
    }
}
