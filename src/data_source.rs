//! The lazy-iteration protocol shared by every pipeline stage.

use crate::data::Data;
use crate::error::Result;
use crate::tape::Tape;

/// A stateful, resettable, checkpointable producer of [`Data`] records.
///
/// A source is driven by a single consumer; stages that wrap another source
/// own it exclusively and forward `reset` and position calls to it.
///
/// Position recording order is fixed: a source records its own state first and
/// then lets its upstream source record; `reload_position` reads in the same
/// order. Recording a position and reloading it into an equivalent source
/// reproduces exactly the same future sequence of `next` results.
pub trait DataSource: Send {
    /// Produce the next record, or `None` once exhausted. An exhausted source
    /// keeps returning `None` until [`reset`](DataSource::reset).
    ///
    /// # Errors
    /// Producer read failures and, for transforming stages, transform failures.
    fn next(&mut self) -> Result<Option<Data>>;

    /// Skip up to `num_examples` records, returning how many were skipped.
    ///
    /// The default implementation calls [`next`](DataSource::next) repeatedly.
    ///
    /// # Errors
    /// Same as [`next`](DataSource::next).
    fn skip(&mut self, num_examples: usize) -> Result<usize> {
        for i in 0..num_examples {
            if self.next()?.is_none() {
                return Ok(i);
            }
        }
        Ok(num_examples)
    }

    /// Return to the start of the sequence, resetting any upstream source.
    fn reset(&mut self);

    /// Append this source's resumption state, then its upstream's, to `tape`.
    ///
    /// # Errors
    /// Returns an error if a value cannot be recorded.
    fn record_position(&self, tape: &mut Tape) -> Result<()>;

    /// Restore state recorded by [`record_position`](DataSource::record_position).
    ///
    /// # Errors
    /// Returns an error if the tape does not hold a matching position.
    fn reload_position(&mut self, tape: &mut Tape) -> Result<()>;
}
