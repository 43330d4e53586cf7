//! Testing utilities for ironpipe pipelines.
//!
//! Helpers for users writing tests against their own pipelines:
//!
//! - [`drain`]: run a pipeline to exhaustion
//! - [`assert_collections_equal`]: order-dependent comparison with a readable diff
//! - [`assert_resumes_identically`]: check that a recorded position resumes
//!   exactly where it was taken
//! - [`text_fixture`] / [`zip_fixture`]: temporary input files
//!
//! # Example
//!
//! ```
//! use ironpipe::*;
//! use ironpipe::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let make = || {
//!     read_sequence((0..10).map(Data::Int).collect())
//!         .map(|d: Data| Ok(d), MapOptions { num_parallel_calls: 3, ..Default::default() })
//!         .build()
//! };
//!
//! assert_resumes_identically(make, 4)?;
//! # Ok(())
//! # }
//! ```

use crate::data::Data;
use crate::error::Result;
use crate::pipeline::DataPipeline;
use crate::tape::Tape;
use std::fmt::Debug;
use std::io::Write;
use tempfile::NamedTempFile;

/// Pull every remaining record out of `pipeline`.
///
/// # Errors
///
/// Returns the first error raised by the pipeline.
pub fn drain(pipeline: &mut DataPipeline) -> Result<Vec<Data>> {
    pipeline.iter().collect()
}

/// Assert that two collections are equal in order and content.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            a, e,
            "Collection mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}"
        );
    }
}

/// Advance a pipeline from `make` by `k` records, record its position, and
/// check that a fresh pipeline from `make` reloaded from that position yields
/// exactly the records the first one still had left.
///
/// The tape goes through [`Tape::to_bytes`] / [`Tape::from_bytes`] on the way,
/// as it would when persisted between processes.
///
/// # Errors
///
/// Returns any error raised while building or driving either pipeline.
///
/// # Panics
///
/// Panics if the resumed sequence differs from the original one.
pub fn assert_resumes_identically<F>(make: F, k: usize) -> anyhow::Result<()>
where
    F: Fn() -> Result<DataPipeline>,
{
    let mut original = make()?;
    for _ in 0..k {
        if original.next()?.is_none() {
            break;
        }
    }

    let mut tape = Tape::new();
    original.record_position(&mut tape)?;

    let expected = drain(&mut original)?;

    let mut tape = Tape::from_bytes(&tape.to_bytes()?)?;
    let mut resumed = make()?;
    resumed.reload_position(&mut tape)?;

    let actual = drain(&mut resumed)?;

    assert_collections_equal(&actual, &expected);
    Ok(())
}

/// A temporary file holding `contents`, deleted when dropped.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn text_fixture(contents: &[u8]) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents)?;
    file.flush()?;
    Ok(file)
}

/// A temporary zip archive holding `entries` in the given order, deleted when
/// dropped.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
#[cfg(feature = "archive")]
pub fn zip_fixture(entries: &[(&str, &[u8])]) -> anyhow::Result<NamedTempFile> {
    let file = tempfile::Builder::new().suffix(".zip").tempfile()?;

    let mut writer = zip::ZipWriter::new(file.as_file());
    for (name, contents) in entries {
        writer.start_file(*name, zip::write::FileOptions::default())?;
        writer.write_all(contents)?;
    }
    writer.finish()?;
    drop(writer);

    Ok(file)
}
