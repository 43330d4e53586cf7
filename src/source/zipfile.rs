//! Records read out of a zip archive, one record per entry.

use crate::data::Data;
use crate::data_source::DataSource;
use crate::error::{BoxError, DataPipelineError, Result};
use crate::io::file::open_file;
use crate::pipeline::DataPipelineBuilder;
use crate::tape::Tape;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Build a pipeline yielding every entry of the zip archive at `pathname`, in
/// archive order.
///
/// Each entry is decompressed fully into memory and yielded as a
/// [`Data::String`], or as [`Data::Bytes`] if it is not valid UTF-8.
pub fn read_zipped_records(pathname: impl Into<PathBuf>) -> DataPipelineBuilder {
    let pathname = pathname.into();

    DataPipelineBuilder::new(move || {
        let source = ZipFileDataSource::new(pathname)?;
        Ok(Box::new(source) as Box<dyn DataSource>)
    })
}

pub struct ZipFileDataSource {
    pathname: PathBuf,
    archive: ZipArchive<File>,
    num_entries: usize,
    num_files_read: usize,
}

impl ZipFileDataSource {
    /// Open the archive and read its central directory.
    ///
    /// # Errors
    /// Returns [`DataPipelineError::ReadFailure`] if the archive cannot be
    /// opened or its entries cannot be enumerated.
    pub fn new(pathname: impl Into<PathBuf>) -> Result<Self> {
        let pathname = pathname.into();

        let file = open_file(&pathname).map_err(|e| read_failure(&pathname, e))?;

        let archive = ZipArchive::new(file).map_err(|e| read_failure(&pathname, e))?;

        let num_entries = archive.len();

        log::debug!("opened {} with {num_entries} entries", pathname.display());

        Ok(Self {
            pathname,
            archive,
            num_entries,
            num_files_read: 0,
        })
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }
}

fn read_failure(pathname: &Path, source: impl Into<BoxError>) -> DataPipelineError {
    DataPipelineError::read_failure(pathname, source)
}

/// Decompress a whole entry whose header claims `size` bytes.
///
/// The claimed size is only a capacity hint; a size that cannot be allocated
/// is an error rather than an abort.
fn read_entry(mut entry: impl Read, size: u64) -> std::result::Result<Vec<u8>, BoxError> {
    let size = usize::try_from(size).unwrap_or(usize::MAX);

    let mut buf = Vec::new();
    buf.try_reserve_exact(size)?;
    entry.read_to_end(&mut buf)?;

    Ok(buf)
}

impl DataSource for ZipFileDataSource {
    fn next(&mut self) -> Result<Option<Data>> {
        if self.num_files_read >= self.num_entries {
            return Ok(None);
        }

        let buf = {
            let entry = self
                .archive
                .by_index(self.num_files_read)
                .map_err(|e| read_failure(&self.pathname, e))?;

            let size = entry.size();
            read_entry(entry, size).map_err(|e| read_failure(&self.pathname, e))?
        };

        self.num_files_read += 1;

        let d = match String::from_utf8(buf) {
            Ok(s) => Data::String(s),
            Err(e) => Data::Bytes(e.into_bytes()),
        };
        Ok(Some(d))
    }

    /// Does not check against the number of entries; skipping past the end
    /// leaves the source exhausted until [`reset`](DataSource::reset).
    fn skip(&mut self, num_examples: usize) -> Result<usize> {
        self.num_files_read = self.num_files_read.saturating_add(num_examples);

        Ok(num_examples)
    }

    fn reset(&mut self) {
        self.num_files_read = 0;
    }

    fn record_position(&self, tape: &mut Tape) -> Result<()> {
        tape.record(&self.num_files_read)?;

        Ok(())
    }

    fn reload_position(&mut self, tape: &mut Tape) -> Result<()> {
        let num_files_read = tape.read::<usize>()?;

        self.reset();

        self.skip(num_files_read)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_read_whole() {
        let buf = read_entry(&b"payload"[..], 7).unwrap();
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn understated_size_still_reads_everything() {
        let buf = read_entry(&b"payload"[..], 2).unwrap();
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn unallocatable_size_is_an_error() {
        let err = read_entry(&b"x"[..], u64::MAX).unwrap_err();
        assert!(err.downcast_ref::<std::collections::TryReserveError>().is_some());
    }
}
