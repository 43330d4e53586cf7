use crate::data::Data;
use crate::data_source::DataSource;
use crate::error::{DataPipelineError, Result};
use crate::io::glob;
use crate::pipeline::DataPipelineBuilder;
use crate::tape::Tape;
use std::path::PathBuf;

/// Build a pipeline yielding the records of `seq` in order.
pub fn read_sequence(seq: Vec<Data>) -> DataPipelineBuilder {
    DataPipelineBuilder::new(move || {
        Ok(Box::new(ReadSequenceDataSource::new(seq)) as Box<dyn DataSource>)
    })
}

/// Build a pipeline yielding the pathnames of the files under `pathname`.
///
/// Directories are walked recursively; with a `pattern` only files whose name
/// matches the glob are listed. Files come out in sorted order, each as a
/// [`Data::String`]. The listing is taken once, when the pipeline is built.
///
/// # Errors
/// Building fails with [`DataPipelineError::ReadFailure`] if `pathname` does
/// not exist or cannot be walked.
pub fn list_files(pathname: impl Into<PathBuf>, pattern: Option<&str>) -> DataPipelineBuilder {
    let pathname = pathname.into();
    let pattern = pattern.map(str::to_owned);

    DataPipelineBuilder::new(move || {
        let files = glob::list_files(&pathname, pattern.as_deref())
            .map_err(|e| DataPipelineError::read_failure(&pathname, e))?;

        let seq = files
            .into_iter()
            .map(|p| Data::String(p.to_string_lossy().into_owned()))
            .collect();

        Ok(Box::new(ReadSequenceDataSource::new(seq)) as Box<dyn DataSource>)
    })
}

/// A source over an in-memory sequence of records.
pub struct ReadSequenceDataSource {
    seq: Vec<Data>,
    pos: usize,
}

impl ReadSequenceDataSource {
    pub fn new(seq: Vec<Data>) -> Self {
        Self { seq, pos: 0 }
    }
}

impl DataSource for ReadSequenceDataSource {
    fn next(&mut self) -> Result<Option<Data>> {
        let Some(d) = self.seq.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        Ok(Some(d.clone()))
    }

    fn skip(&mut self, num_examples: usize) -> Result<usize> {
        let n = num_examples.min(self.seq.len().saturating_sub(self.pos));
        self.pos += n;
        Ok(n)
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn record_position(&self, tape: &mut Tape) -> Result<()> {
        tape.record(&self.pos)?;
        Ok(())
    }

    fn reload_position(&mut self, tape: &mut Tape) -> Result<()> {
        self.pos = tape.read::<usize>()?;
        Ok(())
    }
}
