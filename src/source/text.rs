use crate::data::Data;
use crate::data_source::DataSource;
use crate::error::{DataPipelineError, Result};
use crate::io::{FileMode, FileOptions, Stream, read_file};
use crate::pipeline::DataPipelineBuilder;
use crate::tape::Tape;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Build a pipeline yielding the lines of the text file at `pathname`.
///
/// `opts` selects memory mapping, block size and encoding; the mode is always
/// [`FileMode::Text`]. Line terminators (`\n` or `\r\n`) are removed, and a
/// final line without a terminator is still yielded.
pub fn read_text(pathname: impl Into<PathBuf>, opts: FileOptions) -> DataPipelineBuilder {
    let pathname = pathname.into();

    DataPipelineBuilder::new(move || {
        let source = ReadTextDataSource::new(pathname, opts)?;
        Ok(Box::new(source) as Box<dyn DataSource>)
    })
}

pub struct ReadTextDataSource {
    pathname: PathBuf,
    opts: FileOptions,
    stream: Option<Box<dyn Stream>>,
    // Text after the last line terminator seen so far.
    partial_line: String,
    lines: VecDeque<String>,
    num_lines_read: usize,
    is_eod: bool,
}

impl ReadTextDataSource {
    /// Open `pathname` as a text stream.
    ///
    /// # Errors
    /// Returns [`DataPipelineError::ReadFailure`] wrapping the stream error
    /// if the file cannot be opened.
    pub fn new(pathname: impl Into<PathBuf>, mut opts: FileOptions) -> Result<Self> {
        let pathname = pathname.into();

        opts.mode = FileMode::Text;

        let stream = open_text(&pathname, &opts)?;

        Ok(Self {
            pathname,
            opts,
            stream: Some(stream),
            partial_line: String::new(),
            lines: VecDeque::new(),
            num_lines_read: 0,
            is_eod: false,
        })
    }

    /// Read one chunk from the stream and split it into lines.
    fn read_lines(&mut self) -> Result<()> {
        if self.stream.is_none() {
            self.stream = Some(open_text(&self.pathname, &self.opts)?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };

        let chunk = stream
            .read_chunk()
            .map_err(|e| DataPipelineError::read_failure(&self.pathname, e))?;

        let Some(chunk) = chunk else {
            self.is_eod = true;
            self.stream = None;

            if !self.partial_line.is_empty() {
                self.lines.push_back(std::mem::take(&mut self.partial_line));
            }
            return Ok(());
        };

        let text = std::str::from_utf8(&chunk)
            .map_err(|e| DataPipelineError::read_failure(&self.pathname, e))?;

        let mut rest = text;
        while let Some(i) = rest.find('\n') {
            self.partial_line.push_str(&rest[..i]);

            let mut line = std::mem::take(&mut self.partial_line);
            if line.ends_with('\r') {
                line.pop();
            }
            self.lines.push_back(line);

            rest = &rest[i + 1..];
        }
        self.partial_line.push_str(rest);

        Ok(())
    }
}

fn open_text(pathname: &Path, opts: &FileOptions) -> Result<Box<dyn Stream>> {
    read_file(pathname, opts).map_err(|e| DataPipelineError::read_failure(pathname, e))
}

impl DataSource for ReadTextDataSource {
    fn next(&mut self) -> Result<Option<Data>> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                self.num_lines_read += 1;
                return Ok(Some(Data::String(line)));
            }

            if self.is_eod {
                return Ok(None);
            }

            self.read_lines()?;
        }
    }

    fn reset(&mut self) {
        // The file is reopened on the next read.
        self.stream = None;
        self.partial_line.clear();
        self.lines.clear();
        self.num_lines_read = 0;
        self.is_eod = false;
    }

    fn record_position(&self, tape: &mut Tape) -> Result<()> {
        tape.record(&self.num_lines_read)?;
        Ok(())
    }

    fn reload_position(&mut self, tape: &mut Tape) -> Result<()> {
        let num_lines_read = tape.read::<usize>()?;

        self.reset();

        self.skip(num_lines_read)?;

        Ok(())
    }
}
