use crate::data::Data;
use crate::data_source::DataSource;
use crate::error::Result;
use crate::pipeline::{DataPipeline, DataPipelineBuilder};
use crate::tape::Tape;

/// Build a pipeline that steps `pipelines` in lockstep, yielding a
/// [`Data::List`] with one record from each per step.
///
/// The zipped pipeline ends as soon as any of its inputs ends.
pub fn zip_data_pipelines(pipelines: Vec<DataPipeline>) -> DataPipelineBuilder {
    DataPipelineBuilder::new(move || {
        Ok(Box::new(ZipPipelinesDataSource::new(pipelines)) as Box<dyn DataSource>)
    })
}

pub struct ZipPipelinesDataSource {
    pipelines: Vec<DataPipeline>,
}

impl ZipPipelinesDataSource {
    pub fn new(pipelines: Vec<DataPipeline>) -> Self {
        Self { pipelines }
    }
}

impl DataSource for ZipPipelinesDataSource {
    fn next(&mut self) -> Result<Option<Data>> {
        if self.pipelines.is_empty() {
            return Ok(None);
        }

        let mut zipped = Vec::with_capacity(self.pipelines.len());
        for pipeline in &mut self.pipelines {
            let Some(d) = pipeline.next()? else {
                return Ok(None);
            };
            zipped.push(d);
        }

        Ok(Some(Data::List(zipped)))
    }

    fn reset(&mut self) {
        for pipeline in &mut self.pipelines {
            pipeline.reset();
        }
    }

    fn record_position(&self, tape: &mut Tape) -> Result<()> {
        for pipeline in &self.pipelines {
            pipeline.record_position(tape)?;
        }
        Ok(())
    }

    fn reload_position(&mut self, tape: &mut Tape) -> Result<()> {
        for pipeline in &mut self.pipelines {
            pipeline.reload_position(tape)?;
        }
        Ok(())
    }
}
