//! Pipeline stages: producers reading records from memory, files and
//! archives, and the map stage transforming them.

pub mod map;
pub mod sequence;
pub mod text;
pub mod zip_pipelines;

#[cfg_attr(docsrs, doc(cfg(feature = "archive")))]
#[cfg(feature = "archive")]
pub mod zipfile;

pub use map::{MapDataSource, MapFn, MapOptions};
pub use sequence::{ReadSequenceDataSource, list_files, read_sequence};
pub use text::{ReadTextDataSource, read_text};
pub use zip_pipelines::{ZipPipelinesDataSource, zip_data_pipelines};

#[cfg(feature = "archive")]
pub use zipfile::{ZipFileDataSource, read_zipped_records};
