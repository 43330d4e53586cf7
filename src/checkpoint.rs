//! On-disk persistence of pipeline positions.
//!
//! A [`Tape`] only lives in memory. The checkpoint module writes a pipeline's
//! recorded position to a directory so that a consumer restarted in a new
//! process can resume where the last run stopped.
//!
//! # Features
//!
//! - **Named checkpoints** - several pipelines can share one directory
//! - **Monotonic steps** - the newest checkpoint of a name is always found
//! - **Retention** - only the newest `max_checkpoints` files are kept
//! - **Integrity** - a SHA-256 checksum of the tape is verified on load
//!
//! Tape entries are tagged with compiler-generated type names (see
//! [`Tape::read`](crate::Tape::read)). A checkpoint is only guaranteed to
//! restore under a build of the same crate with the same compiler; after an
//! upgrade a restore may fail with a type mismatch and the pipeline has to
//! start over.
//!
//! # Usage
//!
//! ```no_run
//! use ironpipe::*;
//! use ironpipe::checkpoint::{CheckpointConfig, CheckpointManager};
//! use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let mut manager = CheckpointManager::new(CheckpointConfig {
//!     directory: "./checkpoints".into(),
//!     ..Default::default()
//! })?;
//!
//! let mut pipeline = read_zipped_records("data.zip").build()?;
//! manager.restore_pipeline("train", &mut pipeline)?;
//!
//! while let Some(_example) = pipeline.next()? {
//!     // ...
//!     manager.save_pipeline("train", &pipeline)?;
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "checkpointing")]
use crate::pipeline::DataPipeline;
#[cfg(feature = "checkpointing")]
use crate::tape::Tape;
#[cfg(feature = "checkpointing")]
use anyhow::{Context, Result, anyhow};
#[cfg(feature = "checkpointing")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "checkpointing")]
use sha2::{Digest, Sha256};
#[cfg(feature = "checkpointing")]
use std::fs::{DirEntry, File, create_dir_all, read_dir, remove_file};
#[cfg(feature = "checkpointing")]
use std::io::{Read, Write};
#[cfg(feature = "checkpointing")]
use std::path::{Path, PathBuf};
#[cfg(feature = "checkpointing")]
use std::time::{SystemTime, UNIX_EPOCH};

/// Where and how many checkpoints are kept.
#[derive(Clone, Debug)]
#[cfg(feature = "checkpointing")]
pub struct CheckpointConfig {
    /// Directory where checkpoint files are stored.
    pub directory: PathBuf,
    /// Maximum number of checkpoints to retain per name (oldest are deleted
    /// first). None means keep all checkpoints.
    pub max_checkpoints: Option<usize>,
}

#[cfg(feature = "checkpointing")]
impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./ironpipe_checkpoints"),
            max_checkpoints: Some(10),
        }
    }
}

/// A persisted pipeline position.
#[derive(Serialize, Deserialize)]
#[cfg(feature = "checkpointing")]
pub struct CheckpointState {
    /// Name the checkpoint was saved under.
    pub name: String,
    /// Increases by one with every checkpoint saved under `name`.
    pub step: u64,
    /// Milliseconds since epoch at save time.
    pub timestamp: u64,
    /// SHA-256 checksum of `tape`.
    pub checksum: String,
    /// The recorded position, as written by [`Tape::to_bytes`].
    pub tape: Vec<u8>,
}

/// Manages checkpoint creation, persistence, and recovery.
#[cfg(feature = "checkpointing")]
pub struct CheckpointManager {
    pub(crate) config: CheckpointConfig,
}

#[cfg(feature = "checkpointing")]
impl CheckpointManager {
    /// # Errors
    ///
    /// Returns an error if the checkpoint directory cannot be created.
    pub fn new(config: CheckpointConfig) -> Result<Self> {
        create_dir_all(&config.directory).context("Failed to create checkpoint directory")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Save `tape` as the next checkpoint of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint file cannot be created or written to.
    pub fn save(&mut self, name: &str, tape: &Tape) -> Result<PathBuf> {
        let step = self
            .list_checkpoints(name)?
            .last()
            .map_or(0, |(step, _)| step + 1);

        let tape = tape.to_bytes().context("Failed to serialize tape")?;
        let state = CheckpointState {
            name: name.to_owned(),
            step,
            timestamp: current_timestamp_ms(),
            checksum: compute_checksum(&tape),
            tape,
        };

        let path = self.config.directory.join(checkpoint_file_name(name, step));

        let encoded = postcard::to_allocvec(&state).context("Failed to serialize checkpoint")?;

        let mut file = File::create(&path).context("Failed to create checkpoint file")?;
        file.write_all(&encoded)
            .context("Failed to write checkpoint")?;
        file.sync_all()
            .context("Failed to sync checkpoint to disk")?;

        log::info!("saved checkpoint {} of '{name}' to {}", step, path.display());

        self.cleanup_old_checkpoints(name)?;

        Ok(path)
    }

    /// Record the position of `pipeline` and save it as the next checkpoint
    /// of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the position cannot be recorded or saved.
    pub fn save_pipeline(&mut self, name: &str, pipeline: &DataPipeline) -> Result<PathBuf> {
        let mut tape = Tape::new();
        pipeline
            .record_position(&mut tape)
            .context("Failed to record pipeline position")?;
        self.save(name, &tape)
    }

    /// Find the most recent checkpoint of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint directory cannot be read.
    pub fn find_latest(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .list_checkpoints(name)?
            .pop()
            .map(|(_, entry)| entry.path()))
    }

    /// Load and verify a checkpoint from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint file cannot be read or if the
    /// checksum verification fails.
    pub fn load(&self, path: &Path) -> Result<Tape> {
        let mut file = File::open(path).context("Failed to open checkpoint file")?;
        let mut encoded = Vec::new();
        file.read_to_end(&mut encoded)
            .context("Failed to read checkpoint")?;

        let state: CheckpointState =
            postcard::from_bytes(&encoded).context("Failed to deserialize checkpoint")?;

        if compute_checksum(&state.tape) != state.checksum {
            return Err(anyhow!(
                "Checkpoint integrity check failed: checksum mismatch"
            ));
        }

        Tape::from_bytes(&state.tape).context("Failed to deserialize tape")
    }

    /// Reload the latest checkpoint of `name` into `pipeline`.
    ///
    /// Returns `false`, leaving the pipeline untouched, if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be loaded or does not match
    /// the pipeline.
    pub fn restore_pipeline(&self, name: &str, pipeline: &mut DataPipeline) -> Result<bool> {
        let Some(path) = self.find_latest(name)? else {
            return Ok(false);
        };

        let mut tape = self.load(&path)?;
        pipeline
            .reload_position(&mut tape)
            .with_context(|| format!("Failed to reload position from {}", path.display()))?;

        log::info!("restored '{name}' from {}", path.display());

        Ok(true)
    }

    /// Delete all checkpoints of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint directory cannot be read.
    pub fn clear(&self, name: &str) -> Result<()> {
        for (_, entry) in self.list_checkpoints(name)? {
            remove_file(entry.path()).ok();
        }

        Ok(())
    }

    /// Checkpoints of `name`, sorted by step.
    fn list_checkpoints(&self, name: &str) -> Result<Vec<(u64, DirEntry)>> {
        let prefix = format!("checkpoint_{name}_");
        let mut checkpoints: Vec<_> = read_dir(&self.config.directory)
            .context("Failed to read checkpoint directory")?
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let step = entry
                    .file_name()
                    .to_str()?
                    .strip_prefix(&prefix)?
                    .strip_suffix(".bin")?
                    .parse::<u64>()
                    .ok()?;
                Some((step, entry))
            })
            .collect();

        checkpoints.sort_by_key(|(step, _)| *step);

        Ok(checkpoints)
    }

    /// Delete old checkpoints beyond the retention limit.
    fn cleanup_old_checkpoints(&self, name: &str) -> Result<()> {
        let Some(max_checkpoints) = self.config.max_checkpoints else {
            return Ok(());
        };

        let checkpoints = self.list_checkpoints(name)?;
        if checkpoints.len() <= max_checkpoints {
            return Ok(());
        }

        let to_delete = checkpoints.len() - max_checkpoints;
        for (_, entry) in checkpoints.iter().take(to_delete) {
            remove_file(entry.path()).ok(); // Ignore errors
        }

        log::debug!("pruned {to_delete} old checkpoints of '{name}'");

        Ok(())
    }
}

#[cfg(feature = "checkpointing")]
fn checkpoint_file_name(name: &str, step: u64) -> String {
    format!("checkpoint_{name}_{step:010}.bin")
}

/// Compute SHA-256 checksum of data.
#[cfg(feature = "checkpointing")]
#[must_use]
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Get current timestamp in milliseconds since epoch.
#[cfg(feature = "checkpointing")]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
