//! Tests for the checkpoint module.

#[cfg(feature = "checkpointing")]
mod checkpoint_tests {
    use anyhow::Result;
    use ironpipe::checkpoint::{
        CheckpointConfig, CheckpointManager, CheckpointState, compute_checksum,
    };
    use ironpipe::testing::*;
    use ironpipe::*;
    use std::fs;
    use tempfile::TempDir;

    fn manager(dir: &TempDir, max_checkpoints: Option<usize>) -> Result<CheckpointManager> {
        CheckpointManager::new(CheckpointConfig {
            directory: dir.path().to_path_buf(),
            max_checkpoints,
        })
    }

    fn numbers() -> ironpipe::Result<DataPipeline> {
        read_sequence((0..10).map(Data::Int).collect())
            .map(|d: Data| Ok(d), MapOptions { num_parallel_calls: 4, ..Default::default() })
            .build()
    }

    #[test]
    fn test_checkpoint_config_default() {
        let config = CheckpointConfig::default();
        assert_eq!(config.max_checkpoints, Some(10));
    }

    #[test]
    fn test_manager_creates_directory() -> Result<()> {
        let tmp = TempDir::new()?;
        let nested = tmp.path().join("a/b");

        CheckpointManager::new(CheckpointConfig {
            directory: nested.clone(),
            ..Default::default()
        })?;
        assert!(nested.is_dir());
        Ok(())
    }

    #[test]
    fn test_no_checkpoint_initially() -> Result<()> {
        let tmp = TempDir::new()?;
        let manager = manager(&tmp, None)?;

        assert!(manager.find_latest("train")?.is_none());

        let mut p = numbers()?;
        assert!(!manager.restore_pipeline("train", &mut p)?);
        assert_eq!(p.next()?, Some(Data::Int(0)));
        Ok(())
    }

    #[test]
    fn test_save_and_restore_pipeline() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, None)?;

        let mut p = numbers()?;
        for _ in 0..6 {
            p.next()?;
        }
        let path = manager.save_pipeline("train", &p)?;
        assert_eq!(manager.find_latest("train")?, Some(path));

        let mut resumed = numbers()?;
        assert!(manager.restore_pipeline("train", &mut resumed)?);

        assert_collections_equal(&drain(&mut resumed)?, &drain(&mut p)?);
        Ok(())
    }

    #[test]
    fn test_latest_checkpoint_wins() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, None)?;

        let mut p = numbers()?;
        p.next()?;
        manager.save_pipeline("train", &p)?;
        p.skip(4)?;
        manager.save_pipeline("train", &p)?;

        let mut resumed = numbers()?;
        manager.restore_pipeline("train", &mut resumed)?;
        assert_eq!(resumed.next()?, Some(Data::Int(5)));
        Ok(())
    }

    #[test]
    fn test_names_are_independent() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, None)?;

        let mut tape = Tape::new();
        tape.record(&1_usize)?;
        manager.save("train", &tape)?;

        assert!(manager.find_latest("train")?.is_some());
        assert!(manager.find_latest("valid")?.is_none());
        Ok(())
    }

    #[test]
    fn test_retention_keeps_newest() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, Some(2))?;

        let mut saved = Vec::new();
        for step in 0..5_usize {
            let mut tape = Tape::new();
            tape.record(&step)?;
            saved.push(manager.save("train", &tape)?);
        }

        let remaining = fs::read_dir(tmp.path())?.count();
        assert_eq!(remaining, 2);
        assert!(!saved[2].exists());
        assert!(saved[3].exists() && saved[4].exists());

        let mut tape = manager.load(&saved[4])?;
        assert_eq!(tape.read::<usize>()?, 4);
        Ok(())
    }

    #[test]
    fn test_tampered_checkpoint_fails_verification() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, None)?;

        let mut tape = Tape::new();
        tape.record("position")?;
        let path = manager.save("train", &tape)?;

        let mut state: CheckpointState = postcard::from_bytes(&fs::read(&path)?)?;
        state.tape.push(0);
        fs::write(&path, postcard::to_allocvec(&state)?)?;

        let err = manager.load(&path).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
        Ok(())
    }

    #[test]
    fn test_restore_into_mismatched_pipeline_fails() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, None)?;

        let mut tape = Tape::new();
        tape.record("not a position")?;
        manager.save("train", &tape)?;

        let mut p = numbers()?;
        assert!(manager.restore_pipeline("train", &mut p).is_err());
        assert!(p.is_broken());
        Ok(())
    }

    #[test]
    fn test_clear_removes_checkpoints() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = manager(&tmp, None)?;

        let tape = Tape::new();
        manager.save("train", &tape)?;
        manager.save("train", &tape)?;
        manager.save("valid", &tape)?;

        manager.clear("train")?;
        assert!(manager.find_latest("train")?.is_none());
        assert!(manager.find_latest("valid")?.is_some());
        Ok(())
    }

    #[test]
    fn test_compute_checksum() {
        let a = compute_checksum(b"tape");
        assert_eq!(a.len(), 64);
        assert_eq!(a, compute_checksum(b"tape"));
        assert_ne!(a, compute_checksum(b"tapf"));
    }
}
