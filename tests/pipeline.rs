//! Tests for pipeline construction, the in-memory and file producers, and
//! position recording across composed stages.

use anyhow::Result;
use ironpipe::testing::*;
use ironpipe::*;
use std::fs;
use std::num::NonZeroUsize;
use tempfile::TempDir;

fn ints(n: i64) -> Vec<Data> {
    (0..n).map(Data::Int).collect()
}

fn strings(items: &[&str]) -> Vec<Data> {
    items.iter().copied().map(Data::from).collect()
}

#[test]
fn read_sequence_skip_and_reset() -> Result<()> {
    let mut p = read_sequence(ints(5)).build()?;

    assert_eq!(p.next()?, Some(Data::Int(0)));
    assert_eq!(p.skip(2)?, 2);
    assert_eq!(p.next()?, Some(Data::Int(3)));

    // Only one record is left to skip.
    assert_eq!(p.skip(10)?, 1);
    assert!(p.next()?.is_none());

    p.reset();
    assert_collections_equal(&drain(&mut p)?, &ints(5));
    Ok(())
}

#[test]
fn iter_yields_remaining_records() -> Result<()> {
    let mut p = read_sequence(ints(4)).build()?;
    p.next()?;

    let rest: Vec<Data> = p.iter().collect::<ironpipe::Result<_>>()?;
    assert_collections_equal(&rest, &ints(4)[1..]);
    Ok(())
}

#[test]
fn zip_data_pipelines_steps_in_lockstep() -> Result<()> {
    let left = read_sequence(ints(3)).build()?;
    let right = read_sequence(strings(&["a", "b", "c", "d"])).build()?;

    let mut p = zip_data_pipelines(vec![left, right]).build()?;

    let out = drain(&mut p)?;
    let expected = vec![
        Data::List(vec![Data::Int(0), Data::from("a")]),
        Data::List(vec![Data::Int(1), Data::from("b")]),
        Data::List(vec![Data::Int(2), Data::from("c")]),
    ];
    assert_collections_equal(&out, &expected);

    p.reset();
    assert_eq!(p.next()?, Some(expected[0].clone()));
    Ok(())
}

#[test]
fn zip_of_no_pipelines_is_empty() -> Result<()> {
    let mut p = zip_data_pipelines(Vec::new()).build()?;
    assert!(p.next()?.is_none());
    Ok(())
}

#[test]
fn read_text_yields_lines() -> Result<()> {
    let file = text_fixture(b"first\r\nsecond\n\nlast without newline")?;

    for memory_map in [true, false] {
        for block_size in [None, Some(1), Some(4), Some(7)] {
            let options = FileOptions {
                memory_map,
                block_size: block_size.and_then(NonZeroUsize::new),
                ..Default::default()
            };
            let mut p = read_text(file.path(), options).build()?;

            assert_collections_equal(
                &drain(&mut p)?,
                &strings(&["first", "second", "", "last without newline"]),
            );
        }
    }
    Ok(())
}

#[test]
fn read_text_reset_reopens_the_file() -> Result<()> {
    let file = text_fixture("un\ndeux\ntrois\n".as_bytes())?;
    let mut p = read_text(file.path(), FileOptions::default()).build()?;

    assert_collections_equal(&drain(&mut p)?, &strings(&["un", "deux", "trois"]));
    assert!(p.next()?.is_none());

    p.reset();
    assert_eq!(p.next()?, Some(Data::from("un")));
    Ok(())
}

#[test]
fn read_text_of_missing_file_fails_to_build() {
    let Err(err) = read_text("no/such/corpus.txt", FileOptions::default()).build() else {
        panic!("building over a missing file must fail");
    };

    assert!(matches!(err, DataPipelineError::ReadFailure { .. }));
    assert_eq!(
        err.to_string(),
        "The data pipeline cannot read from 'no/such/corpus.txt'."
    );
}

#[test]
fn read_text_position_round_trip() -> Result<()> {
    let text: String = (0..25).map(|i| format!("line {i}\n")).collect();
    let file = text_fixture(text.as_bytes())?;
    let options = FileOptions {
        block_size: NonZeroUsize::new(16),
        memory_map: false,
        ..Default::default()
    };

    for k in [0, 1, 5, 24, 25, 30] {
        assert_resumes_identically(|| read_text(file.path(), options.clone()).build(), k)?;
    }
    Ok(())
}

#[test]
fn list_files_is_sorted_and_filtered() -> Result<()> {
    let dir = TempDir::new()?;
    fs::create_dir(dir.path().join("nested"))?;
    for name in ["b.txt", "a.txt", "nested/c.txt", "skip.bin"] {
        fs::write(dir.path().join(name), name)?;
    }

    let mut all = list_files(dir.path(), None).build()?;
    assert_eq!(drain(&mut all)?.len(), 4);

    let mut txt = list_files(dir.path(), Some("*.txt")).build()?;
    let listed: Vec<String> = drain(&mut txt)?
        .into_iter()
        .filter_map(Data::into_string)
        .collect();

    let expected: Vec<String> = ["a.txt", "b.txt", "nested/c.txt"]
        .iter()
        .map(|name| dir.path().join(name).to_string_lossy().into_owned())
        .collect();
    assert_eq!(listed, expected);
    Ok(())
}

#[test]
fn list_files_of_a_single_file() -> Result<()> {
    let file = text_fixture(b"x")?;
    let mut p = list_files(file.path(), None).build()?;

    assert_eq!(
        p.next()?,
        Some(Data::String(file.path().to_string_lossy().into_owned()))
    );
    assert!(p.next()?.is_none());
    Ok(())
}

#[test]
fn list_files_of_missing_directory_fails() {
    let Err(err) = list_files("no/such/dir", None).build() else {
        panic!("listing a missing directory must fail");
    };
    assert!(matches!(err, DataPipelineError::ReadFailure { .. }));
}

#[test]
fn composed_pipeline_position_round_trip() -> Result<()> {
    let file = text_fixture(b"alpha\nbeta\ngamma\ndelta\nepsilon\nzeta\neta\ntheta\n")?;

    let make = || {
        let lines = read_text(file.path(), FileOptions::default())
            .map(
                |d: Data| Ok(Data::Int(d.as_str().map_or(0, str::len) as i64)),
                MapOptions {
                    num_parallel_calls: 3,
                    ..Default::default()
                },
            )
            .build()?;

        let numbers = read_sequence(ints(20))
            .filter_map(
                |d: Data| Ok(d.as_int().filter(|i| i % 2 == 1).map(Data::Int)),
                MapOptions {
                    num_parallel_calls: 4,
                    warn_only: true,
                    ..Default::default()
                },
            )
            .build()?;

        zip_data_pipelines(vec![lines, numbers]).build()
    };

    for k in 0..=12 {
        assert_resumes_identically(make, k)?;
    }
    Ok(())
}

#[test]
fn reload_into_a_different_pipeline_fails_and_breaks_it() -> Result<()> {
    let mut mapped = read_sequence(ints(4))
        .map(|d: Data| Ok(d), MapOptions::default())
        .build()?;
    mapped.next()?;

    let mut tape = Tape::new();
    mapped.record_position(&mut tape)?;

    // A zip of two sequences expects two positions on the tape.
    let mut zipped = zip_data_pipelines(vec![
        read_sequence(ints(4)).build()?,
        read_sequence(ints(4)).build()?,
    ])
    .build()?;

    assert!(zipped.reload_position(&mut tape).is_err());
    assert!(zipped.is_broken());
    assert!(matches!(zipped.next(), Err(DataPipelineError::Broken)));

    zipped.reset();
    assert!(zipped.next()?.is_some());
    Ok(())
}

#[test]
fn tape_survives_serialization() -> Result<()> {
    let mut p = read_sequence(ints(10)).build()?;
    p.skip(3)?;

    let mut tape = Tape::new();
    p.record_position(&mut tape)?;

    let mut restored = Tape::from_bytes(&tape.to_bytes()?)?;
    assert_eq!(restored.len(), tape.len());

    let mut resumed = read_sequence(ints(10)).build()?;
    resumed.reload_position(&mut restored)?;
    assert_eq!(resumed.next()?, Some(Data::Int(3)));
    Ok(())
}
