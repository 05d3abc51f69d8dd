use anyhow::Result;
use ironsink::io::RawStream;
use ironsink::testing::{SharedBuffer, TempDirPath, people_meta, people_rows};
use ironsink::{
    Collaborators, FieldSpec, FileSystem, NewlineStyle, OutputController, ResultFiles, Row,
    RowMeta, SinkConfig, SinkError, Value, ValueType,
};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn id_name_meta() -> RowMeta {
    RowMeta::default()
        .with("ID", ValueType::Integer)
        .with("NAME", ValueType::String)
}

fn row(id: i64, name: &str) -> Row {
    vec![Value::Integer(id), Value::from(name)]
}

fn targeted(id: i64, target: &str) -> Row {
    let mut r = row(id, "x");
    r.push(Value::from(target));
    r
}

/// Files that accept writes but fail every flush.
struct UnflushableFs;

struct UnflushableFile;

impl Write for UnflushableFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("device gone"))
    }
}

impl Seek for UnflushableFile {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Ok(0)
    }
}

impl FileSystem for UnflushableFs {
    fn exists(&self, _path: &str) -> Result<bool> {
        Ok(false)
    }

    fn open(&self, _path: &str, _append: bool) -> Result<RawStream> {
        Ok(Box::new(UnflushableFile))
    }

    fn folder_exists(&self, _folder: &Path) -> Result<bool> {
        Ok(true)
    }

    fn create_folder(&self, _folder: &Path) -> Result<()> {
        Ok(())
    }
}

fn static_config(dir: &TempDirPath, base: &str) -> SinkConfig {
    SinkConfig {
        filename: Some(dir.file(base)),
        max_open_files: Some(0),
        flush_interval_ms: Some(0),
        compat_append_no_header: Some(false),
        ..SinkConfig::default()
    }
}

#[test]
fn fixed_width_row_with_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        fields: vec![FieldSpec::new("ID"), FieldSpec::new("NAME").length(10)],
        ..static_config(&dir, "people")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.run(vec![row(1, "Alice")])?;
    assert_eq!(dir.read("people.txt")?, b"ID;NAME\r\n1;Alice     \r\n");
    Ok(())
}

#[test]
fn split_every_two_rows_without_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        header: false,
        split_every: 2,
        newline: NewlineStyle::Unix,
        ..static_config(&dir, "part")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    let rows = (1..=5).map(|i| row(i, "x")).collect::<Vec<_>>();
    let summary = sink.run(rows)?;

    assert_eq!(dir.file_names()?, ["part_0.txt", "part_1.txt", "part_2.txt"]);
    assert_eq!(dir.read_to_string("part_0.txt")?, "1;x\n2;x\n");
    assert_eq!(dir.read_to_string("part_1.txt")?, "3;x\n4;x\n");
    assert_eq!(dir.read_to_string("part_2.txt")?, "5;x\n");
    assert_eq!(summary.metrics.splits, 2);
    assert_eq!(summary.files.len(), 3);
    Ok(())
}

#[test]
fn every_split_file_gets_one_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        split_every: 3,
        newline: NewlineStyle::Unix,
        ..static_config(&dir, "h")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    let rows = (1..=4).map(|i| row(i, "x")).collect::<Vec<_>>();
    sink.run(rows)?;

    for name in dir.file_names()? {
        let lines = dir.read_lines(&name)?;
        assert_eq!(lines.iter().filter(|l| *l == "ID;NAME").count(), 1, "{name}");
        assert_eq!(lines[0], "ID;NAME");
    }
    Ok(())
}

#[test]
fn footer_closes_each_split_file() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        header: false,
        footer: true,
        split_every: 3,
        newline: NewlineStyle::Unix,
        ..static_config(&dir, "f")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    let rows = (1..=3).map(|i| row(i, "x")).collect::<Vec<_>>();
    sink.run(rows)?;

    assert_eq!(dir.read_to_string("f_0.txt")?, "1;x\n2;x\nID;NAME\n");
    assert_eq!(dir.read_to_string("f_1.txt")?, "3;x\nID;NAME\n");
    Ok(())
}

#[test]
fn capped_handles_reopen_without_second_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    let meta = id_name_meta().with("TARGET", ValueType::String);
    let config = SinkConfig {
        filename: None,
        filename_field: Some("TARGET".into()),
        fields: vec![FieldSpec::new("ID"), FieldSpec::new("NAME")],
        newline: NewlineStyle::Unix,
        max_open_files: Some(1),
        ..static_config(&dir, "unused")
    };
    let mut sink = OutputController::new(config, meta, Collaborators::default())?;

    let targets = [dir.file("A"), dir.file("B"), dir.file("A"), dir.file("B")];
    for (i, target) in targets.iter().enumerate() {
        let mut r = row(i as i64 + 1, "x");
        r.push(Value::from(target.as_str()));
        sink.consume(Some(&r))?;
        assert!(sink.open_file_count() <= 1);
    }
    let summary = sink.finish()?;

    assert_eq!(dir.read_to_string("A.txt")?, "ID;NAME\n1;x\n3;x\n");
    assert_eq!(dir.read_to_string("B.txt")?, "ID;NAME\n2;x\n4;x\n");
    assert_eq!(summary.metrics.files_opened, 2);
    assert_eq!(summary.metrics.files_reopened, 2);
    assert_eq!(summary.metrics.files_evicted, 3);
    Ok(())
}

#[test]
fn appending_to_an_existing_file_skips_the_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    std::fs::write(dir.path().join("log.txt"), "ID;NAME\r\n0;old\r\n")?;
    let config = SinkConfig {
        append: true,
        ..static_config(&dir, "log")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.run(vec![row(1, "new")])?;
    assert_eq!(dir.read_to_string("log.txt")?, "ID;NAME\r\n0;old\r\n1;new\r\n");
    Ok(())
}

#[test]
fn appending_to_a_missing_file_writes_the_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        append: true,
        ..static_config(&dir, "fresh")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.run(vec![row(1, "new")])?;
    assert_eq!(dir.read_to_string("fresh.txt")?, "ID;NAME\r\n1;new\r\n");
    Ok(())
}

#[test]
fn legacy_append_flag_never_writes_the_header() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        append: true,
        compat_append_no_header: Some(true),
        ..static_config(&dir, "legacy")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.run(vec![row(1, "new")])?;
    assert_eq!(dir.read_to_string("legacy.txt")?, "1;new\r\n");
    Ok(())
}

#[cfg(feature = "compression-zip")]
#[test]
fn appending_to_an_existing_zip_is_refused() -> Result<()> {
    let dir = TempDirPath::new()?;
    std::fs::write(dir.path().join("arch.zip"), b"PK")?;
    let config = SinkConfig {
        append: true,
        compression: "Zip".into(),
        ..static_config(&dir, "arch")
    };
    let err = OutputController::new(config, id_name_meta(), Collaborators::default())
        .err()
        .expect("append to zip must fail");
    assert!(matches!(
        err.downcast_ref::<SinkError>(),
        Some(SinkError::AppendToArchive { .. })
    ));
    Ok(())
}

#[test]
fn ended_line_and_footer_close_the_file() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        footer: true,
        ended_line: Some("-- end --".into()),
        newline: NewlineStyle::Unix,
        ..static_config(&dir, "end")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    let summary = sink.run(vec![row(1, "a")])?;
    assert_eq!(dir.read_to_string("end.txt")?, "ID;NAME\n1;a\nID;NAME\n-- end --");
    assert_eq!(summary.metrics.lines_output, 4);
    Ok(())
}

#[test]
fn ended_line_opens_the_file_when_no_rows_arrive() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        footer: true,
        do_not_open_at_init: true,
        ended_line: Some("EOF".into()),
        ..static_config(&dir, "empty")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    assert!(dir.file_names()?.is_empty());
    sink.run(Vec::<Row>::new())?;
    assert_eq!(dir.read_to_string("empty.txt")?, "EOF");
    Ok(())
}

#[test]
fn deferred_open_without_rows_creates_nothing() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        do_not_open_at_init: true,
        ..static_config(&dir, "never")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.run(Vec::<Row>::new())?;
    assert!(dir.file_names()?.is_empty());
    Ok(())
}

#[test]
fn parent_folders_are_created_and_results_tracked() -> Result<()> {
    let dir = TempDirPath::new()?;
    let tracker = Arc::new(ResultFiles::new());
    let config = static_config(&dir, "nested/deeper/out");
    let collaborators = Collaborators::default().with_result_files(tracker.clone());
    let mut sink = OutputController::new(config, id_name_meta(), collaborators)?;
    sink.run(vec![row(1, "a")])?;

    assert!(dir.path().join("nested/deeper/out.txt").is_file());
    let files = tracker.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, dir.file("nested/deeper/out.txt"));
    assert_eq!(
        files[0].comment,
        "This file was created with a text file output step"
    );
    Ok(())
}

#[test]
fn projection_and_null_strings() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        fields: vec![
            FieldSpec::new("name").null_string("?"),
            FieldSpec::new("id"),
        ],
        newline: NewlineStyle::Unix,
        legacy_enclosure_detection_disabled: false,
        ..static_config(&dir, "proj")
    };
    let mut sink = OutputController::new(config, people_meta(), Collaborators::default())?;
    sink.run(people_rows())?;
    assert_eq!(
        dir.read_lines("proj.txt")?,
        [
            "name;id",
            "Alice;1",
            "\"Bob; Jr.\";2",
            "\"He said \"\"hi\"\"\";3",
            "?;4",
        ]
    );
    Ok(())
}

#[test]
fn passthrough_writes_rows_without_header() -> Result<()> {
    let buffer = SharedBuffer::new();
    let config = SinkConfig {
        alternate_sink_passthrough: true,
        newline: NewlineStyle::Unix,
        ended_line: Some("done".into()),
        ..SinkConfig::default()
    };
    let collaborators = Collaborators::default().with_passthrough(buffer.clone());
    let mut sink = OutputController::new(config, id_name_meta(), collaborators)?;
    sink.run(vec![row(1, "a"), row(2, "b")])?;
    assert_eq!(buffer.to_string_lossy(), "1;a\n2;b\ndone");
    Ok(())
}

#[test]
fn stop_closes_files_and_ends_the_run() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        newline: NewlineStyle::Unix,
        footer: true,
        ..static_config(&dir, "stopped")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    let stop = sink.stop_handle();
    assert!(sink.consume(Some(&row(1, "a")))?);
    stop.stop();
    assert!(!sink.consume(Some(&row(2, "b")))?);
    let summary = sink.finish()?;

    assert!(summary.stopped);
    assert_eq!(sink.open_file_count(), 0);
    // no footer after a stop
    assert_eq!(dir.read_to_string("stopped.txt")?, "ID;NAME\n1;a\n");
    Ok(())
}

#[test]
fn dropping_an_unfinished_controller_flushes_its_files() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        newline: NewlineStyle::Unix,
        ..static_config(&dir, "dropped")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.consume(Some(&row(7, "z")))?;
    drop(sink);
    assert_eq!(dir.read_to_string("dropped.txt")?, "ID;NAME\n7;z\n");
    Ok(())
}

#[test]
fn null_filename_value_is_rejected() -> Result<()> {
    let dir = TempDirPath::new()?;
    let meta = id_name_meta().with("TARGET", ValueType::String);
    let config = SinkConfig {
        filename: None,
        filename_field: Some("TARGET".into()),
        ..static_config(&dir, "unused")
    };
    let mut sink = OutputController::new(config, meta, Collaborators::default())?;
    let mut r = row(1, "a");
    r.push(Value::Null);
    let err = sink.consume(Some(&r)).err().expect("null filename must fail");
    assert_eq!(err.downcast_ref::<SinkError>(), Some(&SinkError::FilenameNotSet));
    Ok(())
}

#[test]
fn periodic_flush_pushes_rows_to_disk_before_the_end() -> Result<()> {
    let dir = TempDirPath::new()?;
    let config = SinkConfig {
        header: false,
        newline: NewlineStyle::Unix,
        flush_interval_ms: Some(1),
        ..static_config(&dir, "flushed")
    };
    let mut sink = OutputController::new(config, id_name_meta(), Collaborators::default())?;
    sink.consume(Some(&row(1, "a")))?;
    thread::sleep(Duration::from_millis(20));
    sink.consume(Some(&row(2, "b")))?;

    assert_eq!(dir.read_to_string("flushed.txt")?, "1;a\n2;b\n");
    assert_eq!(sink.metrics().periodic_flushes, 1);
    sink.finish()?;
    Ok(())
}

#[cfg(feature = "compression-zip")]
#[test]
fn evicted_archives_are_not_reopened_for_append() -> Result<()> {
    let dir = TempDirPath::new()?;
    let meta = id_name_meta().with("TARGET", ValueType::String);
    let config = SinkConfig {
        filename: None,
        filename_field: Some("TARGET".into()),
        fields: vec![FieldSpec::new("ID"), FieldSpec::new("NAME")],
        compression: "Zip".into(),
        append: true,
        max_open_files: Some(1),
        ..static_config(&dir, "unused")
    };
    let mut sink = OutputController::new(config, meta, Collaborators::default())?;
    sink.consume(Some(&targeted(1, &dir.file("A"))))?;
    sink.consume(Some(&targeted(2, &dir.file("B"))))?;
    assert_eq!(sink.metrics().files_evicted, 1);
    assert_eq!(sink.open_file_count(), 1);

    // A was forgotten on eviction, so it now looks like an existing archive
    let err = sink
        .consume(Some(&targeted(3, &dir.file("A"))))
        .err()
        .expect("reopening an evicted zip must fail");
    assert!(matches!(
        err.downcast_ref::<SinkError>(),
        Some(SinkError::AppendToArchive { .. })
    ));
    Ok(())
}

#[test]
fn every_failed_close_is_counted_on_stop() -> Result<()> {
    let meta = id_name_meta().with("TARGET", ValueType::String);
    let config = SinkConfig {
        filename_field: Some("TARGET".into()),
        max_open_files: Some(0),
        flush_interval_ms: Some(0),
        compat_append_no_header: Some(false),
        ..SinkConfig::default()
    };
    let collaborators = Collaborators {
        fs: Arc::new(UnflushableFs),
        ..Collaborators::default()
    };
    let mut sink = OutputController::new(config, meta, collaborators)?;
    sink.consume(Some(&targeted(1, "a")))?;
    sink.consume(Some(&targeted(2, "b")))?;
    assert_eq!(sink.open_file_count(), 2);

    sink.stop_handle().stop();
    assert!(!sink.consume(None)?);
    let summary = sink.finish()?;

    assert!(summary.stopped);
    assert_eq!(summary.metrics.errors, 2);
    assert_eq!(sink.open_file_count(), 0);
    Ok(())
}
