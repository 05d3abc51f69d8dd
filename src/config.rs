//! Sink configuration.
//!
//! [`SinkConfig`] is a plain struct with public fields and defaults matching a
//! freshly created text output step. It can be built in code or loaded from
//! JSON, where any missing key keeps its default.
//!
//! Three settings can also come from the process environment. They are read
//! once by [`SinkConfig::resolve_env`] when a controller is created, never per
//! record:
//!
//! | Variable | Field |
//! |---|---|
//! | `IRONSINK_FILE_OUTPUT_MAX_STREAM_COUNT` | [`SinkConfig::max_open_files`] |
//! | `IRONSINK_FILE_OUTPUT_MAX_STREAM_LIFE` | [`SinkConfig::flush_interval_ms`] |
//! | `IRONSINK_COMPATIBILITY_TEXT_FILE_OUTPUT_APPEND_NO_HEADER` | [`SinkConfig::compat_append_no_header`] |

use crate::charset::Charset;
use crate::error::SinkError;
use crate::io::compression::provider_by_name;
use crate::schema::FieldSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_MAX_STREAM_COUNT: &str = "IRONSINK_FILE_OUTPUT_MAX_STREAM_COUNT";
pub const ENV_MAX_STREAM_LIFE: &str = "IRONSINK_FILE_OUTPUT_MAX_STREAM_LIFE";
pub const ENV_APPEND_NO_HEADER: &str = "IRONSINK_COMPATIBILITY_TEXT_FILE_OUTPUT_APPEND_NO_HEADER";

/// Row terminator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NewlineStyle {
    #[default]
    Dos,
    Unix,
    Cr,
    None,
}

impl NewlineStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dos => "\r\n",
            Self::Unix => "\n",
            Self::Cr => "\r",
            Self::None => "",
        }
    }
}

/// Everything that shapes one run of the text sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Static output filename, without extension or generated suffixes.
    pub filename: Option<String>,
    /// Name of the incoming field holding each record's filename.
    pub filename_field: Option<String>,
    pub extension: String,
    /// Use the filename exactly as configured, skipping every generated part.
    pub filename_verbatim: bool,
    pub add_date: bool,
    pub add_time: bool,
    /// chrono pattern appended to the filename in place of date and time.
    pub date_time_format: Option<String>,
    pub add_copy_nr: bool,
    pub add_partition_nr: bool,

    pub append: bool,
    pub create_parent_folder: bool,
    pub add_to_result_files: bool,
    /// Write to a caller-supplied writer instead of files.
    pub alternate_sink_passthrough: bool,
    pub do_not_open_at_init: bool,
    /// Compression provider name, see [`crate::io::compression`].
    pub compression: String,
    /// Start a new file every this many output lines (0 = never).
    pub split_every: u64,

    /// Output charset name; blank means UTF-8.
    pub encoding: Option<String>,
    pub separator: String,
    pub enclosure: String,
    pub enclosure_forced: bool,
    /// When set (the default), values are not enclosed just because they
    /// contain the separator or the enclosure.
    pub legacy_enclosure_detection_disabled: bool,
    /// Fixed-width output.
    pub pad_fields: bool,
    pub fast_dump: bool,
    pub header: bool,
    pub footer: bool,
    pub newline: NewlineStyle,
    /// Raw line written after the last record.
    pub ended_line: Option<String>,
    /// Output projection; empty writes every incoming field.
    pub fields: Vec<FieldSpec>,

    /// Cap on simultaneously open files (0 = unlimited).
    pub max_open_files: Option<usize>,
    /// Flush dirty files when this many milliseconds passed (0 = never).
    pub flush_interval_ms: Option<u64>,
    /// Legacy: when appending, skip the header without checking whether the
    /// destination exists.
    pub compat_append_no_header: Option<bool>,
    /// Log progress every this many lines (0 = never).
    pub feedback_size: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            filename: None,
            filename_field: None,
            extension: "txt".to_string(),
            filename_verbatim: false,
            add_date: false,
            add_time: false,
            date_time_format: None,
            add_copy_nr: false,
            add_partition_nr: false,
            append: false,
            create_parent_folder: true,
            add_to_result_files: true,
            alternate_sink_passthrough: false,
            do_not_open_at_init: false,
            compression: "None".to_string(),
            split_every: 0,
            encoding: None,
            separator: ";".to_string(),
            enclosure: "\"".to_string(),
            enclosure_forced: false,
            legacy_enclosure_detection_disabled: true,
            pad_fields: false,
            fast_dump: false,
            header: true,
            footer: false,
            newline: NewlineStyle::Dos,
            ended_line: None,
            fields: Vec::new(),
            max_open_files: None,
            flush_interval_ms: None,
            compat_append_no_header: None,
            feedback_size: 50_000,
        }
    }
}

impl SinkConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse sink configuration")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("load {}", path.display()))
    }

    /// Whether every record names its own output file.
    #[must_use]
    pub fn filename_per_record(&self) -> bool {
        self.filename_field.is_some()
    }

    /// Footer rows shift the split cadence by one line.
    #[must_use]
    pub fn footer_shift(&self) -> u64 {
        u64::from(self.footer)
    }

    #[must_use]
    pub fn detect_enclosure(&self) -> bool {
        !self.legacy_enclosure_detection_disabled
    }

    /// Check the settings that can be judged without any input.
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.filename.is_some() && self.filename_field.is_some() {
            return Err(SinkError::ConflictingDestination);
        }
        if !self.alternate_sink_passthrough
            && self.filename_field.is_none()
            && self.filename.as_deref().is_none_or(|f| f.trim().is_empty())
        {
            return Err(SinkError::FilenameNotSet);
        }
        Charset::resolve(self.encoding.as_deref())?;
        provider_by_name(&self.compression)?;
        Ok(())
    }

    /// Fill unset resource limits and the legacy flag from the environment.
    ///
    /// Unparseable numbers count as 0.
    pub fn resolve_env(&mut self) {
        if self.max_open_files.is_none() {
            self.max_open_files = Some(env_number(ENV_MAX_STREAM_COUNT));
        }
        if self.flush_interval_ms.is_none() {
            self.flush_interval_ms = Some(env_number(ENV_MAX_STREAM_LIFE));
        }
        if self.compat_append_no_header.is_none() {
            self.compat_append_no_header = Some(
                std::env::var(ENV_APPEND_NO_HEADER).is_ok_and(|v| v.trim().eq_ignore_ascii_case("Y")),
            );
        }
    }
}

fn env_number<T: std::str::FromStr + Default>(name: &str) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}
