//! The per-record driver of the text sink.
//!
//! An [`OutputController`] receives records one at a time, works out which
//! file each belongs to, opens or reopens that file through its
//! [`FileRegistry`], writes headers, footers and split boundaries, encodes the
//! row and periodically flushes. The end of input is signalled with
//! `consume(None)` (or [`OutputController::finish`]), which writes the footer
//! and the ended line and closes every file.
//!
//! A controller is driven by one thread. Parallel copies each get their own
//! controller and registry, see [`crate::parallel`].
//!
//! # Example
//!
//! ```no_run
//! use ironsink::{Collaborators, OutputController, RowMeta, SinkConfig, Value, ValueType};
//!
//! # fn main() -> anyhow::Result<()> {
//! let meta = RowMeta::default()
//!     .with("id", ValueType::Integer)
//!     .with("name", ValueType::String);
//! let config = SinkConfig {
//!     filename: Some("/tmp/people".into()),
//!     ..SinkConfig::default()
//! };
//! let mut sink = OutputController::new(config, meta, Collaborators::default())?;
//! let summary = sink.run(vec![vec![Value::Integer(1), Value::from("Alice")]])?;
//! println!("{} rows", summary.metrics.rows_written);
//! # Ok(())
//! # }
//! ```

use crate::charset::Charset;
use crate::config::SinkConfig;
use crate::encoder::{EncoderOptions, RowEncoder};
use crate::error::SinkError;
use crate::filename::{FilenameBuilder, FilenameResolver};
use crate::io::compression::{CompressionProvider, provider_by_name};
use crate::io::fs::{FileSystem, LocalFileSystem};
use crate::io::handle::{FileHandle, OutputStreams};
use crate::metrics::SinkMetrics;
use crate::registry::{FileRegistry, RegistryKind, new_registry};
use crate::result_files::{RESULT_FILE_COMMENT, ResultFileTracker};
use crate::schema::{Row, RowMeta, Value, ValueMeta};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

static NULL: Value = Value::Null;

/// Everything a controller talks to besides its configuration.
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    /// Final path construction; built from the configuration when unset.
    pub filenames: Option<Box<dyn FilenameResolver>>,
    /// Receives each file on first open when `add_to_result_files` is set.
    pub result_files: Option<Arc<dyn ResultFileTracker>>,
    /// Destination of `alternate_sink_passthrough` output.
    pub passthrough: Option<Box<dyn Write + Send>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            fs: Arc::new(LocalFileSystem),
            filenames: None,
            result_files: None,
            passthrough: None,
        }
    }
}

impl Collaborators {
    #[must_use]
    pub fn with_filenames(mut self, filenames: impl FilenameResolver + 'static) -> Self {
        self.filenames = Some(Box::new(filenames));
        self
    }

    #[must_use]
    pub fn with_result_files(mut self, tracker: Arc<dyn ResultFileTracker>) -> Self {
        self.result_files = Some(tracker);
        self
    }

    #[must_use]
    pub fn with_passthrough(mut self, writer: impl Write + Send + 'static) -> Self {
        self.passthrough = Some(Box::new(writer));
        self
    }
}

/// Requests a running controller to stop at the next record.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a finished or stopped run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub metrics: SinkMetrics,
    /// Files opened for the first time, in opening order.
    pub files: Vec<String>,
    pub stopped: bool,
}

/// One projected output column.
struct Column {
    index: usize,
    meta: ValueMeta,
    null_bytes: Option<Vec<u8>>,
}

/// The file the controller currently writes to.
struct Bound {
    filename: String,
    stream_id: u64,
}

#[derive(Default)]
struct RunState {
    /// No record consumed yet.
    first: bool,
    row_seen: bool,
    bound: Option<Bound>,
    split_nr: u64,
    last_flush: Option<Instant>,
    /// Header decision taken before the file opened at construction.
    pending_header: Option<(String, bool)>,
    files: Vec<String>,
    stopped: bool,
    finished: bool,
}

#[derive(Clone, Copy)]
enum NameLine {
    Header,
    Footer,
}

/// Per-record state machine writing delimited text files.
pub struct OutputController {
    config: SinkConfig,
    encoder: RowEncoder,
    columns: Vec<Column>,
    /// Header and footer names with the incoming column they describe.
    names: Vec<(String, Option<ValueMeta>)>,
    separator: Vec<u8>,
    newline: Vec<u8>,
    filename_field: Option<usize>,
    row_meta: RowMeta,

    provider: Arc<dyn CompressionProvider>,
    fs: Arc<dyn FileSystem>,
    filenames: Box<dyn FilenameResolver>,
    result_files: Option<Arc<dyn ResultFileTracker>>,
    passthrough: Option<Box<dyn Write + Send>>,
    registry: Option<Box<dyn FileRegistry>>,

    max_open_files: usize,
    flush_interval: Option<Duration>,
    compat_append_no_header: bool,

    state: RunState,
    metrics: SinkMetrics,
    stop: StopHandle,
    line: Vec<u8>,
}

impl OutputController {
    /// Validate `config` against `row_meta` and prepare a run.
    ///
    /// Unless opening is deferred (`do_not_open_at_init`, per-record filenames
    /// or passthrough), the first output file is opened here.
    pub fn new(mut config: SinkConfig, row_meta: RowMeta, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        config.resolve_env();

        let charset = Charset::resolve(config.encoding.as_deref())?;
        let provider = provider_by_name(&config.compression)?;
        let separator = charset.encode(&config.separator);
        let enclosure = charset.encode(&config.enclosure);
        let encoder = RowEncoder::new(EncoderOptions {
            separator: separator.clone(),
            enclosure,
            enclosure_forced: config.enclosure_forced,
            pad_fields: config.pad_fields,
            detect_enclosure: config.detect_enclosure(),
            fast_dump: config.fast_dump,
            charset,
        });

        let (columns, names) = project(&config, &row_meta, charset)?;
        let filename_field = match &config.filename_field {
            Some(field) => Some(row_meta.index_of(field).ok_or_else(|| {
                SinkError::FilenameFieldNotFound {
                    field: field.clone(),
                }
            })?),
            None => None,
        };
        if config.alternate_sink_passthrough && collaborators.passthrough.is_none() {
            return Err(SinkError::PassthroughMissing.into());
        }

        let filenames = match collaborators.filenames {
            Some(f) => f,
            None => Box::new(FilenameBuilder::new(&config, provider.as_ref())),
        };
        let flush_interval = config
            .flush_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let mut controller = Self {
            max_open_files: config.max_open_files.unwrap_or(0),
            compat_append_no_header: config.compat_append_no_header.unwrap_or(false),
            newline: charset.encode(config.newline.as_str()),
            flush_interval,
            encoder,
            columns,
            names,
            separator,
            filename_field,
            row_meta,
            provider,
            fs: collaborators.fs,
            filenames,
            result_files: collaborators.result_files,
            passthrough: collaborators.passthrough,
            registry: None,
            state: RunState {
                first: true,
                ..RunState::default()
            },
            metrics: SinkMetrics::new(),
            stop: StopHandle::default(),
            line: Vec::new(),
            config,
        };
        controller.metrics.record_start();

        if !controller.config.alternate_sink_passthrough
            && !controller.config.do_not_open_at_init
            && !controller.config.filename_per_record()
        {
            let filename = controller.target_filename(None)?;
            let header = controller.header_decision(&filename)?;
            controller
                .acquire(&filename)
                .with_context(|| format!("Couldn't open file {filename}"))?;
            controller.state.pending_header = Some((filename, header));
        }
        Ok(controller)
    }

    /// Handle to request a stop from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    #[must_use]
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn row_meta(&self) -> &RowMeta {
        &self.row_meta
    }

    /// Files currently holding open streams.
    #[must_use]
    pub fn open_file_count(&self) -> usize {
        self.registry.as_ref().map_or(0, |r| r.open_count())
    }

    /// Files opened so far, in opening order.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.state.files
    }

    /// Feed one record, or `None` at the end of input.
    ///
    /// Returns `Ok(true)` while more input is expected.
    pub fn consume(&mut self, row: Option<&Row>) -> Result<bool> {
        if self.stop.is_stopped() {
            if !self.state.finished {
                info!("stop requested, closing output files");
                self.state.stopped = true;
                self.abort();
            }
            return Ok(false);
        }
        if self.state.finished {
            return Ok(false);
        }
        match row {
            Some(row) if self.config.alternate_sink_passthrough => {
                self.state.first = false;
                self.state.row_seen = true;
                self.write_row(row)?;
                self.feedback();
                Ok(true)
            }
            Some(row) => {
                self.write_row_to_file(row)?;
                Ok(true)
            }
            None => {
                self.end_of_stream()?;
                Ok(false)
            }
        }
    }

    /// Consume every row, then end the stream.
    pub fn run(&mut self, rows: impl IntoIterator<Item = Row>) -> Result<RunSummary> {
        for row in rows {
            if !self.consume(Some(&row))? {
                break;
            }
        }
        self.consume(None)?;
        Ok(self.summary())
    }

    /// End the stream: footer, ended line, close everything.
    pub fn finish(&mut self) -> Result<RunSummary> {
        self.consume(None)?;
        Ok(self.summary())
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            metrics: self.metrics.clone(),
            files: self.state.files.clone(),
            stopped: self.state.stopped,
        }
    }

    /// Best-effort flush and close of every open file.
    ///
    /// Failures are logged and counted; every file is still attempted.
    pub fn abort(&mut self) {
        if self.state.finished {
            return;
        }
        if let Some(registry) = self.registry.as_mut()
            && let Err(e) = registry.flush_dirty(true)
        {
            error!(failed = e.count, error = %e.first, "Exception trying to close file");
            self.metrics.errors += e.count as u64;
        }
        if let Some(writer) = self.passthrough.as_mut()
            && let Err(e) = writer.flush()
        {
            error!(error = %e, "flush of passthrough output failed");
            self.metrics.errors += 1;
        }
        self.state.bound = None;
        self.state.finished = true;
        self.metrics.record_end();
    }

    fn write_row_to_file(&mut self, row: &Row) -> Result<()> {
        let per_record = self.config.filename_per_record();
        let mut filename = self.target_filename(Some(row))?;
        let mut write_header = match self.state.pending_header.take() {
            Some((opened, header)) if opened == filename => header,
            _ => self.header_decision(&filename)?,
        };
        if self.state.bound.is_none() || per_record {
            self.acquire(&filename)?;
        }
        self.state.first = false;
        self.state.row_seen = true;

        if write_header {
            self.write_names(NameLine::Header);
        }

        let split_every = self.config.split_every;
        if !per_record
            && self.metrics.lines_output > 0
            && split_every > 0
            && (self.metrics.lines_output + self.config.footer_shift()) % split_every == 0
        {
            if self.config.footer {
                self.write_names(NameLine::Footer);
            }
            self.close_bound();
            self.state.split_nr += 1;
            self.metrics.splits += 1;

            filename = self.target_filename(None)?;
            write_header = self.header_decision(&filename)?;
            self.acquire(&filename)?;
            if write_header {
                self.write_names(NameLine::Header);
            }
        }

        self.write_row(row)?;
        self.feedback();
        self.periodic_flush()
    }

    /// Final path for the next write.
    fn target_filename(&self, row: Option<&Row>) -> Result<String> {
        if let (Some(idx), Some(row)) = (self.filename_field, row) {
            let base = match row.get(idx).unwrap_or(&NULL) {
                Value::Null => return Err(SinkError::FilenameNotSet.into()),
                Value::String(s) => s.clone(),
                other => self
                    .row_meta
                    .get(idx)
                    .map_or_else(|| other.to_string(), |m| m.format_text(other)),
            };
            return self.filenames.resolve(&base, self.state.split_nr);
        }
        if let Some(bound) = &self.state.bound {
            return Ok(bound.filename.clone());
        }
        let base = self
            .config
            .filename
            .as_deref()
            .ok_or(SinkError::FilenameNotSet)?;
        self.filenames.resolve(base, self.state.split_nr)
    }

    /// Whether a header goes before the next row written to `filename`.
    ///
    /// Cheap checks run first; the filesystem is only asked when appending.
    fn header_decision(&self, filename: &str) -> Result<bool> {
        if !self.config.header {
            return Ok(false);
        }
        let first_time = self.state.first
            || match &self.registry {
                None => true,
                Some(r) if self.config.split_every > 0 => r.last_name() != Some(filename),
                Some(r) => r.get(filename).is_none(),
            };
        if !first_time {
            return Ok(false);
        }
        if !self.config.append {
            return Ok(true);
        }
        Ok(!self.compat_append_no_header && !self.fs.exists(filename)?)
    }

    /// Bind the controller to `filename`, opening or reopening it as needed.
    fn acquire(&mut self, filename: &str) -> Result<()> {
        let split_every = self.config.split_every;
        let registry = self
            .registry
            .get_or_insert_with(|| new_registry(RegistryKind::for_split(split_every)));

        let known = if split_every > 0 {
            registry.last_name() == Some(filename)
        } else {
            registry.get(filename).is_some()
        };
        if !known {
            self.open_first_time(filename)?;
        } else if !registry.get(filename).is_some_and(FileHandle::is_open) {
            self.reopen(filename)?;
        }

        let stream_id = self
            .registry
            .as_ref()
            .and_then(|r| r.get(filename))
            .map(FileHandle::stream_id)
            .ok_or_else(|| SinkError::StreamClosed {
                filename: filename.to_string(),
            })?;
        self.state.bound = Some(Bound {
            filename: filename.to_string(),
            stream_id,
        });
        Ok(())
    }

    fn open_first_time(&mut self, filename: &str) -> Result<()> {
        if self.config.add_to_result_files
            && let Some(tracker) = &self.result_files
        {
            tracker.register(filename, RESULT_FILE_COMMENT);
        }

        let can_append = self.provider.supports_append();
        if self.config.append && !can_append && self.fs.exists(filename)? {
            return Err(SinkError::AppendToArchive {
                filename: filename.to_string(),
                provider: self.provider.name().to_string(),
            }
            .into());
        }

        let per_record = self.config.filename_per_record();
        let Some(registry) = self.registry.as_mut() else {
            return Err(SinkError::StreamClosed {
                filename: filename.to_string(),
            }
            .into());
        };
        // archives cannot be reopened, so evicted ones are forgotten
        if let Some(evicted) = registry
            .ensure_capacity(self.max_open_files, !can_append)
            .context("Error opening new file")?
        {
            debug!(filename = %evicted, "closed to stay under the open file limit");
            self.metrics.files_evicted += 1;
        }

        if self.config.create_parent_folder && (registry.size() == 0 || per_record) {
            create_parent_folder(self.fs.as_ref(), filename)?;
        }

        debug!(
            filename,
            provider = self.provider.name(),
            "Opening output stream"
        );
        let streams = OutputStreams::open(
            self.fs.as_ref(),
            self.provider.as_ref(),
            filename,
            &self.config.extension,
            self.config.append && can_append,
        )
        .with_context(|| format!("Error opening new file : {filename}"))?;
        registry.add(FileHandle::new(filename, streams))?;
        self.metrics.files_opened += 1;
        self.state.files.push(filename.to_string());
        debug!(filename, "Opened new file");
        Ok(())
    }

    fn reopen(&mut self, filename: &str) -> Result<()> {
        let Some(registry) = self.registry.as_mut() else {
            return Ok(());
        };
        if let Some(evicted) = registry.ensure_capacity(self.max_open_files, false)? {
            debug!(filename = %evicted, "closed to stay under the open file limit");
            self.metrics.files_evicted += 1;
        }
        let streams = OutputStreams::open(
            self.fs.as_ref(),
            self.provider.as_ref(),
            filename,
            &self.config.extension,
            true,
        )
        .with_context(|| format!("Error opening new file : {filename}"))?;
        registry.attach(filename, streams)?;
        self.metrics.files_reopened += 1;
        debug!(filename, "reopened file");
        Ok(())
    }

    /// Close the file the controller is bound to and unbind it.
    fn close_bound(&mut self) {
        let Some(bound) = self.state.bound.take() else {
            return;
        };
        if let Some(registry) = self.registry.as_mut() {
            match registry.close_by_stream(bound.stream_id) {
                Ok(_) => debug!(filename = %bound.filename, "Closing output stream"),
                Err(e) => {
                    error!(filename = %bound.filename, error = %e, "Exception trying to close file");
                    self.metrics.errors += 1;
                }
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(writer) = self.passthrough.as_mut() {
            return writer
                .write_all(bytes)
                .context("write to passthrough output");
        }
        let filename = match &self.state.bound {
            Some(bound) => bound.filename.as_str(),
            None => return Err(SinkError::FilenameNotSet.into()),
        };
        let handle = self
            .registry
            .as_mut()
            .and_then(|r| r.get_mut(filename))
            .ok_or_else(|| SinkError::StreamClosed {
                filename: filename.to_string(),
            })?;
        handle.write_all(bytes)
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        let mut line = std::mem::take(&mut self.line);
        line.clear();
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                line.extend_from_slice(&self.separator);
            }
            let value = row.get(column.index).unwrap_or(&NULL);
            self.encoder
                .encode_value(&column.meta, value, column.null_bytes.as_deref(), &mut line);
        }
        line.extend_from_slice(&self.newline);

        let written = self.write_bytes(&line);
        self.line = line;
        written.with_context(|| match &self.state.bound {
            Some(bound) => format!("Error writing line to {}", bound.filename),
            None => "Error writing line".to_string(),
        })?;
        self.metrics.rows_written += 1;
        self.metrics.lines_output += 1;
        Ok(())
    }

    /// Write a header or footer line. Failures are logged, not raised.
    fn write_names(&mut self, kind: NameLine) {
        let mut line = Vec::new();
        for (i, (name, meta)) in self.names.iter().enumerate() {
            if i > 0 {
                line.extend_from_slice(&self.separator);
            }
            self.encoder.encode_name(name, meta.as_ref(), &mut line);
        }
        line.extend_from_slice(&self.newline);

        match (self.write_bytes(&line), kind) {
            (Ok(()), NameLine::Header) => self.metrics.headers_written += 1,
            (Ok(()), NameLine::Footer) => self.metrics.footers_written += 1,
            (Err(e), _) => {
                error!(error = %e, "Error writing header line");
                self.metrics.errors += 1;
            }
        }
        self.metrics.lines_output += 1;
    }

    fn write_ended_line(&mut self) {
        let Some(ended) = self.config.ended_line.as_deref().filter(|l| !l.trim().is_empty()) else {
            return;
        };
        let bytes = self.encoder.text(ended);
        match self.write_bytes(&bytes) {
            Ok(()) => self.metrics.lines_output += 1,
            Err(e) => {
                error!(error = %e, "Error writing ended tag line");
                self.metrics.errors += 1;
            }
        }
    }

    fn has_ended_line(&self) -> bool {
        self.config
            .ended_line
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty())
    }

    fn end_of_stream(&mut self) -> Result<()> {
        let mut outcome = Ok(());

        if self.config.alternate_sink_passthrough {
            self.write_ended_line();
            if let Some(writer) = self.passthrough.as_mut() {
                outcome = writer.flush().context("flush passthrough output");
            }
        } else {
            if self.state.bound.is_some() {
                if self.state.row_seen && self.config.footer {
                    self.write_names(NameLine::Footer);
                }
            } else if self.has_ended_line() && !self.config.filename_per_record() {
                outcome = self
                    .target_filename(None)
                    .and_then(|filename| self.acquire(&filename));
            }
            if self.state.bound.is_some() {
                self.write_ended_line();
            }
            if let Some(registry) = self.registry.as_mut()
                && let Err(e) = registry.flush_dirty(true)
            {
                self.metrics.errors += e.count as u64;
                if outcome.is_ok() {
                    outcome = Err(anyhow::Error::new(e).context("Unable to flush open files"));
                }
            }
        }

        self.state.bound = None;
        self.state.finished = true;
        self.metrics.record_end();
        info!(
            lines_output = self.metrics.lines_output,
            rows = self.metrics.rows_written,
            files = self.metrics.files_opened,
            errors = self.metrics.errors,
            "text output finished"
        );
        outcome
    }

    fn feedback(&self) {
        let every = self.config.feedback_size;
        if every > 0 && self.metrics.lines_output % every == 0 {
            info!("linenr {}", self.metrics.lines_output);
        }
    }

    fn periodic_flush(&mut self) -> Result<()> {
        let Some(interval) = self.flush_interval else {
            return Ok(());
        };
        let now = Instant::now();
        match self.state.last_flush {
            None => self.state.last_flush = Some(now),
            Some(last) if now.duration_since(last) > interval => {
                if let Some(registry) = self.registry.as_mut() {
                    registry
                        .flush_dirty(false)
                        .context("Unable to flush open files")?;
                }
                self.metrics.periodic_flushes += 1;
                self.state.last_flush = Some(Instant::now());
            }
            Some(_) => {}
        }
        Ok(())
    }
}

impl Drop for OutputController {
    fn drop(&mut self) {
        if !self.state.finished {
            warn!("output controller dropped before the end of input, closing files");
            self.abort();
        }
    }
}

/// Resolve the output columns and the header names.
fn project(
    config: &SinkConfig,
    row_meta: &RowMeta,
    charset: Charset,
) -> Result<(Vec<Column>, Vec<(String, Option<ValueMeta>)>), SinkError> {
    if config.fields.is_empty() {
        let columns = row_meta
            .values()
            .iter()
            .enumerate()
            .map(|(index, meta)| Column {
                index,
                meta: meta.clone(),
                null_bytes: None,
            })
            .collect();
        let names = row_meta
            .values()
            .iter()
            .map(|m| (m.name.clone(), Some(m.clone())))
            .collect();
        return Ok((columns, names));
    }

    let mut columns = Vec::with_capacity(config.fields.len());
    let mut names = Vec::with_capacity(config.fields.len());
    for spec in &config.fields {
        let (index, incoming) = row_meta
            .index_of(&spec.name)
            .and_then(|i| row_meta.get(i).map(|m| (i, m)))
            .ok_or_else(|| SinkError::FieldNotFound {
                field: spec.name.clone(),
            })?;
        columns.push(Column {
            index,
            meta: incoming.with_field_options(spec),
            null_bytes: spec
                .null_string
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| charset.encode(s)),
        });
        names.push((spec.name.clone(), Some(incoming.clone())));
    }
    Ok((columns, names))
}

fn create_parent_folder(fs: &dyn FileSystem, filename: &str) -> Result<()> {
    let Some(parent) = fs.parent_of(filename) else {
        return Ok(());
    };
    if fs.folder_exists(&parent)? {
        debug!(folder = %parent.display(), "parent folder exists");
        return Ok(());
    }
    fs.create_folder(&parent)
        .with_context(|| format!("Couldn't create parent folder {}", parent.display()))?;
    info!(folder = %parent.display(), "created parent folder");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, ValueType};

    fn meta() -> RowMeta {
        RowMeta::default()
            .with("id", ValueType::Integer)
            .with("name", ValueType::String)
    }

    #[test]
    fn unknown_output_field_fails_fast() {
        let config = SinkConfig {
            filename: Some("unused".into()),
            fields: vec![FieldSpec::new("missing")],
            do_not_open_at_init: true,
            ..SinkConfig::default()
        };
        let err = OutputController::new(config, meta(), Collaborators::default())
            .err()
            .and_then(|e| e.downcast_ref::<SinkError>().cloned());
        assert_eq!(
            err,
            Some(SinkError::FieldNotFound {
                field: "missing".into()
            })
        );
    }

    #[test]
    fn missing_filename_field_fails_fast() {
        let config = SinkConfig {
            filename_field: Some("target".into()),
            ..SinkConfig::default()
        };
        let err = OutputController::new(config, meta(), Collaborators::default())
            .err()
            .and_then(|e| e.downcast_ref::<SinkError>().cloned());
        assert!(matches!(err, Some(SinkError::FilenameFieldNotFound { .. })));
    }

    #[test]
    fn passthrough_needs_a_writer() {
        let config = SinkConfig {
            alternate_sink_passthrough: true,
            ..SinkConfig::default()
        };
        let err = OutputController::new(config, meta(), Collaborators::default())
            .err()
            .and_then(|e| e.downcast_ref::<SinkError>().cloned());
        assert_eq!(err, Some(SinkError::PassthroughMissing));
    }
}
