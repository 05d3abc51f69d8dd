//! One logical output destination and its layered streams.
//!
//! Bytes travel `buffered -> compressed -> raw`. The three layers are owned
//! together by [`OutputStreams`] and are released together, outer to inner,
//! exactly once. A [`FileHandle`] keeps its filename and registry identity
//! across close and reopen; only the stream layers come and go.

use crate::error::SinkError;
use crate::io::compression::{CompressedOutput, CompressionProvider};
use crate::io::fs::FileSystem;
use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};

/// Capacity of the buffered layer.
pub const BUFFER_SIZE: usize = 5000;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// The buffered and compressed layers stacked on an open raw stream.
pub struct OutputStreams {
    buffered: BufWriter<Box<dyn CompressedOutput>>,
}

impl OutputStreams {
    /// Open `filename` and stack the compression and buffer layers on it.
    ///
    /// Archive formats get an entry named after the file.
    pub fn open(
        fs: &dyn FileSystem,
        provider: &dyn CompressionProvider,
        filename: &str,
        extension: &str,
        append: bool,
    ) -> Result<Self> {
        let raw = fs.open(filename, append)?;
        let mut compressed = provider
            .wrap_output(raw)
            .with_context(|| format!("wrap {} with {} compression", filename, provider.name()))?;
        compressed
            .add_entry(filename, extension)
            .with_context(|| format!("add archive entry to {filename}"))?;
        Ok(Self {
            buffered: BufWriter::with_capacity(BUFFER_SIZE, compressed),
        })
    }

    fn release(self) -> std::io::Result<()> {
        let compressed = self.buffered.into_inner().map_err(|e| e.into_error())?;
        compressed.finish()
    }
}

/// Registry entry for one output file.
pub struct FileHandle {
    filename: String,
    streams: Option<OutputStreams>,
    dirty: bool,
    stream_id: u64,
}

impl FileHandle {
    /// A handle that is open on `streams`.
    #[must_use]
    pub fn new(filename: impl Into<String>, streams: OutputStreams) -> Self {
        Self {
            filename: filename.into(),
            streams: Some(streams),
            dirty: false,
            stream_id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.streams.is_some()
    }

    /// Written to since the last flush.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Identifies the current set of stream layers; changes on every attach.
    #[must_use]
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Give a closed handle fresh stream layers.
    ///
    /// Layers still attached are released first.
    pub fn attach(&mut self, streams: OutputStreams) -> Result<()> {
        let released = self.close();
        self.streams = Some(streams);
        self.stream_id = NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed);
        released
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let streams = self.streams.as_mut().ok_or_else(|| SinkError::StreamClosed {
            filename: self.filename.clone(),
        })?;
        streams
            .buffered
            .write_all(bytes)
            .with_context(|| format!("write to {}", self.filename))?;
        self.dirty = true;
        Ok(())
    }

    /// Push buffered bytes down to the file and clear the dirty flag.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(streams) = self.streams.as_mut() {
            streams
                .buffered
                .flush()
                .with_context(|| format!("flush {}", self.filename))?;
        }
        self.dirty = false;
        Ok(())
    }

    /// Release the stream layers. Closing a closed handle does nothing.
    ///
    /// The handle counts as closed afterwards even when releasing fails.
    pub fn close(&mut self) -> Result<()> {
        self.dirty = false;
        match self.streams.take() {
            Some(streams) => streams
                .release()
                .with_context(|| format!("close {}", self.filename)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("filename", &self.filename)
            .field("open", &self.is_open())
            .field("dirty", &self.dirty)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}
