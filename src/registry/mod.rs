//! Bounded bookkeeping of the output files of one run.
//!
//! A [`FileRegistry`] maps filenames to [`FileHandle`]s, counts how many of
//! them hold open streams, and evicts the oldest open handle when a cap is
//! reached. Two strategies implement it:
//!
//! - [`SequentialRegistry`]: arrival-ordered vectors, linear lookup. Used when
//!   the output is split by row count, so only one file is live at a time.
//! - [`IndexedRegistry`]: name-ordered map plus an insertion index. Used when
//!   the filename comes from each record and many files can be live.
//!
//! The strategy is picked once per run with [`RegistryKind::for_split`].

mod indexed;
mod sequential;

pub use indexed::IndexedRegistry;
pub use sequential::SequentialRegistry;

use crate::io::handle::{FileHandle, OutputStreams};
use anyhow::Result;
use std::fmt;

/// Which registry strategy a run uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryKind {
    Sequential,
    Indexed,
}

impl RegistryKind {
    /// Strategy for a run that splits every `split_every` rows (0 = never).
    #[must_use]
    pub fn for_split(split_every: u64) -> Self {
        if split_every > 0 {
            Self::Sequential
        } else {
            Self::Indexed
        }
    }
}

/// Build an empty registry of the given kind.
#[must_use]
pub fn new_registry(kind: RegistryKind) -> Box<dyn FileRegistry> {
    match kind {
        RegistryKind::Sequential => Box::new(SequentialRegistry::default()),
        RegistryKind::Indexed => Box::new(IndexedRegistry::default()),
    }
}

/// Filename to handle mapping with an open-handle count.
///
/// At most one handle is registered per filename.
pub trait FileRegistry: Send {
    fn kind(&self) -> RegistryKind;

    fn get(&self, name: &str) -> Option<&FileHandle>;

    fn get_mut(&mut self, name: &str) -> Option<&mut FileHandle>;

    /// Register `handle` under its filename, replacing (and closing) any
    /// handle already registered under that name.
    fn add(&mut self, handle: FileHandle) -> Result<()>;

    /// Attach fresh streams to the closed handle registered as `name`.
    ///
    /// Returns `false` when no such handle is registered.
    fn attach(&mut self, name: &str, streams: OutputStreams) -> Result<bool>;

    /// Filename registered most recently.
    fn last_name(&self) -> Option<&str>;

    fn last_handle_mut(&mut self) -> Option<&mut FileHandle>;

    /// Number of registered handles that currently hold open streams.
    fn open_count(&self) -> usize;

    /// Flush and close the oldest open handle; with `remove`, forget it too.
    ///
    /// Returns the evicted filename, or `None` when nothing was open.
    fn close_oldest_open(&mut self, remove: bool) -> Result<Option<String>>;

    /// Flush every dirty handle; with `close_after`, close every open handle.
    ///
    /// All handles are visited even when some fail. The error counts the
    /// failed handles and keeps the first cause.
    fn flush_dirty(&mut self, close_after: bool) -> Result<(), FlushFailures>;

    /// Close the handle registered as `name`. Returns whether it was open.
    fn close(&mut self, name: &str) -> Result<bool>;

    /// Close the handle whose current streams carry `stream_id`.
    fn close_by_stream(&mut self, stream_id: u64) -> Result<bool>;

    /// Number of registered handles, open or closed.
    fn size(&self) -> usize;

    /// Make room for one more open handle under `cap` (0 = unlimited).
    fn ensure_capacity(&mut self, cap: usize, remove: bool) -> Result<Option<String>> {
        if cap > 0 && self.open_count() >= cap {
            self.close_oldest_open(remove)
        } else {
            Ok(None)
        }
    }
}

/// Handles that could not be flushed or closed during [`FileRegistry::flush_dirty`].
#[derive(Debug)]
pub struct FlushFailures {
    /// Number of handles with at least one failure.
    pub count: usize,
    pub first: anyhow::Error,
}

impl fmt::Display for FlushFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} file(s) failed to flush or close: {:#}", self.count, self.first)
    }
}

impl std::error::Error for FlushFailures {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.first)
    }
}

/// Flush (and optionally close) `handles`, collecting failures per handle.
///
/// Returns how many handles were closed alongside the outcome.
fn flush_handles<'a>(
    handles: impl Iterator<Item = &'a mut FileHandle>,
    close_after: bool,
) -> (usize, Result<(), FlushFailures>) {
    let mut closed = 0;
    let mut failed = 0;
    let mut first_err = None;
    for handle in handles {
        let mut handle_failed = false;
        if handle.is_dirty()
            && let Err(e) = handle.flush()
        {
            tracing::warn!(filename = %handle.filename(), error = %e, "flush failed");
            first_err.get_or_insert(e);
            handle_failed = true;
        }
        if close_after && handle.is_open() {
            closed += 1;
            if let Err(e) = handle.close() {
                tracing::warn!(filename = %handle.filename(), error = %e, "close failed");
                first_err.get_or_insert(e);
                handle_failed = true;
            }
        }
        failed += usize::from(handle_failed);
    }
    let outcome = match first_err {
        Some(first) => Err(FlushFailures {
            count: failed,
            first,
        }),
        None => Ok(()),
    };
    (closed, outcome)
}

/// Close `handle`, reporting whether it was open.
fn close_handle(handle: &mut FileHandle, open: &mut usize) -> Result<bool> {
    if !handle.is_open() {
        return Ok(false);
    }
    *open -= 1;
    handle.close()?;
    Ok(true)
}
