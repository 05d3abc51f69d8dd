use super::{FileRegistry, FlushFailures, RegistryKind, close_handle, flush_handles};
use crate::io::handle::{FileHandle, OutputStreams};
use anyhow::Result;
use tracing::debug;

/// Arrival-ordered registry with linear lookup.
#[derive(Debug, Default)]
pub struct SequentialRegistry {
    names: Vec<String>,
    handles: Vec<FileHandle>,
    open: usize,
}

impl SequentialRegistry {
    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl FileRegistry for SequentialRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::Sequential
    }

    fn get(&self, name: &str) -> Option<&FileHandle> {
        self.position(name).map(|i| &self.handles[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut FileHandle> {
        self.position(name).map(|i| &mut self.handles[i])
    }

    fn add(&mut self, handle: FileHandle) -> Result<()> {
        let mut replaced = Ok(false);
        if let Some(i) = self.position(handle.filename()) {
            self.names.remove(i);
            let mut old = self.handles.remove(i);
            replaced = close_handle(&mut old, &mut self.open);
        }
        if handle.is_open() {
            self.open += 1;
        }
        self.names.push(handle.filename().to_string());
        self.handles.push(handle);
        replaced.map(|_| ())
    }

    fn attach(&mut self, name: &str, streams: OutputStreams) -> Result<bool> {
        let Some(i) = self.position(name) else {
            return Ok(false);
        };
        let handle = &mut self.handles[i];
        if !handle.is_open() {
            self.open += 1;
        }
        handle.attach(streams)?;
        Ok(true)
    }

    fn last_name(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    fn last_handle_mut(&mut self) -> Option<&mut FileHandle> {
        self.handles.last_mut()
    }

    fn open_count(&self) -> usize {
        self.open
    }

    fn close_oldest_open(&mut self, remove: bool) -> Result<Option<String>> {
        let Some(i) = self.handles.iter().position(FileHandle::is_open) else {
            return Ok(None);
        };
        let name = self.names[i].clone();
        debug!(filename = %name, remove, "evicting oldest open file");
        let closed = close_handle(&mut self.handles[i], &mut self.open);
        if remove {
            self.names.remove(i);
            self.handles.remove(i);
        }
        closed.map(|_| Some(name))
    }

    fn flush_dirty(&mut self, close_after: bool) -> Result<(), FlushFailures> {
        let (closed, outcome) = flush_handles(self.handles.iter_mut(), close_after);
        self.open -= closed;
        outcome
    }

    fn close(&mut self, name: &str) -> Result<bool> {
        match self.position(name) {
            Some(i) => close_handle(&mut self.handles[i], &mut self.open),
            None => Ok(false),
        }
    }

    fn close_by_stream(&mut self, stream_id: u64) -> Result<bool> {
        match self
            .handles
            .iter_mut()
            .find(|h| h.is_open() && h.stream_id() == stream_id)
        {
            Some(handle) => close_handle(handle, &mut self.open),
            None => Ok(false),
        }
    }

    fn size(&self) -> usize {
        self.handles.len()
    }
}
