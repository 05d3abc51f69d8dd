use super::{FileRegistry, FlushFailures, RegistryKind, close_handle, flush_handles};
use crate::io::handle::{FileHandle, OutputStreams};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::debug;

/// Name-ordered registry with an insertion index for age queries.
#[derive(Debug, Default)]
pub struct IndexedRegistry {
    by_name: BTreeMap<String, (u64, FileHandle)>,
    by_index: BTreeMap<u64, String>,
    next_index: u64,
    open: usize,
}

impl FileRegistry for IndexedRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::Indexed
    }

    fn get(&self, name: &str) -> Option<&FileHandle> {
        self.by_name.get(name).map(|(_, h)| h)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut FileHandle> {
        self.by_name.get_mut(name).map(|(_, h)| h)
    }

    fn add(&mut self, handle: FileHandle) -> Result<()> {
        let name = handle.filename().to_string();
        if handle.is_open() {
            self.open += 1;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.by_index.insert(index, name.clone());
        match self.by_name.insert(name, (index, handle)) {
            Some((old_index, mut old)) => {
                self.by_index.remove(&old_index);
                close_handle(&mut old, &mut self.open).map(|_| ())
            }
            None => Ok(()),
        }
    }

    fn attach(&mut self, name: &str, streams: OutputStreams) -> Result<bool> {
        let Some((_, handle)) = self.by_name.get_mut(name) else {
            return Ok(false);
        };
        if !handle.is_open() {
            self.open += 1;
        }
        handle.attach(streams)?;
        Ok(true)
    }

    fn last_name(&self) -> Option<&str> {
        self.by_index.last_key_value().map(|(_, n)| n.as_str())
    }

    fn last_handle_mut(&mut self) -> Option<&mut FileHandle> {
        let name = self.by_index.last_key_value()?.1;
        self.by_name.get_mut(name).map(|(_, h)| h)
    }

    fn open_count(&self) -> usize {
        self.open
    }

    fn close_oldest_open(&mut self, remove: bool) -> Result<Option<String>> {
        let oldest = self
            .by_index
            .iter()
            .find(|(_, name)| self.by_name.get(*name).is_some_and(|(_, h)| h.is_open()))
            .map(|(idx, name)| (*idx, name.clone()));
        let Some((index, name)) = oldest else {
            return Ok(None);
        };
        debug!(filename = %name, remove, "evicting oldest open file");
        let closed = match self.by_name.get_mut(&name) {
            Some((_, handle)) => close_handle(handle, &mut self.open),
            None => Ok(false),
        };
        if remove {
            self.by_index.remove(&index);
            self.by_name.remove(&name);
        }
        closed.map(|_| Some(name))
    }

    fn flush_dirty(&mut self, close_after: bool) -> Result<(), FlushFailures> {
        let (closed, outcome) =
            flush_handles(self.by_name.values_mut().map(|(_, h)| h), close_after);
        self.open -= closed;
        outcome
    }

    fn close(&mut self, name: &str) -> Result<bool> {
        match self.by_name.get_mut(name) {
            Some((_, handle)) => close_handle(handle, &mut self.open),
            None => Ok(false),
        }
    }

    fn close_by_stream(&mut self, stream_id: u64) -> Result<bool> {
        match self
            .by_name
            .values_mut()
            .map(|(_, h)| h)
            .find(|h| h.is_open() && h.stream_id() == stream_id)
        {
            Some(handle) => close_handle(handle, &mut self.open),
            None => Ok(false),
        }
    }

    fn size(&self) -> usize {
        self.by_name.len()
    }
}
