//! Bookkeeping of the files a run produced.

use std::sync::{Arc, Mutex, PoisonError};

/// Comment attached to every file the sink registers.
pub const RESULT_FILE_COMMENT: &str = "This file was created with a text file output step";

/// Receives every output file the first time it is opened.
pub trait ResultFileTracker: Send + Sync {
    fn register(&self, path: &str, comment: &str);
}

/// One registered file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultFile {
    pub path: String,
    pub comment: String,
}

/// In-memory tracker; clones share the same list.
#[derive(Clone, Debug, Default)]
pub struct ResultFiles {
    files: Arc<Mutex<Vec<ResultFile>>>,
}

impl ResultFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered files in registration order.
    #[must_use]
    pub fn files(&self) -> Vec<ResultFile> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files().into_iter().map(|f| f.path).collect()
    }
}

impl ResultFileTracker for ResultFiles {
    fn register(&self, path: &str, comment: &str) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ResultFile {
                path: path.to_string(),
                comment: comment.to_string(),
            });
    }
}
