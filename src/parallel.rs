//! Parallel copies of the sink.
//!
//! [`write_copies_par`] runs one [`OutputController`] per input partition on
//! the rayon pool. Copies share nothing: each has its own registry and writes
//! its own files, told apart by the copy number that is always added to the
//! filename.

use crate::config::SinkConfig;
use crate::controller::{Collaborators, OutputController, RunSummary};
use crate::filename::FilenameBuilder;
use crate::io::compression::provider_by_name;
use crate::result_files::ResultFileTracker;
use crate::schema::{Row, RowMeta};
use anyhow::{Context, Result};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use std::sync::Arc;

/// Write each partition through its own controller, in parallel.
///
/// Summaries come back in partition order. If a copy fails, an error is
/// returned; copies that were already running still close their files.
pub fn write_copies_par(
    config: &SinkConfig,
    row_meta: &RowMeta,
    partitions: Vec<Vec<Row>>,
    result_files: Option<Arc<dyn ResultFileTracker>>,
) -> Result<Vec<RunSummary>> {
    let mut config = config.clone();
    config.add_copy_nr = true;
    let provider = provider_by_name(&config.compression)?;

    partitions
        .into_par_iter()
        .enumerate()
        .map(|(copy_nr, rows)| {
            let filenames = FilenameBuilder::new(&config, provider.as_ref()).with_copy_nr(copy_nr);
            let mut collaborators = Collaborators::default().with_filenames(filenames);
            collaborators.result_files = result_files.clone();
            let mut controller = OutputController::new(config.clone(), row_meta.clone(), collaborators)
                .with_context(|| format!("start copy {copy_nr}"))?;
            controller
                .run(rows)
                .with_context(|| format!("run copy {copy_nr}"))
        })
        .collect()
}
