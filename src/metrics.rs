//! Counters describing one run of the sink.
//!
//! A controller owns one [`SinkMetrics`] and updates it as it goes; read it
//! with [`crate::OutputController::metrics`] or from the
//! [`crate::RunSummary`] returned at the end of a run.
//!
//! ```no_run
//! # fn show(metrics: &ironsink::SinkMetrics) -> anyhow::Result<()> {
//! metrics.print();
//! metrics.save_to_file("sink-metrics.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};

/// Run statistics of one controller.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SinkMetrics {
    /// Every line written: data rows, headers, footers and the ended line.
    pub lines_output: u64,
    /// Data rows only.
    pub rows_written: u64,
    pub headers_written: u64,
    pub footers_written: u64,
    pub files_opened: u64,
    pub files_reopened: u64,
    pub files_evicted: u64,
    pub splits: u64,
    pub periodic_flushes: u64,
    /// Failures that were logged instead of aborting the run.
    pub errors: u64,
    #[serde(skip)]
    started: Option<Instant>,
    #[serde(skip)]
    finished: Option<Instant>,
}

impl SinkMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn record_end(&mut self) {
        self.finished = Some(Instant::now());
    }

    /// Time between start and end, if both were recorded.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// All counters as a JSON object, plus `execution_time_ms` when known.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or_else(|_| json!({}));
        if let (Some(elapsed), Some(map)) = (self.elapsed(), value.as_object_mut()) {
            map.insert("execution_time_ms".to_string(), json!(elapsed.as_millis()));
        }
        value
    }

    /// Print the counters to stdout.
    pub fn print(&self) {
        println!("\n========== Text Sink Metrics ==========");
        if let Some(elapsed) = self.elapsed() {
            println!(
                "Execution Time: {:.3}s ({} ms)",
                elapsed.as_secs_f64(),
                elapsed.as_millis()
            );
            println!("---------------------------------------");
        }
        if let Some(map) = self.to_json().as_object() {
            for (name, value) in map.iter().filter(|(k, _)| *k != "execution_time_ms") {
                println!("{name}: {value}");
            }
        }
        println!("=======================================\n");
    }

    /// Write the counters to `path` as pretty JSON.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {path}"))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {path}"))?;
        Ok(())
    }
}
