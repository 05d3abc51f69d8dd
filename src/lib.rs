//! # Ironsink
//!
//! The output stage of a record-processing pipeline: typed records in,
//! delimited text files out.
//!
//! ## Key Features
//!
//! - **Field encoding** - trimming, fixed-width padding and truncation, null
//!   substitution, enclosure detection with doubled inner enclosures
//! - **Many files at once** - the destination can come from each record; a cap on
//!   open files is enforced by closing the oldest open file and reopening it
//!   later for append
//! - **Splitting** - start a new file every N lines, with headers and footers
//!   per file
//! - **Compression** - zip, gzip, zstd, bzip2 and xz (all optional via feature
//!   flags), plus custom providers
//! - **Charsets** - UTF-8, UTF-16BE/LE, ISO-8859-1 and US-ASCII output
//! - **Parallel copies** - one independent sink per partition on rayon
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironsink::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let meta = RowMeta::default()
//!     .with("ID", ValueType::Integer)
//!     .with("NAME", ValueType::String);
//!
//! let config = SinkConfig {
//!     filename: Some("/tmp/out/people".into()),
//!     fields: vec![FieldSpec::new("ID"), FieldSpec::new("NAME").length(10)],
//!     ..SinkConfig::default()
//! };
//!
//! let mut sink = OutputController::new(config, meta, Collaborators::default())?;
//! sink.consume(Some(&vec![Value::Integer(1), Value::from("Alice")]))?;
//! sink.consume(None)?;
//! // /tmp/out/people.txt now holds "ID;NAME\r\n1;Alice     \r\n"
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! | Module | Role |
//! |---|---|
//! | [`schema`] | values, column metadata and value formatting |
//! | [`encoder`] | one value to escaped field bytes |
//! | [`io`] | filesystem, compression layers, per-file handles |
//! | [`registry`] | bounded bookkeeping of open files |
//! | [`controller`] | per-record state machine |
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber.

pub mod charset;
pub mod config;
pub mod controller;
pub mod encoder;
pub mod error;
pub mod filename;
pub mod io;
pub mod metrics;
#[cfg(feature = "parallel-io")]
pub mod parallel;
pub mod registry;
pub mod result_files;
pub mod schema;
pub mod testing;

pub use charset::Charset;
pub use config::{NewlineStyle, SinkConfig};
pub use controller::{Collaborators, OutputController, RunSummary, StopHandle};
pub use encoder::{EncoderOptions, RowEncoder};
pub use error::SinkError;
pub use filename::{FilenameBuilder, FilenameResolver};
pub use io::compression::{CompressionProvider, register_provider};
pub use io::fs::{FileSystem, LocalFileSystem};
pub use metrics::SinkMetrics;
#[cfg(feature = "parallel-io")]
pub use parallel::write_copies_par;
pub use registry::{FileRegistry, FlushFailures, RegistryKind, new_registry};
pub use result_files::{ResultFileTracker, ResultFiles};
pub use schema::{FieldSpec, Row, RowMeta, TrimType, Value, ValueMeta, ValueType};
