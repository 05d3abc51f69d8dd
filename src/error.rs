//! Classified sink failures.
//!
//! Most fallible functions in this crate return [`anyhow::Result`] and attach the
//! affected filename as context. The conditions callers may want to react to are
//! raised as a [`SinkError`] inside the `anyhow::Error`, so they can be recovered
//! with `err.downcast_ref::<SinkError>()`.

use thiserror::Error;

/// Errors raised by the text sink that carry a specific meaning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// An output field names a column that the incoming layout does not have.
    #[error("Field [{field}] couldn't be found in the input stream!")]
    FieldNotFound { field: String },

    /// Neither a static filename nor a usable per-record filename is available.
    #[error("Output filename is not set")]
    FilenameNotSet,

    /// The per-record filename field is absent from the incoming layout.
    #[error("Filename field [{field}] couldn't be found in the input stream!")]
    FilenameFieldNotFound { field: String },

    /// Static filename and per-record filename field were both configured.
    #[error("a static filename and a filename field are mutually exclusive")]
    ConflictingDestination,

    /// Append was requested on an existing file whose compression cannot be appended to.
    #[error("Can not append to an existing {provider} file : {filename}")]
    AppendToArchive { filename: String, provider: String },

    /// No compression provider is registered under the configured name.
    #[error("No compression provider found with name = {name}")]
    UnknownCompression { name: String },

    /// The configured output encoding is not supported.
    #[error("Unsupported output encoding [{name}]")]
    UnknownCharset { name: String },

    /// Passthrough output was enabled without a writer to pass rows to.
    #[error("alternate sink passthrough is enabled but no writer was supplied")]
    PassthroughMissing,

    /// A write targeted a handle whose stream layers were already released.
    #[error("output stream for {filename} is closed")]
    StreamClosed { filename: String },
}
