//! Output stream plumbing: filesystem access, compression layers and the
//! per-file handle that owns them.

pub mod compression;
pub mod fs;
pub mod handle;

pub use compression::{CompressedOutput, CompressionProvider, RawStream, provider_by_name, register_provider};
pub use fs::{FileSystem, LocalFileSystem};
pub use handle::{FileHandle, OutputStreams};
