//! Pluggable compression for output streams.
//!
//! A [`CompressionProvider`] wraps the raw file stream of an output file in a
//! [`CompressedOutput`] layer. Providers are looked up by name, case-insensitive,
//! from a global registry that starts with the built-in providers and can be
//! extended with [`register_provider`].
//!
//! ## Built-in Providers
//!
//! - **None** - pass-through, always available
//! - **Zip** (`.zip` archive, one entry per file) - via `zip` (feature: `compression-zip`)
//! - **GZip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` (feature: `compression-xz`)
//!
//! ## Append
//!
//! Stream formats tolerate concatenation, so appending a new compressed member
//! to an existing file yields a valid file. Archives do not: an existing zip
//! cannot be reopened for append, which [`CompressionProvider::supports_append`]
//! reports so the sink can refuse or avoid it.

use crate::error::SinkError;
use std::io::{self, Seek, Write};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Innermost layer: the destination byte stream.
pub trait RawWrite: Write + Seek + Send {}

impl<T: Write + Seek + Send> RawWrite for T {}

/// Owned raw stream of one output file.
pub type RawStream = Box<dyn RawWrite>;

/// Middle layer: a stream that compresses what is written to it.
pub trait CompressedOutput: Write + Send {
    /// Start a named entry. Only archive formats record entries.
    fn add_entry(&mut self, _filename: &str, _extension: &str) -> io::Result<()> {
        Ok(())
    }

    /// Write any trailer, flush and release the raw stream.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// A compression format usable for output files.
pub trait CompressionProvider: Send + Sync {
    /// Registry name, e.g. `"GZip"`.
    fn name(&self) -> &str;

    /// Whether new data may be appended to an existing file of this format.
    fn supports_append(&self) -> bool;

    /// Archives replace the file extension with their own suffix.
    fn is_archive(&self) -> bool {
        false
    }

    /// Suffix added to generated filenames, including the dot.
    fn filename_suffix(&self) -> Option<&str> {
        None
    }

    /// Wrap `raw` with this provider's compression layer.
    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>>;
}

static PROVIDER_REGISTRY: RwLock<Option<Vec<Arc<dyn CompressionProvider>>>> = RwLock::new(None);

fn init_registry() -> Vec<Arc<dyn CompressionProvider>> {
    vec![
        Arc::new(NoCompression),
        #[cfg(feature = "compression-zip")]
        Arc::new(ZipProvider),
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipProvider),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdProvider),
        #[cfg(feature = "compression-bzip2")]
        Arc::new(Bzip2Provider),
        #[cfg(feature = "compression-xz")]
        Arc::new(XzProvider),
    ]
}

/// Register a custom provider. Later registrations win name lookups.
pub fn register_provider(provider: Arc<dyn CompressionProvider>) {
    let mut lock = PROVIDER_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(init_registry).push(provider);
}

/// Look up a provider by name; a blank name selects `None`.
pub fn provider_by_name(name: &str) -> Result<Arc<dyn CompressionProvider>, SinkError> {
    let wanted = if name.trim().is_empty() { "None" } else { name.trim() };
    let mut lock = PROVIDER_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(init_registry)
        .iter()
        .rev()
        .find(|p| p.name().eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| SinkError::UnknownCompression {
            name: wanted.to_string(),
        })
}

/// Zip entry name for `filename`: folders and the `.zip` suffix removed,
/// `extension` appended.
#[must_use]
pub fn zip_entry_name(filename: &str, extension: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .map_or_else(|| filename.to_string(), |n| n.to_string_lossy().into_owned());
    let mut entry = match base.to_ascii_lowercase().rfind(".zip") {
        Some(idx) => format!("{}{}", &base[..idx], &base[idx + 4..]),
        None => base,
    };
    if !extension.is_empty() {
        entry.push('.');
        entry.push_str(extension);
    }
    entry
}

// ============================================================================
// Built-in Providers
// ============================================================================

/// Pass-through provider.
pub struct NoCompression;

struct PlainOutput(RawStream);

impl Write for PlainOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl CompressedOutput for PlainOutput {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

impl CompressionProvider for NoCompression {
    fn name(&self) -> &str {
        "None"
    }

    fn supports_append(&self) -> bool {
        true
    }

    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>> {
        Ok(Box::new(PlainOutput(raw)))
    }
}

/// Stream encoder whose `finish` hands back the raw stream.
#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-zstd",
    feature = "compression-bzip2",
    feature = "compression-xz"
))]
struct Encoded<E: Write + Send> {
    inner: E,
    finish: fn(E) -> io::Result<RawStream>,
}

#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-zstd",
    feature = "compression-bzip2",
    feature = "compression-xz"
))]
impl<E: Write + Send> Write for Encoded<E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-zstd",
    feature = "compression-bzip2",
    feature = "compression-xz"
))]
impl<E: Write + Send> CompressedOutput for Encoded<E> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let Self { inner, finish } = *self;
        let mut raw = finish(inner)?;
        raw.flush()
    }
}

#[cfg(feature = "compression-zip")]
pub struct ZipProvider;

#[cfg(feature = "compression-zip")]
struct ZipOutput(zip::ZipWriter<RawStream>);

#[cfg(feature = "compression-zip")]
impl Write for ZipOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(feature = "compression-zip")]
impl CompressedOutput for ZipOutput {
    fn add_entry(&mut self, filename: &str, extension: &str) -> io::Result<()> {
        let options = zip::write::SimpleFileOptions::default();
        self.0
            .start_file(zip_entry_name(filename, extension), options)
            .map_err(io::Error::other)
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut raw = self.0.finish().map_err(io::Error::other)?;
        raw.flush()
    }
}

#[cfg(feature = "compression-zip")]
impl CompressionProvider for ZipProvider {
    fn name(&self) -> &str {
        "Zip"
    }

    fn supports_append(&self) -> bool {
        false
    }

    fn is_archive(&self) -> bool {
        true
    }

    fn filename_suffix(&self) -> Option<&str> {
        Some(".zip")
    }

    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>> {
        Ok(Box::new(ZipOutput(zip::ZipWriter::new(raw))))
    }
}

#[cfg(feature = "compression-gzip")]
pub struct GzipProvider;

#[cfg(feature = "compression-gzip")]
impl CompressionProvider for GzipProvider {
    fn name(&self) -> &str {
        "GZip"
    }

    fn supports_append(&self) -> bool {
        true
    }

    fn filename_suffix(&self) -> Option<&str> {
        Some(".gz")
    }

    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(Encoded {
            inner: GzEncoder::new(raw, Compression::default()),
            finish: GzEncoder::finish,
        }))
    }
}

#[cfg(feature = "compression-zstd")]
pub struct ZstdProvider;

#[cfg(feature = "compression-zstd")]
impl CompressionProvider for ZstdProvider {
    fn name(&self) -> &str {
        "Zstd"
    }

    fn supports_append(&self) -> bool {
        true
    }

    fn filename_suffix(&self) -> Option<&str> {
        Some(".zst")
    }

    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>> {
        let encoder = zstd::stream::write::Encoder::new(raw, 3)?;
        Ok(Box::new(Encoded {
            inner: encoder,
            finish: zstd::stream::write::Encoder::finish,
        }))
    }
}

#[cfg(feature = "compression-bzip2")]
pub struct Bzip2Provider;

#[cfg(feature = "compression-bzip2")]
impl CompressionProvider for Bzip2Provider {
    fn name(&self) -> &str {
        "Bzip2"
    }

    fn supports_append(&self) -> bool {
        true
    }

    fn filename_suffix(&self) -> Option<&str> {
        Some(".bz2")
    }

    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(Encoded {
            inner: BzEncoder::new(raw, Compression::default()),
            finish: BzEncoder::finish,
        }))
    }
}

#[cfg(feature = "compression-xz")]
pub struct XzProvider;

#[cfg(feature = "compression-xz")]
impl CompressionProvider for XzProvider {
    fn name(&self) -> &str {
        "Xz"
    }

    fn supports_append(&self) -> bool {
        true
    }

    fn filename_suffix(&self) -> Option<&str> {
        Some(".xz")
    }

    fn wrap_output(&self, raw: RawStream) -> io::Result<Box<dyn CompressedOutput>> {
        use xz2::write::XzEncoder;
        Ok(Box::new(Encoded {
            inner: XzEncoder::new(raw, 6),
            finish: XzEncoder::finish,
        }))
    }
}
