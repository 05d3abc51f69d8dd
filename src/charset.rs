//! Output character sets.
//!
//! Text is held as UTF-8 inside the process and converted to the configured
//! output charset only when bytes are produced. Unmappable characters in the
//! single-byte charsets are replaced by `?`.

use crate::error::SinkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported output encodings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    Utf8,
    /// Big-endian UTF-16 without a byte-order mark. The bare name `UTF-16`
    /// is rejected, since it usually implies a leading mark.
    Utf16Be,
    Utf16Le,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Canonical name of the charset.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::UsAscii => "US-ASCII",
        }
    }

    /// Encode `text` and append the bytes to `out`.
    pub fn encode_into(self, text: &str, out: &mut Vec<u8>) {
        match self {
            Self::Utf8 => out.extend_from_slice(text.as_bytes()),
            Self::Utf16Be => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            Self::Utf16Le => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
            Self::Iso8859_1 => out.extend(text.chars().map(|c| u8::try_from(c).unwrap_or(b'?'))),
            Self::UsAscii => out.extend(
                text.chars()
                    .map(|c| if c.is_ascii() { c as u8 } else { b'?' }),
            ),
        }
    }

    /// Encode `text` into a fresh buffer.
    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        self.encode_into(text, &mut out);
        out
    }

    /// Resolve an optional configured name; blank means UTF-8.
    pub fn resolve(name: Option<&str>) -> Result<Self, SinkError> {
        match name.map(str::trim) {
            None | Some("") => Ok(Self::Utf8),
            Some(n) => n.parse(),
        }
    }
}

impl FromStr for Charset {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "UTF-16BE" | "UTF16BE" => Ok(Self::Utf16Be),
            "UTF-16LE" | "UTF16LE" => Ok(Self::Utf16Le),
            "ISO-8859-1" | "LATIN1" | "ISO8859-1" => Ok(Self::Iso8859_1),
            "US-ASCII" | "ASCII" => Ok(Self::UsAscii),
            _ => Err(SinkError::UnknownCharset { name: s.to_string() }),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
