//! Field encoding: typed values to escaped, padded, delimited bytes.
//!
//! [`RowEncoder`] works one value at a time. Separators between fields and the
//! row terminator are positional and are written by the caller.
//!
//! # Enclosures
//!
//! A data value is wrapped in the enclosure sequence when
//!
//! * enclosure is forced and fields are not being padded, or
//! * enclosure detection is enabled and the value bytes contain the separator
//!   or the enclosure sequence.
//!
//! Every enclosure occurrence inside an enclosed value is written twice, so
//! `He said "hi"` becomes `"He said ""hi"""`.
//!
//! Header and footer names follow their own rule: forced enclosure only applies
//! to string-typed columns, detection is the same.

use crate::charset::Charset;
use crate::schema::{Value, ValueMeta};

/// Byte-level settings shared by every field of a run.
#[derive(Clone, Debug, Default)]
pub struct EncoderOptions {
    pub separator: Vec<u8>,
    pub enclosure: Vec<u8>,
    pub enclosure_forced: bool,
    /// Fixed-width output; suppresses forced enclosure of data values.
    pub pad_fields: bool,
    /// Enclose values that contain the separator or the enclosure.
    pub detect_enclosure: bool,
    /// Write natural string forms without formatting or escaping.
    pub fast_dump: bool,
    pub charset: Charset,
}

/// Converts values into the bytes of one output field.
#[derive(Clone, Debug)]
pub struct RowEncoder {
    opts: EncoderOptions,
}

impl RowEncoder {
    #[must_use]
    pub fn new(opts: EncoderOptions) -> Self {
        Self { opts }
    }

    #[must_use]
    pub fn options(&self) -> &EncoderOptions {
        &self.opts
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.opts.charset
    }

    /// Encode plain text in the output charset.
    #[must_use]
    pub fn text(&self, s: &str) -> Vec<u8> {
        self.opts.charset.encode(s)
    }

    /// Formatted bytes of `value` before any enclosure handling.
    ///
    /// Nulls without a substitute format to nothing, whatever the field length.
    #[must_use]
    pub fn format_field(&self, meta: &ValueMeta, value: &Value) -> Vec<u8> {
        if value.is_null() {
            return Vec::new();
        }
        if meta.is_string() {
            if let Value::Binary(raw) = value
                && meta.length < 0
                && meta.trim == crate::schema::TrimType::None
            {
                return raw.clone();
            }
            let text = meta.format_text(value);
            pad_or_truncate(meta.trim.apply(&text), meta.length, self.opts.charset)
        } else if let Value::Binary(raw) = value {
            raw.clone()
        } else {
            self.opts.charset.encode(&meta.format_text(value))
        }
    }

    /// Append the bytes of one data field to `out`.
    ///
    /// `null_bytes` replaces the value when it is null. Empty results write
    /// nothing, not even a forced enclosure.
    pub fn encode_value(
        &self,
        meta: &ValueMeta,
        value: &Value,
        null_bytes: Option<&[u8]>,
        out: &mut Vec<u8>,
    ) {
        if self.opts.fast_dump && !(null_bytes.is_some() && value.is_null()) {
            match value {
                Value::Binary(raw) => out.extend_from_slice(raw),
                other => self.opts.charset.encode_into(&other.to_string(), out),
            }
            return;
        }

        let formatted;
        let bytes: &[u8] = match null_bytes {
            Some(nb) if value.is_null() => nb,
            _ => {
                formatted = self.format_field(meta, value);
                &formatted
            }
        };
        if bytes.is_empty() {
            return;
        }
        if self.encloses_value(bytes) {
            self.write_enclosed(bytes, out);
        } else {
            out.extend_from_slice(bytes);
        }
    }

    /// Append one header (or footer) name to `out`.
    ///
    /// `meta` is the column the name belongs to, when it is known.
    pub fn encode_name(&self, name: &str, meta: Option<&ValueMeta>, out: &mut Vec<u8>) {
        let bytes = self.opts.charset.encode(name);
        let forced = self.opts.enclosure_forced
            && !self.opts.enclosure.is_empty()
            && meta.is_some_and(ValueMeta::is_string);
        if forced || self.detects(&bytes) {
            out.extend_from_slice(&self.opts.enclosure);
            out.extend_from_slice(&bytes);
            out.extend_from_slice(&self.opts.enclosure);
        } else {
            out.extend_from_slice(&bytes);
        }
    }

    /// Whether a data value with these bytes is written inside enclosures.
    #[must_use]
    pub fn encloses_value(&self, bytes: &[u8]) -> bool {
        (self.opts.enclosure_forced && !self.opts.pad_fields) || self.detects(bytes)
    }

    fn detects(&self, bytes: &[u8]) -> bool {
        self.opts.detect_enclosure
            && contains_separator_or_enclosure(bytes, &self.opts.separator, &self.opts.enclosure)
    }

    fn write_enclosed(&self, bytes: &[u8], out: &mut Vec<u8>) {
        let enclosure = &self.opts.enclosure;
        out.extend_from_slice(enclosure);
        write_doubled(bytes, enclosure, out);
        out.extend_from_slice(enclosure);
    }
}

/// Whether `source` contains `separator` or `enclosure` at any position.
///
/// Empty sequences never match.
#[must_use]
pub fn contains_separator_or_enclosure(source: &[u8], separator: &[u8], enclosure: &[u8]) -> bool {
    (0..source.len()).any(|i| {
        let rest = &source[i..];
        (!enclosure.is_empty() && rest.starts_with(enclosure))
            || (!separator.is_empty() && rest.starts_with(separator))
    })
}

/// Start offsets of the non-overlapping occurrences of `enclosure` in `source`.
#[must_use]
pub fn enclosure_positions(source: &[u8], enclosure: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    if enclosure.is_empty() || source.len() < enclosure.len() {
        return positions;
    }
    let mut i = 0;
    while i + enclosure.len() <= source.len() {
        if source[i..].starts_with(enclosure) {
            positions.push(i);
            i += enclosure.len();
        } else {
            i += 1;
        }
    }
    positions
}

/// Copy `source` to `out`, writing every enclosure occurrence twice.
pub fn write_doubled(source: &[u8], enclosure: &[u8], out: &mut Vec<u8>) {
    let mut from = 0;
    for pos in enclosure_positions(source, enclosure) {
        let end = pos + enclosure.len();
        out.extend_from_slice(&source[from..end]);
        out.extend_from_slice(enclosure);
        from = end;
    }
    out.extend_from_slice(&source[from..]);
}

/// Encode `s` to exactly `length` characters when `length > -1`.
///
/// Longer strings are cut on a character boundary. Shorter ones are filled
/// with the encoded space, repeated once per missing character so multi-byte
/// charsets stay aligned.
#[must_use]
pub fn pad_or_truncate(s: &str, length: i32, charset: Charset) -> Vec<u8> {
    let Ok(length) = usize::try_from(length) else {
        return charset.encode(s);
    };
    let chars = s.chars().count();
    if chars > length {
        let cut = s.char_indices().nth(length).map_or(s.len(), |(i, _)| i);
        return charset.encode(&s[..cut]);
    }
    let mut out = charset.encode(s);
    if chars < length {
        let filler = charset.encode(" ");
        out.reserve(filler.len() * (length - chars));
        for _ in chars..length {
            out.extend_from_slice(&filler);
        }
    }
    out
}
