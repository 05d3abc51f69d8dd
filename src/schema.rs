//! Record layout and value formatting.
//!
//! A [`Row`] is an ordered list of [`Value`]s described by a [`RowMeta`]. The
//! sink configuration lists [`FieldSpec`]s, the output projection; each spec is
//! merged onto the matching incoming [`ValueMeta`] before the run starts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Default date rendering, `yyyy/MM/dd HH:mm:ss.SSS`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// Logical type of a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Binary,
}

/// Whitespace trimming applied to string values before padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimType {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl TrimType {
    #[must_use]
    pub fn apply(self, s: &str) -> &str {
        match self {
            Self::None => s,
            Self::Left => s.trim_start(),
            Self::Right => s.trim_end(),
            Self::Both => s.trim(),
        }
    }
}

/// A single typed value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(NaiveDateTime),
    Binary(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Natural string form, used by fast-dump output.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Binary(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One record.
pub type Row = Vec<Value>;

/// Description of one column: type plus the options that shape its text form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueMeta {
    pub name: String,
    pub value_type: ValueType,
    /// Date pattern (chrono syntax) or number mask; `,` in a number mask enables grouping.
    pub format: Option<String>,
    /// Fixed output length in characters, `-1` for unbounded.
    pub length: i32,
    /// Digits after the decimal separator, `-1` for natural precision.
    pub precision: i32,
    pub currency_symbol: Option<String>,
    pub decimal_symbol: Option<String>,
    pub grouping_symbol: Option<String>,
    pub trim: TrimType,
}

impl ValueMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            format: None,
            length: -1,
            precision: -1,
            currency_symbol: None,
            decimal_symbol: None,
            grouping_symbol: None,
            trim: TrimType::None,
        }
    }

    #[must_use]
    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        self.value_type == ValueType::String
    }

    /// Copy of this meta with the output options of `spec` applied.
    #[must_use]
    pub fn with_field_options(&self, spec: &FieldSpec) -> Self {
        Self {
            name: self.name.clone(),
            value_type: spec.value_type.unwrap_or(self.value_type),
            format: spec.format.clone().filter(|f| !f.is_empty()),
            length: spec.length,
            precision: spec.precision,
            currency_symbol: spec.currency_symbol.clone().filter(|s| !s.is_empty()),
            decimal_symbol: spec.decimal_symbol.clone().filter(|s| !s.is_empty()),
            grouping_symbol: spec.grouping_symbol.clone().filter(|s| !s.is_empty()),
            trim: spec.trim,
        }
    }

    /// Text form of `value` under this meta's format options.
    ///
    /// Nulls render as the empty string; binary values are decoded lossily.
    #[must_use]
    pub fn format_text(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Integer(i) => self.decorate_number(i.to_string()),
            Value::Number(n) => {
                let raw = if self.precision >= 0 {
                    format!("{:.*}", self.precision as usize, n)
                } else {
                    n.to_string()
                };
                self.decorate_number(raw)
            }
            Value::Boolean(b) => if *b { "Y" } else { "N" }.to_string(),
            Value::Date(d) => {
                let pattern = self.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
                let mut out = String::new();
                // chrono reports unusable patterns as a formatting error
                if write!(out, "{}", d.format(pattern)).is_err() {
                    out.clear();
                    let _ = write!(out, "{}", d.format(DEFAULT_DATE_FORMAT));
                }
                out
            }
            Value::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    fn decorate_number(&self, raw: String) -> String {
        let (sign, digits) = match raw.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", raw.as_str()),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (digits, None),
        };

        let mut out = String::with_capacity(raw.len() + 4);
        out.push_str(sign);
        if let Some(currency) = &self.currency_symbol {
            out.push_str(currency);
        }
        let grouping = self
            .grouping_symbol
            .as_deref()
            .filter(|_| self.format.as_deref().is_some_and(|f| f.contains(',')));
        match grouping {
            Some(sep) => out.push_str(&group_digits(int_part, sep)),
            None => out.push_str(int_part),
        }
        if let Some(frac) = frac_part {
            out.push_str(self.decimal_symbol.as_deref().unwrap_or("."));
            out.push_str(frac);
        }
        out
    }
}

fn group_digits(digits: &str, sep: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * sep.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(c);
    }
    out
}

/// Layout of incoming records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowMeta {
    values: Vec<ValueMeta>,
}

impl RowMeta {
    #[must_use]
    pub fn new(values: Vec<ValueMeta>) -> Self {
        Self { values }
    }

    /// Append a column.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.values.push(ValueMeta::new(name, value_type));
        self
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name == name)
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&ValueMeta> {
        self.values.get(idx)
    }

    #[must_use]
    pub fn values(&self) -> &[ValueMeta] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One output column as configured by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub name: String,
    /// Overrides the incoming type when set.
    pub value_type: Option<ValueType>,
    pub format: Option<String>,
    pub length: i32,
    pub precision: i32,
    pub currency_symbol: Option<String>,
    pub decimal_symbol: Option<String>,
    pub grouping_symbol: Option<String>,
    /// Written instead of the formatted value when the value is null.
    pub null_string: Option<String>,
    pub trim: TrimType,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            value_type: None,
            format: None,
            length: -1,
            precision: -1,
            currency_symbol: None,
            decimal_symbol: None,
            grouping_symbol: None,
            null_string: None,
            trim: TrimType::None,
        }
    }
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn null_string(mut self, s: impl Into<String>) -> Self {
        self.null_string = Some(s.into());
        self
    }

    #[must_use]
    pub fn trim(mut self, trim: TrimType) -> Self {
        self.trim = trim;
        self
    }

    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}
