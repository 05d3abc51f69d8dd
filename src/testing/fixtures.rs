//! Small typed datasets.

use crate::schema::{Row, RowMeta, Value, ValueType};

/// `id: Integer, name: String, score: Number, active: Boolean`.
#[must_use]
pub fn people_meta() -> RowMeta {
    RowMeta::default()
        .with("id", ValueType::Integer)
        .with("name", ValueType::String)
        .with("score", ValueType::Number)
        .with("active", ValueType::Boolean)
}

/// Rows matching [`people_meta`], including awkward text and a null.
#[must_use]
pub fn people_rows() -> Vec<Row> {
    vec![
        vec![Value::Integer(1), "Alice".into(), Value::Number(9.5), Value::Boolean(true)],
        vec![Value::Integer(2), "Bob; Jr.".into(), Value::Number(7.25), Value::Boolean(false)],
        vec![Value::Integer(3), "He said \"hi\"".into(), Value::Null, Value::Boolean(true)],
        vec![Value::Integer(4), Value::Null, Value::Number(0.5), Value::Boolean(false)],
    ]
}
