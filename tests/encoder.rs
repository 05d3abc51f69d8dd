use anyhow::Result;
use ironsink::encoder::{EncoderOptions, RowEncoder};
use ironsink::{Charset, FieldSpec, TrimType, Value, ValueMeta, ValueType};

fn encoder(detect: bool) -> RowEncoder {
    RowEncoder::new(EncoderOptions {
        separator: b";".to_vec(),
        enclosure: b"\"".to_vec(),
        detect_enclosure: detect,
        ..EncoderOptions::default()
    })
}

fn field(enc: &RowEncoder, meta: &ValueMeta, value: Value) -> Vec<u8> {
    let mut out = Vec::new();
    enc.encode_value(meta, &value, None, &mut out);
    out
}

fn name_meta() -> ValueMeta {
    ValueMeta::new("NAME", ValueType::String)
}

#[test]
fn separator_inside_value_is_enclosed_when_detecting() {
    let enc = encoder(true);
    assert_eq!(field(&enc, &name_meta(), "a;b".into()), b"\"a;b\"");
    assert_eq!(field(&enc, &name_meta(), "ab".into()), b"ab");
}

#[test]
fn inner_enclosures_are_doubled() {
    let enc = encoder(true);
    assert_eq!(
        field(&enc, &name_meta(), "He said \"hi\"".into()),
        b"\"He said \"\"hi\"\"\""
    );
}

#[test]
fn detection_is_off_unless_enabled() {
    let enc = encoder(false);
    assert_eq!(field(&enc, &name_meta(), "a;b".into()), b"a;b");
}

#[test]
fn forced_enclosure_is_suppressed_by_padding() {
    let forced = RowEncoder::new(EncoderOptions {
        separator: b";".to_vec(),
        enclosure: b"\"".to_vec(),
        enclosure_forced: true,
        ..EncoderOptions::default()
    });
    let meta = name_meta().with_length(4);
    assert_eq!(field(&forced, &meta, "ab".into()), b"\"ab  \"");

    let padded = RowEncoder::new(EncoderOptions {
        pad_fields: true,
        ..forced.options().clone()
    });
    assert_eq!(field(&padded, &meta, "ab".into()), b"ab  ");
}

#[test]
fn empty_values_write_nothing_even_when_forced() {
    let forced = RowEncoder::new(EncoderOptions {
        enclosure: b"\"".to_vec(),
        enclosure_forced: true,
        ..EncoderOptions::default()
    });
    assert!(field(&forced, &name_meta(), Value::Null).is_empty());
    assert!(field(&forced, &name_meta(), "".into()).is_empty());
}

#[test]
fn trim_runs_before_padding_and_truncation() {
    let enc = encoder(false);
    let meta = name_meta().with_field_options(&FieldSpec::new("NAME").length(5).trim(TrimType::Both));
    assert_eq!(field(&enc, &meta, "  ab  ".into()), b"ab   ");
    assert_eq!(field(&enc, &meta, "  abcdefg".into()), b"abcde");
}

#[test]
fn utf16_padding_counts_characters_not_bytes() {
    let enc = RowEncoder::new(EncoderOptions {
        charset: Charset::Utf16Le,
        ..EncoderOptions::default()
    });
    let meta = name_meta().with_length(3);
    assert_eq!(field(&enc, &meta, "é".into()), vec![0xE9, 0, b' ', 0, b' ', 0]);
}

#[test]
fn null_substitution_replaces_only_nulls() {
    let enc = encoder(true);
    let meta = name_meta();
    let mut out = Vec::new();
    enc.encode_value(&meta, &Value::Null, Some(b"N/A"), &mut out);
    assert_eq!(out, b"N/A");

    out.clear();
    enc.encode_value(&meta, &"x".into(), Some(b"N/A"), &mut out);
    assert_eq!(out, b"x");

    // substituted bytes still go through enclosure detection
    out.clear();
    enc.encode_value(&meta, &Value::Null, Some(b"a;b"), &mut out);
    assert_eq!(out, b"\"a;b\"");
}

#[test]
fn unsubstituted_nulls_are_not_padded() {
    let enc = encoder(true);
    let meta = name_meta().with_field_options(&FieldSpec::new("NAME").length(5));
    assert_eq!(field(&enc, &meta, Value::Null), b"");
    assert_eq!(field(&enc, &meta, "ab".into()), b"ab   ");

    let forced = RowEncoder::new(EncoderOptions {
        enclosure_forced: true,
        ..encoder(false).options().clone()
    });
    assert_eq!(field(&forced, &meta, Value::Null), b"");
}

#[test]
fn fast_dump_skips_formatting_and_escaping() {
    let enc = RowEncoder::new(EncoderOptions {
        fast_dump: true,
        ..encoder(true).options().clone()
    });
    let meta = name_meta().with_length(8);
    assert_eq!(field(&enc, &meta, "a;\"b".into()), b"a;\"b");
    assert_eq!(field(&enc, &ValueMeta::new("B", ValueType::Boolean), true.into()), b"true");
    assert_eq!(field(&enc, &meta, Value::Binary(vec![0xFF, 0x00])), vec![0xFF, 0x00]);
}

#[test]
fn non_string_values_use_their_formatted_text() {
    let enc = encoder(false);
    assert_eq!(field(&enc, &ValueMeta::new("ID", ValueType::Integer), 42i64.into()), b"42");
    assert_eq!(field(&enc, &ValueMeta::new("OK", ValueType::Boolean), false.into()), b"N");
    let price = ValueMeta::new("P", ValueType::Number)
        .with_field_options(&FieldSpec::new("P").precision(2));
    assert_eq!(field(&enc, &price, 3.14159.into()), b"3.14");
}

#[test]
fn header_names_follow_their_own_enclosure_rule() {
    let enc = RowEncoder::new(EncoderOptions {
        separator: b";".to_vec(),
        enclosure: b"\"".to_vec(),
        enclosure_forced: true,
        pad_fields: true,
        ..EncoderOptions::default()
    });
    let mut out = Vec::new();
    enc.encode_name("NAME", Some(&name_meta()), &mut out);
    assert_eq!(out, b"\"NAME\"");

    out.clear();
    enc.encode_name("ID", Some(&ValueMeta::new("ID", ValueType::Integer)), &mut out);
    assert_eq!(out, b"ID");
}

#[test]
fn doubling_doubles_every_occurrence() {
    let mut out = Vec::new();
    ironsink::encoder::write_doubled(b"''x''", b"'", &mut out);
    assert_eq!(out, b"''''x''''");
    assert_eq!(out.iter().filter(|b| **b == b'\'').count(), 8);
}

#[test]
fn encoded_rows_parse_back_with_a_csv_reader() -> Result<()> {
    let enc = RowEncoder::new(EncoderOptions {
        separator: b",".to_vec(),
        enclosure: b"\"".to_vec(),
        detect_enclosure: true,
        ..EncoderOptions::default()
    });
    let meta = name_meta();
    let values = ["plain", "comma, inside", "quote \" inside", "both \",\" here"];

    let mut data = Vec::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            data.push(b',');
        }
        enc.encode_value(&meta, &(*v).into(), None, &mut data);
    }
    data.push(b'\n');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(data.as_slice());
    let record = reader.records().next().expect("one record")?;
    let parsed: Vec<&str> = record.iter().collect();
    assert_eq!(parsed, values);
    Ok(())
}
