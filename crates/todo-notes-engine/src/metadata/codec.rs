//! YAML encoding of metadata records.
//!
//! Inline payloads live in the title of a `[metadata]: # (...)` definition;
//! note files carry the same mapping as front matter between `---` lines.

use serde_yaml::{Mapping, Value};

use super::{MetadataError, MetadataRecord, MetadataValue};

pub const FRONT_MATTER_MARKER: &str = "---";

/// Decodes one payload found on the 0-indexed `line`.
///
/// Null values are dropped, keys outside `keys` are ignored. Anything that is not
/// a flat mapping of scalars or scalar lists is malformed.
pub fn decode_payload(
    payload: &str,
    line: usize,
    keys: &[String],
) -> Result<MetadataRecord, MetadataError> {
    let malformed = |reason: String| MetadataError::Malformed { line, reason };

    if payload.trim().is_empty() {
        return Ok(MetadataRecord::new());
    }

    let value: Value = serde_yaml::from_str(payload).map_err(|e| malformed(e.to_string()))?;
    let mapping = match value {
        Value::Null => return Ok(MetadataRecord::new()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(malformed(format!(
                "expected a key/value mapping, found {}",
                describe(&other)
            )));
        }
    };

    let mut record = MetadataRecord::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(malformed(format!("non-string key {}", describe(&key))));
        };
        if !keys.iter().any(|known| known == key) {
            log::debug!("ignoring unknown metadata key '{key}' on line {}", line + 1);
            continue;
        }
        match decode_value(value) {
            Ok(Some(value)) => record.insert(key, value),
            Ok(None) => {}
            Err(reason) => return Err(malformed(format!("{key}: {reason}"))),
        }
    }
    Ok(record)
}

fn decode_value(value: Value) -> Result<Option<MetadataValue>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Sequence(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(|item| scalar_text(&item).ok_or_else(|| format!("list holds {}", describe(&item))))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Some(MetadataValue::List(items))),
        other => scalar_text(&other)
            .map(|text| Some(MetadataValue::Text(text)))
            .ok_or_else(|| format!("unsupported value {}", describe(&other))),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a nested mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn to_mapping(record: &MetadataRecord) -> Mapping {
    record
        .iter()
        .map(|(key, value)| {
            let value = match value {
                MetadataValue::Text(text) => Value::String(text.clone()),
                MetadataValue::List(items) => {
                    Value::Sequence(items.iter().cloned().map(Value::String).collect())
                }
            };
            (Value::String(key.to_string()), value)
        })
        .collect()
}

/// Encodes a record as a block YAML mapping, one key per line, `\n` terminated.
pub fn encode_payload(record: &MetadataRecord) -> Result<String, MetadataError> {
    if record.is_empty() {
        return Ok(String::new());
    }
    serde_yaml::to_string(&to_mapping(record)).map_err(|e| MetadataError::Encode {
        reason: e.to_string(),
    })
}

/// `---`, the YAML mapping, `---`, each line ended by `eol`. Empty records encode to nothing.
pub fn encode_front_matter(record: &MetadataRecord, eol: &str) -> Result<String, MetadataError> {
    if record.is_empty() {
        return Ok(String::new());
    }
    let yaml = encode_payload(record)?;
    let mut out = String::with_capacity(yaml.len() + 8);
    out.push_str(FRONT_MATTER_MARKER);
    out.push_str(eol);
    for line in yaml.lines() {
        out.push_str(line);
        out.push_str(eol);
    }
    out.push_str(FRONT_MATTER_MARKER);
    out.push_str(eol);
    Ok(out)
}

/// Splits a leading front matter block from `text`.
///
/// Text without an opening marker line, or without a closing one, has no front matter.
pub fn split_front_matter<'a>(
    text: &'a str,
    keys: &[String],
) -> Result<(Option<MetadataRecord>, &'a str), MetadataError> {
    let mut pieces = text.split_inclusive('\n');
    let Some(first) = pieces.next() else {
        return Ok((None, text));
    };
    if first.trim_end() != FRONT_MATTER_MARKER {
        return Ok((None, text));
    }

    let mut offset = first.len();
    for piece in pieces {
        if piece.trim_end() == FRONT_MATTER_MARKER {
            let record = decode_payload(&text[first.len()..offset], 0, keys)?;
            return Ok((Some(record), &text[offset + piece.len()..]));
        }
        offset += piece.len();
    }
    Ok((None, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{DEFAULT_METADATA_KEYS, default_keys, keys};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn record(entries: &[(&str, MetadataValue)]) -> MetadataRecord {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn text(value: &str) -> MetadataValue {
        MetadataValue::Text(value.to_string())
    }

    fn list(values: &[&str]) -> MetadataValue {
        MetadataValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_decode_flow_mapping() {
        let decoded =
            decode_payload("{Tags: [work, home], Title: Report}", 0, &default_keys()).unwrap();
        assert_eq!(
            decoded,
            record(&[
                (keys::TAGS, list(&["work", "home"])),
                (keys::TITLE, text("Report")),
            ])
        );
    }

    #[rstest]
    #[case("Tags: [work]", keys::TAGS, list(&["work"]))]
    #[case("Title: Quarterly report", keys::TITLE, text("Quarterly report"))]
    #[case("CreatedDate: \"2024-05-01\"", keys::CREATED_DATE, text("2024-05-01"))]
    #[case("FileName: 42", keys::FILE_NAME, text("42"))]
    #[case("AppendMode: true", keys::APPEND_MODE, text("true"))]
    #[case("Tags: []", keys::TAGS, list(&[]))]
    fn test_decode_single_entry(
        #[case] payload: &str,
        #[case] key: &str,
        #[case] expected: MetadataValue,
    ) {
        let decoded = decode_payload(payload, 3, &default_keys()).unwrap();
        assert_eq!(decoded.get(key), Some(&expected));
        assert_eq!(decoded.len(), 1);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("~")]
    #[case("Title:")]
    #[case("Unknown: value")]
    fn test_decode_yields_nothing(#[case] payload: &str) {
        assert!(decode_payload(payload, 0, &default_keys()).unwrap().is_empty());
    }

    #[rstest]
    #[case("just text")]
    #[case("[a, b]")]
    #[case("Title: {nested: map}")]
    #[case("Tags: [[nested]]")]
    #[case("Title: [unclosed")]
    fn test_decode_malformed(#[case] payload: &str) {
        let error = decode_payload(payload, 4, &default_keys()).unwrap_err();
        assert!(matches!(error, MetadataError::Malformed { line: 4, .. }));
        assert!(error.to_string().contains("line 5"));
    }

    #[test]
    fn test_custom_key_set() {
        let keys = vec!["Project".to_string()];
        let decoded = decode_payload("{Project: alpha, Title: ignored}", 0, &keys).unwrap();
        assert_eq!(decoded, record(&[("Project", text("alpha"))]));
    }

    #[test]
    fn test_encode_decode_roundtrip_for_every_key() {
        let original = record(&[
            (keys::TAGS, list(&["work", "q3 planning"])),
            (keys::FOLDER_PATH, text("archive/2024")),
            (keys::TITLE, text("Ship: the report")),
            (keys::FILE_NAME, text("report.md")),
            (keys::APPEND_MODE, text("increment")),
            (keys::CREATED_DATE, text("2024-05-01")),
            (keys::COMPLETED_DATE, text("123")),
        ]);
        assert_eq!(original.len(), DEFAULT_METADATA_KEYS.len());

        let encoded = encode_payload(&original).unwrap();
        assert_eq!(decode_payload(&encoded, 0, &default_keys()).unwrap(), original);
    }

    #[test]
    fn test_front_matter_layout() {
        let original = record(&[(keys::TAGS, list(&["work"])), (keys::TITLE, text("Report"))]);
        let encoded = encode_front_matter(&original, "\r\n").unwrap();
        assert_eq!(encoded, "---\r\nTags:\r\n- work\r\nTitle: Report\r\n---\r\n");
    }

    #[test]
    fn test_front_matter_roundtrip() {
        let original = record(&[(keys::TITLE, text("Report"))]);
        let note = format!("{}# Report\n", encode_front_matter(&original, "\n").unwrap());
        let (front, body) = split_front_matter(&note, &default_keys()).unwrap();
        assert_eq!(front, Some(original));
        assert_eq!(body, "# Report\n");
    }

    #[test]
    fn test_empty_record_has_no_front_matter() {
        assert_eq!(encode_front_matter(&MetadataRecord::new(), "\n").unwrap(), "");
    }

    #[rstest]
    #[case("# Title\n---\n")]
    #[case("---\nTitle: never closed\n")]
    #[case("")]
    fn test_split_without_front_matter(#[case] note: &str) {
        let (front, body) = split_front_matter(note, &default_keys()).unwrap();
        assert_eq!(front, None);
        assert_eq!(body, note);
    }
}
