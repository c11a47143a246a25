use crate::error::IngestError;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded sensor payload. Lives for a single loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub source: String,
    pub temperature_in: f64,
    pub temperature_out: f64,
    pub temperature_check: f64,
    pub humidity: f64,
    pub light: f64,
}

/// Result of decoding a line that was valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Qualified(Reading),
    /// `source` absent, empty, not a string, or without the prefix
    Skipped,
}

/// A row of the `greenhouse` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseRow {
    pub source: String,
    pub day: NaiveDate,
    pub time: DateTime<Utc>,
    pub temperature_in: f64,
    pub temperature_out: f64,
    pub temperature_check: f64,
    pub humidity: f64,
    pub light: f64,
}

impl GreenhouseRow {
    /// Stamp a reading with the wall clock: `day` is the local date, `time` the same instant in UTC.
    pub fn stamp(reading: Reading, now: DateTime<Local>) -> Self {
        Self {
            source: reading.source,
            day: now.date_naive(),
            time: now.with_timezone(&Utc),
            temperature_in: reading.temperature_in,
            temperature_out: reading.temperature_out,
            temperature_check: reading.temperature_check,
            humidity: reading.humidity,
            light: reading.light,
        }
    }
}

/// Decode one serial line and apply the source filter.
pub fn decode_line(line: &[u8], source_prefix: &str) -> Result<Decoded, IngestError> {
    let json: Value =
        serde_json::from_slice(line).map_err(|e| IngestError::Decode(e.to_string()))?;
    let obj = match json {
        Value::Object(obj) => obj,
        other => {
            return Err(IngestError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    let source = match obj.get("source").and_then(Value::as_str) {
        Some(s) if !s.is_empty() && s.starts_with(source_prefix) => s.to_string(),
        _ => return Ok(Decoded::Skipped),
    };

    Ok(Decoded::Qualified(Reading {
        temperature_in: number(&obj, "temperaturein")?,
        temperature_out: number(&obj, "temperatureout")?,
        temperature_check: number(&obj, "temperaturecheck")?,
        humidity: number(&obj, "humidity")?,
        light: number(&obj, "light")?,
        source,
    }))
}

fn number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, IngestError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(IngestError::Validation {
            field,
            reason: "is missing".into(),
        }),
        Some(v) => v.as_f64().ok_or_else(|| IngestError::Validation {
            field,
            reason: format!("is not numeric ({})", json_kind(v)),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const FULL: &[u8] = br#"{"source":"G1","temperaturein":21.5,"temperatureout":15.0,"temperaturecheck":21.0,"humidity":55,"light":300}"#;

    #[test]
    fn test_qualified_reading() {
        let decoded = decode_line(FULL, "G").unwrap();
        assert_eq!(
            decoded,
            Decoded::Qualified(Reading {
                source: "G1".into(),
                temperature_in: 21.5,
                temperature_out: 15.0,
                temperature_check: 21.0,
                humidity: 55.0,
                light: 300.0,
            })
        );
    }

    #[test]
    fn test_extra_keys_ignored() {
        let line = br#"{"source":"GH","temperaturein":1,"temperatureout":2,"temperaturecheck":3,"humidity":4,"light":5.5,"battery":3.3}"#;
        match decode_line(line, "G").unwrap() {
            Decoded::Qualified(r) => assert_eq!(r.light, 5.5),
            other => panic!("expected qualified, got {:?}", other),
        }
    }

    #[test]
    fn test_non_matching_prefix_skipped() {
        let decoded = decode_line(br#"{"source":"K1","temperaturein":21.5}"#, "G").unwrap();
        assert_eq!(decoded, Decoded::Skipped);
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        let decoded = decode_line(br#"{"source":"g1"}"#, "G").unwrap();
        assert_eq!(decoded, Decoded::Skipped);
    }

    #[test]
    fn test_absent_empty_or_non_string_source_skipped() {
        assert_eq!(decode_line(br#"{"temperaturein":1}"#, "G").unwrap(), Decoded::Skipped);
        assert_eq!(decode_line(br#"{"source":""}"#, "G").unwrap(), Decoded::Skipped);
        assert_eq!(decode_line(br#"{"source":7}"#, "G").unwrap(), Decoded::Skipped);
        assert_eq!(decode_line(br#"{"source":null}"#, "G").unwrap(), Decoded::Skipped);
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = decode_line(b"not json at all", "G").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_non_object_is_decode_error() {
        let err = decode_line(b"[1,2,3]", "G").unwrap_err();
        match err {
            IngestError::Decode(msg) => assert!(msg.contains("array"), "{msg}"),
            other => panic!("expected decode error, got {:?}", other),
        }
        assert!(matches!(
            decode_line(b"\"G1\"", "G"),
            Err(IngestError::Decode(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        assert!(matches!(
            decode_line(&[0xff, 0xfe, b'{'], "G"),
            Err(IngestError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_field_is_validation_error() {
        let line = br#"{"source":"G1","temperaturein":21.5,"temperatureout":15.0,"temperaturecheck":21.0,"light":300}"#;
        match decode_line(line, "G").unwrap_err() {
            IngestError::Validation { field, .. } => assert_eq!(field, "humidity"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_field_is_validation_error() {
        let line = br#"{"source":"G1","temperaturein":"warm","temperatureout":15.0,"temperaturecheck":21.0,"humidity":55,"light":300}"#;
        let err = decode_line(line, "G").unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("temperaturein"));
    }

    #[test]
    fn test_custom_prefix() {
        assert!(matches!(
            decode_line(FULL, "G1").unwrap(),
            Decoded::Qualified(_)
        ));
        assert_eq!(decode_line(FULL, "G2").unwrap(), Decoded::Skipped);
    }

    #[test]
    fn test_stamp_uses_clock() {
        let reading = match decode_line(FULL, "G").unwrap() {
            Decoded::Qualified(r) => r,
            Decoded::Skipped => panic!("expected qualified"),
        };
        let now = Local.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap();
        let row = GreenhouseRow::stamp(reading, now);
        assert_eq!(row.source, "G1");
        assert_eq!(row.day, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(row.time, now.with_timezone(&Utc));
        assert_eq!(row.light, 300.0);
    }
}
