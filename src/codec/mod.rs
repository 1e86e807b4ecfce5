//! Type Codec Module
//!
//! Maps raw stored strings to and from typed values by declared type tag,
//! and infers the tag for an arbitrary input value.


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{Result, SettingsError};

// == Type Tag ==
/// Declared type of a stored setting; decides how its raw value is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Boolean,
    Integer,
    Float,
    Array,
    Json,
    Object,
}

/// Encode/decode pair for one type tag.
struct Codec {
    encode: fn(&Value) -> String,
    decode: fn(&str) -> Result<Value>,
}

impl TypeTag {
    pub const ALL: [TypeTag; 7] = [
        TypeTag::String,
        TypeTag::Boolean,
        TypeTag::Integer,
        TypeTag::Float,
        TypeTag::Array,
        TypeTag::Json,
        TypeTag::Object,
    ];

    /// Storage name of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Array => "array",
            TypeTag::Json => "json",
            TypeTag::Object => "object",
        }
    }

    // == Infer ==
    /// Infers the tag for an input value.
    ///
    /// Strings are tagged `json` only when they parse as JSON after trimming;
    /// blank strings and lone delimiters stay `string`. `null` is tagged `string`.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => TypeTag::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => TypeTag::Integer,
            Value::Number(_) => TypeTag::Float,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
            Value::String(s) if is_json_string(s) => TypeTag::Json,
            Value::String(_) | Value::Null => TypeTag::String,
        }
    }

    fn codec(self) -> Codec {
        match self {
            TypeTag::String => Codec {
                encode: encode_scalar,
                decode: decode_string,
            },
            TypeTag::Boolean => Codec {
                encode: encode_boolean,
                decode: decode_boolean,
            },
            TypeTag::Integer => Codec {
                encode: encode_scalar,
                decode: decode_integer,
            },
            TypeTag::Float => Codec {
                encode: encode_scalar,
                decode: decode_float,
            },
            TypeTag::Array | TypeTag::Json | TypeTag::Object => Codec {
                encode: encode_json,
                decode: decode_json,
            },
        }
    }

    // == Encode ==
    /// Serializes a value to its raw stored form. `null` always yields `None`.
    pub fn encode(self, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        Some((self.codec().encode)(value))
    }

    // == Decode ==
    /// Parses a raw stored value back to a typed value. `None` always yields `null`.
    pub fn decode(self, raw: Option<&str>) -> Result<Value> {
        match raw {
            None => Ok(Value::Null),
            Some(raw) => (self.codec().decode)(raw),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| SettingsError::Codec(format!("unknown setting type '{}'", s)))
    }
}

// == Inference Helpers ==
fn is_json_string(s: &str) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty() && serde_json::from_str::<Value>(trimmed).is_ok()
}

/// Truthiness of an arbitrary value when stored under the boolean tag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => parse_bool(s),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Permissive boolean parse; anything not recognised as truthy is false.
fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

// == Codec Functions ==
fn encode_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => bool_flag(*b),
        other => other.to_string(),
    }
}

fn encode_boolean(value: &Value) -> String {
    bool_flag(is_truthy(value))
}

fn bool_flag(flag: bool) -> String {
    let raw = if flag { "1" } else { "0" };
    raw.to_string()
}

fn encode_json(value: &Value) -> String {
    value.to_string()
}

fn decode_string(raw: &str) -> Result<Value> {
    Ok(Value::String(raw.to_string()))
}

fn decode_boolean(raw: &str) -> Result<Value> {
    Ok(Value::Bool(parse_bool(raw)))
}

fn decode_integer(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::from(n));
    }
    trimmed
        .parse::<u64>()
        .map(Value::from)
        .map_err(|_| SettingsError::Codec(format!("'{}' is not an integer", raw)))
}

fn decode_float(raw: &str) -> Result<Value> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| SettingsError::Codec(format!("'{}' is not a finite float", raw)))
}

fn decode_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| SettingsError::Codec(format!("invalid JSON: {}", e)))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_scalars() {
        assert_eq!(TypeTag::infer(&json!(true)), TypeTag::Boolean);
        assert_eq!(TypeTag::infer(&json!(42)), TypeTag::Integer);
        assert_eq!(TypeTag::infer(&json!(-7)), TypeTag::Integer);
        assert_eq!(TypeTag::infer(&json!(1.5)), TypeTag::Float);
        assert_eq!(TypeTag::infer(&Value::Null), TypeTag::String);
    }

    #[test]
    fn test_infer_collections() {
        assert_eq!(TypeTag::infer(&json!(["a", "b"])), TypeTag::Array);
        assert_eq!(TypeTag::infer(&json!({"a": 1})), TypeTag::Object);
    }

    #[test]
    fn test_infer_json_strings() {
        assert_eq!(TypeTag::infer(&json!(r#"{"a":1}"#)), TypeTag::Json);
        assert_eq!(TypeTag::infer(&json!("  [1, 2]  ")), TypeTag::Json);
        assert_eq!(TypeTag::infer(&json!("not json")), TypeTag::String);
    }

    #[test]
    fn test_infer_blank_and_delimiters_are_strings() {
        assert_eq!(TypeTag::infer(&json!("")), TypeTag::String);
        assert_eq!(TypeTag::infer(&json!("   ")), TypeTag::String);
        assert_eq!(TypeTag::infer(&json!("{")), TypeTag::String);
        assert_eq!(TypeTag::infer(&json!("[")), TypeTag::String);
    }

    #[test]
    fn test_encode_boolean() {
        assert_eq!(TypeTag::Boolean.encode(&json!(true)), Some("1".to_string()));
        assert_eq!(TypeTag::Boolean.encode(&json!(false)), Some("0".to_string()));
    }

    #[test]
    fn test_encode_null_bypasses_type() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.encode(&Value::Null), None);
            assert_eq!(tag.decode(None).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_encode_collections_as_json() {
        assert_eq!(
            TypeTag::Array.encode(&json!(["a", "b"])),
            Some(r#"["a","b"]"#.to_string())
        );
        assert_eq!(
            TypeTag::Object.encode(&json!({"a": 1})),
            Some(r#"{"a":1}"#.to_string())
        );
    }

    #[test]
    fn test_decode_permissive_boolean() {
        for raw in ["1", "true", "TRUE", "on", "yes", " Yes "] {
            assert_eq!(TypeTag::Boolean.decode(Some(raw)).unwrap(), json!(true), "{raw}");
        }
        for raw in ["0", "false", "off", "no", "", "garbage"] {
            assert_eq!(TypeTag::Boolean.decode(Some(raw)).unwrap(), json!(false), "{raw}");
        }
    }

    #[test]
    fn test_decode_numbers() {
        assert_eq!(TypeTag::Integer.decode(Some("42")).unwrap(), json!(42));
        assert_eq!(TypeTag::Float.decode(Some("2.5")).unwrap(), json!(2.5));
        assert!(matches!(
            TypeTag::Integer.decode(Some("abc")),
            Err(SettingsError::Codec(_))
        ));
        assert!(matches!(
            TypeTag::Float.decode(Some("NaN")),
            Err(SettingsError::Codec(_))
        ));
    }

    #[test]
    fn test_json_string_round_trip_keeps_string() {
        let value = json!(r#"{"a":1}"#);
        let raw = TypeTag::Json.encode(&value);
        assert_eq!(TypeTag::Json.decode(raw.as_deref()).unwrap(), value);
    }

    #[test]
    fn test_tag_from_str() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.as_str().parse::<TypeTag>().unwrap(), tag);
        }
        assert!("decimal".parse::<TypeTag>().is_err());
    }
}
