use crate::{args::InputFormat, error::CliError};
use serde_json::Value as JsonValue;
use spillmedian_core::value::{Value, ValueType};

///
/// Record
///
/// One parsed input row: its group key and its value, null as `None`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub group: Option<String>,
    pub value: Option<Value>,
}

///
/// RecordParser
///
/// Turns input lines into typed records for the declared value type.
///

#[derive(Clone, Debug)]
pub struct RecordParser {
    ty: ValueType,
    format: InputFormat,
    field: Option<String>,
    group_by: Option<String>,
}

impl RecordParser {
    pub fn new(
        ty: ValueType,
        format: InputFormat,
        field: Option<String>,
        group_by: Option<String>,
    ) -> Result<Self, CliError> {
        if format == InputFormat::Lines && (field.is_some() || group_by.is_some()) {
            return Err(CliError::Usage(
                "--field and --group-by need --format jsonl".to_string(),
            ));
        }

        Ok(Self {
            ty,
            format,
            field,
            group_by,
        })
    }

    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        self.group_by.is_some()
    }

    /// Parse one line. Blank jsonl lines carry no record.
    pub fn parse(&self, line_no: usize, line: &str) -> Result<Option<Record>, CliError> {
        match self.format {
            InputFormat::Lines => {
                let value =
                    parse_text(self.ty, line.trim()).map_err(|msg| CliError::input(line_no, msg))?;

                Ok(Some(Record { group: None, value }))
            }
            InputFormat::Jsonl => {
                if line.trim().is_empty() {
                    return Ok(None);
                }
                let doc: JsonValue = serde_json::from_str(line)
                    .map_err(|err| CliError::input(line_no, format!("invalid json: {err}")))?;

                self.parse_json(line_no, &doc).map(Some)
            }
        }
    }

    fn parse_json(&self, line_no: usize, doc: &JsonValue) -> Result<Record, CliError> {
        let group = self
            .group_by
            .as_deref()
            .and_then(|key| doc.get(key))
            .and_then(group_key);

        // a missing field is a null
        let value = match self.field.as_deref() {
            Some(key) => doc
                .get(key)
                .map_or(Ok(None), |raw| from_json(self.ty, raw)),
            None => from_json(self.ty, doc),
        }
        .map_err(|msg| CliError::input(line_no, msg))?;

        Ok(Record { group, value })
    }
}

// Strings key groups as-is; other scalars by their JSON text; null is no group.
fn group_key(json: &JsonValue) -> Option<String> {
    match json {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse a plain-text value.
pub fn parse_text(ty: ValueType, raw: &str) -> Result<Option<Value>, String> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw == "\\N" {
        return Ok(None);
    }

    let value = match ty {
        ValueType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Value::Bool(true),
            "false" | "f" | "0" => Value::Bool(false),
            _ => return Err(format!("'{raw}' is not a bool")),
        },
        ValueType::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|err| format!("'{raw}' is not an int: {err}"))?,
        ValueType::Uint => raw
            .parse::<u64>()
            .map(Value::Uint)
            .map_err(|err| format!("'{raw}' is not a uint: {err}"))?,
        ValueType::Float64 => {
            let n = raw
                .parse::<f64>()
                .map_err(|err| format!("'{raw}' is not a float: {err}"))?;
            finite(n)?
        }
        ValueType::Text => Value::Text(raw.to_string()),
        ValueType::Blob => Value::Blob(decode_hex(raw)?),
        ValueType::List => return Err("list values cannot be read from text".to_string()),
    };

    Ok(Some(value))
}

/// Convert a JSON value, requiring it to match the declared type.
pub fn from_json(ty: ValueType, json: &JsonValue) -> Result<Option<Value>, String> {
    if json.is_null() {
        return Ok(None);
    }

    let value = match (ty, json) {
        (ValueType::Bool, JsonValue::Bool(b)) => Value::Bool(*b),
        (ValueType::Int, JsonValue::Number(n)) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("{n} is not an int"))?,
        (ValueType::Uint, JsonValue::Number(n)) => n
            .as_u64()
            .map(Value::Uint)
            .ok_or_else(|| format!("{n} is not a uint"))?,
        (ValueType::Float64, JsonValue::Number(n)) => {
            let f = n.as_f64().ok_or_else(|| format!("{n} is not a float"))?;
            finite(f)?
        }
        (ValueType::Text, JsonValue::String(s)) => Value::Text(s.clone()),
        (ValueType::Blob, JsonValue::String(s)) => Value::Blob(decode_hex(s)?),
        (ValueType::List, JsonValue::Array(items)) => {
            Value::List(items.iter().map(list_item).collect::<Result<_, _>>()?)
        }
        (ty, other) => return Err(format!("{other} is not a {ty}")),
    };

    Ok(Some(value))
}

// Untyped conversion for list elements.
fn list_item(json: &JsonValue) -> Result<Value, String> {
    Ok(match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint(u)
            } else {
                finite(n.as_f64().unwrap_or(f64::NAN))?
            }
        }
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Array(items) => {
            Value::List(items.iter().map(list_item).collect::<Result<_, _>>()?)
        }
        JsonValue::Object(_) => return Err("objects cannot be list elements".to_string()),
    })
}

fn finite(n: f64) -> Result<Value, String> {
    Value::from_f64(n).ok_or_else(|| format!("{n} is not a finite float"))
}

/// Decode `\x`-prefixed or bare hex.
pub fn decode_hex(raw: &str) -> Result<Vec<u8>, String> {
    let digits = raw.strip_prefix("\\x").unwrap_or(raw);
    if digits.len() % 2 != 0 {
        return Err(format!("'{raw}' has an odd number of hex digits"));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("'{raw}' is not hex"))
        })
        .collect()
}

/// Render a median for JSON output.
#[must_use]
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::from(*i),
        Value::Uint(u) => JsonValue::from(*u),
        Value::Float64(f) => JsonValue::from(f.get()),
        Value::Text(_) | Value::Blob(_) => JsonValue::String(value.to_string()),
        Value::List(items) => JsonValue::Array(items.iter().map(to_json).collect()),
    }
}
