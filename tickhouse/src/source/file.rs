use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::fs;
use tokio::sync::Notify;

use crate::bail;
use crate::error::{ErrorKind, TickError, TickResult};
use crate::source::base::{Cursor, CursorPoll, ReplicationSpec, Source};
use crate::types::{
    Decimal64, FieldKind, FloatKind, ObjectValue, Record, RecordType, TickValue,
};

/// A file-backed source: a JSON schema file describing the record types and
/// an NDJSON record file with one record per line.
///
/// Record lines look like
/// `{"type":"md.Trade","timestamp":1700000000000000000,"instrument":"AAPL","values":{"price":"12.5"}}`.
/// Values are keyed by field name; absent fields read as null.
#[derive(Debug, Clone)]
pub struct FileSource {
    schema_path: PathBuf,
    records_path: PathBuf,
}

impl FileSource {
    pub fn new(schema_path: impl Into<PathBuf>, records_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            records_path: records_path.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordLine {
    #[serde(rename = "type")]
    type_name: String,
    timestamp: i64,
    instrument: String,
    #[serde(default)]
    values: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ObjectLine {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    values: serde_json::Map<String, JsonValue>,
}

pub struct FileCursor {
    record_types: Vec<RecordType>,
    lines: VecDeque<String>,
    resume_timestamp: Option<i64>,
    notify: Arc<Notify>,
}

impl Cursor for FileCursor {
    fn try_next(&mut self) -> TickResult<CursorPoll> {
        while let Some(line) = self.lines.pop_front() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: RecordLine = serde_json::from_str(&line)?;
            if let Some(resume) = self.resume_timestamp {
                if parsed.timestamp < resume {
                    continue;
                }
            }
            return Ok(CursorPoll::Record(decode_record(&self.record_types, parsed)?));
        }
        Ok(CursorPoll::Exhausted)
    }

    fn data_available(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

impl Source for FileSource {
    type Cursor = FileCursor;

    async fn record_types(&self, _spec: &ReplicationSpec) -> TickResult<Vec<RecordType>> {
        let schema = fs::read_to_string(&self.schema_path).await?;
        let record_types: Vec<RecordType> = serde_json::from_str(&schema)?;
        Ok(record_types)
    }

    async fn open_cursor(
        &self,
        spec: &ReplicationSpec,
        resume_timestamp: Option<i64>,
    ) -> TickResult<Self::Cursor> {
        let record_types = self.record_types(spec).await?;
        let contents = fs::read_to_string(&self.records_path).await?;
        Ok(FileCursor {
            record_types,
            lines: contents.lines().map(str::to_string).collect(),
            resume_timestamp,
            notify: Arc::new(Notify::new()),
        })
    }
}

fn decode_record(record_types: &[RecordType], line: RecordLine) -> TickResult<Record> {
    let Some(type_index) = record_types.iter().position(|t| t.name == line.type_name) else {
        bail!(
            ErrorKind::MissingRecordType,
            "Unknown record type",
            format!("record type `{}` is not in the schema file", line.type_name)
        );
    };
    let record_type = &record_types[type_index];
    let mut values = Vec::with_capacity(record_type.fields.len());
    for field in &record_type.fields {
        let value = line.values.get(&field.name);
        values.push(decode_value(value, &field.kind, &field.name)?);
    }
    Ok(Record::new(
        type_index,
        line.timestamp,
        line.instrument,
        values,
    ))
}

fn decode_value(
    value: Option<&JsonValue>,
    kind: &FieldKind,
    field: &str,
) -> TickResult<TickValue> {
    let value = match value {
        None | Some(JsonValue::Null) => return Ok(TickValue::Null),
        Some(value) => value,
    };
    let decoded = match kind {
        FieldKind::Int { width } => {
            let v = as_i64(value, field)?;
            match width {
                1 => TickValue::Int8(narrow(v, field)?),
                2 => TickValue::Int16(narrow(v, field)?),
                4 => TickValue::Int32(narrow(v, field)?),
                _ => TickValue::Int64(v),
            }
        }
        FieldKind::Float(FloatKind::Fixed32) => TickValue::F32(as_f64(value, field)? as f32),
        FieldKind::Float(FloatKind::Fixed64) | FieldKind::Float(FloatKind::Auto) => {
            TickValue::F64(as_f64(value, field)?)
        }
        FieldKind::Float(FloatKind::Decimal64) => {
            let text = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            TickValue::Decimal64(Decimal64::parse(&text)?)
        }
        FieldKind::Bool => match value {
            JsonValue::Bool(b) => TickValue::Bool(*b),
            other => return mismatch(field, "a boolean", other),
        },
        FieldKind::Char => {
            let s = as_str(value, field)?;
            match s.chars().next() {
                Some(c) if s.chars().count() == 1 => TickValue::Char(c),
                _ => return mismatch(field, "a single character", value),
            }
        }
        FieldKind::Varchar => TickValue::Varchar(as_str(value, field)?.to_string()),
        FieldKind::Binary => match value {
            JsonValue::Array(items) => {
                let mut bytes = Vec::with_capacity(items.len());
                for item in items {
                    let byte = item
                        .as_u64()
                        .filter(|b| *b <= u8::MAX as u64)
                        .ok_or_else(|| invalid(field, "a byte array", item))?;
                    bytes.push(byte as u8);
                }
                TickValue::Binary(bytes)
            }
            other => return mismatch(field, "a byte array", other),
        },
        FieldKind::Enum(_) => TickValue::Enum(as_str(value, field)?.to_string()),
        FieldKind::Timestamp => TickValue::Timestamp(as_i64(value, field)?),
        FieldKind::TimeOfDay => TickValue::TimeOfDay(narrow(as_i64(value, field)?, field)?),
        FieldKind::Array(element) => match value {
            JsonValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(decode_value(Some(item), &element.kind, field)?);
                }
                TickValue::Array(out)
            }
            other => return mismatch(field, "an array", other),
        },
        FieldKind::Object(candidates) => {
            let line: ObjectLine = serde_json::from_value(value.clone())?;
            let Some(candidate) = candidates.iter().find(|t| t.name == line.type_name) else {
                bail!(
                    ErrorKind::MissingRecordType,
                    "Unknown record type",
                    format!(
                        "object field `{field}` carries unknown type `{}`",
                        line.type_name
                    )
                );
            };
            let mut fields = Vec::new();
            for child in &candidate.fields {
                if let Some(member) = line.values.get(&child.name) {
                    fields.push((
                        child.name.clone(),
                        decode_value(Some(member), &child.kind, &child.name)?,
                    ));
                }
            }
            TickValue::Object(ObjectValue::new(line.type_name, fields))
        }
    };
    Ok(decoded)
}

fn as_i64(value: &JsonValue, field: &str) -> TickResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| invalid(field, "an integer", value))
}

fn as_f64(value: &JsonValue, field: &str) -> TickResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| invalid(field, "a number", value))
}

fn as_str<'a>(value: &'a JsonValue, field: &str) -> TickResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| invalid(field, "a string", value))
}

fn narrow<T: TryFrom<i64>>(value: i64, field: &str) -> TickResult<T> {
    T::try_from(value).map_err(|_| {
        TickError::from((
            ErrorKind::InvalidData,
            "Value out of range for its field",
            format!("field `{field}` cannot hold {value}"),
        ))
    })
}

fn invalid(field: &str, expected: &str, value: &JsonValue) -> TickError {
    TickError::from((
        ErrorKind::InvalidData,
        "Value does not match its field kind",
        format!("field `{field}` expects {expected}, got `{value}`"),
    ))
}

fn mismatch(field: &str, expected: &str, value: &JsonValue) -> TickResult<TickValue> {
    Err(invalid(field, expected, value))
}
