use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a record type within one replication run.
///
/// Assigned by the source when the stream (or query result) schema is resolved
/// and stable for the lifetime of a run. Used as the codec cache key.
pub type TypeIndex = usize;

/// Encoding of a source floating-point field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatKind {
    /// 32-bit binary float.
    Fixed32,
    /// 64-bit binary float.
    Fixed64,
    /// 64-bit decimal float with sentinel infinities.
    Decimal64,
    /// Unconstrained scale, stored as a 64-bit binary float.
    Auto,
}

/// An enumeration type of the source schema: a short type name plus the
/// name → ordinal constant map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<(String, i16)>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: Vec<(String, i16)>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// The type name without any namespace qualification.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }
}

/// Element type of a source array field.
///
/// Element nullability is carried separately from the field's own nullability:
/// an array field is structurally non-nullable (absence is an empty array) but
/// its elements may still be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayElement {
    pub kind: FieldKind,
    pub nullable: bool,
}

impl ArrayElement {
    pub fn new(kind: FieldKind, nullable: bool) -> Self {
        Self { kind, nullable }
    }
}

/// Semantic kind of a source field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Signed integer with a declared byte width of 1, 2, 4 or 8.
    Int { width: u8 },
    Float(FloatKind),
    Bool,
    Char,
    Varchar,
    Binary,
    Enum(EnumType),
    /// Point in time, nanosecond precision.
    Timestamp,
    /// Milliseconds since midnight.
    TimeOfDay,
    Array(Box<ArrayElement>),
    /// Nested object; the value's concrete type is one of the listed types.
    Object(Vec<RecordType>),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Int { width } => write!(f, "integer[{width}]"),
            FieldKind::Float(FloatKind::Fixed32) => write!(f, "float[fixed32]"),
            FieldKind::Float(FloatKind::Fixed64) => write!(f, "float[fixed64]"),
            FieldKind::Float(FloatKind::Decimal64) => write!(f, "float[decimal64]"),
            FieldKind::Float(FloatKind::Auto) => write!(f, "float[auto]"),
            FieldKind::Bool => write!(f, "boolean"),
            FieldKind::Char => write!(f, "char"),
            FieldKind::Varchar => write!(f, "varchar"),
            FieldKind::Binary => write!(f, "binary"),
            FieldKind::Enum(e) => write!(f, "enum[{}]", e.name),
            FieldKind::Timestamp => write!(f, "timestamp"),
            FieldKind::TimeOfDay => write!(f, "time-of-day"),
            FieldKind::Array(elem) => write!(f, "array[{}]", elem.kind),
            FieldKind::Object(types) => write!(f, "object[{} types]", types.len()),
        }
    }
}

/// Immutable descriptor of one source field, supplied by the source schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
        }
    }
}

/// Descriptor of one source record type: a (possibly namespaced) structural
/// type name plus the ordered field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// The type name without any namespace qualification.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Returns the index of a field by name, if present.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name_strips_namespace() {
        let rt = RecordType::new("deltix.timebase.api.messages.TradeMessage", vec![]);
        assert_eq!(rt.simple_name(), "TradeMessage");

        let rt = RecordType::new("TradeMessage", vec![]);
        assert_eq!(rt.simple_name(), "TradeMessage");
    }

    #[test]
    fn test_field_index() {
        let rt = RecordType::new(
            "Trade",
            vec![
                FieldDescriptor::new("price", FieldKind::Float(FloatKind::Fixed64), false),
                FieldDescriptor::new("size", FieldKind::Int { width: 8 }, true),
            ],
        );
        assert_eq!(rt.field_index("size"), Some(1));
        assert_eq!(rt.field_index("missing"), None);
    }
}
