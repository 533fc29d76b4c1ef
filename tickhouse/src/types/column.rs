use std::fmt::Write;

/// Leaf column type of the target store.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    Float32,
    Float64,
    /// Decimal(38, 12).
    Decimal,
    String,
    /// Short enum type name plus the name → ordinal map.
    Enum16(String, Vec<(String, i16)>),
    /// DateTime64(9).
    DateTime64,
    Date,
}

impl ScalarKind {
    /// Renders the ClickHouse type spelling of this scalar.
    pub fn sql_type(&self) -> String {
        match self {
            ScalarKind::Int8 => "Int8".to_string(),
            ScalarKind::Int16 => "Int16".to_string(),
            ScalarKind::Int32 => "Int32".to_string(),
            ScalarKind::Int64 => "Int64".to_string(),
            ScalarKind::UInt8 => "UInt8".to_string(),
            ScalarKind::Float32 => "Float32".to_string(),
            ScalarKind::Float64 => "Float64".to_string(),
            ScalarKind::Decimal => "Decimal(38, 12)".to_string(),
            ScalarKind::String => "String".to_string(),
            ScalarKind::Enum16(_, values) => {
                let mut s = String::from("Enum16(");
                for (i, (name, ordinal)) in values.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    let escaped = name.replace('\'', "\\'");
                    let _ = write!(s, "'{escaped}' = {ordinal}");
                }
                s.push(')');
                s
            }
            ScalarKind::DateTime64 => "DateTime64(9)".to_string(),
            ScalarKind::Date => "Date".to_string(),
        }
    }
}

/// Target column type as a recursive tagged union.
///
/// Trees mirror the source field descriptor trees one-to-one, except that
/// object and array-of-object fields expand into a synthetic discriminator
/// column plus one column per child field.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Scalar(ScalarKind),
    Nullable(Box<ColumnKind>),
    Array(Box<ColumnKind>),
    /// Flattened child columns of an object field; the first child is the
    /// `type` discriminator.
    Object(Vec<ColumnDeclaration>),
    /// Flattened child columns of an array-of-object field; each child is
    /// stored column-major as an array.
    Nested(Vec<ColumnDeclaration>),
}

impl ColumnKind {
    pub fn scalar(kind: ScalarKind) -> Self {
        ColumnKind::Scalar(kind)
    }

    pub fn nullable(inner: ColumnKind) -> Self {
        ColumnKind::Nullable(Box::new(inner))
    }

    pub fn array(inner: ColumnKind) -> Self {
        ColumnKind::Array(Box::new(inner))
    }

    /// Returns `true` when a null source value maps to SQL NULL for this kind.
    pub fn accepts_null(&self) -> bool {
        matches!(self, ColumnKind::Nullable(_))
    }

    /// Renders the ClickHouse type spelling of this kind.
    ///
    /// Object kinds never reach DDL directly (their children are flattened
    /// first), but render like Nested for diagnostics.
    pub fn sql_type(&self) -> String {
        match self {
            ColumnKind::Scalar(kind) => kind.sql_type(),
            ColumnKind::Nullable(inner) => format!("Nullable({})", inner.sql_type()),
            ColumnKind::Array(inner) => format!("Array({})", inner.sql_type()),
            ColumnKind::Object(children) | ColumnKind::Nested(children) => {
                let mut s = String::from("Nested(");
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    let _ = write!(s, "{} {}", child.name, child.kind.sql_type());
                }
                s.push(')');
                s
            }
        }
    }
}

/// Declaration of one target column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDeclaration {
    pub name: String,
    pub kind: ColumnKind,
    /// Column participates in the table's partition clause.
    pub partition: bool,
    /// Column participates in the table's ordering clause.
    pub index: bool,
}

impl ColumnDeclaration {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            partition: false,
            index: false,
        }
    }

    pub fn with_partition(mut self) -> Self {
        self.partition = true;
        self
    }

    pub fn with_index(mut self) -> Self {
        self.index = true;
        self
    }
}

/// Declaration of one target table: identity plus the ordered column list.
///
/// Invariant: after flattening, all column names are unique. The schema
/// processor enforces this at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDeclaration {
    pub database: String,
    pub name: String,
    pub columns: Vec<ColumnDeclaration>,
}

impl TableDeclaration {
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnDeclaration>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            columns,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    /// Returns the column flagged as the partition column, if any.
    pub fn partition_column(&self) -> Option<&ColumnDeclaration> {
        self.columns.iter().find(|c| c.partition)
    }

    /// Returns the names of the ordering-clause columns in declaration order.
    pub fn index_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.index)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Flattens the column tree into the insertable leaf columns, in order.
    ///
    /// Object children are addressed as `parent_child` (recursively); nested
    /// children become `parent.child` columns wrapped in Array, which is how
    /// the target store exposes them. Leaves appearing more than once with
    /// an identical kind collapse to their first occurrence; the schema
    /// processor guarantees no divergent duplicates survive translation.
    pub fn flattened(&self) -> Vec<(String, ColumnKind)> {
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (name, kind) in flatten_columns(&self.columns) {
            if seen.insert(name.clone()) {
                out.push((name, kind));
            }
        }
        out
    }
}

/// Raw flattening without duplicate collapsing.
pub(crate) fn flatten_columns(columns: &[ColumnDeclaration]) -> Vec<(String, ColumnKind)> {
    let mut out = Vec::new();
    for column in columns {
        flatten_into("", column, &mut out);
    }
    out
}

fn flatten_into(prefix: &str, column: &ColumnDeclaration, out: &mut Vec<(String, ColumnKind)>) {
    match &column.kind {
        ColumnKind::Object(children) => {
            let child_prefix = format!("{prefix}{}_", column.name);
            for child in children {
                flatten_into(&child_prefix, child, out);
            }
        }
        ColumnKind::Nested(children) => {
            let mut inner = Vec::new();
            for child in children {
                flatten_into("", child, &mut inner);
            }
            for (name, kind) in inner {
                out.push((
                    format!("{prefix}{}.{name}", column.name),
                    ColumnKind::array(kind),
                ));
            }
        }
        kind => out.push((format!("{prefix}{}", column.name), kind.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_type_rendering() {
        assert_eq!(ScalarKind::Decimal.sql_type(), "Decimal(38, 12)");
        assert_eq!(ScalarKind::DateTime64.sql_type(), "DateTime64(9)");
        assert_eq!(
            ColumnKind::nullable(ColumnKind::Scalar(ScalarKind::Float32)).sql_type(),
            "Nullable(Float32)"
        );
        assert_eq!(
            ColumnKind::array(ColumnKind::nullable(ColumnKind::Scalar(ScalarKind::Int64)))
                .sql_type(),
            "Array(Nullable(Int64))"
        );

        let enum_kind = ScalarKind::Enum16(
            "Side".to_string(),
            vec![("BUY".to_string(), 0), ("SELL".to_string(), 1)],
        );
        assert_eq!(enum_kind.sql_type(), "Enum16('BUY' = 0, 'SELL' = 1)");
    }

    #[test]
    fn test_flatten_object_and_nested() {
        let object = ColumnDeclaration::new(
            "attrs",
            ColumnKind::Object(vec![
                ColumnDeclaration::new(
                    "type",
                    ColumnKind::nullable(ColumnKind::Scalar(ScalarKind::String)),
                ),
                ColumnDeclaration::new("level", ColumnKind::Scalar(ScalarKind::Int32)),
            ]),
        );
        let nested = ColumnDeclaration::new(
            "entries",
            ColumnKind::Nested(vec![
                ColumnDeclaration::new("type", ColumnKind::Scalar(ScalarKind::String)),
                ColumnDeclaration::new("price", ColumnKind::Scalar(ScalarKind::Float64)),
            ]),
        );
        let table = TableDeclaration::new("db", "t", vec![object, nested]);

        let flat = table.flattened();
        let names: Vec<_> = flat.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["attrs_type", "attrs_level", "entries.type", "entries.price"]
        );
        assert_eq!(flat[2].1.sql_type(), "Array(String)");
        assert_eq!(flat[3].1.sql_type(), "Array(Float64)");
    }
}
