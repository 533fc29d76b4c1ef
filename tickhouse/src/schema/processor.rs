use std::collections::{BTreeMap, HashMap};

use crate::bail;
use crate::error::{ErrorKind, TickError, TickResult};
use crate::types::{
    flatten_columns, ArrayElement, ColumnDeclaration, ColumnKind, FieldDescriptor, FieldKind,
    FloatKind, NamingScheme, RecordType, ScalarKind, SchemaOptions, TableDeclaration,
};

/// One navigation step from a record value towards a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Descend into an object member by its source field name.
    Member(String),
    /// Map the remaining steps over the elements of an array-of-object field.
    Elements,
}

/// What a field path yields once the steps are exhausted.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// A leaf value of the given source kind.
    Value(FieldKind),
    /// The runtime type name of the object reached by the steps.
    TypeName,
}

/// Location of one column's value inside a record of a specific type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    /// Index of the top-level field in the record type.
    pub field: usize,
    pub steps: Vec<Step>,
    pub terminal: Terminal,
}

/// Binding of one flattened target column to its value source.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef {
    /// Partition date derived from the record timestamp.
    Partition,
    /// The record timestamp.
    Timestamp,
    /// The record instrument identifier.
    Instrument,
    /// The record's structural type name.
    TypeName,
    /// A value inside the record payload.
    Path(FieldPath),
}

/// Per-record-type output of schema translation: the table the type writes to
/// and the flat column name → value binding map the codec builds its insert
/// plan from. Columns of the table absent from the map take their default.
#[derive(Debug, Clone)]
pub struct TypeBinding {
    pub table: String,
    pub columns: HashMap<String, ValueRef>,
}

/// Result of translating a set of record types under one [`SchemaOptions`].
#[derive(Debug, Clone)]
pub struct TranslatedSchema {
    /// Target tables keyed by table name.
    pub tables: BTreeMap<String, TableDeclaration>,
    /// Value bindings aligned with the input record type order.
    pub types: Vec<TypeBinding>,
}

/// Translates source record types into target table declarations.
///
/// Pure function of its inputs; fails fast on the first unmappable kind or
/// column conflict with no partial output.
pub fn translate(
    record_types: &[RecordType],
    options: &SchemaOptions,
) -> TickResult<TranslatedSchema> {
    let mut tables = BTreeMap::new();
    let mut provenance: HashMap<(String, String), String> = HashMap::new();
    let mut types = Vec::with_capacity(record_types.len());

    for record_type in record_types {
        let table_name = options.table_for(record_type);
        if !tables.contains_key(&table_name) {
            let table = TableDeclaration::new(
                options.database.clone(),
                table_name.clone(),
                fixed_columns(options),
            );
            for column in &table.columns {
                provenance.insert(
                    (table_name.clone(), column.name.clone()),
                    "the fixed column set".to_string(),
                );
            }
            tables.insert(table_name.clone(), table);
        }
        let table = tables
            .get_mut(&table_name)
            .ok_or_else(|| tick_error_missing_table(&table_name))?;

        let mut columns = fixed_bindings(options);
        for (index, field) in record_type.fields.iter().enumerate() {
            let name = column_name(record_type, field, options.naming)?;
            let resolved = resolve_field(field, name, options.naming, false)?;
            let source = format!("{}.{}", record_type.name, field.name);

            if FIXED_COLUMN_NAMES.contains(&resolved.decl.name.as_str()) {
                bail!(
                    ErrorKind::SchemaConflict,
                    "Field resolves to a reserved column name",
                    format!(
                        "column `{}` of table `{}` is reserved but `{}` resolves to it",
                        resolved.decl.name, table_name, source
                    )
                );
            }

            match table.columns.iter().find(|c| c.name == resolved.decl.name) {
                Some(existing) if existing.kind == resolved.decl.kind => {}
                Some(existing) => {
                    let other = provenance
                        .get(&(table_name.clone(), existing.name.clone()))
                        .map(String::as_str)
                        .unwrap_or("an earlier field");
                    bail!(
                        ErrorKind::SchemaConflict,
                        "Duplicate column with conflicting types",
                        format!(
                            "column `{}` of table `{}` resolves from both {} and `{}` with different kinds",
                            resolved.decl.name, table_name, other, source
                        )
                    );
                }
                None => {
                    provenance.insert(
                        (table_name.clone(), resolved.decl.name.clone()),
                        format!("`{source}`"),
                    );
                    table.columns.push(resolved.decl.clone());
                }
            }

            for binding in resolved.bindings {
                columns.insert(
                    binding.flat,
                    ValueRef::Path(FieldPath {
                        field: index,
                        steps: binding.steps,
                        terminal: binding.terminal,
                    }),
                );
            }
        }

        types.push(TypeBinding {
            table: table_name,
            columns,
        });
    }

    // Cross-tree collisions (e.g. a field `a_b` next to an object `a` with a
    // child `b`) only surface after flattening.
    for table in tables.values() {
        let mut seen: HashMap<String, ColumnKind> = HashMap::new();
        for (name, kind) in flatten_columns(&table.columns) {
            if let Some(previous) = seen.insert(name.clone(), kind.clone()) {
                if previous != kind {
                    bail!(
                        ErrorKind::SchemaConflict,
                        "Duplicate column with conflicting types",
                        format!(
                            "flattened column `{}` of table `{}` resolves to both `{}` and `{}`",
                            name,
                            table.name,
                            previous.sql_type(),
                            kind.sql_type()
                        )
                    );
                }
            }
        }
    }

    Ok(TranslatedSchema { tables, types })
}

fn tick_error_missing_table(table: &str) -> TickError {
    TickError::from((
        ErrorKind::InvalidState,
        "Missing table declaration",
        format!("table `{table}` disappeared during translation"),
    ))
}

/// Sanitizes a resolved column name into the target identifier grammar.
///
/// The first character must match `[a-zA-Z_]` and is prefixed with `_`
/// otherwise; later characters outside `[0-9a-zA-Z_]` are replaced by `_`.
/// When the sanitized name ends in a run of two or more underscores, one is
/// stripped.
pub fn sanitize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if first.is_ascii_alphabetic() || first == '_' {
            out.push(first);
        } else {
            out.push('_');
            out.push(if first.is_ascii_alphanumeric() {
                first
            } else {
                '_'
            });
        }
    }
    for c in chars {
        out.push(if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        });
    }
    let trailing = out.chars().rev().take_while(|c| *c == '_').count();
    if trailing > 1 {
        out.pop();
    }
    out
}

const FIXED_COLUMN_NAMES: [&str; 4] = ["partition", "timestamp", "instrument", "type"];

fn fixed_columns(options: &SchemaOptions) -> Vec<ColumnDeclaration> {
    let mut columns = Vec::with_capacity(4);
    if options.include_partition_column {
        columns.push(
            ColumnDeclaration::new("partition", ColumnKind::Scalar(ScalarKind::Date))
                .with_partition(),
        );
    }
    columns.push(
        ColumnDeclaration::new("timestamp", ColumnKind::Scalar(ScalarKind::DateTime64))
            .with_index(),
    );
    columns
        .push(ColumnDeclaration::new("instrument", ColumnKind::Scalar(ScalarKind::String)).with_index());
    columns.push(ColumnDeclaration::new(
        "type",
        ColumnKind::Scalar(ScalarKind::String),
    ));
    columns
}

fn fixed_bindings(options: &SchemaOptions) -> HashMap<String, ValueRef> {
    let mut bindings = HashMap::new();
    if options.include_partition_column {
        bindings.insert("partition".to_string(), ValueRef::Partition);
    }
    bindings.insert("timestamp".to_string(), ValueRef::Timestamp);
    bindings.insert("instrument".to_string(), ValueRef::Instrument);
    bindings.insert("type".to_string(), ValueRef::TypeName);
    bindings
}

/// Maps a source leaf kind to its target scalar.
fn leaf_scalar(kind: &FieldKind) -> TickResult<ScalarKind> {
    let scalar = match kind {
        FieldKind::Int { width: 1 } => ScalarKind::Int8,
        FieldKind::Int { width: 2 } => ScalarKind::Int16,
        FieldKind::Int { width: 4 } => ScalarKind::Int32,
        FieldKind::Int { width: 8 } => ScalarKind::Int64,
        FieldKind::Int { width } => {
            bail!(
                ErrorKind::UnsupportedKind,
                "Unsupported field kind",
                format!("integer width {width} has no target mapping")
            )
        }
        FieldKind::Float(FloatKind::Fixed32) => ScalarKind::Float32,
        FieldKind::Float(FloatKind::Fixed64) | FieldKind::Float(FloatKind::Auto) => {
            ScalarKind::Float64
        }
        FieldKind::Float(FloatKind::Decimal64) => ScalarKind::Decimal,
        FieldKind::Bool => ScalarKind::UInt8,
        FieldKind::Char | FieldKind::Varchar | FieldKind::Binary => ScalarKind::String,
        FieldKind::Enum(enum_type) => ScalarKind::Enum16(
            enum_type.simple_name().to_string(),
            enum_type.values.clone(),
        ),
        FieldKind::Timestamp => ScalarKind::DateTime64,
        FieldKind::TimeOfDay => ScalarKind::Int32,
        FieldKind::Array(_) | FieldKind::Object(_) => {
            bail!(
                ErrorKind::UnsupportedKind,
                "Unsupported field kind",
                format!("kind `{kind}` is not a leaf")
            )
        }
    };
    Ok(scalar)
}

/// Recursive datatype suffix of the NAME_AND_DATATYPE naming scheme.
fn datatype_suffix(kind: &FieldKind, nullable: bool) -> TickResult<String> {
    if nullable && !matches!(kind, FieldKind::Array(_) | FieldKind::Object(_)) {
        return Ok(format!("_Nullable{}", datatype_suffix(kind, false)?));
    }
    let suffix = match kind {
        FieldKind::Array(element) => {
            format!("_Array{}", datatype_suffix(&element.kind, element.nullable)?)
        }
        FieldKind::Object(_) => String::new(),
        FieldKind::Enum(enum_type) => format!("_{}", enum_type.simple_name()),
        FieldKind::Float(FloatKind::Decimal64) => "_Decimal128(12)".to_string(),
        leaf => format!("_{}", leaf_scalar(leaf)?.sql_type()),
    };
    Ok(suffix)
}

fn column_name(
    record_type: &RecordType,
    field: &FieldDescriptor,
    naming: NamingScheme,
) -> TickResult<String> {
    let raw = match naming {
        NamingScheme::TypeAndName => {
            format!("{}_{}", record_type.simple_name(), field.name)
        }
        NamingScheme::Name => field.name.clone(),
        NamingScheme::NameAndDatatype => format!(
            "{}{}",
            field.name,
            datatype_suffix(&field.kind, field.nullable)?
        ),
    };
    Ok(sanitize_column_name(&raw))
}

fn child_column_name(field: &FieldDescriptor, naming: NamingScheme) -> TickResult<String> {
    let raw = match naming {
        NamingScheme::NameAndDatatype => format!(
            "{}{}",
            field.name,
            datatype_suffix(&field.kind, field.nullable)?
        ),
        _ => field.name.clone(),
    };
    Ok(sanitize_column_name(&raw))
}

/// A column binding relative to its containing object or record.
struct RelBinding {
    flat: String,
    steps: Vec<Step>,
    terminal: Terminal,
}

struct Resolved {
    decl: ColumnDeclaration,
    bindings: Vec<RelBinding>,
}

fn resolve_field(
    field: &FieldDescriptor,
    name: String,
    naming: NamingScheme,
    inside_nested: bool,
) -> TickResult<Resolved> {
    match &field.kind {
        FieldKind::Object(candidates) => {
            let (child_decls, child_bindings) = resolve_children(candidates, naming, inside_nested)?;
            let discriminator = if inside_nested {
                ColumnKind::Scalar(ScalarKind::String)
            } else {
                ColumnKind::nullable(ColumnKind::Scalar(ScalarKind::String))
            };
            let mut children = vec![ColumnDeclaration::new("type", discriminator)];
            children.extend(child_decls);

            let mut bindings = vec![RelBinding {
                flat: format!("{name}_type"),
                steps: vec![],
                terminal: Terminal::TypeName,
            }];
            for binding in child_bindings {
                bindings.push(RelBinding {
                    flat: format!("{name}_{}", binding.flat),
                    steps: binding.steps,
                    terminal: binding.terminal,
                });
            }
            Ok(Resolved {
                decl: ColumnDeclaration::new(name, ColumnKind::Object(children)),
                bindings,
            })
        }
        FieldKind::Array(element) => {
            if inside_nested {
                bail!(
                    ErrorKind::UnsupportedKind,
                    "Unsupported field kind",
                    format!(
                        "array field `{}` inside an array-of-object field would produce an array of arrays",
                        field.name
                    )
                );
            }
            resolve_array(field, element, name, naming)
        }
        leaf => {
            let mut kind = ColumnKind::Scalar(leaf_scalar(leaf)?);
            if field.nullable {
                kind = ColumnKind::nullable(kind);
            }
            Ok(Resolved {
                bindings: vec![RelBinding {
                    flat: name.clone(),
                    steps: vec![],
                    terminal: Terminal::Value(leaf.clone()),
                }],
                decl: ColumnDeclaration::new(name, kind),
            })
        }
    }
}

fn resolve_array(
    field: &FieldDescriptor,
    element: &ArrayElement,
    name: String,
    naming: NamingScheme,
) -> TickResult<Resolved> {
    match &element.kind {
        FieldKind::Object(candidates) => {
            let (child_decls, child_bindings) = resolve_children(candidates, naming, true)?;
            let mut children = vec![ColumnDeclaration::new(
                "type",
                ColumnKind::Scalar(ScalarKind::String),
            )];
            children.extend(child_decls);

            let mut bindings = vec![RelBinding {
                flat: format!("{name}.type"),
                steps: vec![Step::Elements],
                terminal: Terminal::TypeName,
            }];
            for binding in child_bindings {
                let mut steps = vec![Step::Elements];
                steps.extend(binding.steps);
                bindings.push(RelBinding {
                    flat: format!("{name}.{}", binding.flat),
                    steps,
                    terminal: binding.terminal,
                });
            }
            Ok(Resolved {
                decl: ColumnDeclaration::new(name, ColumnKind::Nested(children)),
                bindings,
            })
        }
        FieldKind::Array(_) | FieldKind::Binary => {
            bail!(
                ErrorKind::UnsupportedKind,
                "Unsupported field kind",
                format!("array field `{}` has unsupported element kind `{}`", field.name, element.kind)
            )
        }
        leaf => {
            let mut element_kind = ColumnKind::Scalar(leaf_scalar(leaf)?);
            if element.nullable {
                element_kind = ColumnKind::nullable(element_kind);
            }
            Ok(Resolved {
                bindings: vec![RelBinding {
                    flat: name.clone(),
                    steps: vec![],
                    terminal: Terminal::Value(field.kind.clone()),
                }],
                decl: ColumnDeclaration::new(name, ColumnKind::array(element_kind)),
            })
        }
    }
}

/// Resolves the union of all candidate types' fields into child columns.
fn resolve_children(
    candidates: &[RecordType],
    naming: NamingScheme,
    inside_nested: bool,
) -> TickResult<(Vec<ColumnDeclaration>, Vec<RelBinding>)> {
    let mut decls: Vec<ColumnDeclaration> = Vec::new();
    let mut bindings = Vec::new();
    let mut provenance: HashMap<String, String> = HashMap::new();

    for candidate in candidates {
        for field in &candidate.fields {
            let name = child_column_name(field, naming)?;
            let source = format!("{}.{}", candidate.name, field.name);
            if name == "type" {
                bail!(
                    ErrorKind::SchemaConflict,
                    "Duplicate column with conflicting types",
                    format!("field `{source}` collides with the discriminator column `type`")
                );
            }
            let resolved = resolve_field(field, name, naming, inside_nested)?;
            if let Some(existing) = decls.iter().find(|d| d.name == resolved.decl.name) {
                if existing.kind == resolved.decl.kind {
                    continue;
                }
                let other = provenance
                    .get(&existing.name)
                    .map(String::as_str)
                    .unwrap_or("an earlier field");
                bail!(
                    ErrorKind::SchemaConflict,
                    "Duplicate column with conflicting types",
                    format!(
                        "child column `{}` resolves from both `{}` and `{}` with different kinds",
                        resolved.decl.name, other, source
                    )
                );
            }
            provenance.insert(resolved.decl.name.clone(), source);
            for mut binding in resolved.bindings {
                binding.steps.insert(0, Step::Member(field.name.clone()));
                bindings.push(binding);
            }
            decls.push(resolved.decl);
        }
    }

    Ok((decls, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumType, WriteMode};

    fn field(name: &str, kind: FieldKind, nullable: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            kind,
            nullable,
        }
    }

    fn trade_type() -> RecordType {
        RecordType {
            name: "md.Trade".to_string(),
            fields: vec![
                field("price", FieldKind::Float(FloatKind::Decimal64), false),
                field("size", FieldKind::Int { width: 8 }, false),
                field(
                    "side",
                    FieldKind::Enum(EnumType::new(
                        "md.Side",
                        vec![("BUY".to_string(), 0), ("SELL".to_string(), 1)],
                    )),
                    true,
                ),
            ],
        }
    }

    fn options() -> SchemaOptions {
        SchemaOptions::new("ticks", "market_data").with_write_mode(WriteMode::Append)
    }

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("price"), "price");
        assert_eq!(sanitize_column_name("1abc"), "_1abc");
        assert_eq!(sanitize_column_name("a-b.c"), "a_b_c");
        assert_eq!(sanitize_column_name("DateTime64(9)"), "DateTime64_9_");
        assert_eq!(sanitize_column_name("x()"), "x_");
        assert_eq!(sanitize_column_name("_"), "_");
    }

    #[test]
    fn test_fixed_columns_precede_fields() {
        let schema = translate(&[trade_type()], &options()).unwrap();
        let table = &schema.tables["market_data"];
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            &names[..4],
            &["partition", "timestamp", "instrument", "type"]
        );
        assert!(table.columns[0].partition);
        assert_eq!(table.index_columns(), vec!["timestamp", "instrument"]);
    }

    #[test]
    fn test_partition_column_disabled() {
        let schema = translate(
            &[trade_type()],
            &options().with_partition_column(false),
        )
        .unwrap();
        let table = &schema.tables["market_data"];
        assert_eq!(table.columns[0].name, "timestamp");
        assert!(!schema.types[0].columns.contains_key("partition"));
    }

    #[test]
    fn test_type_and_name_scheme() {
        let schema = translate(&[trade_type()], &options()).unwrap();
        let table = &schema.tables["market_data"];
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            &names[4..],
            &["Trade_price", "Trade_size", "Trade_side"]
        );
        assert_eq!(table.columns[4].kind.sql_type(), "Decimal(38, 12)");
        assert_eq!(
            table.columns[6].kind.sql_type(),
            "Nullable(Enum16('BUY' = 0, 'SELL' = 1))"
        );
    }

    #[test]
    fn test_name_and_datatype_scheme() {
        let record_type = RecordType {
            name: "md.Bar".to_string(),
            fields: vec![
                FieldDescriptor {
                    name: "floatArray".to_string(),
                    kind: FieldKind::Array(Box::new(ArrayElement::new(
                        FieldKind::Float(FloatKind::Fixed32),
                        true,
                    ))),
                    nullable: false,
                },
                field("close", FieldKind::Float(FloatKind::Decimal64), true),
                field("openTime", FieldKind::Timestamp, false),
            ],
        };
        let schema = translate(
            &[record_type],
            &options().with_naming(NamingScheme::NameAndDatatype),
        )
        .unwrap();
        let table = &schema.tables["market_data"];
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            &names[4..],
            &[
                "floatArray_Array_Nullable_Float32",
                "close_Nullable_Decimal128_12_",
                "openTime_DateTime64_9_"
            ]
        );
    }

    #[test]
    fn test_object_field_expands_with_discriminator() {
        let attrs = RecordType {
            name: "md.Attrs".to_string(),
            fields: vec![field("level", FieldKind::Int { width: 4 }, false)],
        };
        let record_type = RecordType {
            name: "md.Quote".to_string(),
            fields: vec![FieldDescriptor {
                name: "attrs".to_string(),
                kind: FieldKind::Object(vec![attrs]),
                nullable: true,
            }],
        };
        let schema = translate(
            &[record_type],
            &options().with_naming(NamingScheme::Name),
        )
        .unwrap();
        let table = &schema.tables["market_data"];
        let flat = table.flattened();
        let attrs_type = flat.iter().find(|(n, _)| n == "attrs_type").unwrap();
        assert_eq!(attrs_type.1.sql_type(), "Nullable(String)");
        let attrs_level = flat.iter().find(|(n, _)| n == "attrs_level").unwrap();
        assert_eq!(attrs_level.1.sql_type(), "Int32");

        let binding = &schema.types[0].columns["attrs_type"];
        assert_eq!(
            *binding,
            ValueRef::Path(FieldPath {
                field: 0,
                steps: vec![],
                terminal: Terminal::TypeName,
            })
        );
        let binding = &schema.types[0].columns["attrs_level"];
        assert_eq!(
            *binding,
            ValueRef::Path(FieldPath {
                field: 0,
                steps: vec![Step::Member("level".to_string())],
                terminal: Terminal::Value(FieldKind::Int { width: 4 }),
            })
        );
    }

    #[test]
    fn test_nested_field_expands_column_major() {
        let entry = RecordType {
            name: "md.Entry".to_string(),
            fields: vec![field("px", FieldKind::Float(FloatKind::Fixed64), false)],
        };
        let record_type = RecordType {
            name: "md.Book".to_string(),
            fields: vec![FieldDescriptor {
                name: "entries".to_string(),
                kind: FieldKind::Array(Box::new(ArrayElement::new(
                    FieldKind::Object(vec![entry]),
                    false,
                ))),
                nullable: false,
            }],
        };
        let schema = translate(
            &[record_type],
            &options().with_naming(NamingScheme::Name),
        )
        .unwrap();
        let table = &schema.tables["market_data"];
        let flat = table.flattened();
        let names: Vec<_> = flat.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"entries.type"));
        assert!(names.contains(&"entries.px"));
        let px = flat.iter().find(|(n, _)| n == "entries.px").unwrap();
        assert_eq!(px.1.sql_type(), "Array(Float64)");

        let binding = &schema.types[0].columns["entries.px"];
        assert_eq!(
            *binding,
            ValueRef::Path(FieldPath {
                field: 0,
                steps: vec![Step::Elements, Step::Member("px".to_string())],
                terminal: Terminal::Value(FieldKind::Float(FloatKind::Fixed64)),
            })
        );
    }

    #[test]
    fn test_union_table_merges_identical_columns() {
        let quote = RecordType {
            name: "md.Quote".to_string(),
            fields: vec![field("price", FieldKind::Float(FloatKind::Decimal64), false)],
        };
        let schema = translate(
            &[trade_type(), quote],
            &options().with_naming(NamingScheme::Name),
        )
        .unwrap();
        let table = &schema.tables["market_data"];
        let price_columns = table
            .columns
            .iter()
            .filter(|c| c.name == "price")
            .count();
        assert_eq!(price_columns, 1);
        assert_eq!(schema.types[0].table, schema.types[1].table);
    }

    #[test]
    fn test_conflicting_columns_fail() {
        let quote = RecordType {
            name: "md.Quote".to_string(),
            fields: vec![field("price", FieldKind::Int { width: 8 }, false)],
        };
        let error = translate(
            &[trade_type(), quote],
            &options().with_naming(NamingScheme::Name),
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SchemaConflict);
        let detail = format!("{error}");
        assert!(detail.contains("md.Trade.price"));
        assert!(detail.contains("md.Quote.price"));
    }

    #[test]
    fn test_field_named_like_fixed_column_fails() {
        let record_type = RecordType {
            name: "md.Trade".to_string(),
            fields: vec![
                field("price", FieldKind::Float(FloatKind::Decimal64), false),
                field("type", FieldKind::Varchar, false),
            ],
        };
        let error = translate(
            &[record_type],
            &options().with_naming(NamingScheme::Name),
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SchemaConflict);
        let detail = format!("{error}");
        assert!(detail.contains("`type`"));
        assert!(detail.contains("md.Trade.type"));
    }

    #[test]
    fn test_array_of_array_unsupported() {
        let record_type = RecordType {
            name: "md.Bad".to_string(),
            fields: vec![FieldDescriptor {
                name: "matrix".to_string(),
                kind: FieldKind::Array(Box::new(ArrayElement::new(
                    FieldKind::Array(Box::new(ArrayElement::new(
                        FieldKind::Float(FloatKind::Fixed64),
                        false,
                    ))),
                    false,
                ))),
                nullable: false,
            }],
        };
        let error = translate(&[record_type], &options()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedKind);
    }

    #[test]
    fn test_split_by_type_routes_tables() {
        let quote = RecordType {
            name: "md.Quote".to_string(),
            fields: vec![field("bid", FieldKind::Float(FloatKind::Decimal64), false)],
        };
        let schema = translate(
            &[trade_type(), quote],
            &options().with_split_by_type(true),
        )
        .unwrap();
        assert!(schema.tables.contains_key("market_data_Trade"));
        assert!(schema.tables.contains_key("market_data_Quote"));
        assert_eq!(schema.types[0].table, "market_data_Trade");
    }
}
