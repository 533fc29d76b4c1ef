//! Row encoding and batching.
//!
//! A [`TableWriter`] owns one replication run's codecs: per record type, a
//! cached insert plan binding every flattened target column to a value path
//! inside the record (or to the column default when the type has no such
//! field). Encoding is synchronous and single-threaded; only [`flush`]
//! touches the target.
//!
//! [`flush`]: TableWriter::flush

use std::collections::{BTreeMap, HashMap};

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, TickError, TickResult};
use crate::schema::{FieldPath, Step, Terminal, TypeBinding, ValueRef};
use crate::target::TargetClient;
use crate::types::{
    clamp_timestamp, encode_decimal64, partition_date, Cell, ColumnKind, Record, Row, ScalarKind,
    TableDeclaration, TickValue, TypeIndex,
};

/// One column slot of a codec's insert plan.
#[derive(Debug, Clone)]
struct Slot {
    kind: ColumnKind,
    binding: Option<ValueRef>,
}

/// Cached per-type encoder bound to one table's filtered column plan.
#[derive(Debug)]
struct Codec {
    table: String,
    type_name: String,
    columns: Vec<String>,
    slots: Vec<Slot>,
    rows: Vec<Row>,
}

/// Encodes records into batched rows, one codec per record type.
#[derive(Debug)]
pub struct TableWriter {
    type_names: Vec<String>,
    bindings: Vec<TypeBinding>,
    tables: BTreeMap<String, TableDeclaration>,
    codecs: HashMap<TypeIndex, Codec>,
    row_count: usize,
    min_timestamp: Option<i64>,
    max_timestamp: Option<i64>,
    closed: bool,
}

impl TableWriter {
    /// Builds a writer over the reconciled tables.
    ///
    /// `type_names` and `bindings` are aligned with the source record type
    /// order; `tables` is the post-reconciliation declaration set.
    pub fn new(
        type_names: Vec<String>,
        bindings: Vec<TypeBinding>,
        tables: BTreeMap<String, TableDeclaration>,
    ) -> Self {
        Self {
            type_names,
            bindings,
            tables,
            codecs: HashMap::new(),
            row_count: 0,
            min_timestamp: None,
            max_timestamp: None,
            closed: false,
        }
    }

    /// Rows encoded since the last flush.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Minimum record timestamp observed since the last flush.
    pub fn min_timestamp(&self) -> Option<i64> {
        self.min_timestamp
    }

    /// Maximum record timestamp observed since the last flush.
    pub fn max_timestamp(&self) -> Option<i64> {
        self.max_timestamp
    }

    /// Encodes one record into the batch of its type's codec, creating the
    /// codec on first sighting of the type index.
    pub fn send(&mut self, record: &Record) -> TickResult<()> {
        if self.closed {
            bail!(
                ErrorKind::InvalidState,
                "Writer is closed",
                "send() called after close()"
            );
        }
        if !self.codecs.contains_key(&record.type_index) {
            let codec = self.build_codec(record.type_index)?;
            self.codecs.insert(record.type_index, codec);
        }
        let codec = self
            .codecs
            .get_mut(&record.type_index)
            .ok_or_else(|| {
                TickError::from((
                    ErrorKind::InvalidState,
                    "Codec cache is inconsistent",
                    format!("no codec for type index {}", record.type_index),
                ))
            })?;

        let mut values = Vec::with_capacity(codec.slots.len());
        for slot in &codec.slots {
            values.push(encode_slot(slot, record, &codec.type_name)?);
        }
        codec.rows.push(Row::new(values));

        self.row_count += 1;
        self.min_timestamp = Some(match self.min_timestamp {
            Some(min) => min.min(record.timestamp),
            None => record.timestamp,
        });
        self.max_timestamp = Some(match self.max_timestamp {
            Some(max) => max.max(record.timestamp),
            None => record.timestamp,
        });
        Ok(())
    }

    /// Executes every live codec's buffered batch, then resets the batch
    /// state.
    pub async fn flush<T: TargetClient>(&mut self, target: &T) -> TickResult<()> {
        for codec in self.codecs.values_mut() {
            if codec.rows.is_empty() {
                continue;
            }
            let table = self.tables.get(&codec.table).ok_or_else(|| {
                TickError::from((
                    ErrorKind::MissingTableDeclaration,
                    "Missing table declaration",
                    format!("codec refers to unknown table `{}`", codec.table),
                ))
            })?;
            debug!(
                table = table.qualified_name(),
                rows = codec.rows.len(),
                "flushing batch"
            );
            target
                .insert_rows(table, &codec.columns, &codec.rows)
                .await?;
            codec.rows.clear();
        }
        self.row_count = 0;
        self.min_timestamp = None;
        self.max_timestamp = None;
        Ok(())
    }

    /// Releases all codecs without flushing their pending rows.
    pub fn close(&mut self) {
        self.codecs.clear();
        self.closed = true;
    }

    fn build_codec(&self, type_index: TypeIndex) -> TickResult<Codec> {
        let (type_name, binding) = match (
            self.type_names.get(type_index),
            self.bindings.get(type_index),
        ) {
            (Some(name), Some(binding)) => (name, binding),
            _ => bail!(
                ErrorKind::MissingRecordType,
                "Unknown record type",
                format!("type index {type_index} is not part of the resolved schema")
            ),
        };
        let table = self.tables.get(&binding.table).ok_or_else(|| {
            TickError::from((
                ErrorKind::MissingTableDeclaration,
                "Missing table declaration",
                format!(
                    "record type `{type_name}` maps to unknown table `{}`",
                    binding.table
                ),
            ))
        })?;

        let mut columns = Vec::new();
        let mut slots = Vec::new();
        for (name, kind) in table.flattened() {
            let slot = Slot {
                binding: binding.columns.get(&name).cloned(),
                kind,
            };
            columns.push(name);
            slots.push(slot);
        }
        debug!(
            type_name,
            table = table.qualified_name(),
            columns = columns.len(),
            "built codec"
        );
        Ok(Codec {
            table: binding.table.clone(),
            type_name: type_name.clone(),
            columns,
            slots,
            rows: Vec::new(),
        })
    }
}

fn encode_slot(slot: &Slot, record: &Record, type_name: &str) -> TickResult<Cell> {
    let Some(binding) = &slot.binding else {
        return Ok(default_cell(&slot.kind));
    };
    match binding {
        ValueRef::Partition => Ok(Cell::Date(partition_date(record.timestamp))),
        ValueRef::Timestamp => Ok(Cell::DateTime64(clamp_timestamp(record.timestamp))),
        ValueRef::Instrument => Ok(Cell::String(record.instrument.clone())),
        ValueRef::TypeName => Ok(Cell::String(type_name.to_string())),
        ValueRef::Path(path) => encode_path(path, record, &slot.kind),
    }
}

fn encode_path(path: &FieldPath, record: &Record, kind: &ColumnKind) -> TickResult<Cell> {
    let value = record.values.get(path.field).unwrap_or(&TickValue::Null);
    walk(value, &path.steps, &path.terminal, kind)
}

fn walk(
    value: &TickValue,
    steps: &[Step],
    terminal: &Terminal,
    kind: &ColumnKind,
) -> TickResult<Cell> {
    match steps.first() {
        None => match terminal {
            Terminal::TypeName => match value {
                TickValue::Object(object) => Ok(Cell::String(object.type_name.clone())),
                TickValue::Null => Ok(null_or_default(kind)),
                other => conversion_error("an object", other),
            },
            Terminal::Value(_) => encode_leaf(value, kind),
        },
        Some(Step::Member(name)) => match value {
            TickValue::Object(object) => {
                let member = object.field(name).unwrap_or(&TickValue::Null);
                walk(member, &steps[1..], terminal, kind)
            }
            // A wholly-null object nulls every nullable descendant and
            // defaults the rest.
            TickValue::Null => Ok(null_or_default(kind)),
            other => conversion_error("an object", other),
        },
        Some(Step::Elements) => {
            let element_kind = match kind {
                ColumnKind::Array(inner) => inner.as_ref(),
                other => {
                    bail!(
                        ErrorKind::InvalidState,
                        "Insert plan is inconsistent",
                        format!(
                            "element traversal against non-array column kind `{}`",
                            other.sql_type()
                        )
                    )
                }
            };
            match value {
                TickValue::Array(elements) => {
                    let mut out = Vec::with_capacity(elements.len());
                    for element in elements {
                        out.push(walk(element, &steps[1..], terminal, element_kind)?);
                    }
                    Ok(Cell::Array(out))
                }
                TickValue::Null => Ok(Cell::Array(Vec::new())),
                other => conversion_error("an array of objects", other),
            }
        }
    }
}

fn encode_leaf(value: &TickValue, kind: &ColumnKind) -> TickResult<Cell> {
    let (inner, nullable) = match kind {
        ColumnKind::Nullable(inner) => (inner.as_ref(), true),
        other => (other, false),
    };
    if value.is_null() {
        return Ok(if nullable {
            Cell::Null
        } else {
            default_cell(inner)
        });
    }
    match (value, inner) {
        (TickValue::Array(elements), ColumnKind::Array(element_kind)) => {
            let mut out = Vec::with_capacity(elements.len());
            for element in elements {
                out.push(encode_leaf(element, element_kind)?);
            }
            Ok(Cell::Array(out))
        }
        (TickValue::Int8(v), _) => Ok(Cell::I8(*v)),
        (TickValue::Int16(v), _) => Ok(Cell::I16(*v)),
        (TickValue::Int32(v), _) => Ok(Cell::I32(*v)),
        (TickValue::Int64(v), _) => Ok(Cell::I64(*v)),
        (TickValue::F32(v), _) => Ok(Cell::F32(*v)),
        (TickValue::F64(v), _) => Ok(Cell::F64(*v)),
        (TickValue::Decimal64(v), _) => Ok(Cell::Decimal(encode_decimal64(v))),
        (TickValue::Bool(v), _) => Ok(Cell::UInt8(*v as u8)),
        (TickValue::Char(v), _) => Ok(Cell::String(v.to_string())),
        (TickValue::Varchar(v), _) => Ok(Cell::String(v.clone())),
        (TickValue::Binary(v), _) => Ok(Cell::Binary(v.clone())),
        (TickValue::Enum(name), _) => Ok(Cell::String(name.clone())),
        (TickValue::Timestamp(nanos), _) => Ok(Cell::DateTime64(clamp_timestamp(*nanos))),
        (TickValue::TimeOfDay(millis), _) => Ok(Cell::I32(*millis)),
        (other, target) => conversion_error(&target.sql_type(), other),
    }
}

fn conversion_error(expected: &str, got: &TickValue) -> TickResult<Cell> {
    Err(TickError::from((
        ErrorKind::ConversionError,
        "Value does not match its resolved column",
        format!("expected {expected}, got `{got:?}`"),
    )))
}

/// Canonical default written when a record type lacks a column's field.
fn default_cell(kind: &ColumnKind) -> Cell {
    match kind {
        ColumnKind::Nullable(_) => Cell::Null,
        ColumnKind::Array(_) => Cell::Array(Vec::new()),
        ColumnKind::Scalar(scalar) => match scalar {
            ScalarKind::Int8 => Cell::I8(0),
            ScalarKind::Int16 => Cell::I16(0),
            ScalarKind::Int32 => Cell::I32(0),
            ScalarKind::Int64 => Cell::I64(0),
            ScalarKind::UInt8 => Cell::UInt8(0),
            ScalarKind::Float32 => Cell::F32(0.0),
            ScalarKind::Float64 => Cell::F64(0.0),
            ScalarKind::Decimal => Cell::Decimal(BigDecimal::from(0)),
            ScalarKind::String => Cell::String(String::new()),
            ScalarKind::Enum16(_, values) => Cell::String(
                values
                    .first()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default(),
            ),
            ScalarKind::DateTime64 => Cell::DateTime64(0),
            ScalarKind::Date => Cell::Date(
                NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN),
            ),
        },
        // Object and Nested kinds never appear in a flattened plan.
        ColumnKind::Object(_) | ColumnKind::Nested(_) => Cell::Null,
    }
}

fn null_or_default(kind: &ColumnKind) -> Cell {
    if kind.accepts_null() {
        Cell::Null
    } else {
        default_cell(kind)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::schema::translate;
    use crate::target::MemoryTarget;
    use crate::types::{
        ArrayElement, Decimal64, EnumType, FieldDescriptor, FieldKind, FloatKind, NamingScheme,
        ObjectValue, RecordType, SchemaOptions, DECIMAL_MAX_STR,
    };

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

    fn writer_for(record_types: &[RecordType], options: &SchemaOptions) -> TableWriter {
        let schema = translate(record_types, options).unwrap();
        TableWriter::new(
            record_types.iter().map(|t| t.name.clone()).collect(),
            schema.types,
            schema.tables,
        )
    }

    fn options() -> SchemaOptions {
        SchemaOptions::new("ticks", "market_data").with_naming(NamingScheme::Name)
    }

    #[tokio::test]
    async fn test_encodes_fixed_and_field_columns() {
        let types = [trade_type()];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(
            0,
            1_700_000_000_000_000_000,
            "AAPL",
            vec![
                TickValue::Decimal64(Decimal64::parse("12.5").unwrap()),
                TickValue::Int64(300),
                TickValue::Enum("SELL".to_string()),
            ],
        );
        writer.send(&record).unwrap();
        assert_eq!(writer.row_count(), 1);
        assert_eq!(writer.min_timestamp(), Some(1_700_000_000_000_000_000));

        let target = MemoryTarget::new();
        writer.flush(&target).await.unwrap();
        assert_eq!(writer.row_count(), 0);
        assert_eq!(writer.max_timestamp(), None);

        let schema = translate(&[trade_type()], &options()).unwrap();
        let table = &schema.tables["market_data"];
        let rows = target.table_rows(table).await;
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        // partition, timestamp, instrument, type, price, size, side
        assert_eq!(row.values[1], Cell::DateTime64(1_700_000_000_000_000_000));
        assert_eq!(row.values[2], Cell::String("AAPL".to_string()));
        assert_eq!(row.values[3], Cell::String("md.Trade".to_string()));
        assert_eq!(
            row.values[4],
            Cell::Decimal(BigDecimal::from_str("12.5").unwrap())
        );
        assert_eq!(row.values[5], Cell::I64(300));
        assert_eq!(row.values[6], Cell::String("SELL".to_string()));
    }

    #[tokio::test]
    async fn test_decimal_infinity_clamps_to_boundary() {
        let types = [trade_type()];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(
            0,
            1,
            "AAPL",
            vec![
                TickValue::Decimal64(Decimal64::parse("Infinity").unwrap()),
                TickValue::Int64(1),
                TickValue::Null,
            ],
        );
        writer.send(&record).unwrap();

        let target = MemoryTarget::new();
        writer.flush(&target).await.unwrap();
        let schema = translate(&types, &options()).unwrap();
        let rows = target.table_rows(&schema.tables["market_data"]).await;
        assert_eq!(
            rows[0].values[4],
            Cell::Decimal(BigDecimal::from_str(DECIMAL_MAX_STR).unwrap())
        );
        // nullable enum, null value
        assert_eq!(rows[0].values[6], Cell::Null);
    }

    #[test]
    fn test_timestamp_clamped_below_range() {
        let types = [trade_type()];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(
            0,
            i64::MIN,
            "AAPL",
            vec![
                TickValue::Decimal64(Decimal64::parse("0").unwrap()),
                TickValue::Int64(1),
                TickValue::Null,
            ],
        );
        writer.send(&record).unwrap();
        let codec = writer.codecs.get(&0).unwrap();
        assert_eq!(
            codec.rows[0].values[1],
            Cell::DateTime64(crate::types::DATETIME64_MIN_NANOS)
        );
    }

    #[test]
    fn test_missing_field_takes_default_in_union_table() {
        let quote = RecordType {
            name: "md.Quote".to_string(),
            fields: vec![field("bid", FieldKind::Float(FloatKind::Fixed64), false)],
        };
        let types = [trade_type(), quote];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(1, 5, "AAPL", vec![TickValue::F64(101.25)]);
        writer.send(&record).unwrap();

        let codec = writer.codecs.get(&1).unwrap();
        let row = &codec.rows[0];
        // Columns: partition, timestamp, instrument, type, price, size, side, bid.
        assert_eq!(row.values[4], Cell::Decimal(BigDecimal::from(0)));
        assert_eq!(row.values[5], Cell::I64(0));
        assert_eq!(row.values[6], Cell::Null);
        assert_eq!(row.values[7], Cell::F64(101.25));
    }

    #[test]
    fn test_nested_transposes_row_major_to_column_major() {
        let entry = RecordType {
            name: "md.Entry".to_string(),
            fields: vec![
                field("px", FieldKind::Float(FloatKind::Fixed64), false),
                field("qty", FieldKind::Int { width: 8 }, true),
            ],
        };
        let book = RecordType {
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
        let types = [book];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(
            0,
            7,
            "AAPL",
            vec![TickValue::Array(vec![
                TickValue::Object(ObjectValue::new(
                    "md.Entry",
                    vec![
                        ("px".to_string(), TickValue::F64(1.0)),
                        ("qty".to_string(), TickValue::Int64(10)),
                    ],
                )),
                TickValue::Object(ObjectValue::new(
                    "md.Entry",
                    // qty absent for this element
                    vec![("px".to_string(), TickValue::F64(2.0))],
                )),
            ])],
        );
        writer.send(&record).unwrap();

        let codec = writer.codecs.get(&0).unwrap();
        let row = &codec.rows[0];
        // Columns: partition, timestamp, instrument, type, entries.type,
        // entries.px, entries.qty.
        assert_eq!(
            row.values[4],
            Cell::Array(vec![
                Cell::String("md.Entry".to_string()),
                Cell::String("md.Entry".to_string())
            ])
        );
        assert_eq!(
            row.values[5],
            Cell::Array(vec![Cell::F64(1.0), Cell::F64(2.0)])
        );
        assert_eq!(
            row.values[6],
            Cell::Array(vec![Cell::I64(10), Cell::Null])
        );
    }

    #[test]
    fn test_null_object_propagates_recursively() {
        let attrs = RecordType {
            name: "md.Attrs".to_string(),
            fields: vec![
                field("level", FieldKind::Int { width: 4 }, false),
                field("note", FieldKind::Varchar, true),
            ],
        };
        let quote = RecordType {
            name: "md.Quote".to_string(),
            fields: vec![FieldDescriptor {
                name: "attrs".to_string(),
                kind: FieldKind::Object(vec![attrs]),
                nullable: true,
            }],
        };
        let types = [quote];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(0, 9, "AAPL", vec![TickValue::Null]);
        writer.send(&record).unwrap();

        let codec = writer.codecs.get(&0).unwrap();
        let row = &codec.rows[0];
        // Columns: partition, timestamp, instrument, type, attrs_type,
        // attrs_level, attrs_note.
        assert_eq!(row.values[4], Cell::Null);
        assert_eq!(row.values[5], Cell::I32(0));
        assert_eq!(row.values[6], Cell::Null);
    }

    #[test]
    fn test_unknown_type_index_fails() {
        let types = [trade_type()];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(3, 1, "AAPL", vec![]);
        let error = writer.send(&record).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingRecordType);
    }

    #[test]
    fn test_send_after_close_fails() {
        let types = [trade_type()];
        let mut writer = writer_for(&types, &options());
        writer.close();
        let record = Record::new(0, 1, "AAPL", vec![]);
        let error = writer.send(&record).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_close_discards_pending_rows() {
        let types = [trade_type()];
        let mut writer = writer_for(&types, &options());
        let record = Record::new(
            0,
            1,
            "AAPL",
            vec![
                TickValue::Decimal64(Decimal64::parse("1").unwrap()),
                TickValue::Int64(1),
                TickValue::Null,
            ],
        );
        writer.send(&record).unwrap();
        writer.close();
        assert!(writer.codecs.is_empty());
    }
}
