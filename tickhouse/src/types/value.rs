use std::str::FromStr;
use std::sync::LazyLock;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate};

use crate::error::{TickError, TickResult};
use crate::types::TypeIndex;

/// Largest value representable by the target Decimal(38, 12) column.
///
/// Decimal values and the decimal64 sentinel max/min and infinities are clamped
/// to this boundary rather than rejected.
pub const DECIMAL_MAX_STR: &str = "99999999999999999999999999.999999999999";

/// Lower bound of the target DateTime64(9) range, in nanoseconds since epoch
/// (1900-01-01 00:00:00 UTC).
pub const DATETIME64_MIN_NANOS: i64 = -2_208_988_800_000_000_000;

/// Upper bound of the target DateTime64(9) range, in nanoseconds since epoch
/// (2262-04-11, the i64 nanosecond limit).
pub const DATETIME64_MAX_NANOS: i64 = i64::MAX;

static DECIMAL_MAX: LazyLock<BigDecimal> =
    LazyLock::new(|| BigDecimal::from_str(DECIMAL_MAX_STR).expect("decimal max literal is valid"));

/// Returns the largest representable target decimal value.
pub fn decimal_max() -> &'static BigDecimal {
    &DECIMAL_MAX
}

/// A 64-bit decimal float value in its canonical decoded form.
///
/// The source encodes special values as sentinels; only the infinities need a
/// distinct representation here, the sentinel max/min decode into ordinary
/// values beyond the target range and get clamped on encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Decimal64 {
    PositiveInfinity,
    NegativeInfinity,
    Value(BigDecimal),
}

impl Decimal64 {
    /// Parses a decimal from its canonical string form.
    pub fn parse(input: &str) -> TickResult<Decimal64> {
        match input.trim() {
            "Infinity" | "+Infinity" => Ok(Decimal64::PositiveInfinity),
            "-Infinity" => Ok(Decimal64::NegativeInfinity),
            other => Ok(Decimal64::Value(BigDecimal::from_str(other)?)),
        }
    }
}

impl From<BigDecimal> for Decimal64 {
    fn from(value: BigDecimal) -> Self {
        Decimal64::Value(value)
    }
}

/// A nested object value: the concrete type name plus the fields the source
/// actually carried for this instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub type_name: String,
    pub fields: Vec<(String, TickValue)>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, TickValue)>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Looks up a field value by source field name.
    pub fn field(&self, name: &str) -> Option<&TickValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// A decoded source field value.
#[derive(Debug, Clone, PartialEq)]
pub enum TickValue {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    F32(f32),
    F64(f64),
    Decimal64(Decimal64),
    Bool(bool),
    Char(char),
    Varchar(String),
    Binary(Vec<u8>),
    /// Enum constant name.
    Enum(String),
    /// Nanoseconds since epoch.
    Timestamp(i64),
    /// Milliseconds since midnight.
    TimeOfDay(i32),
    Array(Vec<TickValue>),
    Object(ObjectValue),
}

impl TickValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TickValue::Null)
    }
}

/// One record read from the source cursor.
///
/// `values` is aligned with the field order of the record type identified by
/// `type_index`; absent fields are [`TickValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_index: TypeIndex,
    /// Nanoseconds since epoch.
    pub timestamp: i64,
    pub instrument: String,
    pub values: Vec<TickValue>,
}

impl Record {
    pub fn new(
        type_index: TypeIndex,
        timestamp: i64,
        instrument: impl Into<String>,
        values: Vec<TickValue>,
    ) -> Self {
        Self {
            type_index,
            timestamp,
            instrument: instrument.into(),
            values,
        }
    }
}

/// An encoded target column value.
///
/// Cells are what the codec engine produces and what the target client binds
/// into batch inserts, in flattened column order.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    UInt8(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(BigDecimal),
    String(String),
    Binary(Vec<u8>),
    /// Nanoseconds since epoch.
    DateTime64(i64),
    Date(NaiveDate),
    Array(Vec<Cell>),
}

/// A complete encoded row in flattened column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Cell>,
}

impl Row {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }
}

/// Converts an epoch-nanosecond timestamp into the date used for the partition
/// column.
pub fn partition_date(timestamp_nanos: i64) -> NaiveDate {
    let secs = timestamp_nanos.div_euclid(1_000_000_000);
    let nanos = timestamp_nanos.rem_euclid(1_000_000_000) as u32;

    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date is valid"))
}

/// Clamps an epoch-nanosecond timestamp to the representable DateTime64(9)
/// range. Out-of-range values are silently clamped, never rejected.
pub fn clamp_timestamp(timestamp_nanos: i64) -> i64 {
    timestamp_nanos.clamp(DATETIME64_MIN_NANOS, DATETIME64_MAX_NANOS)
}

/// Clamps a decimal to the representable Decimal(38, 12) range.
pub fn clamp_decimal(value: BigDecimal) -> BigDecimal {
    let max = decimal_max();
    if value > *max {
        max.clone()
    } else if value < -max {
        -max.clone()
    } else {
        value
    }
}

/// Re-encodes a decimal64 value for the target decimal column, clamping the
/// infinities and any out-of-range magnitude to the representable boundary.
pub fn encode_decimal64(value: &Decimal64) -> BigDecimal {
    match value {
        Decimal64::PositiveInfinity => decimal_max().clone(),
        Decimal64::NegativeInfinity => -decimal_max().clone(),
        Decimal64::Value(v) => clamp_decimal(v.clone()),
    }
}

impl TryFrom<&str> for Decimal64 {
    type Error = TickError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Decimal64::parse(value)
    }
}

impl FromStr for Decimal64 {
    type Err = TickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal64::parse(s)
    }
}

impl TickValue {
    /// Parses a decimal field value from its canonical string form.
    pub fn decimal_from_str(input: &str) -> TickResult<TickValue> {
        Decimal64::parse(input).map(TickValue::Decimal64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse_infinities() {
        assert_eq!(
            Decimal64::parse("Infinity").unwrap(),
            Decimal64::PositiveInfinity
        );
        assert_eq!(
            Decimal64::parse("-Infinity").unwrap(),
            Decimal64::NegativeInfinity
        );
        assert_eq!(
            Decimal64::parse("12.5").unwrap(),
            Decimal64::Value(BigDecimal::from_str("12.5").unwrap())
        );
    }

    #[test]
    fn test_encode_decimal64_clamps_infinities() {
        assert_eq!(
            encode_decimal64(&Decimal64::PositiveInfinity),
            *decimal_max()
        );
        assert_eq!(
            encode_decimal64(&Decimal64::NegativeInfinity),
            -decimal_max().clone()
        );
    }

    #[test]
    fn test_encode_decimal64_clamps_out_of_range() {
        let beyond = BigDecimal::from_str("1e30").unwrap();
        assert_eq!(
            encode_decimal64(&Decimal64::Value(beyond)),
            *decimal_max()
        );

        let in_range = BigDecimal::from_str("-42.000000000001").unwrap();
        assert_eq!(
            encode_decimal64(&Decimal64::Value(in_range.clone())),
            in_range
        );
    }

    #[test]
    fn test_clamp_timestamp() {
        assert_eq!(clamp_timestamp(0), 0);
        assert_eq!(clamp_timestamp(i64::MIN), DATETIME64_MIN_NANOS);
    }

    #[test]
    fn test_partition_date() {
        // 2024-03-15 12:00:00 UTC
        let ts = 1_710_504_000_000_000_000;
        assert_eq!(
            partition_date(ts),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }
}
