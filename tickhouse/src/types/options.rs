use std::collections::HashMap;

use crate::types::RecordType;

/// Reserved type-table mapping key that routes every record type into a
/// single union table.
pub const ALL_TYPES: &str = "ALL_TYPES";

/// How resolved column names are built from source field descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `{simpleTypeName}_{fieldName}`.
    TypeAndName,
    /// The raw field name.
    Name,
    /// Field name plus a recursive datatype suffix.
    NameAndDatatype,
}

/// How existing target tables are treated when a replication run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Resume from the maximum already-replicated timestamp.
    Append,
    /// Drop and recreate the target tables.
    Rewrite,
}

/// Options steering schema translation and table routing.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    pub database: String,
    /// Base table name; per-type tables derive from it unless an explicit
    /// mapping overrides them.
    pub table: String,
    pub naming: NamingScheme,
    pub write_mode: WriteMode,
    pub include_partition_column: bool,
    /// Route each record type into its own table instead of one union table.
    pub split_by_type: bool,
    /// Explicit type name → table name overrides. The [`ALL_TYPES`] key
    /// routes every type into the named table.
    pub type_tables: HashMap<String, String>,
}

impl SchemaOptions {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            naming: NamingScheme::TypeAndName,
            write_mode: WriteMode::Append,
            include_partition_column: true,
            split_by_type: false,
            type_tables: HashMap::new(),
        }
    }

    pub fn with_naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_partition_column(mut self, include: bool) -> Self {
        self.include_partition_column = include;
        self
    }

    pub fn with_split_by_type(mut self, split: bool) -> Self {
        self.split_by_type = split;
        self
    }

    pub fn with_type_table(
        mut self,
        type_name: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        self.type_tables.insert(type_name.into(), table.into());
        self
    }

    /// Resolves the target table name for one record type.
    ///
    /// Precedence: exact type mapping, then the [`ALL_TYPES`] mapping, then
    /// the base table (suffixed with the type's simple name when splitting
    /// by type).
    pub fn table_for(&self, record_type: &RecordType) -> String {
        if let Some(table) = self.type_tables.get(&record_type.name) {
            return table.clone();
        }
        if let Some(table) = self.type_tables.get(ALL_TYPES) {
            return table.clone();
        }
        if self.split_by_type {
            format!("{}_{}", self.table, record_type.simple_name())
        } else {
            self.table.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;

    fn record_type(name: &str) -> RecordType {
        RecordType {
            name: name.to_string(),
            fields: vec![],
        }
    }

    #[test]
    fn test_table_for_precedence() {
        let options = SchemaOptions::new("ticks", "market_data")
            .with_split_by_type(true)
            .with_type_table("md.Trade", "trades_only");

        assert_eq!(options.table_for(&record_type("md.Trade")), "trades_only");
        assert_eq!(
            options.table_for(&record_type("md.Quote")),
            "market_data_Quote"
        );

        let unified = SchemaOptions::new("ticks", "market_data")
            .with_type_table(ALL_TYPES, "everything");
        assert_eq!(options.table_for(&record_type("md.Trade")), "trades_only");
        assert_eq!(unified.table_for(&record_type("md.Trade")), "everything");
    }

    #[test]
    fn test_table_for_union_default() {
        let options = SchemaOptions::new("ticks", "market_data");
        assert_eq!(options.table_for(&record_type("md.Quote")), "market_data");
    }
}
