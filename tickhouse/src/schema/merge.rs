use std::collections::HashMap;

use tracing::warn;

use crate::bail;
use crate::error::{ErrorKind, TickError, TickResult};
use crate::types::{ColumnDeclaration, ColumnKind, TableDeclaration};

/// Reconciles a translated table declaration against the column description
/// of a pre-existing target table.
///
/// The actual description maps flat column names to their type spellings,
/// which is exactly what `system.columns` reports.
pub struct TableSchemaMerger;

impl TableSchemaMerger {
    /// Filters `expected` down to the columns actually present in the target
    /// with a matching type. A present column with a different type fails;
    /// an absent column is dropped with a warning and flags the result as
    /// changed. The filtered declaration is the only safe insert target.
    pub fn merge(
        expected: &TableDeclaration,
        actual: &HashMap<String, String>,
    ) -> TickResult<(TableDeclaration, bool)> {
        let mut changed = false;
        let mut columns = Vec::with_capacity(expected.columns.len());
        for column in &expected.columns {
            if let Some(kept) =
                merge_column("", column, actual, &expected.name, false, &mut changed)?
            {
                columns.push(kept);
            }
        }
        let filtered = TableDeclaration::new(
            expected.database.clone(),
            expected.name.clone(),
            columns,
        );
        Ok((filtered, changed))
    }
}

fn merge_column(
    prefix: &str,
    column: &ColumnDeclaration,
    actual: &HashMap<String, String>,
    table: &str,
    in_nested: bool,
    changed: &mut bool,
) -> TickResult<Option<ColumnDeclaration>> {
    match &column.kind {
        ColumnKind::Object(children) => {
            let child_prefix = format!("{prefix}{}_", column.name);
            let mut kept = Vec::new();
            for child in children {
                if let Some(child) =
                    merge_column(&child_prefix, child, actual, table, in_nested, changed)?
                {
                    kept.push(child);
                }
            }
            if kept.is_empty() {
                warn!(
                    table,
                    column = format!("{prefix}{}", column.name),
                    "dropping object column absent from the existing table"
                );
                *changed = true;
                return Ok(None);
            }
            Ok(Some(ColumnDeclaration {
                kind: ColumnKind::Object(kept),
                ..column.clone()
            }))
        }
        ColumnKind::Nested(children) => {
            let child_prefix = format!("{prefix}{}.", column.name);
            let mut kept = Vec::new();
            for child in children {
                if let Some(child) =
                    merge_column(&child_prefix, child, actual, table, true, changed)?
                {
                    kept.push(child);
                }
            }
            if kept.is_empty() {
                warn!(
                    table,
                    column = format!("{prefix}{}", column.name),
                    "dropping nested column absent from the existing table"
                );
                *changed = true;
                return Ok(None);
            }
            Ok(Some(ColumnDeclaration {
                kind: ColumnKind::Nested(kept),
                ..column.clone()
            }))
        }
        kind => {
            let flat = format!("{prefix}{}", column.name);
            let expected_spelling = if in_nested {
                ColumnKind::array(kind.clone()).sql_type()
            } else {
                kind.sql_type()
            };
            match actual.get(&flat) {
                None => {
                    warn!(
                        table,
                        column = flat,
                        "dropping column absent from the existing table"
                    );
                    *changed = true;
                    Ok(None)
                }
                Some(spelling) if *spelling == expected_spelling => Ok(Some(column.clone())),
                Some(spelling) => {
                    bail!(
                        ErrorKind::ExistingTableMismatch,
                        "Existing table does not match the translated schema",
                        format!(
                            "column `{flat}` of table `{table}` is declared `{spelling}` but translates to `{expected_spelling}`"
                        )
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    fn expected_table() -> TableDeclaration {
        TableDeclaration::new(
            "ticks",
            "market_data",
            vec![
                ColumnDeclaration::new("timestamp", ColumnKind::Scalar(ScalarKind::DateTime64))
                    .with_index(),
                ColumnDeclaration::new("price", ColumnKind::Scalar(ScalarKind::Decimal)),
                ColumnDeclaration::new(
                    "attrs",
                    ColumnKind::Object(vec![
                        ColumnDeclaration::new(
                            "type",
                            ColumnKind::nullable(ColumnKind::Scalar(ScalarKind::String)),
                        ),
                        ColumnDeclaration::new("level", ColumnKind::Scalar(ScalarKind::Int32)),
                    ]),
                ),
                ColumnDeclaration::new(
                    "entries",
                    ColumnKind::Nested(vec![
                        ColumnDeclaration::new("type", ColumnKind::Scalar(ScalarKind::String)),
                        ColumnDeclaration::new("px", ColumnKind::Scalar(ScalarKind::Float64)),
                    ]),
                ),
            ],
        )
    }

    fn full_actual() -> HashMap<String, String> {
        [
            ("timestamp", "DateTime64(9)"),
            ("price", "Decimal(38, 12)"),
            ("attrs_type", "Nullable(String)"),
            ("attrs_level", "Int32"),
            ("entries.type", "Array(String)"),
            ("entries.px", "Array(Float64)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_identical_schema_is_unchanged() {
        let (filtered, changed) =
            TableSchemaMerger::merge(&expected_table(), &full_actual()).unwrap();
        assert!(!changed);
        assert_eq!(filtered, expected_table());
    }

    #[test]
    fn test_absent_columns_are_dropped() {
        let mut actual = full_actual();
        actual.remove("price");
        actual.remove("attrs_level");
        let (filtered, changed) = TableSchemaMerger::merge(&expected_table(), &actual).unwrap();
        assert!(changed);
        assert!(filtered.columns.iter().all(|c| c.name != "price"));
        let attrs = filtered.columns.iter().find(|c| c.name == "attrs").unwrap();
        match &attrs.kind {
            ColumnKind::Object(children) => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0].name, "type");
            }
            other => panic!("expected object column, got {other:?}"),
        }
    }

    #[test]
    fn test_fully_absent_object_is_dropped() {
        let mut actual = full_actual();
        actual.remove("attrs_type");
        actual.remove("attrs_level");
        let (filtered, changed) = TableSchemaMerger::merge(&expected_table(), &actual).unwrap();
        assert!(changed);
        assert!(filtered.columns.iter().all(|c| c.name != "attrs"));
    }

    #[test]
    fn test_type_mismatch_fails() {
        let mut actual = full_actual();
        actual.insert("price".to_string(), "Float64".to_string());
        let error = TableSchemaMerger::merge(&expected_table(), &actual).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ExistingTableMismatch);
    }

    #[test]
    fn test_nested_children_compare_as_arrays() {
        let mut actual = full_actual();
        actual.insert("entries.px".to_string(), "Float64".to_string());
        let error = TableSchemaMerger::merge(&expected_table(), &actual).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ExistingTableMismatch);
    }
}
