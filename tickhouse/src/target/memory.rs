use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::TickResult;
use crate::target::base::TargetClient;
use crate::types::{Cell, Row, TableDeclaration};

#[derive(Debug, Default)]
struct Inner {
    /// Qualified table name → (declaration, inserted rows with their columns).
    tables: HashMap<String, StoredTable>,
}

#[derive(Debug)]
struct StoredTable {
    declaration: TableDeclaration,
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// An in-memory target used by tests; mimics the real client's visible
/// behavior including timestamp scans and boundary deletes.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-creates a table with an arbitrary column description, as if left
    /// behind by an earlier run or an operator.
    pub async fn seed_table(&self, table: &TableDeclaration) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            table.qualified_name(),
            StoredTable {
                declaration: table.clone(),
                columns: table.flattened().into_iter().map(|(n, _)| n).collect(),
                rows: Vec::new(),
            },
        );
    }

    /// Appends rows directly, bypassing the insert path.
    pub async fn seed_rows(&self, table: &TableDeclaration, rows: Vec<Row>) {
        let mut inner = self.inner.lock().await;
        if let Some(stored) = inner.tables.get_mut(&table.qualified_name()) {
            stored.rows.extend(rows);
        }
    }

    pub async fn table_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut names: Vec<_> = inner.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn table_rows(&self, table: &TableDeclaration) -> Vec<Row> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&table.qualified_name())
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub async fn table_columns(&self, table: &TableDeclaration) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&table.qualified_name())
            .map(|t| t.columns.clone())
            .unwrap_or_default()
    }
}

fn row_timestamp(stored: &StoredTable, row: &Row) -> Option<i64> {
    let index = stored.columns.iter().position(|c| c == "timestamp")?;
    match row.values.get(index) {
        Some(Cell::DateTime64(nanos)) => Some(*nanos),
        _ => None,
    }
}

impl TargetClient for MemoryTarget {
    async fn describe_table(
        &self,
        table: &TableDeclaration,
    ) -> TickResult<Option<HashMap<String, String>>> {
        let inner = self.inner.lock().await;
        Ok(inner.tables.get(&table.qualified_name()).map(|stored| {
            stored
                .declaration
                .flattened()
                .into_iter()
                .map(|(name, kind)| (name, kind.sql_type()))
                .collect()
        }))
    }

    async fn create_table(&self, table: &TableDeclaration) -> TickResult<()> {
        info!(table = table.qualified_name(), "creating in-memory table");
        self.seed_table(table).await;
        Ok(())
    }

    async fn drop_table(&self, table: &TableDeclaration) -> TickResult<()> {
        info!(table = table.qualified_name(), "dropping in-memory table");
        let mut inner = self.inner.lock().await;
        inner.tables.remove(&table.qualified_name());
        Ok(())
    }

    async fn max_timestamp(&self, table: &TableDeclaration) -> TickResult<Option<i64>> {
        let inner = self.inner.lock().await;
        let Some(stored) = inner.tables.get(&table.qualified_name()) else {
            return Ok(None);
        };
        Ok(stored
            .rows
            .iter()
            .filter_map(|row| row_timestamp(stored, row))
            .max())
    }

    async fn delete_at_timestamp(
        &self,
        table: &TableDeclaration,
        timestamp_nanos: i64,
    ) -> TickResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(stored) = inner.tables.get_mut(&table.qualified_name()) {
            let keep: Vec<Row> = stored
                .rows
                .iter()
                .filter(|row| row_timestamp(stored, row) != Some(timestamp_nanos))
                .cloned()
                .collect();
            stored.rows = keep;
        }
        Ok(())
    }

    async fn insert_rows(
        &self,
        table: &TableDeclaration,
        columns: &[String],
        rows: &[Row],
    ) -> TickResult<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .tables
            .entry(table.qualified_name())
            .or_insert_with(|| StoredTable {
                declaration: table.clone(),
                columns: columns.to_vec(),
                rows: Vec::new(),
            });
        stored.columns = columns.to_vec();
        stored.rows.extend(rows.iter().cloned());
        Ok(())
    }
}
