use std::collections::HashMap;
use std::fmt::Write;

use clickhouse::{sql::Identifier, Client, Row as ChRow};
use serde::Deserialize;
use tracing::info;

use crate::error::TickResult;
use crate::target::base::TargetClient;
use crate::types::{Cell, Row, TableDeclaration};

/// Rows per INSERT statement.
const INSERT_BATCH_SIZE: usize = 10000;

#[derive(ChRow, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(ChRow, Deserialize)]
struct MaxTimestampRow {
    count: u64,
    max: i64,
}

#[derive(ChRow, Deserialize)]
struct ColumnRow {
    name: String,
    column_type: String,
}

/// ClickHouse target client.
///
/// DDL and inserts are issued as SQL text; values are rendered inline, which
/// keeps the insert path independent of per-column binary encodings for
/// nested and decimal columns.
#[derive(Clone)]
pub struct ClickHouseClient {
    client: Client,
}

impl ClickHouseClient {
    pub fn new(url: &str, database: impl Into<String>) -> ClickHouseClient {
        let client = Client::default()
            .with_url(url)
            .with_database(database.into());
        ClickHouseClient { client }
    }

    pub fn new_with_credentials(
        url: &str,
        database: impl Into<String>,
        username: &str,
        password: &str,
    ) -> ClickHouseClient {
        let client = Client::default()
            .with_url(url)
            .with_user(username)
            .with_password(password)
            .with_database(database.into());
        ClickHouseClient { client }
    }

    async fn table_exists(&self, table: &TableDeclaration) -> TickResult<bool> {
        let row: CountRow = self
            .client
            .query("SELECT count() AS count FROM system.tables WHERE database = ? AND name = ?")
            .bind(&table.database)
            .bind(&table.name)
            .fetch_one()
            .await?;
        Ok(row.count > 0)
    }

    fn create_columns_spec(table: &TableDeclaration) -> String {
        let mut s = String::new();
        s.push('(');
        let flattened = table.flattened();
        for (i, (name, kind)) in flattened.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            let _ = write!(s, "`{name}` {}", kind.sql_type());
        }
        s.push_str(") ENGINE = MergeTree() ");

        if let Some(partition) = table.partition_column() {
            let _ = write!(s, "PARTITION BY `{}` ", partition.name);
        }
        let index_columns = table.index_columns();
        if index_columns.is_empty() {
            s.push_str("ORDER BY tuple()");
        } else {
            let quoted: Vec<String> = index_columns.iter().map(|c| format!("`{c}`")).collect();
            let _ = write!(s, "ORDER BY ({})", quoted.join(", "));
        }
        s
    }

    fn create_insert_batch_queries(
        table: &TableDeclaration,
        columns: &[String],
        rows: &[Row],
    ) -> Vec<String> {
        let mut batch_queries = Vec::new();
        for chunk in rows.chunks(INSERT_BATCH_SIZE) {
            let mut query = format!("INSERT INTO {} (", table.qualified_name());
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    query.push(',');
                }
                let _ = write!(query, "`{column}`");
            }
            query.push_str(") VALUES");

            for (i, row) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push('(');
                for (j, value) in row.values.iter().enumerate() {
                    if j > 0 {
                        query.push(',');
                    }
                    Self::cell_to_query_value(value, &mut query);
                }
                query.push(')');
            }
            batch_queries.push(query);
        }
        batch_queries
    }

    fn cell_to_query_value(cell: &Cell, s: &mut String) {
        match cell {
            Cell::Null => s.push_str("NULL"),
            Cell::UInt8(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::I8(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::I16(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::I32(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::I64(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::F32(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::F64(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::Decimal(v) => {
                let _ = write!(s, "{v}");
            }
            Cell::String(v) => {
                let escaped = v.replace('\\', "\\\\").replace('\'', "\\'").replace('?', "??");
                let _ = write!(s, "'{escaped}'");
            }
            Cell::Binary(bytes) => {
                let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
                let _ = write!(s, "unhex('{hex}')");
            }
            Cell::DateTime64(nanos) => {
                let _ = write!(s, "fromUnixTimestamp64Nano({nanos})");
            }
            Cell::Date(date) => {
                let _ = write!(s, "'{}'", date.format("%Y-%m-%d"));
            }
            Cell::Array(cells) => {
                s.push('[');
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    Self::cell_to_query_value(cell, s);
                }
                s.push(']');
            }
        }
    }
}

impl TargetClient for ClickHouseClient {
    async fn describe_table(
        &self,
        table: &TableDeclaration,
    ) -> TickResult<Option<HashMap<String, String>>> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }
        let rows: Vec<ColumnRow> = self
            .client
            .query(
                "SELECT name, type AS column_type FROM system.columns \
                 WHERE database = ? AND table = ?",
            )
            .bind(&table.database)
            .bind(&table.name)
            .fetch_all()
            .await?;
        Ok(Some(
            rows.into_iter()
                .map(|row| (row.name, row.column_type))
                .collect(),
        ))
    }

    async fn create_table(&self, table: &TableDeclaration) -> TickResult<()> {
        let columns_spec = Self::create_columns_spec(table);
        info!(table = table.qualified_name(), "creating table");
        let query = format!(
            "CREATE TABLE IF NOT EXISTS {} {}",
            table.qualified_name(),
            columns_spec
        );
        self.client.query(&query).execute().await?;
        Ok(())
    }

    async fn drop_table(&self, table: &TableDeclaration) -> TickResult<()> {
        info!(table = table.qualified_name(), "dropping table");
        let query = format!("DROP TABLE IF EXISTS {}", table.qualified_name());
        self.client.query(&query).execute().await?;
        Ok(())
    }

    async fn max_timestamp(&self, table: &TableDeclaration) -> TickResult<Option<i64>> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }
        // count() disambiguates an empty table from a genuine max of zero.
        let row: MaxTimestampRow = self
            .client
            .query(
                "SELECT count() AS count, max(toUnixTimestamp64Nano(timestamp)) AS max \
                 FROM ?.?",
            )
            .bind(Identifier(&table.database))
            .bind(Identifier(&table.name))
            .fetch_one()
            .await?;
        if row.count == 0 {
            return Ok(None);
        }
        Ok(Some(row.max))
    }

    async fn delete_at_timestamp(
        &self,
        table: &TableDeclaration,
        timestamp_nanos: i64,
    ) -> TickResult<()> {
        info!(
            table = table.qualified_name(),
            timestamp_nanos, "deleting rows at the resume boundary"
        );
        let query = format!(
            "ALTER TABLE {} DELETE WHERE toUnixTimestamp64Nano(timestamp) = {} \
             SETTINGS mutations_sync = 2",
            table.qualified_name(),
            timestamp_nanos
        );
        self.client.query(&query).execute().await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        table: &TableDeclaration,
        columns: &[String],
        rows: &[Row],
    ) -> TickResult<()> {
        let batch_queries = Self::create_insert_batch_queries(table, columns, rows);
        for query in batch_queries {
            self.client.query(&query).execute().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{ColumnDeclaration, ColumnKind, ScalarKind};

    fn table() -> TableDeclaration {
        TableDeclaration::new(
            "ticks",
            "market_data",
            vec![
                ColumnDeclaration::new("partition", ColumnKind::Scalar(ScalarKind::Date))
                    .with_partition(),
                ColumnDeclaration::new("timestamp", ColumnKind::Scalar(ScalarKind::DateTime64))
                    .with_index(),
                ColumnDeclaration::new("instrument", ColumnKind::Scalar(ScalarKind::String))
                    .with_index(),
                ColumnDeclaration::new(
                    "entries",
                    ColumnKind::Nested(vec![ColumnDeclaration::new(
                        "px",
                        ColumnKind::Scalar(ScalarKind::Float64),
                    )]),
                ),
            ],
        )
    }

    #[test]
    fn test_create_columns_spec() {
        let spec = ClickHouseClient::create_columns_spec(&table());
        assert_eq!(
            spec,
            "(`partition` Date,`timestamp` DateTime64(9),`instrument` String,\
             `entries.px` Array(Float64)) ENGINE = MergeTree() \
             PARTITION BY `partition` ORDER BY (`timestamp`, `instrument`)"
        );
    }

    #[test]
    fn test_create_columns_spec_without_partition() {
        let mut table = table();
        table.columns.remove(0);
        let spec = ClickHouseClient::create_columns_spec(&table);
        assert!(spec.contains("ENGINE = MergeTree() ORDER BY (`timestamp`, `instrument`)"));
        assert!(!spec.contains("PARTITION BY"));
    }

    #[test]
    fn test_cell_rendering() {
        let mut s = String::new();
        ClickHouseClient::cell_to_query_value(&Cell::Null, &mut s);
        s.push(' ');
        ClickHouseClient::cell_to_query_value(
            &Cell::String("it's ?".to_string()),
            &mut s,
        );
        s.push(' ');
        ClickHouseClient::cell_to_query_value(&Cell::DateTime64(123), &mut s);
        s.push(' ');
        ClickHouseClient::cell_to_query_value(
            &Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            &mut s,
        );
        s.push(' ');
        ClickHouseClient::cell_to_query_value(&Cell::Binary(vec![0xde, 0xad]), &mut s);
        s.push(' ');
        ClickHouseClient::cell_to_query_value(
            &Cell::Decimal(BigDecimal::from_str("12.5").unwrap()),
            &mut s,
        );
        assert_eq!(
            s,
            "NULL 'it\\'s ??' fromUnixTimestamp64Nano(123) '2024-03-01' unhex('dead') 12.5"
        );
    }

    #[test]
    fn test_insert_batch_query() {
        let table = table();
        let columns = vec![
            "timestamp".to_string(),
            "entries.px".to_string(),
        ];
        let rows = vec![Row::new(vec![
            Cell::DateTime64(1),
            Cell::Array(vec![Cell::F64(1.5), Cell::F64(2.5)]),
        ])];
        let queries = ClickHouseClient::create_insert_batch_queries(&table, &columns, &rows);
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0],
            "INSERT INTO ticks.market_data (`timestamp`,`entries.px`) VALUES\
             (fromUnixTimestamp64Nano(1),[1.5, 2.5])"
        );
    }

    #[test]
    fn test_insert_batches_are_chunked() {
        let table = table();
        let columns = vec!["timestamp".to_string()];
        let rows: Vec<Row> = (0..INSERT_BATCH_SIZE + 1)
            .map(|i| Row::new(vec![Cell::DateTime64(i as i64)]))
            .collect();
        let queries = ClickHouseClient::create_insert_batch_queries(&table, &columns, &rows);
        assert_eq!(queries.len(), 2);
    }
}
