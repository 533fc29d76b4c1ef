use std::collections::HashMap;
use std::future::Future;

use crate::error::TickResult;
use crate::types::{Row, TableDeclaration};

/// A target store capable of table introspection, DDL, bounded deletes, and
/// batched inserts.
///
/// One client instance is owned exclusively by one replication run.
pub trait TargetClient {
    /// Returns the flat column name → type spelling description of an
    /// existing table, or `None` when the table does not exist.
    fn describe_table(
        &self,
        table: &TableDeclaration,
    ) -> impl Future<Output = TickResult<Option<HashMap<String, String>>>> + Send;

    fn create_table(
        &self,
        table: &TableDeclaration,
    ) -> impl Future<Output = TickResult<()>> + Send;

    fn drop_table(&self, table: &TableDeclaration) -> impl Future<Output = TickResult<()>> + Send;

    /// Returns the maximum replicated record timestamp in nanoseconds, or
    /// `None` when the table is empty or absent.
    fn max_timestamp(
        &self,
        table: &TableDeclaration,
    ) -> impl Future<Output = TickResult<Option<i64>>> + Send;

    /// Deletes the rows whose timestamp equals `timestamp_nanos` exactly.
    fn delete_at_timestamp(
        &self,
        table: &TableDeclaration,
        timestamp_nanos: i64,
    ) -> impl Future<Output = TickResult<()>> + Send;

    /// Inserts encoded rows; `columns` names the flattened columns in the
    /// order the row cells are laid out.
    fn insert_rows(
        &self,
        table: &TableDeclaration,
        columns: &[String],
        rows: &[Row],
    ) -> impl Future<Output = TickResult<()>> + Send;
}
