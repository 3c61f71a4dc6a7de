use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ErrorKind, EtlResult};
use crate::source::{RecordStream, SelectQuery, SortDirection, Source};
use crate::store::Sink;
use crate::store::base::collect_key_pairs;
use crate::types::{Cell, NaturalKey, RawRecord, SurrogateKey, TableName, TableRow, TableSchema};
use crate::{bail, etl_error};

#[derive(Debug)]
struct StoredTable {
    columns: Arc<[String]>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<TableName, StoredTable>,
}

/// In-memory store for tests and dry runs.
///
/// [`MemoryStore`] acts both as a [`Source`] and a [`Sink`], so the same instance can hold
/// the bronze extracts and receive the silver and gold layers. It does not rank
/// partitions itself, deduplication happens on the caller side.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `table` with `rows`, replacing any previous content.
    pub async fn insert_table(
        &self,
        table: TableName,
        columns: &[&str],
        rows: Vec<Vec<Cell>>,
    ) -> EtlResult<()> {
        let columns: Arc<[String]> = columns.iter().map(|column| column.to_string()).collect();
        check_widths(&table, &columns, rows.iter().map(Vec::len))?;

        let mut inner = self.inner.lock().await;
        inner.tables.insert(table, StoredTable { columns, rows });

        Ok(())
    }

    /// Returns a copy of the rows of `table`, or [`None`] if it was never created.
    pub async fn table_rows(&self, table: &TableName) -> Option<Vec<TableRow>> {
        let inner = self.inner.lock().await;
        inner.tables.get(table).map(|stored| {
            stored
                .rows
                .iter()
                .map(|row| TableRow::new(row.clone()))
                .collect()
        })
    }
}

impl Source for MemoryStore {
    async fn execute_query(&self, query: &SelectQuery) -> EtlResult<RecordStream> {
        if query.rank.is_some() {
            bail!(
                ErrorKind::InvalidState,
                "Ranked queries are not supported by the memory store",
                query.table.to_string()
            );
        }

        let inner = self.inner.lock().await;
        let Some(stored) = inner.tables.get(&query.table) else {
            bail!(
                ErrorKind::MissingTable,
                "Table does not exist",
                query.table.to_string()
            );
        };

        let projection = query
            .columns
            .iter()
            .map(|column| column_position(stored, &query.table, column))
            .collect::<EtlResult<Vec<_>>>()?;
        let order = query
            .order_by
            .iter()
            .map(|(column, direction)| {
                column_position(stored, &query.table, column).map(|index| (index, *direction))
            })
            .collect::<EtlResult<Vec<_>>>()?;

        let mut rows = stored.rows.iter().collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            order
                .iter()
                .map(|(index, direction)| compare_nulls_last(&a[*index], &b[*index], *direction))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let columns: Arc<[String]> = query.columns.iter().cloned().collect();
        let records = rows
            .into_iter()
            .map(|row| {
                let values = projection.iter().map(|index| row[*index].clone()).collect();
                RawRecord::new(columns.clone(), values)
            })
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(RecordStream::from_records(columns, records))
    }
}

impl Sink for MemoryStore {
    async fn truncate_tables(&self, tables: &[&TableSchema]) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        for table in tables {
            info!(table = %table.name, "truncating table");
            let stored = inner
                .tables
                .entry(table.name.clone())
                .or_insert_with(|| StoredTable {
                    columns: table.columns().clone(),
                    rows: Vec::new(),
                });
            stored.rows.clear();
        }

        Ok(())
    }

    async fn write_table_rows(&self, table: &TableSchema, rows: Vec<TableRow>) -> EtlResult<()> {
        check_widths(
            &table.name,
            table.columns(),
            rows.iter().map(|row| row.values().len()),
        )?;

        let mut inner = self.inner.lock().await;
        info!(table = %table.name, row_count = rows.len(), "writing table rows");

        let stored = inner
            .tables
            .entry(table.name.clone())
            .or_insert_with(|| StoredTable {
                columns: table.columns().clone(),
                rows: Vec::new(),
            });
        stored
            .rows
            .extend(rows.into_iter().map(TableRow::into_values));

        Ok(())
    }

    async fn read_key_pairs(
        &self,
        table: &TableSchema,
        natural_key_column: &str,
        surrogate_key_column: &str,
    ) -> EtlResult<Vec<(NaturalKey, SurrogateKey)>> {
        let query = SelectQuery::new(
            table.name.clone(),
            &[natural_key_column, surrogate_key_column],
        );
        let records = self.execute_query(&query).await?;

        collect_key_pairs(records, table).await
    }
}

fn column_position(stored: &StoredTable, table: &TableName, column: &str) -> EtlResult<usize> {
    stored
        .columns
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| {
            etl_error!(
                ErrorKind::SchemaError,
                "Column does not exist",
                format!("column `{column}` of table {table}")
            )
        })
}

fn check_widths(
    table: &TableName,
    columns: &[String],
    widths: impl Iterator<Item = usize>,
) -> EtlResult<()> {
    for width in widths {
        if width != columns.len() {
            bail!(
                ErrorKind::InvalidData,
                "Row width does not match table columns",
                format!(
                    "table {table} has {} columns, row has {width} values",
                    columns.len()
                )
            );
        }
    }

    Ok(())
}

/// Orders cells with nulls last in both directions, like `nulls last` in SQL.
fn compare_nulls_last(a: &Cell, b: &Cell, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.compare(b).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    }
}
