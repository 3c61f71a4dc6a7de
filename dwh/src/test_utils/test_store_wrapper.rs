use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::source::{RecordStream, SelectQuery, Source};
use crate::store::Sink;
use crate::types::{NaturalKey, SurrogateKey, TableName, TableRow, TableSchema};

#[derive(Debug, Default)]
struct Inner {
    truncations: Vec<Vec<TableName>>,
    writes: Vec<(TableName, usize)>,
    failing_writes: HashSet<TableName>,
}

/// Test wrapper for stores that records every write and can fail writes to chosen tables.
///
/// Clones share the recorded calls, so a clone can be handed to the code under test while
/// the original is used for assertions.
#[derive(Debug, Clone)]
pub struct TestStoreWrapper<S> {
    store: S,
    inner: Arc<Mutex<Inner>>,
}

impl<S> TestStoreWrapper<S> {
    pub fn wrap(store: S) -> Self {
        Self {
            store,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Makes every later write to `table` fail with [`ErrorKind::StoreWriteFailed`].
    pub fn fail_writes_to(&self, table: TableName) {
        self.lock().failing_writes.insert(table);
    }

    /// Tables of every truncation, in call order.
    pub fn truncations(&self) -> Vec<Vec<TableName>> {
        self.lock().truncations.clone()
    }

    /// Table and row count of every successful write, in call order.
    pub fn writes(&self) -> Vec<(TableName, usize)> {
        self.lock().writes.clone()
    }

    /// Tables written successfully, in call order.
    pub fn written_tables(&self) -> Vec<TableName> {
        self.lock()
            .writes
            .iter()
            .map(|(table, _)| table.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S> Source for TestStoreWrapper<S>
where
    S: Source + Sync,
{
    fn supports_ranking(&self) -> bool {
        self.store.supports_ranking()
    }

    async fn execute_query(&self, query: &SelectQuery) -> EtlResult<RecordStream> {
        self.store.execute_query(query).await
    }
}

impl<S> Sink for TestStoreWrapper<S>
where
    S: Sink + Sync,
{
    async fn truncate_tables(&self, tables: &[&TableSchema]) -> EtlResult<()> {
        self.store.truncate_tables(tables).await?;
        self.lock()
            .truncations
            .push(tables.iter().map(|table| table.name.clone()).collect());

        Ok(())
    }

    async fn write_table_rows(&self, table: &TableSchema, rows: Vec<TableRow>) -> EtlResult<()> {
        if self.lock().failing_writes.contains(&table.name) {
            bail!(
                ErrorKind::StoreWriteFailed,
                "Injected write failure",
                table.name.to_string()
            );
        }

        let row_count = rows.len();
        self.store.write_table_rows(table, rows).await?;
        self.lock().writes.push((table.name.clone(), row_count));

        Ok(())
    }

    async fn read_key_pairs(
        &self,
        table: &TableSchema,
        natural_key_column: &str,
        surrogate_key_column: &str,
    ) -> EtlResult<Vec<(NaturalKey, SurrogateKey)>> {
        self.store
            .read_key_pairs(table, natural_key_column, surrogate_key_column)
            .await
    }
}
