use futures::{Stream, StreamExt};
use std::future::Future;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{NaturalKey, RawRecord, SurrogateKey, TableRow, TableSchema};

/// A store table loads are written to.
///
/// Every load is a full reload: tables are truncated first, then written once.
pub trait Sink {
    /// Removes every row of `tables` in a single operation.
    ///
    /// Tables referencing each other through foreign keys must be truncated together, so
    /// callers pass all tables of a layer at once, referencing tables first.
    fn truncate_tables(&self, tables: &[&TableSchema]) -> impl Future<Output = EtlResult<()>> + Send;

    /// Writes `rows` to `table` atomically.
    ///
    /// Either every row is committed or, on failure, none is. Called with an empty list
    /// when a load produced no rows.
    fn write_table_rows(
        &self,
        table: &TableSchema,
        rows: Vec<TableRow>,
    ) -> impl Future<Output = EtlResult<()>> + Send;

    /// Reads back the natural key to surrogate key pairs persisted in `table`.
    ///
    /// Rows with a null natural key are skipped. A null or non-integer surrogate key is an
    /// [`ErrorKind::InvalidData`] error.
    fn read_key_pairs(
        &self,
        table: &TableSchema,
        natural_key_column: &str,
        surrogate_key_column: &str,
    ) -> impl Future<Output = EtlResult<Vec<(NaturalKey, SurrogateKey)>>> + Send;
}

/// Collects `(natural, surrogate)` pairs from records projected as `[natural, surrogate]`.
pub(crate) async fn collect_key_pairs<S>(
    records: S,
    table: &TableSchema,
) -> EtlResult<Vec<(NaturalKey, SurrogateKey)>>
where
    S: Stream<Item = EtlResult<RawRecord>>,
{
    let mut pairs = Vec::new();

    let mut records = std::pin::pin!(records);
    while let Some(record) = records.next().await {
        let record = record?;
        let [natural, surrogate] = record.values() else {
            bail!(
                ErrorKind::SchemaError,
                "Key pair query returned an unexpected number of columns",
                table.name.to_string()
            );
        };

        let natural_key = NaturalKey::single(natural.clone());
        if natural_key.is_null() {
            continue;
        }

        let Some(surrogate_key) = surrogate.as_i64() else {
            bail!(
                ErrorKind::InvalidData,
                "Persisted surrogate key is not an integer",
                format!("table {}, natural key {natural_key}", table.name)
            );
        };

        pairs.push((natural_key, SurrogateKey::new(surrogate_key)));
    }

    Ok(pairs)
}
