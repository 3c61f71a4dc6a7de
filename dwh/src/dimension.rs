//! Natural key to surrogate key tables of the dimensions.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::{ErrorKind, EtlResult};
use crate::store::Sink;
use crate::types::{Cell, NaturalKey, SurrogateKey, TableRow, TableSchema};
use crate::{bail, etl_error};

/// Layout of a dimension table.
///
/// The first column of `schema` holds the surrogate key, the remaining columns are the
/// attributes, `natural_key_column` among them.
#[derive(Debug, Clone)]
pub struct DimensionSpec {
    pub schema: TableSchema,
    pub natural_key_column: String,
    /// Values substituted for null attributes, by column name.
    pub defaults: Vec<(String, Cell)>,
}

impl DimensionSpec {
    pub fn new(schema: TableSchema, natural_key_column: &str) -> Self {
        Self {
            schema,
            natural_key_column: natural_key_column.to_string(),
            defaults: Vec::new(),
        }
    }

    pub fn with_default(mut self, column: &str, value: impl Into<Cell>) -> Self {
        self.defaults.push((column.to_string(), value.into()));
        self
    }

    pub fn surrogate_key_column(&self) -> &str {
        self.schema.columns().first().map(String::as_str).unwrap_or_default()
    }

    fn attribute_count(&self) -> usize {
        self.schema.columns().len().saturating_sub(1)
    }
}

/// Maps the natural keys of one dimension to the surrogate keys allocated for them.
///
/// A table lives for one load cycle. Keys are allocated from [`SurrogateKey::FIRST`] in
/// first-insertion order and the first row inserted for a natural key wins: later
/// insertions return the existing key and their attributes are discarded.
///
/// Inserted rows are queued and persisted together by [`SurrogateKeyTable::flush`], but
/// [`SurrogateKeyTable::key_for`] sees every insertion immediately.
#[derive(Debug)]
pub struct SurrogateKeyTable {
    spec: DimensionSpec,
    /// Attribute positions (surrogate key column excluded) receiving a default.
    defaults: Vec<(usize, Cell)>,
    keys: HashMap<NaturalKey, SurrogateKey>,
    next_key: SurrogateKey,
    pending: Vec<TableRow>,
    repeated: u64,
}

impl SurrogateKeyTable {
    pub fn new(spec: DimensionSpec) -> EtlResult<Self> {
        if spec.schema.columns().is_empty() {
            bail!(
                ErrorKind::SchemaError,
                "Dimension table has no columns",
                spec.schema.name.to_string()
            );
        }

        let defaults = spec
            .defaults
            .iter()
            .map(|(column, value)| {
                spec.schema
                    .column_index(column)
                    .filter(|index| *index > 0)
                    .map(|index| (index - 1, value.clone()))
                    .ok_or_else(|| {
                        etl_error!(
                            ErrorKind::SchemaError,
                            "Default configured for an unknown attribute",
                            format!("column `{column}` of table {}", spec.schema.name)
                        )
                    })
            })
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(Self {
            spec,
            defaults,
            keys: HashMap::new(),
            next_key: SurrogateKey::FIRST,
            pending: Vec::new(),
            repeated: 0,
        })
    }

    /// Recreates the mapping persisted in the dimension table by a previous load.
    ///
    /// Nothing is pending afterwards. New keys continue after the largest persisted one.
    pub async fn rebuild_from_sink<S>(spec: DimensionSpec, sink: &S) -> EtlResult<Self>
    where
        S: Sink,
    {
        let mut table = Self::new(spec)?;
        let pairs = sink
            .read_key_pairs(
                &table.spec.schema,
                &table.spec.natural_key_column,
                table.spec.surrogate_key_column(),
            )
            .await?;

        for (natural_key, surrogate_key) in pairs {
            if surrogate_key >= table.next_key {
                table.next_key = surrogate_key.next();
            }
            if let Some(previous) = table.keys.insert(natural_key.clone(), surrogate_key) {
                bail!(
                    ErrorKind::ConstraintViolation,
                    "Natural key is persisted more than once",
                    format!(
                        "table {}, natural key {natural_key}, surrogate keys {previous} and {surrogate_key}",
                        table.spec.schema.name
                    )
                );
            }
        }

        info!(
            table = %table.spec.schema.name,
            keys = table.keys.len(),
            next_key = %table.next_key,
            "rebuilt surrogate keys from sink"
        );

        Ok(table)
    }

    /// Returns the surrogate key of `natural_key`, allocating one if the key is new.
    ///
    /// `attributes` are the values of every column but the surrogate key, in schema order.
    /// They are only used when a new key is allocated.
    pub fn lookup_or_insert(
        &mut self,
        natural_key: NaturalKey,
        mut attributes: Vec<Cell>,
    ) -> EtlResult<SurrogateKey> {
        if let Some(surrogate_key) = self.keys.get(&natural_key) {
            self.repeated += 1;
            return Ok(*surrogate_key);
        }

        if natural_key.is_null() {
            bail!(
                ErrorKind::InvalidData,
                "Null natural key cannot be inserted into a dimension",
                self.spec.schema.name.to_string()
            );
        }

        if attributes.len() != self.spec.attribute_count() {
            bail!(
                ErrorKind::InvalidData,
                "Dimension attributes do not match table columns",
                format!(
                    "table {} expects {} attributes, got {}",
                    self.spec.schema.name,
                    self.spec.attribute_count(),
                    attributes.len()
                )
            );
        }

        for (index, value) in &self.defaults {
            if attributes[*index].is_null() {
                attributes[*index] = value.clone();
            }
        }

        let surrogate_key = self.next_key;
        self.next_key = surrogate_key.next();
        self.keys.insert(natural_key, surrogate_key);

        let mut values = Vec::with_capacity(attributes.len() + 1);
        values.push(Cell::from(surrogate_key));
        values.extend(attributes);
        self.pending.push(TableRow::new(values));

        Ok(surrogate_key)
    }

    pub fn key_for(&self, natural_key: &NaturalKey) -> Option<SurrogateKey> {
        self.keys.get(natural_key).copied()
    }

    /// Writes every pending row to `sink` in one call and returns how many were written.
    ///
    /// The pending rows are discarded even if the write fails.
    pub async fn flush<S>(&mut self, sink: &S) -> EtlResult<u64>
    where
        S: Sink,
    {
        let rows = std::mem::take(&mut self.pending);
        let count = rows.len() as u64;
        sink.write_table_rows(&self.spec.schema, rows).await?;

        if self.repeated > 0 {
            warn!(
                table = %self.spec.schema.name,
                repeated = self.repeated,
                "natural keys were inserted more than once, first row kept"
            );
        }

        Ok(count)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.spec.schema
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    /// Number of insertions that hit an existing natural key.
    pub fn repeated(&self) -> u64 {
        self.repeated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::memory::MemoryStore;
    use crate::types::TableName;

    fn spec() -> DimensionSpec {
        DimensionSpec::new(
            TableSchema::new(
                TableName::new("gold", "dim_things"),
                &["thing_key", "thing_id", "label", "cost"],
            ),
            "thing_id",
        )
        .with_default("label", "n/a")
        .with_default("cost", 0i32)
    }

    fn attributes(id: &str, label: Option<&str>) -> Vec<Cell> {
        vec![Cell::from(id), Cell::from(label), Cell::Null]
    }

    #[test]
    fn keys_are_allocated_monotonically_and_first_write_wins() {
        let mut table = SurrogateKeyTable::new(spec()).unwrap();

        let a = table
            .lookup_or_insert(NaturalKey::single("a"), attributes("a", Some("first")))
            .unwrap();
        let b = table
            .lookup_or_insert(NaturalKey::single("b"), attributes("b", None))
            .unwrap();
        let again = table
            .lookup_or_insert(NaturalKey::single("a"), attributes("a", Some("second")))
            .unwrap();

        assert_eq!(a, SurrogateKey::new(1));
        assert_eq!(b, SurrogateKey::new(2));
        assert_eq!(again, a);
        assert_eq!(table.len(), 2);
        assert_eq!(table.pending_rows(), 2);
        assert_eq!(table.repeated(), 1);
        assert_eq!(table.key_for(&NaturalKey::single("b")), Some(b));
        assert_eq!(table.key_for(&NaturalKey::single("c")), None);
    }

    #[test]
    fn null_natural_key_is_rejected() {
        let mut table = SurrogateKeyTable::new(spec()).unwrap();
        let err = table
            .lookup_or_insert(NaturalKey::single(Cell::Null), attributes("x", None))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_default_column_is_a_schema_error() {
        let err = SurrogateKeyTable::new(spec().with_default("missing", 1i32)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaError);
    }

    #[tokio::test]
    async fn flush_writes_rows_with_defaults_applied() {
        let store = MemoryStore::new();
        let mut table = SurrogateKeyTable::new(spec()).unwrap();
        table
            .lookup_or_insert(NaturalKey::single("a"), attributes("a", None))
            .unwrap();

        assert_eq!(table.flush(&store).await.unwrap(), 1);
        assert_eq!(table.pending_rows(), 0);

        let rows = store.table_rows(&table.schema().name).await.unwrap();
        assert_eq!(
            rows,
            vec![TableRow::new(vec![
                Cell::I64(1),
                Cell::from("a"),
                Cell::from("n/a"),
                Cell::I32(0),
            ])]
        );
    }

    #[tokio::test]
    async fn rebuild_continues_after_largest_persisted_key() {
        let store = MemoryStore::new();
        let mut table = SurrogateKeyTable::new(spec()).unwrap();
        for id in ["a", "b", "c"] {
            table
                .lookup_or_insert(NaturalKey::single(id), attributes(id, None))
                .unwrap();
        }
        table.flush(&store).await.unwrap();

        let mut rebuilt = SurrogateKeyTable::rebuild_from_sink(spec(), &store)
            .await
            .unwrap();

        assert_eq!(rebuilt.len(), 3);
        assert_eq!(
            rebuilt.key_for(&NaturalKey::single("c")),
            Some(SurrogateKey::new(3))
        );
        assert_eq!(rebuilt.pending_rows(), 0);
        let next = rebuilt
            .lookup_or_insert(NaturalKey::single("d"), attributes("d", None))
            .unwrap();
        assert_eq!(next, SurrogateKey::new(4));
    }
}
