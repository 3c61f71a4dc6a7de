//! Selection of one canonical record per natural key.
//!
//! Sources that can rank partitions evaluate the selection in the query. For other sources the
//! [`Deduplicator`] reads the whole input and keeps the winning record of every key in
//! memory, one record per distinct key.

use futures::{Stream, StreamExt, TryStreamExt, stream};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::info;

use crate::error::{EtlError, EtlResult};
use crate::source::{RankSpec, RecordStream, SelectQuery, SortDirection, Source};
use crate::types::{Cell, NaturalKey, RawRecord};

/// Which record of a key survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    /// The record with the greatest ordering value.
    Latest,
    /// The record with the smallest ordering value.
    Earliest,
}

/// Describes how records are grouped and which one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupSpec {
    pub key_columns: Vec<String>,
    pub order_column: String,
    pub keep: KeepPolicy,
}

impl DedupSpec {
    pub fn latest(key_column: &str, order_column: &str) -> Self {
        Self {
            key_columns: vec![key_column.to_string()],
            order_column: order_column.to_string(),
            keep: KeepPolicy::Latest,
        }
    }

    fn rank_spec(&self) -> RankSpec {
        RankSpec {
            partition_by: self.key_columns.clone(),
            order_by: self.order_column.clone(),
            direction: match self.keep {
                KeepPolicy::Latest => SortDirection::Descending,
                KeepPolicy::Earliest => SortDirection::Ascending,
            },
        }
    }
}

/// Counters of an in-memory deduplication.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
    pub records_read: u64,
    pub null_keys: u64,
    pub duplicates: u64,
}

/// Keeps exactly one record per distinct non-null natural key.
///
/// Within a key the record with the maximum (or minimum, see [`KeepPolicy`]) ordering value
/// wins. A null ordering value never beats a non-null one. Ties keep the record seen first.
/// Records whose key has a null component are dropped.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    spec: DedupSpec,
}

impl Deduplicator {
    pub fn new(spec: DedupSpec) -> Self {
        Self { spec }
    }

    /// Runs `query` against `source` and returns the deduplicated records.
    ///
    /// Nothing is read before the returned stream is polled.
    pub async fn read<S>(&self, source: &S, query: SelectQuery) -> EtlResult<RecordStream>
    where
        S: Source,
    {
        if source.supports_ranking() {
            return source.execute_query(&self.pushed_down(query)).await;
        }

        let input = source.execute_query(&query).await?;
        let columns = input.columns().clone();
        let deduplicator = self.clone();
        let table = query.table.to_string();

        let winners = stream::once(async move {
            let (records, stats) = deduplicator.deduplicate(input).await?;
            info!(
                table = %table,
                records_read = stats.records_read,
                null_keys = stats.null_keys,
                duplicates = stats.duplicates,
                "deduplicated records in memory"
            );

            Ok::<_, EtlError>(stream::iter(records.into_iter().map(Ok)))
        })
        .try_flatten();

        Ok(RecordStream::new(columns, winners))
    }

    /// `query` ranked so that the source itself keeps one record per key.
    pub fn pushed_down(&self, query: SelectQuery) -> SelectQuery {
        query.with_rank(self.spec.rank_spec())
    }

    /// Consumes `records` and returns the winner of every key in first-seen key order.
    pub async fn deduplicate<S>(&self, records: S) -> EtlResult<(Vec<RawRecord>, DedupStats)>
    where
        S: Stream<Item = EtlResult<RawRecord>>,
    {
        let mut stats = DedupStats::default();
        let mut positions: HashMap<NaturalKey, usize> = HashMap::new();
        let mut winners: Vec<RawRecord> = Vec::new();

        let mut records = std::pin::pin!(records);
        while let Some(record) = records.next().await {
            let record = record?;
            stats.records_read += 1;

            let key = self.natural_key(&record)?;
            if key.is_null() {
                stats.null_keys += 1;
                continue;
            }

            match positions.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(winners.len());
                    winners.push(record);
                }
                Entry::Occupied(entry) => {
                    stats.duplicates += 1;
                    let current = &mut winners[*entry.get()];
                    let candidate_order = record.get(&self.spec.order_column)?;
                    let current_order = current.get(&self.spec.order_column)?;
                    if self.beats(candidate_order, current_order) {
                        *current = record;
                    }
                }
            }
        }

        Ok((winners, stats))
    }

    fn natural_key(&self, record: &RawRecord) -> EtlResult<NaturalKey> {
        let cells = self
            .spec
            .key_columns
            .iter()
            .map(|column| record.get(column).cloned())
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(NaturalKey::new(cells))
    }

    /// Returns `true` when `candidate` strictly wins over `current`.
    fn beats(&self, candidate: &Cell, current: &Cell) -> bool {
        match (candidate.is_null(), current.is_null()) {
            (true, _) => false,
            (false, true) => true,
            (false, false) => matches!(
                (self.spec.keep, candidate.compare(current)),
                (KeepPolicy::Latest, Some(Ordering::Greater))
                    | (KeepPolicy::Earliest, Some(Ordering::Less))
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    use crate::store::memory::MemoryStore;
    use crate::types::TableName;

    fn date(day: u32) -> Cell {
        Cell::Date(NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
    }

    fn records(rows: Vec<(Cell, Cell, &str)>) -> Vec<EtlResult<RawRecord>> {
        let columns: Arc<[String]> = vec!["id".to_string(), "created".to_string(), "tag".to_string()].into();
        rows.into_iter()
            .map(|(id, created, tag)| RawRecord::new(columns.clone(), vec![id, created, Cell::from(tag)]))
            .collect()
    }

    fn tags(records: &[RawRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| record.opt_string("tag").unwrap().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn latest_record_wins_per_key() {
        let deduplicator = Deduplicator::new(DedupSpec::latest("id", "created"));
        let input = records(vec![
            (Cell::I32(1), date(1), "1-old"),
            (Cell::I32(2), date(5), "2-only"),
            (Cell::I32(1), date(9), "1-new"),
            (Cell::I32(1), date(3), "1-mid"),
        ]);

        let (winners, stats) = deduplicator
            .deduplicate(stream::iter(input))
            .await
            .unwrap();

        assert_eq!(tags(&winners), vec!["1-new", "2-only"]);
        assert_eq!(stats.duplicates, 2);
    }

    #[tokio::test]
    async fn ties_keep_first_seen_and_null_order_never_wins() {
        let deduplicator = Deduplicator::new(DedupSpec::latest("id", "created"));
        let input = records(vec![
            (Cell::I32(1), Cell::Null, "1-null"),
            (Cell::I32(1), date(4), "1-first"),
            (Cell::I32(1), date(4), "1-tie"),
            (Cell::I32(1), Cell::Null, "1-null-again"),
        ]);

        let (winners, _) = deduplicator
            .deduplicate(stream::iter(input))
            .await
            .unwrap();

        assert_eq!(tags(&winners), vec!["1-first"]);
    }

    #[tokio::test]
    async fn earliest_policy_keeps_minimum() {
        let deduplicator = Deduplicator::new(DedupSpec {
            keep: KeepPolicy::Earliest,
            ..DedupSpec::latest("id", "created")
        });
        let input = records(vec![
            (Cell::I32(1), date(4), "1-mid"),
            (Cell::I32(1), date(2), "1-min"),
            (Cell::I32(1), date(8), "1-max"),
        ]);

        let (winners, _) = deduplicator
            .deduplicate(stream::iter(input))
            .await
            .unwrap();

        assert_eq!(tags(&winners), vec!["1-min"]);
    }

    fn customer_query() -> SelectQuery {
        SelectQuery::new(
            TableName::new("bronze", "crm_cust_info"),
            &["cst_id", "cst_create_date"],
        )
        .order_by("cst_id", SortDirection::Ascending)
    }

    #[test]
    fn latest_policy_ranks_descending_in_the_query() {
        let deduplicator = Deduplicator::new(DedupSpec::latest("cst_id", "cst_create_date"));

        // Plain lowercase identifiers may or may not be quoted.
        let sql = deduplicator.pushed_down(customer_query()).to_sql().replace('"', "");
        insta::assert_snapshot!(sql, @"select cst_id, cst_create_date from (select cst_id, cst_create_date, row_number() over (partition by cst_id order by cst_create_date desc nulls last, ctid) as partition_rank from bronze.crm_cust_info where cst_id is not null) as ranked where partition_rank = 1 order by cst_id asc nulls last");
    }

    #[test]
    fn earliest_policy_ranks_ascending_in_the_query() {
        let deduplicator = Deduplicator::new(DedupSpec {
            keep: KeepPolicy::Earliest,
            ..DedupSpec::latest("cst_id", "cst_create_date")
        });

        let sql = deduplicator.pushed_down(customer_query()).to_sql().replace('"', "");
        insta::assert_snapshot!(sql, @"select cst_id, cst_create_date from (select cst_id, cst_create_date, row_number() over (partition by cst_id order by cst_create_date asc nulls last, ctid) as partition_rank from bronze.crm_cust_info where cst_id is not null) as ranked where partition_rank = 1 order by cst_id asc nulls last");
    }

    #[tokio::test]
    async fn null_keys_are_dropped() {
        let deduplicator = Deduplicator::new(DedupSpec::latest("id", "created"));
        let input = records(vec![
            (Cell::Null, date(1), "none"),
            (Cell::I32(3), date(1), "3"),
        ]);

        let (winners, stats) = deduplicator
            .deduplicate(stream::iter(input))
            .await
            .unwrap();

        assert_eq!(tags(&winners), vec!["3"]);
        assert_eq!(stats.null_keys, 1);
        assert_eq!(stats.records_read, 2);
    }

    #[tokio::test]
    async fn memory_source_is_deduplicated_lazily() {
        let store = MemoryStore::new();
        let table = TableName::new("bronze", "t");
        store
            .insert_table(
                table.clone(),
                &["id", "created", "tag"],
                vec![
                    vec![Cell::I32(1), date(1), Cell::from("a")],
                    vec![Cell::I32(1), date(2), Cell::from("b")],
                ],
            )
            .await
            .unwrap();

        let deduplicator = Deduplicator::new(DedupSpec::latest("id", "created"));
        let stream = deduplicator
            .read(&store, SelectQuery::new(table, &["id", "created", "tag"]))
            .await
            .unwrap();
        let winners: Vec<RawRecord> = stream.try_collect().await.unwrap();

        assert_eq!(tags(&winners), vec!["b"]);
    }

    /// Source that ranks on its side and records the queries it receives.
    #[derive(Default)]
    struct RankingSource {
        queries: Mutex<Vec<SelectQuery>>,
    }

    impl Source for RankingSource {
        fn supports_ranking(&self) -> bool {
            true
        }

        async fn execute_query(&self, query: &SelectQuery) -> EtlResult<RecordStream> {
            self.queries.lock().unwrap().push(query.clone());
            let columns: Arc<[String]> = query.columns.iter().cloned().collect();
            Ok(RecordStream::from_records(columns, vec![]))
        }
    }

    #[tokio::test]
    async fn ranking_is_pushed_down_when_supported() {
        let source = RankingSource::default();
        let deduplicator = Deduplicator::new(DedupSpec::latest("id", "created"));

        let _ = deduplicator
            .read(
                &source,
                SelectQuery::new(TableName::new("bronze", "t"), &["id", "created"]),
            )
            .await
            .unwrap();

        let queries = source.queries.lock().unwrap();
        assert_eq!(
            queries[0].rank,
            Some(RankSpec {
                partition_by: vec!["id".to_string()],
                order_by: "created".to_string(),
                direction: SortDirection::Descending,
            })
        );
    }
}
