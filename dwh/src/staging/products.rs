//! CRM products with the category id split out of the compound key.
//!
//! A product key appears once per version. The end date of a version is the day before
//! the next version of the same key starts, the latest version stays open ended.

use chrono::NaiveDate;
use futures::TryStreamExt;

use crate::conversions::code::{NOT_AVAILABLE, PRODUCT_LINE};
use crate::conversions::key::{category_id, product_number};
use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, SortDirection, Source};
use crate::store::Sink;
use crate::types::{Cell, RawRecord, TableName, TableRow, TableSchema};

pub const BRONZE_COLUMNS: &[&str] = &[
    "prd_id",
    "prd_key",
    "prd_nm",
    "prd_cost",
    "prd_line",
    "prd_start_dt",
];

pub const COLUMNS: &[&str] = &[
    "prd_id",
    "cat_id",
    "prd_key",
    "prd_nm",
    "prd_cost",
    "prd_line",
    "prd_start_dt",
    "prd_end_dt",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: Option<i32>,
    pub category_id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
    pub cost: i32,
    pub line: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ProductRecord {
    /// Cleans a bronze record. The end date is left open.
    pub fn from_bronze(record: &RawRecord) -> EtlResult<Self> {
        let raw_key = record.opt_string("prd_key")?;

        Ok(Self {
            id: record.opt_i32("prd_id")?,
            category_id: raw_key.as_deref().map(category_id),
            key: raw_key.as_deref().map(product_number),
            name: record.opt_string("prd_nm")?,
            cost: record.opt_i32("prd_cost")?.unwrap_or(0),
            line: PRODUCT_LINE.label(record.opt_string("prd_line")?.as_deref()),
            start_date: record.opt_date("prd_start_dt")?,
            end_date: None,
        })
    }

    pub fn from_silver(record: &RawRecord) -> EtlResult<Self> {
        Ok(Self {
            id: record.opt_i32("prd_id")?,
            category_id: record.opt_string("cat_id")?,
            key: record.opt_string("prd_key")?,
            name: record.opt_string("prd_nm")?,
            cost: record.opt_i32("prd_cost")?.unwrap_or(0),
            line: record.opt_string("prd_line")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            start_date: record.opt_date("prd_start_dt")?,
            end_date: record.opt_date("prd_end_dt")?,
        })
    }

    /// Whether this is the latest version of the product.
    pub fn is_current(&self) -> bool {
        self.end_date.is_none()
    }

    pub fn into_row(self) -> TableRow {
        TableRow::new(vec![
            Cell::from(self.id),
            Cell::from(self.category_id),
            Cell::from(self.key),
            Cell::from(self.name),
            Cell::from(self.cost),
            Cell::from(self.line),
            Cell::from(self.start_date),
            Cell::from(self.end_date),
        ])
    }
}

/// A product version together with the compound key it was read with.
#[derive(Debug)]
struct ProductVersion {
    raw_key: Option<String>,
    product: ProductRecord,
}

/// Closes every version but the last of each raw key.
///
/// `versions` must be sorted by raw key, then start date.
fn close_versions(versions: &mut [ProductVersion]) {
    for i in 1..versions.len() {
        let (previous, next) = versions.split_at_mut(i);
        let previous = &mut previous[i - 1];
        let next = &next[0];

        if previous.raw_key == next.raw_key {
            previous.product.end_date = next.product.start_date.and_then(|start| start.pred_opt());
        }
    }
}

pub(crate) async fn load<B, W>(
    bronze: &B,
    warehouse: &W,
    source: TableName,
    target: &TableSchema,
) -> EtlResult<TableLoadReport>
where
    B: Source,
    W: Sink,
{
    let query = SelectQuery::new(source, BRONZE_COLUMNS)
        .order_by("prd_key", SortDirection::Ascending)
        .order_by("prd_start_dt", SortDirection::Ascending);
    let mut records = bronze.execute_query(&query).await?;

    let mut versions = Vec::new();
    while let Some(record) = records.try_next().await? {
        versions.push(ProductVersion {
            raw_key: record.opt_string("prd_key")?,
            product: ProductRecord::from_bronze(&record)?,
        });
    }
    close_versions(&mut versions);

    let mut report = TableLoadReport::new(target.name.clone());
    report.rows_read = versions.len() as u64;
    report.rows_written = report.rows_read;

    let rows = versions
        .into_iter()
        .map(|version| version.product.into_row())
        .collect();
    warehouse.write_table_rows(target, rows).await?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn bronze(key: &str, cost: Option<i32>, line: &str, start: Option<NaiveDate>) -> RawRecord {
        let columns: Arc<[String]> = BRONZE_COLUMNS.iter().map(|c| c.to_string()).collect();
        RawRecord::new(
            columns,
            vec![
                Cell::I32(1),
                Cell::from(key),
                Cell::from("Bike"),
                Cell::from(cost),
                Cell::from(line),
                Cell::from(start),
            ],
        )
        .unwrap()
    }

    fn version(key: &str, start: Option<NaiveDate>) -> ProductVersion {
        ProductVersion {
            raw_key: Some(key.to_string()),
            product: ProductRecord::from_bronze(&bronze(key, Some(1), "M", start)).unwrap(),
        }
    }

    #[test]
    fn compound_key_is_decomposed() {
        let product = ProductRecord::from_bronze(&bronze("CO-RF-FR-R92B-58", None, " r ", None)).unwrap();

        assert_eq!(product.category_id.as_deref(), Some("CO_RF"));
        assert_eq!(product.key.as_deref(), Some("FR-R92B-58"));
        assert_eq!(product.cost, 0);
        assert_eq!(product.line, "Road");
        assert!(product.is_current());
    }

    #[test]
    fn versions_end_the_day_before_the_next_start() {
        let mut versions = vec![
            version("AB-CD-1", Some(date(1, 1))),
            version("AB-CD-1", Some(date(3, 1))),
            version("AB-CD-1", Some(date(6, 1))),
            version("AB-CD-2", Some(date(2, 1))),
        ];

        close_versions(&mut versions);

        let end_dates = versions
            .iter()
            .map(|version| version.product.end_date)
            .collect::<Vec<_>>();
        assert_eq!(
            end_dates,
            vec![Some(date(2, 29)), Some(date(5, 31)), None, None]
        );
    }

    #[test]
    fn next_version_without_start_leaves_end_open() {
        let mut versions = vec![
            version("AB-CD-1", Some(date(1, 1))),
            version("AB-CD-1", None),
        ];

        close_versions(&mut versions);

        assert_eq!(versions[0].product.end_date, None);
    }
}
