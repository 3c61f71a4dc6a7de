//! CRM customers, deduplicated on the customer id.

use chrono::NaiveDate;

use crate::conversions::code::{CRM_GENDER, MARITAL_STATUS, NOT_AVAILABLE};
use crate::conversions::text::trim;
use crate::dedup::{DedupSpec, Deduplicator};
use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, SortDirection, Source};
use crate::staging::write_converted;
use crate::store::Sink;
use crate::types::{Cell, RawRecord, TableName, TableRow, TableSchema};

pub const BRONZE_COLUMNS: &[&str] = &[
    "cst_id",
    "cst_key",
    "cst_firstname",
    "cst_lastname",
    "cst_marital_status",
    "cst_gndr",
    "cst_create_date",
];

pub const COLUMNS: &[&str] = BRONZE_COLUMNS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: i32,
    pub key: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub marital_status: String,
    pub gender: String,
    pub create_date: Option<NaiveDate>,
}

impl CustomerRecord {
    /// Cleans a bronze record. Returns [`None`] when the customer id is null.
    pub fn from_bronze(record: &RawRecord) -> EtlResult<Option<Self>> {
        let Some(id) = record.opt_i32("cst_id")? else {
            return Ok(None);
        };

        Ok(Some(Self {
            id,
            key: record.opt_string("cst_key")?,
            first_name: trim(record.opt_string("cst_firstname")?.as_deref()),
            last_name: trim(record.opt_string("cst_lastname")?.as_deref()),
            marital_status: MARITAL_STATUS.label(record.opt_string("cst_marital_status")?.as_deref()),
            gender: CRM_GENDER.label(record.opt_string("cst_gndr")?.as_deref()),
            create_date: record.opt_date("cst_create_date")?,
        }))
    }

    /// Reads back a silver record. Returns [`None`] when the customer id is null.
    pub fn from_silver(record: &RawRecord) -> EtlResult<Option<Self>> {
        let Some(id) = record.opt_i32("cst_id")? else {
            return Ok(None);
        };

        Ok(Some(Self {
            id,
            key: record.opt_string("cst_key")?,
            first_name: record.opt_string("cst_firstname")?,
            last_name: record.opt_string("cst_lastname")?,
            marital_status: record.opt_string("cst_marital_status")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            gender: record.opt_string("cst_gndr")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            create_date: record.opt_date("cst_create_date")?,
        }))
    }

    pub fn into_row(self) -> TableRow {
        TableRow::new(vec![
            Cell::from(self.id),
            Cell::from(self.key),
            Cell::from(self.first_name),
            Cell::from(self.last_name),
            Cell::from(self.marital_status),
            Cell::from(self.gender),
            Cell::from(self.create_date),
        ])
    }
}

/// Keeps the most recently created record of every customer id.
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
    let query = SelectQuery::new(source, BRONZE_COLUMNS).order_by("cst_id", SortDirection::Ascending);
    let records = Deduplicator::new(DedupSpec::latest("cst_id", "cst_create_date"))
        .read(bronze, query)
        .await?;

    write_converted(warehouse, target, records, |record| {
        Ok(CustomerRecord::from_bronze(&record)?.map(CustomerRecord::into_row))
    })
    .await
}
