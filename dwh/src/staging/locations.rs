//! ERP customer locations.

use crate::conversions::code::{NOT_AVAILABLE, country_label};
use crate::conversions::text::remove_dashes;
use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, Source};
use crate::staging::write_converted;
use crate::store::Sink;
use crate::types::{Cell, RawRecord, TableName, TableRow, TableSchema};

pub const COLUMNS: &[&str] = &["cid", "cntry"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    pub customer_number: Option<String>,
    pub country: String,
}

impl LocationRecord {
    pub fn from_bronze(record: &RawRecord) -> EtlResult<Self> {
        Ok(Self {
            customer_number: remove_dashes(record.opt_string("cid")?.as_deref()),
            country: country_label(record.opt_string("cntry")?.as_deref()),
        })
    }

    pub fn from_silver(record: &RawRecord) -> EtlResult<Self> {
        Ok(Self {
            customer_number: record.opt_string("cid")?,
            country: record.opt_string("cntry")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        })
    }

    pub fn into_row(self) -> TableRow {
        TableRow::new(vec![
            Cell::from(self.customer_number),
            Cell::from(self.country),
        ])
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
    let records = bronze
        .execute_query(&SelectQuery::new(source, COLUMNS))
        .await?;

    write_converted(warehouse, target, records, |record| {
        LocationRecord::from_bronze(&record).map(|location| Some(location.into_row()))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn dashes_are_removed_and_country_normalized() {
        let columns: Arc<[String]> = COLUMNS.iter().map(|c| c.to_string()).collect();
        let record =
            RawRecord::new(columns, vec![Cell::from("AW-00011000"), Cell::from("USA")]).unwrap();

        let location = LocationRecord::from_bronze(&record).unwrap();

        assert_eq!(location.customer_number.as_deref(), Some("AW00011000"));
        assert_eq!(location.country, "United States");
    }
}
