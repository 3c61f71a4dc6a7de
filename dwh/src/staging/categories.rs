//! ERP product categories, copied unchanged.

use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, Source};
use crate::staging::write_converted;
use crate::store::Sink;
use crate::types::{Cell, RawRecord, TableName, TableRow, TableSchema};

pub const COLUMNS: &[&str] = &["id", "cat", "subcat", "maintenance"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub maintenance: Option<String>,
}

impl CategoryRecord {
    pub fn from_record(record: &RawRecord) -> EtlResult<Self> {
        Ok(Self {
            id: record.opt_string("id")?,
            category: record.opt_string("cat")?,
            subcategory: record.opt_string("subcat")?,
            maintenance: record.opt_string("maintenance")?,
        })
    }

    pub fn into_row(self) -> TableRow {
        TableRow::new(vec![
            Cell::from(self.id),
            Cell::from(self.category),
            Cell::from(self.subcategory),
            Cell::from(self.maintenance),
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
        CategoryRecord::from_record(&record).map(|category| Some(category.into_row()))
    })
    .await
}
