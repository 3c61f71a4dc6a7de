//! ERP customer demographics.

use chrono::NaiveDate;

use crate::conversions::code::{ERP_GENDER, NOT_AVAILABLE};
use crate::conversions::date::reject_future;
use crate::conversions::text::{ERP_CUSTOMER_PREFIX, strip_prefix};
use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, Source};
use crate::staging::write_converted;
use crate::store::Sink;
use crate::types::{Cell, RawRecord, TableName, TableRow, TableSchema};

pub const COLUMNS: &[&str] = &["cid", "bdate", "gen"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErpCustomerRecord {
    pub customer_number: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: String,
}

impl ErpCustomerRecord {
    /// Cleans a bronze record. Birthdates after `today` are dropped.
    pub fn from_bronze(record: &RawRecord, today: NaiveDate) -> EtlResult<Self> {
        Ok(Self {
            customer_number: strip_prefix(record.opt_string("cid")?.as_deref(), ERP_CUSTOMER_PREFIX),
            birthdate: reject_future(record.opt_date("bdate")?, today),
            gender: ERP_GENDER.label(record.opt_string("gen")?.as_deref()),
        })
    }

    pub fn from_silver(record: &RawRecord) -> EtlResult<Self> {
        Ok(Self {
            customer_number: record.opt_string("cid")?,
            birthdate: record.opt_date("bdate")?,
            gender: record.opt_string("gen")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        })
    }

    pub fn into_row(self) -> TableRow {
        TableRow::new(vec![
            Cell::from(self.customer_number),
            Cell::from(self.birthdate),
            Cell::from(self.gender),
        ])
    }
}

pub(crate) async fn load<B, W>(
    bronze: &B,
    warehouse: &W,
    source: TableName,
    target: &TableSchema,
    today: NaiveDate,
) -> EtlResult<TableLoadReport>
where
    B: Source,
    W: Sink,
{
    let records = bronze
        .execute_query(&SelectQuery::new(source, COLUMNS))
        .await?;

    write_converted(warehouse, target, records, |record| {
        ErpCustomerRecord::from_bronze(&record, today).map(|customer| Some(customer.into_row()))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn bronze(cid: &str, bdate: NaiveDate, r#gen: Option<&str>) -> RawRecord {
        let columns: Arc<[String]> = COLUMNS.iter().map(|c| c.to_string()).collect();
        RawRecord::new(columns, vec![Cell::from(cid), Cell::from(bdate), Cell::from(r#gen)]).unwrap()
    }

    #[test]
    fn prefix_future_birthdate_and_gender_are_cleaned() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let future = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

        let customer =
            ErpCustomerRecord::from_bronze(&bronze("NASAW00011000", future, Some(" female")), today)
                .unwrap();

        assert_eq!(
            customer,
            ErpCustomerRecord {
                customer_number: Some("AW00011000".to_string()),
                birthdate: None,
                gender: "Female".to_string(),
            }
        );
    }

    #[test]
    fn past_birthdate_is_kept() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let birthdate = NaiveDate::from_ymd_opt(1980, 2, 29).unwrap();

        let customer =
            ErpCustomerRecord::from_bronze(&bronze("AW00011001", birthdate, None), today).unwrap();

        assert_eq!(customer.customer_number.as_deref(), Some("AW00011001"));
        assert_eq!(customer.birthdate, Some(birthdate));
        assert_eq!(customer.gender, "n/a");
    }
}
