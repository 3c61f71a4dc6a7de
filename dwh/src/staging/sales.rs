//! CRM order lines with parsed dates and corrected measures.

use chrono::NaiveDate;

use crate::conversions::date::parse_date_int;
use crate::conversions::measure::correct_measures;
use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, Source};
use crate::staging::write_converted;
use crate::store::Sink;
use crate::types::{Cell, RawRecord, TableName, TableRow, TableSchema};

pub const COLUMNS: &[&str] = &[
    "sls_ord_num",
    "sls_prd_key",
    "sls_cust_id",
    "sls_order_dt",
    "sls_ship_dt",
    "sls_due_dt",
    "sls_sales",
    "sls_quantity",
    "sls_price",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub order_number: Option<String>,
    pub product_key: Option<String>,
    pub customer_id: Option<i32>,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub amount: i64,
    pub quantity: Option<i32>,
    pub price: i64,
}

impl SalesRecord {
    /// Cleans a bronze record, whose dates are `YYYYMMDD` integers.
    pub fn from_bronze(record: &RawRecord) -> EtlResult<Self> {
        let quantity = record.opt_i32("sls_quantity")?;
        let measures = correct_measures(
            record.opt_i64("sls_sales")?,
            quantity.map(i64::from),
            record.opt_i64("sls_price")?,
        );

        Ok(Self {
            order_number: record.opt_string("sls_ord_num")?,
            product_key: record.opt_string("sls_prd_key")?,
            customer_id: record.opt_i32("sls_cust_id")?,
            order_date: parse_date_int(record.opt_i64("sls_order_dt")?),
            ship_date: parse_date_int(record.opt_i64("sls_ship_dt")?),
            due_date: parse_date_int(record.opt_i64("sls_due_dt")?),
            amount: measures.amount,
            quantity,
            price: measures.price,
        })
    }

    pub fn from_silver(record: &RawRecord) -> EtlResult<Self> {
        Ok(Self {
            order_number: record.opt_string("sls_ord_num")?,
            product_key: record.opt_string("sls_prd_key")?,
            customer_id: record.opt_i32("sls_cust_id")?,
            order_date: record.opt_date("sls_order_dt")?,
            ship_date: record.opt_date("sls_ship_dt")?,
            due_date: record.opt_date("sls_due_dt")?,
            amount: record.opt_i64("sls_sales")?.unwrap_or(0),
            quantity: record.opt_i32("sls_quantity")?,
            price: record.opt_i64("sls_price")?.unwrap_or(0),
        })
    }

    pub fn into_row(self) -> TableRow {
        TableRow::new(vec![
            Cell::from(self.order_number),
            Cell::from(self.product_key),
            Cell::from(self.customer_id),
            Cell::from(self.order_date),
            Cell::from(self.ship_date),
            Cell::from(self.due_date),
            Cell::from(self.amount),
            Cell::from(self.quantity),
            Cell::from(self.price),
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
        SalesRecord::from_bronze(&record).map(|sale| Some(sale.into_row()))
    })
    .await
}
