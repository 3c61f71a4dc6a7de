//! Sales fact table.

use futures::TryStreamExt;

use crate::catalog::Catalog;
use crate::error::EtlResult;
use crate::fact::{FactResolver, FactRole};
use crate::mart::{LoadedDimensions, MartTable};
use crate::report::{FactLoadReport, TableLoadReport};
use crate::source::{ProgressStream, SelectQuery, SortDirection, Source};
use crate::staging::StagingTable;
use crate::staging::sales::{self as staged, SalesRecord};
use crate::store::Sink;
use crate::types::{Cell, NaturalKey, SurrogateKey, TableRow};

pub const COLUMNS: &[&str] = &[
    "sale_key",
    "order_number",
    "product_key",
    "customer_key",
    "order_date",
    "shipping_date",
    "due_date",
    "sales_amount",
    "quantity",
    "price",
];

pub const PRODUCT_ROLE: &str = "product";

pub const CUSTOMER_ROLE: &str = "customer";

/// Loads every order line whose product and customer both resolve.
pub(crate) async fn load<W>(
    warehouse: &W,
    catalog: &Catalog,
    dimensions: &LoadedDimensions,
    progress_every: u64,
) -> EtlResult<(TableLoadReport, FactLoadReport)>
where
    W: Source + Sink,
{
    let target = catalog.mart_table(MartTable::FactSales);
    let source = catalog.silver_table(StagingTable::CrmSalesDetails);
    let query = SelectQuery::new(source.name.clone(), staged::COLUMNS)
        .order_by("sls_ord_num", SortDirection::Ascending)
        .order_by("sls_prd_key", SortDirection::Ascending);
    let records = warehouse.execute_query(&query).await?;
    let mut records = ProgressStream::wrap(records, target.name.to_string(), progress_every);

    let mut resolver = FactResolver::new(vec![
        FactRole {
            name: PRODUCT_ROLE,
            dimension: dimensions.products(),
        },
        FactRole {
            name: CUSTOMER_ROLE,
            dimension: dimensions.customers(),
        },
    ]);

    let mut report = TableLoadReport::new(target.name.clone());
    let mut sale_key = SurrogateKey::FIRST;
    let mut rows = Vec::new();
    while let Some(record) = records.try_next().await? {
        report.rows_read += 1;
        let sale = SalesRecord::from_silver(&record)?;

        let natural_keys = [
            NaturalKey::single(sale.product_key.as_deref()),
            NaturalKey::single(sale.customer_id),
        ];
        let Some([product_key, customer_key]) = resolver.resolve(&natural_keys)? else {
            continue;
        };

        rows.push(TableRow::new(vec![
            Cell::from(sale_key),
            Cell::from(sale.order_number),
            Cell::from(product_key),
            Cell::from(customer_key),
            Cell::from(sale.order_date),
            Cell::from(sale.ship_date),
            Cell::from(sale.due_date),
            Cell::from(sale.amount),
            Cell::from(sale.quantity),
            Cell::from(sale.price),
        ]));
        sale_key = sale_key.next();
    }

    report.rows_written = rows.len() as u64;
    warehouse.write_table_rows(&target, rows).await?;

    Ok((report, resolver.into_report(target.name)))
}
