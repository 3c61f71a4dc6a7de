//! Product dimension over the current product versions and their categories.

use futures::TryStreamExt;
use tracing::warn;

use crate::catalog::Catalog;
use crate::conversions::code::NOT_AVAILABLE;
use crate::dimension::{DimensionSpec, SurrogateKeyTable};
use crate::error::EtlResult;
use crate::mart::{MartTable, read_lookup};
use crate::report::TableLoadReport;
use crate::source::{ProgressStream, SelectQuery, SortDirection, Source};
use crate::staging::StagingTable;
use crate::staging::categories::CategoryRecord;
use crate::staging::products::{self as staged, ProductRecord};
use crate::store::Sink;
use crate::types::{Cell, NaturalKey, TableSchema};

pub const COLUMNS: &[&str] = &[
    "product_key",
    "product_id",
    "product_number",
    "product_name",
    "category_id",
    "category",
    "subcategory",
    "maintenance",
    "cost",
    "product_line",
    "start_date",
];

pub(crate) fn dimension_spec(schema: TableSchema) -> DimensionSpec {
    DimensionSpec::new(schema, "product_number")
        .with_default("category", NOT_AVAILABLE)
        .with_default("subcategory", NOT_AVAILABLE)
        .with_default("maintenance", NOT_AVAILABLE)
        .with_default("cost", 0i32)
        .with_default("product_line", NOT_AVAILABLE)
}

/// Loads the current version of every product, in start date order.
pub(crate) async fn load<W>(
    warehouse: &W,
    catalog: &Catalog,
    progress_every: u64,
) -> EtlResult<(SurrogateKeyTable, TableLoadReport)>
where
    W: Source + Sink,
{
    let categories = read_lookup(
        warehouse,
        catalog,
        StagingTable::ErpPxCatG1v2,
        CategoryRecord::from_record,
        |category: &CategoryRecord| category.id.clone(),
    )
    .await?;

    let source = catalog.silver_table(StagingTable::CrmPrdInfo);
    let query = SelectQuery::new(source.name.clone(), staged::COLUMNS)
        .order_by("prd_start_dt", SortDirection::Ascending)
        .order_by("prd_key", SortDirection::Ascending);
    let records = warehouse.execute_query(&query).await?;

    let mut table = SurrogateKeyTable::new(dimension_spec(catalog.mart_table(MartTable::DimProducts)))?;
    let mut report = TableLoadReport::new(table.schema().name.clone());
    let mut records = ProgressStream::wrap(records, table.schema().name.to_string(), progress_every);

    let mut missing_keys = 0u64;
    while let Some(record) = records.try_next().await? {
        let product = ProductRecord::from_silver(&record)?;
        if !product.is_current() {
            continue;
        }

        report.rows_read += 1;
        let Some(number) = product.key else {
            missing_keys += 1;
            continue;
        };

        let category = product
            .category_id
            .as_ref()
            .and_then(|id| categories.get(id));

        let attributes = vec![
            Cell::from(product.id),
            Cell::from(number.as_str()),
            Cell::from(product.name),
            Cell::from(product.category_id.clone()),
            Cell::from(category.and_then(|category| category.category.clone())),
            Cell::from(category.and_then(|category| category.subcategory.clone())),
            Cell::from(category.and_then(|category| category.maintenance.clone())),
            Cell::from(product.cost),
            Cell::from(product.line),
            Cell::from(product.start_date),
        ];
        table.lookup_or_insert(NaturalKey::single(number), attributes)?;
    }

    if missing_keys > 0 {
        warn!(table = %report.table, rows = missing_keys, "products without key skipped");
    }

    report.rows_written = table.flush(warehouse).await?;

    Ok((table, report))
}
