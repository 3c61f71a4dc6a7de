//! Customer dimension, combining the CRM customers with the ERP demographics and locations.

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
use crate::staging::customers::{self as staged, CustomerRecord};
use crate::staging::erp_customers::ErpCustomerRecord;
use crate::staging::locations::LocationRecord;
use crate::store::Sink;
use crate::types::{Cell, NaturalKey, TableSchema};

pub const COLUMNS: &[&str] = &[
    "customer_key",
    "customer_id",
    "customer_number",
    "first_name",
    "last_name",
    "country",
    "marital_status",
    "gender",
    "birthdate",
    "create_date",
];

pub(crate) fn dimension_spec(schema: TableSchema) -> DimensionSpec {
    DimensionSpec::new(schema, "customer_id")
        .with_default("country", NOT_AVAILABLE)
        .with_default("marital_status", NOT_AVAILABLE)
        .with_default("gender", NOT_AVAILABLE)
}

/// The CRM gender, or the ERP gender when the CRM does not know it.
fn resolve_gender(crm: &str, erp: Option<&ErpCustomerRecord>) -> String {
    if crm != NOT_AVAILABLE {
        return crm.to_string();
    }

    erp.map(|erp| erp.gender.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub(crate) async fn load<W>(
    warehouse: &W,
    catalog: &Catalog,
    progress_every: u64,
) -> EtlResult<(SurrogateKeyTable, TableLoadReport)>
where
    W: Source + Sink,
{
    let demographics = read_lookup(
        warehouse,
        catalog,
        StagingTable::ErpCustAz12,
        ErpCustomerRecord::from_silver,
        |customer: &ErpCustomerRecord| customer.customer_number.clone(),
    )
    .await?;
    let locations = read_lookup(
        warehouse,
        catalog,
        StagingTable::ErpLocA101,
        LocationRecord::from_silver,
        |location: &LocationRecord| location.customer_number.clone(),
    )
    .await?;

    let source = catalog.silver_table(StagingTable::CrmCustInfo);
    let query = SelectQuery::new(source.name.clone(), staged::COLUMNS)
        .order_by("cst_id", SortDirection::Ascending);
    let records = warehouse.execute_query(&query).await?;

    let mut table = SurrogateKeyTable::new(dimension_spec(catalog.mart_table(MartTable::DimCustomers)))?;
    let mut report = TableLoadReport::new(table.schema().name.clone());
    let mut records = ProgressStream::wrap(records, table.schema().name.to_string(), progress_every);

    let mut missing_ids = 0u64;
    while let Some(record) = records.try_next().await? {
        report.rows_read += 1;
        let Some(customer) = CustomerRecord::from_silver(&record)? else {
            missing_ids += 1;
            continue;
        };

        let erp = customer.key.as_ref().and_then(|key| demographics.get(key));
        let location = customer.key.as_ref().and_then(|key| locations.get(key));
        let gender = resolve_gender(&customer.gender, erp);

        let attributes = vec![
            Cell::from(customer.id),
            Cell::from(customer.key),
            Cell::from(customer.first_name),
            Cell::from(customer.last_name),
            Cell::from(location.map(|location| location.country.clone())),
            Cell::from(customer.marital_status),
            Cell::from(gender),
            Cell::from(erp.and_then(|erp| erp.birthdate)),
            Cell::from(customer.create_date),
        ];
        table.lookup_or_insert(NaturalKey::single(customer.id), attributes)?;
    }

    if missing_ids > 0 {
        warn!(table = %report.table, rows = missing_ids, "customers without id skipped");
    }

    report.rows_written = table.flush(warehouse).await?;

    Ok((table, report))
}
