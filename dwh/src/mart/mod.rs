//! Silver to gold loads of the star schema.
//!
//! Dimensions are built first and produce the [`LoadedDimensions`] the fact load needs.

pub mod customers;
pub mod products;
pub mod sales;

use futures::TryStreamExt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::warn;

use crate::catalog::Catalog;
use crate::dimension::SurrogateKeyTable;
use crate::error::EtlResult;
use crate::report::TableLoadReport;
use crate::source::{SelectQuery, Source};
use crate::staging::StagingTable;
use crate::store::Sink;
use crate::types::RawRecord;

/// The gold tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MartTable {
    FactSales,
    DimCustomers,
    DimProducts,
}

impl MartTable {
    /// Every gold table, the fact table first since it references the dimensions.
    pub const ALL: [MartTable; 3] = [
        MartTable::FactSales,
        MartTable::DimCustomers,
        MartTable::DimProducts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MartTable::FactSales => "fact_sales",
            MartTable::DimCustomers => "dim_customers",
            MartTable::DimProducts => "dim_products",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            MartTable::FactSales => sales::COLUMNS,
            MartTable::DimCustomers => customers::COLUMNS,
            MartTable::DimProducts => products::COLUMNS,
        }
    }
}

/// Key tables of every dimension of the current load cycle.
///
/// Only a completed dimension load or a rebuild from the warehouse creates one, so holding
/// a value proves the dimensions the fact load resolves against are complete.
#[derive(Debug)]
pub struct LoadedDimensions {
    customers: SurrogateKeyTable,
    products: SurrogateKeyTable,
}

impl LoadedDimensions {
    pub fn customers(&self) -> &SurrogateKeyTable {
        &self.customers
    }

    pub fn products(&self) -> &SurrogateKeyTable {
        &self.products
    }
}

/// Loads every dimension from silver. The gold tables must have been truncated.
pub async fn load_dimensions<W>(
    warehouse: &W,
    catalog: &Catalog,
    progress_every: u64,
) -> EtlResult<(LoadedDimensions, Vec<TableLoadReport>)>
where
    W: Source + Sink,
{
    let (customers, customers_report) = customers::load(warehouse, catalog, progress_every).await?;
    let (products, products_report) = products::load(warehouse, catalog, progress_every).await?;

    Ok((
        LoadedDimensions {
            customers,
            products,
        },
        vec![customers_report, products_report],
    ))
}

/// Recreates the dimension key tables from the gold tables written by an earlier load.
pub async fn rebuild_dimensions<W>(warehouse: &W, catalog: &Catalog) -> EtlResult<LoadedDimensions>
where
    W: Sink,
{
    let customers = SurrogateKeyTable::rebuild_from_sink(
        customers::dimension_spec(catalog.mart_table(MartTable::DimCustomers)),
        warehouse,
    )
    .await?;
    let products = SurrogateKeyTable::rebuild_from_sink(
        products::dimension_spec(catalog.mart_table(MartTable::DimProducts)),
        warehouse,
    )
    .await?;

    Ok(LoadedDimensions {
        customers,
        products,
    })
}

/// Reads a silver table into a map keyed by `key`, keeping the first record of every key.
async fn read_lookup<W, T, C, K>(
    warehouse: &W,
    catalog: &Catalog,
    table: StagingTable,
    convert: C,
    key: K,
) -> EtlResult<HashMap<String, T>>
where
    W: Source,
    C: Fn(&RawRecord) -> EtlResult<T>,
    K: Fn(&T) -> Option<String>,
{
    let schema = catalog.silver_table(table);
    let columns = schema
        .columns()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>();
    let mut records = warehouse
        .execute_query(&SelectQuery::new(schema.name.clone(), &columns))
        .await?;

    let mut lookup = HashMap::new();
    let mut duplicates = 0u64;
    while let Some(record) = records.try_next().await? {
        let value = convert(&record)?;
        let Some(key) = key(&value) else {
            continue;
        };

        match lookup.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    if duplicates > 0 {
        warn!(
            table = %schema.name,
            duplicates,
            "lookup keys appear more than once, first record kept"
        );
    }

    Ok(lookup)
}
