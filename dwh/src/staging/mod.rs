//! Bronze to silver loads.
//!
//! Every silver table keeps the shape of its bronze extract. Rows are cleaned field by
//! field with the functions of [`crate::conversions`] and written in one call per table.

pub mod categories;
pub mod customers;
pub mod erp_customers;
pub mod locations;
pub mod products;
pub mod sales;

use chrono::NaiveDate;
use futures::TryStreamExt;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{EtlError, ErrorKind, EtlResult};
use crate::etl_error;
use crate::report::TableLoadReport;
use crate::source::{RecordStream, Source};
use crate::store::Sink;
use crate::types::{RawRecord, TableRow, TableSchema};

/// The silver tables and the bronze extracts they are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingTable {
    CrmCustInfo,
    CrmPrdInfo,
    CrmSalesDetails,
    ErpCustAz12,
    ErpLocA101,
    ErpPxCatG1v2,
}

impl StagingTable {
    pub const ALL: [StagingTable; 6] = [
        StagingTable::CrmCustInfo,
        StagingTable::CrmPrdInfo,
        StagingTable::CrmSalesDetails,
        StagingTable::ErpCustAz12,
        StagingTable::ErpLocA101,
        StagingTable::ErpPxCatG1v2,
    ];

    /// Table name, shared by the bronze and silver layers.
    pub fn name(self) -> &'static str {
        match self {
            StagingTable::CrmCustInfo => "crm_cust_info",
            StagingTable::CrmPrdInfo => "crm_prd_info",
            StagingTable::CrmSalesDetails => "crm_sales_details",
            StagingTable::ErpCustAz12 => "erp_cust_az12",
            StagingTable::ErpLocA101 => "erp_loc_a101",
            StagingTable::ErpPxCatG1v2 => "erp_px_cat_g1v2",
        }
    }

    pub fn bronze_columns(self) -> &'static [&'static str] {
        match self {
            StagingTable::CrmCustInfo => customers::BRONZE_COLUMNS,
            StagingTable::CrmPrdInfo => products::BRONZE_COLUMNS,
            StagingTable::CrmSalesDetails => sales::COLUMNS,
            StagingTable::ErpCustAz12 => erp_customers::COLUMNS,
            StagingTable::ErpLocA101 => locations::COLUMNS,
            StagingTable::ErpPxCatG1v2 => categories::COLUMNS,
        }
    }

    pub fn silver_columns(self) -> &'static [&'static str] {
        match self {
            StagingTable::CrmCustInfo => customers::COLUMNS,
            StagingTable::CrmPrdInfo => products::COLUMNS,
            StagingTable::CrmSalesDetails => sales::COLUMNS,
            StagingTable::ErpCustAz12 => erp_customers::COLUMNS,
            StagingTable::ErpLocA101 => locations::COLUMNS,
            StagingTable::ErpPxCatG1v2 => categories::COLUMNS,
        }
    }
}

impl fmt::Display for StagingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StagingTable {
    type Err = EtlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StagingTable::ALL
            .into_iter()
            .find(|table| table.name() == value)
            .ok_or_else(|| {
                etl_error!(
                    ErrorKind::ConfigError,
                    "Unknown staging table",
                    format!(
                        "`{value}` is not one of {}",
                        StagingTable::ALL.map(StagingTable::name).join(", ")
                    )
                )
            })
    }
}

/// Loads one silver table from its bronze extract.
///
/// The silver table must have been truncated by the caller. `today` is the processing date
/// used to reject birthdates in the future.
pub async fn load_staging_table<B, W>(
    table: StagingTable,
    bronze: &B,
    warehouse: &W,
    catalog: &Catalog,
    today: NaiveDate,
) -> EtlResult<TableLoadReport>
where
    B: Source,
    W: Sink,
{
    let source = catalog.bronze_table(table);
    let target = catalog.silver_table(table);

    let report = match table {
        StagingTable::CrmCustInfo => customers::load(bronze, warehouse, source, &target).await?,
        StagingTable::CrmPrdInfo => products::load(bronze, warehouse, source, &target).await?,
        StagingTable::CrmSalesDetails => sales::load(bronze, warehouse, source, &target).await?,
        StagingTable::ErpCustAz12 => {
            erp_customers::load(bronze, warehouse, source, &target, today).await?
        }
        StagingTable::ErpLocA101 => locations::load(bronze, warehouse, source, &target).await?,
        StagingTable::ErpPxCatG1v2 => {
            categories::load(bronze, warehouse, source, &target).await?
        }
    };

    info!(
        table = %report.table,
        rows = report.rows_written,
        rejected = report.rows_rejected(),
        "loaded staging table"
    );

    Ok(report)
}

/// Converts every record of `records` and writes the rows to `target` in one call.
///
/// Records converted to [`None`] are counted as read and not written.
async fn write_converted<W, F>(
    warehouse: &W,
    target: &TableSchema,
    mut records: RecordStream,
    mut convert: F,
) -> EtlResult<TableLoadReport>
where
    W: Sink,
    F: FnMut(RawRecord) -> EtlResult<Option<TableRow>>,
{
    let mut report = TableLoadReport::new(target.name.clone());
    let mut rows = Vec::new();

    while let Some(record) = records.try_next().await? {
        report.rows_read += 1;
        if let Some(row) = convert(record)? {
            rows.push(row);
        }
    }

    report.rows_written = rows.len() as u64;
    warehouse.write_table_rows(target, rows).await?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_tables_parse_from_their_names() {
        for table in StagingTable::ALL {
            assert_eq!(table.name().parse::<StagingTable>().unwrap(), table);
        }

        let err = "crm_unknown".parse::<StagingTable>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
