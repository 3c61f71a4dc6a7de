use chrono::NaiveDate;
use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::error::EtlResult;
use crate::staging::StagingTable;
use crate::store::memory::MemoryStore;
use crate::types::{Cell, TableRow, TableSchema};

/// Builder of bronze extracts.
///
/// Every bronze table is created when seeding, empty if no row was added to it.
#[derive(Debug, Default, Clone)]
pub struct BronzeFixture {
    tables: HashMap<StagingTable, Vec<Vec<Cell>>>,
}

impl BronzeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw row to `table`, in the order of [`StagingTable::bronze_columns`].
    pub fn row(mut self, table: StagingTable, row: Vec<Cell>) -> Self {
        self.tables.entry(table).or_default().push(row);
        self
    }

    pub fn customer(
        self,
        id: Option<i32>,
        key: &str,
        first_name: &str,
        last_name: &str,
        create_date: Option<NaiveDate>,
    ) -> Self {
        self.row(
            StagingTable::CrmCustInfo,
            vec![
                Cell::from(id),
                Cell::from(key),
                Cell::from(first_name),
                Cell::from(last_name),
                Cell::from("S"),
                Cell::from("F"),
                Cell::from(create_date),
            ],
        )
    }

    pub fn product(
        self,
        id: i32,
        key: &str,
        name: &str,
        cost: Option<i32>,
        line: &str,
        start_date: NaiveDate,
    ) -> Self {
        self.row(
            StagingTable::CrmPrdInfo,
            vec![
                Cell::from(id),
                Cell::from(key),
                Cell::from(name),
                Cell::from(cost),
                Cell::from(line),
                Cell::from(start_date),
            ],
        )
    }

    /// Adds an order line. `order_date` is a `YYYYMMDD` integer.
    pub fn sale(
        self,
        order_number: &str,
        product_key: &str,
        customer_id: i32,
        order_date: i32,
        quantity: i32,
        price: i32,
    ) -> Self {
        self.row(
            StagingTable::CrmSalesDetails,
            vec![
                Cell::from(order_number),
                Cell::from(product_key),
                Cell::from(customer_id),
                Cell::from(order_date),
                Cell::from(order_date),
                Cell::from(order_date),
                Cell::Null,
                Cell::from(quantity),
                Cell::from(price),
            ],
        )
    }

    pub fn erp_customer(self, cid: &str, birthdate: Option<NaiveDate>, gender: &str) -> Self {
        self.row(
            StagingTable::ErpCustAz12,
            vec![Cell::from(cid), Cell::from(birthdate), Cell::from(gender)],
        )
    }

    pub fn location(self, cid: &str, country: &str) -> Self {
        self.row(
            StagingTable::ErpLocA101,
            vec![Cell::from(cid), Cell::from(country)],
        )
    }

    pub fn category(self, id: &str, category: &str, subcategory: &str, maintenance: &str) -> Self {
        self.row(
            StagingTable::ErpPxCatG1v2,
            vec![
                Cell::from(id),
                Cell::from(category),
                Cell::from(subcategory),
                Cell::from(maintenance),
            ],
        )
    }

    /// Creates every bronze table of `catalog` in `store` with the rows added so far.
    pub async fn seed(mut self, store: &MemoryStore, catalog: &Catalog) -> EtlResult<()> {
        for table in StagingTable::ALL {
            let rows = self.tables.remove(&table).unwrap_or_default();
            store
                .insert_table(catalog.bronze_table(table), table.bronze_columns(), rows)
                .await?;
        }

        Ok(())
    }
}

/// Returns the rows of `table`, or no rows if it was never written.
pub async fn table_rows(store: &MemoryStore, table: &TableSchema) -> Vec<TableRow> {
    store.table_rows(&table.name).await.unwrap_or_default()
}

/// Returns the values of `column` in every row of `table`.
pub async fn column_values(store: &MemoryStore, table: &TableSchema, column: &str) -> Vec<Cell> {
    let Some(index) = table.column_index(column) else {
        return Vec::new();
    };

    table_rows(store, table)
        .await
        .into_iter()
        .map(|row| row.values()[index].clone())
        .collect()
}
