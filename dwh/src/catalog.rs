use dwh_config::shared::LayerConfig;

use crate::mart::MartTable;
use crate::staging::StagingTable;
use crate::types::{TableName, TableSchema};

/// Resolves the tables of every layer against the configured schema names.
#[derive(Debug, Clone)]
pub struct Catalog {
    bronze: String,
    silver: String,
    gold: String,
}

impl Catalog {
    pub fn new(layers: &LayerConfig) -> Self {
        Self {
            bronze: layers.bronze.clone(),
            silver: layers.silver.clone(),
            gold: layers.gold.clone(),
        }
    }

    pub fn bronze_table(&self, table: StagingTable) -> TableName {
        TableName::new(&self.bronze, table.name())
    }

    pub fn silver_table(&self, table: StagingTable) -> TableSchema {
        TableSchema::new(
            TableName::new(&self.silver, table.name()),
            table.silver_columns(),
        )
    }

    pub fn silver_tables(&self) -> Vec<TableSchema> {
        StagingTable::ALL
            .into_iter()
            .map(|table| self.silver_table(table))
            .collect()
    }

    pub fn mart_table(&self, table: MartTable) -> TableSchema {
        TableSchema::new(TableName::new(&self.gold, table.name()), table.columns())
    }

    /// Every gold table, referencing tables before the tables they reference.
    pub fn mart_tables(&self) -> Vec<TableSchema> {
        MartTable::ALL
            .into_iter()
            .map(|table| self.mart_table(table))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(&LayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_live_in_their_layer_schema() {
        let catalog = Catalog::new(&LayerConfig {
            bronze: "raw".to_string(),
            silver: "clean".to_string(),
            gold: "star".to_string(),
        });

        assert_eq!(
            catalog.bronze_table(StagingTable::CrmCustInfo),
            TableName::new("raw", "crm_cust_info")
        );
        assert_eq!(
            catalog.silver_table(StagingTable::CrmPrdInfo).name,
            TableName::new("clean", "crm_prd_info")
        );

        let gold = catalog
            .mart_tables()
            .into_iter()
            .map(|table| table.name.name)
            .collect::<Vec<_>>();
        assert_eq!(gold, vec!["fact_sales", "dim_customers", "dim_products"]);
    }
}
