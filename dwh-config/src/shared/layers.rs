use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

const DEFAULT_BRONZE_SCHEMA: &str = "bronze";
const DEFAULT_SILVER_SCHEMA: &str = "silver";
const DEFAULT_GOLD_SCHEMA: &str = "gold";

/// Schema names of the three warehouse layers.
///
/// Bronze is read from the source connection, silver and gold live in the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default = "default_bronze_schema")]
    pub bronze: String,
    #[serde(default = "default_silver_schema")]
    pub silver: String,
    #[serde(default = "default_gold_schema")]
    pub gold: String,
}

impl LayerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let layers = [
            ("layers.bronze", &self.bronze),
            ("layers.silver", &self.silver),
            ("layers.gold", &self.gold),
        ];

        for (name, schema) in layers {
            if schema.trim().is_empty() {
                return Err(ValidationError::EmptySchemaName(name));
            }
        }

        for (i, (first, first_schema)) in layers.iter().enumerate() {
            for (second, second_schema) in &layers[i + 1..] {
                if first_schema == second_schema {
                    return Err(ValidationError::SharedSchemaName {
                        first: *first,
                        second: *second,
                        schema: first_schema.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            bronze: default_bronze_schema(),
            silver: default_silver_schema(),
            gold: default_gold_schema(),
        }
    }
}

fn default_bronze_schema() -> String {
    DEFAULT_BRONZE_SCHEMA.to_string()
}

fn default_silver_schema() -> String {
    DEFAULT_SILVER_SCHEMA.to_string()
}

fn default_gold_schema() -> String {
    DEFAULT_GOLD_SCHEMA.to_string()
}
