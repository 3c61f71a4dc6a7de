use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Tuning of the load stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Number of rows inserted per `INSERT` statement when writing a table.
    ///
    /// All statements of one table load share a single transaction.
    #[serde(default = "LoadConfig::default_write_batch_size")]
    pub write_batch_size: usize,
    /// Dimension rows between two progress log lines.
    #[serde(default = "LoadConfig::default_dimension_progress_every")]
    pub dimension_progress_every: u64,
    /// Fact rows between two progress log lines.
    #[serde(default = "LoadConfig::default_fact_progress_every")]
    pub fact_progress_every: u64,
}

impl LoadConfig {
    pub const DEFAULT_WRITE_BATCH_SIZE: usize = 1000;

    pub const DEFAULT_DIMENSION_PROGRESS_EVERY: u64 = 5_000;

    pub const DEFAULT_FACT_PROGRESS_EVERY: u64 = 10_000;

    fn default_write_batch_size() -> usize {
        Self::DEFAULT_WRITE_BATCH_SIZE
    }

    fn default_dimension_progress_every() -> u64 {
        Self::DEFAULT_DIMENSION_PROGRESS_EVERY
    }

    fn default_fact_progress_every() -> u64 {
        Self::DEFAULT_FACT_PROGRESS_EVERY
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.write_batch_size == 0 {
            return Err(ValidationError::Zero("load.write_batch_size"));
        }

        if self.dimension_progress_every == 0 {
            return Err(ValidationError::Zero("load.dimension_progress_every"));
        }

        if self.fact_progress_every == 0 {
            return Err(ValidationError::Zero("load.fact_progress_every"));
        }

        Ok(())
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            write_batch_size: Self::DEFAULT_WRITE_BATCH_SIZE,
            dimension_progress_every: Self::DEFAULT_DIMENSION_PROGRESS_EVERY,
            fact_progress_every: Self::DEFAULT_FACT_PROGRESS_EVERY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = LoadConfig {
            write_batch_size: 0,
            ..LoadConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::Zero("load.write_batch_size"))
        ));
    }
}
