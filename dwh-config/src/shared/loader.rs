use serde::Deserialize;

use crate::shared::{LayerConfig, LoadConfig, PgConnectionConfig, ValidationError};

/// Complete configuration of the loader binary.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Connection to the database holding the bronze extracts.
    pub source: PgConnectionConfig,
    /// Connection to the warehouse holding the silver and gold layers.
    pub warehouse: PgConnectionConfig,
    #[serde(default)]
    pub layers: LayerConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.tls.enabled && self.source.tls.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts("source"));
        }

        if self.warehouse.tls.enabled && self.warehouse.tls.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts("warehouse"));
        }

        self.layers.validate()?;
        self.load.validate()
    }
}
