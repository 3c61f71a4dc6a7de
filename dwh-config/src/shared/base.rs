use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config for `{0}`: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts(&'static str),
    /// A layer schema name is empty.
    #[error("Invalid layers config: `{0}` cannot be empty")]
    EmptySchemaName(&'static str),
    /// Two layers point to the same schema, which would make truncation destroy another layer.
    #[error("Invalid layers config: `{first}` and `{second}` both use schema `{schema}`")]
    SharedSchemaName {
        first: &'static str,
        second: &'static str,
        schema: String,
    },
    /// A load tuning value that must be positive is zero.
    #[error("`{0}` cannot be zero")]
    Zero(&'static str),
}
