//! Shared configuration types for the warehouse loader.

mod base;
mod connection;
mod layers;
mod load;
mod loader;

pub use base::ValidationError;
pub use connection::{PgConnectionConfig, SessionSettings, TcpKeepaliveConfig, TlsConfig};
pub use layers::LayerConfig;
pub use load::LoadConfig;
pub use loader::LoaderConfig;
