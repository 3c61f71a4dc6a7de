//! Configuration for the warehouse loader.
//!
//! Holds the layered file/environment loader together with the shared configuration types
//! (connections, layer schemas, load tuning) consumed by the `dwh` engine and the loader binary.

pub mod environment;
mod load;
pub mod shared;

pub use load::{LoadConfigError, load_config};
