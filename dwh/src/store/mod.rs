//! Stores the loads read from and write to.

mod base;
pub mod memory;
pub mod postgres;

pub use base::Sink;
