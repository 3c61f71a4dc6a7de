//! Layered warehouse loads.
//!
//! Raw bronze extracts are cleaned into the silver tables by [`staging`], then [`mart`] builds
//! the gold star schema from silver. [`orchestrator::StageOrchestrator`] sequences a run.

pub mod catalog;
pub mod conversions;
pub mod dedup;
pub mod dimension;
pub mod error;
pub mod fact;
mod macros;
pub mod mart;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod staging;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
