//! Field transformations and Postgres value conversions.
//!
//! The transformation functions are total: they never fail, mapping null, blank or
//! malformed inputs to a sentinel or to null instead.

pub mod code;
pub mod date;
pub mod key;
pub mod measure;
pub(crate) mod pg;
pub mod text;
