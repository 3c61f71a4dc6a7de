//! Utilities for testing warehouse loads against the in-memory store.
//!
//! - [`fixture`] seeds the bronze tables of a [`crate::store::memory::MemoryStore`].
//! - [`test_store_wrapper`] records the calls made to a store and injects write failures.
pub mod fixture;
pub mod test_store_wrapper;
