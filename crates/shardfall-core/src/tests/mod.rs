//! Crate-level tests.
//!
//! - `scenarios.rs`: end-to-end stories through [`Engine`](crate::engine::Engine)
//! - `properties.rs`: invariants checked with `proptest` over random operation
//!   sequences
//! - `helpers.rs`: test actor and harness shared with the module unit tests

pub mod helpers;
