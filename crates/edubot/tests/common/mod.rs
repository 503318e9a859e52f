//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod recorder;

#[allow(unused_imports)]
pub use fixtures::{seeded_store, text_update, TestGateway, SMALL_CATALOG};
#[allow(unused_imports)]
pub use recorder::RecordingSender;
