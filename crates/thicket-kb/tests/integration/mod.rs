//! Integration tests for thicket-kb
//!
//! Everything here runs against the in-memory backends from `test_utils`.

pub mod test_utils;

pub mod derived_loading;
pub mod entity_lifecycle;
pub mod forest_traversal;
pub mod generation;
pub mod settings;
