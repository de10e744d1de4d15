//! RelationalStore trait definition for row storage

use crate::data::{EntityId, Row, StoreError};

/// Represents the interface for the relational store holding base and
/// generated attributes.
///
/// Implementations own connection handling and the SQL dialect; the entity
/// layer only ever addresses rows by `(table, key_column, key)`.
pub trait RelationalStore: Send + Sync {
    /// Returns every row of `table` whose `key_column` equals `key`.
    ///
    /// Contract: an empty vector means "no such row". More than one row is a
    /// data-integrity violation that callers must surface, so implementations
    /// return all matches rather than picking one.
    fn select(&self, table: &str, key_column: &str, key: &EntityId) -> Result<Vec<Row>, StoreError>;

    /// Inserts complete rows.
    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<(), StoreError>;

    /// Overwrites the given columns of the row keyed by `id`.
    fn update_by_id(
        &self,
        table: &str,
        key_column: &str,
        id: &EntityId,
        partial: Row,
    ) -> Result<(), StoreError>;

    /// Deletes the rows keyed by `ids`. Returns how many rows were removed.
    fn delete_by_ids(&self, table: &str, key_column: &str, ids: &[EntityId]) -> Result<usize, StoreError>;
}
