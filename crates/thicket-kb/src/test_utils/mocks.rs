//! mockall doubles for collaborator traits

use mockall::mock;

use crate::data::{CoreError, EntityId, Row, StoreError};
use crate::traits::{Completion, RelationalStore, TextGenerator};

mock! {
    pub TextGenerator {}

    impl TextGenerator for TextGenerator {
        fn complete(&self, prompt: &str) -> Result<Completion, CoreError>;
    }
}

mock! {
    pub RelationalStore {}

    impl RelationalStore for RelationalStore {
        fn select(&self, table: &str, key_column: &str, key: &EntityId) -> Result<Vec<Row>, StoreError>;
        fn insert(&self, table: &str, rows: Vec<Row>) -> Result<(), StoreError>;
        fn update_by_id(
            &self,
            table: &str,
            key_column: &str,
            id: &EntityId,
            partial: Row,
        ) -> Result<(), StoreError>;
        fn delete_by_ids(&self, table: &str, key_column: &str, ids: &[EntityId]) -> Result<usize, StoreError>;
    }
}
