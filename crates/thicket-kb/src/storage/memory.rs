//! In-memory backends

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{EntityId, Row, SqlValue, StoreError, VectorStoreError};
use crate::embedding::HashEmbeddingGenerator;
use crate::traits::{EmbeddingGenerator, RelationalStore, StoredEmbedding, VectorStore};

/// Call counters of a [`MemoryRelationalStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationalStoreStats {
    pub selects: usize,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl RelationalStoreStats {
    /// Number of write calls of any kind.
    pub fn writes(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

/// In-memory relational store.
///
/// Tables are plain row lists, so duplicate keys are representable and
/// surface as `AmbiguousResult` in the adapter.
#[derive(Debug, Default)]
pub struct MemoryRelationalStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    stats: Mutex<RelationalStoreStats>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RelationalStoreStats {
        *self.stats.lock()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = RelationalStoreStats::default();
    }

    /// Number of rows currently in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    /// Clear all data in the store
    pub fn clear(&self) {
        self.tables.write().clear();
    }

    fn key_matches(row: &Row, key_column: &str, key: &EntityId) -> bool {
        match row.get(key_column) {
            Some(SqlValue::Text(value)) => value == key.as_str(),
            Some(SqlValue::Integer(value)) => value.to_string() == key.as_str(),
            _ => false,
        }
    }
}

impl RelationalStore for MemoryRelationalStore {
    fn select(&self, table: &str, key_column: &str, key: &EntityId) -> Result<Vec<Row>, StoreError> {
        self.stats.lock().selects += 1;
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::key_matches(row, key_column, key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        self.stats.lock().inserts += 1;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        Ok(())
    }

    fn update_by_id(
        &self,
        table: &str,
        key_column: &str,
        id: &EntityId,
        partial: Row,
    ) -> Result<(), StoreError> {
        self.stats.lock().updates += 1;
        let mut tables = self.tables.write();
        let mut matched = false;
        for row in tables
            .get_mut(table)
            .into_iter()
            .flatten()
            .filter(|row| Self::key_matches(row, key_column, id))
        {
            matched = true;
            for (column, cell) in &partial {
                row.insert(column.clone(), cell.clone());
            }
        }
        if matched {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            })
        }
    }

    fn delete_by_ids(&self, table: &str, key_column: &str, ids: &[EntityId]) -> Result<usize, StoreError> {
        self.stats.lock().deletes += 1;
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !ids.iter().any(|id| Self::key_matches(row, key_column, id)));
        Ok(before - rows.len())
    }
}

/// Call counters of a [`MemoryVectorStore`], per collection or in total.
/// `generated`, `updated` and `deleted` count documents, not calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorStoreStats {
    pub retrieves: usize,
    pub generated: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl VectorStoreStats {
    fn add(&mut self, other: &VectorStoreStats) {
        self.retrieves += other.retrieves;
        self.generated += other.generated;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

type CollectionKey = (String, String);

/// In-memory vector store embedding documents with an [`EmbeddingGenerator`].
pub struct MemoryVectorStore {
    generator: Arc<dyn EmbeddingGenerator>,
    collections: RwLock<HashMap<CollectionKey, HashMap<EntityId, StoredEmbedding>>>,
    stats: Mutex<HashMap<CollectionKey, VectorStoreStats>>,
}

impl MemoryVectorStore {
    pub fn new(generator: Arc<dyn EmbeddingGenerator>) -> Self {
        Self {
            generator,
            collections: RwLock::new(HashMap::new()),
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Counters for one `(table, attribute)` collection.
    pub fn stats_for(&self, table: &str, attribute: &str) -> VectorStoreStats {
        self.stats
            .lock()
            .get(&(table.to_string(), attribute.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Counters summed over every collection.
    pub fn stats(&self) -> VectorStoreStats {
        let mut total = VectorStoreStats::default();
        for stats in self.stats.lock().values() {
            total.add(stats);
        }
        total
    }

    pub fn reset_stats(&self) {
        self.stats.lock().clear();
    }

    /// Number of embeddings stored for `(table, attribute)`.
    pub fn len(&self, table: &str, attribute: &str) -> usize {
        self.collections
            .read()
            .get(&(table.to_string(), attribute.to_string()))
            .map_or(0, HashMap::len)
    }

    fn record(&self, table: &str, attribute: &str, update: impl FnOnce(&mut VectorStoreStats)) {
        let mut stats = self.stats.lock();
        update(stats.entry((table.to_string(), attribute.to_string())).or_default());
    }

    /// Embeds every document, failing before any write if one is unusable.
    fn embed_all(
        &self,
        table: &str,
        attribute: &str,
        ids: &[EntityId],
        documents: &[String],
    ) -> Result<Vec<StoredEmbedding>, VectorStoreError> {
        if ids.len() != documents.len() {
            return Err(VectorStoreError::Backend(format!(
                "{} ids but {} documents",
                ids.len(),
                documents.len()
            )));
        }
        if ids.is_empty() {
            return Err(VectorStoreError::EmptyDocument {
                table: table.to_string(),
                attribute: attribute.to_string(),
                id: EntityId::new(""),
            });
        }

        let mut embedded = Vec::with_capacity(documents.len());
        for (id, document) in ids.iter().zip(documents) {
            if document.trim().is_empty() {
                return Err(VectorStoreError::EmptyDocument {
                    table: table.to_string(),
                    attribute: attribute.to_string(),
                    id: id.clone(),
                });
            }
            if let Some(limit) = self.generator.max_tokens() {
                let tokens = self.generator.count_tokens(document);
                if tokens > limit {
                    return Err(VectorStoreError::TokenLimit {
                        attribute: attribute.to_string(),
                        id: id.clone(),
                        tokens,
                        limit,
                    });
                }
            }
            embedded.push(StoredEmbedding {
                vector: self.generator.generate_embedding(document)?,
                document: document.clone(),
            });
        }
        Ok(embedded)
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new(Arc::new(HashEmbeddingGenerator::default()))
    }
}

impl std::fmt::Debug for MemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryVectorStore").finish()
    }
}

impl VectorStore for MemoryVectorStore {
    fn retrieve(
        &self,
        table: &str,
        attribute: &str,
        id: &EntityId,
    ) -> Result<StoredEmbedding, VectorStoreError> {
        self.record(table, attribute, |s| s.retrieves += 1);
        self.collections
            .read()
            .get(&(table.to_string(), attribute.to_string()))
            .and_then(|collection| collection.get(id))
            .cloned()
            .ok_or_else(|| VectorStoreError::EmbeddingsNotFound {
                table: table.to_string(),
                attribute: attribute.to_string(),
                id: id.clone(),
            })
    }

    fn generate(
        &self,
        table: &str,
        attribute: &str,
        ids: &[EntityId],
        documents: &[String],
    ) -> Result<(), VectorStoreError> {
        let key = (table.to_string(), attribute.to_string());
        if let Some(collection) = self.collections.read().get(&key) {
            if let Some(existing) = ids.iter().find(|id| collection.contains_key(*id)) {
                return Err(VectorStoreError::AlreadyExists {
                    table: table.to_string(),
                    attribute: attribute.to_string(),
                    id: existing.clone(),
                });
            }
        }

        let embedded = self.embed_all(table, attribute, ids, documents)?;
        let count = embedded.len();
        self.collections
            .write()
            .entry(key)
            .or_default()
            .extend(ids.iter().cloned().zip(embedded));
        self.record(table, attribute, |s| s.generated += count);
        Ok(())
    }

    fn update(
        &self,
        table: &str,
        attribute: &str,
        ids: &[EntityId],
        documents: &[String],
    ) -> Result<(), VectorStoreError> {
        let key = (table.to_string(), attribute.to_string());
        {
            let collections = self.collections.read();
            let collection = collections.get(&key);
            if let Some(missing) = ids
                .iter()
                .find(|id| !collection.map_or(false, |c| c.contains_key(*id)))
            {
                return Err(VectorStoreError::EmbeddingsNotFound {
                    table: table.to_string(),
                    attribute: attribute.to_string(),
                    id: missing.clone(),
                });
            }
        }

        let embedded = self.embed_all(table, attribute, ids, documents)?;
        let count = embedded.len();
        self.collections
            .write()
            .entry(key)
            .or_default()
            .extend(ids.iter().cloned().zip(embedded));
        self.record(table, attribute, |s| s.updated += count);
        Ok(())
    }

    fn delete(&self, table: &str, attribute: &str, ids: &[EntityId]) -> Result<usize, VectorStoreError> {
        let removed = self
            .collections
            .write()
            .get_mut(&(table.to_string(), attribute.to_string()))
            .map_or(0, |collection| {
                ids.iter().filter(|id| collection.remove(*id).is_some()).count()
            });
        self.record(table, attribute, |s| s.deleted += removed);
        Ok(removed)
    }
}
