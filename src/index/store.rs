//! Document store

use super::ShardedMap;
use crate::types::{Document, DocumentId};
use std::sync::Arc;

/// Owner of indexed documents. Indexes refer to documents by id only.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: ShardedMap<Arc<Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document_id: &str) -> Option<&Arc<Document>> {
        self.documents.get(document_id)
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    /// Insert a document, returning the one it replaced
    pub fn insert(&mut self, document: Document) -> Option<Arc<Document>> {
        self.documents
            .insert(document.id.clone(), Arc::new(document))
    }

    pub fn remove(&mut self, document_id: &str) -> Option<Arc<Document>> {
        self.documents.remove(document_id)
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document ids in ascending order
    pub fn ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.documents.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }
}
