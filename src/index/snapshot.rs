//! Immutable index snapshots and the atomic handle readers load them from
//!
//! A snapshot bundles the document store, the lexical index and the vector
//! index together with the corpus statistics they carry. Writers clone the
//! current snapshot, apply a whole batch to the clone and publish it with a
//! single pointer swap. Readers load one `Arc<IndexSnapshot>` per query and
//! see either the state before a batch or after it.

use super::{Bm25Params, DocumentStore, IndexError, LexicalIndex, VectorIndex};
use crate::config::VectorConfig;
use crate::text::SharedTokenizer;
use crate::types::{Document, NewDocument};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Point-in-time view of the whole index
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    generation: u64,
    documents: DocumentStore,
    lexical: LexicalIndex,
    vector: VectorIndex,
}

/// Summary statistics of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub generation: u64,
    pub documents: usize,
    pub terms: usize,
    pub total_tokens: u64,
    pub avg_doc_length: f64,
    pub vectors: usize,
    pub dimensions: usize,
    pub tokenizer: String,
}

impl IndexSnapshot {
    pub fn empty(
        tokenizer: SharedTokenizer,
        params: Bm25Params,
        dimensions: usize,
        vector_config: &VectorConfig,
    ) -> Self {
        Self {
            generation: 0,
            documents: DocumentStore::new(),
            lexical: LexicalIndex::new(tokenizer, params),
            vector: VectorIndex::new(dimensions, vector_config),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn vector(&self) -> &VectorIndex {
        &self.vector
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            generation: self.generation,
            documents: self.documents.len(),
            terms: self.lexical.term_count(),
            total_tokens: self.lexical.total_tokens(),
            avg_doc_length: self.lexical.avg_doc_length(),
            vectors: self.vector.len(),
            dimensions: self.vector.dimensions(),
            tokenizer: self.lexical.tokenizer().name().to_string(),
        }
    }

    /// Derive tokens and the stored vector, then add the document to the
    /// store and both indexes. An existing document with the same id is
    /// retired first. Returns true when a document was replaced.
    ///
    /// Validation happens before any structure is touched, so an error
    /// leaves the snapshot unchanged.
    pub fn insert(&mut self, new: NewDocument) -> Result<bool, IndexError> {
        if new.id.is_empty() {
            return Err(IndexError::EmptyId);
        }
        let vector = self.vector.prepare(&new.id, &new.embedding)?;
        let tokens = self.lexical.tokenize(&new.text);

        let replaced = self.remove(&new.id);

        self.lexical.insert(&new.id, &tokens);
        self.vector.insert(&new.id, vector);
        self.documents.insert(Document {
            id: new.id,
            text: new.text,
            tokens,
            embedding: new.embedding,
            metadata: new.metadata,
        });
        Ok(replaced)
    }

    /// Retire a document from the store and both indexes
    pub fn remove(&mut self, document_id: &str) -> bool {
        let removed = self.documents.remove(document_id).is_some();
        if removed {
            self.lexical.remove(document_id);
            self.vector.remove(document_id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.lexical.clear();
        self.vector.clear();
    }
}

/// Atomically swappable reference to the current snapshot.
///
/// Reads never block. Writes are serialized on an internal mutex.
pub struct SnapshotHandle {
    current: ArcSwap<IndexSnapshot>,
    write_lock: Mutex<()>,
}

impl SnapshotHandle {
    pub fn new(initial: IndexSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            write_lock: Mutex::new(()),
        }
    }

    /// Current snapshot as an owned `Arc`, safe to hold across await points
    pub fn load(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    /// Apply `f` to a private copy of the current snapshot and publish it.
    ///
    /// If `f` fails the copy is discarded and readers keep the old snapshot.
    /// On success the generation is bumped and the new snapshot is returned.
    pub fn update<T, E, F>(&self, f: F) -> Result<(T, Arc<IndexSnapshot>), E>
    where
        F: FnOnce(&mut IndexSnapshot) -> Result<T, E>,
    {
        let _guard = self.write_lock.lock();
        let mut next = IndexSnapshot::clone(&self.current.load());
        let out = f(&mut next)?;
        next.generation += 1;

        let next = Arc::new(next);
        self.current.store(Arc::clone(&next));
        info!(
            "Published index snapshot generation {} ({} documents, {} terms)",
            next.generation,
            next.documents.len(),
            next.lexical.term_count()
        );
        Ok((out, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::UnicodeTokenizer;

    fn empty() -> IndexSnapshot {
        IndexSnapshot::empty(
            Arc::new(UnicodeTokenizer::new()),
            Bm25Params::default(),
            2,
            &VectorConfig::default(),
        )
    }

    #[test]
    fn test_insert_populates_all_structures() {
        let mut snap = empty();
        let replaced = snap
            .insert(NewDocument::new("a", "Breach of contract", vec![1.0, 0.0]))
            .unwrap();
        assert!(!replaced);
        assert!(snap.documents().contains("a"));
        assert!(snap.lexical().contains("a"));
        assert!(snap.vector().contains("a"));
        assert_eq!(
            snap.documents().get("a").unwrap().tokens,
            vec!["breach", "contract"]
        );
    }

    #[test]
    fn test_invalid_document_leaves_snapshot_untouched() {
        let mut snap = empty();
        snap.insert(NewDocument::new("a", "old", vec![1.0, 0.0])).unwrap();

        let err = snap
            .insert(NewDocument::new("a", "new", vec![1.0, 0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(snap.documents().get("a").unwrap().text, "old");
        assert_eq!(snap.lexical().doc_freq("old"), 1);

        assert_eq!(
            snap.insert(NewDocument::new("", "x", vec![1.0, 0.0])),
            Err(IndexError::EmptyId)
        );
    }

    #[test]
    fn test_replace_retires_old_postings() {
        let mut snap = empty();
        snap.insert(NewDocument::new("a", "assault", vec![1.0, 0.0])).unwrap();
        let replaced = snap
            .insert(NewDocument::new("a", "fraud", vec![0.0, 1.0]))
            .unwrap();
        assert!(replaced);
        assert_eq!(snap.lexical().doc_freq("assault"), 0);
        assert_eq!(snap.lexical().doc_freq("fraud"), 1);
        assert_eq!(snap.vector().get("a").unwrap(), &[0.0, 1.0]);
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_update_bumps_generation_and_swaps() {
        let handle = SnapshotHandle::new(empty());
        let before = handle.load();
        assert_eq!(before.generation(), 0);

        let (_, after) = handle
            .update(|snap| snap.insert(NewDocument::new("a", "text", vec![1.0, 0.0])))
            .unwrap();
        assert_eq!(after.generation(), 1);
        assert_eq!(handle.load().generation(), 1);
        // Readers holding the old snapshot still see the old state
        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn test_failed_update_is_not_published() {
        let handle = SnapshotHandle::new(empty());
        let result = handle.update(|snap| {
            snap.insert(NewDocument::new("a", "ok", vec![1.0, 0.0]))?;
            snap.insert(NewDocument::new("b", "bad", vec![0.0, 0.0]))
        });
        assert!(result.is_err());
        let current = handle.load();
        assert_eq!(current.generation(), 0);
        assert!(current.is_empty());
    }
}
