//! Index writer for hybrid retrieval
//!
//! `HybridIndexer` is the only writer of the index. Every call applies its
//! whole batch to a private copy of the current snapshot (store, postings,
//! vectors and statistics together), persists the batch, and publishes the
//! copy with one atomic swap.

use crate::index::{CorpusStorage, IndexSnapshot, IndexStats, SnapshotHandle};
use crate::types::{DocumentId, NewDocument};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one write batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Documents that were not indexed before
    pub added: usize,
    /// Documents whose previous version was retired
    pub replaced: usize,
    pub removed: usize,
    /// Generation of the snapshot the batch produced
    pub generation: u64,
}

/// Builds and publishes index snapshots
pub struct HybridIndexer {
    snapshots: Arc<SnapshotHandle>,
    storage: Option<CorpusStorage>,
}

impl HybridIndexer {
    /// In-memory indexer starting from `initial`
    pub fn new(initial: IndexSnapshot) -> Self {
        Self {
            snapshots: Arc::new(SnapshotHandle::new(initial)),
            storage: None,
        }
    }

    /// Rebuild the index from persisted documents.
    ///
    /// Stored documents go through the same insertion path as live writes,
    /// so the result matches indexing the corpus from scratch. Documents
    /// the current configuration rejects (for example after a change of
    /// embedding dimensions) are skipped with a warning.
    pub fn open(empty: IndexSnapshot, storage: CorpusStorage) -> Result<Self> {
        let mut snapshot = empty;
        let mut skipped = 0usize;
        for doc in storage.iter() {
            let id = doc.id.clone();
            if let Err(e) = snapshot.insert(doc) {
                warn!("Skipping stored document {}: {}", id, e);
                skipped += 1;
            }
        }
        info!(
            "Loaded {} documents from storage ({} skipped)",
            snapshot.len(),
            skipped
        );
        Ok(Self {
            snapshots: Arc::new(SnapshotHandle::new(snapshot)),
            storage: Some(storage),
        })
    }

    /// Shared handle readers load snapshots from
    pub fn handle(&self) -> Arc<SnapshotHandle> {
        Arc::clone(&self.snapshots)
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshots.load()
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshots.load().stats()
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Index a batch of documents, replacing any existing document with the
    /// same id. Either the whole batch is published or none of it is.
    ///
    /// An id repeated within the batch is indexed once, from its last copy.
    pub fn add_documents(&self, documents: Vec<NewDocument>) -> Result<BatchReport> {
        if documents.is_empty() {
            return Ok(self.empty_report());
        }
        let documents = last_copy_per_id(documents);
        let (mut report, snapshot) = self.snapshots.update(|snap| -> Result<BatchReport> {
            let mut report = BatchReport::default();
            for doc in &documents {
                let id = doc.id.clone();
                let replaced = snap
                    .insert(doc.clone())
                    .with_context(|| format!("Failed to index document '{}'", id))?;
                if replaced {
                    report.replaced += 1;
                } else {
                    report.added += 1;
                }
            }
            if let Some(storage) = &self.storage {
                storage.apply(&documents, &[])?;
            }
            Ok(report)
        })?;
        report.generation = snapshot.generation();
        Ok(report)
    }

    /// Index or replace a single document. Returns true if it replaced one.
    pub fn upsert(&self, document: NewDocument) -> Result<bool> {
        let report = self.add_documents(vec![document])?;
        Ok(report.replaced > 0)
    }

    /// Retire documents by id. Unknown ids are ignored.
    pub fn remove_documents(&self, ids: &[DocumentId]) -> Result<BatchReport> {
        let current = self.snapshots.load();
        if !ids.iter().any(|id| current.documents().contains(id)) {
            return Ok(self.empty_report());
        }

        let (mut report, snapshot) = self.snapshots.update(|snap| -> Result<BatchReport> {
            let mut report = BatchReport::default();
            for id in ids {
                if snap.remove(id) {
                    report.removed += 1;
                }
            }
            if let Some(storage) = &self.storage {
                storage.apply(&[], ids)?;
            }
            Ok(report)
        })?;
        report.generation = snapshot.generation();
        Ok(report)
    }

    /// Remove every document
    pub fn clear(&self) -> Result<BatchReport> {
        let (mut report, snapshot) = self.snapshots.update(|snap| -> Result<BatchReport> {
            let removed = snap.len();
            snap.clear();
            if let Some(storage) = &self.storage {
                storage.clear()?;
            }
            Ok(BatchReport {
                removed,
                ..BatchReport::default()
            })
        })?;
        report.generation = snapshot.generation();
        Ok(report)
    }

    /// Flush persisted documents
    pub fn save(&self) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.save()?;
        }
        Ok(())
    }

    fn empty_report(&self) -> BatchReport {
        BatchReport {
            generation: self.snapshots.load().generation(),
            ..BatchReport::default()
        }
    }
}

/// Drop all but the last copy of each id, keeping batch order otherwise
fn last_copy_per_id(documents: Vec<NewDocument>) -> Vec<NewDocument> {
    let mut last: HashMap<DocumentId, usize> = HashMap::with_capacity(documents.len());
    for (i, doc) in documents.iter().enumerate() {
        last.insert(doc.id.clone(), i);
    }
    if last.len() == documents.len() {
        return documents;
    }

    debug!(
        "Dropping {} duplicate ids from write batch",
        documents.len() - last.len()
    );
    documents
        .into_iter()
        .enumerate()
        .filter(|(i, doc)| last.get(&doc.id) == Some(i))
        .map(|(_, doc)| doc)
        .collect()
}
