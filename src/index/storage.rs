//! Corpus persistence
//!
//! Uses sled to keep the documents exactly as they were submitted (text,
//! metadata and the embedding before normalization). Postings, vectors and
//! statistics are derived data and are rebuilt on open through the same
//! insertion path as live writes.

use crate::types::NewDocument;
use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts at acquiring the database file lock
const LOCK_ATTEMPTS: u32 = 10;
const LOCK_BACKOFF: Duration = Duration::from_millis(20);
const MAX_LOCK_BACKOFF: Duration = Duration::from_millis(500);

/// Storage for submitted documents using sled embedded database
pub struct CorpusStorage {
    db: sled::Db,
}

impl CorpusStorage {
    /// Open or create the corpus database under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
        let db_path = data_dir.join("corpus.sled");
        let db = open_db(&db_path)
            .with_context(|| format!("Failed to open corpus database at {:?}", db_path))?;
        Ok(Self { db })
    }

    /// Flush sled buffers to disk
    pub fn save(&self) -> Result<()> {
        self.db.flush().context("Failed to flush corpus database")?;
        Ok(())
    }

    /// Write a batch of upserts and removals in one sled batch
    pub fn apply(&self, upserts: &[NewDocument], removals: &[String]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for id in removals {
            batch.remove(id.as_bytes());
        }
        for doc in upserts {
            let data = bincode::serialize(doc)
                .with_context(|| format!("Failed to serialize document {}", doc.id))?;
            batch.insert(doc.id.as_bytes(), data);
        }
        self.db
            .apply_batch(batch)
            .context("Failed to apply corpus batch")?;
        Ok(())
    }

    /// Get a document by ID
    pub fn get(&self, document_id: &str) -> Option<NewDocument> {
        match self.db.get(document_id.as_bytes()) {
            Ok(Some(data)) => match bincode::deserialize(&data) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!("Failed to deserialize document {}: {}", document_id, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read document {}: {}", document_id, e);
                None
            }
        }
    }

    /// Remove every stored document
    pub fn clear(&self) -> Result<()> {
        self.db.clear().context("Failed to clear corpus database")?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Iterate over all stored documents in id order, skipping unreadable entries
    pub fn iter(&self) -> impl Iterator<Item = NewDocument> + '_ {
        self.db.iter().filter_map(|entry| {
            let (key, value) = match entry {
                Ok(kv) => kv,
                Err(e) => {
                    warn!("Failed to read corpus entry: {}", e);
                    return None;
                }
            };
            match bincode::deserialize::<NewDocument>(&value) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(
                        "Skipping undecodable document {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    None
                }
            }
        })
    }
}

/// sled releases its file lock from a background thread after the last
/// handle drops, so a reopen right after a close can briefly see the lock
/// still held. Retry those with a doubling backoff.
fn open_db(path: &Path) -> sled::Result<sled::Db> {
    let mut attempt = 0;
    loop {
        match sled::open(path) {
            Err(sled::Error::Io(e)) if e.kind() == io::ErrorKind::WouldBlock && attempt + 1 < LOCK_ATTEMPTS => {
                let delay = (LOCK_BACKOFF * 2u32.pow(attempt)).min(MAX_LOCK_BACKOFF);
                attempt += 1;
                debug!("Corpus database {:?} still locked, retrying in {:?}", path, delay);
                std::thread::sleep(delay);
            }
            result => return result,
        }
    }
}
