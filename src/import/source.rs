//! Corpus sources and import bookkeeping

use crate::types::{Metadata, NewDocument};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// One corpus record: `{"id": .., "text": .., "metadata": {..}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
    /// Values that are not strings are kept as their JSON text
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CorpusRecord {
    /// Pair the record with its embedding for indexing
    pub fn into_document(self, embedding: Vec<f32>) -> NewDocument {
        let metadata: Metadata = self
            .metadata
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        NewDocument {
            id: self.id,
            text: self.text,
            metadata,
            embedding,
        }
    }
}

/// A stream of corpus records
pub trait CorpusSource: Send {
    /// Iterate over records. Item errors are per record; the stream continues.
    fn records(&mut self) -> Box<dyn Iterator<Item = Result<CorpusRecord, ImportError>> + Send + '_>;

    /// Source name for display
    fn source_name(&self) -> &str;
}

/// Newline-delimited JSON corpus
pub struct JsonlSource {
    reader: Box<dyn BufRead + Send>,
    name: String,
}

impl JsonlSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::from_reader(file, path.display().to_string()))
    }

    pub fn from_reader(reader: impl Read + Send + 'static, name: impl Into<String>) -> Self {
        Self {
            reader: Box::new(BufReader::new(reader)),
            name: name.into(),
        }
    }
}

impl CorpusSource for JsonlSource {
    fn records(&mut self) -> Box<dyn Iterator<Item = Result<CorpusRecord, ImportError>> + Send + '_> {
        let iter = (&mut self.reader)
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let line_no = i + 1;
                let line = match line {
                    Ok(line) => line,
                    Err(e) => return Some(Err(ImportError::Io(e))),
                };
                if line.trim().is_empty() {
                    return None;
                }
                Some(
                    serde_json::from_str::<CorpusRecord>(&line).map_err(|e| ImportError::Parse {
                        line: line_no,
                        message: e.to_string(),
                    }),
                )
            });
        Box::new(iter)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Import statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    /// Records read from the source, malformed ones included
    pub records_read: usize,
    /// Documents new to the index
    pub documents_added: usize,
    /// Documents that replaced an existing id
    pub documents_replaced: usize,
    /// Malformed or empty records
    pub records_skipped: usize,
    pub batches: usize,
    /// Snapshot generation after the last batch
    pub generation: u64,
    pub elapsed_seconds: f64,
}

impl ImportStats {
    pub fn documents_indexed(&self) -> usize {
        self.documents_added + self.documents_replaced
    }

    pub fn docs_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.documents_indexed() as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// Errors that can occur during import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    #[error("Index error: {0}")]
    Index(String),
}

impl ImportError {
    /// Record-level errors skip the record; the rest abort the import
    pub fn is_record_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
