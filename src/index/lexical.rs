//! Inverted index with BM25 scoring
//!
//! Postings per term are kept sorted by document id. Document lengths and
//! the corpus token total are integers, so removing a document and adding it
//! back restores the statistics exactly. Each document remembers its
//! distinct terms, so removal touches only its own postings lists.

use super::ShardedMap;
use crate::text::SharedTokenizer;
use crate::types::{DocumentId, Posting};
use std::collections::HashMap;
use std::sync::Arc;

/// BM25 constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl From<&crate::config::LexicalConfig> for Bm25Params {
    fn from(config: &crate::config::LexicalConfig) -> Self {
        Self {
            k1: config.k1,
            b: config.b,
        }
    }
}

#[derive(Debug, Clone)]
struct DocEntry {
    length: u64,
    terms: Arc<[String]>,
}

/// Inverted index over document tokens.
///
/// Cloning is cheap relative to the index size: maps are sharded and
/// postings lists sit behind `Arc`, both copied only when a write touches
/// them.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    tokenizer: SharedTokenizer,
    params: Bm25Params,
    postings: ShardedMap<Arc<Vec<Posting>>>,
    docs: ShardedMap<DocEntry>,
    total_tokens: u64,
}

impl LexicalIndex {
    pub fn new(tokenizer: SharedTokenizer, params: Bm25Params) -> Self {
        Self {
            tokenizer,
            params,
            postings: ShardedMap::new(),
            docs: ShardedMap::new(),
            total_tokens: 0,
        }
    }

    /// The tokenizer every indexed document went through
    pub fn tokenizer(&self) -> &SharedTokenizer {
        &self.tokenizer
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Index a document's tokens, replacing any previous entry for the id
    pub fn insert(&mut self, document_id: &str, tokens: &[String]) {
        if self.docs.contains_key(document_id) {
            self.remove(document_id);
        }

        let freqs = term_frequencies(tokens);
        for (term, tf) in &freqs {
            let list = Arc::make_mut(self.postings.get_or_insert_with(term, Default::default));
            let posting = Posting {
                document_id: document_id.to_string(),
                term_frequency: *tf,
            };
            match list.binary_search_by(|p| p.document_id.as_str().cmp(document_id)) {
                Ok(pos) => list[pos] = posting,
                Err(pos) => list.insert(pos, posting),
            }
        }

        let length = tokens.len() as u64;
        self.docs.insert(
            document_id.to_string(),
            DocEntry {
                length,
                terms: freqs.into_keys().collect(),
            },
        );
        self.total_tokens += length;
    }

    /// Retire every posting of a document and its length statistics.
    ///
    /// Returns false if the document was not indexed.
    pub fn remove(&mut self, document_id: &str) -> bool {
        let Some(entry) = self.docs.remove(document_id) else {
            return false;
        };
        self.total_tokens -= entry.length;

        for term in entry.terms.iter() {
            let now_empty = match self.postings.get_mut(term) {
                Some(list) => {
                    if let Ok(pos) = list.binary_search_by(|p| p.document_id.as_str().cmp(document_id)) {
                        Arc::make_mut(list).remove(pos);
                    }
                    list.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.postings.remove(term);
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.docs.clear();
        self.total_tokens = 0;
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.docs.contains_key(document_id)
    }

    /// Number of indexed documents (N)
    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    /// Number of distinct terms
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn doc_length(&self, document_id: &str) -> Option<u64> {
        self.docs.get(document_id).map(|d| d.length)
    }

    /// Mean document length in tokens (avgdl)
    pub fn avg_doc_length(&self) -> f64 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_tokens as f64 / self.docs.len() as f64
        }
    }

    /// Postings for a term, sorted by document id
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(|l| l.as_slice()).unwrap_or(&[])
    }

    /// Number of documents containing the term (df)
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings(term).len()
    }

    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.document_count() as f64;
        let df = self.doc_freq(term) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Add one term's BM25 contribution to every document containing it
    pub fn accumulate(&self, term: &str, scores: &mut HashMap<DocumentId, f64>) {
        let list = self.postings(term);
        if list.is_empty() {
            return;
        }
        let idf = self.idf(term);
        let avgdl = self.avg_doc_length();
        let Bm25Params { k1, b } = self.params;

        for posting in list {
            let tf = posting.term_frequency as f64;
            let dl = self.doc_length(&posting.document_id).unwrap_or(0) as f64;
            let norm = if avgdl > 0.0 { dl / avgdl } else { 1.0 };
            let contribution = idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * norm));
            *scores.entry(posting.document_id.clone()).or_insert(0.0) += contribution;
        }
    }

    /// BM25 score of one document for the given query terms
    pub fn score(&self, document_id: &str, query_terms: &[String]) -> f64 {
        let mut scores = HashMap::new();
        for term in distinct_terms(query_terms) {
            self.accumulate(term, &mut scores);
        }
        scores.get(document_id).copied().unwrap_or(0.0)
    }
}

/// Query terms with duplicates removed, first occurrence order
pub fn distinct_terms(tokens: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    tokens
        .iter()
        .map(String::as_str)
        .filter(|t| seen.insert(*t))
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<String, u32> {
    let mut freqs: HashMap<String, u32> = HashMap::new();
    for token in tokens {
        *freqs.entry(token.clone()).or_insert(0) += 1;
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::UnicodeTokenizer;

    fn index() -> LexicalIndex {
        LexicalIndex::new(
            Arc::new(UnicodeTokenizer::new().with_stop_words(false)),
            Bm25Params::default(),
        )
    }

    fn add(idx: &mut LexicalIndex, id: &str, text: &str) {
        let tokens = idx.tokenize(text);
        idx.insert(id, &tokens);
    }

    fn terms(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_postings_sorted_and_unique() {
        let mut idx = index();
        add(&mut idx, "c", "negligence negligence duty");
        add(&mut idx, "a", "negligence");
        add(&mut idx, "b", "duty");

        let ids: Vec<&str> = idx
            .postings("negligence")
            .iter()
            .map(|p| p.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(idx.postings("negligence")[1].term_frequency, 2);
        assert_eq!(idx.doc_freq("duty"), 2);
    }

    #[test]
    fn test_statistics_maintained() {
        let mut idx = index();
        add(&mut idx, "a", "one two three");
        add(&mut idx, "b", "one");
        assert_eq!(idx.document_count(), 2);
        assert_eq!(idx.total_tokens(), 4);
        assert!((idx.avg_doc_length() - 2.0).abs() < 1e-9);

        assert!(idx.remove("a"));
        assert_eq!(idx.document_count(), 1);
        assert_eq!(idx.total_tokens(), 1);
        assert_eq!(idx.doc_freq("two"), 0);
        assert_eq!(idx.term_count(), 1);
        assert!(!idx.remove("a"));
    }

    #[test]
    fn test_idf_formula() {
        let mut idx = index();
        add(&mut idx, "a", "tort");
        add(&mut idx, "b", "contract");
        add(&mut idx, "c", "contract");
        // N=3, df=1 -> ln(1 + 2.5/1.5)
        let expected = (1.0f64 + 2.5 / 1.5).ln();
        assert!((idx.idf("tort") - expected).abs() < 1e-12);
        assert!(idx.idf("tort") > idx.idf("contract"));
        assert!(idx.idf("unseen") > 0.0);
    }

    #[test]
    fn test_bm25_single_term_by_hand() {
        let mut idx = index();
        add(&mut idx, "a", "x x y");
        add(&mut idx, "b", "y");
        // N=2, df(x)=1, tf=2, |a|=3, avgdl=2
        let idf = (1.0f64 + 1.5 / 1.5).ln();
        let k1 = 1.2f64;
        let b = 0.75f64;
        let expected = idf * (2.0 * (k1 + 1.0)) / (2.0 + k1 * (1.0 - b + b * 3.0 / 2.0));
        let got = idx.score("a", &terms("x"));
        assert!((got - expected).abs() < 1e-9, "{} vs {}", got, expected);
    }

    #[test]
    fn test_zero_score_without_overlap() {
        let mut idx = index();
        add(&mut idx, "a", "breach of contract");
        add(&mut idx, "b", "criminal assault");
        assert_eq!(idx.score("b", &terms("contract breach")), 0.0);
        assert_eq!(idx.score("a", &terms("unknown")), 0.0);
    }

    #[test]
    fn test_duplicate_query_terms_count_once() {
        let mut idx = index();
        add(&mut idx, "a", "fraud");
        add(&mut idx, "b", "theft");
        assert_eq!(
            idx.score("a", &terms("fraud fraud fraud")),
            idx.score("a", &terms("fraud"))
        );
    }

    #[test]
    fn test_reinsert_replaces_previous_tokens() {
        let mut idx = index();
        add(&mut idx, "a", "old text here");
        add(&mut idx, "a", "new");
        assert_eq!(idx.document_count(), 1);
        assert_eq!(idx.total_tokens(), 1);
        assert_eq!(idx.doc_freq("old"), 0);
        assert_eq!(idx.doc_freq("new"), 1);
    }

    #[test]
    fn test_remove_then_readd_restores_scores() {
        let mut idx = index();
        add(&mut idx, "a", "damages claim damages");
        add(&mut idx, "b", "claim dismissed");
        add(&mut idx, "c", "appeal");
        let q = terms("damages claim");
        let before: Vec<f64> = ["a", "b", "c"].iter().map(|d| idx.score(d, &q)).collect();

        idx.remove("b");
        add(&mut idx, "b", "claim dismissed");
        let after: Vec<f64> = ["a", "b", "c"].iter().map(|d| idx.score(d, &q)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_clone_is_isolated() {
        let mut idx = index();
        add(&mut idx, "a", "shared term");
        let snapshot = idx.clone();
        add(&mut idx, "b", "shared");
        assert_eq!(snapshot.doc_freq("shared"), 1);
        assert_eq!(idx.doc_freq("shared"), 2);
    }

    #[test]
    fn test_configured_constants_used_exactly() {
        let mut idx = LexicalIndex::new(
            Arc::new(UnicodeTokenizer::new().with_stop_words(false)),
            Bm25Params { k1: 1.7, b: 0.3 },
        );
        add(&mut idx, "a", "x x x y y");
        add(&mut idx, "b", "y");
        // N=2, df(x)=1, tf=3, |a|=5, avgdl=3
        let idf = (1.0f64 + 1.5 / 1.5).ln();
        let expected = idf * (3.0 * (1.7 + 1.0)) / (3.0 + 1.7 * (1.0 - 0.3 + 0.3 * 5.0 / 3.0));
        assert!((idx.score("a", &terms("x")) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_remove_drops_only_emptied_terms() {
        let mut idx = index();
        add(&mut idx, "a", "shared alpha");
        add(&mut idx, "b", "shared beta");
        assert_eq!(idx.term_count(), 3);

        assert!(idx.remove("a"));
        assert_eq!(idx.term_count(), 2);
        assert_eq!(idx.doc_freq("alpha"), 0);
        let ids: Vec<&str> = idx
            .postings("shared")
            .iter()
            .map(|p| p.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(idx.doc_freq("beta"), 1);
    }

    #[test]
    fn test_distinct_terms_keeps_order() {
        let t = terms("b a b c a");
        assert_eq!(distinct_terms(&t), vec!["b", "a", "c"]);
    }
}
