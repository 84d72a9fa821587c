//! Text analysis shared by indexing and querying
//!
//! The lexical index and every query against it must be tokenized by the
//! same strategy. The index keeps a handle to the tokenizer it was built
//! with, and the query path always tokenizes through that handle.

mod tokenizer;

pub use tokenizer::*;

use crate::config::{LexicalConfig, TokenizerKind};
use std::sync::Arc;

/// Build the configured tokenizer strategy
pub fn build_tokenizer(config: &LexicalConfig) -> SharedTokenizer {
    let base = UnicodeTokenizer::new()
        .with_stop_words(config.stop_words)
        .with_min_token_len(config.min_token_len);

    match config.tokenizer {
        TokenizerKind::Unicode => Arc::new(base),
        TokenizerKind::CjkBigram => Arc::new(CjkBigramTokenizer::new(base)),
    }
}
