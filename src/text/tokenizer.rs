//! Tokenization strategies

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};
use unicode_segmentation::UnicodeSegmentation;

/// Capability to turn text into index terms
///
/// Object-safe so that a single `Arc<dyn Tokenizer>` can be shared between
/// the index writer and the query path.
pub trait Tokenizer: Send + Sync + Debug {
    /// Split text into normalized terms, in document order
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Strategy name, recorded in index snapshots
    fn name(&self) -> &str;
}

/// Shared tokenizer handle
pub type SharedTokenizer = Arc<dyn Tokenizer>;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP_WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

/// Unicode word segmentation with case folding
#[derive(Debug, Clone)]
pub struct UnicodeTokenizer {
    stop_words: bool,
    min_token_len: usize,
}

impl UnicodeTokenizer {
    pub fn new() -> Self {
        Self {
            stop_words: true,
            min_token_len: 1,
        }
    }

    /// Drop common English function words
    pub fn with_stop_words(mut self, enabled: bool) -> Self {
        self.stop_words = enabled;
        self
    }

    /// Drop words shorter than `len` characters
    pub fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len.max(1);
        self
    }

    /// Lowercased words that survive the length and stop-word filters
    fn words<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.unicode_words()
            .map(|w| w.to_lowercase())
            .filter(move |w| w.chars().count() >= self.min_token_len)
            .filter(move |w| !(self.stop_words && stop_words().contains(w.as_str())))
    }
}

impl Default for UnicodeTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.words(text).collect()
    }

    fn name(&self) -> &str {
        "unicode"
    }
}

/// Unicode words, with Hangul/CJK runs expanded into overlapping bigrams.
///
/// Korean legal terms are compounds without spaces (`폭행죄`, `손해배상`),
/// so whole-word matching misses the stem a query uses (`폭행`). Bigrams
/// make those partial matches visible to BM25. Non-CJK runs inside a word
/// (`2019도1234` → `2019`, `도`, `1234`) are kept whole.
#[derive(Debug, Clone)]
pub struct CjkBigramTokenizer {
    inner: UnicodeTokenizer,
}

impl CjkBigramTokenizer {
    pub fn new(inner: UnicodeTokenizer) -> Self {
        Self { inner }
    }
}

impl Default for CjkBigramTokenizer {
    fn default() -> Self {
        Self::new(UnicodeTokenizer::new())
    }
}

impl Tokenizer for CjkBigramTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in self.inner.words(text) {
            if !word.chars().any(is_cjk) {
                tokens.push(word);
                continue;
            }
            for (cjk, run) in split_runs(&word) {
                if cjk {
                    push_bigrams(&run, &mut tokens);
                } else {
                    tokens.push(run);
                }
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "cjk_bigram"
    }
}

/// Hangul, CJK ideographs and kana
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'   // Hangul syllables
        | '\u{1100}'..='\u{11FF}' // Hangul jamo
        | '\u{3130}'..='\u{318F}' // Hangul compatibility jamo
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{3040}'..='\u{30FF}' // Hiragana and Katakana
    )
}

/// Split a word into maximal runs of CJK / non-CJK characters
fn split_runs(word: &str) -> Vec<(bool, String)> {
    let mut runs: Vec<(bool, String)> = Vec::new();
    for c in word.chars() {
        let cjk = is_cjk(c);
        match runs.last_mut() {
            Some((last_cjk, run)) if *last_cjk == cjk => run.push(c),
            _ => runs.push((cjk, c.to_string())),
        }
    }
    runs
}

fn push_bigrams(run: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = run.chars().collect();
    if chars.len() < 2 {
        out.push(run.to_string());
        return;
    }
    out.extend(chars.windows(2).map(|pair| pair.iter().collect::<String>()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_tokenizer_folds_case_and_punctuation() {
        let t = UnicodeTokenizer::new();
        assert_eq!(
            t.tokenize("Hello, World! Breach of CONTRACT."),
            vec!["hello", "world", "breach", "contract"]
        );
    }

    #[test]
    fn test_unicode_tokenizer_stop_words_toggle() {
        let t = UnicodeTokenizer::new().with_stop_words(false);
        assert_eq!(t.tokenize("the duty of care"), vec!["the", "duty", "of", "care"]);

        let t = UnicodeTokenizer::new();
        assert_eq!(t.tokenize("the duty of care"), vec!["duty", "care"]);
    }

    #[test]
    fn test_unicode_tokenizer_min_len() {
        let t = UnicodeTokenizer::new().with_stop_words(false).with_min_token_len(3);
        assert_eq!(t.tokenize("an ox is big"), vec!["big"]);
    }

    #[test]
    fn test_unicode_tokenizer_keeps_korean_words_whole() {
        let t = UnicodeTokenizer::new();
        assert_eq!(t.tokenize("폭행죄 상해"), vec!["폭행죄", "상해"]);
    }

    #[test]
    fn test_cjk_bigrams() {
        let t = CjkBigramTokenizer::default();
        assert_eq!(t.tokenize("폭행죄 상해"), vec!["폭행", "행죄", "상해"]);
        assert_eq!(t.tokenize("폭행"), vec!["폭행"]);
    }

    #[test]
    fn test_cjk_single_char_kept() {
        let t = CjkBigramTokenizer::default();
        assert_eq!(t.tokenize("죄"), vec!["죄"]);
    }

    #[test]
    fn test_cjk_mixed_word_splits_runs() {
        let runs = split_runs("2019도1234");
        assert_eq!(
            runs,
            vec![
                (false, "2019".to_string()),
                (true, "도".to_string()),
                (false, "1234".to_string())
            ]
        );
    }

    #[test]
    fn test_cjk_latin_passthrough() {
        let t = CjkBigramTokenizer::default();
        assert_eq!(t.tokenize("Negligence claim"), vec!["negligence", "claim"]);
    }

    #[test]
    fn test_tokenizer_is_deterministic() {
        let t = CjkBigramTokenizer::default();
        let text = "대법원 2019도1234 판결 손해배상 청구";
        assert_eq!(t.tokenize(text), t.tokenize(text));
    }
}
