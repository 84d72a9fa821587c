//! Adaptive fusion weights
//!
//! Each query gets its own lexical/semantic weight split. Exact citations
//! (case numbers, statute articles, reporter cites, quoted phrases) favour
//! BM25; long natural-language questions favour the vector index. The split
//! always sums to the configured total, so fused scores stay comparable
//! across queries.

use crate::config::WeightingConfig;
use crate::types::FusionWeights;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Policy mapping query text to fusion weights.
///
/// Implementations must be deterministic: equal input, equal output.
pub trait QueryClassifier: Send + Sync {
    fn classify(&self, query: &str) -> FusionWeights;
}

impl<F> QueryClassifier for F
where
    F: Fn(&str) -> FusionWeights + Send + Sync,
{
    fn classify(&self, query: &str) -> FusionWeights {
        self(query)
    }
}

const CITATION_PATTERNS: &[&str] = &[
    // Korean case numbers: 2019도1234, 2020다 56789, 2018헌바123
    r"\d{2,4}\s?(?:도|다|나|노|누|두|므|르|가합|가단|가소|고합|고단|고정|구합|구단|카합|카단|헌가|헌바|헌마)\s?\d+",
    // Statute article / paragraph: 제250조, 제37조의2, 제1항
    r"제\s?\d+\s?조(?:의\s?\d+)?",
    r"제\s?\d+\s?항",
    // Section sign: § 1983, §§ 2-3
    r"§+\s?\d+",
    // U.S. Code and reporters: 42 U.S.C., 347 U.S. 483, 123 F.3d 456
    r"\d+\s+U\.S\.C\.",
    r"\d+\s+U\.S\.\s+\d+",
    r"\d+\s+F\.(?:2d|3d|4th)?\s+\d+",
    // Articles: Art. 5, Article 12
    r"(?i)\bart(?:icle)?\.?\s?\d+",
];

const QUOTED_PATTERNS: &[&str] = &[r#""[^"]+""#, r"“[^”]+”", r"「[^」]+」"];

const QUESTION_WORDS: &[&str] = &[
    "what", "how", "why", "when", "which", "who", "whom", "whether", "can", "could", "should",
    "is", "are", "does", "do", "may", "must",
];

const KOREAN_QUESTION_MARKERS: &[&str] = &[
    "어떻게", "무엇", "왜", "언제", "어떤", "누가", "인가요", "나요", "까요", "습니까", "는지",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid query pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

fn citation_patterns() -> &'static [Regex] {
    static RE_CITATIONS: OnceLock<Vec<Regex>> = OnceLock::new();
    RE_CITATIONS.get_or_init(|| compile(CITATION_PATTERNS))
}

fn quoted_patterns() -> &'static [Regex] {
    static RE_QUOTED: OnceLock<Vec<Regex>> = OnceLock::new();
    RE_QUOTED.get_or_init(|| compile(QUOTED_PATTERNS))
}

/// Surface features of a query used for weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFeatures {
    /// Words by Unicode segmentation
    pub token_count: usize,
    /// Citation-like spans (case numbers, statute articles, reporter cites)
    pub citations: usize,
    pub quoted_phrases: usize,
    pub is_question: bool,
}

impl QueryFeatures {
    pub fn extract(query: &str) -> Self {
        let words: Vec<String> = query.unicode_words().map(|w| w.to_lowercase()).collect();
        let citations = citation_patterns()
            .iter()
            .map(|re| re.find_iter(query).count())
            .sum();
        let quoted_phrases = quoted_patterns()
            .iter()
            .map(|re| re.find_iter(query).count())
            .sum();

        let trimmed = query.trim_end();
        let is_question = trimmed.ends_with('?')
            || trimmed.ends_with('？')
            || words
                .first()
                .is_some_and(|w| QUESTION_WORDS.contains(&w.as_str()))
            || KOREAN_QUESTION_MARKERS.iter().any(|m| query.contains(m));

        Self {
            token_count: words.len(),
            citations,
            quoted_phrases,
            is_question,
        }
    }

    pub fn has_exact_reference(&self) -> bool {
        self.citations > 0 || self.quoted_phrases > 0
    }
}

/// Coarse query type driving the weight split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Contains a citation, case number or quoted phrase
    Citation,
    /// Long free-text description
    NaturalLanguage,
    /// Shorter question
    Question,
    /// One or two keywords
    Keyword,
    Balanced,
}

/// Rule-based classifier for legal queries
#[derive(Debug, Clone)]
pub struct LegalQueryClassifier {
    config: WeightingConfig,
    total: f32,
}

impl LegalQueryClassifier {
    pub fn new(config: WeightingConfig, total: f32) -> Self {
        Self { config, total }
    }

    pub fn kind(&self, features: &QueryFeatures) -> QueryKind {
        if features.has_exact_reference() {
            QueryKind::Citation
        } else if features.token_count >= self.config.long_query_tokens {
            QueryKind::NaturalLanguage
        } else if features.is_question {
            QueryKind::Question
        } else if features.token_count <= self.config.short_query_tokens {
            QueryKind::Keyword
        } else {
            QueryKind::Balanced
        }
    }

    /// Lexical share of the total weight for a query kind
    pub fn lexical_share(&self, kind: QueryKind) -> f32 {
        let share = match kind {
            QueryKind::Citation => self.config.citation_lexical_share,
            QueryKind::NaturalLanguage => 1.0 - self.config.long_query_semantic_share,
            QueryKind::Question => 1.0 - self.config.question_semantic_share,
            QueryKind::Keyword => self.config.short_query_lexical_share,
            QueryKind::Balanced => 0.5,
        };
        let floor = self.config.min_share.clamp(0.0, 0.5);
        share.clamp(floor, 1.0 - floor)
    }
}

impl Default for LegalQueryClassifier {
    fn default() -> Self {
        Self::new(WeightingConfig::default(), 2.0)
    }
}

impl QueryClassifier for LegalQueryClassifier {
    fn classify(&self, query: &str) -> FusionWeights {
        let features = QueryFeatures::extract(query);
        let lexical = self.lexical_share(self.kind(&features)) * self.total;
        FusionWeights::new(lexical, self.total - lexical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LegalQueryClassifier {
        LegalQueryClassifier::default()
    }

    // ========================================================================
    // Feature extraction
    // ========================================================================

    #[test]
    fn test_detects_korean_case_numbers_and_articles() {
        assert!(QueryFeatures::extract("대법원 2019도1234 판결").citations > 0);
        assert!(QueryFeatures::extract("2020다 56789").citations > 0);
        assert!(QueryFeatures::extract("형법 제250조 살인").citations > 0);
        assert!(QueryFeatures::extract("민법 제750조의2 제1항").citations >= 2);
    }

    #[test]
    fn test_detects_us_citations() {
        assert!(QueryFeatures::extract("Brown v. Board, 347 U.S. 483").citations > 0);
        assert!(QueryFeatures::extract("42 U.S.C. § 1983 claim").citations > 0);
        assert!(QueryFeatures::extract("Article 12 of the convention").citations > 0);
    }

    #[test]
    fn test_plain_text_has_no_citations() {
        let f = QueryFeatures::extract("폭행 상해");
        assert_eq!(f.citations, 0);
        assert_eq!(f.quoted_phrases, 0);
        assert_eq!(f.token_count, 2);
        // Dates are not case numbers
        assert_eq!(QueryFeatures::extract("2019년 3월 사건").citations, 0);
    }

    #[test]
    fn test_quoted_phrase() {
        assert_eq!(QueryFeatures::extract(r#""duty of care" breach"#).quoted_phrases, 1);
    }

    #[test]
    fn test_question_markers() {
        assert!(QueryFeatures::extract("what is negligence").is_question);
        assert!(QueryFeatures::extract("negligence?").is_question);
        assert!(QueryFeatures::extract("손해배상 청구는 어떻게 하나요").is_question);
        assert!(!QueryFeatures::extract("negligence damages").is_question);
    }

    // ========================================================================
    // Classification
    // ========================================================================

    #[test]
    fn test_citation_biases_lexical() {
        let w = classifier().classify("2019도1234");
        assert!(w.lexical > w.semantic);
        assert!((w.lexical - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_long_question_biases_semantic() {
        let w = classifier().classify(
            "my neighbour hit me during an argument and I was injured, can I claim compensation for medical costs",
        );
        assert!(w.semantic > w.lexical);
    }

    #[test]
    fn test_kinds() {
        let c = classifier();
        let kind = |q: &str| c.kind(&QueryFeatures::extract(q));
        assert_eq!(kind("제750조 불법행위"), QueryKind::Citation);
        assert_eq!(kind("폭행"), QueryKind::Keyword);
        assert_eq!(kind("what counts as assault"), QueryKind::Question);
        assert_eq!(kind("assault battery damages claim"), QueryKind::Balanced);
    }

    #[test]
    fn test_classify_is_pure_and_sums_to_total() {
        let c = classifier();
        let queries = [
            "",
            "폭행 상해",
            "2019도1234",
            "what is the statute of limitations for fraud in civil cases in Korea",
            "\"duty of care\"",
            "contract",
            "Art. 5",
        ];
        for q in queries {
            let first = c.classify(q);
            let second = c.classify(q);
            assert_eq!(first, second, "classify must be deterministic for {:?}", q);
            assert!((first.total() - 2.0).abs() < 1e-6, "sum for {:?}", q);
            assert!(first.lexical >= 0.0 && first.semantic >= 0.0);
        }
    }

    #[test]
    fn test_min_share_floor() {
        let config = WeightingConfig {
            citation_lexical_share: 1.0,
            min_share: 0.1,
            ..WeightingConfig::default()
        };
        let c = LegalQueryClassifier::new(config, 2.0);
        let w = c.classify("2019도1234");
        assert!((w.semantic - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_closure_classifier() {
        let fixed = |_: &str| FusionWeights::new(0.5, 1.5);
        assert_eq!(fixed.classify("anything"), FusionWeights::new(0.5, 1.5));
    }
}
