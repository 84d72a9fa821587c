//! Integration tests for jurisearch
//!
//! These tests exercise the engine end to end: indexing, concurrent hybrid
//! retrieval, degraded mode, snapshot swaps and persistence.

use async_trait::async_trait;
use jurisearch::{
    config::{Config, RetrievalConfig, VectorConfig},
    embedding::{EmbeddingBackend, EmbeddingError, EmbeddingResult},
    import::JsonlSource,
    index::{Bm25Params, IndexSnapshot},
    query::{QueryCoordinator, RetrievalError, SourceFailure},
    retrieval::{
        fuse, HybridIndexer, LegalQueryClassifier, LexicalRetriever, QueryClassifier, RrfConfig,
        SemanticRetriever,
    },
    text::{CjkBigramTokenizer, SharedTokenizer, UnicodeTokenizer},
    Embedding, FusionWeights, NewDocument, RankedCandidate, RetrievalEngine, RetrievalSource,
};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Embedder returning one fixed vector, optionally after a delay
#[derive(Debug)]
struct FixedEmbedder {
    vector: Embedding,
    delay: Duration,
}

impl FixedEmbedder {
    fn new(vector: Embedding) -> Arc<Self> {
        Arc::new(Self {
            vector,
            delay: Duration::ZERO,
        })
    }

    fn slow(vector: Embedding, delay: Duration) -> Arc<Self> {
        Arc::new(Self { vector, delay })
    }
}

#[async_trait]
impl EmbeddingBackend for FixedEmbedder {
    async fn embed(&self, _text: &str) -> EmbeddingResult<Embedding> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[derive(Debug)]
struct FailingEmbedder {
    dims: usize,
}

#[async_trait]
impl EmbeddingBackend for FailingEmbedder {
    async fn embed(&self, _text: &str) -> EmbeddingResult<Embedding> {
        Err(EmbeddingError::EmbeddingFailed("provider returned 503".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn empty_snapshot(tokenizer: SharedTokenizer, dims: usize) -> IndexSnapshot {
    IndexSnapshot::empty(tokenizer, Bm25Params::default(), dims, &VectorConfig::default())
}

/// Three-document Korean corpus: A and C mention assault causing injury,
/// B and C mention a damages claim.
fn korean_indexer() -> HybridIndexer {
    let indexer = HybridIndexer::new(empty_snapshot(
        Arc::new(CjkBigramTokenizer::default()),
        3,
    ));
    indexer
        .add_documents(vec![
            NewDocument::new("A", "폭행죄 상해 폭행죄 상해", vec![0.7, 0.7, 0.0])
                .with_metadata("court", "대법원"),
            NewDocument::new("B", "손해배상 청구", vec![0.0, 1.0, 0.0]),
            NewDocument::new("C", "폭행죄 상해 손해배상 청구", vec![1.0, 0.2, 0.0]),
        ])
        .unwrap();
    indexer
}

fn balanced() -> Arc<dyn QueryClassifier> {
    Arc::new(|_: &str| FusionWeights::balanced(2.0))
}

fn coordinator(
    indexer: &HybridIndexer,
    embedder: Arc<dyn EmbeddingBackend>,
    classifier: Arc<dyn QueryClassifier>,
) -> QueryCoordinator {
    QueryCoordinator::new(
        indexer.handle(),
        embedder,
        classifier,
        RrfConfig::default(),
        RetrievalConfig::default(),
    )
}

fn ids(list: &[RankedCandidate]) -> Vec<&str> {
    list.iter().map(|c| c.document_id.as_str()).collect()
}

#[test]
fn test_korean_bm25_ranks_matches_above_unrelated() {
    let indexer = korean_indexer();
    let snapshot = indexer.snapshot();
    let tokens = snapshot.lexical().tokenize("폭행 상해");

    let ranked = LexicalRetriever::new(snapshot.lexical()).search(&tokens, 10);
    assert_eq!(ids(&ranked), vec!["A", "C"]);
    assert_eq!(snapshot.lexical().score("B", &tokens), 0.0);
}

#[test]
fn test_korean_semantic_ranks_c_first() {
    let indexer = korean_indexer();
    let snapshot = indexer.snapshot();
    let ranked = SemanticRetriever::new(snapshot.vector())
        .search(&[1.0, 0.0, 0.0], 3)
        .unwrap();
    assert_eq!(ids(&ranked), vec!["C", "A", "B"]);
}

#[tokio::test]
async fn test_korean_fused_top2() {
    let indexer = korean_indexer();
    let coord = coordinator(&indexer, FixedEmbedder::new(vec![1.0, 0.0, 0.0]), balanced());

    let outcome = coord
        .retrieve("폭행 상해", 2, Duration::from_secs(2))
        .await
        .unwrap();

    assert!(!outcome.degraded);
    let top: HashSet<&str> = outcome.document_ids().into_iter().collect();
    assert_eq!(top, HashSet::from(["A", "C"]));

    let a = outcome.results.iter().find(|r| r.document_id == "A").unwrap();
    assert_eq!(a.source_metadata.get("court").map(String::as_str), Some("대법원"));
    assert_eq!(a.contributing_ranks.lexical, Some(1));
    assert_eq!(a.contributing_ranks.semantic, Some(2));
}

#[test]
fn test_fusion_properties() {
    let cand = |id: &str, rank: usize| RankedCandidate {
        document_id: id.to_string(),
        rank,
        raw_score: 0.0,
    };
    let rrf = RrfConfig::default();
    let weights = FusionWeights::balanced(2.0);

    // Disjoint lists: union length, single-source contributions
    let fused = fuse(&[cand("a", 1), cand("b", 2)], &[cand("c", 1)], weights, &rrf, None);
    assert_eq!(fused.len(), 3);
    for hit in &fused {
        let expected = match hit.document_id.as_str() {
            "a" | "c" => 1.0 / 61.0,
            _ => 1.0 / 62.0,
        };
        assert!((hit.fused_score as f64 - expected).abs() < 1e-6);
    }

    // Reinforcement: present in both beats either alone
    let both = fuse(&[cand("a", 3)], &[cand("a", 3)], weights, &rrf, None);
    let single = fuse(&[cand("a", 3)], &[], weights, &rrf, None);
    assert!(both[0].fused_score > single[0].fused_score);
}

#[test]
fn test_classify_is_pure_with_constant_total() {
    let classifier = LegalQueryClassifier::default();
    let queries = [
        "대법원 2019도1234 판결",
        "형법 제257조 제1항",
        "what happens if my landlord keeps the deposit after I move out of the apartment",
        "is a verbal contract binding?",
        "negligence",
        "\"duty of care\" standard",
        "손해배상 청구 소송 절차가 어떻게 되나요?",
        "18 U.S.C. § 1030",
    ];
    for q in queries {
        let first = classifier.classify(q);
        let second = classifier.classify(q);
        assert_eq!(first, second, "classify not deterministic for {q}");
        assert!((first.total() - 2.0).abs() < 1e-5, "total drifted for {q}");
        assert!(first.lexical >= 0.0 && first.semantic >= 0.0);
    }

    let citation = classifier.classify("형법 제257조 제1항");
    let long = classifier.classify(
        "what happens if my landlord keeps the deposit after I move out of the apartment",
    );
    assert!(citation.lexical > citation.semantic);
    assert!(long.semantic > long.lexical);
}

#[tokio::test]
async fn test_degraded_results_are_subset_of_lexical() {
    let indexer = korean_indexer();
    let coord = coordinator(
        &indexer,
        FixedEmbedder::slow(vec![0.0, 1.0, 0.0], Duration::from_secs(30)),
        balanced(),
    );

    let outcome = coord
        .retrieve("폭행 상해", 3, Duration::from_millis(150))
        .await
        .unwrap();

    assert!(outcome.degraded);
    assert_eq!(outcome.missing_source, Some(RetrievalSource::Semantic));
    assert_eq!(outcome.missing_reason, Some(SourceFailure::TimedOut));
    assert_eq!(outcome.applied_weights.semantic, 0.0);

    let snapshot = indexer.snapshot();
    let tokens = snapshot.lexical().tokenize("폭행 상해");
    let lexical: HashSet<String> = LexicalRetriever::new(snapshot.lexical())
        .search(&tokens, 50)
        .into_iter()
        .map(|c| c.document_id)
        .collect();
    for hit in &outcome.results {
        assert!(lexical.contains(&hit.document_id));
        assert!(hit.degraded);
    }
    assert!(!outcome.document_ids().contains(&"B"));
}

#[tokio::test]
async fn test_timeout_bounds_latency() {
    let indexer = korean_indexer();
    let coord = coordinator(
        &indexer,
        FixedEmbedder::slow(vec![1.0, 0.0, 0.0], Duration::from_secs(30)),
        balanced(),
    );
    let started = std::time::Instant::now();
    let _ = coord
        .retrieve("폭행", 2, Duration::from_millis(100))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_both_sources_failing_is_unavailable() {
    let indexer = korean_indexer();
    let config = RetrievalConfig {
        enable_lexical: false,
        ..RetrievalConfig::default()
    };
    let coord = QueryCoordinator::new(
        indexer.handle(),
        Arc::new(FailingEmbedder { dims: 3 }),
        balanced(),
        RrfConfig::default(),
        config,
    );

    let err = coord
        .retrieve("폭행 상해", 3, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Unavailable {
            lexical: SourceFailure::Disabled,
            semantic: SourceFailure::Failed(_),
        }
    ));
}

#[tokio::test]
async fn test_cancelled_retrieve_surfaces_cancellation() {
    let indexer = korean_indexer();
    let coord = coordinator(
        &indexer,
        FixedEmbedder::slow(vec![1.0, 0.0, 0.0], Duration::from_secs(30)),
        balanced(),
    );
    let token = tokio_util::sync::CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = coord
        .retrieve_with_cancel("폭행 상해", 2, Duration::from_secs(10), token)
        .await
        .unwrap_err();
    assert_eq!(err, RetrievalError::Cancelled);
}

#[test]
fn test_snapshot_swap_is_atomic_under_concurrent_adds() {
    let dims = 8;
    let indexer = Arc::new(HybridIndexer::new(empty_snapshot(
        Arc::new(UnicodeTokenizer::new()),
        dims,
    )));
    let handle = indexer.handle();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let indexer = Arc::clone(&indexer);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            for batch in 0..40 {
                let docs = (0..5)
                    .map(|i| {
                        let n = batch * 5 + i;
                        let mut v = vec![0.1; dims];
                        v[n % dims] = 1.0;
                        NewDocument::new(format!("doc{n}"), format!("statute clause {n}"), v)
                    })
                    .collect();
                indexer.add_documents(docs).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut last_generation = 0;
                while !done.load(Ordering::SeqCst) {
                    let snap = handle.load();
                    assert!(snap.generation() >= last_generation);
                    last_generation = snap.generation();

                    let n = snap.documents().len();
                    assert_eq!(snap.lexical().document_count(), n);
                    assert_eq!(snap.vector().len(), n);
                    // Batches are all-or-nothing
                    assert_eq!(n % 5, 0);
                    for id in snap.documents().ids() {
                        assert!(snap.lexical().contains(&id));
                        assert!(snap.vector().contains(&id));
                    }

                    let tokens = snap.lexical().tokenize("statute");
                    let hits = LexicalRetriever::new(snap.lexical()).search(&tokens, 1000);
                    assert_eq!(hits.len(), n);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(indexer.snapshot().len(), 200);
    assert_eq!(indexer.snapshot().generation(), 40);
}

#[tokio::test]
async fn test_concurrent_retrieves_during_writes() {
    let indexer = Arc::new(korean_indexer());
    let coord = Arc::new(coordinator(
        &indexer,
        FixedEmbedder::new(vec![1.0, 0.0, 0.0]),
        balanced(),
    ));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let coord = Arc::clone(&coord);
        tasks.push(tokio::spawn(async move {
            coord.retrieve("폭행 상해", 3, Duration::from_secs(2)).await
        }));
    }
    for i in 0..10 {
        indexer
            .upsert(NewDocument::new(
                format!("D{i}"),
                "상해 치사",
                vec![0.5, 0.5, 0.5],
            ))
            .unwrap();
    }
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.results.len(), 3);
    }
}

#[tokio::test]
async fn test_remove_and_readd_restores_scores() {
    let indexer = korean_indexer();
    let coord = coordinator(&indexer, FixedEmbedder::new(vec![1.0, 0.0, 0.0]), balanced());
    let timeout = Duration::from_secs(2);

    let before = coord.retrieve("폭행 상해", 3, timeout).await.unwrap();
    let original = indexer.snapshot().documents().get("A").cloned().unwrap();

    indexer.remove_documents(&["A".to_string()]).unwrap();
    let without = coord.retrieve("폭행 상해", 3, timeout).await.unwrap();
    assert!(!without.document_ids().contains(&"A"));

    indexer
        .add_documents(vec![NewDocument {
            id: original.id.clone(),
            text: original.text.clone(),
            metadata: original.metadata.clone(),
            embedding: original.embedding.clone(),
        }])
        .unwrap();
    let after = coord.retrieve("폭행 상해", 3, timeout).await.unwrap();

    assert_eq!(before.document_ids(), after.document_ids());
    for (b, a) in before.results.iter().zip(&after.results) {
        assert_eq!(b.fused_score, a.fused_score);
        assert_eq!(b.lexical_score, a.lexical_score);
        assert_eq!(b.semantic_score, a.semantic_score);
    }
    assert!(after.snapshot_generation > before.snapshot_generation);
}

#[tokio::test]
async fn test_engine_import_persist_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = temp_dir.path().to_path_buf();

    let corpus = [
        r#"{"id":"2019do1234","text":"assault causing bodily injury in a bar fight","metadata":{"court":"Supreme Court"}}"#,
        r#"{"id":"2020da5678","text":"claim for damages after a traffic accident"}"#,
        r#"not a record"#,
        r#"{"id":"2021nu42","text":"revocation of a business license"}"#,
    ]
    .join("\n");

    let query = "bodily injury assault";
    let before;
    {
        let engine = RetrievalEngine::from_config(config.clone()).unwrap();
        let stats = engine
            .import(JsonlSource::from_reader(Cursor::new(corpus), "corpus"), None)
            .await
            .unwrap();
        assert_eq!(stats.documents_added, 3);
        assert_eq!(stats.records_skipped, 1);
        engine.save().unwrap();
        before = engine.search(query).await.unwrap();
    }

    let engine = RetrievalEngine::from_config(config).unwrap();
    assert_eq!(engine.stats().documents, 3);
    let after = engine.search(query).await.unwrap();

    assert_eq!(after.results[0].document_id, "2019do1234");
    assert_eq!(before.document_ids(), after.document_ids());
    for (b, a) in before.results.iter().zip(&after.results) {
        assert_eq!(b.fused_score, a.fused_score);
    }
}
