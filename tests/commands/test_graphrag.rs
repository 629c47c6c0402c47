//! Tests for graph RAG command helpers

use std::path::PathBuf;

use graph_rag::commands::{
    build_from_dir, compare, format_comparison, format_context, format_hits, mode_from_str,
    DEFAULT_QUESTIONS,
};
use graph_rag::{Config, RetrievalMode, SearchOptions};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/docs")
}

#[test]
fn test_default_questions() {
    assert_eq!(DEFAULT_QUESTIONS.len(), 3);
    assert!(DEFAULT_QUESTIONS[0].contains("Graph RAG"));
}

#[test]
fn test_mode_defaults_to_mmr_traversal() {
    assert_eq!(mode_from_str("hybrid"), RetrievalMode::MmrTraversal);
    assert_eq!(mode_from_str("vector"), RetrievalMode::Similarity);
}

#[test]
fn test_build_from_dir_in_small_batches() {
    let config = Config {
        batch_size: 2,
        ..Config::default()
    };

    let rag = tokio_test::block_on(build_from_dir(&config, &fixtures_dir())).unwrap();
    assert_eq!(rag.document_count(), 5);
    assert!(!rag.is_empty());
}

#[test]
fn test_build_from_missing_dir_fails_with_context() {
    let err = tokio_test::block_on(build_from_dir(
        &Config::default(),
        &PathBuf::from("/no/such/docs"),
    ))
    .unwrap_err();

    assert!(err.to_string().contains("failed to load documents"));
}

#[test]
fn test_compare_default_questions_on_fixtures() {
    let config = Config::default();
    let rag = tokio_test::block_on(build_from_dir(&config, &fixtures_dir())).unwrap();
    let questions: Vec<String> = DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect();

    let comparisons = tokio_test::block_on(compare(
        &rag,
        &questions,
        &SearchOptions::from_config(&config),
    ))
    .unwrap();

    assert_eq!(comparisons.len(), 3);
    for comparison in &comparisons {
        assert!(comparison.similarity.len() <= config.k);
        assert!(comparison.traversal.len() <= config.k);

        let report = format_comparison(comparison);
        assert!(report.contains(&comparison.question));

        let listing = format_hits(&comparison.question, &comparison.similarity);
        assert!(listing.contains("1. score:"));
        assert!(format_context(&comparison.similarity).starts_with('['));
    }
}

#[test]
fn test_compare_rejects_invalid_lambda() {
    let rag = tokio_test::block_on(build_from_dir(&Config::default(), &fixtures_dir())).unwrap();
    let opts = SearchOptions::default().with_lambda_mult(-1.0);

    let result = tokio_test::block_on(compare(&rag, &["graph".to_string()], &opts));
    assert!(result.is_err());
}
