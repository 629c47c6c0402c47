//! Graph RAG command helpers.
//!
//! - Loads Markdown/text documents from a directory
//! - Builds the in-memory retriever in ingestion batches
//! - Formats search results and compares similarity search with MMR traversal

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::graphrag::{Document, GraphRetriever, RetrievalMode, SearchHit, SearchOptions};
use crate::loader::load_documents_from_dir;
use crate::visualize::snippet;

/// Sample questions used by `compare` when none are given.
pub const DEFAULT_QUESTIONS: [&str; 3] = [
    "What is Graph RAG and how does it work?",
    "What technologies are used in this system?",
    "How does vector search differ from graph traversal?",
];

const RESULT_SNIPPET_LEN: usize = 240;

/// Map CLI/ENV string to retrieval mode.
pub fn mode_from_str(value: &str) -> RetrievalMode {
    match value.trim().to_lowercase().as_str() {
        "similarity" | "vector" | "naive" => RetrievalMode::Similarity,
        "traversal" | "graph" => RetrievalMode::Traversal,
        _ => RetrievalMode::MmrTraversal, // mmr / hybrid
    }
}

/// Ingest documents in `config.batch_size` batches.
pub async fn build_retriever(config: &Config, docs: Vec<Document>) -> Result<GraphRetriever> {
    let mut rag =
        GraphRetriever::with_local(config.clone()).context("invalid retriever configuration")?;

    if docs.is_empty() {
        return Ok(rag);
    }

    let total = docs.len();
    let batch_size = config.batch_size.max(1);
    let mut pending = docs;
    let mut batch_no = 0;

    while !pending.is_empty() {
        let rest = pending.split_off(batch_size.min(pending.len()));
        let batch = std::mem::replace(&mut pending, rest);
        batch_no += 1;

        let batch_len = batch.len();
        let added = rag
            .add_documents(batch)
            .await
            .with_context(|| format!("failed to ingest batch {}", batch_no))?;
        debug!(
            "Indexed batch {} ({} docs, {} chunks), total chunks: {}",
            batch_no,
            batch_len,
            added,
            rag.len()
        );
    }

    info!(
        "Graph RAG index ready: {} documents -> {} chunks, {} edges",
        total,
        rag.len(),
        rag.edge_count()
    );

    Ok(rag)
}

/// Load a document directory and build the retriever from it.
pub async fn build_from_dir(config: &Config, dir: &Path) -> Result<GraphRetriever> {
    let docs = load_documents_from_dir(dir)
        .with_context(|| format!("failed to load documents from {}", dir.display()))?;
    build_retriever(config, docs).await
}

/// Both result sets for one question.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub question: String,
    pub similarity: Vec<SearchHit>,
    pub traversal: Vec<SearchHit>,
}

/// Run each question through similarity search and MMR traversal.
pub async fn compare(
    rag: &GraphRetriever,
    questions: &[String],
    opts: &SearchOptions,
) -> Result<Vec<Comparison>> {
    let mut comparisons = Vec::with_capacity(questions.len());

    for question in questions {
        let similarity = rag
            .search(question, RetrievalMode::Similarity, opts)
            .await
            .with_context(|| format!("similarity search failed for '{}'", question))?;
        let traversal = rag
            .search(question, RetrievalMode::MmrTraversal, opts)
            .await
            .with_context(|| format!("MMR traversal failed for '{}'", question))?;

        comparisons.push(Comparison {
            question: question.clone(),
            similarity,
            traversal,
        });
    }

    Ok(comparisons)
}

/// Human-readable result list.
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Results for '{}' ===", query);

    if hits.is_empty() {
        let _ = writeln!(out, "No results found.");
        return out;
    }

    for (idx, hit) in hits.iter().enumerate() {
        let _ = write!(
            out,
            "\n{}. score: {:.3} | depth: {} | source: {}",
            idx + 1,
            hit.score,
            hit.depth,
            hit.chunk.source
        );
        if let Some(mmr) = hit.mmr_score {
            let _ = write!(out, " | mmr: {:.3}", mmr);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "   {}", snippet(&hit.chunk.text, RESULT_SNIPPET_LEN));

        if !hit.matched_tags.is_empty() {
            let _ = writeln!(out, "   matched tags: {}", hit.matched_tags.join(", "));
        }
    }

    out
}

/// Retrieved chunks concatenated as a context block for answer generation.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("[{}]\n{}", hit.chunk.source, hit.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Side-by-side report of one comparison.
pub fn format_comparison(comparison: &Comparison) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Question: {}", comparison.question);
    let _ = writeln!(out, "{}", rule);

    let _ = writeln!(out, "\nSIMILARITY SEARCH (vector only):");
    out.push_str(&format_hits(&comparison.question, &comparison.similarity));

    let _ = writeln!(out, "\nGRAPH TRAVERSAL SEARCH (MMR + graph links):");
    out.push_str(&format_hits(&comparison.question, &comparison.traversal));

    let only_graph = comparison
        .traversal
        .iter()
        .filter(|t| !comparison.similarity.iter().any(|s| s.chunk.id == t.chunk.id))
        .count();
    let _ = writeln!(
        out,
        "\n{} of {} traversal results not found by similarity search",
        only_graph,
        comparison.traversal.len()
    );

    out
}
