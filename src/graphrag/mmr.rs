//! Maximal Marginal Relevance selection.
//!
//! Picks items maximizing
//! `MMR = λ · sim(query, c) − (1 − λ) · max sim(c, already_selected)`.
//! Candidates can be added between picks, which lets graph traversal
//! feed neighbours of each selected chunk back into the pool.

use std::collections::HashSet;

use super::embedding::cosine_similarity;
use crate::error::{Error, Result};

/// One picked item.
#[derive(Debug, Clone, PartialEq)]
pub struct MmrSelection {
    pub node: usize,
    /// Similarity to the query
    pub similarity: f32,
    /// MMR score at the time of selection
    pub mmr_score: f32,
    /// Traversal depth the item was reached at
    pub depth: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    node: usize,
    embedding: Vec<f32>,
    similarity: f32,
    redundancy: f32,
    depth: usize,
}

/// Incremental MMR selector over a growing candidate pool.
#[derive(Debug, Clone)]
pub struct MmrSelector {
    k: usize,
    query: Vec<f32>,
    lambda_mult: f32,
    score_threshold: f32,
    candidates: Vec<Candidate>,
    selected: Vec<MmrSelection>,
    selected_embeddings: Vec<Vec<f32>>,
    selected_nodes: HashSet<usize>,
}

impl MmrSelector {
    pub fn new(
        k: usize,
        query: Vec<f32>,
        lambda_mult: f32,
        score_threshold: Option<f32>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&lambda_mult) {
            return Err(Error::InvalidArgument(format!(
                "lambda_mult must be within [0, 1], got {}",
                lambda_mult
            )));
        }

        Ok(Self {
            k,
            query,
            lambda_mult,
            score_threshold: score_threshold.unwrap_or(f32::NEG_INFINITY),
            candidates: Vec::new(),
            selected: Vec::new(),
            selected_embeddings: Vec::new(),
            selected_nodes: HashSet::new(),
        })
    }

    /// Add `(node, embedding, depth)` candidates. Already selected nodes are
    /// ignored; a known candidate keeps the smaller depth. Returns how many
    /// new candidates entered the pool.
    pub fn add_candidates<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = (usize, Vec<f32>, usize)>,
    {
        let mut added = 0;
        for (node, embedding, depth) in items {
            if self.selected_nodes.contains(&node) {
                continue;
            }
            if let Some(existing) = self.candidates.iter_mut().find(|c| c.node == node) {
                existing.depth = existing.depth.min(depth);
                continue;
            }

            let similarity = cosine_similarity(&self.query, &embedding);
            if similarity < self.score_threshold {
                continue;
            }

            let redundancy = self
                .selected_embeddings
                .iter()
                .map(|sel| cosine_similarity(&embedding, sel))
                .fold(0.0f32, f32::max);

            self.candidates.push(Candidate {
                node,
                embedding,
                similarity,
                redundancy,
                depth,
            });
            added += 1;
        }
        added
    }

    /// Select the best remaining candidate (ties: earliest added).
    pub fn pop_best(&mut self) -> Option<MmrSelection> {
        if self.is_done() {
            return None;
        }

        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (idx, candidate) in self.candidates.iter().enumerate() {
            let score = self.score(candidate);
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        let best = self.candidates.remove(best_idx);
        for candidate in &mut self.candidates {
            let sim = cosine_similarity(&candidate.embedding, &best.embedding);
            candidate.redundancy = candidate.redundancy.max(sim);
        }

        let selection = MmrSelection {
            node: best.node,
            similarity: best.similarity,
            mmr_score: best_score,
            depth: best.depth,
        };
        self.selected_nodes.insert(best.node);
        self.selected_embeddings.push(best.embedding);
        self.selected.push(selection.clone());
        Some(selection)
    }

    /// True when `k` items are selected or no candidates remain.
    pub fn is_done(&self) -> bool {
        self.selected.len() >= self.k || self.candidates.is_empty()
    }

    pub fn is_selected(&self, node: usize) -> bool {
        self.selected_nodes.contains(&node)
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Selections in pick order.
    pub fn selected(&self) -> &[MmrSelection] {
        &self.selected
    }

    pub fn into_selected(self) -> Vec<MmrSelection> {
        self.selected
    }

    fn score(&self, candidate: &Candidate) -> f32 {
        self.lambda_mult * candidate.similarity - (1.0 - self.lambda_mult) * candidate.redundancy
    }
}
