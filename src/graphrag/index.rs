use std::cmp::Ordering;

use super::embedding::cosine_similarity;
use crate::error::{Error, Result};

/// Dense vectors aligned with graph node indices; brute-force cosine search.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector; returns its node index.
    pub fn insert(&mut self, vector: Vec<f32>) -> Result<usize> {
        self.check_dimension(&vector)?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    pub fn get(&self, node: usize) -> Option<&[f32]> {
        self.vectors.get(node).map(Vec::as_slice)
    }

    /// Top-`k` nodes accepted by `allow`, by descending similarity
    /// (ties keep insertion order).
    pub fn similarity_search<F>(&self, query: &[f32], k: usize, allow: F) -> Result<Vec<(usize, f32)>>
    where
        F: Fn(usize) -> bool,
    {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = (0..self.vectors.len()).filter(|&node| allow(node));
        Ok(self.rank(query, candidates, k))
    }

    /// Top-`k` among the given nodes; unknown nodes are skipped.
    pub fn rank_nodes<I>(&self, query: &[f32], nodes: I, k: usize) -> Vec<(usize, f32)>
    where
        I: IntoIterator<Item = usize>,
    {
        if k == 0 {
            return Vec::new();
        }
        let known = nodes.into_iter().filter(|&node| node < self.vectors.len());
        self.rank(query, known, k)
    }

    fn rank<I>(&self, query: &[f32], nodes: I, k: usize) -> Vec<(usize, f32)>
    where
        I: Iterator<Item = usize>,
    {
        let mut scored: Vec<(usize, f32)> = nodes
            .map(|node| (node, cosine_similarity(query, &self.vectors[node])))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> EmbeddingIndex {
        let mut index = EmbeddingIndex::new(2);
        index.insert(vec![1.0, 0.0]).unwrap();
        index.insert(vec![0.0, 1.0]).unwrap();
        index.insert(vec![0.7, 0.7]).unwrap();
        index.insert(vec![1.0, 0.0]).unwrap();
        index
    }

    #[test]
    fn insert_rejects_wrong_dimension() {
        let mut index = EmbeddingIndex::new(3);
        let err = index.insert(vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn search_orders_by_score_then_insertion() {
        let hits = index().similarity_search(&[1.0, 0.0], 3, |_| true).unwrap();
        let nodes: Vec<usize> = hits.iter().map(|(n, _)| *n).collect();
        assert_eq!(nodes, vec![0, 3, 2]);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_applies_filter_and_k() {
        let index = index();
        let hits = index
            .similarity_search(&[1.0, 0.0], 10, |node| node % 2 == 1)
            .unwrap();
        let nodes: Vec<usize> = hits.iter().map(|(n, _)| *n).collect();
        assert_eq!(nodes, vec![3, 1]);

        assert!(index.similarity_search(&[1.0, 0.0], 0, |_| true).unwrap().is_empty());
    }

    #[test]
    fn search_rejects_query_dimension_mismatch() {
        assert!(index().similarity_search(&[1.0], 1, |_| true).is_err());
    }

    #[test]
    fn rank_nodes_skips_unknown() {
        let hits = index().rank_nodes(&[0.0, 1.0], vec![1, 2, 99], 5);
        let nodes: Vec<usize> = hits.iter().map(|(n, _)| *n).collect();
        assert_eq!(nodes, vec![1, 2]);
    }
}
