use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::chunker::{Chunk, Chunker};
use super::document::{metadata_matches, Document, DocumentStore, Metadata};
use super::embedding::{cosine_similarity, Embedder, HashingEmbedder};
use super::extractor::{extract_query_terms, LinkExtractorTransformer};
use super::graph::RelationshipGraph;
use super::index::EmbeddingIndex;
use super::links::LinkTag;
use super::mmr::MmrSelector;
use crate::config::Config;
use crate::error::{Error, Result};

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Vector similarity only
    Similarity,
    /// Similarity roots expanded breadth-first along graph edges
    Traversal,
    /// MMR selection over similarity and graph-neighbour candidates (default)
    MmrTraversal,
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMode::Similarity => write!(f, "similarity"),
            RetrievalMode::Traversal => write!(f, "traversal"),
            RetrievalMode::MmrTraversal => write!(f, "mmr"),
        }
    }
}

/// Per-query knobs; defaults come from [`Config`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of results (roots for plain traversal)
    pub k: usize,
    /// Maximum number of graph hops
    pub depth: usize,
    /// Similarity candidates seeding MMR
    pub fetch_k: usize,
    /// Neighbours added per MMR pick
    pub adjacent_k: usize,
    pub lambda_mult: f32,
    pub score_threshold: Option<f32>,
    /// Start MMR/traversal from these chunks instead of a similarity search
    pub initial_roots: Vec<Uuid>,
    /// Only chunks whose metadata matches every entry
    pub filter: Option<Metadata>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SearchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            k: config.k,
            depth: config.depth,
            fetch_k: config.fetch_k,
            adjacent_k: config.adjacent_k,
            lambda_mult: config.lambda_mult,
            score_threshold: config.score_threshold,
            initial_roots: Vec::new(),
            filter: None,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_fetch_k(mut self, fetch_k: usize) -> Self {
        self.fetch_k = fetch_k;
        self
    }

    pub fn with_adjacent_k(mut self, adjacent_k: usize) -> Self {
        self.adjacent_k = adjacent_k;
        self
    }

    pub fn with_lambda_mult(mut self, lambda_mult: f32) -> Self {
        self.lambda_mult = lambda_mult;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_initial_roots(mut self, roots: Vec<Uuid>) -> Self {
        self.initial_roots = roots;
        self
    }

    pub fn with_filter(mut self, filter: Metadata) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One retrieved chunk.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity to the query
    pub score: f32,
    /// MMR score at selection time (MMR traversal only)
    pub mmr_score: Option<f32>,
    /// Graph hops from the nearest root (0 for roots)
    pub depth: usize,
    /// Link tags of the chunk that also occur in the query
    pub matched_tags: Vec<String>,
}

/// Graph-augmented retriever: document store, embedding index, and
/// relationship graph behind one ingestion and search API.
pub struct GraphRetriever {
    config: Config,
    chunker: Chunker,
    document_links: LinkExtractorTransformer,
    chunk_links: LinkExtractorTransformer,
    embedder: Arc<dyn Embedder>,
    documents: DocumentStore,
    chunks: Vec<Chunk>,
    positions: HashMap<Uuid, usize>,
    index: EmbeddingIndex,
    graph: RelationshipGraph,
}

impl fmt::Debug for GraphRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRetriever")
            .field("embedding_dim", &self.embedder.dimension())
            .field("documents", &self.documents.len())
            .field("chunks", &self.chunks.len())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl GraphRetriever {
    /// Create a retriever backed by the given embedder.
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;

        let chunker =
            Chunker::with_strategy(config.chunk_size, config.chunk_overlap, config.chunking_strategy);
        let document_links = LinkExtractorTransformer::document_level(&config);
        let chunk_links = LinkExtractorTransformer::chunk_level(&config);
        debug!(
            "GraphRetriever: document extractors {:?}, chunk extractors {:?}",
            document_links.names(),
            chunk_links.names()
        );

        Ok(Self {
            index: EmbeddingIndex::new(embedder.dimension()),
            chunker,
            document_links,
            chunk_links,
            embedder,
            documents: DocumentStore::new(),
            chunks: Vec::new(),
            positions: HashMap::new(),
            graph: RelationshipGraph::new(),
            config,
        })
    }

    /// Create a retriever with the local hashing embedder (offline, deterministic).
    pub fn with_local(config: Config) -> Result<Self> {
        let embedder = Arc::new(HashingEmbedder::new(config.embedding_dim));
        Self::new(config, embedder)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn document(&self, id: &Uuid) -> Result<&Document> {
        self.documents
            .get(id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    /// Indexed chunks; position equals graph node index.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, id: &Uuid) -> Option<&Chunk> {
        self.positions.get(id).map(|&node| &self.chunks[node])
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    /// Chunks directly reachable from `id` through its outgoing links.
    pub fn neighbors(&self, id: &Uuid) -> Result<Vec<&Chunk>> {
        let node = self.node_of(id)?;
        Ok(self
            .graph
            .adjacent(node)
            .into_iter()
            .map(|n| &self.chunks[n])
            .collect())
    }

    /// Ingest a single text under a source label.
    pub async fn ingest(&mut self, source: &str, text: &str) -> Result<usize> {
        if text.trim().is_empty() {
            return Ok(0);
        }
        self.add_documents(vec![Document::with_source(text, source)])
            .await
    }

    /// Ingest documents (extract -> split -> extract -> embed -> index + graph).
    /// All chunks of the call are embedded in one batch. Returns chunks added.
    /// Documents whose id is already indexed are skipped.
    pub async fn add_documents(&mut self, docs: Vec<Document>) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut docs: Vec<Document> = docs
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .filter(|d| {
                let fresh = self.documents.get(&d.id).is_none() && seen.insert(d.id);
                if !fresh {
                    warn!("Skipping already indexed document {} ({})", d.id, d.source());
                }
                fresh
            })
            .collect();
        if docs.is_empty() {
            return Ok(0);
        }

        self.document_links.transform_documents(&mut docs);

        let mut pending = Vec::new();
        for doc in &docs {
            let mut chunks = self.chunker.split_document(doc);
            self.chunk_links.transform_chunks(&mut chunks);
            pending.extend(chunks);
        }

        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != pending.len() {
            return Err(Error::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                pending.len(),
                embeddings.len()
            )));
        }
        // Check every vector first so a bad batch leaves the index untouched.
        if let Some(bad) = embeddings
            .iter()
            .find(|e| e.len() != self.index.dimension())
        {
            return Err(Error::DimensionMismatch {
                expected: self.index.dimension(),
                actual: bad.len(),
            });
        }

        let added = pending.len();
        for doc in docs {
            self.documents.insert(doc);
        }
        for (chunk, embedding) in pending.into_iter().zip(embeddings) {
            let node = self.index.insert(embedding)?;
            let graph_node = self.graph.add_node(&chunk.links);
            debug_assert_eq!(node, graph_node);
            self.positions.insert(chunk.id, node);
            self.chunks.push(chunk);
        }

        info!(
            "Indexed {} chunks ({} documents, {} chunks total, {} edges)",
            added,
            self.documents.len(),
            self.chunks.len(),
            self.graph.edge_count()
        );

        Ok(added)
    }

    /// Dispatch on retrieval mode.
    pub async fn search(
        &self,
        query: &str,
        mode: RetrievalMode,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        let hits = match mode {
            RetrievalMode::Similarity => self.similarity_search(query, opts).await?,
            RetrievalMode::Traversal => self.traversal_search(query, opts).await?,
            RetrievalMode::MmrTraversal => self.mmr_traversal_search(query, opts).await?,
        };
        debug!("{} search returned {} results", mode, hits.len());
        Ok(hits)
    }

    /// Top-k chunks by cosine similarity.
    pub async fn similarity_search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        self.validate(opts)?;
        if self.is_empty() || opts.k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let terms = self.query_terms(query);

        let hits = self
            .index
            .similarity_search(&query_embedding, opts.k, |n| self.allowed(n, opts))?
            .into_iter()
            .map(|(node, score)| self.hit(node, score, None, 0, &terms))
            .collect();
        Ok(hits)
    }

    /// Top-k roots by similarity, then every chunk reachable within `depth` hops.
    pub async fn traversal_search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        self.validate(opts)?;
        let explicit_roots = self.resolve_roots(&opts.initial_roots)?;
        if self.is_empty() || opts.k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let terms = self.query_terms(query);

        let roots: Vec<usize> = if explicit_roots.is_empty() {
            self.index
                .similarity_search(&query_embedding, opts.k, |n| self.allowed(n, opts))?
                .into_iter()
                .map(|(node, _)| node)
                .collect()
        } else {
            explicit_roots
        };

        let hits = self
            .graph
            .bfs(&roots, opts.depth)
            .into_iter()
            .filter(|&(node, _)| self.allowed(node, opts))
            .map(|(node, depth)| {
                let score = self.similarity(&query_embedding, node);
                self.hit(node, score, None, depth, &terms)
            })
            .collect();
        Ok(hits)
    }

    /// MMR selection where each pick below `depth` contributes its most
    /// query-similar graph neighbours as new candidates.
    pub async fn mmr_traversal_search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        self.validate(opts)?;
        let explicit_roots = self.resolve_roots(&opts.initial_roots)?;
        if self.is_empty() || opts.k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let terms = self.query_terms(query);
        let mut selector = MmrSelector::new(
            opts.k,
            query_embedding.clone(),
            opts.lambda_mult,
            opts.score_threshold,
        )?;

        let seeds: Vec<usize> = if explicit_roots.is_empty() {
            self.index
                .similarity_search(&query_embedding, opts.fetch_k, |n| self.allowed(n, opts))?
                .into_iter()
                .map(|(node, _)| node)
                .collect()
        } else {
            explicit_roots
        };
        selector.add_candidates(seeds.into_iter().map(|n| (n, self.embedding(n), 0)));

        let mut expanded_tags: HashSet<LinkTag> = HashSet::new();
        while let Some(picked) = selector.pop_best() {
            if picked.depth >= opts.depth {
                continue;
            }

            let targets: BTreeSet<usize> = self
                .graph
                .outgoing_tags(picked.node)
                .filter(|tag| expanded_tags.insert((*tag).clone()))
                .flat_map(|tag| self.graph.nodes_with_incoming(tag).iter().copied())
                .filter(|&n| n != picked.node && !selector.is_selected(n) && self.allowed(n, opts))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let neighbours = self
                .index
                .rank_nodes(&query_embedding, targets, opts.adjacent_k);
            let added = selector.add_candidates(
                neighbours
                    .into_iter()
                    .map(|(n, _)| (n, self.embedding(n), picked.depth + 1)),
            );
            debug!(
                "MMR pick {} at depth {} added {} neighbour candidates",
                picked.node, picked.depth, added
            );
        }

        let hits = selector
            .into_selected()
            .into_iter()
            .map(|sel| self.hit(sel.node, sel.similarity, Some(sel.mmr_score), sel.depth, &terms))
            .collect();
        Ok(hits)
    }

    /// Query keywords plus entity tags found by the configured entity extractor.
    pub fn query_terms(&self, query: &str) -> BTreeSet<String> {
        let mut terms = extract_query_terms(query);
        terms.extend(
            self.chunk_links
                .extract(query, &Metadata::new())
                .into_iter()
                .map(|link| link.tag),
        );
        terms
    }

    fn validate(&self, opts: &SearchOptions) -> Result<()> {
        if !(0.0..=1.0).contains(&opts.lambda_mult) {
            return Err(Error::InvalidArgument(format!(
                "lambda_mult must be within [0, 1], got {}",
                opts.lambda_mult
            )));
        }
        Ok(())
    }

    fn node_of(&self, id: &Uuid) -> Result<usize> {
        self.positions
            .get(id)
            .copied()
            .ok_or_else(|| Error::ChunkNotFound(id.to_string()))
    }

    fn resolve_roots(&self, ids: &[Uuid]) -> Result<Vec<usize>> {
        ids.iter().map(|id| self.node_of(id)).collect()
    }

    fn allowed(&self, node: usize, opts: &SearchOptions) -> bool {
        opts.filter
            .as_ref()
            .map_or(true, |filter| metadata_matches(&self.chunks[node].metadata, filter))
    }

    fn embedding(&self, node: usize) -> Vec<f32> {
        self.index.get(node).map(<[f32]>::to_vec).unwrap_or_default()
    }

    fn similarity(&self, query: &[f32], node: usize) -> f32 {
        self.index
            .get(node)
            .map(|v| cosine_similarity(query, v))
            .unwrap_or(0.0)
    }

    fn hit(
        &self,
        node: usize,
        score: f32,
        mmr_score: Option<f32>,
        depth: usize,
        terms: &BTreeSet<String>,
    ) -> SearchHit {
        let chunk = self.chunks[node].clone();
        let matched_tags: BTreeSet<String> = chunk
            .links
            .iter()
            .filter(|link| terms.contains(&link.tag))
            .map(|link| link.tag.clone())
            .collect();

        SearchHit {
            chunk,
            score,
            mmr_score,
            depth,
            matched_tags: matched_tags.into_iter().collect(),
        }
    }
}
