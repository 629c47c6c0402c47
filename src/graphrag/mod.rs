//! Graph RAG - retrieval over text chunks connected by a link graph.
//!
//! Documents are split into chunks, each chunk gets links (keywords,
//! entities, hyperlinks), and matching outgoing/incoming links become
//! edges between chunks. Queries combine vector similarity with graph
//! traversal and MMR re-ranking.
//!
//! The design goals:
//! - zero external services (local hashing embeddings, in-memory stores)
//! - an `Embedder` trait seam for plugging in real embedding models
//! - deterministic ranking so results are reproducible

pub mod chunker;
pub mod document;
pub mod embedding;
pub mod extractor;
pub mod graph;
pub mod index;
pub mod links;
pub mod mmr;
pub mod retriever;

pub use chunker::{Chunk, Chunker, ChunkingStrategy};
pub use document::{metadata_matches, Document, DocumentStore, Metadata};
pub use embedding::{cosine_similarity, Embedder, HashingEmbedder};
pub use extractor::{
    Entity, EntityLinkExtractor, HyperlinkLinkExtractor, KeywordLinkExtractor, LinkExtractor,
    LinkExtractorTransformer,
};
pub use graph::{Edge, RelationshipGraph};
pub use index::EmbeddingIndex;
pub use links::{Link, LinkDirection, LinkTag};
pub use mmr::{MmrSelection, MmrSelector};
pub use retriever::{GraphRetriever, RetrievalMode, SearchHit, SearchOptions};
