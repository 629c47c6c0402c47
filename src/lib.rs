//! Graph-augmented retrieval engine
//!
//! This library provides tools to:
//! - Split documents into chunks and attach keyword, entity and hyperlink links
//! - Connect chunks into a relationship graph from matching links
//! - Embed chunks and search them by vector similarity
//! - Retrieve context by similarity, graph traversal, or MMR traversal
//! - Load Markdown/text sample documents and render the graph as text

pub mod config;
pub mod error;
pub mod graphrag;
pub mod loader;
pub mod visualize;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use graphrag::{Document, GraphRetriever, RetrievalMode, SearchHit, SearchOptions};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
