//! Command implementations
//!
//! Helpers behind the `graph_rag` CLI subcommands.

pub mod graphrag;

// Re-export commonly used types
pub use graphrag::{
    build_from_dir, build_retriever, compare, format_comparison, format_context, format_hits,
    mode_from_str, Comparison, DEFAULT_QUESTIONS,
};
