//! Plain-text rendering of the chunk graph.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::graphrag::{Chunk, LinkDirection, RelationshipGraph};

/// Maximum snippet length, in characters.
pub const SNIPPET_LEN: usize = 120;

/// Flatten whitespace and cut to at most `max_chars` characters, ending in `...` when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Render every chunk with its links grouped by kind and its outgoing neighbours.
/// `chunks[i]` must be graph node `i`.
pub fn render_graph_text(chunks: &[Chunk], graph: &RelationshipGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Graph: {} chunks, {} edges",
        chunks.len(),
        graph.edge_count()
    );

    for (node, chunk) in chunks.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[{}] {}", node + 1, chunk.source);
        let _ = writeln!(out, "    text: {}", snippet(&chunk.text, SNIPPET_LEN));

        let mut by_kind: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for link in &chunk.links {
            let label = match link.direction {
                LinkDirection::Out => format!("-> {}", link.tag),
                LinkDirection::In => format!("<- {}", link.tag),
                LinkDirection::Bidir => link.tag.clone(),
            };
            by_kind.entry(link.kind.as_str()).or_default().push(label);
        }
        for (kind, tags) in &by_kind {
            let _ = writeln!(out, "    {}: {}", kind, tags.join(", "));
        }

        let neighbours = graph.adjacent(node);
        if neighbours.is_empty() {
            let _ = writeln!(out, "    (no outgoing edges)");
        }
        for next in neighbours {
            let source = chunks.get(next).map(|c| c.source.as_str()).unwrap_or("?");
            let _ = writeln!(out, "    -> [{}] {}", next + 1, source);
        }
    }

    out
}
