use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::document::{Document, Metadata};
use super::links::Link;
use crate::error::Error;

/// Separators tried in order by the recursive splitter.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Text chunk produced by the chunker.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Unique chunk id
    pub id: Uuid,
    /// Parent document (nil for ad-hoc chunks)
    pub document_id: Uuid,
    /// Raw text of the chunk
    pub text: String,
    /// Start position in the parent text (words or characters, per strategy)
    pub start: usize,
    /// End position in the parent text (exclusive)
    pub end: usize,
    /// Source label (file path, url, etc.)
    pub source: String,
    /// Metadata inherited from the document
    pub metadata: Metadata,
    /// Document links plus chunk-level extracted links
    pub links: BTreeSet<Link>,
}

impl Chunk {
    pub fn new(text: String, start: usize, end: usize, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: Uuid::nil(),
            text,
            start,
            end,
            source: source.into(),
            metadata: Metadata::new(),
            links: BTreeSet::new(),
        }
    }
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Split by words with overlap
    Words,
    /// Recursive character splitting on paragraph, line, and word boundaries
    Recursive,
}

impl FromStr for ChunkingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "words" | "word" => Ok(ChunkingStrategy::Words),
            "recursive" | "characters" => Ok(ChunkingStrategy::Recursive),
            other => Err(Error::InvalidArgument(format!(
                "unknown chunking strategy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkingStrategy::Words => write!(f, "words"),
            ChunkingStrategy::Recursive => write!(f, "recursive"),
        }
    }
}

/// Chunker with overlap between consecutive chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    strategy: ChunkingStrategy,
}

impl Chunker {
    /// Word chunker.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self::with_strategy(size, overlap, ChunkingStrategy::Words)
    }

    /// Recursive character chunker.
    pub fn recursive(size: usize, overlap: usize) -> Self {
        Self::with_strategy(size, overlap, ChunkingStrategy::Recursive)
    }

    /// Create with custom strategy.
    pub fn with_strategy(size: usize, overlap: usize, strategy: ChunkingStrategy) -> Self {
        Self {
            size: size.max(1),
            overlap: overlap.min(size.saturating_sub(1)),
            strategy,
        }
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// Split text into overlapping chunks.
    pub fn chunk(&self, text: &str, source: impl Into<String>) -> Vec<Chunk> {
        match self.strategy {
            ChunkingStrategy::Words => self.chunk_words(text, source),
            ChunkingStrategy::Recursive => self.chunk_recursive(text, source),
        }
    }

    /// Split a document; chunks inherit its metadata and links.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = self.chunk(&doc.text, doc.source());
        for chunk in &mut chunks {
            chunk.document_id = doc.id;
            chunk.metadata = doc.metadata.clone();
            chunk.links = doc.links.clone();
        }
        chunks
    }

    fn chunk_words(&self, text: &str, source: impl Into<String>) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.size.saturating_sub(self.overlap).max(1);
        let mut chunks = Vec::new();
        let mut idx = 0;
        let source = source.into();

        while idx < words.len() {
            let end = (idx + self.size).min(words.len());
            let chunk_text = words[idx..end].join(" ");
            chunks.push(Chunk::new(chunk_text, idx, end, source.clone()));

            if end == words.len() {
                break;
            }
            idx += step;
        }

        chunks
    }

    fn chunk_recursive(&self, text: &str, source: impl Into<String>) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let source = source.into();
        let pieces = self.split_recursive(text, &SEPARATORS);

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut search_from = 0usize;
        for piece in pieces {
            let byte_start = text[search_from..]
                .find(piece.as_str())
                .map(|pos| search_from + pos)
                .or_else(|| text.find(piece.as_str()))
                .unwrap_or(search_from);

            let start = text[..byte_start].chars().count();
            let end = start + piece.chars().count();

            // Next chunk starts strictly after this one.
            search_from = text[byte_start..]
                .chars()
                .next()
                .map(|c| byte_start + c.len_utf8())
                .unwrap_or(text.len());

            chunks.push(Chunk::new(piece, start, end, source.clone()));
        }

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (idx, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len(), ""));

        let remaining: &[&str] = if separator.is_empty() || idx >= separators.len() {
            &[]
        } else {
            &separators[idx + 1..]
        };

        let mut output = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                output.extend(self.merge_pieces(&small));
                small.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    output.push(trimmed.to_string());
                }
            } else {
                output.extend(self.split_recursive(piece, remaining));
            }
        }

        if !small.is_empty() {
            output.extend(self.merge_pieces(&small));
        }

        output
    }

    /// Greedily merge pieces up to `size`, carrying up to `overlap` characters forward.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.size && !current.is_empty() {
                push_joined(&current, &mut merged);

                while total > self.overlap || (total + len > self.size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        push_joined(&current, &mut merged);
        merged
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(pieces: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split on `separator`, keeping it at the start of the following piece.
/// An empty separator splits into characters.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunker_respects_overlap() {
        let chunker = Chunker::new(4, 1);
        let text = "one two three four five six seven";
        let chunks = chunker.chunk(text, "test");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "one two three four");
        assert_eq!(chunks[1].text, "four five six seven");
        assert_eq!(chunks[0].end - chunks[0].start, 4);
    }

    #[test]
    fn chunker_empty_text_returns_empty() {
        for strategy in [ChunkingStrategy::Words, ChunkingStrategy::Recursive] {
            let chunker = Chunker::with_strategy(4, 1, strategy);
            assert!(chunker.chunk("", "test").is_empty());
            assert!(chunker.chunk("   \t\n  ", "test").is_empty());
        }
    }

    #[test]
    fn chunker_no_overlap() {
        let chunker = Chunker::new(2, 0);
        let chunks = chunker.chunk("a b c d e f", "test");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "a b");
        assert_eq!(chunks[1].text, "c d");
        assert_eq!(chunks[2].text, "e f");
    }

    #[test]
    fn chunker_large_overlap_is_clamped() {
        let chunker = Chunker::new(3, 10);
        let chunks = chunker.chunk("a b c d e f g", "test");
        // overlap clamped to 2, step=1
        assert_eq!(chunks.len(), 5);
    }

    #[test]
    fn chunker_zero_size_uses_minimum() {
        let chunker = Chunker::new(0, 0);
        let chunks = chunker.chunk("word", "test");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn chunk_has_unique_id() {
        let c1 = Chunk::new("text1".into(), 0, 1, "src");
        let c2 = Chunk::new("text2".into(), 0, 1, "src");
        assert_ne!(c1.id, c2.id);
        assert!(c1.document_id.is_nil());
    }

    #[test]
    fn recursive_keeps_short_text_whole() {
        let chunker = Chunker::recursive(100, 10);
        let chunks = chunker.chunk("# Title\n\nShort paragraph.", "doc");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "# Title\n\nShort paragraph.");
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 25);
    }

    #[test]
    fn recursive_splits_on_paragraphs_first() {
        let chunker = Chunker::recursive(20, 0);
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird one.";
        let chunks = chunker.chunk(text, "doc");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["First paragraph.", "Second paragraph.", "Third one."]
        );
        assert_eq!(chunks[1].start, 18);
    }

    #[test]
    fn recursive_falls_back_to_words() {
        let chunker = Chunker::recursive(10, 0);
        let chunks = chunker.chunk("alpha beta gamma delta", "doc");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma", "delta"]);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 10);
        }
    }

    #[test]
    fn recursive_carries_overlap() {
        let chunker = Chunker::recursive(12, 6);
        let chunks = chunker.chunk("aa bb cc dd ee ff", "doc");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aa bb cc dd", "cc dd ee ff"]);
        assert_eq!(chunks[1].start, 6);
    }

    #[test]
    fn recursive_splits_unbroken_text_into_characters() {
        let chunker = Chunker::recursive(4, 0);
        let chunks = chunker.chunk("abcdefghij", "doc");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunks[2].start, 8);
        assert_eq!(chunks[2].end, 10);
    }

    #[test]
    fn recursive_counts_characters_not_bytes() {
        let chunker = Chunker::recursive(6, 0);
        let chunks = chunker.chunk("Привет мир", "doc");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Привет", "мир"]);
        assert_eq!(chunks[1].start, 7);
    }

    #[test]
    fn split_document_inherits_metadata_and_links() {
        let mut doc = Document::with_source("Graph RAG combines vectors and graphs.", "a.md");
        doc.links.insert(Link::bidir("kw", "graph"));

        let chunks = Chunker::recursive(1024, 64).split_document(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, doc.id);
        assert_eq!(chunks[0].source, "a.md");
        assert!(chunks[0].metadata.contains_key("source"));
        assert!(chunks[0].links.contains(&Link::bidir("kw", "graph")));
    }

    #[test]
    fn split_keep_separator_attaches_to_next_piece() {
        assert_eq!(
            split_keep_separator("a\n\nb\n\nc", "\n\n"),
            vec!["a", "\n\nb", "\n\nc"]
        );
        assert_eq!(split_keep_separator("\n\nx", "\n\n"), vec!["\n\nx"]);
        assert_eq!(split_keep_separator("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn strategy_parses_and_displays() {
        assert_eq!(
            "Recursive".parse::<ChunkingStrategy>().unwrap(),
            ChunkingStrategy::Recursive
        );
        assert_eq!(
            "words".parse::<ChunkingStrategy>().unwrap(),
            ChunkingStrategy::Words
        );
        assert!("sentences".parse::<ChunkingStrategy>().is_err());
        assert_eq!(ChunkingStrategy::Recursive.to_string(), "recursive");
    }

    #[test]
    fn chunker_unicode_text() {
        let chunker = Chunker::new(3, 1);
        let text = "Привет мир тест";
        let chunks = chunker.chunk(text, "test");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }
}
