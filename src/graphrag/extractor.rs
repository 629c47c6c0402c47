use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::chunker::Chunk;
use super::document::{Document, Metadata};
use super::links::Link;
use crate::config::Config;

pub const KEYWORD_KIND: &str = "kw";
pub const HYPERLINK_KIND: &str = "hyperlink";
pub const ENTITY_KIND_PREFIX: &str = "entity:";

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "or", "but", "the", "a", "an", "of", "in", "on", "for", "to", "with", "is", "are",
        "was", "were", "be", "been", "this", "that", "these", "those", "it", "its", "as", "at",
        "by", "from", "not", "can", "will", "has", "have", "had", "into", "than", "then", "also",
        "such", "which", "what", "how", "why", "when", "where", "who", "does", "do", "did", "you",
        "your", "our", "their", "they", "them", "there", "here", "each", "any", "all", "more",
        "most", "other", "some", "used", "use", "using", "about", "over", "between", "both",
        "while", "via", "like", "only", "many", "may", "should", "would", "could", "one", "two",
        "что", "как", "это", "или", "для", "при", "про", "без", "под", "над",
    ]
    .into_iter()
    .collect()
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).expect("valid url regex")
});

/// Named entity found in text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Original surface form
    pub name: String,
    /// Lowercased normalized form (for matching)
    pub normalized: String,
    /// Assigned label (Person, Technology, ...)
    pub label: String,
    /// Word position inside the text
    pub position: usize,
}

/// Produces links for a piece of text.
pub trait LinkExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, text: &str, metadata: &Metadata) -> BTreeSet<Link>;
}

/// Keyword links (`kw`, bidirectional) from term frequency.
#[derive(Debug, Clone)]
pub struct KeywordLinkExtractor {
    top_n: usize,
}

impl KeywordLinkExtractor {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Top keywords by frequency; ties keep first-occurrence order.
    pub fn keywords(&self, text: &str) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

        for (pos, raw) in text.split_whitespace().enumerate() {
            let Some(term) = normalize_term(raw) else {
                continue;
            };
            if term.chars().all(|c| c.is_numeric()) {
                continue;
            }
            counts.entry(term).or_insert((0, pos)).0 += 1;
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(term, (count, first))| (term, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(self.top_n);

        ranked.into_iter().map(|(term, _, _)| term).collect()
    }
}

impl LinkExtractor for KeywordLinkExtractor {
    fn name(&self) -> &'static str {
        "keywords"
    }

    fn extract(&self, text: &str, _metadata: &Metadata) -> BTreeSet<Link> {
        self.keywords(text)
            .into_iter()
            .map(|kw| Link::bidir(KEYWORD_KIND, kw))
            .collect()
    }
}

/// Entity links (`entity:<Label>`, bidirectional) using capitalisation
/// heuristics and an optional gazetteer.
#[derive(Debug, Clone)]
pub struct EntityLinkExtractor {
    labels: BTreeSet<String>,
    /// Lower-cased phrase -> label
    gazetteer: BTreeMap<String, String>,
}

impl EntityLinkExtractor {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            gazetteer: BTreeMap::new(),
        }
    }

    /// Register known surface forms for a label.
    pub fn with_gazetteer(mut self, gazetteer: &BTreeMap<String, Vec<String>>) -> Self {
        for (label, terms) in gazetteer {
            for term in terms {
                let key = term
                    .split_whitespace()
                    .filter_map(normalize_token)
                    .collect::<Vec<_>>()
                    .join(" ");
                if !key.is_empty() {
                    self.gazetteer.insert(key, label.clone());
                }
            }
        }
        self
    }

    /// Extract entities: gazetteer phrases first, then heuristic candidates.
    pub fn entities(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut seen = HashSet::new();

        if !self.gazetteer.is_empty() {
            let tokens: Vec<String> = text.split_whitespace().filter_map(normalize_token).collect();
            let haystack = format!(" {} ", tokens.join(" "));

            for (phrase, label) in &self.gazetteer {
                let Some(byte_pos) = haystack.find(&format!(" {} ", phrase)) else {
                    continue;
                };
                if !self.labels.contains(label) || !seen.insert(phrase.clone()) {
                    continue;
                }
                entities.push(Entity {
                    name: phrase.clone(),
                    normalized: phrase.clone(),
                    label: label.clone(),
                    position: haystack[..byte_pos].split_whitespace().count(),
                });
            }
        }

        for (idx, raw_token) in text.split_whitespace().enumerate() {
            let token =
                raw_token.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '#');
            if token.chars().count() < 3 {
                continue;
            }
            let normalized = token.to_lowercase();
            let bare = normalized.trim_start_matches(&['@', '#'][..]);
            if STOPWORDS.contains(bare) {
                continue;
            }

            // Heuristic: keep capitalized words, handles, hashtags, or tokens with digits.
            let is_candidate = token
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false)
                || token.contains('@')
                || token.contains('#')
                || token.chars().any(|c| c.is_numeric());

            if !is_candidate {
                continue;
            }

            let label = self
                .gazetteer
                .get(bare)
                .map(String::as_str)
                .unwrap_or_else(|| heuristic_label(token))
                .to_string();
            if !self.labels.contains(&label) {
                continue;
            }

            if seen.insert(normalized.clone()) {
                entities.push(Entity {
                    name: token.to_string(),
                    normalized,
                    label,
                    position: idx,
                });
            }
        }

        entities
    }
}

fn heuristic_label(token: &str) -> &'static str {
    if token.starts_with('@') {
        "Person"
    } else if token.starts_with('#') {
        "Topic"
    } else {
        "Concept"
    }
}

impl LinkExtractor for EntityLinkExtractor {
    fn name(&self) -> &'static str {
        "entities"
    }

    fn extract(&self, text: &str, _metadata: &Metadata) -> BTreeSet<Link> {
        self.entities(text)
            .into_iter()
            .map(|e| Link::bidir(format!("{}{}", ENTITY_KIND_PREFIX, e.label), e.normalized))
            .collect()
    }
}

/// Hyperlink links: outgoing for URLs in the text, incoming for the
/// document's own `url` metadata.
#[derive(Debug, Clone, Default)]
pub struct HyperlinkLinkExtractor;

impl HyperlinkLinkExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Absolute http(s) URLs in order of appearance, fragments dropped.
    pub fn urls(text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        URL_RE
            .find_iter(text)
            .filter_map(|m| normalize_url(m.as_str()))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

impl LinkExtractor for HyperlinkLinkExtractor {
    fn name(&self) -> &'static str {
        "hyperlinks"
    }

    fn extract(&self, text: &str, metadata: &Metadata) -> BTreeSet<Link> {
        let mut links: BTreeSet<Link> = Self::urls(text)
            .into_iter()
            .map(|url| Link::outgoing(HYPERLINK_KIND, url))
            .collect();

        if let Some(Value::String(own)) = metadata.get("url") {
            if let Some(url) = normalize_url(own) {
                links.insert(Link::incoming(HYPERLINK_KIND, url));
            }
        }

        links
    }
}

fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches(&['.', ',', ';', ':', '!', '?'][..]);
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    if without_fragment.len() <= "https://".len() {
        return None;
    }
    Some(without_fragment.to_string())
}

/// Applies a list of extractors, merging links into existing sets.
#[derive(Default)]
pub struct LinkExtractorTransformer {
    extractors: Vec<Box<dyn LinkExtractor>>,
}

impl LinkExtractorTransformer {
    pub fn new(extractors: Vec<Box<dyn LinkExtractor>>) -> Self {
        Self { extractors }
    }

    /// Extractors run on whole documents before splitting (keywords, hyperlinks).
    pub fn document_level(config: &Config) -> Self {
        let mut extractors: Vec<Box<dyn LinkExtractor>> = Vec::new();
        if config.extract_keywords {
            extractors.push(Box::new(KeywordLinkExtractor::new(config.keywords_top_n)));
        }
        if config.extract_hyperlinks {
            extractors.push(Box::new(HyperlinkLinkExtractor::new()));
        }
        Self::new(extractors)
    }

    /// Extractors run on each chunk after splitting (entities).
    pub fn chunk_level(config: &Config) -> Self {
        let mut extractors: Vec<Box<dyn LinkExtractor>> = Vec::new();
        if config.extract_entities {
            extractors.push(Box::new(
                EntityLinkExtractor::new(config.entity_labels.iter().cloned())
                    .with_gazetteer(&config.gazetteer),
            ));
        }
        Self::new(extractors)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn extract(&self, text: &str, metadata: &Metadata) -> BTreeSet<Link> {
        self.extractors
            .iter()
            .flat_map(|e| e.extract(text, metadata))
            .collect()
    }

    pub fn transform_documents(&self, docs: &mut [Document]) {
        for doc in docs {
            let links = self.extract(&doc.text, &doc.metadata);
            doc.links.extend(links);
        }
    }

    pub fn transform_chunks(&self, chunks: &mut [Chunk]) {
        for chunk in chunks {
            let links = self.extract(&chunk.text, &chunk.metadata);
            chunk.links.extend(links);
        }
    }
}

/// Normalized terms of a query, comparable with link tags.
pub fn extract_query_terms(query: &str) -> BTreeSet<String> {
    query.split_whitespace().filter_map(normalize_term).collect()
}

pub(crate) fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Lowercase and strip surrounding punctuation; drops short tokens and stopwords.
fn normalize_term(raw: &str) -> Option<String> {
    let term = normalize_token(raw)?;
    if term.chars().count() < 3 || STOPWORDS.contains(term.as_str()) {
        return None;
    }
    Some(term)
}

fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}
