use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::links::Link;

/// Free-form metadata attached to documents and chunks.
pub type Metadata = BTreeMap<String, Value>;

/// Raw document as handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub text: String,
    pub metadata: Metadata,
    /// Document-level links, inherited by every chunk
    #[serde(default)]
    pub links: BTreeSet<Link>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata,
            links: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Document with only a `source` label.
    pub fn with_source(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        Self::new(text, metadata)
    }

    /// `source` metadata, falling back to the document id.
    pub fn source(&self) -> String {
        match self.metadata.get("source") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => self.id.to_string(),
        }
    }
}

/// True when every key of `filter` is present in `metadata` with an equal value.
pub fn metadata_matches(metadata: &Metadata, filter: &Metadata) -> bool {
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

/// Insertion-ordered in-memory document store.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    docs: Vec<Document>,
    positions: HashMap<Uuid, usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document, replacing any previous document with the same id.
    pub fn insert(&mut self, doc: Document) -> Uuid {
        let id = doc.id;
        match self.positions.get(&id) {
            Some(&pos) => self.docs[pos] = doc,
            None => {
                self.positions.insert(id, self.docs.len());
                self.docs.push(doc);
            }
        }
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&Document> {
        self.positions.get(id).map(|&pos| &self.docs[pos])
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }
}
