//! Loading sample documents from disk
//!
//! Markdown and text files are read verbatim. A file may bundle several
//! related documents separated by a `RELATED_DOC_SEP` marker line.

use std::path::Path;

use serde_json::json;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::graphrag::{Document, Metadata};

/// Marker separating documents concatenated into one file.
pub const RELATED_DOC_SEP: &str = "RELATED_DOC_SEP";

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];
const TEXT_EXTENSIONS: [&str; 1] = ["txt"];

/// Split bundled text on [`RELATED_DOC_SEP`]; parts are trimmed, empty ones dropped.
pub fn split_bundle(text: &str) -> Vec<String> {
    text.split(RELATED_DOC_SEP)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// `markdown`, `text`, or `None` for unsupported files.
pub fn source_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
        Some("markdown")
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Some("text")
    } else {
        None
    }
}

/// Recursively load `.md`, `.markdown` and `.txt` files, sorted by path.
pub fn load_documents_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "document directory not found: {}",
            dir.display()
        )));
    }

    let mut documents = Vec::new();
    let mut files = 0;

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = source_type(path) else {
            debug!("Skipping unsupported file {}", path.display());
            continue;
        };

        match load_file(path, kind) {
            Ok(docs) => {
                files += 1;
                documents.extend(docs);
            }
            Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
        }
    }

    info!(
        "Loaded {} documents from {} files in {}",
        documents.len(),
        files,
        dir.display()
    );
    Ok(documents)
}

/// Read one file as plain text and build its documents.
pub fn load_file(path: &Path, kind: &str) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)?;
    Ok(documents_from_text(path, kind, &content))
}

/// Build documents for one file's contents.
pub fn documents_from_text(path: &Path, kind: &str, content: &str) -> Vec<Document> {
    let base = file_metadata(path, kind);

    if !content.contains(RELATED_DOC_SEP) {
        if content.trim().is_empty() {
            return Vec::new();
        }
        return vec![Document::new(content, base)];
    }

    split_bundle(content)
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            let mut metadata = base.clone();
            metadata.insert("part".into(), json!(idx));
            Document::new(part, metadata)
        })
        .collect()
}

fn file_metadata(path: &Path, kind: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!(path.to_string_lossy()));
    if let Some(name) = path.file_name() {
        metadata.insert("file_name".into(), json!(name.to_string_lossy()));
    }
    metadata.insert("source_type".into(), json!(kind));
    metadata
}
