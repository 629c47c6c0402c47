use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a link relative to the chunk carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    In,
    Out,
    Bidir,
}

impl LinkDirection {
    /// Can this link originate an edge?
    pub fn is_outgoing(self) -> bool {
        matches!(self, LinkDirection::Out | LinkDirection::Bidir)
    }

    /// Can this link terminate an edge?
    pub fn is_incoming(self) -> bool {
        matches!(self, LinkDirection::In | LinkDirection::Bidir)
    }
}

/// `(kind, tag)` pair that edges are matched on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkTag {
    pub kind: String,
    pub tag: String,
}

impl fmt::Display for LinkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.tag)
    }
}

/// Link attached to a chunk. Matching outgoing and incoming links form edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub kind: String,
    pub direction: LinkDirection,
    pub tag: String,
}

impl Link {
    pub fn new(kind: impl Into<String>, direction: LinkDirection, tag: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            direction,
            tag: tag.into(),
        }
    }

    pub fn incoming(kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(kind, LinkDirection::In, tag)
    }

    pub fn outgoing(kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(kind, LinkDirection::Out, tag)
    }

    pub fn bidir(kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(kind, LinkDirection::Bidir, tag)
    }

    pub fn link_tag(&self) -> LinkTag {
        LinkTag {
            kind: self.kind.clone(),
            tag: self.tag.clone(),
        }
    }
}

/// Distinct outgoing tags of a link set.
pub fn outgoing_tags(links: &BTreeSet<Link>) -> BTreeSet<LinkTag> {
    links
        .iter()
        .filter(|l| l.direction.is_outgoing())
        .map(Link::link_tag)
        .collect()
}

/// Distinct incoming tags of a link set.
pub fn incoming_tags(links: &BTreeSet<Link>) -> BTreeSet<LinkTag> {
    links
        .iter()
        .filter(|l| l.direction.is_incoming())
        .map(Link::link_tag)
        .collect()
}
