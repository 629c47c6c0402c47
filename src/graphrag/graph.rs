use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::links::{incoming_tags, outgoing_tags, Link, LinkTag};

/// Directed edge between two chunk nodes, labelled with the matching tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub tag: LinkTag,
}

/// Chunk graph (in-memory). Node `a` points to node `b` when an outgoing
/// link of `a` matches an incoming link of `b`.
#[derive(Debug, Default, Clone)]
pub struct RelationshipGraph {
    outgoing: Vec<BTreeSet<LinkTag>>,
    incoming: HashMap<LinkTag, Vec<usize>>,
    /// Tag -> nodes with an outgoing link carrying it
    sources: HashMap<LinkTag, Vec<usize>>,
    /// Distinct (source, target) pairs
    edge_pairs: usize,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node with its links; returns the node index.
    pub fn add_node(&mut self, links: &BTreeSet<Link>) -> usize {
        let node = self.outgoing.len();
        let out_tags = outgoing_tags(links);
        let in_tags = incoming_tags(links);

        // Only edges touching the new node change the pair count.
        let targets: HashSet<usize> = out_tags
            .iter()
            .flat_map(|tag| self.nodes_with_incoming(tag).iter().copied())
            .collect();
        let sources: HashSet<usize> = in_tags
            .iter()
            .filter_map(|tag| self.sources.get(tag))
            .flatten()
            .copied()
            .collect();
        self.edge_pairs += targets.len() + sources.len();

        for tag in &out_tags {
            self.sources.entry(tag.clone()).or_default().push(node);
        }
        for tag in in_tags {
            self.incoming.entry(tag).or_default().push(node);
        }
        self.outgoing.push(out_tags);
        node
    }

    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn outgoing_tags(&self, node: usize) -> impl Iterator<Item = &LinkTag> {
        self.outgoing.get(node).into_iter().flatten()
    }

    /// Nodes accepting `tag`, in insertion order.
    pub fn nodes_with_incoming(&self, tag: &LinkTag) -> &[usize] {
        self.incoming.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct targets of `node`'s outgoing links, ascending.
    pub fn adjacent(&self, node: usize) -> Vec<usize> {
        let targets: BTreeSet<usize> = self
            .outgoing_tags(node)
            .flat_map(|tag| self.nodes_with_incoming(tag).iter().copied())
            .filter(|&target| target != node)
            .collect();
        targets.into_iter().collect()
    }

    /// All edges, one per (source, target, tag).
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (from, tags) in self.outgoing.iter().enumerate() {
            for tag in tags {
                for &to in self.nodes_with_incoming(tag) {
                    if to != from {
                        edges.push(Edge {
                            from,
                            to,
                            tag: tag.clone(),
                        });
                    }
                }
            }
        }
        edges
    }

    /// Number of distinct (source, target) pairs.
    pub fn edge_count(&self) -> usize {
        self.edge_pairs
    }

    /// Breadth-first walk from `roots` up to `max_depth` hops.
    /// Each node is reported once, at its minimal depth, in visit order.
    pub fn bfs(&self, roots: &[usize], max_depth: usize) -> Vec<(usize, usize)> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();

        for &root in roots {
            if root < self.node_count() && visited.insert(root) {
                queue.push_back((root, 0));
            }
        }

        while let Some((node, depth)) = queue.pop_front() {
            order.push((node, depth));
            if depth >= max_depth {
                continue;
            }
            for next in self.adjacent(node) {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        order
    }
}
