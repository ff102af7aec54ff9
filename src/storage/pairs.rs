//! Edge multiplicity per (source, target) pair
//!
//! Answers "is there an edge between these two nodes" without the
//! structure index, so simple-graph checks and pair queries that find
//! nothing never force an index build.

use std::collections::HashMap;

use super::{EdgeRecord, NodeKey};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PairCount {
    directed: usize,
    undirected: usize,
}

/// source -> target -> live edge counts, keyed by declared endpoints
#[derive(Debug, Default)]
pub struct PairCounts {
    pairs: HashMap<NodeKey, HashMap<NodeKey, PairCount>>,
}

impl PairCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, edge: &EdgeRecord) {
        let count = self
            .pairs
            .entry(edge.source.clone())
            .or_default()
            .entry(edge.target.clone())
            .or_default();

        if edge.undirected {
            count.undirected += 1;
        } else {
            count.directed += 1;
        }
    }

    pub fn remove(&mut self, edge: &EdgeRecord) {
        let Some(targets) = self.pairs.get_mut(&edge.source) else {
            return;
        };
        let Some(count) = targets.get_mut(&edge.target) else {
            return;
        };

        if edge.undirected {
            count.undirected = count.undirected.saturating_sub(1);
        } else {
            count.directed = count.directed.saturating_sub(1);
        }

        if *count == PairCount::default() {
            targets.remove(&edge.target);
            if targets.is_empty() {
                self.pairs.remove(&edge.source);
            }
        }
    }

    fn get(&self, source: &str, target: &str) -> PairCount {
        self.pairs
            .get(source)
            .and_then(|targets| targets.get(target))
            .copied()
            .unwrap_or_default()
    }

    /// Directed edges going from `source` to `target`
    pub fn directed(&self, source: &str, target: &str) -> usize {
        self.get(source, target).directed
    }

    /// Undirected edges between the two nodes, whichever was declared first
    pub fn undirected(&self, source: &str, target: &str) -> usize {
        let forward = self.get(source, target).undirected;
        if source == target {
            return forward;
        }
        forward + self.get(target, source).undirected
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}
