//! In-memory node and edge records

pub mod pairs;

use serde::{Deserialize, Serialize};

use crate::index::NodeAdjacency;

pub use pairs::PairCounts;

/// Node identifier
pub type NodeKey = String;

/// Edge identifier
pub type EdgeKey = String;

/// Free-form JSON attributes attached to nodes and edges
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Node record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: NodeKey,

    #[serde(default)]
    pub attributes: Attributes,

    /// Structure index slot. `None` until the index is computed,
    /// reset to `None` whenever the index is cleared.
    #[serde(skip)]
    pub index: Option<NodeAdjacency>,
}

impl NodeRecord {
    pub fn new(key: impl Into<NodeKey>) -> Self {
        Self {
            key: key.into(),
            attributes: Attributes::new(),
            index: None,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Edge record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub key: EdgeKey,

    /// Declared source node
    pub source: NodeKey,

    /// Declared target node
    pub target: NodeKey,

    /// Undirected edges keep their declared source/target for indexing
    pub undirected: bool,

    #[serde(default)]
    pub attributes: Attributes,

    /// Tombstone flag
    #[serde(default)]
    pub deleted: bool,
}

impl EdgeRecord {
    pub fn directed(key: impl Into<EdgeKey>, source: impl Into<NodeKey>, target: impl Into<NodeKey>) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            target: target.into(),
            undirected: false,
            attributes: Attributes::new(),
            deleted: false,
        }
    }

    pub fn undirected(key: impl Into<EdgeKey>, source: impl Into<NodeKey>, target: impl Into<NodeKey>) -> Self {
        Self {
            undirected: true,
            ..Self::directed(key, source, target)
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
