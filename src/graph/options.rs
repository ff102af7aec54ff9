//! Graph construction options

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Which kinds of edges a graph accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    #[default]
    Mixed,
    Directed,
    Undirected,
}

impl GraphType {
    pub fn accepts(self, undirected: bool) -> bool {
        match self {
            GraphType::Mixed => true,
            GraphType::Directed => !undirected,
            GraphType::Undirected => undirected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GraphType::Mixed => "mixed",
            GraphType::Directed => "directed",
            GraphType::Undirected => "undirected",
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mixed" => Ok(GraphType::Mixed),
            "directed" => Ok(GraphType::Directed),
            "undirected" => Ok(GraphType::Undirected),
            other => Err(GraphError::Usage(format!(
                "unknown graph type \"{}\" (expecting mixed, directed or undirected)",
                other
            ))),
        }
    }
}

/// Options fixed at construction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphOptions {
    #[serde(rename = "type")]
    pub graph_type: GraphType,

    /// Allow parallel edges of the same kind between a pair of nodes
    pub multi: bool,

    pub allow_self_loops: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            graph_type: GraphType::Mixed,
            multi: false,
            allow_self_loops: true,
        }
    }
}

impl GraphOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph_type(mut self, graph_type: GraphType) -> Self {
        self.graph_type = graph_type;
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn allow_self_loops(mut self, allow: bool) -> Self {
        self.allow_self_loops = allow;
        self
    }
}
