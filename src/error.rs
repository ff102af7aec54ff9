//! Error types for graph engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph.{method}: could not find the \"{key}\" node in the graph.")]
    NodeNotFound { method: &'static str, key: String },

    #[error("Graph.{method}: could not find the \"{key}\" node in the graph in the given bunch.")]
    BunchNodeNotFound { method: &'static str, key: String },

    /// `role` names the argument: "source", "target", "node" or "neighbor"
    #[error("Graph.{method}: could not find the \"{key}\" {role} node in the graph.")]
    PairNodeNotFound {
        method: &'static str,
        role: &'static str,
        key: String,
    },

    #[error("Graph.{method}: invalid number of arguments (expecting {expected} and got {got}).")]
    InvalidArguments {
        method: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("Graph.{method}: too many arguments (expecting {expected} and got {got}).")]
    TooManyArguments {
        method: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("Graph.{method}: invalid bunch ({reason}).")]
    InvalidBunch { method: &'static str, reason: String },

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Whether the error is one of the not-found conditions
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GraphError::NodeNotFound { .. }
                | GraphError::BunchNodeNotFound { .. }
                | GraphError::PairNodeNotFound { .. }
                | GraphError::EdgeNotFound(_)
        )
    }
}
