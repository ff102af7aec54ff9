//! Query shapes for edge and neighbor iteration
//!
//! The shape (all edges, one node, a bunch, a source/target pair) is picked
//! at the call site through `From` conversions:
//!
//! ```
//! use mgraph::graph::EdgeQuery;
//!
//! assert_eq!(EdgeQuery::from(()), EdgeQuery::All);
//! assert_eq!(EdgeQuery::from("A"), EdgeQuery::Node("A".into()));
//! assert_eq!(EdgeQuery::from(["A", "B"]), EdgeQuery::Bunch(vec!["A".into(), "B".into()]));
//! assert_eq!(EdgeQuery::from(("A", "B")), EdgeQuery::Pair("A".into(), "B".into()));
//! ```
//!
//! Wire requests carry untyped JSON arguments instead; [`EdgeQuery::from_args`]
//! and [`NeighborQuery::from_args`] do the arity check and node/bunch
//! detection there.

use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::storage::NodeKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeQuery {
    /// Arity 0: every edge of the graph
    All,
    /// Arity 1: edges of a single node
    Node(NodeKey),
    /// Arity 1: union of the edges of several nodes
    Bunch(Vec<NodeKey>),
    /// Arity 2: edges between source and target
    Pair(NodeKey, NodeKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborQuery {
    Node(NodeKey),
    Bunch(Vec<NodeKey>),
}

impl EdgeQuery {
    pub fn bunch<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<NodeKey>,
    {
        EdgeQuery::Bunch(keys.into_iter().map(Into::into).collect())
    }

    /// Number of positional arguments this shape stands for
    pub fn arity(&self) -> usize {
        match self {
            EdgeQuery::All => 0,
            EdgeQuery::Node(_) | EdgeQuery::Bunch(_) => 1,
            EdgeQuery::Pair(..) => 2,
        }
    }

    /// Decode positional JSON arguments
    pub fn from_args(method: &'static str, args: &[Value]) -> Result<Self> {
        match args {
            [] => Ok(EdgeQuery::All),
            [target] => Ok(match decode_target(method, target)? {
                NeighborQuery::Node(key) => EdgeQuery::Node(key),
                NeighborQuery::Bunch(keys) => EdgeQuery::Bunch(keys),
            }),
            [source, target] => Ok(EdgeQuery::Pair(
                decode_pair_key(method, "source", source)?,
                decode_pair_key(method, "target", target)?,
            )),
            _ => Err(GraphError::TooManyArguments {
                method,
                expected: "0, 1 or 2",
                got: args.len(),
            }),
        }
    }
}

impl NeighborQuery {
    pub fn bunch<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<NodeKey>,
    {
        NeighborQuery::Bunch(keys.into_iter().map(Into::into).collect())
    }

    /// Decode a single positional JSON argument
    pub fn from_args(method: &'static str, args: &[Value]) -> Result<Self> {
        match args {
            [target] => decode_target(method, target),
            [] => Err(GraphError::InvalidArguments {
                method,
                expected: "1",
                got: 0,
            }),
            _ => Err(GraphError::TooManyArguments {
                method,
                expected: "1",
                got: args.len(),
            }),
        }
    }
}

/// Strings and numbers name a node, arrays and objects (by key) are bunches.
/// Anything else is reported as a missing node.
fn decode_target(method: &'static str, value: &Value) -> Result<NeighborQuery> {
    match value {
        Value::String(key) => Ok(NeighborQuery::Node(key.clone())),
        Value::Number(n) => Ok(NeighborQuery::Node(n.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|item| decode_bunch_key(method, item))
            .collect::<Result<Vec<_>>>()
            .map(NeighborQuery::Bunch),
        Value::Object(map) => Ok(NeighborQuery::Bunch(map.keys().cloned().collect())),
        other => Err(GraphError::NodeNotFound {
            method,
            key: other.to_string(),
        }),
    }
}

fn decode_bunch_key(method: &'static str, value: &Value) -> Result<NodeKey> {
    match value {
        Value::String(key) => Ok(key.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(GraphError::InvalidBunch {
            method,
            reason: format!("{} is not a valid node key", other),
        }),
    }
}

pub(crate) fn decode_pair_key(method: &'static str, role: &'static str, value: &Value) -> Result<NodeKey> {
    match value {
        Value::String(key) => Ok(key.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(GraphError::PairNodeNotFound {
            method,
            role,
            key: other.to_string(),
        }),
    }
}

impl From<()> for EdgeQuery {
    fn from(_: ()) -> Self {
        EdgeQuery::All
    }
}

impl From<&str> for EdgeQuery {
    fn from(key: &str) -> Self {
        EdgeQuery::Node(key.to_string())
    }
}

impl From<String> for EdgeQuery {
    fn from(key: String) -> Self {
        EdgeQuery::Node(key)
    }
}

impl From<(&str, &str)> for EdgeQuery {
    fn from((source, target): (&str, &str)) -> Self {
        EdgeQuery::Pair(source.to_string(), target.to_string())
    }
}

impl From<&[&str]> for EdgeQuery {
    fn from(keys: &[&str]) -> Self {
        EdgeQuery::bunch(keys.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for EdgeQuery {
    fn from(keys: [&str; N]) -> Self {
        EdgeQuery::bunch(keys)
    }
}

impl From<Vec<&str>> for EdgeQuery {
    fn from(keys: Vec<&str>) -> Self {
        EdgeQuery::bunch(keys)
    }
}

impl From<Vec<NodeKey>> for EdgeQuery {
    fn from(keys: Vec<NodeKey>) -> Self {
        EdgeQuery::Bunch(keys)
    }
}

impl From<NeighborQuery> for EdgeQuery {
    fn from(query: NeighborQuery) -> Self {
        match query {
            NeighborQuery::Node(key) => EdgeQuery::Node(key),
            NeighborQuery::Bunch(keys) => EdgeQuery::Bunch(keys),
        }
    }
}

impl From<&str> for NeighborQuery {
    fn from(key: &str) -> Self {
        NeighborQuery::Node(key.to_string())
    }
}

impl From<String> for NeighborQuery {
    fn from(key: String) -> Self {
        NeighborQuery::Node(key)
    }
}

impl From<&[&str]> for NeighborQuery {
    fn from(keys: &[&str]) -> Self {
        NeighborQuery::bunch(keys.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for NeighborQuery {
    fn from(keys: [&str; N]) -> Self {
        NeighborQuery::bunch(keys)
    }
}

impl From<Vec<&str>> for NeighborQuery {
    fn from(keys: Vec<&str>) -> Self {
        NeighborQuery::bunch(keys)
    }
}

impl From<Vec<NodeKey>> for NeighborQuery {
    fn from(keys: Vec<NodeKey>) -> Self {
        NeighborQuery::Bunch(keys)
    }
}
