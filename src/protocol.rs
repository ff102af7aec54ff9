//! Wire protocol for mgraph-server
//!
//! Request:  [4-byte length BE] [MessagePack payload]
//! Response: [4-byte length BE] [MessagePack payload]
//!
//! Iteration methods are reached through a single `call` command carrying the
//! method name ("outEdges", "countNeighbors", ...) and positional arguments,
//! so the arity and node/bunch detection rules apply exactly as for callers
//! of an untyped API.

use std::io::{ErrorKind, Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::graph::query::decode_pair_key;
use crate::graph::{EdgeFamily, EdgeQuery, GraphEngine, GraphStore, Mode, NeighborFamily, NeighborQuery};
use crate::storage::Attributes;

/// Messages above this size are rejected before allocation
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

// ============================================================================
// Wire Protocol Types
// ============================================================================

/// Request from client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Request {
    // Write operations
    AddNode {
        key: String,
        #[serde(default)]
        attributes: Attributes,
    },
    DropNode { key: String },
    AddEdge {
        #[serde(default)]
        key: Option<String>,
        source: String,
        target: String,
        #[serde(default)]
        undirected: bool,
        #[serde(default)]
        attributes: Attributes,
    },
    DropEdge { key: String },
    ClearEdges,
    Clear,

    // Read operations
    HasNode { key: String },
    HasEdge { key: String },
    Call {
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },

    // Graph traversal
    Bfs {
        start: Vec<String>,
        #[serde(rename = "maxDepth")]
        max_depth: usize,
        #[serde(default)]
        family: Option<String>,
    },
    Dfs {
        start: Vec<String>,
        #[serde(rename = "maxDepth")]
        max_depth: usize,
        #[serde(default)]
        family: Option<String>,
    },

    // Index control
    ComputeIndex,
    ClearIndex,

    // Control
    Stats,
    Ping,
    Shutdown,
}

/// Response to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ok { ok: bool },
    Error { error: String },
    Key { key: String },
    Keys { keys: Vec<String> },
    Count { count: usize },
    Bool { value: bool },
    Stats {
        nodes: usize,
        edges: usize,
        #[serde(rename = "indexBuilt")]
        index_built: bool,
    },
    Pong { pong: bool, version: String },
}

// ============================================================================
// Request Handler
// ============================================================================

/// Apply one request. Failures are reported in-band as `Response::Error`.
pub fn handle_request(engine: &mut GraphEngine, request: Request) -> Response {
    match apply(engine, request) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Request rejected: {}", e);
            Response::Error { error: e.to_string() }
        }
    }
}

fn apply(engine: &mut GraphEngine, request: Request) -> Result<Response> {
    let response = match request {
        // Write operations
        Request::AddNode { key, attributes } => {
            engine.add_node(&key, attributes)?;
            Response::Ok { ok: true }
        }
        Request::DropNode { key } => {
            engine.drop_node(&key)?;
            Response::Ok { ok: true }
        }
        Request::AddEdge { key, source, target, undirected, attributes } => {
            let key = match key {
                Some(key) => engine.add_edge_with_key(&key, &source, &target, undirected, attributes)?,
                None => engine.add_edge(&source, &target, undirected, attributes)?,
            };
            Response::Key { key }
        }
        Request::DropEdge { key } => {
            engine.drop_edge(&key)?;
            Response::Ok { ok: true }
        }
        Request::ClearEdges => {
            engine.clear_edges();
            Response::Ok { ok: true }
        }
        Request::Clear => {
            engine.clear();
            Response::Ok { ok: true }
        }

        // Read operations
        Request::HasNode { key } => Response::Bool { value: engine.has_node(&key) },
        Request::HasEdge { key } => Response::Bool { value: engine.has_edge(&key) },
        Request::Call { method, args } => call(engine, &method, &args)?,

        // Graph traversal
        Request::Bfs { start, max_depth, family } => {
            let start: Vec<&str> = start.iter().map(String::as_str).collect();
            let keys = engine.bfs(&start, max_depth, walk_family(family.as_deref())?)?;
            Response::Keys { keys }
        }
        Request::Dfs { start, max_depth, family } => {
            let start: Vec<&str> = start.iter().map(String::as_str).collect();
            let keys = engine.dfs(&start, max_depth, walk_family(family.as_deref())?)?;
            Response::Keys { keys }
        }

        // Index control
        Request::ComputeIndex => {
            engine.compute_index()?;
            Response::Ok { ok: true }
        }
        Request::ClearIndex => {
            engine.clear_index();
            Response::Ok { ok: true }
        }

        // Control
        Request::Stats => Response::Stats {
            nodes: engine.node_count(),
            edges: engine.edge_count(),
            index_built: engine.is_index_built(),
        },
        Request::Ping => Response::Pong {
            pong: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Request::Shutdown => Response::Ok { ok: true },
    };

    Ok(response)
}

/// Dispatch an iteration method by name
fn call(engine: &mut GraphEngine, method: &str, args: &[Value]) -> Result<Response> {
    if let Some((family, mode)) = EdgeFamily::from_method_name(method) {
        let query = EdgeQuery::from_args(family.method_name(mode), args)?;
        return Ok(match mode {
            Mode::Collect => Response::Keys { keys: engine.query_edges(family, query)? },
            Mode::Count => Response::Count { count: engine.query_edge_count(family, query)? },
        });
    }

    if let Some((family, mode)) = NeighborFamily::from_method_name(method) {
        let name = family.method_name(mode);
        return match (mode, args) {
            (Mode::Collect, [node, neighbor]) => {
                let node = decode_pair_key(name, "node", node)?;
                let neighbor = decode_pair_key(name, "neighbor", neighbor)?;
                let value = engine.check_neighbors(family, &node, &neighbor)?;
                Ok(Response::Bool { value })
            }
            (Mode::Collect, [_]) => {
                let keys = engine.query_neighbors(family, NeighborQuery::from_args(name, args)?)?;
                Ok(Response::Keys { keys })
            }
            (Mode::Collect, []) => Err(GraphError::InvalidArguments {
                method: name,
                expected: "1 or 2",
                got: 0,
            }),
            (Mode::Collect, _) => Err(GraphError::TooManyArguments {
                method: name,
                expected: "1 or 2",
                got: args.len(),
            }),
            (Mode::Count, _) => {
                let count = engine.query_neighbor_count(family, NeighborQuery::from_args(name, args)?)?;
                Ok(Response::Count { count })
            }
        };
    }

    Err(GraphError::Usage(format!("unknown method \"{}\"", method)))
}

fn walk_family(name: Option<&str>) -> Result<NeighborFamily> {
    let Some(name) = name else {
        return Ok(NeighborFamily::Neighbors);
    };
    match NeighborFamily::from_method_name(name) {
        Some((family, Mode::Collect)) => Ok(family),
        _ => Err(GraphError::Usage(format!("\"{}\" is not a neighbor family", name))),
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Read one length-prefixed frame. `Ok(None)` on clean EOF.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    // Read 4-byte length prefix (big-endian)
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(GraphError::Io(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    Ok(Some(buf))
}

pub fn write_message<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| {
        GraphError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("Message too large: {} bytes", data.len()),
        ))
    })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(data)?;
    writer.flush()?;
    Ok(())
}

pub fn decode_request(payload: &[u8]) -> Result<Request> {
    Ok(rmp_serde::from_slice(payload)?)
}

/// Named encoding, so clients see field names instead of positional arrays
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(response)?)
}
