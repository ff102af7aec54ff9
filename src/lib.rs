//! mgraph - in-memory mixed multigraph with a lazily built structure index
//!
//! # Architecture
//!
//! - **Graph container**: nodes and edges keyed by strings, JSON attributes
//! - **Structure index**: per-node `in`/`out`/`undirectedIn`/`undirectedOut`
//!   partitions, built on first query and kept in sync by mutation hooks
//! - **Shared edge sets**: both endpoints of a pair alias one edge set
//! - **Iteration families**: `edges`, `inEdges`, ... `selfLoops` and the
//!   neighbor counterparts, each with a collector and a counter
//! - **Wire protocol**: MessagePack over a Unix socket (`mgraph-server`)
//!
//! # Usage example
//!
//! ```
//! use mgraph::{GraphEngine, GraphStore};
//!
//! # fn main() -> mgraph::Result<()> {
//! let mut graph = GraphEngine::new();
//! graph.add_nodes(["A", "B", "C"])?;
//! graph.add_directed_edge_with_key("e1", "A", "B")?;
//! graph.add_undirected_edge_with_key("e2", "B", "C")?;
//!
//! assert_eq!(graph.edges(())?, ["e1", "e2"]);
//! assert_eq!(graph.out_edges("A")?, ["e1"]);
//! assert_eq!(graph.edges(("A", "B"))?, ["e1"]);
//! assert_eq!(graph.count_edges(["A", "C"])?, 2);
//! assert_eq!(graph.neighbors("B")?, ["A", "C"]);
//! assert_eq!(graph.node_count(), 3);
//! # Ok(())
//! # }
//! ```

pub mod graph;
pub mod storage;
pub mod index;
pub mod error;
pub mod protocol;

pub use graph::{GraphStore, GraphEngine};
pub use graph::{EdgeFamily, NeighborFamily, EdgeQuery, NeighborQuery, GraphOptions, GraphType};
pub use storage::{NodeRecord, EdgeRecord};
pub use error::{GraphError, Result};
