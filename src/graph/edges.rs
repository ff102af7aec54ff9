//! Edge iteration
//!
//! Eight query families, each a (type, direction) pair from a static table.
//! Every family has a collector and a counter; both run the same selection
//! code and only differ in the [`EdgeSink`] they fill.
//!
//! | family            | type        | direction |
//! |-------------------|-------------|-----------|
//! | `edges`           | mixed       | -         |
//! | `inEdges`         | directed    | in        |
//! | `outEdges`        | directed    | out       |
//! | `inboundEdges`    | mixed       | in        |
//! | `outboundEdges`   | mixed       | out       |
//! | `directedEdges`   | directed    | -         |
//! | `undirectedEdges` | undirected  | -         |
//! | `selfLoops`       | self-loops  | -         |
//!
//! Direction only narrows single-node and bunch queries. A pair query reads
//! every partition of the family's type.

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::index::Partition;
use crate::storage::{EdgeKey, EdgeRecord};
use super::{EdgeQuery, GraphEngine, GraphStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Mixed,
    Directed,
    Undirected,
    SelfLoops,
}

impl EdgeType {
    /// Filter applied to raw edge records when no node is given
    pub fn accepts(self, edge: &EdgeRecord) -> bool {
        match self {
            EdgeType::Mixed => true,
            EdgeType::Directed => !edge.undirected,
            EdgeType::Undirected => edge.undirected,
            EdgeType::SelfLoops => edge.is_self_loop(),
        }
    }

    fn reads(self, partition: Partition) -> bool {
        match self {
            EdgeType::Mixed => true,
            EdgeType::Directed => !partition.is_undirected(),
            EdgeType::Undirected => partition.is_undirected(),
            // Self-loops are only ever registered on the out side
            EdgeType::SelfLoops => partition.is_out(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn reads(self, partition: Partition) -> bool {
        match self {
            Direction::In => !partition.is_out(),
            Direction::Out => partition.is_out(),
        }
    }
}

/// Partitions read for a (type, direction) pair, in read order
pub(crate) fn partitions(
    edge_type: EdgeType,
    direction: Option<Direction>,
) -> impl Iterator<Item = Partition> {
    Partition::ALL
        .into_iter()
        .filter(move |&p| edge_type.reads(p) && direction.map_or(true, |d| d.reads(p)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Collect,
    Count,
}

/// One row of a family table
#[derive(Debug, Clone, Copy)]
pub struct FamilyDescriptor {
    pub name: &'static str,
    pub counter: &'static str,
    pub edge_type: EdgeType,
    pub direction: Option<Direction>,
}

impl FamilyDescriptor {
    pub fn method_name(&self, mode: Mode) -> &'static str {
        match mode {
            Mode::Collect => self.name,
            Mode::Count => self.counter,
        }
    }
}

static EDGE_FAMILIES: [FamilyDescriptor; 8] = [
    FamilyDescriptor { name: "edges", counter: "countEdges", edge_type: EdgeType::Mixed, direction: None },
    FamilyDescriptor { name: "inEdges", counter: "countInEdges", edge_type: EdgeType::Directed, direction: Some(Direction::In) },
    FamilyDescriptor { name: "outEdges", counter: "countOutEdges", edge_type: EdgeType::Directed, direction: Some(Direction::Out) },
    FamilyDescriptor { name: "inboundEdges", counter: "countInboundEdges", edge_type: EdgeType::Mixed, direction: Some(Direction::In) },
    FamilyDescriptor { name: "outboundEdges", counter: "countOutboundEdges", edge_type: EdgeType::Mixed, direction: Some(Direction::Out) },
    FamilyDescriptor { name: "directedEdges", counter: "countDirectedEdges", edge_type: EdgeType::Directed, direction: None },
    FamilyDescriptor { name: "undirectedEdges", counter: "countUndirectedEdges", edge_type: EdgeType::Undirected, direction: None },
    FamilyDescriptor { name: "selfLoops", counter: "countSelfLoops", edge_type: EdgeType::SelfLoops, direction: None },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeFamily {
    Edges,
    InEdges,
    OutEdges,
    InboundEdges,
    OutboundEdges,
    DirectedEdges,
    UndirectedEdges,
    SelfLoops,
}

impl EdgeFamily {
    pub const ALL: [EdgeFamily; 8] = [
        EdgeFamily::Edges,
        EdgeFamily::InEdges,
        EdgeFamily::OutEdges,
        EdgeFamily::InboundEdges,
        EdgeFamily::OutboundEdges,
        EdgeFamily::DirectedEdges,
        EdgeFamily::UndirectedEdges,
        EdgeFamily::SelfLoops,
    ];

    pub fn descriptor(self) -> &'static FamilyDescriptor {
        &EDGE_FAMILIES[self as usize]
    }

    pub fn method_name(self, mode: Mode) -> &'static str {
        self.descriptor().method_name(mode)
    }

    /// Resolve "outEdges", "countSelfLoops", ...
    pub fn from_method_name(name: &str) -> Option<(EdgeFamily, Mode)> {
        Self::ALL.into_iter().find_map(|family| {
            let descriptor = family.descriptor();
            if descriptor.name == name {
                Some((family, Mode::Collect))
            } else if descriptor.counter == name {
                Some((family, Mode::Count))
            } else {
                None
            }
        })
    }
}

/// Receives selected edge keys: a collector keeps them, a counter sums them
pub(crate) trait EdgeSink: Default {
    const MODE: Mode;

    fn push(&mut self, key: &EdgeKey);

    fn extend(&mut self, keys: &[EdgeKey]);

    /// Take an already deduplicated union
    fn absorb(&mut self, keys: Vec<EdgeKey>);

    /// Size-only shortcut. Collectors refuse it and take the slow path.
    fn add_count(&mut self, _n: usize) -> bool {
        false
    }
}

impl EdgeSink for Vec<EdgeKey> {
    const MODE: Mode = Mode::Collect;

    fn push(&mut self, key: &EdgeKey) {
        Vec::push(self, key.clone());
    }

    fn extend(&mut self, keys: &[EdgeKey]) {
        self.extend_from_slice(keys);
    }

    fn absorb(&mut self, keys: Vec<EdgeKey>) {
        if self.is_empty() {
            *self = keys;
        } else {
            Extend::extend(self, keys);
        }
    }
}

impl EdgeSink for usize {
    const MODE: Mode = Mode::Count;

    fn push(&mut self, _key: &EdgeKey) {
        *self += 1;
    }

    fn extend(&mut self, keys: &[EdgeKey]) {
        *self += keys.len();
    }

    // Union has to be materialized for deduplication, only its size is kept
    fn absorb(&mut self, keys: Vec<EdgeKey>) {
        *self += keys.len();
    }

    fn add_count(&mut self, n: usize) -> bool {
        *self += n;
        true
    }
}

impl GraphEngine {
    /// Collect the edge keys matching `family` for the given query shape
    pub fn query_edges(&mut self, family: EdgeFamily, query: impl Into<EdgeQuery>) -> Result<Vec<EdgeKey>> {
        self.select(family, query.into())
    }

    /// Count the edges matching `family` for the given query shape
    pub fn query_edge_count(&mut self, family: EdgeFamily, query: impl Into<EdgeQuery>) -> Result<usize> {
        self.select(family, query.into())
    }

    pub(crate) fn select<S: EdgeSink>(&mut self, family: EdgeFamily, query: EdgeQuery) -> Result<S> {
        let method = family.method_name(S::MODE);
        let FamilyDescriptor { edge_type, direction, .. } = *family.descriptor();

        match query {
            EdgeQuery::All => Ok(self.select_all(edge_type)),

            EdgeQuery::Node(node) => {
                if !self.has_node(&node) {
                    return Err(GraphError::NodeNotFound { method, key: node });
                }
                self.compute_index()?;
                Ok(self.select_node(edge_type, direction, &node))
            }

            EdgeQuery::Bunch(bunch) => {
                if let Some(missing) = bunch.iter().find(|key| !self.has_node(key)) {
                    return Err(GraphError::BunchNodeNotFound {
                        method,
                        key: missing.clone(),
                    });
                }
                self.compute_index()?;
                Ok(self.select_bunch(edge_type, direction, &bunch))
            }

            EdgeQuery::Pair(source, target) => {
                if !self.has_node(&source) {
                    return Err(GraphError::PairNodeNotFound { method, role: "source", key: source });
                }
                if !self.has_node(&target) {
                    return Err(GraphError::PairNodeNotFound { method, role: "target", key: target });
                }
                if !self.has_qualifying_edge(edge_type, &source, &target) {
                    return Ok(S::default());
                }
                self.compute_index()?;
                Ok(self.select_pair(edge_type, &source, &target))
            }
        }
    }

    /// Arity 0 scans raw records, the index is node oriented
    fn select_all<S: EdgeSink>(&self, edge_type: EdgeType) -> S {
        let mut sink = S::default();

        if edge_type == EdgeType::Mixed && sink.add_count(self.edge_count()) {
            return sink;
        }

        for edge in self.edge_records().filter(|e| edge_type.accepts(e)) {
            sink.push(&edge.key);
        }
        sink
    }

    fn select_node<S: EdgeSink>(&self, edge_type: EdgeType, direction: Option<Direction>, node: &str) -> S {
        let mut sink = S::default();
        let Some(adjacency) = self.adjacency(node) else {
            return sink;
        };

        for partition in partitions(edge_type, direction) {
            for (_, id) in adjacency.partition(partition).iter() {
                let keys = self.structure.edge_set(id);

                if edge_type == EdgeType::SelfLoops {
                    // NOTE: out partitions hold every edge leaving the node,
                    // keep the loops only
                    for key in keys {
                        if self.edge(key).map_or(false, EdgeRecord::is_self_loop) {
                            sink.push(key);
                        }
                    }
                } else {
                    sink.extend(keys);
                }
            }
        }

        sink
    }

    fn select_bunch<S: EdgeSink>(&self, edge_type: EdgeType, direction: Option<Direction>, bunch: &[String]) -> S {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut union: Vec<EdgeKey> = Vec::new();

        for node in bunch {
            let Some(adjacency) = self.adjacency(node) else {
                continue;
            };

            for partition in partitions(edge_type, direction) {
                let entries = adjacency.partition(partition);

                // A node's loops sit under its own key
                let sets: Vec<_> = if edge_type == EdgeType::SelfLoops {
                    entries.get(node).into_iter().collect()
                } else {
                    entries.iter().map(|(_, id)| id).collect()
                };

                for id in sets {
                    for key in self.structure.edge_set(id) {
                        if seen.insert(key.as_str()) {
                            union.push(key.clone());
                        }
                    }
                }
            }
        }

        let mut sink = S::default();
        sink.absorb(union);
        sink
    }

    /// A pair is read from both sides of the source whatever the family's
    /// direction, so `outEdges(a, b)` also reports edges from `b` to `a`
    fn select_pair<S: EdgeSink>(&self, edge_type: EdgeType, source: &str, target: &str) -> S {
        let mut sink = S::default();

        if edge_type == EdgeType::SelfLoops && source != target {
            return sink;
        }
        let Some(adjacency) = self.adjacency(source) else {
            return sink;
        };

        for partition in partitions(edge_type, None) {
            if let Some(id) = adjacency.partition(partition).get(target) {
                sink.extend(self.structure.edge_set(id));
            }
        }

        sink
    }

    /// Whether any edge the family could report links the two nodes.
    /// Answered from pair counts, without the structure index.
    fn has_qualifying_edge(&self, edge_type: EdgeType, source: &str, target: &str) -> bool {
        let pairs = self.pairs();

        let directed = pairs.directed(source, target) + pairs.directed(target, source) > 0;
        let undirected = pairs.undirected(source, target) > 0;

        match edge_type {
            EdgeType::Mixed => directed || undirected,
            EdgeType::Directed => directed,
            EdgeType::Undirected => undirected,
            EdgeType::SelfLoops => source == target && (directed || undirected),
        }
    }
}

macro_rules! edge_family_methods {
    ($($family:ident => $collect:ident, $count:ident;)*) => {
        impl GraphEngine {
            $(
                #[doc = concat!("Collector of the `EdgeFamily::", stringify!($family), "` family")]
                pub fn $collect(&mut self, query: impl Into<EdgeQuery>) -> Result<Vec<EdgeKey>> {
                    self.query_edges(EdgeFamily::$family, query)
                }

                #[doc = concat!("Counter of the `EdgeFamily::", stringify!($family), "` family")]
                pub fn $count(&mut self, query: impl Into<EdgeQuery>) -> Result<usize> {
                    self.query_edge_count(EdgeFamily::$family, query)
                }
            )*
        }
    };
}

edge_family_methods! {
    Edges => edges, count_edges;
    InEdges => in_edges, count_in_edges;
    OutEdges => out_edges, count_out_edges;
    InboundEdges => inbound_edges, count_inbound_edges;
    OutboundEdges => outbound_edges, count_outbound_edges;
    DirectedEdges => directed_edges, count_directed_edges;
    UndirectedEdges => undirected_edges, count_undirected_edges;
    SelfLoops => self_loops, count_self_loops;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_table_is_aligned_with_enum() {
        for family in EdgeFamily::ALL {
            let descriptor = family.descriptor();
            assert_eq!(EdgeFamily::from_method_name(descriptor.name), Some((family, Mode::Collect)));
            assert_eq!(EdgeFamily::from_method_name(descriptor.counter), Some((family, Mode::Count)));
        }
        assert_eq!(EdgeFamily::from_method_name("neighbors"), None);
    }

    #[test]
    fn test_partition_read_order() {
        let all: Vec<_> = partitions(EdgeType::Mixed, None).collect();
        assert_eq!(all, Partition::ALL);

        let inbound: Vec<_> = partitions(EdgeType::Mixed, Some(Direction::In)).collect();
        assert_eq!(inbound, [Partition::In, Partition::UndirectedIn]);

        let out: Vec<_> = partitions(EdgeType::Directed, Some(Direction::Out)).collect();
        assert_eq!(out, [Partition::Out]);

        let undirected: Vec<_> = partitions(EdgeType::Undirected, None).collect();
        assert_eq!(undirected, [Partition::UndirectedIn, Partition::UndirectedOut]);

        let loops: Vec<_> = partitions(EdgeType::SelfLoops, None).collect();
        assert_eq!(loops, [Partition::Out, Partition::UndirectedOut]);
    }

    #[test]
    fn test_type_filter_on_records() {
        let directed_loop = EdgeRecord::directed("l", "A", "A");
        let undirected = EdgeRecord::undirected("u", "A", "B");

        assert!(EdgeType::Mixed.accepts(&undirected));
        assert!(EdgeType::Directed.accepts(&directed_loop));
        assert!(!EdgeType::Directed.accepts(&undirected));
        assert!(EdgeType::SelfLoops.accepts(&directed_loop));
        assert!(!EdgeType::SelfLoops.accepts(&undirected));
    }

    #[test]
    fn test_sinks() {
        let keys = vec!["a".to_string(), "b".to_string()];

        let mut collected: Vec<EdgeKey> = Vec::new();
        EdgeSink::extend(&mut collected, &keys);
        EdgeSink::push(&mut collected, &"c".to_string());
        assert_eq!(collected, ["a", "b", "c"]);
        assert!(!collected.add_count(10));

        let mut count = 0usize;
        EdgeSink::extend(&mut count, &keys);
        count.absorb(keys.clone());
        assert!(count.add_count(1));
        assert_eq!(count, 5);
    }
}
