//! Main GraphEngine implementation: in-memory node/edge container
//! keeping the structure index in sync with every edge mutation

use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::index::{IndexSnapshot, NodeAdjacency, NodeTable, StructureIndex};
use crate::storage::{Attributes, EdgeKey, EdgeRecord, NodeKey, NodeRecord, PairCounts};
use super::options::{GraphOptions, GraphType};
use super::{compute_edge_key, EdgeFamily, EdgeQuery, GraphStore};

/// Minimum number of tombstones before edge storage is compacted
/// Compaction only kicks in once tombstones also outnumber live edges
pub const COMPACT_MIN_TOMBSTONES: usize = 1024;

/// In-memory mixed multigraph
#[derive(Debug)]
pub struct GraphEngine {
    options: GraphOptions,

    nodes: NodeTable,

    // Edges in insertion order, dropped ones are tombstoned until compaction
    pub(crate) edges: Vec<EdgeRecord>,

    // Edge key -> position in `edges`
    edge_slots: HashMap<EdgeKey, usize>,

    // Edge multiplicity per pair, independent of the structure index
    pairs: PairCounts,

    pub(crate) structure: StructureIndex,

    tombstones: usize,

    // Sequence number feeding generated edge keys
    edge_seq: u64,
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEngine {
    /// Mixed, simple graph allowing self-loops
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    pub fn with_options(options: GraphOptions) -> Self {
        tracing::debug!(
            "Created {} graph (multi={}, self_loops={})",
            options.graph_type,
            options.multi,
            options.allow_self_loops
        );

        Self {
            options,
            nodes: NodeTable::new(),
            edges: Vec::new(),
            edge_slots: HashMap::new(),
            pairs: PairCounts::new(),
            structure: StructureIndex::new(),
            tombstones: 0,
            edge_seq: 0,
        }
    }

    pub fn directed() -> Self {
        Self::with_options(GraphOptions::new().graph_type(GraphType::Directed))
    }

    pub fn undirected() -> Self {
        Self::with_options(GraphOptions::new().graph_type(GraphType::Undirected))
    }

    pub fn multi_directed() -> Self {
        Self::with_options(GraphOptions::new().graph_type(GraphType::Directed).multi(true))
    }

    pub fn multi_undirected() -> Self {
        Self::with_options(GraphOptions::new().graph_type(GraphType::Undirected).multi(true))
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Add several attribute-less nodes at once
    pub fn add_nodes<I, K>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.add_node(key.as_ref(), Attributes::new())?;
        }
        Ok(())
    }

    pub fn add_directed_edge(&mut self, source: &str, target: &str) -> Result<EdgeKey> {
        self.add_edge(source, target, false, Attributes::new())
    }

    pub fn add_undirected_edge(&mut self, source: &str, target: &str) -> Result<EdgeKey> {
        self.add_edge(source, target, true, Attributes::new())
    }

    pub fn add_directed_edge_with_key(&mut self, key: &str, source: &str, target: &str) -> Result<EdgeKey> {
        self.add_edge_with_key(key, source, target, false, Attributes::new())
    }

    pub fn add_undirected_edge_with_key(&mut self, key: &str, source: &str, target: &str) -> Result<EdgeKey> {
        self.add_edge_with_key(key, source, target, true, Attributes::new())
    }

    fn edge_or_not_found(&self, key: &str) -> Result<&EdgeRecord> {
        self.edge(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.to_string()))
    }

    pub fn source(&self, edge: &str) -> Result<&str> {
        Ok(&self.edge_or_not_found(edge)?.source)
    }

    pub fn target(&self, edge: &str) -> Result<&str> {
        Ok(&self.edge_or_not_found(edge)?.target)
    }

    pub fn is_undirected(&self, edge: &str) -> Result<bool> {
        Ok(self.edge_or_not_found(edge)?.undirected)
    }

    /// Live edge records in insertion order
    pub fn edge_records(&self) -> impl Iterator<Item = &EdgeRecord> + '_ {
        self.edges.iter().filter(|e| !e.deleted)
    }

    /// Node keys, in no particular order
    pub fn node_keys(&self) -> impl Iterator<Item = &NodeKey> + '_ {
        self.nodes.keys()
    }

    pub(crate) fn adjacency(&self, key: &str) -> Option<&NodeAdjacency> {
        self.nodes.get(key).and_then(|n| n.index.as_ref())
    }

    pub(crate) fn pairs(&self) -> &PairCounts {
        &self.pairs
    }

    /// Order-insensitive dump of the structure index
    pub fn index_snapshot(&self) -> IndexSnapshot {
        self.structure.snapshot(&self.nodes)
    }

    // === STRUCTURE INDEX HOOKS ===

    pub fn is_index_built(&self) -> bool {
        self.structure.is_built()
    }

    /// Build the structure index if it is absent
    pub fn compute_index(&mut self) -> Result<()> {
        self.structure.compute(&mut self.nodes, &self.edges)
    }

    /// Discard the structure index. It is rebuilt on the next query.
    pub fn clear_index(&mut self) {
        self.structure.clear(&mut self.nodes);
    }

    /// Must run after every edge insertion
    pub fn on_edge_added(&mut self, edge: &EdgeRecord) -> Result<()> {
        if self.structure.is_built() {
            self.structure.update(&mut self.nodes, edge)?;
        }
        Ok(())
    }

    /// Must run after every edge removal
    pub fn on_edge_removed(&mut self, edge: &EdgeRecord) -> Result<()> {
        if self.structure.is_built() {
            self.structure.clear_edge(&mut self.nodes, edge)?;
        }
        Ok(())
    }

    // === BULK OPERATIONS ===

    /// Drop every edge, keep the nodes
    pub fn clear_edges(&mut self) {
        let dropped = self.edge_count();
        self.edges.clear();
        self.edge_slots.clear();
        self.pairs.clear();
        self.tombstones = 0;
        self.clear_index();
        tracing::info!("Cleared {} edges", dropped);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.clear_edges();
        self.nodes.clear();
        tracing::info!("Graph cleared");
    }

    /// Remove tombstoned edges from storage
    pub fn compact(&mut self) {
        if self.tombstones == 0 {
            return;
        }

        self.edges.retain(|e| !e.deleted);
        self.edge_slots = self
            .edges
            .iter()
            .enumerate()
            .map(|(slot, e)| (e.key.clone(), slot))
            .collect();

        tracing::info!(
            "Compacted edge storage: {} tombstones dropped, {} live edges",
            self.tombstones,
            self.edges.len()
        );
        self.tombstones = 0;
    }

    fn maybe_compact(&mut self) {
        if self.tombstones >= COMPACT_MIN_TOMBSTONES && self.tombstones > self.edge_slots.len() {
            self.compact();
        }
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones
    }

    fn insert_edge(&mut self, record: EdgeRecord) -> Result<EdgeKey> {
        let method = if record.undirected { "addUndirectedEdge" } else { "addDirectedEdge" };

        if !self.options.graph_type.accepts(record.undirected) {
            return Err(GraphError::Usage(format!(
                "Graph.{}: cannot add {} edge to a {} graph",
                method,
                if record.undirected { "an undirected" } else { "a directed" },
                self.options.graph_type
            )));
        }

        if record.is_self_loop() && !self.options.allow_self_loops {
            return Err(GraphError::Usage(format!(
                "Graph.{}: source & target are the same (\"{}\"), thus creating a loop explicitly forbidden by this graph 'allowSelfLoops' option",
                method, record.source
            )));
        }

        if !self.has_node(&record.source) {
            return Err(GraphError::PairNodeNotFound {
                method,
                role: "source",
                key: record.source,
            });
        }
        if !self.has_node(&record.target) {
            return Err(GraphError::PairNodeNotFound {
                method,
                role: "target",
                key: record.target,
            });
        }

        if self.edge_slots.contains_key(&record.key) {
            return Err(GraphError::Usage(format!(
                "Graph.{}: the \"{}\" edge already exists in the graph",
                method, record.key
            )));
        }

        if !self.options.multi {
            let exists = if record.undirected {
                self.has_undirected_edge(&record.source, &record.target)
            } else {
                self.has_directed_edge(&record.source, &record.target)
            };
            if exists {
                return Err(GraphError::Usage(format!(
                    "Graph.{}: an edge linking \"{}\" to \"{}\" already exists. Use a multi graph for parallel edges",
                    method, record.source, record.target
                )));
            }
        }

        self.on_edge_added(&record)?;
        self.pairs.add(&record);

        let key = record.key.clone();
        self.edge_slots.insert(key.clone(), self.edges.len());
        self.edges.push(record);
        self.edge_seq += 1;

        Ok(key)
    }
}

impl GraphStore for GraphEngine {
    fn add_node(&mut self, key: &str, attributes: Attributes) -> Result<()> {
        if self.nodes.contains_key(key) {
            return Err(GraphError::Usage(format!(
                "Graph.addNode: the \"{}\" node already exists in the graph",
                key
            )));
        }

        let mut node = NodeRecord::new(key).with_attributes(attributes);
        self.structure.attach_node(&mut node);
        self.nodes.insert(key.to_string(), node);
        Ok(())
    }

    fn drop_node(&mut self, key: &str) -> Result<()> {
        if !self.has_node(key) {
            return Err(GraphError::NodeNotFound {
                method: "dropNode",
                key: key.to_string(),
            });
        }

        // Unbuilt index: scan raw records
        let incident: Vec<EdgeKey> = if self.is_index_built() {
            self.query_edges(EdgeFamily::Edges, EdgeQuery::Node(key.to_string()))?
        } else {
            self.edge_records()
                .filter(|edge| edge.source == key || edge.target == key)
                .map(|edge| edge.key.clone())
                .collect()
        };
        for edge in &incident {
            self.drop_edge(edge)?;
        }

        self.structure.detach_node(&mut self.nodes, key);
        self.nodes.remove(key);

        tracing::debug!("Dropped node {} with {} edges", key, incident.len());
        Ok(())
    }

    fn has_node(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    fn node_attributes(&self, key: &str) -> Option<&Attributes> {
        self.nodes.get(key).map(|n| &n.attributes)
    }

    fn add_edge_with_key(
        &mut self,
        key: &str,
        source: &str,
        target: &str,
        undirected: bool,
        attributes: Attributes,
    ) -> Result<EdgeKey> {
        let record = if undirected {
            EdgeRecord::undirected(key, source, target)
        } else {
            EdgeRecord::directed(key, source, target)
        };
        self.insert_edge(record.with_attributes(attributes))
    }

    fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        undirected: bool,
        attributes: Attributes,
    ) -> Result<EdgeKey> {
        // A generated key may collide with a user-provided one, skip ahead
        let mut key = compute_edge_key(source, target, undirected, self.edge_seq);
        while self.edge_slots.contains_key(&key) {
            self.edge_seq += 1;
            key = compute_edge_key(source, target, undirected, self.edge_seq);
        }
        self.add_edge_with_key(&key, source, target, undirected, attributes)
    }

    fn drop_edge(&mut self, key: &str) -> Result<EdgeRecord> {
        let slot = *self
            .edge_slots
            .get(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.to_string()))?;

        // Index first: on failure the edge stays fully in place
        let record = self.edges[slot].clone();
        self.on_edge_removed(&record)?;

        self.edges[slot] = EdgeRecord {
            deleted: true,
            ..EdgeRecord::directed(key, "", "")
        };
        self.edge_slots.remove(key);
        self.tombstones += 1;

        self.pairs.remove(&record);
        self.maybe_compact();

        Ok(record)
    }

    fn has_edge(&self, key: &str) -> bool {
        self.edge_slots.contains_key(key)
    }

    fn has_directed_edge(&self, source: &str, target: &str) -> bool {
        self.pairs.directed(source, target) > 0
    }

    fn has_undirected_edge(&self, source: &str, target: &str) -> bool {
        self.pairs.undirected(source, target) > 0
    }

    fn edge(&self, key: &str) -> Option<&EdgeRecord> {
        self.edge_slots.get(key).map(|&slot| &self.edges[slot])
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edge_slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_graph(multi: bool) -> GraphEngine {
        let mut graph = GraphEngine::with_options(GraphOptions::new().multi(multi));
        graph.add_nodes(["A", "B", "C"]).unwrap();
        graph
    }

    #[test]
    fn test_add_node_twice_fails() {
        let mut graph = make_graph(false);
        let err = graph.add_node("A", Attributes::new()).unwrap_err();
        assert!(matches!(err, GraphError::Usage(_)));
    }

    #[test]
    fn test_node_attributes() {
        let mut graph = GraphEngine::new();
        let mut attributes = Attributes::new();
        attributes.insert("age".into(), serde_json::json!(42));
        graph.add_node("John", attributes).unwrap();

        assert_eq!(graph.node_attributes("John").unwrap()["age"], 42);
        assert!(graph.node_attributes("Martha").is_none());
    }

    #[test]
    fn test_add_edge_missing_endpoint() {
        let mut graph = make_graph(false);
        let err = graph.add_directed_edge_with_key("e1", "A", "Z").unwrap_err();
        match err {
            GraphError::PairNodeNotFound { role, key, .. } => {
                assert_eq!(role, "target");
                assert_eq!(key, "Z");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_edge_key_fails() {
        let mut graph = make_graph(true);
        graph.add_directed_edge_with_key("e1", "A", "B").unwrap();
        let err = graph.add_undirected_edge_with_key("e1", "B", "C").unwrap_err();
        assert!(matches!(err, GraphError::Usage(_)));
    }

    #[test]
    fn test_simple_graph_rejects_parallel_edges() {
        let mut graph = make_graph(false);
        graph.add_directed_edge("A", "B").unwrap();
        assert!(graph.add_directed_edge("A", "B").is_err());

        // Opposite direction and other kinds are not parallel
        graph.add_directed_edge("B", "A").unwrap();
        graph.add_undirected_edge("A", "B").unwrap();
        assert!(graph.add_undirected_edge("B", "A").is_err());
    }

    #[test]
    fn test_multi_graph_accepts_parallel_edges() {
        let mut graph = make_graph(true);
        let k1 = graph.add_directed_edge("A", "B").unwrap();
        let k2 = graph.add_directed_edge("A", "B").unwrap();
        assert_ne!(k1, k2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_graph_type_restrictions() {
        let mut graph = GraphEngine::directed();
        graph.add_nodes(["A", "B"]).unwrap();
        assert!(graph.add_undirected_edge("A", "B").is_err());
        graph.add_directed_edge("A", "B").unwrap();

        let mut graph = GraphEngine::multi_undirected();
        graph.add_nodes(["A", "B"]).unwrap();
        assert!(graph.add_directed_edge("A", "B").is_err());
        graph.add_undirected_edge("A", "B").unwrap();
        graph.add_undirected_edge("A", "B").unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_self_loops_can_be_forbidden() {
        let mut graph = GraphEngine::with_options(GraphOptions::new().allow_self_loops(false));
        graph.add_node("A", Attributes::new()).unwrap();
        assert!(graph.add_directed_edge("A", "A").is_err());
    }

    #[test]
    fn test_drop_edge_updates_existence_checks() {
        let mut graph = make_graph(false);
        graph.add_directed_edge_with_key("e1", "A", "B").unwrap();
        assert!(graph.has_directed_edge("A", "B"));
        assert!(!graph.has_directed_edge("B", "A"));

        let record = graph.drop_edge("e1").unwrap();
        assert_eq!(record.source, "A");
        assert!(!graph.has_edge("e1"));
        assert!(!graph.has_directed_edge("A", "B"));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.tombstone_count(), 1);

        assert!(matches!(graph.drop_edge("e1"), Err(GraphError::EdgeNotFound(_))));
    }

    #[test]
    fn test_edge_accessors() {
        let mut graph = make_graph(false);
        graph.add_undirected_edge_with_key("e1", "A", "B").unwrap();

        assert_eq!(graph.source("e1").unwrap(), "A");
        assert_eq!(graph.target("e1").unwrap(), "B");
        assert!(graph.is_undirected("e1").unwrap());
        assert!(graph.source("nope").is_err());
    }

    #[test]
    fn test_drop_node_removes_incident_edges() {
        let mut graph = make_graph(true);
        graph.add_directed_edge_with_key("e1", "A", "B").unwrap();
        graph.add_undirected_edge_with_key("e2", "B", "C").unwrap();
        graph.add_directed_edge_with_key("e3", "B", "B").unwrap();
        graph.add_directed_edge_with_key("e4", "A", "C").unwrap();

        graph.compute_index().unwrap();
        graph.drop_node("B").unwrap();

        assert!(!graph.has_node("B"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge("e4"));
        assert!(graph.adjacency("A").unwrap().outgoing.get("B").is_none());
        assert!(graph.adjacency("C").unwrap().undirected_in.get("B").is_none());

        assert!(graph.drop_node("B").unwrap_err().is_not_found());
    }

    #[test]
    fn test_drop_node_without_index_leaves_it_unbuilt() {
        let mut graph = make_graph(true);
        graph.add_directed_edge_with_key("e1", "A", "B").unwrap();
        graph.add_undirected_edge_with_key("e2", "C", "B").unwrap();
        graph.add_directed_edge_with_key("e3", "B", "B").unwrap();
        graph.add_directed_edge_with_key("e4", "A", "C").unwrap();

        graph.drop_node("B").unwrap();

        assert!(!graph.is_index_built());
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge("e4"));
        assert!(!graph.has_directed_edge("A", "B"));
        assert!(!graph.has_undirected_edge("C", "B"));
        assert_eq!(graph.edges("C").unwrap(), ["e4"]);
    }

    #[test]
    fn test_failed_drop_edge_keeps_edge() {
        let mut graph = make_graph(true);
        graph.compute_index().unwrap();
        graph.add_directed_edge_with_key("e1", "A", "B").unwrap();

        // Index update fails once the source record is gone
        graph.nodes.remove("A");

        let err = graph.drop_edge("e1").unwrap_err();
        assert!(matches!(err, GraphError::Index(_)));
        assert!(graph.has_edge("e1"));
        assert!(graph.has_directed_edge("A", "B"));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.tombstone_count(), 0);
        assert_eq!(graph.edge("e1").unwrap().target, "B");
    }

    #[test]
    fn test_index_follows_mutations_once_built() {
        let mut graph = make_graph(true);
        graph.add_directed_edge_with_key("e1", "A", "B").unwrap();
        assert!(!graph.is_index_built());

        graph.compute_index().unwrap();
        graph.add_directed_edge_with_key("e2", "A", "B").unwrap();

        let id = graph.adjacency("B").unwrap().incoming.get("A").unwrap();
        assert_eq!(graph.structure.edge_set(id), ["e1".to_string(), "e2".to_string()]);

        graph.add_node("D", Attributes::new()).unwrap();
        assert!(graph.adjacency("D").unwrap().is_empty());
    }

    #[test]
    fn test_clear_edges_invalidates_index() {
        let mut graph = make_graph(false);
        graph.add_directed_edge("A", "B").unwrap();
        graph.compute_index().unwrap();

        graph.clear_edges();

        assert!(!graph.is_index_built());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 3);
        assert!(!graph.has_directed_edge("A", "B"));

        graph.clear();
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_compact_keeps_lookup_consistent() {
        let mut graph = make_graph(true);
        for i in 0..10 {
            graph.add_directed_edge_with_key(&format!("e{i}"), "A", "B").unwrap();
        }
        for i in 0..5 {
            graph.drop_edge(&format!("e{i}")).unwrap();
        }

        graph.compact();

        assert_eq!(graph.tombstone_count(), 0);
        assert_eq!(graph.edges.len(), 5);
        assert_eq!(graph.edge("e7").unwrap().key, "e7");
        let keys: Vec<&str> = graph.edge_records().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["e5", "e6", "e7", "e8", "e9"]);
    }

    #[test]
    fn test_auto_compaction() {
        let mut graph = make_graph(true);
        let total = COMPACT_MIN_TOMBSTONES + 10;
        for i in 0..total {
            graph.add_directed_edge_with_key(&format!("e{i}"), "A", "B").unwrap();
        }
        for i in 0..total - 1 {
            graph.drop_edge(&format!("e{i}")).unwrap();
        }

        assert!(graph.tombstone_count() < COMPACT_MIN_TOMBSTONES);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(&format!("e{}", total - 1)));
    }
}
