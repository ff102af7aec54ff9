//! Structure index: per-node adjacency partitions
//!
//! Every node gets four partitions mapping a neighbor key to the set of edge
//! keys connecting them:
//!
//! - `incoming` / `outgoing` for directed edges
//! - `undirected_in` / `undirected_out` for undirected edges, by declared
//!   target / declared source
//!
//! An edge `(u, v)` lives in exactly one set, owned by the [`EdgeSetArena`].
//! Both `u.outgoing[v]` and `v.incoming[u]` hold the same [`EdgeSetId`], so a
//! single push or removal is observed from both endpoints. Self-loops are
//! registered on the out side only.
//!
//! The index is a disposable cache: [`StructureIndex::clear`] followed by
//! [`StructureIndex::compute`] yields the same partitions as incremental
//! maintenance through [`StructureIndex::update`] and
//! [`StructureIndex::clear_edge`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{GraphError, Result};
use crate::storage::{EdgeKey, EdgeRecord, NodeKey, NodeRecord};

/// Node records keyed by node key, as owned by the graph container
pub type NodeTable = HashMap<NodeKey, NodeRecord>;

/// Handle to an edge set shared by both endpoints of a node pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeSetId(usize);

/// Slab of edge sets. Released slots are recycled.
#[derive(Debug, Default)]
pub struct EdgeSetArena {
    slots: Vec<Vec<EdgeKey>>,
    free: Vec<usize>,
}

impl EdgeSetArena {
    fn alloc(&mut self) -> EdgeSetId {
        if let Some(slot) = self.free.pop() {
            return EdgeSetId(slot);
        }
        self.slots.push(Vec::new());
        EdgeSetId(self.slots.len() - 1)
    }

    /// Edge keys of a set, in insertion order
    pub fn get(&self, id: EdgeSetId) -> &[EdgeKey] {
        self.slots.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    fn get_mut(&mut self, id: EdgeSetId) -> Result<&mut Vec<EdgeKey>> {
        self.slots
            .get_mut(id.0)
            .ok_or_else(|| GraphError::Index(format!("dangling edge set #{}", id.0)))
    }

    fn release(&mut self, id: EdgeSetId) {
        if let Some(set) = self.slots.get_mut(id.0) {
            set.clear();
            self.free.push(id.0);
        }
    }

    /// Number of sets currently in use
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

/// Neighbor key -> shared edge set, iterated in first-insertion order
#[derive(Debug, Default, Clone)]
pub struct Adjacency {
    order: Vec<NodeKey>,
    sets: HashMap<NodeKey, EdgeSetId>,
}

impl Adjacency {
    pub fn get(&self, neighbor: &str) -> Option<EdgeSetId> {
        self.sets.get(neighbor).copied()
    }

    pub fn contains(&self, neighbor: &str) -> bool {
        self.sets.contains_key(neighbor)
    }

    fn insert(&mut self, neighbor: NodeKey, id: EdgeSetId) {
        if self.sets.insert(neighbor.clone(), id).is_none() {
            self.order.push(neighbor);
        }
    }

    fn remove(&mut self, neighbor: &str) -> Option<EdgeSetId> {
        let id = self.sets.remove(neighbor)?;
        self.order.retain(|key| key != neighbor);
        Some(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, EdgeSetId)> + '_ {
        self.order
            .iter()
            .filter_map(move |key| self.sets.get(key).map(|&id| (key, id)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// One of the four adjacency partitions of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Partition {
    In,
    Out,
    UndirectedIn,
    UndirectedOut,
}

impl Partition {
    /// Read order used by every query
    pub const ALL: [Partition; 4] = [
        Partition::In,
        Partition::Out,
        Partition::UndirectedIn,
        Partition::UndirectedOut,
    ];

    /// (source side, target side) partitions an edge is registered under
    pub fn for_edge(undirected: bool) -> (Partition, Partition) {
        if undirected {
            (Partition::UndirectedOut, Partition::UndirectedIn)
        } else {
            (Partition::Out, Partition::In)
        }
    }

    pub fn is_undirected(self) -> bool {
        matches!(self, Partition::UndirectedIn | Partition::UndirectedOut)
    }

    pub fn is_out(self) -> bool {
        matches!(self, Partition::Out | Partition::UndirectedOut)
    }

    /// Partition holding the same set on the other endpoint
    pub fn mirror(self) -> Partition {
        match self {
            Partition::In => Partition::Out,
            Partition::Out => Partition::In,
            Partition::UndirectedIn => Partition::UndirectedOut,
            Partition::UndirectedOut => Partition::UndirectedIn,
        }
    }
}

/// Index data attached to a node record
#[derive(Debug, Default, Clone)]
pub struct NodeAdjacency {
    pub incoming: Adjacency,
    pub outgoing: Adjacency,
    pub undirected_in: Adjacency,
    pub undirected_out: Adjacency,
}

impl NodeAdjacency {
    pub fn partition(&self, partition: Partition) -> &Adjacency {
        match partition {
            Partition::In => &self.incoming,
            Partition::Out => &self.outgoing,
            Partition::UndirectedIn => &self.undirected_in,
            Partition::UndirectedOut => &self.undirected_out,
        }
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut Adjacency {
        match partition {
            Partition::In => &mut self.incoming,
            Partition::Out => &mut self.outgoing,
            Partition::UndirectedIn => &mut self.undirected_in,
            Partition::UndirectedOut => &mut self.undirected_out,
        }
    }

    pub fn is_empty(&self) -> bool {
        Partition::ALL.iter().all(|&p| self.partition(p).is_empty())
    }
}

/// (node, partition, neighbor) -> edge keys, ignoring intra-set order
pub type IndexSnapshot = BTreeMap<(NodeKey, Partition, NodeKey), BTreeSet<EdgeKey>>;

/// Lazily built structure index
#[derive(Debug, Default)]
pub struct StructureIndex {
    built: bool,
    sets: EdgeSetArena,
}

fn missing_node(key: &str) -> GraphError {
    GraphError::Index(format!("structure index: node \"{}\" is not in the graph", key))
}

fn slot<'a>(nodes: &'a mut NodeTable, key: &str) -> Result<&'a mut NodeAdjacency> {
    let node = nodes.get_mut(key).ok_or_else(|| missing_node(key))?;
    Ok(node.index.get_or_insert_with(NodeAdjacency::default))
}

impl StructureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Edge keys of a shared set
    pub fn edge_set(&self, id: EdgeSetId) -> &[EdgeKey] {
        self.sets.get(id)
    }

    pub fn arena(&self) -> &EdgeSetArena {
        &self.sets
    }

    /// Build the index from every live edge. No-op when already built.
    pub fn compute<'a, I>(&mut self, nodes: &mut NodeTable, edges: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a EdgeRecord>,
    {
        if self.built {
            return Ok(());
        }

        for node in nodes.values_mut() {
            node.index = Some(NodeAdjacency::default());
        }

        let mut count = 0usize;
        for edge in edges.into_iter().filter(|e| !e.deleted) {
            self.update(nodes, edge)?;
            count += 1;
        }

        self.built = true;
        tracing::debug!(
            "Structure index built: {} nodes, {} edges, {} edge sets",
            nodes.len(),
            count,
            self.sets.live()
        );
        Ok(())
    }

    /// Register a newly inserted edge
    pub fn update(&mut self, nodes: &mut NodeTable, edge: &EdgeRecord) -> Result<()> {
        let (out_partition, in_partition) = Partition::for_edge(edge.undirected);

        let source = slot(nodes, &edge.source)?;
        let id = match source.partition(out_partition).get(&edge.target) {
            Some(id) => id,
            None => {
                let id = self.sets.alloc();
                source
                    .partition_mut(out_partition)
                    .insert(edge.target.clone(), id);
                id
            }
        };
        self.sets.get_mut(id)?.push(edge.key.clone());

        tracing::trace!("index: +{} ({} -> {})", edge.key, edge.source, edge.target);

        if edge.is_self_loop() {
            return Ok(());
        }

        // The target side only needs the alias, the key is already in the set
        let target = slot(nodes, &edge.target)?;
        match target.partition(in_partition).get(&edge.source) {
            None => target
                .partition_mut(in_partition)
                .insert(edge.source.clone(), id),
            Some(existing) if existing == id => {}
            Some(_) => {
                return Err(GraphError::Index(format!(
                    "edge set for {} -> {} is not shared between endpoints",
                    edge.source, edge.target
                )))
            }
        }

        Ok(())
    }

    /// Unregister a removed edge. A set left empty is released and both
    /// endpoint entries pointing at it are dropped.
    pub fn clear_edge(&mut self, nodes: &mut NodeTable, edge: &EdgeRecord) -> Result<()> {
        let (out_partition, in_partition) = Partition::for_edge(edge.undirected);

        let source = nodes
            .get_mut(&edge.source)
            .ok_or_else(|| missing_node(&edge.source))?;
        let Some(source) = source.index.as_mut() else {
            return Ok(());
        };
        let Some(id) = source.partition(out_partition).get(&edge.target) else {
            return Ok(());
        };

        let set = self.sets.get_mut(id)?;
        if let Some(pos) = set.iter().position(|key| *key == edge.key) {
            set.remove(pos);
        }

        tracing::trace!("index: -{} ({} -> {})", edge.key, edge.source, edge.target);

        if !set.is_empty() {
            return Ok(());
        }

        source.partition_mut(out_partition).remove(&edge.target);
        if !edge.is_self_loop() {
            if let Some(target) = nodes.get_mut(&edge.target).and_then(|n| n.index.as_mut()) {
                target.partition_mut(in_partition).remove(&edge.source);
            }
        }
        self.sets.release(id);

        Ok(())
    }

    /// Attach an empty slot to a node created while the index is built
    pub fn attach_node(&self, node: &mut NodeRecord) {
        if self.built {
            node.index = Some(NodeAdjacency::default());
        }
    }

    /// Purge a node's partitions and every neighbor entry aliasing its sets.
    /// Callers drop incident edges first, so this normally finds nothing.
    pub fn detach_node(&mut self, nodes: &mut NodeTable, key: &str) {
        let Some(adjacency) = nodes.get_mut(key).and_then(|n| n.index.take()) else {
            return;
        };

        for partition in Partition::ALL {
            for (neighbor, id) in adjacency.partition(partition).iter() {
                if neighbor != key {
                    if let Some(other) = nodes.get_mut(neighbor).and_then(|n| n.index.as_mut()) {
                        other.partition_mut(partition.mirror()).remove(key);
                    }
                }
                // Each set shows up once among a node's partitions
                self.sets.release(id);
            }
        }
    }

    /// Drop the whole index. Every node returns to "not computed".
    pub fn clear(&mut self, nodes: &mut NodeTable) {
        for node in nodes.values_mut() {
            node.index = None;
        }
        self.sets.clear();
        self.built = false;
        tracing::debug!("Structure index cleared");
    }

    /// Order-insensitive view of every non-empty partition entry
    pub fn snapshot(&self, nodes: &NodeTable) -> IndexSnapshot {
        let mut snapshot = IndexSnapshot::new();

        for (key, node) in nodes {
            let Some(adjacency) = node.index.as_ref() else {
                continue;
            };
            for partition in Partition::ALL {
                for (neighbor, id) in adjacency.partition(partition).iter() {
                    let edges: BTreeSet<EdgeKey> = self.sets.get(id).iter().cloned().collect();
                    if !edges.is_empty() {
                        snapshot.insert((key.clone(), partition, neighbor.clone()), edges);
                    }
                }
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_edges() -> Vec<EdgeRecord> {
        Vec::new()
    }

    fn make_nodes(keys: &[&str]) -> NodeTable {
        keys.iter()
            .map(|k| (k.to_string(), NodeRecord::new(*k)))
            .collect()
    }

    fn adjacency<'a>(nodes: &'a NodeTable, key: &str) -> &'a NodeAdjacency {
        nodes[key].index.as_ref().unwrap()
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut nodes = make_nodes(&["A", "B"]);
        let edges = vec![EdgeRecord::directed("e1", "A", "B")];
        let mut index = StructureIndex::new();

        index.compute(&mut nodes, &edges).unwrap();
        index.compute(&mut nodes, &edges).unwrap();

        assert!(index.is_built());
        let id = adjacency(&nodes, "A").outgoing.get("B").unwrap();
        assert_eq!(index.edge_set(id), ["e1".to_string()]);
    }

    #[test]
    fn test_directed_edge_set_is_shared() {
        let mut nodes = make_nodes(&["A", "B"]);
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &no_edges()).unwrap();

        index.update(&mut nodes, &EdgeRecord::directed("e1", "A", "B")).unwrap();
        index.update(&mut nodes, &EdgeRecord::directed("e2", "A", "B")).unwrap();

        let out = adjacency(&nodes, "A").outgoing.get("B").unwrap();
        let inc = adjacency(&nodes, "B").incoming.get("A").unwrap();
        assert_eq!(out, inc);
        assert_eq!(index.edge_set(out), ["e1".to_string(), "e2".to_string()]);
        assert_eq!(index.arena().live(), 1);
    }

    #[test]
    fn test_undirected_removal_visible_from_both_endpoints() {
        let mut nodes = make_nodes(&["U", "V"]);
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &no_edges()).unwrap();

        let k1 = EdgeRecord::undirected("k1", "U", "V");
        let k2 = EdgeRecord::undirected("k2", "U", "V");
        index.update(&mut nodes, &k1).unwrap();
        index.update(&mut nodes, &k2).unwrap();

        let id = adjacency(&nodes, "V").undirected_in.get("U").unwrap();
        assert_eq!(index.edge_set(id).len(), 2);

        index.clear_edge(&mut nodes, &k1).unwrap();
        let from_u = adjacency(&nodes, "U").undirected_out.get("V").unwrap();
        let from_v = adjacency(&nodes, "V").undirected_in.get("U").unwrap();
        assert_eq!(index.edge_set(from_u), ["k2".to_string()]);
        assert_eq!(index.edge_set(from_v), ["k2".to_string()]);

        index.clear_edge(&mut nodes, &k2).unwrap();
        assert!(!adjacency(&nodes, "U").undirected_out.contains("V"));
        assert!(!adjacency(&nodes, "V").undirected_in.contains("U"));
        assert_eq!(index.arena().live(), 0);
    }

    #[test]
    fn test_self_loop_registered_on_out_side_only() {
        let mut nodes = make_nodes(&["A"]);
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &no_edges()).unwrap();

        index.update(&mut nodes, &EdgeRecord::directed("l1", "A", "A")).unwrap();
        index.update(&mut nodes, &EdgeRecord::undirected("l2", "A", "A")).unwrap();

        let a = adjacency(&nodes, "A");
        assert!(a.outgoing.contains("A"));
        assert!(a.undirected_out.contains("A"));
        assert!(a.incoming.is_empty());
        assert!(a.undirected_in.is_empty());
    }

    #[test]
    fn test_released_sets_are_recycled() {
        let mut nodes = make_nodes(&["A", "B", "C"]);
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &no_edges()).unwrap();

        let e1 = EdgeRecord::directed("e1", "A", "B");
        index.update(&mut nodes, &e1).unwrap();
        index.clear_edge(&mut nodes, &e1).unwrap();
        index.update(&mut nodes, &EdgeRecord::directed("e2", "B", "C")).unwrap();

        assert_eq!(index.arena().live(), 1);
        assert_eq!(index.arena().slots.len(), 1);
    }

    #[test]
    fn test_update_missing_node_is_index_error() {
        let mut nodes = make_nodes(&["A"]);
        let mut index = StructureIndex::new();

        let err = index
            .update(&mut nodes, &EdgeRecord::directed("e1", "A", "Z"))
            .unwrap_err();
        assert!(matches!(err, GraphError::Index(_)));
    }

    #[test]
    fn test_clear_resets_nodes() {
        let mut nodes = make_nodes(&["A", "B"]);
        let edges = vec![EdgeRecord::undirected("e1", "A", "B")];
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &edges).unwrap();

        index.clear(&mut nodes);

        assert!(!index.is_built());
        assert!(nodes.values().all(|n| n.index.is_none()));
        assert_eq!(index.arena().live(), 0);
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let mut nodes = make_nodes(&["A", "B", "C"]);
        let mut edges = vec![
            EdgeRecord::directed("e1", "A", "B"),
            EdgeRecord::undirected("e2", "B", "C"),
            EdgeRecord::directed("e3", "C", "C"),
            EdgeRecord::directed("e4", "A", "B"),
        ];
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &edges).unwrap();

        index.clear_edge(&mut nodes, &edges[0]).unwrap();
        edges[0].deleted = true;
        let extra = EdgeRecord::undirected("e5", "C", "A");
        index.update(&mut nodes, &extra).unwrap();
        edges.push(extra);

        let incremental = index.snapshot(&nodes);
        index.clear(&mut nodes);
        index.compute(&mut nodes, &edges).unwrap();

        assert_eq!(index.snapshot(&nodes), incremental);
    }

    #[test]
    fn test_detach_node_purges_neighbor_entries() {
        let mut nodes = make_nodes(&["A", "B"]);
        let edges = vec![EdgeRecord::directed("e1", "A", "B")];
        let mut index = StructureIndex::new();
        index.compute(&mut nodes, &edges).unwrap();

        index.detach_node(&mut nodes, "B");

        assert!(nodes["B"].index.is_none());
        assert!(!adjacency(&nodes, "A").outgoing.contains("B"));
        assert_eq!(index.arena().live(), 0);
    }

    #[test]
    fn test_adjacency_keeps_first_insertion_order() {
        let mut adj = Adjacency::default();
        adj.insert("b".into(), EdgeSetId(0));
        adj.insert("a".into(), EdgeSetId(1));
        adj.insert("b".into(), EdgeSetId(0));

        let keys: Vec<&NodeKey> = adj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);

        adj.remove("b");
        assert_eq!(adj.len(), 1);
        assert_eq!(adj.get("a"), Some(EdgeSetId(1)));
    }
}
