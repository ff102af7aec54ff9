//! Neighbor iteration
//!
//! Same partition tables as edge iteration, but reports the distinct
//! neighbor keys instead of edge keys. A neighbor is reported once, at the
//! position it is first met in partition read order.

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::storage::NodeKey;
use super::edges::{partitions, Direction, EdgeType, FamilyDescriptor, Mode};
use super::{GraphEngine, GraphStore, NeighborQuery};

static NEIGHBOR_FAMILIES: [FamilyDescriptor; 7] = [
    FamilyDescriptor { name: "neighbors", counter: "countNeighbors", edge_type: EdgeType::Mixed, direction: None },
    FamilyDescriptor { name: "inNeighbors", counter: "countInNeighbors", edge_type: EdgeType::Directed, direction: Some(Direction::In) },
    FamilyDescriptor { name: "outNeighbors", counter: "countOutNeighbors", edge_type: EdgeType::Directed, direction: Some(Direction::Out) },
    FamilyDescriptor { name: "inboundNeighbors", counter: "countInboundNeighbors", edge_type: EdgeType::Mixed, direction: Some(Direction::In) },
    FamilyDescriptor { name: "outboundNeighbors", counter: "countOutboundNeighbors", edge_type: EdgeType::Mixed, direction: Some(Direction::Out) },
    FamilyDescriptor { name: "directedNeighbors", counter: "countDirectedNeighbors", edge_type: EdgeType::Directed, direction: None },
    FamilyDescriptor { name: "undirectedNeighbors", counter: "countUndirectedNeighbors", edge_type: EdgeType::Undirected, direction: None },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborFamily {
    Neighbors,
    InNeighbors,
    OutNeighbors,
    InboundNeighbors,
    OutboundNeighbors,
    DirectedNeighbors,
    UndirectedNeighbors,
}

impl NeighborFamily {
    pub const ALL: [NeighborFamily; 7] = [
        NeighborFamily::Neighbors,
        NeighborFamily::InNeighbors,
        NeighborFamily::OutNeighbors,
        NeighborFamily::InboundNeighbors,
        NeighborFamily::OutboundNeighbors,
        NeighborFamily::DirectedNeighbors,
        NeighborFamily::UndirectedNeighbors,
    ];

    pub fn descriptor(self) -> &'static FamilyDescriptor {
        &NEIGHBOR_FAMILIES[self as usize]
    }

    pub fn method_name(self, mode: Mode) -> &'static str {
        self.descriptor().method_name(mode)
    }

    pub fn from_method_name(name: &str) -> Option<(NeighborFamily, Mode)> {
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

impl GraphEngine {
    /// Distinct neighbors of a node or bunch for the given family
    pub fn query_neighbors(&mut self, family: NeighborFamily, query: impl Into<NeighborQuery>) -> Result<Vec<NodeKey>> {
        self.select_neighbors(family, Mode::Collect, query.into())
    }

    pub fn query_neighbor_count(&mut self, family: NeighborFamily, query: impl Into<NeighborQuery>) -> Result<usize> {
        Ok(self.select_neighbors(family, Mode::Count, query.into())?.len())
    }

    /// Is `neighbor` a neighbor of `node` for the given family
    pub fn check_neighbors(&mut self, family: NeighborFamily, node: &str, neighbor: &str) -> Result<bool> {
        let method = family.method_name(Mode::Collect);

        if !self.has_node(node) {
            return Err(GraphError::PairNodeNotFound { method, role: "node", key: node.to_string() });
        }
        if !self.has_node(neighbor) {
            return Err(GraphError::PairNodeNotFound { method, role: "neighbor", key: neighbor.to_string() });
        }

        self.compute_index()?;

        let FamilyDescriptor { edge_type, direction, .. } = *family.descriptor();
        let Some(adjacency) = self.adjacency(node) else {
            return Ok(false);
        };

        Ok(partitions(edge_type, direction).any(|p| adjacency.partition(p).contains(neighbor)))
    }

    fn select_neighbors(&mut self, family: NeighborFamily, mode: Mode, query: NeighborQuery) -> Result<Vec<NodeKey>> {
        let method = family.method_name(mode);

        let nodes = match query {
            NeighborQuery::Node(node) => {
                if !self.has_node(&node) {
                    return Err(GraphError::NodeNotFound { method, key: node });
                }
                vec![node]
            }
            NeighborQuery::Bunch(bunch) => {
                if let Some(missing) = bunch.iter().find(|key| !self.has_node(key)) {
                    return Err(GraphError::BunchNodeNotFound { method, key: missing.clone() });
                }
                bunch
            }
        };

        self.compute_index()?;

        let FamilyDescriptor { edge_type, direction, .. } = *family.descriptor();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();

        for node in &nodes {
            let Some(adjacency) = self.adjacency(node) else {
                continue;
            };
            for partition in partitions(edge_type, direction) {
                for (neighbor, _) in adjacency.partition(partition).iter() {
                    if seen.insert(neighbor.as_str()) {
                        result.push(neighbor.clone());
                    }
                }
            }
        }

        Ok(result)
    }
}

macro_rules! neighbor_family_methods {
    ($($family:ident => $collect:ident, $count:ident, $check:ident;)*) => {
        impl GraphEngine {
            $(
                pub fn $collect(&mut self, query: impl Into<NeighborQuery>) -> Result<Vec<NodeKey>> {
                    self.query_neighbors(NeighborFamily::$family, query)
                }

                pub fn $count(&mut self, query: impl Into<NeighborQuery>) -> Result<usize> {
                    self.query_neighbor_count(NeighborFamily::$family, query)
                }

                pub fn $check(&mut self, node: &str, neighbor: &str) -> Result<bool> {
                    self.check_neighbors(NeighborFamily::$family, node, neighbor)
                }
            )*
        }
    };
}

neighbor_family_methods! {
    Neighbors => neighbors, count_neighbors, are_neighbors;
    InNeighbors => in_neighbors, count_in_neighbors, are_in_neighbors;
    OutNeighbors => out_neighbors, count_out_neighbors, are_out_neighbors;
    InboundNeighbors => inbound_neighbors, count_inbound_neighbors, are_inbound_neighbors;
    OutboundNeighbors => outbound_neighbors, count_outbound_neighbors, are_outbound_neighbors;
    DirectedNeighbors => directed_neighbors, count_directed_neighbors, are_directed_neighbors;
    UndirectedNeighbors => undirected_neighbors, count_undirected_neighbors, are_undirected_neighbors;
}
