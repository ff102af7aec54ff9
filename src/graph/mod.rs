//! Граф API и реализация

pub mod engine;
pub mod edges;
pub mod neighbors;
pub mod options;
pub mod query;
pub mod traversal;
pub mod id_gen;


pub use engine::GraphEngine;
pub use edges::{Direction, EdgeFamily, EdgeType, FamilyDescriptor, Mode};
pub use neighbors::NeighborFamily;
pub use options::{GraphOptions, GraphType};
pub use query::{EdgeQuery, NeighborQuery};
pub use id_gen::compute_edge_key;

use crate::storage::{Attributes, EdgeKey, EdgeRecord};
use crate::error::Result;

/// Основной trait для graph container
pub trait GraphStore {
    // === NODE OPERATIONS ===

    /// Добавить ноду. Fails if the key is taken.
    fn add_node(&mut self, key: &str, attributes: Attributes) -> Result<()>;

    /// Удалить ноду вместе со всеми её рёбрами
    fn drop_node(&mut self, key: &str) -> Result<()>;

    /// Проверить существование ноды
    fn has_node(&self, key: &str) -> bool;

    fn node_attributes(&self, key: &str) -> Option<&Attributes>;

    // === EDGE OPERATIONS ===

    /// Добавить ребро с заданным ключом
    fn add_edge_with_key(
        &mut self,
        key: &str,
        source: &str,
        target: &str,
        undirected: bool,
        attributes: Attributes,
    ) -> Result<EdgeKey>;

    /// Добавить ребро, ключ генерируется
    fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        undirected: bool,
        attributes: Attributes,
    ) -> Result<EdgeKey>;

    /// Удалить ребро, returns the removed record
    fn drop_edge(&mut self, key: &str) -> Result<EdgeRecord>;

    fn has_edge(&self, key: &str) -> bool;

    /// Is there a directed edge going from `source` to `target`
    fn has_directed_edge(&self, source: &str, target: &str) -> bool;

    /// Is there an undirected edge between the two nodes
    fn has_undirected_edge(&self, source: &str, target: &str) -> bool;

    fn edge(&self, key: &str) -> Option<&EdgeRecord>;

    // === STATS ===

    /// Количество нод
    fn node_count(&self) -> usize;

    /// Количество живых рёбер
    fn edge_count(&self) -> usize;
}
