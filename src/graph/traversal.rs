//! Граф traversal алгоритмы

use std::collections::{HashSet, VecDeque};

use crate::error::{GraphError, Result};
use crate::storage::NodeKey;
use super::{GraphEngine, GraphStore, NeighborFamily};

/// BFS traversal от start нод
pub fn bfs<F>(start: &[&str], max_depth: usize, mut get_neighbors: F) -> Vec<NodeKey>
where
    F: FnMut(&str) -> Vec<NodeKey>,
{
    let mut visited: HashSet<NodeKey> = HashSet::new();
    let mut queue: VecDeque<NodeKey> = start.iter().map(|s| s.to_string()).collect();
    let mut result = Vec::new();
    let mut depth = 0;

    while !queue.is_empty() && depth <= max_depth {
        let level_size = queue.len();

        for _ in 0..level_size {
            let Some(node) = queue.pop_front() else {
                break;
            };
            if !visited.insert(node.clone()) {
                continue;
            }

            // Добавляем соседей в очередь
            for neighbor in get_neighbors(&node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }

            result.push(node);
        }

        depth += 1;
    }

    result
}

/// DFS traversal, preorder
pub fn dfs<F>(start: &[&str], max_depth: usize, mut get_neighbors: F) -> Vec<NodeKey>
where
    F: FnMut(&str) -> Vec<NodeKey>,
{
    let mut visited: HashSet<NodeKey> = HashSet::new();
    // Reversed so the first start node is visited first
    let mut stack: Vec<(NodeKey, usize)> = start.iter().rev().map(|s| (s.to_string(), 0)).collect();
    let mut result = Vec::new();

    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth || !visited.insert(node.clone()) {
            continue;
        }

        // Добавляем соседей в stack
        for neighbor in get_neighbors(&node).into_iter().rev() {
            if !visited.contains(&neighbor) {
                stack.push((neighbor, depth + 1));
            }
        }

        result.push(node);
    }

    result
}

impl GraphEngine {
    /// Breadth-first walk along the neighbors of `family`
    pub fn bfs(&mut self, start: &[&str], max_depth: usize, family: NeighborFamily) -> Result<Vec<NodeKey>> {
        self.prepare_walk("bfs", start)?;
        Ok(bfs(start, max_depth, |node| self.walk_neighbors(family, node)))
    }

    /// Depth-first walk along the neighbors of `family`
    pub fn dfs(&mut self, start: &[&str], max_depth: usize, family: NeighborFamily) -> Result<Vec<NodeKey>> {
        self.prepare_walk("dfs", start)?;
        Ok(dfs(start, max_depth, |node| self.walk_neighbors(family, node)))
    }

    fn prepare_walk(&mut self, method: &'static str, start: &[&str]) -> Result<()> {
        if let Some(missing) = start.iter().find(|key| !self.has_node(key)) {
            return Err(GraphError::NodeNotFound { method, key: missing.to_string() });
        }
        self.compute_index()
    }

    // Read-only counterpart of the neighbor query, index must be built
    fn walk_neighbors(&self, family: NeighborFamily, node: &str) -> Vec<NodeKey> {
        let descriptor = family.descriptor();
        let Some(adjacency) = self.adjacency(node) else {
            return Vec::new();
        };

        let mut seen: HashSet<&NodeKey> = HashSet::new();
        super::edges::partitions(descriptor.edge_type, descriptor.direction)
            .flat_map(|p| adjacency.partition(p).iter().map(|(neighbor, _)| neighbor))
            .filter(|neighbor| seen.insert(*neighbor))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(edges: &'a HashMap<&'a str, Vec<&'a str>>) -> impl FnMut(&str) -> Vec<NodeKey> + 'a {
        move |node: &str| {
            edges
                .get(node)
                .map(|ns| ns.iter().map(|n| n.to_string()).collect())
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_bfs_simple_graph() {
        // Граф: 1 -> 2 -> 3
        //       1 -> 4
        let edges: HashMap<&str, Vec<&str>> =
            [("1", vec!["2", "4"]), ("2", vec!["3"])].into_iter().collect();

        let result = bfs(&["1"], 10, lookup(&edges));

        assert_eq!(result, ["1", "2", "4", "3"]);
    }

    #[test]
    fn test_bfs_max_depth() {
        // Граф: 1 -> 2 -> 3 -> 4
        let edges: HashMap<&str, Vec<&str>> =
            [("1", vec!["2"]), ("2", vec!["3"]), ("3", vec!["4"])].into_iter().collect();

        let result = bfs(&["1"], 2, lookup(&edges));

        // Должны дойти только до глубины 2: 1, 2, 3
        assert_eq!(result, ["1", "2", "3"]);
    }

    #[test]
    fn test_dfs_preorder_and_cycles() {
        // Граф: 1 -> 2 -> 3 -> 1
        //       1 -> 4
        let edges: HashMap<&str, Vec<&str>> =
            [("1", vec!["2", "4"]), ("2", vec!["3"]), ("3", vec!["1"])].into_iter().collect();

        let result = dfs(&["1"], 10, lookup(&edges));

        assert_eq!(result, ["1", "2", "3", "4"]);
    }

    #[test]
    fn test_engine_walks_follow_family() {
        let mut graph = GraphEngine::new();
        graph.add_nodes(["A", "B", "C", "D"]).unwrap();
        graph.add_directed_edge("A", "B").unwrap();
        graph.add_directed_edge("C", "B").unwrap();
        graph.add_undirected_edge("C", "D").unwrap();

        let out = graph.bfs(&["A"], 10, NeighborFamily::OutNeighbors).unwrap();
        assert_eq!(out, ["A", "B"]);

        let mut all = graph.bfs(&["A"], 10, NeighborFamily::Neighbors).unwrap();
        all.sort();
        assert_eq!(all, ["A", "B", "C", "D"]);

        let deep = graph.dfs(&["D"], 1, NeighborFamily::Neighbors).unwrap();
        assert_eq!(deep, ["D", "C"]);
    }

    #[test]
    fn test_walk_from_missing_node() {
        let mut graph = GraphEngine::new();
        let err = graph.bfs(&["ghost"], 3, NeighborFamily::Neighbors).unwrap_err();
        assert!(err.is_not_found());
    }
}
