//! Attributed graph handed to the auto-layout routine.
//!
//! Wraps a petgraph `StableDiGraph` and adds a parent relation for
//! compartment nesting plus a glyph id -> node lookup.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::model::{BoundingBox, Dimensions, PartialBounds, Point};

/// Opaque handle of a node in a [`LayoutGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(NodeIndex);

#[derive(Debug, Clone)]
pub struct NodeData {
    pub glyph_id: String,
    pub bounds: PartialBounds,
    /// Size the routine should assume when the glyph has none.
    pub fallback: Dimensions,
}

#[derive(Debug, Default)]
pub struct LayoutGraph {
    graph: StableDiGraph<NodeData, ()>,
    parents: HashMap<NodeHandle, NodeHandle>,
    node_index: HashMap<String, NodeHandle>,
}

impl LayoutGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node for `data.glyph_id`, or return the existing one.
    pub fn create_node(&mut self, data: NodeData) -> NodeHandle {
        if let Some(&handle) = self.node_index.get(&data.glyph_id) {
            return handle;
        }
        let glyph_id = data.glyph_id.clone();
        let handle = NodeHandle(self.graph.add_node(data));
        self.node_index.insert(glyph_id, handle);
        handle
    }

    pub fn create_edge(&mut self, from: NodeHandle, to: NodeHandle) {
        self.graph.add_edge(from.0, to.0, ());
    }

    pub fn set_parent(&mut self, node: NodeHandle, parent: NodeHandle) {
        self.parents.insert(node, parent);
    }

    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.parents.get(&node).copied()
    }

    /// True if `ancestor` is `node` or one of its transitive parents.
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.parents.len() {
                break;
            }
            current = self.parent(handle);
        }
        false
    }

    pub fn depth(&self, node: NodeHandle) -> usize {
        let mut depth = 0;
        let mut current = self.parent(node);
        while let Some(handle) = current {
            depth += 1;
            if depth > self.parents.len() {
                break;
            }
            current = self.parent(handle);
        }
        depth
    }

    pub fn children(&self, parent: NodeHandle) -> Vec<NodeHandle> {
        let mut children: Vec<NodeHandle> = self
            .parents
            .iter()
            .filter(|(_, p)| **p == parent)
            .map(|(child, _)| *child)
            .collect();
        children.sort();
        children
    }

    pub fn node_for(&self, glyph_id: &str) -> Option<NodeHandle> {
        self.node_index.get(glyph_id).copied()
    }

    pub fn data(&self, node: NodeHandle) -> &NodeData {
        &self.graph[node.0]
    }

    pub fn bounds(&self, node: NodeHandle) -> PartialBounds {
        self.graph[node.0].bounds
    }

    pub fn set_bounds(&mut self, node: NodeHandle, bounds: PartialBounds) {
        self.graph[node.0].bounds = bounds;
    }

    /// Position if realized, else `None`.
    pub fn position(&self, node: NodeHandle) -> Option<Point> {
        self.bounds(node).position()
    }

    /// Size if realized, otherwise the node's fallback size.
    pub fn size(&self, node: NodeHandle) -> Dimensions {
        let data = &self.graph[node.0];
        data.bounds.dimensions().unwrap_or(data.fallback)
    }

    pub fn fixed_box(&self, node: NodeHandle) -> Option<BoundingBox> {
        self.bounds(node).complete()
    }

    pub fn successors(&self, node: NodeHandle) -> Vec<NodeHandle> {
        self.neighbours(node, Direction::Outgoing)
    }

    pub fn predecessors(&self, node: NodeHandle) -> Vec<NodeHandle> {
        self.neighbours(node, Direction::Incoming)
    }

    fn neighbours(&self, node: NodeHandle, direction: Direction) -> Vec<NodeHandle> {
        let mut result: Vec<NodeHandle> = self
            .graph
            .neighbors_directed(node.0, direction)
            .map(NodeHandle)
            .collect();
        result.sort();
        result.dedup();
        result
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.graph.node_indices().map(NodeHandle)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> NodeData {
        NodeData {
            glyph_id: id.to_string(),
            bounds: PartialBounds::unset(),
            fallback: Dimensions::new(10.0, 10.0),
        }
    }

    #[test]
    fn create_node_is_idempotent_per_glyph() {
        let mut graph = LayoutGraph::new();
        let a = graph.create_node(node("a"));
        let again = graph.create_node(node("a"));
        assert_eq!(a, again);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn hierarchy_queries() {
        let mut graph = LayoutGraph::new();
        let outer = graph.create_node(node("outer"));
        let inner = graph.create_node(node("inner"));
        let leaf = graph.create_node(node("leaf"));
        graph.set_parent(inner, outer);
        graph.set_parent(leaf, inner);
        assert_eq!(graph.depth(leaf), 2);
        assert!(graph.is_ancestor(outer, leaf));
        assert!(!graph.is_ancestor(leaf, outer));
        assert_eq!(graph.children(outer), vec![inner]);
    }

    #[test]
    fn directed_neighbours() {
        let mut graph = LayoutGraph::new();
        let a = graph.create_node(node("a"));
        let b = graph.create_node(node("b"));
        graph.create_edge(a, b);
        assert_eq!(graph.successors(a), vec![b]);
        assert_eq!(graph.predecessors(b), vec![a]);
        assert!(graph.successors(b).is_empty());
        assert_eq!(graph.size(a), Dimensions::new(10.0, 10.0));
    }
}
