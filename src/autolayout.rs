//! Placement of glyphs that still lack geometry.
//!
//! The engine only relies on the [`AutoLayout`] contract; [`LayeredLayout`]
//! is the routine bundled with the crate.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::config::CompletionConfig;
use crate::error::Result;
use crate::graph::{LayoutGraph, NodeHandle};
use crate::model::{BoundingBox, Dimensions, Point};

/// Nodes sharing one compartment (or the top level when `compartment` is `None`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub compartment: Option<NodeHandle>,
    pub members: Vec<NodeHandle>,
}

/// Compartment groups, innermost first, top level last.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupingHints {
    pub groups: Vec<Group>,
}

pub trait AutoLayout {
    /// Return a box for every node of `subset`.
    ///
    /// Nodes outside `subset` are fixed and must not be moved.
    fn layout_subset(
        &mut self,
        graph: &LayoutGraph,
        subset: &[NodeHandle],
        hints: &GroupingHints,
    ) -> Result<BTreeMap<NodeHandle, BoundingBox>>;
}

/// Layered placement per compartment group.
///
/// Within a group, free nodes are ranked by longest path along the arcs,
/// ordered by barycenter and laid out in columns. Free nodes that already
/// know their position stay where they are.
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    layer_gap: f64,
    node_gap: f64,
    group_gap: f64,
    padding: f64,
}

impl LayeredLayout {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            layer_gap: config.layer_gap,
            node_gap: config.node_gap,
            group_gap: config.group_gap,
            padding: config.compartment_padding,
        }
    }
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self::new(&CompletionConfig::default())
    }
}

impl AutoLayout for LayeredLayout {
    fn layout_subset(
        &mut self,
        graph: &LayoutGraph,
        subset: &[NodeHandle],
        hints: &GroupingHints,
    ) -> Result<BTreeMap<NodeHandle, BoundingBox>> {
        let free: HashSet<NodeHandle> = subset.iter().copied().collect();
        let mut placed: BTreeMap<NodeHandle, BoundingBox> = BTreeMap::new();
        // descendants that travel with a free compartment when it moves
        let mut carried: HashMap<NodeHandle, Vec<NodeHandle>> = HashMap::new();
        // free compartments wrapped around fixed content; they cannot move
        let mut anchored: HashSet<NodeHandle> = HashSet::new();

        for node in subset {
            if let Some(position) = graph.position(*node) {
                placed.insert(*node, BoundingBox::from_parts(position, graph.size(*node)));
            }
        }

        for group in &hints.groups {
            let movable: Vec<NodeHandle> = group
                .members
                .iter()
                .copied()
                .filter(|m| {
                    free.contains(m) && graph.position(*m).is_none() && !anchored.contains(m)
                })
                .collect();
            let anchors = group
                .members
                .iter()
                .filter(|m| !movable.contains(m))
                .filter_map(|m| placed.get(m).copied().or_else(|| graph.fixed_box(*m)))
                .reduce(|a, b| a.union(&b));

            let origin = match (anchors, group.compartment) {
                (Some(extent), _) => Point::new(extent.max_x() + self.group_gap, extent.y),
                (None, Some(compartment)) => match placed
                    .get(&compartment)
                    .copied()
                    .or_else(|| graph.fixed_box(compartment))
                {
                    Some(bbox) => Point::new(bbox.x + self.padding, bbox.y + self.padding),
                    None => graph
                        .position(compartment)
                        .map(|p| Point::new(p.x + self.padding, p.y + self.padding))
                        .unwrap_or(Point::new(0.0, 0.0)),
                },
                (None, None) => Point::new(0.0, 0.0),
            };

            for (node, relative) in self.arrange(graph, &movable, &placed) {
                let target = relative.translated(origin.x, origin.y);
                if let Some(previous) = placed.get(&node).copied() {
                    let (dx, dy) = (target.x - previous.x, target.y - previous.y);
                    for descendant in carried.get(&node).cloned().unwrap_or_default() {
                        if let Some(bbox) = placed.get_mut(&descendant) {
                            *bbox = bbox.translated(dx, dy);
                        }
                    }
                }
                placed.insert(node, target);
            }

            let Some(compartment) = group.compartment else {
                continue;
            };
            if !free.contains(&compartment) {
                continue;
            }
            let extent = group
                .members
                .iter()
                .filter_map(|m| placed.get(m).copied().or_else(|| graph.fixed_box(*m)))
                .reduce(|a, b| a.union(&b));
            let bbox = match (graph.position(compartment), extent) {
                (Some(position), Some(extent)) => {
                    let far = extent.inflated(self.padding);
                    BoundingBox::new(
                        position.x,
                        position.y,
                        (far.max_x() - position.x).max(graph.size(compartment).width),
                        (far.max_y() - position.y).max(graph.size(compartment).height),
                    )
                }
                (None, Some(extent)) => extent.inflated(self.padding),
                (Some(position), None) => {
                    BoundingBox::from_parts(position, graph.size(compartment))
                }
                (None, None) => BoundingBox::from_parts(origin, graph.size(compartment)),
            };
            placed.insert(compartment, bbox);
            if group
                .members
                .iter()
                .any(|m| !free.contains(m) || anchored.contains(m))
            {
                anchored.insert(compartment);
            }

            let mut travelling: Vec<NodeHandle> = Vec::new();
            for member in &group.members {
                if free.contains(member) {
                    travelling.push(*member);
                    travelling.extend(carried.get(member).cloned().unwrap_or_default());
                }
            }
            carried.insert(compartment, travelling);
        }

        // nodes the hints did not mention go in one row after everything else
        let mut cursor = placed
            .values()
            .copied()
            .reduce(|a, b| a.union(&b))
            .map(|extent| Point::new(extent.x, extent.max_y() + self.group_gap))
            .unwrap_or(Point::new(0.0, 0.0));
        for node in subset {
            if placed.contains_key(node) {
                continue;
            }
            let size = graph.size(*node);
            debug!(glyph = %graph.data(*node).glyph_id, "placing node outside any group");
            placed.insert(*node, BoundingBox::from_parts(cursor, size));
            cursor.x += size.width + self.node_gap;
        }

        placed.retain(|node, _| free.contains(node));
        Ok(placed)
    }
}

impl LayeredLayout {
    /// Relative boxes for `nodes`, with the block's top-left at the origin.
    fn arrange(
        &self,
        graph: &LayoutGraph,
        nodes: &[NodeHandle],
        placed: &BTreeMap<NodeHandle, BoundingBox>,
    ) -> Vec<(NodeHandle, BoundingBox)> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let members: HashSet<NodeHandle> = nodes.iter().copied().collect();
        let size_of = |node: NodeHandle| -> Dimensions {
            placed
                .get(&node)
                .map(|b| b.dimensions())
                .unwrap_or_else(|| graph.size(node))
        };

        let ranks = assign_ranks(graph, nodes, &members);
        let layer_count = ranks.values().copied().max().unwrap_or(0) + 1;
        let mut layers: Vec<Vec<NodeHandle>> = vec![Vec::new(); layer_count];
        let mut sorted: Vec<NodeHandle> = nodes.to_vec();
        sorted.sort();
        for node in sorted {
            layers[ranks[&node]].push(node);
        }
        order_layers(graph, &mut layers);

        let column_widths: Vec<f64> = layers
            .iter()
            .map(|layer| {
                layer
                    .iter()
                    .map(|n| size_of(*n).width)
                    .fold(0.0, f64::max)
            })
            .collect();
        let column_heights: Vec<f64> = layers
            .iter()
            .map(|layer| {
                let heights: f64 = layer.iter().map(|n| size_of(*n).height).sum();
                heights + self.node_gap * layer.len().saturating_sub(1) as f64
            })
            .collect();
        let tallest = column_heights.iter().copied().fold(0.0, f64::max);

        let mut result = Vec::with_capacity(nodes.len());
        let mut column_x = 0.0;
        for (index, layer) in layers.iter().enumerate() {
            let width = column_widths[index];
            let mut y = (tallest - column_heights[index]) / 2.0;
            for node in layer {
                let size = size_of(*node);
                let x = column_x + (width - size.width) / 2.0;
                result.push((*node, BoundingBox::new(x, y, size.width, size.height)));
                y += size.height + self.node_gap;
            }
            column_x += width + self.layer_gap;
        }
        result
    }
}

/// Longest-path ranks restricted to `members`; cycles stop after one sweep per node.
fn assign_ranks(
    graph: &LayoutGraph,
    nodes: &[NodeHandle],
    members: &HashSet<NodeHandle>,
) -> HashMap<NodeHandle, usize> {
    let mut ranks: HashMap<NodeHandle, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    let edges: Vec<(NodeHandle, NodeHandle)> = nodes
        .iter()
        .flat_map(|src| {
            graph
                .successors(*src)
                .into_iter()
                .filter(move |tgt| members.contains(tgt) && tgt != src)
                .map(move |tgt| (*src, tgt))
        })
        .collect();

    for _ in 0..nodes.len() {
        let mut changed = false;
        for (src, tgt) in &edges {
            let src_rank = ranks[src];
            let tgt_rank = ranks.entry(*tgt).or_insert(0);
            if *tgt_rank < src_rank + 1 && src_rank + 1 < nodes.len() {
                *tgt_rank = src_rank + 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    ranks
}

/// One downward barycenter sweep over predecessor positions.
fn order_layers(graph: &LayoutGraph, layers: &mut [Vec<NodeHandle>]) {
    for index in 1..layers.len() {
        let previous: HashMap<NodeHandle, f64> = layers[..index]
            .iter()
            .flat_map(|layer| layer.iter().enumerate().map(|(i, n)| (*n, i as f64)))
            .collect();
        let barycenter = |node: &NodeHandle| -> f64 {
            let positions: Vec<f64> = graph
                .predecessors(*node)
                .iter()
                .filter_map(|p| previous.get(p).copied())
                .collect();
            if positions.is_empty() {
                f64::INFINITY
            } else {
                positions.iter().sum::<f64>() / positions.len() as f64
            }
        };
        layers[index].sort_by(|a, b| {
            barycenter(a)
                .partial_cmp(&barycenter(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeData;
    use crate::model::PartialBounds;

    fn add(graph: &mut LayoutGraph, id: &str, bounds: PartialBounds) -> NodeHandle {
        graph.create_node(NodeData {
            glyph_id: id.to_string(),
            bounds,
            fallback: Dimensions::new(40.0, 20.0),
        })
    }

    #[test]
    fn chain_is_laid_out_in_columns() {
        let mut graph = LayoutGraph::new();
        let a = add(&mut graph, "a", PartialBounds::unset());
        let r = add(&mut graph, "r", PartialBounds::unset());
        let b = add(&mut graph, "b", PartialBounds::unset());
        graph.create_edge(a, r);
        graph.create_edge(r, b);
        let hints = GroupingHints {
            groups: vec![Group {
                compartment: None,
                members: vec![a, r, b],
            }],
        };
        let boxes = LayeredLayout::default()
            .layout_subset(&graph, &[a, r, b], &hints)
            .unwrap();
        assert_eq!(boxes.len(), 3);
        assert!(boxes[&a].center().x < boxes[&r].center().x);
        assert!(boxes[&r].center().x < boxes[&b].center().x);
        assert_eq!(boxes[&a].dimensions(), Dimensions::new(40.0, 20.0));
    }

    #[test]
    fn fixed_nodes_are_not_returned_and_free_nodes_avoid_them() {
        let mut graph = LayoutGraph::new();
        let fixed = add(
            &mut graph,
            "fixed",
            BoundingBox::new(0.0, 0.0, 100.0, 50.0).into(),
        );
        let free = add(&mut graph, "free", PartialBounds::unset());
        let hints = GroupingHints {
            groups: vec![Group {
                compartment: None,
                members: vec![fixed, free],
            }],
        };
        let boxes = LayeredLayout::default()
            .layout_subset(&graph, &[free], &hints)
            .unwrap();
        assert!(!boxes.contains_key(&fixed));
        assert!(boxes[&free].x >= 100.0);
    }

    #[test]
    fn known_position_is_kept() {
        let mut graph = LayoutGraph::new();
        let pinned = add(
            &mut graph,
            "pinned",
            PartialBounds::position_only(Point::new(300.0, 40.0)),
        );
        let hints = GroupingHints {
            groups: vec![Group {
                compartment: None,
                members: vec![pinned],
            }],
        };
        let boxes = LayeredLayout::default()
            .layout_subset(&graph, &[pinned], &hints)
            .unwrap();
        assert_eq!(boxes[&pinned], BoundingBox::new(300.0, 40.0, 40.0, 20.0));
    }

    #[test]
    fn free_compartment_encloses_its_members() {
        let mut graph = LayoutGraph::new();
        let cell = add(&mut graph, "cell", PartialBounds::unset());
        let s1 = add(&mut graph, "s1", PartialBounds::unset());
        let s2 = add(&mut graph, "s2", PartialBounds::unset());
        graph.set_parent(s1, cell);
        graph.set_parent(s2, cell);
        let hints = GroupingHints {
            groups: vec![
                Group {
                    compartment: Some(cell),
                    members: vec![s1, s2],
                },
                Group {
                    compartment: None,
                    members: vec![cell],
                },
            ],
        };
        let boxes = LayeredLayout::default()
            .layout_subset(&graph, &[cell, s1, s2], &hints)
            .unwrap();
        let cell_box = boxes[&cell];
        for member in [s1, s2] {
            let bbox = boxes[&member];
            assert!(bbox.x >= cell_box.x && bbox.max_x() <= cell_box.max_x());
            assert!(bbox.y >= cell_box.y && bbox.max_y() <= cell_box.max_y());
        }
    }

    #[test]
    fn compartment_around_fixed_member_stays_put() {
        let mut graph = LayoutGraph::new();
        let landmark = add(
            &mut graph,
            "landmark",
            BoundingBox::new(0.0, 0.0, 100.0, 50.0).into(),
        );
        let cell = add(&mut graph, "cell", PartialBounds::unset());
        let fixed = add(
            &mut graph,
            "fixed",
            BoundingBox::new(300.0, 200.0, 40.0, 20.0).into(),
        );
        graph.set_parent(fixed, cell);
        let hints = GroupingHints {
            groups: vec![
                Group {
                    compartment: Some(cell),
                    members: vec![fixed],
                },
                Group {
                    compartment: None,
                    members: vec![landmark, cell],
                },
            ],
        };
        let boxes = LayeredLayout::default()
            .layout_subset(&graph, &[cell], &hints)
            .unwrap();
        assert_eq!(boxes[&cell], BoundingBox::new(280.0, 180.0, 80.0, 60.0));
    }

    #[test]
    fn cycles_terminate() {
        let mut graph = LayoutGraph::new();
        let a = add(&mut graph, "a", PartialBounds::unset());
        let b = add(&mut graph, "b", PartialBounds::unset());
        graph.create_edge(a, b);
        graph.create_edge(b, a);
        let hints = GroupingHints {
            groups: vec![Group {
                compartment: None,
                members: vec![a, b],
            }],
        };
        let boxes = LayeredLayout::default()
            .layout_subset(&graph, &[a, b], &hints)
            .unwrap();
        assert_eq!(boxes.len(), 2);
    }
}
