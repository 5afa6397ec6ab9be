//! Compartment containment.
//!
//! Membership comes from the model (`compartmentRef`), never from geometric
//! overlap. Intents are recorded as glyphs arrive and resolved once the
//! compartment is known, so registration order does not matter.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::autolayout::{Group, GroupingHints};
use crate::graph::{LayoutGraph, NodeHandle};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentIntent {
    pub glyph_id: String,
    pub compartment_id: String,
}

#[derive(Debug, Default)]
pub struct HierarchyResolver {
    compartments: HashMap<String, NodeHandle>,
    pending: Vec<ParentIntent>,
    parent_of: HashMap<String, String>,
    children: BTreeMap<String, Vec<String>>,
}

impl HierarchyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `glyph_id` belongs to `compartment_ref`.
    ///
    /// Applied at once when the compartment is registered, deferred otherwise.
    pub fn assign_parent(
        &mut self,
        graph: &mut LayoutGraph,
        glyph_id: &str,
        compartment_ref: Option<&str>,
    ) {
        let Some(compartment_id) = compartment_ref else {
            return;
        };
        let intent = ParentIntent {
            glyph_id: glyph_id.to_string(),
            compartment_id: compartment_id.to_string(),
        };
        if self.compartments.contains_key(compartment_id) {
            self.apply(graph, &intent);
        } else {
            debug!(glyph = glyph_id, compartment = compartment_id, "deferring parent assignment");
            self.pending.push(intent);
        }
    }

    /// Make a compartment known and settle the intents waiting for it.
    pub fn register_compartment(
        &mut self,
        graph: &mut LayoutGraph,
        compartment_id: &str,
        handle: NodeHandle,
    ) {
        self.compartments.insert(compartment_id.to_string(), handle);
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|intent| intent.compartment_id == compartment_id);
        self.pending = waiting;
        for intent in &ready {
            self.apply(graph, intent);
        }
    }

    /// Second pass over whatever is still pending after registration.
    ///
    /// Returns the intents whose compartment never appeared.
    pub fn resolve(&mut self, graph: &mut LayoutGraph) -> Vec<ParentIntent> {
        let mut unresolved = Vec::new();
        for intent in std::mem::take(&mut self.pending) {
            if self.compartments.contains_key(&intent.compartment_id) {
                self.apply(graph, &intent);
            } else {
                warn!(
                    glyph = %intent.glyph_id,
                    compartment = %intent.compartment_id,
                    "compartment was never registered; glyph stays top-level"
                );
                unresolved.push(intent);
            }
        }
        unresolved
    }

    fn apply(&mut self, graph: &mut LayoutGraph, intent: &ParentIntent) -> bool {
        let Some(&parent) = self.compartments.get(&intent.compartment_id) else {
            return false;
        };
        let Some(node) = graph.node_for(&intent.glyph_id) else {
            warn!(glyph = %intent.glyph_id, "parent intent for a glyph with no graph node");
            return false;
        };
        if graph.is_ancestor(node, parent) {
            warn!(
                glyph = %intent.glyph_id,
                compartment = %intent.compartment_id,
                "refusing containment cycle"
            );
            return false;
        }
        graph.set_parent(node, parent);
        self.parent_of
            .insert(intent.glyph_id.clone(), intent.compartment_id.clone());
        let children = self.children.entry(intent.compartment_id.clone()).or_default();
        if !children.contains(&intent.glyph_id) {
            children.push(intent.glyph_id.clone());
        }
        true
    }

    pub fn parent_of(&self, glyph_id: &str) -> Option<&str> {
        self.parent_of.get(glyph_id).map(String::as_str)
    }

    pub fn children_of(&self, compartment_id: &str) -> &[String] {
        self.children
            .get(compartment_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pending(&self) -> &[ParentIntent] {
        &self.pending
    }

    /// Groups of nodes per compartment, innermost compartments first.
    ///
    /// Only groups that hold a node of `subset` (or whose compartment is in
    /// it) are emitted; the top-level group always comes last.
    pub fn grouping_hints(&self, graph: &LayoutGraph, subset: &[NodeHandle]) -> GroupingHints {
        let free: HashSet<NodeHandle> = subset.iter().copied().collect();
        let mut by_parent: BTreeMap<Option<NodeHandle>, Vec<NodeHandle>> = BTreeMap::new();
        for node in graph.nodes() {
            by_parent.entry(graph.parent(node)).or_default().push(node);
        }

        let mut groups: Vec<Group> = by_parent
            .into_iter()
            .filter(|(compartment, members)| {
                members.iter().any(|m| free.contains(m))
                    || compartment.is_some_and(|c| free.contains(&c))
            })
            .map(|(compartment, mut members)| {
                members.sort();
                Group {
                    compartment,
                    members,
                }
            })
            .collect();
        // deepest first; top-level (None) sorts as depth 0 and last
        groups.sort_by_key(|group| {
            let depth = group
                .compartment
                .map(|c| graph.depth(c) + 1)
                .unwrap_or(0);
            (std::cmp::Reverse(depth), group.compartment)
        });
        GroupingHints { groups }
    }
}
