//! Layout completion: registration of glyphs and arcs, then one resolving pass.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::autolayout::{AutoLayout, LayeredLayout};
use crate::config::CompletionConfig;
use crate::docking::docking_point_for;
use crate::error::{LayoutError, Result};
use crate::graph::{LayoutGraph, NodeData, NodeHandle};
use crate::hierarchy::{HierarchyResolver, ParentIntent};
use crate::model::{
    BoundingBox, Curve, CurveDirection, Glyph, GlyphKind, PartialBounds, Role,
    SpeciesReferenceGlyph, ORIENTATION_ANNOTATION,
};
use crate::orientation::resolve_orientation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Resolving,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Collecting => "collecting",
            Phase::Resolving => "resolving",
            Phase::Done => "done",
        }
    }
}

/// Registries of one layout run.
#[derive(Debug, Default)]
pub struct LayoutState {
    glyphs: Vec<Glyph>,
    glyph_index: HashMap<String, usize>,
    layouted: BTreeSet<String>,
    unlayouted: BTreeSet<String>,
    layouted_edges: Vec<SpeciesReferenceGlyph>,
    unlayouted_edges: Vec<SpeciesReferenceGlyph>,
    graph: LayoutGraph,
    hierarchy: HierarchyResolver,
}

impl LayoutState {
    pub fn glyph(&self, id: &str) -> Option<&Glyph> {
        self.glyph_index.get(id).map(|&i| &self.glyphs[i])
    }

    pub fn graph(&self) -> &LayoutGraph {
        &self.graph
    }

    pub fn hierarchy(&self) -> &HierarchyResolver {
        &self.hierarchy
    }

    pub fn layouted(&self) -> &BTreeSet<String> {
        &self.layouted
    }

    pub fn unlayouted(&self) -> &BTreeSet<String> {
        &self.unlayouted
    }

    pub fn edge_count(&self) -> usize {
        self.layouted_edges.len() + self.unlayouted_edges.len()
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct CompletedLayout {
    /// Every registered glyph with its final geometry, in registration order.
    pub glyphs: Vec<Glyph>,
    /// Arcs that survived reference checking, with docking resolved.
    pub arcs: Vec<SpeciesReferenceGlyph>,
    /// Ids of glyphs that arrived without full geometry and now have it.
    pub completed: BTreeSet<String>,
    /// Arcs dropped because an endpoint was never registered.
    pub dropped_arcs: Vec<LayoutError>,
    /// Containment intents whose compartment never appeared.
    pub orphaned: Vec<ParentIntent>,
}

impl CompletedLayout {
    pub fn glyph(&self, id: &str) -> Option<&Glyph> {
        self.glyphs.iter().find(|glyph| glyph.id == id)
    }

    pub fn completed_glyphs(&self) -> impl Iterator<Item = &Glyph> + '_ {
        self.glyphs
            .iter()
            .filter(|glyph| self.completed.contains(&glyph.id))
    }

    pub fn arcs_of<'a>(
        &'a self,
        reaction_id: &'a str,
    ) -> impl Iterator<Item = &'a SpeciesReferenceGlyph> + 'a {
        self.arcs
            .iter()
            .filter(move |arc| arc.reaction_id == reaction_id)
    }

    /// Curve of `arc` in absolute coordinates, if both ends have geometry.
    pub fn curve_for(&self, arc: &SpeciesReferenceGlyph) -> Option<Curve> {
        let reaction = self.glyph(&arc.reaction_id)?.bbox()?;
        let species = self.glyph(&arc.species_id)?.bbox()?;
        Some(arc.curve(&reaction, &species))
    }
}

/// Drives one layout run: `Collecting` -> `Resolving` -> `Done`.
pub struct LayoutCompletion {
    config: CompletionConfig,
    auto_layout: Box<dyn AutoLayout>,
    state: LayoutState,
    phase: Phase,
}

impl LayoutCompletion {
    pub fn new(config: CompletionConfig) -> Self {
        let auto_layout = Box::new(LayeredLayout::new(&config));
        Self::with_auto_layout(config, auto_layout)
    }

    pub fn with_auto_layout(config: CompletionConfig, auto_layout: Box<dyn AutoLayout>) -> Self {
        Self {
            config,
            auto_layout,
            state: LayoutState::default(),
            phase: Phase::Collecting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    fn ensure_collecting(&self, operation: &'static str) -> Result<()> {
        if self.phase == Phase::Collecting {
            Ok(())
        } else {
            Err(LayoutError::InvalidState {
                operation,
                phase: self.phase.as_str(),
            })
        }
    }

    /// Register a glyph whose geometry is known.
    ///
    /// A glyph with incomplete bounds is filed as unlayouted instead.
    pub fn add_layouted_glyph(&mut self, glyph: Glyph) -> Result<()> {
        self.ensure_collecting("register a glyph")?;
        if !glyph.bounds.is_complete() {
            debug!(glyph = %glyph.id, "incomplete bounds; registering as unlayouted");
            return self.register(glyph, false);
        }
        self.register(glyph, true)
    }

    /// Register a glyph whose geometry is missing or partial.
    ///
    /// A glyph with complete bounds is filed as layouted instead.
    pub fn add_unlayouted_glyph(&mut self, glyph: Glyph) -> Result<()> {
        self.ensure_collecting("register a glyph")?;
        if glyph.bounds.is_complete() {
            debug!(glyph = %glyph.id, "complete bounds; registering as layouted");
            return self.register(glyph, true);
        }
        self.register(glyph, false)
    }

    /// Register a glyph, choosing the set from its bounds.
    pub fn add_glyph(&mut self, glyph: Glyph) -> Result<()> {
        if glyph.bounds.is_complete() {
            self.add_layouted_glyph(glyph)
        } else {
            self.add_unlayouted_glyph(glyph)
        }
    }

    pub fn add_layouted_edge(&mut self, arc: SpeciesReferenceGlyph) -> Result<()> {
        self.ensure_collecting("register an arc")?;
        self.state.layouted_edges.push(arc);
        Ok(())
    }

    pub fn add_unlayouted_edge(&mut self, arc: SpeciesReferenceGlyph) -> Result<()> {
        self.ensure_collecting("register an arc")?;
        self.state.unlayouted_edges.push(arc);
        Ok(())
    }

    fn register(&mut self, mut glyph: Glyph, layouted: bool) -> Result<()> {
        if self.state.glyph_index.contains_key(&glyph.id) {
            return Err(LayoutError::DuplicateGlyph { id: glyph.id });
        }
        let reaction_size = self.config.reaction_dimensions();
        if glyph.is_reaction() {
            glyph.bounds.fill_dimensions(reaction_size);
        }

        let state = &mut self.state;
        let node = state.graph.create_node(NodeData {
            glyph_id: glyph.id.clone(),
            bounds: glyph.bounds,
            fallback: glyph.fallback_dimensions(reaction_size),
        });
        if glyph.is_compartment() {
            state
                .hierarchy
                .register_compartment(&mut state.graph, &glyph.id, node);
        }
        state
            .hierarchy
            .assign_parent(&mut state.graph, &glyph.id, glyph.compartment_ref.as_deref());

        if layouted {
            state.layouted.insert(glyph.id.clone());
        } else {
            state.unlayouted.insert(glyph.id.clone());
        }
        state.glyph_index.insert(glyph.id.clone(), state.glyphs.len());
        state.glyphs.push(glyph);
        Ok(())
    }

    /// Resolve every missing piece of geometry.
    ///
    /// May be called once; a second call, or any registration afterwards,
    /// fails with [`LayoutError::InvalidState`].
    pub fn complete(&mut self) -> Result<CompletedLayout> {
        self.ensure_collecting("complete the layout")?;
        self.phase = Phase::Resolving;
        let result = self.resolve();
        self.phase = Phase::Done;
        result
    }

    fn resolve(&mut self) -> Result<CompletedLayout> {
        let orphaned = self.state.hierarchy.resolve(&mut self.state.graph);
        let (mut arcs, dropped_arcs) = self.materialize_arcs();
        self.place_free_glyphs()?;
        self.place_text_glyphs();
        self.resolve_reactions(&mut arcs);

        let state = &mut self.state;
        for glyph in &mut state.glyphs {
            glyph.parent = state.hierarchy.parent_of(&glyph.id).map(str::to_string);
            if glyph.is_compartment() {
                glyph.children = state.hierarchy.children_of(&glyph.id).to_vec();
            }
        }

        let completed: BTreeSet<String> = state
            .glyphs
            .iter()
            .filter(|glyph| state.unlayouted.contains(&glyph.id) && glyph.bounds.is_complete())
            .map(|glyph| glyph.id.clone())
            .collect();
        info!(
            glyphs = state.glyphs.len(),
            completed = completed.len(),
            arcs = arcs.len(),
            dropped = dropped_arcs.len(),
            "layout completion finished"
        );

        Ok(CompletedLayout {
            glyphs: std::mem::take(&mut state.glyphs),
            arcs,
            completed,
            dropped_arcs,
            orphaned,
        })
    }

    /// Create the graph edges deferred during collection.
    fn materialize_arcs(&mut self) -> (Vec<SpeciesReferenceGlyph>, Vec<LayoutError>) {
        let state = &mut self.state;
        let edges: Vec<SpeciesReferenceGlyph> = std::mem::take(&mut state.layouted_edges)
            .into_iter()
            .chain(std::mem::take(&mut state.unlayouted_edges))
            .collect();

        let mut arcs = Vec::with_capacity(edges.len());
        let mut dropped = Vec::new();
        for arc in edges {
            let reaction = state.graph.node_for(&arc.reaction_id);
            let species = state.graph.node_for(&arc.species_id);
            let (reaction, species) = match (reaction, species) {
                (Some(reaction), Some(species)) => (reaction, species),
                (None, _) => {
                    dropped.push(missing(&arc, &arc.reaction_id));
                    continue;
                }
                (_, None) => {
                    dropped.push(missing(&arc, &arc.species_id));
                    continue;
                }
            };
            let is_reaction = state
                .glyph_index
                .get(&arc.reaction_id)
                .is_some_and(|&i| state.glyphs[i].is_reaction());
            if !is_reaction {
                warn!(arc = %arc.id, glyph = %arc.reaction_id, "arc does not start at a reaction glyph");
                dropped.push(LayoutError::MissingReference {
                    arc_id: arc.id.clone(),
                    glyph_id: arc.reaction_id.clone(),
                });
                continue;
            }
            match arc.direction() {
                CurveDirection::ReactionToSpecies => state.graph.create_edge(reaction, species),
                CurveDirection::SpeciesToReaction => state.graph.create_edge(species, reaction),
            }
            arcs.push(arc);
        }
        (arcs, dropped)
    }

    /// Text glyphs that will be centred on a target instead of auto-laid out.
    ///
    /// A text glyph qualifies when its target is registered and it does not
    /// sit on a cycle of text targets; self-targets and cycle members are
    /// left to auto-layout.
    fn anchored_text(&self) -> HashSet<usize> {
        let state = &self.state;
        let unplaced_target = move |index: usize| match &state.glyphs[index].kind {
            GlyphKind::Text { target: Some(target) } if !state.glyphs[index].bounds.is_complete() => {
                Some(target.as_str())
            }
            _ => None,
        };

        let mut anchored = HashSet::new();
        for start in 0..state.glyphs.len() {
            let Some(target) = unplaced_target(start) else {
                continue;
            };
            let Some(&first) = state.glyph_index.get(target) else {
                continue;
            };
            let mut seen = HashSet::from([first]);
            let mut current = first;
            let on_cycle = loop {
                if current == start {
                    break true;
                }
                let Some(next) = unplaced_target(current).and_then(|t| state.glyph_index.get(t)) else {
                    break false;
                };
                if !seen.insert(*next) {
                    break *next == start;
                }
                current = *next;
            };
            if !on_cycle {
                anchored.insert(start);
            }
        }
        anchored
    }

    /// Hand every glyph lacking geometry to the auto-layout routine.
    fn place_free_glyphs(&mut self) -> Result<()> {
        let anchored = self.anchored_text();
        let free: Vec<(usize, NodeHandle)> = self
            .state
            .glyphs
            .iter()
            .enumerate()
            .filter(|(i, glyph)| !glyph.bounds.is_complete() && !anchored.contains(i))
            .filter_map(|(i, glyph)| self.state.graph.node_for(&glyph.id).map(|node| (i, node)))
            .collect();
        if free.is_empty() {
            return Ok(());
        }

        let subset: Vec<NodeHandle> = free.iter().map(|(_, node)| *node).collect();
        let hints = self
            .state
            .hierarchy
            .grouping_hints(&self.state.graph, &subset);
        debug!(
            free = subset.len(),
            groups = hints.groups.len(),
            "running auto-layout"
        );
        let boxes = self
            .auto_layout
            .layout_subset(&self.state.graph, &subset, &hints)?;

        for (index, node) in free {
            let glyph = &mut self.state.glyphs[index];
            let Some(bbox) = boxes.get(&node) else {
                return Err(LayoutError::IncompleteAutoLayout {
                    id: glyph.id.clone(),
                });
            };
            glyph.bounds = PartialBounds::from(glyph.bounds.merged_with(*bbox));
            self.state.graph.set_bounds(node, glyph.bounds);
        }
        Ok(())
    }

    /// Centre text glyphs on the glyph they annotate.
    ///
    /// Repeats until no text moves, so chains of annotations settle in
    /// dependency order whatever their registration order.
    fn place_text_glyphs(&mut self) {
        let reaction_size = self.config.reaction_dimensions();
        let state = &mut self.state;
        loop {
            let mut placed = 0;
            for index in 0..state.glyphs.len() {
                let glyph = &state.glyphs[index];
                if glyph.bounds.is_complete() {
                    continue;
                }
                let GlyphKind::Text { target: Some(target) } = &glyph.kind else {
                    continue;
                };
                let Some(target_box) = state
                    .glyph_index
                    .get(target)
                    .and_then(|&i| state.glyphs[i].bbox())
                else {
                    continue;
                };
                let dims = glyph
                    .bounds
                    .dimensions()
                    .unwrap_or_else(|| glyph.fallback_dimensions(reaction_size));
                let centred = BoundingBox::centered_at(target_box.center(), dims);
                let glyph = &mut state.glyphs[index];
                glyph.bounds = PartialBounds::from(glyph.bounds.merged_with(centred));
                if let Some(node) = state.graph.node_for(&glyph.id) {
                    state.graph.set_bounds(node, glyph.bounds);
                }
                placed += 1;
            }
            if placed == 0 {
                break;
            }
        }
        for glyph in state.glyphs.iter().filter(|glyph| !glyph.bounds.is_complete()) {
            warn!(glyph = %glyph.id, "glyph still has no geometry");
        }
    }

    /// Orientation and docking for every reaction glyph.
    fn resolve_reactions(&mut self, arcs: &mut [SpeciesReferenceGlyph]) {
        let state = &mut self.state;
        let epsilon = self.config.orientation_epsilon;
        for index in 0..state.glyphs.len() {
            let glyph = &state.glyphs[index];
            if !glyph.is_reaction() {
                continue;
            }
            let Some(bbox) = glyph.bbox() else {
                warn!(glyph = %glyph.id, "reaction glyph still has no geometry");
                continue;
            };
            let reaction_id = glyph.id.clone();
            let neighbours: Vec<(Role, BoundingBox)> = arcs
                .iter()
                .filter(|arc| arc.reaction_id == reaction_id)
                .filter_map(|arc| {
                    let species = state.glyph_index.get(&arc.species_id)?;
                    Some((arc.role, state.glyphs[*species].bbox()?))
                })
                .collect();

            let decision = resolve_orientation(bbox, &neighbours, epsilon);
            debug!(
                glyph = %reaction_id,
                orientation = decision.orientation.as_str(),
                voters = decision.votes.voters,
                "resolved reaction orientation"
            );
            let glyph = &mut state.glyphs[index];
            if decision.bounds != bbox {
                glyph.bounds = PartialBounds::from(decision.bounds);
                if let Some(node) = state.graph.node_for(&reaction_id) {
                    state.graph.set_bounds(node, glyph.bounds);
                }
            }
            glyph.annotations.insert(
                ORIENTATION_ANNOTATION.to_string(),
                decision.orientation.as_str().to_string(),
            );

            for arc in arcs.iter_mut().filter(|arc| arc.reaction_id == reaction_id) {
                arc.docking = Some(docking_point_for(arc, &decision.bounds, &decision.sides));
            }
        }
    }
}

fn missing(arc: &SpeciesReferenceGlyph, glyph_id: &str) -> LayoutError {
    warn!(arc = %arc.id, glyph = glyph_id, "arc references an unregistered glyph; dropping it");
    LayoutError::MissingReference {
        arc_id: arc.id.clone(),
        glyph_id: glyph_id.to_string(),
    }
}
