//! SBGN-ML input: glyphs and arcs whose geometry may be missing.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use roxmltree::{Document, Node};
use tracing::debug;

use crate::completion::LayoutCompletion;
use crate::model::{Glyph, GlyphKind, PartialBounds, Role, SpeciesReferenceGlyph};

#[derive(Debug, Clone)]
pub struct ParsedArc {
    pub arc: SpeciesReferenceGlyph,
    /// Both `start` and `end` coordinates were present in the file.
    pub has_geometry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SbgnModel {
    pub glyphs: Vec<Glyph>,
    pub arcs: Vec<ParsedArc>,
}

impl SbgnModel {
    /// Hand every glyph and arc to a layout run.
    pub fn register(self, run: &mut LayoutCompletion) -> crate::error::Result<()> {
        for glyph in self.glyphs {
            run.add_glyph(glyph)?;
        }
        for parsed in self.arcs {
            if parsed.has_geometry {
                run.add_layouted_edge(parsed.arc)?;
            } else {
                run.add_unlayouted_edge(parsed.arc)?;
            }
        }
        Ok(())
    }
}

pub fn parse_sbgnml(doc: &Document) -> Result<SbgnModel> {
    let map_node = doc
        .descendants()
        .find(|node| node.has_tag_name("map"))
        .ok_or_else(|| anyhow!("SBGN file missing map element"))?;

    let mut model = SbgnModel::default();
    let mut port_owner: HashMap<String, String> = HashMap::new();
    for glyph_node in map_node.children().filter(|node| node.has_tag_name("glyph")) {
        let Some(glyph) = parse_glyph_node(&glyph_node)? else {
            continue;
        };
        for port in glyph_node.children().filter(|node| node.has_tag_name("port")) {
            if let Some(port_id) = port.attribute("id") {
                port_owner.insert(port_id.to_string(), glyph.id.clone());
            }
        }
        let nested = glyph_node
            .children()
            .filter(|node| node.has_tag_name("glyph"))
            .count();
        if nested > 0 {
            debug!(glyph = %glyph.id, nested, "nested glyphs are drawn with their parent only");
        }
        model.glyphs.push(glyph);
    }

    let kinds: HashMap<&str, &GlyphKind> = model
        .glyphs
        .iter()
        .map(|glyph| (glyph.id.as_str(), &glyph.kind))
        .collect();
    let owner = |endpoint: &str| -> String {
        port_owner
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| endpoint.to_string())
    };
    let is_reaction = |id: &str| kinds.get(id).is_some_and(|kind| **kind == GlyphKind::Reaction);

    let mut arcs = Vec::new();
    for arc_node in map_node.children().filter(|node| node.has_tag_name("arc")) {
        let id = arc_node.attribute("id").unwrap_or_default().to_string();
        let class_name = arc_node.attribute("class").unwrap_or_default();
        let Some(role) = role_for_arc_class(class_name) else {
            debug!(arc = %id, class = class_name, "arc class does not attach to a process");
            continue;
        };
        let source = owner(
            arc_node
                .attribute("source")
                .ok_or_else(|| anyhow!("Arc {id} missing source"))?,
        );
        let target = owner(
            arc_node
                .attribute("target")
                .ok_or_else(|| anyhow!("Arc {id} missing target"))?,
        );
        let (reaction_id, species_id) = if is_reaction(&target) && !is_reaction(&source) {
            (target, source)
        } else if is_reaction(&source) && !is_reaction(&target) {
            (source, target)
        } else {
            debug!(arc = %id, "arc has no single process endpoint");
            continue;
        };

        let has_geometry = ["start", "end"].iter().all(|tag| {
            arc_node
                .children()
                .find(|node| node.has_tag_name(*tag))
                .is_some_and(|node| {
                    parse_f64(node.attribute("x")).is_some() && parse_f64(node.attribute("y")).is_some()
                })
        });

        let mut arc = SpeciesReferenceGlyph::new(id, reaction_id, species_id, role);
        arc.class_name = class_name.to_string();
        arcs.push(ParsedArc { arc, has_geometry });
    }
    model.arcs = arcs;
    Ok(model)
}

fn parse_glyph_node(glyph: &Node) -> Result<Option<Glyph>> {
    let id = glyph
        .attribute("id")
        .ok_or_else(|| anyhow!("Glyph missing id"))?
        .to_string();
    let class_name = glyph.attribute("class").unwrap_or_default();
    let kind = match glyph_kind_for_class(class_name, glyph) {
        Some(kind) => kind,
        None => {
            debug!(glyph = %id, class = class_name, "skipping auxiliary glyph");
            return Ok(None);
        }
    };

    let label = glyph
        .children()
        .find(|node| node.has_tag_name("label"))
        .and_then(|node| node.attribute("text"))
        .unwrap_or("")
        .replace('\r', "");
    let bounds = glyph
        .children()
        .find(|node| node.has_tag_name("bbox"))
        .map(|node| parse_bounds(&node))
        .unwrap_or_default();

    let mut parsed = Glyph::new(id, kind, class_name).with_label(label).with_bounds(bounds);
    parsed.compartment_ref = glyph.attribute("compartmentRef").map(str::to_string);
    Ok(Some(parsed))
}

fn glyph_kind_for_class(class_name: &str, glyph: &Node) -> Option<GlyphKind> {
    match class_name {
        "compartment" => Some(GlyphKind::Compartment),
        "process" | "omitted process" | "uncertain process" | "association" | "dissociation" => {
            Some(GlyphKind::Reaction)
        }
        "annotation" => {
            let target = glyph
                .children()
                .find(|node| node.has_tag_name("callout"))
                .and_then(|node| node.attribute("target"))
                .map(str::to_string);
            Some(GlyphKind::Text { target })
        }
        "unit of information" | "state variable" | "cardinality" | "terminal" | "" => None,
        _ => Some(GlyphKind::Species),
    }
}

pub fn role_for_arc_class(class_name: &str) -> Option<Role> {
    match class_name {
        "consumption" => Some(Role::Substrate),
        "production" => Some(Role::Product),
        "catalysis" | "modulation" => Some(Role::Modifier),
        "stimulation" | "necessary stimulation" => Some(Role::Activator),
        "inhibition" | "absolute inhibition" => Some(Role::Inhibitor),
        _ => None,
    }
}

/// Each bbox attribute is read on its own; missing or malformed ones stay unset.
fn parse_bounds(node: &Node) -> PartialBounds {
    PartialBounds {
        x: parse_f64(node.attribute("x")),
        y: parse_f64(node.attribute("y")),
        width: parse_f64(node.attribute("w")),
        height: parse_f64(node.attribute("h")),
    }
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}
