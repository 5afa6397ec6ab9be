use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::completion::CompletedLayout;
use crate::model::{CurveDirection, Side};

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub glyphs: Vec<GlyphDump>,
    pub arcs: Vec<ArcDump>,
    pub dropped_arcs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GlyphDump {
    pub id: String,
    pub kind: String,
    pub class: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub parent: Option<String>,
    pub completed: bool,
    pub orientation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArcDump {
    pub id: String,
    pub class: String,
    pub role: String,
    pub reaction: String,
    pub species: String,
    pub reaction_to_species: bool,
    pub dock_side: Option<String>,
    pub dock_offset: Option<[f64; 2]>,
    pub points: Vec<[f64; 2]>,
}

fn side_name(side: Side) -> &'static str {
    match side {
        Side::Left => "left",
        Side::Right => "right",
        Side::Top => "top",
        Side::Bottom => "bottom",
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &CompletedLayout) -> Self {
        let glyphs = layout
            .glyphs
            .iter()
            .filter_map(|glyph| {
                let bbox = glyph.bbox()?;
                Some(GlyphDump {
                    id: glyph.id.clone(),
                    kind: glyph.kind.name().to_string(),
                    class: glyph.class_name.clone(),
                    label: glyph.label.clone(),
                    x: bbox.x,
                    y: bbox.y,
                    width: bbox.width,
                    height: bbox.height,
                    parent: glyph.parent.clone(),
                    completed: layout.completed.contains(&glyph.id),
                    orientation: glyph.is_reaction().then(|| {
                        glyph
                            .orientation()
                            .map(|o| o.as_str().to_string())
                            .unwrap_or_default()
                    }),
                })
            })
            .collect();

        let arcs = layout
            .arcs
            .iter()
            .map(|arc| {
                let points = layout
                    .curve_for(arc)
                    .map(|curve| vec![[curve.start.x, curve.start.y], [curve.end.x, curve.end.y]])
                    .unwrap_or_default();
                ArcDump {
                    id: arc.id.clone(),
                    class: arc.class_name.clone(),
                    role: arc.role.as_str().to_string(),
                    reaction: arc.reaction_id.clone(),
                    species: arc.species_id.clone(),
                    reaction_to_species: arc.direction() == CurveDirection::ReactionToSpecies,
                    dock_side: arc.docking.map(|d| side_name(d.side).to_string()),
                    dock_offset: arc.docking.map(|d| [d.offset.x, d.offset.y]),
                    points,
                }
            })
            .collect();

        LayoutDump {
            glyphs,
            arcs,
            dropped_arcs: layout.dropped_arcs.iter().map(|e| e.to_string()).collect(),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &CompletedLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
