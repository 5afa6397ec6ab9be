//! Cairo/Pango rendering of a laid-out diagram to PNG and SVG.
//!
//! Everything here reads finished geometry; nothing feeds back into layout.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use cairo::{Context as CairoContext, Format, ImageSurface, LineCap, SvgSurface};
use pango::{Alignment, FontDescription};
use pangocairo::functions as pangocairo;
use tracing::debug;

use crate::model::{BoundingBox, CurveDirection, Glyph, GlyphKind, Orientation, Point, SpeciesReferenceGlyph};

pub const DEFAULT_PADDING_PX: f64 = 10.0;
const DEFAULT_LINE_WIDTH: f64 = 1.5;
const FONT_MAIN_PX: f64 = 20.0;
const FONT_SMALL_PX: f64 = 12.0;
const FONT_FAMILY: &str = "Liberation Sans";
const TEXT_OUTLINE_WIDTH: f64 = 0.75;
const ARROW_SIZE: f64 = 8.0;
const ARROW_SCALE: f64 = 1.75;
const BAR_LENGTH: f64 = 12.0;
const BAR_OFFSET: f64 = 14.0;
const CATALYSIS_OVERLAP_RATIO: f64 = 0.5;
const PORT_CONNECTOR_LEN_PX: f64 = 11.0;
const BORDER_COLOR: (f64, f64, f64) = (0x55 as f64 / 255.0, 0x55 as f64 / 255.0, 0x55 as f64 / 255.0);
const DEFAULT_FILL_COLOR: (f64, f64, f64) = (0xF6 as f64 / 255.0, 0xF6 as f64 / 255.0, 0xF6 as f64 / 255.0);
const COMPARTMENT_FILL_COLOR: (f64, f64, f64) = (0xFC as f64 / 255.0, 0xFC as f64 / 255.0, 0xFC as f64 / 255.0);
const ASSOCIATION_FILL_COLOR: (f64, f64, f64) = (0x6B as f64 / 255.0, 0x6B as f64 / 255.0, 0x6B as f64 / 255.0);

/// Outline drawn for a glyph; depends on nothing but its class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Rect,
    RoundRect,
    Ellipse,
    CutRect,
    Barrel,
    Hexagon,
    SourceSink,
    ProcessSquare,
    Association,
    Dissociation,
    LabelOnly,
}

pub fn shape_for_class(class_name: &str) -> Shape {
    let base = class_name.strip_suffix(" multimer").unwrap_or(class_name);
    match base {
        "compartment" => Shape::Barrel,
        "macromolecule" | "nucleic acid feature" => Shape::RoundRect,
        "simple chemical" | "unspecified entity" => Shape::Ellipse,
        "complex" => Shape::CutRect,
        "phenotype" | "perturbing agent" => Shape::Hexagon,
        "source and sink" => Shape::SourceSink,
        "process" | "omitted process" | "uncertain process" => Shape::ProcessSquare,
        "association" => Shape::Association,
        "dissociation" => Shape::Dissociation,
        "text" | "annotation" => Shape::LabelOnly,
        _ => Shape::Rect,
    }
}

#[derive(Clone, Copy, Debug)]
struct PixelRect {
    x0: f64,
    y0: f64,
    width: f64,
    height: f64,
    center: Point,
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

#[derive(Clone, Copy, Debug)]
struct Transform {
    min_x: f64,
    min_y: f64,
    scale_x: f64,
    scale_y: f64,
}

impl Transform {
    fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, width: f64, height: f64) -> Self {
        let span_x = (max_x - min_x).abs().max(1.0);
        let span_y = (max_y - min_y).abs().max(1.0);
        Self {
            min_x,
            min_y,
            scale_x: width / span_x,
            scale_y: height / span_y,
        }
    }

    fn map_point(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.min_x) * self.scale_x,
            (point.y - self.min_y) * self.scale_y,
        )
    }

    fn scale_scalar(&self, value: f64) -> f64 {
        value * self.scale_x.min(self.scale_y)
    }

    fn rect(&self, bbox: &BoundingBox) -> PixelRect {
        let top_left = self.map_point(bbox.position());
        let bottom_right = self.map_point(Point::new(bbox.max_x(), bbox.max_y()));
        let left = top_left.x.min(bottom_right.x);
        let right = top_left.x.max(bottom_right.x);
        let top = top_left.y.min(bottom_right.y);
        let bottom = top_left.y.max(bottom_right.y);
        PixelRect {
            x0: left,
            y0: top,
            width: right - left,
            height: bottom - top,
            center: Point::new((left + right) / 2.0, (top + bottom) / 2.0),
        }
    }
}

/// Polyline of one arc in diagram coordinates, in drawing order.
#[derive(Clone, Debug, PartialEq)]
pub struct ArcPath {
    pub class_name: String,
    pub points: Vec<Point>,
}

/// Where the ray from the centre of `bbox` towards `toward` leaves the box.
pub fn boundary_point(bbox: &BoundingBox, toward: Point) -> Point {
    let center = bbox.center();
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    if dx == 0.0 && dy == 0.0 {
        return center;
    }
    let tx = if dx == 0.0 { f64::INFINITY } else { (bbox.width / 2.0) / dx.abs() };
    let ty = if dy == 0.0 { f64::INFINITY } else { (bbox.height / 2.0) / dy.abs() };
    let t = tx.min(ty);
    Point::new(center.x + dx * t, center.y + dy * t)
}

/// Arc polylines for every arc whose endpoints both have geometry.
///
/// The species end is pulled onto the species outline. The reaction end
/// stays on its docking point, or is clipped the same way when undocked.
pub fn arc_paths(glyphs: &[Glyph], arcs: &[SpeciesReferenceGlyph]) -> Vec<ArcPath> {
    let boxes: HashMap<&str, BoundingBox> = glyphs
        .iter()
        .filter_map(|glyph| Some((glyph.id.as_str(), glyph.bbox()?)))
        .collect();
    arcs.iter()
        .filter_map(|arc| {
            let reaction = boxes.get(arc.reaction_id.as_str())?;
            let species = boxes.get(arc.species_id.as_str())?;
            let curve = arc.curve(reaction, species);
            let mut reaction_end = match curve.direction {
                CurveDirection::ReactionToSpecies => curve.start,
                CurveDirection::SpeciesToReaction => curve.end,
            };
            if arc.docking.is_none() {
                reaction_end = boundary_point(reaction, species.center());
            }
            let species_end = boundary_point(species, reaction_end);
            let points = match curve.direction {
                CurveDirection::ReactionToSpecies => vec![reaction_end, species_end],
                CurveDirection::SpeciesToReaction => vec![species_end, reaction_end],
            };
            Some(ArcPath {
                class_name: arc.class_name.clone(),
                points,
            })
        })
        .collect()
}

/// Order glyphs are painted in: compartments outermost first, then
/// species, reactions and free text.
fn paint_order(glyphs: &[Glyph]) -> Vec<&Glyph> {
    let container: HashMap<&str, &str> = glyphs
        .iter()
        .filter_map(|glyph| {
            let parent = glyph.parent.as_deref().or(glyph.compartment_ref.as_deref())?;
            Some((glyph.id.as_str(), parent))
        })
        .collect();
    let depth = |id: &str| {
        let mut depth = 0;
        let mut current = id;
        while let Some(&parent) = container.get(current) {
            depth += 1;
            current = parent;
            if depth > glyphs.len() {
                break;
            }
        }
        depth
    };
    let layer = |glyph: &Glyph| match glyph.kind {
        GlyphKind::Compartment => 0,
        GlyphKind::Species => 1,
        GlyphKind::Reaction => 2,
        GlyphKind::Text { .. } => 3,
    };
    let mut ordered: Vec<&Glyph> = glyphs.iter().filter(|glyph| glyph.bbox().is_some()).collect();
    ordered.sort_by_key(|glyph: &&Glyph| (layer(*glyph), depth(glyph.id.as_str())));
    ordered
}

pub fn svg_output_path(output: &Path) -> PathBuf {
    let mut svg_path = output.to_path_buf();
    svg_path.set_extension("svg");
    svg_path
}

/// Render glyphs and arcs to `output` (PNG) and a sibling SVG.
pub fn render_diagram(
    glyphs: &[Glyph],
    arcs: &[SpeciesReferenceGlyph],
    output: &Path,
    padding: f64,
) -> Result<()> {
    let bounds = compute_bounds(glyphs)?;
    let paths = arc_paths(glyphs, arcs);
    let ordered = paint_order(glyphs);
    let (transform, width_f, height_f) = transform_with_padding(bounds, padding);
    debug!(
        glyphs = ordered.len(),
        arcs = paths.len(),
        width = width_f,
        height = height_f,
        "rendering diagram"
    );

    let (surface, ctx) = create_png_surface(width_f.ceil() as i32, height_f.ceil() as i32)?;
    render_scene(&ctx, &transform, &ordered, &paths)?;
    let mut file = fs::File::create(output)
        .with_context(|| format!("Failed to create PNG file {:?}", output))?;
    surface
        .write_to_png(&mut file)
        .context("Failed to write PNG")?;

    let svg_path = svg_output_path(output);
    let surface = SvgSurface::new(width_f, height_f, Some(&svg_path))
        .context("Failed to create SVG surface")?;
    let ctx = CairoContext::new(&surface).context("Failed to create Cairo context")?;
    setup_context(&ctx)?;
    render_scene(&ctx, &transform, &ordered, &paths)?;
    surface.finish();
    Ok(())
}

fn setup_context(ctx: &CairoContext) -> Result<()> {
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.paint()?;
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    ctx.set_line_cap(LineCap::Square);
    Ok(())
}

fn create_png_surface(width: i32, height: i32) -> Result<(ImageSurface, CairoContext)> {
    let surface = ImageSurface::create(Format::ARgb32, width, height)
        .context("Failed to create image surface")?;
    let ctx = CairoContext::new(&surface).context("Failed to create Cairo context")?;
    setup_context(&ctx)?;
    Ok((surface, ctx))
}

fn render_scene(
    ctx: &CairoContext,
    transform: &Transform,
    glyphs: &[&Glyph],
    arcs: &[ArcPath],
) -> Result<()> {
    for glyph in glyphs {
        draw_glyph(ctx, transform, glyph)?;
    }

    let arrow_size_px = transform.scale_scalar(ARROW_SIZE * ARROW_SCALE);
    let bar_length_px = transform.scale_scalar(BAR_LENGTH * ARROW_SCALE);
    let bar_offset_px = transform.scale_scalar(BAR_OFFSET * ARROW_SCALE);
    for arc in arcs {
        let points_px: Vec<Point> = arc.points.iter().map(|pt| transform.map_point(*pt)).collect();
        draw_arc(ctx, &points_px, &arc.class_name, arrow_size_px, bar_length_px, bar_offset_px)?;
    }
    Ok(())
}

fn draw_glyph(ctx: &CairoContext, transform: &Transform, glyph: &Glyph) -> Result<()> {
    let Some(bbox) = glyph.bbox() else {
        return Ok(());
    };
    let class_name = glyph.class_name.as_str();
    let shape = shape_for_class(class_name);
    let label = match class_name {
        "omitted process" => "\\\\",
        "uncertain process" => "?",
        _ => glyph.label.as_str(),
    };
    let font_px = match shape {
        Shape::ProcessSquare | Shape::LabelOnly => FONT_SMALL_PX,
        _ => FONT_MAIN_PX,
    };

    let mut rect = transform.rect(&bbox);
    if shape == Shape::ProcessSquare {
        let side = rect.width.min(rect.height);
        rect = PixelRect {
            x0: rect.center.x - side / 2.0,
            y0: rect.center.y - side / 2.0,
            width: side,
            height: side,
            center: rect.center,
        };
    }

    match shape {
        Shape::LabelOnly => {}
        Shape::SourceSink => {
            draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), path_circle)?;
            let radius = (rect.width.min(rect.height) / 2.0).max(1.0);
            ctx.new_path();
            ctx.move_to(rect.center.x - radius, rect.center.y + radius);
            ctx.line_to(rect.center.x + radius, rect.center.y - radius);
            ctx.stroke()?;
        }
        Shape::Association => draw_outlined(ctx, rect, Some(ASSOCIATION_FILL_COLOR), path_circle)?,
        Shape::Dissociation => {
            draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), path_circle)?;
            let inner = PixelRect {
                x0: rect.center.x - rect.width * 0.3,
                y0: rect.center.y - rect.height * 0.3,
                width: rect.width * 0.6,
                height: rect.height * 0.6,
                center: rect.center,
            };
            draw_outlined(ctx, inner, None, path_circle)?;
        }
        Shape::Barrel => draw_outlined(ctx, rect, Some(COMPARTMENT_FILL_COLOR), path_barrel)?,
        Shape::Rect | Shape::ProcessSquare => draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), path_rect)?,
        Shape::RoundRect => draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), |ctx, rect| {
            let radius = (rect.width.min(rect.height) * 0.1).max(1.0);
            path_round_rect(ctx, rect, radius)
        })?,
        Shape::Ellipse => draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), path_ellipse)?,
        Shape::CutRect => draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), |ctx, rect| {
            let corner = (rect.width.min(rect.height) * 0.2).max(1.0);
            path_cut_rect(ctx, rect, corner)
        })?,
        Shape::Hexagon => draw_outlined(ctx, rect, Some(DEFAULT_FILL_COLOR), path_hexagon)?,
    }

    if glyph.is_reaction() {
        draw_orientation_marker(ctx, rect, Orientation::of(&bbox), transform.scale_scalar(PORT_CONNECTOR_LEN_PX))?;
    }

    if matches!(shape, Shape::Barrel | Shape::CutRect) {
        draw_text_bottom_centered(ctx, rect, label, font_px)
    } else {
        draw_text_centered(ctx, rect.center, label, font_px)
    }
}

fn draw_outlined<F>(
    ctx: &CairoContext,
    rect: PixelRect,
    fill_color: Option<(f64, f64, f64)>,
    path_fn: F,
) -> Result<()>
where
    F: Fn(&CairoContext, PixelRect) -> Result<()>,
{
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    path_fn(ctx, rect)?;
    if let Some(color) = fill_color {
        ctx.set_source_rgb(color.0, color.1, color.2);
        ctx.fill_preserve()?;
    }
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.stroke()?;
    Ok(())
}

/// Connector stubs on the two sides a reaction's arcs dock on.
fn draw_orientation_marker(
    ctx: &CairoContext,
    rect: PixelRect,
    orientation: Orientation,
    connector_len_px: f64,
) -> Result<()> {
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    ctx.new_path();
    match orientation {
        Orientation::Vertical => {
            ctx.move_to(rect.center.x, rect.y0 - connector_len_px);
            ctx.line_to(rect.center.x, rect.y0);
            ctx.move_to(rect.center.x, rect.y0 + rect.height);
            ctx.line_to(rect.center.x, rect.y0 + rect.height + connector_len_px);
        }
        Orientation::Horizontal => {
            ctx.move_to(rect.x0 - connector_len_px, rect.center.y);
            ctx.line_to(rect.x0, rect.center.y);
            ctx.move_to(rect.x0 + rect.width, rect.center.y);
            ctx.line_to(rect.x0 + rect.width + connector_len_px, rect.center.y);
        }
    }
    ctx.stroke()?;
    Ok(())
}

fn path_rect(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    ctx.new_path();
    ctx.rectangle(rect.x0, rect.y0, rect.width, rect.height);
    Ok(())
}

fn path_circle(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let radius = (rect.width.min(rect.height) / 2.0).max(1.0);
    ctx.new_path();
    ctx.arc(rect.center.x, rect.center.y, radius, 0.0, std::f64::consts::TAU);
    Ok(())
}

fn path_ellipse(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let radius_x = (rect.width / 2.0).max(1.0);
    let radius_y = (rect.height / 2.0).max(1.0);
    ctx.save()?;
    ctx.new_path();
    ctx.translate(rect.center.x, rect.center.y);
    ctx.scale(radius_x, radius_y);
    ctx.arc(0.0, 0.0, 1.0, 0.0, std::f64::consts::TAU);
    ctx.restore()?;
    Ok(())
}

fn path_round_rect(ctx: &CairoContext, rect: PixelRect, radius: f64) -> Result<()> {
    let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0);
    let (x, y) = (rect.x0, rect.y0);
    let right = x + rect.width;
    let bottom = y + rect.height;
    let quarter = std::f64::consts::FRAC_PI_2;

    ctx.new_path();
    ctx.move_to(x + radius, y);
    ctx.line_to(right - radius, y);
    ctx.arc(right - radius, y + radius, radius, -quarter, 0.0);
    ctx.line_to(right, bottom - radius);
    ctx.arc(right - radius, bottom - radius, radius, 0.0, quarter);
    ctx.line_to(x + radius, bottom);
    ctx.arc(x + radius, bottom - radius, radius, quarter, 2.0 * quarter);
    ctx.line_to(x, y + radius);
    ctx.arc(x + radius, y + radius, radius, 2.0 * quarter, 3.0 * quarter);
    ctx.close_path();
    Ok(())
}

fn path_cut_rect(ctx: &CairoContext, rect: PixelRect, corner: f64) -> Result<()> {
    let x0 = rect.x0;
    let y0 = rect.y0;
    let x1 = rect.x0 + rect.width;
    let y1 = rect.y0 + rect.height;
    ctx.new_path();
    ctx.move_to(x0, y0 + corner);
    ctx.line_to(x0 + corner, y0);
    ctx.line_to(x1 - corner, y0);
    ctx.line_to(x1, y0 + corner);
    ctx.line_to(x1, y1 - corner);
    ctx.line_to(x1 - corner, y1);
    ctx.line_to(x0 + corner, y1);
    ctx.line_to(x0, y1 - corner);
    ctx.close_path();
    Ok(())
}

fn path_hexagon(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let inset = (rect.height / 2.0).min(rect.width / 4.0);
    let x0 = rect.x0;
    let x1 = rect.x0 + rect.width;
    let y0 = rect.y0;
    let y1 = rect.y0 + rect.height;
    ctx.new_path();
    ctx.move_to(x0, rect.center.y);
    ctx.line_to(x0 + inset, y0);
    ctx.line_to(x1 - inset, y0);
    ctx.line_to(x1, rect.center.y);
    ctx.line_to(x1 - inset, y1);
    ctx.line_to(x0 + inset, y1);
    ctx.close_path();
    Ok(())
}

fn path_barrel(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let x = rect.x0;
    let y = rect.y0;
    let w = rect.width;
    let h = rect.height;
    let top_y = y + 0.03 * h;
    let bottom_y = y + 0.97 * h;

    ctx.new_path();
    ctx.move_to(x, top_y);
    ctx.line_to(x, bottom_y);
    quad_curve_to(ctx, x + 0.06 * w, y + h, x + 0.25 * w, y + h)?;
    ctx.line_to(x + 0.75 * w, y + h);
    quad_curve_to(ctx, x + 0.95 * w, y + h, x + w, y + 0.95 * h)?;
    ctx.line_to(x + w, y + 0.05 * h);
    quad_curve_to(ctx, x + w, y, x + 0.75 * w, y)?;
    ctx.line_to(x + 0.25 * w, y);
    quad_curve_to(ctx, x + 0.06 * w, y, x, top_y)?;
    ctx.close_path();
    Ok(())
}

fn quad_curve_to(ctx: &CairoContext, cx: f64, cy: f64, x: f64, y: f64) -> Result<()> {
    let (x0, y0) = ctx
        .current_point()
        .context("Missing current point for quadratic curve")?;
    let c1x = x0 + 2.0 / 3.0 * (cx - x0);
    let c1y = y0 + 2.0 / 3.0 * (cy - y0);
    let c2x = x + 2.0 / 3.0 * (cx - x);
    let c2y = y + 2.0 / 3.0 * (cy - y);
    ctx.curve_to(c1x, c1y, c2x, c2y, x, y);
    Ok(())
}

fn draw_arc(
    ctx: &CairoContext,
    points: &[Point],
    class_name: &str,
    arrow_size: f64,
    bar_length: f64,
    bar_offset: f64,
) -> Result<()> {
    if points.len() < 2 {
        return Ok(());
    }

    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    ctx.new_path();
    for pair in points.windows(2) {
        ctx.move_to(pair[0].x, pair[0].y);
        ctx.line_to(pair[1].x, pair[1].y);
    }
    ctx.stroke()?;

    let end = points[points.len() - 1];
    let prev = points[points.len() - 2];
    match class_name {
        "production" => draw_filled_triangle(ctx, end, prev, arrow_size)?,
        "stimulation" => draw_open_triangle(ctx, end, prev, arrow_size)?,
        "modulation" => draw_open_diamond(ctx, end, prev, arrow_size)?,
        "catalysis" => draw_filled_circle_tangent(ctx, end, prev, arrow_size * 0.4)?,
        "inhibition" => draw_inhibition_bar(ctx, end, prev, bar_length, 0.0)?,
        "absolute inhibition" => {
            draw_inhibition_bar(ctx, end, prev, bar_length, 0.0)?;
            draw_inhibition_bar(ctx, end, prev, bar_length, bar_offset)?;
        }
        "necessary stimulation" => {
            draw_inhibition_bar(ctx, end, prev, bar_length, bar_offset)?;
            draw_open_triangle(ctx, end, prev, arrow_size)?;
        }
        _ => {}
    }
    Ok(())
}

/// Unit vector from `prev` to `end`, if the segment has length.
fn unit_direction(end: Point, prev: Point) -> Option<(f64, f64)> {
    let dx = end.x - prev.x;
    let dy = end.y - prev.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return None;
    }
    Some((dx / length, dy / length))
}

fn triangle_points(end: Point, prev: Point, size: f64) -> Option<(Point, Point, Point)> {
    let (ux, uy) = unit_direction(end, prev)?;
    let base_x = end.x - ux * size;
    let base_y = end.y - uy * size;
    let half_width = size * 0.6;
    let p1 = Point::new(base_x - uy * half_width, base_y + ux * half_width);
    let p2 = Point::new(base_x + uy * half_width, base_y - ux * half_width);
    Some((p1, p2, end))
}

fn path_polygon(ctx: &CairoContext, points: &[Point]) {
    ctx.new_path();
    for (i, point) in points.iter().enumerate() {
        if i == 0 {
            ctx.move_to(point.x, point.y);
        } else {
            ctx.line_to(point.x, point.y);
        }
    }
    ctx.close_path();
}

fn draw_filled_triangle(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some((p1, p2, tip)) = triangle_points(end, prev, size) else {
        return Ok(());
    };
    path_polygon(ctx, &[p1, p2, tip]);
    ctx.fill()?;
    Ok(())
}

fn draw_open_triangle(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some((p1, p2, tip)) = triangle_points(end, prev, size) else {
        return Ok(());
    };
    path_polygon(ctx, &[p1, p2, tip]);
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.fill_preserve()?;
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.stroke()?;
    Ok(())
}

fn draw_open_diamond(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some((ux, uy)) = unit_direction(end, prev) else {
        return Ok(());
    };
    let half_width = size * 0.5;
    let mid = Point::new(end.x - ux * size, end.y - uy * size);
    let back = Point::new(end.x - ux * 2.0 * size, end.y - uy * 2.0 * size);
    let left = Point::new(mid.x - uy * half_width, mid.y + ux * half_width);
    let right = Point::new(mid.x + uy * half_width, mid.y - ux * half_width);
    path_polygon(ctx, &[end, left, back, right]);
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.fill_preserve()?;
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.stroke()?;
    Ok(())
}

fn draw_filled_circle_tangent(ctx: &CairoContext, end: Point, prev: Point, radius: f64) -> Result<()> {
    let radius = radius.max(1.0);
    let offset = (radius - radius * CATALYSIS_OVERLAP_RATIO).max(0.0);
    let center = match unit_direction(end, prev) {
        Some((ux, uy)) => Point::new(end.x - ux * offset, end.y - uy * offset),
        None => end,
    };
    ctx.new_path();
    ctx.arc(center.x, center.y, radius, 0.0, std::f64::consts::TAU);
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.fill_preserve()?;
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.stroke()?;
    Ok(())
}

fn draw_inhibition_bar(
    ctx: &CairoContext,
    end: Point,
    prev: Point,
    length: f64,
    offset: f64,
) -> Result<()> {
    let Some((ux, uy)) = unit_direction(end, prev) else {
        return Ok(());
    };
    let center = Point::new(end.x - ux * offset, end.y - uy * offset);
    let half_len = length / 2.0;
    ctx.new_path();
    ctx.move_to(center.x + uy * half_len, center.y - ux * half_len);
    ctx.line_to(center.x - uy * half_len, center.y + ux * half_len);
    ctx.stroke()?;
    Ok(())
}

fn text_layout(ctx: &CairoContext, text: &str, font_px: f64) -> pango::Layout {
    let layout = pangocairo::create_layout(ctx);
    let mut font_desc = FontDescription::from_string(FONT_FAMILY);
    font_desc.set_absolute_size(font_px * pango::SCALE as f64);
    layout.set_font_description(Some(&font_desc));
    layout.set_alignment(Alignment::Center);
    layout.set_text(text);
    layout
}

fn draw_text_centered(ctx: &CairoContext, center: Point, text: &str, font_px: f64) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let layout = text_layout(ctx, text, font_px);
    let (width, height) = layout.pixel_size();
    let x = center.x - width as f64 / 2.0;
    let y = center.y - height as f64 / 2.0;
    draw_text_at(ctx, x, y, &layout)
}

fn draw_text_bottom_centered(ctx: &CairoContext, rect: PixelRect, text: &str, font_px: f64) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let layout = text_layout(ctx, text, font_px);
    let (width, height) = layout.pixel_size();
    let x = rect.center.x - width as f64 / 2.0;
    let y = rect.y0 + rect.height - height as f64 - 2.0;
    draw_text_at(ctx, x, y, &layout)
}

/// Outlined text at the given top-left position.
fn draw_text_at(ctx: &CairoContext, x: f64, y: f64, layout: &pango::Layout) -> Result<()> {
    ctx.new_path();
    ctx.move_to(x, y);
    pangocairo::layout_path(ctx, layout);
    if TEXT_OUTLINE_WIDTH > 0.0 {
        ctx.set_source_rgb(1.0, 1.0, 1.0);
        ctx.set_line_width(TEXT_OUTLINE_WIDTH);
        ctx.stroke_preserve()?;
    }
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.fill()?;
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    Ok(())
}

fn compute_bounds(glyphs: &[Glyph]) -> Result<Bounds> {
    let extent = glyphs
        .iter()
        .filter_map(Glyph::bbox)
        .reduce(|acc, bbox| acc.union(&bbox))
        .ok_or_else(|| anyhow!("No glyph has coordinates to render"))?;
    Ok(Bounds {
        min_x: extent.x,
        max_x: extent.max_x(),
        min_y: extent.y,
        max_y: extent.max_y(),
    })
}

/// Padded transform and canvas size for the data bounds.
fn transform_with_padding(bounds: Bounds, padding: f64) -> (Transform, f64, f64) {
    let min_x = bounds.min_x - padding;
    let max_x = bounds.max_x + padding;
    let min_y = bounds.min_y - padding;
    let max_y = bounds.max_y + padding;
    let width = (max_x - min_x).abs().max(1.0);
    let height = (max_y - min_y).abs().max(1.0);
    (
        Transform::new(min_x, min_y, max_x, max_y, width, height),
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DockingPoint, Role, Side};

    #[test]
    fn shape_depends_only_on_class() {
        assert_eq!(shape_for_class("macromolecule"), Shape::RoundRect);
        assert_eq!(shape_for_class("macromolecule multimer"), Shape::RoundRect);
        assert_eq!(shape_for_class("simple chemical"), Shape::Ellipse);
        assert_eq!(shape_for_class("complex"), Shape::CutRect);
        assert_eq!(shape_for_class("compartment"), Shape::Barrel);
        assert_eq!(shape_for_class("omitted process"), Shape::ProcessSquare);
        assert_eq!(shape_for_class("something new"), Shape::Rect);
    }

    #[test]
    fn boundary_point_leaves_through_the_nearest_edge() {
        let bbox = BoundingBox::new(0.0, 0.0, 40.0, 20.0);
        assert_eq!(boundary_point(&bbox, Point::new(100.0, 10.0)), Point::new(40.0, 10.0));
        assert_eq!(boundary_point(&bbox, Point::new(20.0, -50.0)), Point::new(20.0, 0.0));
        assert_eq!(boundary_point(&bbox, bbox.center()), bbox.center());
    }

    #[test]
    fn species_end_is_clipped_and_docked_end_is_kept() {
        let reaction = Glyph::reaction("r").with_bounds(BoundingBox::new(90.0, 95.0, 20.0, 10.0));
        let species = Glyph::species("s", "macromolecule").with_bounds(BoundingBox::new(200.0, 80.0, 100.0, 40.0));
        let mut arc = SpeciesReferenceGlyph::new("a", "r", "s", Role::Product);
        arc.docking = Some(DockingPoint {
            side: Side::Right,
            offset: Point::new(10.0, 0.0),
        });

        let paths = arc_paths(&[reaction, species], &[arc]);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].points, vec![Point::new(110.0, 100.0), Point::new(200.0, 100.0)]);
        assert_eq!(paths[0].class_name, "production");
    }

    #[test]
    fn arcs_without_geometry_are_skipped() {
        let reaction = Glyph::reaction("r").with_bounds(BoundingBox::new(0.0, 0.0, 20.0, 10.0));
        let species = Glyph::species("s", "macromolecule");
        let arc = SpeciesReferenceGlyph::new("a", "r", "s", Role::Substrate);
        assert!(arc_paths(&[reaction, species], &[arc]).is_empty());
    }

    #[test]
    fn compartments_paint_before_their_contents() {
        let outer = Glyph::compartment("outer").with_bounds(BoundingBox::new(0.0, 0.0, 500.0, 500.0));
        let inner = Glyph::compartment("inner")
            .in_compartment("outer")
            .with_bounds(BoundingBox::new(10.0, 10.0, 200.0, 200.0));
        let species = Glyph::species("s", "macromolecule").with_bounds(BoundingBox::new(20.0, 20.0, 96.0, 48.0));
        let glyphs = vec![species, inner, outer];
        let order: Vec<&str> = paint_order(&glyphs).iter().map(|g| g.id.as_str()).collect();
        assert_eq!(order, vec!["outer", "inner", "s"]);
    }
}
