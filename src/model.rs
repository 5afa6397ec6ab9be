//! Glyph model: diagram elements and their possibly incomplete geometry.
//!
//! Geometry is carried in small `Copy` value types. Phases hand updated
//! copies back to the orchestrator rather than sharing mutable boxes.

use std::collections::BTreeMap;

/// Width used for a reaction glyph that arrives without dimensions.
pub const DEFAULT_REACTION_WIDTH: f64 = 20.0;
/// Height used for a reaction glyph that arrives without dimensions.
pub const DEFAULT_REACTION_HEIGHT: f64 = 10.0;

/// Annotation key holding the resolved orientation of a reaction glyph.
pub const ORIENTATION_ANNOTATION: &str = "orientation";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset_by(self, delta: Point) -> Point {
        Point {
            x: self.x + delta.x,
            y: self.y + delta.y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: Point, dims: Dimensions) -> Self {
        Self::new(position.x, position.y, dims.width, dims.height)
    }

    /// Box of the given size centred on `center`.
    pub fn centered_at(center: Point, dims: Dimensions) -> Self {
        Self::new(
            center.x - dims.width / 2.0,
            center.y - dims.height / 2.0,
            dims.width,
            dims.height,
        )
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Self::new(x, y, max_x - x, max_y - y)
    }

    pub fn inflated(&self, padding: f64) -> Self {
        Self::new(
            self.x - padding,
            self.y - padding,
            self.width + 2.0 * padding,
            self.height + 2.0 * padding,
        )
    }
}

/// Bounding box whose four fields are set or unset independently.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartialBounds {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl PartialBounds {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn position_only(position: Point) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            ..Self::default()
        }
    }

    pub fn dimensions_only(dims: Dimensions) -> Self {
        Self {
            width: Some(dims.width),
            height: Some(dims.height),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Option<Point> {
        Some(Point::new(self.x?, self.y?))
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions::new(self.width?, self.height?))
    }

    pub fn complete(&self) -> Option<BoundingBox> {
        Some(BoundingBox::from_parts(self.position()?, self.dimensions()?))
    }

    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }

    /// Set width and height where they are missing.
    pub fn fill_dimensions(&mut self, dims: Dimensions) {
        self.width.get_or_insert(dims.width);
        self.height.get_or_insert(dims.height);
    }

    /// Fill only the unset fields from `fallback`; set fields always win.
    pub fn merged_with(&self, fallback: BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.x.unwrap_or(fallback.x),
            self.y.unwrap_or(fallback.y),
            self.width.unwrap_or(fallback.width),
            self.height.unwrap_or(fallback.height),
        )
    }
}

impl From<BoundingBox> for PartialBounds {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            x: Some(bbox.x),
            y: Some(bbox.y),
            width: Some(bbox.width),
            height: Some(bbox.height),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlyphKind {
    Compartment,
    Species,
    Reaction,
    /// Free-standing text; `target` names the glyph it annotates, if any.
    Text { target: Option<String> },
}

impl GlyphKind {
    pub fn name(&self) -> &'static str {
        match self {
            GlyphKind::Compartment => "compartment",
            GlyphKind::Species => "species",
            GlyphKind::Reaction => "reaction",
            GlyphKind::Text { .. } => "text",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub id: String,
    pub kind: GlyphKind,
    /// SBGN class such as "macromolecule" or "process".
    pub class_name: String,
    pub label: String,
    pub bounds: PartialBounds,
    /// Compartment declared by the underlying model element.
    pub compartment_ref: Option<String>,
    /// Compartment this glyph was resolved into.
    pub parent: Option<String>,
    /// Contained glyph ids; only populated for compartments.
    pub children: Vec<String>,
    pub annotations: BTreeMap<String, String>,
}

impl Glyph {
    pub fn new(id: impl Into<String>, kind: GlyphKind, class_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            class_name: class_name.into(),
            label: String::new(),
            bounds: PartialBounds::unset(),
            compartment_ref: None,
            parent: None,
            children: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn compartment(id: impl Into<String>) -> Self {
        Self::new(id, GlyphKind::Compartment, "compartment")
    }

    pub fn species(id: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self::new(id, GlyphKind::Species, class_name)
    }

    pub fn reaction(id: impl Into<String>) -> Self {
        Self::new(id, GlyphKind::Reaction, "process")
    }

    pub fn text(id: impl Into<String>, target: Option<String>) -> Self {
        Self::new(id, GlyphKind::Text { target }, "text")
    }

    pub fn with_bounds(mut self, bounds: impl Into<PartialBounds>) -> Self {
        self.bounds = bounds.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn in_compartment(mut self, compartment: impl Into<String>) -> Self {
        self.compartment_ref = Some(compartment.into());
        self
    }

    pub fn is_compartment(&self) -> bool {
        self.kind == GlyphKind::Compartment
    }

    pub fn is_reaction(&self) -> bool {
        self.kind == GlyphKind::Reaction
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bounds.complete()
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.bbox().map(|bbox| Orientation::of(&bbox))
    }

    /// Size used when the glyph has none of its own.
    ///
    /// Reactions take `reaction_size`, the configured process glyph size.
    pub fn fallback_dimensions(&self, reaction_size: Dimensions) -> Dimensions {
        if self.is_reaction() {
            return reaction_size;
        }
        default_dimensions(&self.class_name)
            .map(|(w, h)| Dimensions::new(w, h))
            .unwrap_or(Dimensions::new(60.0, 30.0))
    }
}

/// Default widths/heights per SBGN class.
pub fn default_dimensions(class_name: &str) -> Option<(f64, f64)> {
    match class_name {
        "unspecified entity" => Some((32.0, 32.0)),
        "simple chemical" | "simple chemical multimer" => Some((48.0, 48.0)),
        "macromolecule" | "macromolecule multimer" => Some((96.0, 48.0)),
        "nucleic acid feature" => Some((88.0, 56.0)),
        "nucleic acid feature multimer" => Some((88.0, 52.0)),
        "complex" | "complex multimer" => Some((120.0, 80.0)),
        "source and sink" => Some((30.0, 30.0)),
        "perturbing agent" | "phenotype" => Some((140.0, 60.0)),
        "compartment" => Some((50.0, 50.0)),
        "tag" => Some((100.0, 65.0)),
        "text" => Some((80.0, 20.0)),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn of(bbox: &BoundingBox) -> Self {
        if bbox.width >= bbox.height {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Substrate,
    Product,
    SideSubstrate,
    SideProduct,
    Modifier,
    Activator,
    Inhibitor,
}

/// Orientation vote cast by a classified neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vote {
    Substrate,
    Product,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveDirection {
    ReactionToSpecies,
    SpeciesToReaction,
}

impl CurveDirection {
    pub fn reversed(self) -> Self {
        match self {
            CurveDirection::ReactionToSpecies => CurveDirection::SpeciesToReaction,
            CurveDirection::SpeciesToReaction => CurveDirection::ReactionToSpecies,
        }
    }
}

impl Role {
    pub fn direction(self) -> CurveDirection {
        match self {
            Role::Product | Role::SideProduct => CurveDirection::ReactionToSpecies,
            _ => CurveDirection::SpeciesToReaction,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Role::Substrate => Role::Product,
            Role::Product => Role::Substrate,
            Role::SideSubstrate => Role::SideProduct,
            Role::SideProduct => Role::SideSubstrate,
            other => other,
        }
    }

    /// Modifiers, activators and inhibitors do not vote on orientation.
    pub fn votes_as(self) -> Option<Vote> {
        match self {
            Role::Substrate | Role::SideSubstrate => Some(Vote::Substrate),
            Role::Product | Role::SideProduct => Some(Vote::Product),
            Role::Modifier | Role::Activator | Role::Inhibitor => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Substrate => "substrate",
            Role::Product => "product",
            Role::SideSubstrate => "sidesubstrate",
            Role::SideProduct => "sideproduct",
            Role::Modifier => "modifier",
            Role::Activator => "activator",
            Role::Inhibitor => "inhibitor",
        }
    }
}

/// Attachment on a reaction glyph's boundary, relative to its centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DockingPoint {
    pub side: Side,
    pub offset: Point,
}

impl DockingPoint {
    pub fn absolute(&self, reaction: &BoundingBox) -> Point {
        reaction.center().offset_by(self.offset)
    }
}

/// Endpoints of an arc in drawing order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Curve {
    pub start: Point,
    pub end: Point,
    pub direction: CurveDirection,
}

/// Role-tagged arc between a reaction glyph and a species glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesReferenceGlyph {
    pub id: String,
    pub reaction_id: String,
    pub species_id: String,
    pub role: Role,
    /// SBGN arc class such as "consumption" or "catalysis".
    pub class_name: String,
    pub docking: Option<DockingPoint>,
}

impl SpeciesReferenceGlyph {
    pub fn new(
        id: impl Into<String>,
        reaction_id: impl Into<String>,
        species_id: impl Into<String>,
        role: Role,
    ) -> Self {
        let class_name = match role {
            Role::Substrate | Role::SideSubstrate => "consumption",
            Role::Product | Role::SideProduct => "production",
            Role::Modifier => "modulation",
            Role::Activator => "stimulation",
            Role::Inhibitor => "inhibition",
        };
        Self {
            id: id.into(),
            reaction_id: reaction_id.into(),
            species_id: species_id.into(),
            role,
            class_name: class_name.to_string(),
            docking: None,
        }
    }

    pub fn direction(&self) -> CurveDirection {
        self.role.direction()
    }

    /// Absolute curve for the current reaction and species boxes.
    ///
    /// The reaction end sits on the resolved docking point (the centre when
    /// unresolved); the species end is its centre, left for the renderer to
    /// pull onto the species outline.
    pub fn curve(&self, reaction: &BoundingBox, species: &BoundingBox) -> Curve {
        let reaction_end = self
            .docking
            .map(|dock| dock.absolute(reaction))
            .unwrap_or_else(|| reaction.center());
        let species_end = species.center();
        let direction = self.direction();
        let (start, end) = match direction {
            CurveDirection::ReactionToSpecies => (reaction_end, species_end),
            CurveDirection::SpeciesToReaction => (species_end, reaction_end),
        };
        Curve {
            start,
            end,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_bounds_keep_set_fields_on_merge() {
        let partial = PartialBounds::position_only(Point::new(5.0, 7.0));
        let merged = partial.merged_with(BoundingBox::new(100.0, 100.0, 30.0, 40.0));
        assert_eq!(merged, BoundingBox::new(5.0, 7.0, 30.0, 40.0));

        let partial = PartialBounds::dimensions_only(Dimensions::new(12.0, 8.0));
        let merged = partial.merged_with(BoundingBox::new(1.0, 2.0, 30.0, 40.0));
        assert_eq!(merged, BoundingBox::new(1.0, 2.0, 12.0, 8.0));
    }

    #[test]
    fn single_unset_field_makes_bounds_incomplete() {
        let mut bounds = PartialBounds::from(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert!(bounds.is_complete());
        bounds.height = None;
        assert!(!bounds.is_complete());
        assert!(bounds.position().is_some());
        assert!(bounds.dimensions().is_none());
    }

    #[test]
    fn square_box_counts_as_horizontal() {
        assert_eq!(
            Orientation::of(&BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            Orientation::Horizontal
        );
        assert_eq!(
            Orientation::of(&BoundingBox::new(0.0, 0.0, 10.0, 20.0)),
            Orientation::Vertical
        );
    }

    #[test]
    fn product_curve_runs_from_reaction() {
        let reaction = BoundingBox::new(0.0, 0.0, 20.0, 10.0);
        let species = BoundingBox::new(100.0, 0.0, 40.0, 10.0);
        let mut arc = SpeciesReferenceGlyph::new("a", "r", "s", Role::Product);
        arc.docking = Some(DockingPoint {
            side: Side::Right,
            offset: Point::new(10.0, 0.0),
        });
        let curve = arc.curve(&reaction, &species);
        assert_eq!(curve.direction, CurveDirection::ReactionToSpecies);
        assert_eq!(curve.start, Point::new(20.0, 5.0));
        assert_eq!(curve.end, Point::new(120.0, 5.0));
    }

    #[test]
    fn reversing_role_reverses_direction_only() {
        let reaction = BoundingBox::new(0.0, 0.0, 20.0, 10.0);
        let species = BoundingBox::new(-80.0, 0.0, 40.0, 10.0);
        let product = SpeciesReferenceGlyph::new("a", "r", "s", Role::Product);
        let mut substrate = product.clone();
        substrate.role = product.role.reversed();

        assert_eq!(substrate.role, Role::Substrate);
        assert_eq!(substrate.direction(), product.direction().reversed());
        assert_eq!(substrate.id, product.id);
        assert_eq!(substrate.reaction_id, product.reaction_id);
        assert_eq!(substrate.species_id, product.species_id);
        assert_eq!(substrate.class_name, product.class_name);
        assert_eq!(substrate.docking, product.docking);

        let forward = product.curve(&reaction, &species);
        let backward = substrate.curve(&reaction, &species);
        assert_eq!(forward.start, backward.end);
        assert_eq!(forward.end, backward.start);
    }

    #[test]
    fn modifiers_never_vote() {
        for role in [Role::Modifier, Role::Activator, Role::Inhibitor] {
            assert_eq!(role.votes_as(), None);
            assert_eq!(role.direction(), CurveDirection::SpeciesToReaction);
        }
        assert_eq!(Role::SideSubstrate.votes_as(), Some(Vote::Substrate));
        assert_eq!(Role::SideProduct.votes_as(), Some(Vote::Product));
    }

    #[test]
    fn reaction_fallback_size_is_the_configured_one() {
        let configured = Dimensions::new(30.0, 12.0);
        let glyph = Glyph::reaction("r1");
        assert_eq!(glyph.fallback_dimensions(configured), configured);
        let glyph = Glyph::species("s1", "macromolecule");
        assert_eq!(glyph.fallback_dimensions(configured), Dimensions::new(96.0, 48.0));
    }

    #[test]
    fn filling_dimensions_keeps_a_set_width() {
        let mut bounds = PartialBounds {
            width: Some(40.0),
            ..PartialBounds::unset()
        };
        bounds.fill_dimensions(Dimensions::new(20.0, 10.0));
        assert_eq!(bounds.dimensions(), Some(Dimensions::new(40.0, 10.0)));
        assert_eq!(bounds.position(), None);
    }
}
