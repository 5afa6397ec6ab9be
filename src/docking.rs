//! Docking points of arcs on process glyph boundaries.

use crate::model::{BoundingBox, Dimensions, DockingPoint, Point, Side, SpeciesReferenceGlyph};
use crate::orientation::SideAssignment;

/// Midpoint of `side`, relative to the centre of a box of size `dims`.
pub fn docking_offset(side: Side, dims: Dimensions) -> Point {
    match side {
        Side::Left => Point::new(-dims.width / 2.0, 0.0),
        Side::Right => Point::new(dims.width / 2.0, 0.0),
        Side::Top => Point::new(0.0, -dims.height / 2.0),
        Side::Bottom => Point::new(0.0, dims.height / 2.0),
    }
}

pub fn docking_point_for(
    reference: &SpeciesReferenceGlyph,
    reaction: &BoundingBox,
    sides: &SideAssignment,
) -> DockingPoint {
    let side = sides.side_for(reference.role);
    DockingPoint {
        side,
        offset: docking_offset(side, reaction.dimensions()),
    }
}

/// True when `point` lies on one of the four edges of `bbox`.
pub fn lies_on_boundary(point: Point, bbox: &BoundingBox) -> bool {
    const TOLERANCE: f64 = 1e-9;
    let within_x = point.x >= bbox.x - TOLERANCE && point.x <= bbox.max_x() + TOLERANCE;
    let within_y = point.y >= bbox.y - TOLERANCE && point.y <= bbox.max_y() + TOLERANCE;
    let on_vertical = (point.x - bbox.x).abs() <= TOLERANCE
        || (point.x - bbox.max_x()).abs() <= TOLERANCE;
    let on_horizontal = (point.y - bbox.y).abs() <= TOLERANCE
        || (point.y - bbox.max_y()).abs() <= TOLERANCE;
    (on_vertical && within_y) || (on_horizontal && within_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn sides() -> SideAssignment {
        SideAssignment {
            substrates: Side::Left,
            products: Side::Right,
            modifiers: Side::Top,
        }
    }

    #[test]
    fn offsets_are_side_midpoints() {
        let dims = Dimensions::new(20.0, 10.0);
        assert_eq!(docking_offset(Side::Left, dims), Point::new(-10.0, 0.0));
        assert_eq!(docking_offset(Side::Right, dims), Point::new(10.0, 0.0));
        assert_eq!(docking_offset(Side::Top, dims), Point::new(0.0, -5.0));
        assert_eq!(docking_offset(Side::Bottom, dims), Point::new(0.0, 5.0));
    }

    #[test]
    fn every_role_docks_on_the_boundary() {
        let reaction = BoundingBox::new(37.5, -12.0, 20.0, 10.0);
        for role in [
            Role::Substrate,
            Role::Product,
            Role::SideSubstrate,
            Role::SideProduct,
            Role::Modifier,
            Role::Activator,
            Role::Inhibitor,
        ] {
            let arc = SpeciesReferenceGlyph::new("a", "r", "s", role);
            let dock = docking_point_for(&arc, &reaction, &sides());
            let absolute = dock.absolute(&reaction);
            assert!(lies_on_boundary(absolute, &reaction), "{role:?} at {absolute:?}");
            assert_ne!(absolute, reaction.center());
        }
    }

    #[test]
    fn relative_offset_survives_translation() {
        let reaction = BoundingBox::new(0.0, 0.0, 20.0, 10.0);
        let arc = SpeciesReferenceGlyph::new("a", "r", "s", Role::Product);
        let dock = docking_point_for(&arc, &reaction, &sides());
        let moved = reaction.translated(140.0, -60.0);
        let absolute = dock.absolute(&moved);
        assert_eq!(absolute, Point::new(160.0, -55.0));
        assert!(lies_on_boundary(absolute, &moved));
    }

    #[test]
    fn interior_and_outside_points_are_rejected() {
        let bbox = BoundingBox::new(0.0, 0.0, 20.0, 10.0);
        assert!(!lies_on_boundary(Point::new(10.0, 5.0), &bbox));
        assert!(!lies_on_boundary(Point::new(25.0, 5.0), &bbox));
        assert!(lies_on_boundary(Point::new(20.0, 5.0), &bbox));
    }
}
