//! Orientation of process glyphs from the positions of their neighbours.

use crate::model::{BoundingBox, Orientation, Role, Side, Vote};

/// Neighbour counts gathered around one reaction glyph.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Votes {
    pub substrates_left: usize,
    pub substrates_above: usize,
    pub products_left: usize,
    pub products_above: usize,
    pub sum_dx: f64,
    pub sum_dy: f64,
    /// Number of neighbours that voted at all.
    pub voters: usize,
}

/// Sides on which each arc group docks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SideAssignment {
    pub substrates: Side,
    pub products: Side,
    pub modifiers: Side,
}

impl SideAssignment {
    pub fn side_for(&self, role: Role) -> Side {
        match role.votes_as() {
            Some(Vote::Substrate) => self.substrates,
            Some(Vote::Product) => self.products,
            None => self.modifiers,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationDecision {
    pub orientation: Orientation,
    /// Reaction box after any width/height swap.
    pub bounds: BoundingBox,
    pub sides: SideAssignment,
    pub votes: Votes,
}

pub fn count_votes(reaction: &BoundingBox, neighbours: &[(Role, BoundingBox)], epsilon: f64) -> Votes {
    let center = reaction.center();
    let mut votes = Votes::default();
    for (role, bbox) in neighbours {
        let Some(vote) = role.votes_as() else {
            continue;
        };
        let other = bbox.center();
        let dx = (center.x - other.x).abs();
        let dy = (center.y - other.y).abs();
        let left = dx > epsilon && other.x < center.x;
        let above = dy > epsilon && other.y < center.y;
        match vote {
            Vote::Substrate => {
                votes.substrates_left += left as usize;
                votes.substrates_above += above as usize;
            }
            Vote::Product => {
                votes.products_left += left as usize;
                votes.products_above += above as usize;
            }
        }
        votes.sum_dx += dx;
        votes.sum_dy += dy;
        votes.voters += 1;
    }
    votes
}

/// Pick the orientation the votes ask for.
pub fn decide_orientation(votes: &Votes) -> Orientation {
    let max = votes
        .substrates_left
        .max(votes.substrates_above)
        .max(votes.products_left)
        .max(votes.products_above);
    let substrate_tie = votes.substrates_left == max && votes.substrates_above == max;
    let product_tie = votes.products_left == max && votes.products_above == max;
    if substrate_tie || product_tie {
        if votes.sum_dx >= votes.sum_dy {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    } else if votes.substrates_left == max || votes.products_left == max {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    }
}

pub fn assign_sides(orientation: Orientation, votes: &Votes) -> SideAssignment {
    // Modifier arcs always take the same perpendicular side.
    match orientation {
        Orientation::Horizontal => {
            let (substrates, products) = if votes.substrates_left > votes.products_left {
                (Side::Left, Side::Right)
            } else {
                (Side::Right, Side::Left)
            };
            SideAssignment {
                substrates,
                products,
                modifiers: Side::Top,
            }
        }
        Orientation::Vertical => {
            let (substrates, products) = if votes.substrates_above > votes.products_above {
                (Side::Top, Side::Bottom)
            } else {
                (Side::Bottom, Side::Top)
            };
            SideAssignment {
                substrates,
                products,
                modifiers: Side::Left,
            }
        }
    }
}

/// Rotate `bbox` in place so that it matches `orientation`.
///
/// The centre stays fixed; the box is returned unchanged if it already fits.
pub fn oriented(bbox: BoundingBox, orientation: Orientation) -> BoundingBox {
    if Orientation::of(&bbox) == orientation || bbox.width == bbox.height {
        return bbox;
    }
    BoundingBox::centered_at(bbox.center(), bbox.dimensions().swapped())
}

/// Decide orientation and docking sides for one reaction glyph.
///
/// With no voting neighbour the current orientation is kept.
pub fn resolve_orientation(
    reaction: BoundingBox,
    neighbours: &[(Role, BoundingBox)],
    epsilon: f64,
) -> OrientationDecision {
    let votes = count_votes(&reaction, neighbours, epsilon);
    let orientation = if votes.voters == 0 {
        Orientation::of(&reaction)
    } else {
        decide_orientation(&votes)
    };
    OrientationDecision {
        orientation,
        bounds: oriented(reaction, orientation),
        sides: assign_sides(orientation, &votes),
        votes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dimensions, Point};

    const EPS: f64 = 5.0;

    fn reaction_at_origin() -> BoundingBox {
        BoundingBox::centered_at(Point::new(0.0, 0.0), Dimensions::new(20.0, 10.0))
    }

    fn neighbour(role: Role, dx: f64, dy: f64) -> (Role, BoundingBox) {
        (
            role,
            BoundingBox::centered_at(Point::new(dx, dy), Dimensions::new(40.0, 20.0)),
        )
    }

    #[test]
    fn larger_x_distance_breaks_substrate_tie_horizontally() {
        let neighbours = [
            neighbour(Role::Substrate, -80.0, 0.0),
            neighbour(Role::Substrate, 0.0, -20.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        assert_eq!(decision.votes.substrates_left, 1);
        assert_eq!(decision.votes.substrates_above, 1);
        assert_eq!(decision.orientation, Orientation::Horizontal);
    }

    #[test]
    fn larger_y_distance_breaks_substrate_tie_vertically() {
        let neighbours = [
            neighbour(Role::Substrate, -20.0, 0.0),
            neighbour(Role::Substrate, 0.0, -80.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        assert_eq!(decision.orientation, Orientation::Vertical);
        assert_eq!(decision.bounds.dimensions(), Dimensions::new(10.0, 20.0));
        assert_eq!(decision.bounds.center(), Point::new(0.0, 0.0));
    }

    #[test]
    fn equal_distances_favour_horizontal() {
        let neighbours = [
            neighbour(Role::Substrate, -50.0, 0.0),
            neighbour(Role::Substrate, 0.0, -50.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        assert_eq!(decision.orientation, Orientation::Horizontal);
    }

    #[test]
    fn dominant_above_counter_forces_vertical() {
        let neighbours = [
            neighbour(Role::Substrate, 3.0, -60.0),
            neighbour(Role::Product, -2.0, 60.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        assert_eq!(decision.votes.substrates_above, 1);
        assert_eq!(decision.votes.substrates_left, 0);
        assert_eq!(decision.orientation, Orientation::Vertical);
        assert_eq!(decision.sides.substrates, Side::Top);
        assert_eq!(decision.sides.products, Side::Bottom);
        assert_eq!(decision.sides.modifiers, Side::Left);
    }

    #[test]
    fn left_counter_wins_over_unrelated_above_counter() {
        // products-left and substrates-above share the maximum but are not a tie pair
        let neighbours = [
            neighbour(Role::Substrate, 100.0, -10.0),
            neighbour(Role::Product, -10.0, 100.0),
        ];
        let votes = count_votes(&reaction_at_origin(), &neighbours, EPS);
        assert_eq!(votes.substrates_above, 1);
        assert_eq!(votes.products_left, 1);
        assert_eq!(decide_orientation(&votes), Orientation::Horizontal);
    }

    #[test]
    fn near_colocated_neighbours_do_not_count() {
        let neighbours = [neighbour(Role::Substrate, -4.0, -4.0)];
        let votes = count_votes(&reaction_at_origin(), &neighbours, EPS);
        assert_eq!(votes.substrates_left, 0);
        assert_eq!(votes.substrates_above, 0);
        assert_eq!(votes.voters, 1);
    }

    #[test]
    fn horizontal_sides_follow_left_counts() {
        let neighbours = [
            neighbour(Role::Substrate, -100.0, 0.0),
            neighbour(Role::Product, 100.0, 0.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        assert_eq!(decision.orientation, Orientation::Horizontal);
        assert_eq!(decision.sides.substrates, Side::Left);
        assert_eq!(decision.sides.products, Side::Right);
        assert_eq!(decision.sides.modifiers, Side::Top);

        let mirrored = [
            neighbour(Role::Substrate, 100.0, 0.0),
            neighbour(Role::Product, -100.0, 0.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &mirrored, EPS);
        assert_eq!(decision.sides.substrates, Side::Right);
        assert_eq!(decision.sides.products, Side::Left);
    }

    #[test]
    fn equal_counts_send_substrates_right_and_below() {
        let votes = Votes {
            substrates_left: 1,
            products_left: 1,
            substrates_above: 2,
            products_above: 2,
            ..Votes::default()
        };
        let horizontal = assign_sides(Orientation::Horizontal, &votes);
        assert_eq!(horizontal.substrates, Side::Right);
        assert_eq!(horizontal.products, Side::Left);
        let vertical = assign_sides(Orientation::Vertical, &votes);
        assert_eq!(vertical.substrates, Side::Bottom);
        assert_eq!(vertical.products, Side::Top);

        let neighbours = [
            neighbour(Role::Substrate, 100.0, 0.0),
            neighbour(Role::Product, 120.0, 0.0),
        ];
        let decision = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        assert_eq!(decision.votes.substrates_left, decision.votes.products_left);
        assert_eq!(decision.sides.substrates, Side::Right);
        assert_eq!(decision.sides.products, Side::Left);
    }

    #[test]
    fn modifiers_are_excluded_from_voting() {
        let neighbours = [
            neighbour(Role::Modifier, 0.0, -100.0),
            neighbour(Role::Inhibitor, 0.0, -100.0),
        ];
        let vertical = BoundingBox::centered_at(Point::new(0.0, 0.0), Dimensions::new(10.0, 20.0));
        let decision = resolve_orientation(vertical, &neighbours, EPS);
        assert_eq!(decision.votes.voters, 0);
        assert_eq!(decision.orientation, Orientation::Vertical);
        assert_eq!(decision.bounds, vertical);
    }

    #[test]
    fn no_neighbours_keeps_default_horizontal() {
        let decision = resolve_orientation(reaction_at_origin(), &[], EPS);
        assert_eq!(decision.orientation, Orientation::Horizontal);
        assert_eq!(decision.bounds, reaction_at_origin());
    }

    #[test]
    fn re_resolution_is_idempotent() {
        let neighbours = [
            neighbour(Role::Substrate, -20.0, 0.0),
            neighbour(Role::Substrate, 0.0, -80.0),
            neighbour(Role::Product, 0.0, 90.0),
        ];
        let first = resolve_orientation(reaction_at_origin(), &neighbours, EPS);
        let second = resolve_orientation(first.bounds, &neighbours, EPS);
        assert_eq!(first.orientation, second.orientation);
        assert_eq!(first.sides, second.sides);
        assert_eq!(first.bounds, second.bounds);
    }
}
