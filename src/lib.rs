//! Completes partially specified SBGN layouts.
//!
//! Glyphs and arcs are registered with a [`LayoutCompletion`], then a single
//! [`LayoutCompletion::complete`] call fills in missing positions and sizes,
//! settles compartment containment, orients reaction glyphs and docks their
//! arcs. Adapters read SBGN-ML, dump the result as JSON and render it.

pub mod autolayout;
pub mod completion;
pub mod config;
pub mod docking;
pub mod dump;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod model;
pub mod orientation;
pub mod render;
pub mod sbgnml;

pub use autolayout::{AutoLayout, LayeredLayout};
pub use completion::{CompletedLayout, LayoutCompletion, Phase};
pub use config::{load_config, CompletionConfig};
pub use error::{LayoutError, Result};
pub use model::{
    BoundingBox, Dimensions, Glyph, GlyphKind, Orientation, PartialBounds, Point, Role, Side,
    SpeciesReferenceGlyph,
};
pub use sbgnml::{parse_sbgnml, SbgnModel};
