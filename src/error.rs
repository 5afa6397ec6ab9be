pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// An arc names a glyph that was never registered. Only the arc is dropped.
    #[error("arc {arc_id} references unregistered glyph {glyph_id}")]
    MissingReference { arc_id: String, glyph_id: String },

    #[error("cannot {operation} while the layout run is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("glyph {id} registered more than once")]
    DuplicateGlyph { id: String },

    #[error("auto-layout returned no geometry for glyph {id}")]
    IncompleteAutoLayout { id: String },
}
