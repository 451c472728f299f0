use crate::types::{Color, Piece};

/// Whether `viewer` must see `piece` as a generic backing instead of its type.
///
/// Hidden iff the type is unknown, or the piece belongs to the other side and
/// has not been revealed. A `None` viewer (color not yet assigned) sees every
/// unrevealed piece as hidden.
pub fn is_hidden(piece: &Piece, viewer: Option<Color>) -> bool {
    piece.kind.is_none() || (viewer != Some(piece.color) && !piece.revealed)
}
