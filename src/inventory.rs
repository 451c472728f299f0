use crate::canvas::{
    Canvas, INVENTORY_BACKGROUND, INVENTORY_GRID_LINE, INVENTORY_PIECE_STYLE, Stroke, draw_piece,
    draw_selection,
};
use crate::geometry::{InventoryLayout, Point};
use crate::types::{Color, Piece};

/// Which pieces the inventory panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryMode {
    /// Unplaced pieces, each at its assigned slot.
    Setup,
    /// Opponent pieces captured by the viewer.
    Play,
}

impl InventoryMode {
    pub fn from_playing(is_playing: bool) -> Self {
        if is_playing {
            InventoryMode::Play
        } else {
            InventoryMode::Setup
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InventoryView<'a> {
    pub pieces: &'a [Piece],
    pub viewer: Option<Color>,
    pub selected: Option<&'a str>,
    pub mode: InventoryMode,
}

impl<'a> InventoryView<'a> {
    /// `(slot, piece)` for every piece shown under the active mode.
    /// Trophies without an assigned slot fall back to their display order.
    pub fn slots(&self) -> Vec<(usize, &'a Piece)> {
        match self.mode {
            InventoryMode::Setup => self
                .pieces
                .iter()
                .filter(|piece| piece.is_in_inventory())
                .filter_map(|piece| piece.inventory_index.map(|slot| (slot, piece)))
                .collect(),
            InventoryMode::Play => self
                .pieces
                .iter()
                .filter(|piece| piece.captured && Some(piece.color) != self.viewer)
                .enumerate()
                .map(|(order, piece)| (piece.inventory_index.unwrap_or(order), piece))
                .collect(),
        }
    }

    pub fn piece_at(&self, slot: usize) -> Option<&'a Piece> {
        self.slots()
            .into_iter()
            .find(|&(index, _)| index == slot)
            .map(|(_, piece)| piece)
    }
}

/// Fixed slot grid of unplaced pieces (setup) or trophies (play).
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryRenderer {
    layout: InventoryLayout,
}

impl InventoryRenderer {
    pub fn new(layout: InventoryLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &InventoryLayout {
        &self.layout
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, view: &InventoryView<'_>) {
        let layout = &self.layout;
        let (width, height) = layout.surface_size();
        canvas.clear(width, height, INVENTORY_BACKGROUND);

        let stroke = Stroke::new(INVENTORY_GRID_LINE, 1.0);
        for row in 0..=layout.rows {
            let y = row as f64 * layout.cell;
            canvas.line(Point::new(0.0, y), Point::new(width, y), stroke);
        }
        for col in 0..=layout.cols {
            let x = col as f64 * layout.cell;
            canvas.line(Point::new(x, 0.0), Point::new(x, height), stroke);
        }

        for (slot, piece) in view.slots() {
            if slot >= layout.capacity() {
                continue;
            }
            let center = layout.slot_center(slot);
            draw_piece(canvas, piece, center, view.viewer, INVENTORY_PIECE_STYLE);
            if view.selected == Some(piece.id.as_str()) {
                draw_selection(canvas, center, piece.color);
            }
        }
    }

    /// Slot under the pointer and whichever piece occupies it. `None` only
    /// when the pointer is outside the grid.
    pub fn click<'a>(
        &self,
        view: &InventoryView<'a>,
        pointer: Point,
        surface_origin: Point,
    ) -> Option<(Option<&'a Piece>, usize)> {
        let slot = self
            .layout
            .slot_at(pointer.x - surface_origin.x, pointer.y - surface_origin.y)?;
        Some((view.piece_at(slot), slot))
    }
}
