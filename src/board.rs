use crate::canvas::{
    BOARD_BACKGROUND, BOARD_PIECE_STYLE, Canvas, GRID_LINE, Stroke, draw_link_marker, draw_piece,
    draw_selection,
};
use crate::geometry::{BoardLayout, Point, connectors};
use crate::types::{
    BOARD_ROWS, Color, LEFT_MAX_X, LEFT_MIN_X, Piece, Position, RIGHT_MAX_X, RIGHT_MIN_X,
};

const GRID_STROKE: Stroke = Stroke::new(GRID_LINE, 2.0);

/// Read-only inputs for one redraw.
#[derive(Debug, Clone, Copy)]
pub struct BoardView<'a> {
    pub pieces: &'a [Piece],
    pub viewer: Option<Color>,
    pub selected: Option<&'a str>,
}

/// Draws both grids, connectors, link markers and placed pieces, and turns
/// pointer clicks into logical positions. Performs no rule interpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardRenderer {
    layout: BoardLayout,
}

impl BoardRenderer {
    pub fn new(layout: BoardLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, view: &BoardView<'_>) {
        self.draw_static(canvas);
        for piece in view.pieces {
            let Some(position) = placed(piece) else {
                continue;
            };
            let center = self.layout.to_surface(position);
            draw_piece(canvas, piece, center, view.viewer, BOARD_PIECE_STYLE);
            if view.selected == Some(piece.id.as_str()) {
                draw_selection(canvas, center, piece.color);
            }
        }
    }

    pub fn draw_static<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let (width, height) = self.layout.surface_size();
        canvas.clear(width, height, BOARD_BACKGROUND);
        self.draw_grid(canvas, LEFT_MIN_X, LEFT_MAX_X);
        self.draw_grid(canvas, RIGHT_MIN_X, RIGHT_MAX_X);
        for &(left, right) in connectors() {
            canvas.line(
                self.layout.to_surface(left),
                self.layout.to_surface(right),
                GRID_STROKE,
            );
        }
        for link in [Position::LINK_UPPER, Position::LINK_LOWER] {
            draw_link_marker(canvas, self.layout.to_surface(link));
        }
    }

    fn draw_grid<C: Canvas + ?Sized>(&self, canvas: &mut C, min_x: u8, max_x: u8) {
        let layout = &self.layout;
        let top = layout.surface_y(0.0);
        let bottom = layout.surface_y(f64::from(BOARD_ROWS - 1));
        let left = layout.surface_x(f64::from(min_x));
        let right = layout.surface_x(f64::from(max_x));
        for y in 0..BOARD_ROWS {
            let sy = layout.surface_y(f64::from(y));
            canvas.line(Point::new(left, sy), Point::new(right, sy), GRID_STROKE);
        }
        for x in min_x..=max_x {
            let sx = layout.surface_x(f64::from(x));
            canvas.line(Point::new(sx, top), Point::new(sx, bottom), GRID_STROKE);
        }
    }

    /// `pointer` and `surface_origin` are in the same (client) space.
    pub fn click(&self, pointer: Point, surface_origin: Point) -> Option<Position> {
        self.layout
            .hit(pointer.x - surface_origin.x, pointer.y - surface_origin.y)
    }
}

fn placed(piece: &Piece) -> Option<Position> {
    if piece.captured {
        return None;
    }
    piece.position
}
