use serde::Serialize;

use crate::geometry::Point;
use crate::types::{Color, Piece};
use crate::visibility::is_hidden;

pub const BOARD_BACKGROUND: &str = "white";
pub const INVENTORY_BACKGROUND: &str = "#f5f5f5";
pub const GRID_LINE: &str = "#000";
pub const INVENTORY_GRID_LINE: &str = "#ccc";
pub const LINK_MARKER: &str = "#FF9800";
pub const REVEALED_BORDER: &str = "#FF9800";
pub const HIGHLIGHT: &str = "#00ff00";
pub const TEXT_FILL: &str = "#FFFFFF";

const LINK_MARKER_RADIUS: f64 = 6.0;
const HIGHLIGHT_GROW: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f64,
}

impl Stroke {
    pub const fn new(color: &'static str, width: f64) -> Self {
        Self { color, width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Baseline {
    Middle,
    Top,
}

/// Draw-call sink. The host replays these on a 2D context.
pub trait Canvas {
    fn clear(&mut self, width: f64, height: f64, color: &'static str);
    fn line(&mut self, from: Point, to: Point, stroke: Stroke);
    fn circle(&mut self, center: Point, radius: f64, fill: &'static str, stroke: Stroke);
    fn polygon(&mut self, points: Vec<Point>, fill: Option<&'static str>, stroke: Stroke);
    fn text(&mut self, text: &str, at: Point, font: &'static str, baseline: Baseline, outline: f64);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    Clear {
        width: f64,
        height: f64,
        color: &'static str,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: &'static str,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Point>,
        fill: Option<&'static str>,
        stroke: Stroke,
    },
    Text {
        text: String,
        at: Point,
        font: &'static str,
        baseline: Baseline,
        fill: &'static str,
        outline: f64,
    },
}

/// Records draw calls in order; serialized as-is for the JS side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DisplayList {
    ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Canvas for DisplayList {
    fn clear(&mut self, width: f64, height: f64, color: &'static str) {
        self.ops.push(DrawOp::Clear {
            width,
            height,
            color,
        });
    }

    fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.ops.push(DrawOp::Line { from, to, stroke });
    }

    fn circle(&mut self, center: Point, radius: f64, fill: &'static str, stroke: Stroke) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    fn polygon(&mut self, points: Vec<Point>, fill: Option<&'static str>, stroke: Stroke) {
        self.ops.push(DrawOp::Polygon {
            points,
            fill,
            stroke,
        });
    }

    fn text(&mut self, text: &str, at: Point, font: &'static str, baseline: Baseline, outline: f64) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            at,
            font,
            baseline,
            fill: TEXT_FILL,
            outline,
        });
    }
}

/// Font sizes and glyph offsets for one rendering context.
#[derive(Debug, Clone, Copy)]
pub struct PieceStyle {
    pub symbol_font: &'static str,
    pub name_font: &'static str,
    pub text_offset: f64,
}

pub const BOARD_PIECE_STYLE: PieceStyle = PieceStyle {
    symbol_font: "bold 16px sans-serif",
    name_font: "bold 8px sans-serif",
    text_offset: 6.0,
};

pub const INVENTORY_PIECE_STYLE: PieceStyle = PieceStyle {
    symbol_font: "bold 14px sans-serif",
    name_font: "bold 7px sans-serif",
    text_offset: 5.0,
};

/// Pentagon pointing toward the opponent: RED points right, BLUE left.
/// `grow` pushes every vertex outward on both axes.
pub fn piece_outline(center: Point, color: Color, grow: f64) -> Vec<Point> {
    const BASE: [(f64, f64); 5] = [
        (-18.0, -20.0),
        (-18.0, 20.0),
        (12.0, 14.0),
        (20.0, 0.0),
        (12.0, -14.0),
    ];
    let mirror = match color {
        Color::Red => 1.0,
        Color::Blue => -1.0,
    };
    BASE.iter()
        .map(|&(dx, dy)| {
            let dx = dx + dx.signum() * grow;
            let dy = if dy == 0.0 { 0.0 } else { dy + dy.signum() * grow };
            center.offset(dx * mirror, dy)
        })
        .collect()
}

fn fill_for(color: Color, hidden: bool) -> &'static str {
    match (color, hidden) {
        (Color::Red, true) => "#8B4513",
        (Color::Blue, true) => "#4A5568",
        (Color::Red, false) => "#d32f2f",
        (Color::Blue, false) => "#2196F3",
    }
}

/// Body, border and (when visible) glyph and name of one piece.
pub fn draw_piece<C: Canvas + ?Sized>(
    canvas: &mut C,
    piece: &Piece,
    center: Point,
    viewer: Option<Color>,
    style: PieceStyle,
) {
    let hidden = is_hidden(piece, viewer);
    let border = if viewer == Some(piece.color) && piece.revealed {
        Stroke::new(REVEALED_BORDER, 3.0)
    } else {
        Stroke::new(GRID_LINE, 2.0)
    };
    canvas.polygon(
        piece_outline(center, piece.color, 0.0),
        Some(fill_for(piece.color, hidden)),
        border,
    );

    if hidden {
        return;
    }
    let Some(kind) = piece.kind.as_ref() else {
        return;
    };
    if !kind.symbol.is_empty() {
        canvas.text(
            &kind.symbol,
            center.offset(0.0, -style.text_offset),
            style.symbol_font,
            Baseline::Middle,
            0.5,
        );
    }
    if !kind.display_name.is_empty() {
        canvas.text(
            &kind.display_name,
            center.offset(0.0, style.text_offset),
            style.name_font,
            Baseline::Top,
            0.3,
        );
    }
}

/// Oversized outline around the selected piece.
pub fn draw_selection<C: Canvas + ?Sized>(canvas: &mut C, center: Point, color: Color) {
    canvas.polygon(
        piece_outline(center, color, HIGHLIGHT_GROW),
        None,
        Stroke::new(HIGHLIGHT, 3.0),
    );
}

pub fn draw_link_marker<C: Canvas + ?Sized>(canvas: &mut C, center: Point) {
    canvas.circle(
        center,
        LINK_MARKER_RADIUS,
        LINK_MARKER,
        Stroke::new(GRID_LINE, 2.0),
    );
}
