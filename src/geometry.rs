use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::{
    BOARD_ROWS, LEFT_MAX_X, LEFT_MIN_X, LINK_X, Link, Position, RIGHT_MAX_X, RIGHT_MIN_X, Site,
};

/// Every valid logical position in hit-test order: the left board column by
/// column (x ascending, then y ascending), the upper then lower link point,
/// then the right board in the same order. Exact distance ties resolve to the
/// earliest entry.
pub static ALL_POSITIONS: Lazy<Vec<Position>> = Lazy::new(|| {
    let mut positions = Vec::with_capacity(86);
    for x in LEFT_MIN_X..=LEFT_MAX_X {
        for y in 0..BOARD_ROWS {
            positions.extend(Position::cell(x, y));
        }
    }
    positions.push(Position::LINK_UPPER);
    positions.push(Position::LINK_LOWER);
    for x in RIGHT_MIN_X..=RIGHT_MAX_X {
        for y in 0..BOARD_ROWS {
            positions.extend(Position::cell(x, y));
        }
    }
    positions
});

/// Diagonal connectors drawn across the gap, as `(left anchor, right anchor)`.
pub const CONNECTOR_ANCHORS: [((u8, u8), (u8, u8)); 4] = [
    ((5, 1), (8, 2)),
    ((5, 2), (8, 1)),
    ((5, 4), (8, 5)),
    ((5, 5), (8, 4)),
];

static CONNECTORS: Lazy<Vec<(Position, Position)>> = Lazy::new(|| {
    CONNECTOR_ANCHORS
        .iter()
        .filter_map(|&((lx, ly), (rx, ry))| Some((Position::cell(lx, ly)?, Position::cell(rx, ry)?)))
        .collect()
});

pub fn connectors() -> &'static [(Position, Position)] {
    &CONNECTORS
}

/// True when a connector line joins `a` and `b` directly, in either direction.
pub fn are_connected(a: Position, b: Position) -> bool {
    connectors()
        .iter()
        .any(|&(left, right)| (left == a && right == b) || (left == b && right == a))
}

/// The link point a connector passes through.
pub fn link_on_connector(left: Position, right: Position) -> Option<Position> {
    if !are_connected(left, right) {
        return None;
    }
    if left.y().max(right.y()) <= 2.0 {
        Some(Position::LINK_UPPER)
    } else {
        Some(Position::LINK_LOWER)
    }
}

/// Cross-gap neighbours of `position`: the far anchors of every connector that
/// touches it, or all four anchors of the two connectors crossing at a link point.
pub fn cross_gap_neighbors(position: Position) -> Vec<Position> {
    match position.site() {
        Some(Site::Link(link)) => connectors()
            .iter()
            .filter(|&&(left, right)| {
                let upper = link_on_connector(left, right) == Some(Position::LINK_UPPER);
                upper == (link == Link::Upper)
            })
            .flat_map(|&(left, right)| [left, right])
            .collect(),
        Some(_) => connectors()
            .iter()
            .filter_map(|&(left, right)| {
                if left == position {
                    Some(right)
                } else if right == position {
                    Some(left)
                } else {
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Result of the nearest-point search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: Position,
    pub distance: f64,
}

/// Pixel layout of the two boards and the gap between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardLayout {
    pub cell: f64,
    pub padding: f64,
    pub gap: f64,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            cell: 60.0,
            padding: 40.0,
            gap: 80.0,
        }
    }
}

impl BoardLayout {
    pub fn surface_x(&self, x: f64) -> f64 {
        let left_edge = self.padding + f64::from(LEFT_MAX_X) * self.cell;
        if x <= f64::from(LEFT_MAX_X) {
            self.padding + x * self.cell
        } else if x == LINK_X {
            left_edge + self.gap / 2.0
        } else {
            left_edge + self.gap + (x - f64::from(RIGHT_MIN_X)) * self.cell
        }
    }

    /// Linear on both sides, fractional link rows included.
    pub fn surface_y(&self, y: f64) -> f64 {
        self.padding + y * self.cell
    }

    pub fn to_surface(&self, position: Position) -> Point {
        Point::new(self.surface_x(position.x()), self.surface_y(position.y()))
    }

    /// Closest valid position to a pixel, by Euclidean distance.
    pub fn nearest(&self, px: f64, py: f64) -> Hit {
        let click = Point::new(px, py);
        let mut best = Hit {
            position: ALL_POSITIONS[0],
            distance: f64::INFINITY,
        };
        for &position in ALL_POSITIONS.iter() {
            let distance = click.distance(self.to_surface(position));
            if distance < best.distance {
                best = Hit { position, distance };
            }
        }
        best
    }

    pub fn hit_threshold(&self) -> f64 {
        self.cell / 2.0
    }

    /// Accepted only when strictly closer than half a cell pitch.
    pub fn hit(&self, px: f64, py: f64) -> Option<Position> {
        let hit = self.nearest(px, py);
        (hit.distance < self.hit_threshold()).then_some(hit.position)
    }

    /// `(width, height)` of the drawing surface.
    pub fn surface_size(&self) -> (f64, f64) {
        (
            self.surface_x(f64::from(RIGHT_MAX_X)) + self.padding,
            self.surface_y(f64::from(BOARD_ROWS - 1)) + self.padding,
        )
    }
}

/// Slot grid of the inventory panel. Slots are numbered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InventoryLayout {
    pub rows: usize,
    pub cols: usize,
    pub cell: f64,
}

impl Default for InventoryLayout {
    fn default() -> Self {
        Self {
            rows: 7,
            cols: 5,
            cell: 60.0,
        }
    }
}

impl InventoryLayout {
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Floors the pixel by the cell pitch. There is no distance threshold;
    /// only points outside the grid yield `None`.
    pub fn slot_at(&self, px: f64, py: f64) -> Option<usize> {
        if px < 0.0 || py < 0.0 || self.cell <= 0.0 {
            return None;
        }
        let col = (px / self.cell).floor() as usize;
        let row = (py / self.cell).floor() as usize;
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(row * self.cols + col)
    }

    /// Top-left corner of a slot.
    pub fn slot_origin(&self, index: usize) -> Point {
        let cols = self.cols.max(1);
        Point::new(
            (index % cols) as f64 * self.cell,
            (index / cols) as f64 * self.cell,
        )
    }

    pub fn slot_center(&self, index: usize) -> Point {
        self.slot_origin(index)
            .offset(self.cell / 2.0, self.cell / 2.0)
    }

    pub fn surface_size(&self) -> (f64, f64) {
        (self.cols as f64 * self.cell, self.rows as f64 * self.cell)
    }
}
