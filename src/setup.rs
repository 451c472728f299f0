use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use rand::Rng;

use crate::types::{BOARD_ROWS, Color, Piece, PieceId, Position, Site};

static RED_CAMP: Lazy<Vec<Position>> = Lazy::new(|| build_camp(Color::Red));
static BLUE_CAMP: Lazy<Vec<Position>> = Lazy::new(|| build_camp(Color::Blue));

/// Columns a side may place on. The front line next to the gap (x=5 / x=8)
/// is excluded for both sides.
pub fn camp_columns(color: Color) -> RangeInclusive<u8> {
    match color {
        Color::Red => 0..=4,
        Color::Blue => 9..=13,
    }
}

fn build_camp(color: Color) -> Vec<Position> {
    camp_columns(color)
        .flat_map(|x| (0..BOARD_ROWS).filter_map(move |y| Position::cell(x, y)))
        .collect()
}

/// Every valid setup cell for `color`, column by column.
pub fn camp_cells(color: Color) -> &'static [Position] {
    match color {
        Color::Red => &RED_CAMP,
        Color::Blue => &BLUE_CAMP,
    }
}

pub fn in_camp(color: Color, position: Position) -> bool {
    match position.site() {
        Some(Site::Left { x, .. }) | Some(Site::Right { x, .. }) => camp_columns(color).contains(&x),
        _ => false,
    }
}

/// Fisher–Yates: swap each index from the last down to 1 with a uniformly
/// drawn index in `0..=i`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Pairs each still-unplaced `color` piece, in piece order, with a distinct
/// shuffled camp cell that nothing currently occupies.
pub fn random_assignment<R: Rng + ?Sized>(
    pieces: &[Piece],
    color: Color,
    rng: &mut R,
) -> Vec<(PieceId, Position)> {
    let mut cells: Vec<Position> = camp_cells(color)
        .iter()
        .copied()
        .filter(|&cell| {
            !pieces
                .iter()
                .any(|piece| !piece.captured && piece.position == Some(cell))
        })
        .collect();
    shuffle(&mut cells, rng);

    pieces
        .iter()
        .filter(|piece| piece.color == color && piece.is_in_inventory())
        .zip(cells)
        .map(|(piece, cell)| (piece.id.clone(), cell))
        .collect()
}
