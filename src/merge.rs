//! Reconciles authoritative snapshots with client-local inventory slots.
//!
//! The server never sends `inventory_index`. It is re-attached to each
//! incoming piece by id, and during SETUP locally known pieces that the push
//! omitted are carried over so unplaced pieces keep their slot.

use std::collections::{HashMap, HashSet};

use crate::types::{Color, GameState, GameStatus, Piece};

pub fn merge_snapshot(previous: &[Piece], mut incoming: GameState) -> GameState {
    let known: HashMap<&str, &Piece> = previous
        .iter()
        .map(|piece| (piece.id.as_str(), piece))
        .collect();

    for piece in incoming.pieces.iter_mut() {
        if let Some(slot) = known.get(piece.id.as_str()).and_then(|p| p.inventory_index) {
            piece.inventory_index = Some(slot);
        }
    }

    if incoming.status == GameStatus::Setup {
        let present: HashSet<String> = incoming.pieces.iter().map(|p| p.id.clone()).collect();
        let carried: Vec<Piece> = previous
            .iter()
            .filter(|piece| !present.contains(&piece.id))
            .cloned()
            .collect();
        incoming.pieces.extend(carried);
    }

    release_slot_collisions(&known, &mut incoming.pieces);
    incoming
}

/// A piece the server sends back to the inventory comes with its old slot,
/// which another piece may have been moved into since. Pieces that were
/// already unplaced keep their slot; the returning one is left without a slot
/// for [`assign_missing_slots`] to fill.
fn release_slot_collisions(known: &HashMap<&str, &Piece>, pieces: &mut [Piece]) {
    let mut claimed: HashSet<(Color, usize)> = HashSet::new();
    for settled in [true, false] {
        for piece in pieces.iter_mut() {
            if !piece.is_in_inventory() {
                continue;
            }
            let was_unplaced = known
                .get(piece.id.as_str())
                .is_some_and(|old| old.is_in_inventory());
            if was_unplaced != settled {
                continue;
            }
            if let Some(slot) = piece.inventory_index {
                if !claimed.insert((piece.color, slot)) {
                    piece.inventory_index = None;
                }
            }
        }
    }
}

/// Folds the initial roster into the local view. The roster order is the
/// default slot order; pieces that already hold a slot keep it.
pub fn adopt_roster(pieces: &mut Vec<Piece>, roster: Vec<Piece>, capacity: usize) {
    for (order, piece) in roster.into_iter().enumerate() {
        let color = piece.color;
        let index = match pieces.iter().position(|p| p.id == piece.id) {
            Some(index) => index,
            None => {
                pieces.push(Piece {
                    inventory_index: None,
                    ..piece
                });
                pieces.len() - 1
            }
        };
        if pieces[index].inventory_index.is_some() {
            continue;
        }
        let slot = if slot_owner(pieces, color, order).is_none() {
            Some(order)
        } else {
            lowest_free_slot(pieces, color, capacity)
        };
        pieces[index].inventory_index = slot;
    }
}

/// Gives every unplaced `color` piece without a slot the lowest free one.
pub fn assign_missing_slots(pieces: &mut [Piece], color: Color, capacity: usize) {
    for index in 0..pieces.len() {
        let piece = &pieces[index];
        if piece.color != color || !piece.is_in_inventory() || piece.inventory_index.is_some() {
            continue;
        }
        let slot = lowest_free_slot(pieces, color, capacity);
        pieces[index].inventory_index = slot;
    }
}

/// Unplaced `color` piece currently holding `slot`.
pub fn slot_owner(pieces: &[Piece], color: Color, slot: usize) -> Option<&Piece> {
    pieces.iter().find(|piece| {
        piece.color == color && piece.is_in_inventory() && piece.inventory_index == Some(slot)
    })
}

pub fn lowest_free_slot(pieces: &[Piece], color: Color, capacity: usize) -> Option<usize> {
    (0..capacity).find(|&slot| slot_owner(pieces, color, slot).is_none())
}
