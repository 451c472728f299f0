use thiserror::Error;

use crate::types::{Color, Position};

/// Failures caught before anything is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{color} may only place pieces in its own camp, not at {position}")]
    OutsideCamp { color: Color, position: Position },
    #[error("that action is not available right now")]
    WrongPhase,
    #[error("no piece is selected")]
    NoSelection,
    #[error("unknown piece {0}")]
    UnknownPiece(String),
    #[error("piece {0} does not belong to you")]
    NotOwnPiece(String),
    #[error("piece {0} has been captured")]
    PieceCaptured(String),
    #[error("inventory slot {slot} is outside the {capacity}-slot grid")]
    SlotOutOfRange { slot: usize, capacity: usize },
    #[error("inventory slot {0} is already occupied")]
    SlotOccupied(usize),
    #[error("{remaining} piece(s) still need to be placed")]
    PiecesNotPlaced { remaining: usize },
    #[error("you are ready; placement is locked until the match starts")]
    ReadyLocked,
    #[error("a placement for piece {0} is already in flight")]
    PlacementPending(String),
    #[error("not in a room yet")]
    NoRoom,
    #[error("your color has not been assigned yet")]
    NoColor,
    #[error("enter a room id")]
    EmptyRoomId,
    #[error("invalid room id: {0}")]
    InvalidRoomId(String),
}

/// Every failure the client can surface. Nothing here is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("not connected to the server")]
    NotConnected,
    #[error("server rejected the request: {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    TimedOut,
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_local(&self) -> bool {
        matches!(self, ClientError::Validation(_) | ClientError::NotConnected)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Malformed(err.to_string())
    }
}
