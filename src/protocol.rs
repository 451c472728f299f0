//! Wire records exchanged with the game server, and the effects the engine
//! asks its host to perform. All payloads are JSON text.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::room_id::RoomId;
use crate::types::{Color, GameState, Piece, PieceId, PlayerId, Position};

pub type RequestId = u64;

pub const PRIVATE_REPLY_TOPIC: &str = "/user/queue/reply";
pub const JOIN_DESTINATION: &str = "/app/game.join";
pub const MOVE_DESTINATION: &str = "/app/game.move";

/// Request/response calls for room lifecycle and setup.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateRoom {
        player_id: PlayerId,
    },
    JoinRoom {
        room_id: RoomId,
        player_id: PlayerId,
    },
    FetchRoster {
        room_id: RoomId,
        player_id: PlayerId,
    },
    Place {
        room_id: RoomId,
        player_id: PlayerId,
        piece_id: PieceId,
        /// `None` returns the piece to the inventory.
        position: Option<Position>,
    },
    Ready {
        room_id: RoomId,
        player_id: PlayerId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerBody<'a> {
    player_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlacementBody<'a> {
    player_id: &'a str,
    piece_id: &'a str,
    position: Option<Position>,
}

impl ApiCall {
    pub fn to_http(&self, server_url: &str) -> Result<HttpRequest, ClientError> {
        let base = format!("{server_url}/api/game/rooms");
        let request = match self {
            ApiCall::CreateRoom { player_id } => HttpRequest {
                method: Method::Post,
                url: base,
                body: Some(serde_json::to_string(&PlayerBody { player_id })?),
            },
            ApiCall::JoinRoom { room_id, player_id } => HttpRequest {
                method: Method::Post,
                url: format!("{base}/{room_id}/join"),
                body: Some(serde_json::to_string(&PlayerBody { player_id })?),
            },
            ApiCall::FetchRoster { room_id, player_id } => HttpRequest {
                method: Method::Get,
                url: format!("{base}/{room_id}/pieces?playerId={player_id}"),
                body: None,
            },
            ApiCall::Place {
                room_id,
                player_id,
                piece_id,
                position,
            } => HttpRequest {
                method: Method::Post,
                url: format!("{base}/{room_id}/place"),
                body: Some(serde_json::to_string(&PlacementBody {
                    player_id,
                    piece_id,
                    position: *position,
                })?),
            },
            ApiCall::Ready { room_id, player_id } => HttpRequest {
                method: Method::Post,
                url: format!("{base}/{room_id}/ready"),
                body: Some(serde_json::to_string(&PlayerBody { player_id })?),
            },
        };
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinNotice {
    pub player_id: PlayerId,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub from: Position,
    pub to: Position,
}

/// Frames published on the persistent connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Publish {
    Join(JoinNotice),
    Move(MoveRequest),
}

impl Publish {
    pub fn destination(&self) -> &'static str {
        match self {
            Publish::Join(_) => JOIN_DESTINATION,
            Publish::Move(_) => MOVE_DESTINATION,
        }
    }

    pub fn body(&self) -> Result<String, ClientError> {
        let body = match self {
            Publish::Join(notice) => serde_json::to_string(notice)?,
            Publish::Move(request) => serde_json::to_string(request)?,
        };
        Ok(body)
    }
}

/// Work the engine hands to its host, drained in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Connect { url: String },
    Request { id: RequestId, call: ApiCall },
    Publish(Publish),
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Disconnect,
}

/// What came back for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// 2xx with its body.
    Success(String),
    /// Non-success status with its body.
    Rejected { status: u16, body: String },
    /// The request never completed.
    TransportError(String),
}

/// Create/join reply. When it embeds a snapshot, that is returned as well.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomReply {
    pub room_id: RoomId,
    pub player_color: Option<Color>,
    pub message: Option<String>,
    pub state: Option<GameState>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomTicket {
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    player_color: Option<Color>,
    #[serde(default)]
    message: Option<String>,
}

pub fn parse_room_reply(body: &str) -> Result<RoomReply, ClientError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let ticket = RoomTicket::deserialize(&value)?;
    let room_id = ticket
        .room_id
        .as_deref()
        .and_then(|id| RoomId::parse(id).ok())
        .ok_or_else(|| ClientError::Malformed("reply has no room id".to_string()))?;
    let state = if value.get("status").is_some() {
        GameState::deserialize(&value).ok()
    } else {
        None
    };
    Ok(RoomReply {
        room_id,
        player_color: ticket.player_color,
        message: ticket.message,
        state,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RosterBody {
    List(Vec<Piece>),
    Wrapped { pieces: Vec<Piece> },
}

/// Ordered roster; the index of each piece is its default inventory slot.
pub fn parse_roster(body: &str) -> Result<Vec<Piece>, ClientError> {
    match serde_json::from_str::<RosterBody>(body)? {
        RosterBody::List(pieces) | RosterBody::Wrapped { pieces } => Ok(pieces),
    }
}

pub fn parse_snapshot(body: &str) -> Result<GameState, ClientError> {
    Ok(serde_json::from_str(body)?)
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// `message` from a JSON body, if there is a non-blank one.
pub fn body_message(body: &str) -> Option<String> {
    serde_json::from_str::<MessageBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

pub fn rejection(status: u16, body: &str, fallback: &str) -> ClientError {
    ClientError::Rejected {
        status,
        message: body_message(body).unwrap_or_else(|| fallback.to_string()),
    }
}
