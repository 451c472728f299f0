use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type PieceId = String;
pub type PlayerId = String;

/// Columns per board half (x: 0..=5 on the left, 8..=13 on the right).
pub const BOARD_COLS: u8 = 6;
/// Rows per board half (y: 0..=6).
pub const BOARD_ROWS: u8 = 7;
pub const LEFT_MIN_X: u8 = 0;
pub const LEFT_MAX_X: u8 = 5;
pub const RIGHT_MIN_X: u8 = 8;
pub const RIGHT_MAX_X: u8 = 13;
/// Link points sit halfway across the gap between x=5 and x=8.
pub const LINK_X: f64 = 6.5;
pub const LINK_UPPER_Y: f64 = 1.5;
pub const LINK_LOWER_Y: f64 = 4.5;

/// Side of the match. RED owns the left board, BLUE the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Red,
    Blue,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("RED"),
            Color::Blue => f.write_str("BLUE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    Upper,
    Lower,
}

/// Classified form of a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Left { x: u8, y: u8 },
    Link(Link),
    Right { x: u8, y: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionError {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) is not a board position", self.x, self.y)
    }
}

impl std::error::Error for PositionError {}

/// A logical board coordinate.
///
/// Contract: always one of the 42 left-board cells, the 42 right-board cells,
/// or one of the two link points at `x = 6.5`. Construction through
/// [`Position::new`] or deserialization enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition", into = "RawPosition")]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const LINK_UPPER: Position = Position {
        x: LINK_X,
        y: LINK_UPPER_Y,
    };
    pub const LINK_LOWER: Position = Position {
        x: LINK_X,
        y: LINK_LOWER_Y,
    };

    pub fn new(x: f64, y: f64) -> Result<Self, PositionError> {
        let position = Self { x, y };
        if position.site().is_some() {
            Ok(position)
        } else {
            Err(PositionError { x, y })
        }
    }

    /// Grid cell on either board; `None` for gap columns or out-of-range values.
    pub fn cell(x: u8, y: u8) -> Option<Self> {
        Self::new(f64::from(x), f64::from(y)).ok()
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn site(&self) -> Option<Site> {
        if self.x == LINK_X {
            return if self.y == LINK_UPPER_Y {
                Some(Site::Link(Link::Upper))
            } else if self.y == LINK_LOWER_Y {
                Some(Site::Link(Link::Lower))
            } else {
                None
            };
        }
        if self.x.fract() != 0.0 || self.y.fract() != 0.0 {
            return None;
        }
        if !(0.0..f64::from(BOARD_ROWS)).contains(&self.y) {
            return None;
        }
        let y = self.y as u8;
        if (f64::from(LEFT_MIN_X)..=f64::from(LEFT_MAX_X)).contains(&self.x) {
            Some(Site::Left { x: self.x as u8, y })
        } else if (f64::from(RIGHT_MIN_X)..=f64::from(RIGHT_MAX_X)).contains(&self.x) {
            Some(Site::Right { x: self.x as u8, y })
        } else {
            None
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self.site(), Some(Site::Link(_)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Serialize, Deserialize)]
struct RawPosition {
    #[serde(serialize_with = "serialize_coord")]
    x: f64,
    #[serde(serialize_with = "serialize_coord")]
    y: f64,
}

impl TryFrom<RawPosition> for Position {
    type Error = PositionError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.x, raw.y)
    }
}

impl From<Position> for RawPosition {
    fn from(position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
        }
    }
}

// Whole coordinates go out as integers so the server can bind them to int fields.
fn serialize_coord<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Deserialize)]
struct LoosePosition {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
}

/// `null`, a missing field, or `{x: null, y: null}` all mean "in inventory".
/// A position with only one coordinate is rejected.
fn deserialize_placement<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LoosePosition>::deserialize(deserializer)? {
        None | Some(LoosePosition { x: None, y: None }) => Ok(None),
        Some(LoosePosition {
            x: Some(x),
            y: Some(y),
        }) => Position::new(x, y).map(Some).map_err(D::Error::custom),
        Some(LoosePosition { x, y }) => Err(D::Error::custom(format!(
            "position needs both coordinates, got x={x:?} y={y:?}"
        ))),
    }
}

/// Immutable piece descriptor. Movement semantics are owned by the server and
/// kept opaque in `rules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceType {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "koreanName", default)]
    pub display_name: String,
    #[serde(flatten)]
    pub rules: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub id: PieceId,
    pub color: Color,
    #[serde(rename = "type", default)]
    pub kind: Option<PieceType>,
    #[serde(default, deserialize_with = "deserialize_placement")]
    pub position: Option<Position>,
    #[serde(default)]
    pub captured: bool,
    #[serde(default)]
    pub revealed: bool,
    /// Client-local slot in the inventory grid. Never read from the wire.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub inventory_index: Option<usize>,
}

impl Piece {
    /// Placed and still alive.
    pub fn is_on_board(&self) -> bool {
        !self.captured && self.position.is_some()
    }

    /// Not yet placed during setup.
    pub fn is_in_inventory(&self) -> bool {
        !self.captured && self.position.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Waiting,
    Setup,
    Playing,
    Finished,
}

/// Authoritative snapshot pushed by the server; replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub room_id: String,
    pub status: GameStatus,
    #[serde(default)]
    pub current_turn: Option<Color>,
    #[serde(default)]
    pub pieces: Vec<Piece>,
    #[serde(default)]
    pub red_player_ready: bool,
    #[serde(default)]
    pub blue_player_ready: bool,
    #[serde(default)]
    pub winner: Option<Color>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GameState {
    pub fn is_ready(&self, color: Color) -> bool {
        match color {
            Color::Red => self.red_player_ready,
            Color::Blue => self.blue_player_ready,
        }
    }

    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.pieces.iter().find(|piece| piece.id == id)
    }

    pub fn piece_at(&self, position: Position) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|piece| !piece.captured && piece.position == Some(position))
    }
}
