use std::fmt;

use serde::{Deserialize, Serialize};

/// Characters a room id may contain. The id is used verbatim as a URL path
/// segment and a topic suffix.
fn is_room_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

/// Server-assigned room identifier: surrounding whitespace is trimmed, then
/// only ASCII letters, digits, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(value: &str) -> Result<Self, RoomIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RoomIdError::Empty);
        }
        if let Some((index, ch)) = trimmed
            .chars()
            .enumerate()
            .find(|&(_, ch)| !is_room_id_char(ch))
        {
            return Err(RoomIdError::InvalidCharacter { ch, index });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Broadcast topic carrying this room's snapshots.
    pub fn topic(&self) -> String {
        format!("/topic/game.{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RoomId {
    type Err = RoomIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomIdError {
    Empty,
    InvalidCharacter { ch: char, index: usize },
}

impl fmt::Display for RoomIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomIdError::Empty => f.write_str("room id is empty"),
            RoomIdError::InvalidCharacter { ch, index } => {
                write!(f, "invalid character {ch:?} at position {index}")
            }
        }
    }
}

impl std::error::Error for RoomIdError {}
