use wasm_bindgen::prelude::*;

pub mod board;
pub mod canvas;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod geometry;
pub mod inventory;
pub mod merge;
pub mod protocol;
pub mod room_id;
pub mod setup;
pub mod types;
pub mod visibility;
pub mod wasm;

pub use config::ClientConfig;
pub use error::{ClientError, ValidationError};
pub use game::{Dispatch, GameClient, Phase};
pub use protocol::{Effect, ResponseOutcome};
pub use wasm::JanggiClient;

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}
