use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::board::BoardRenderer;
use crate::canvas::DisplayList;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::ActionEvent;
use crate::game::{Dispatch, GameClient, Phase, clock_seeded_rng};
use crate::geometry::Point;
use crate::inventory::InventoryRenderer;
use crate::protocol::{Effect, Method, RequestId, ResponseOutcome};
use crate::types::{Color, GameStatus, Piece, Position};
use crate::visibility::is_hidden;

/// Effect as the JS host executes it: requests already resolved to HTTP,
/// publishes already encoded.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum HostEffect {
    Connect {
        url: String,
    },
    Request {
        id: RequestId,
        method: Method,
        url: String,
        body: Option<String>,
    },
    Publish {
        destination: &'static str,
        body: String,
    },
    Subscribe {
        topic: String,
    },
    Unsubscribe {
        topic: String,
    },
    Disconnect,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PieceView<'a> {
    id: &'a str,
    color: Color,
    /// Absent whenever the viewer may not see the type.
    symbol: Option<&'a str>,
    name: Option<&'a str>,
    position: Option<Position>,
    captured: bool,
    revealed: bool,
    hidden: bool,
    inventory_index: Option<usize>,
}

impl<'a> PieceView<'a> {
    fn new(piece: &'a Piece, viewer: Option<Color>) -> Self {
        let hidden = is_hidden(piece, viewer);
        let kind = piece.kind.as_ref().filter(|_| !hidden);
        Self {
            id: &piece.id,
            color: piece.color,
            symbol: kind.map(|k| k.symbol.as_str()),
            name: kind.map(|k| k.display_name.as_str()),
            position: piece.position,
            captured: piece.captured,
            revealed: piece.revealed,
            hidden,
            inventory_index: piece.inventory_index,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientView<'a> {
    player_id: &'a str,
    phase: Phase,
    room_id: Option<&'a str>,
    player_color: Option<Color>,
    status: Option<GameStatus>,
    current_turn: Option<Color>,
    winner: Option<Color>,
    status_line: String,
    message: Option<&'a str>,
    selected: Option<&'a str>,
    ready_locked: bool,
    pieces: Vec<PieceView<'a>>,
}

/// Browser-facing handle around [`GameClient`]. The page owns the socket and
/// `fetch`; it drains [`JanggiClient::take_effects`] after every call and
/// reports results back through the `on_*` methods.
#[wasm_bindgen]
pub struct JanggiClient {
    client: GameClient,
    board: BoardRenderer,
    inventory: InventoryRenderer,
}

#[wasm_bindgen]
impl JanggiClient {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<JanggiClient, JsValue> {
        let config = ClientConfig::from_json(config_json).map_err(to_js_error)?;
        Ok(Self::from_client(GameClient::new(config)))
    }

    /// Restores a previously generated player id, e.g. from session storage.
    pub fn with_player_id(config_json: &str, player_id: &str) -> Result<JanggiClient, JsValue> {
        let config = ClientConfig::from_json(config_json).map_err(to_js_error)?;
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(JsValue::from_str("player id is empty"));
        }
        let client = GameClient::with_player(config, player_id.to_string(), clock_seeded_rng());
        Ok(Self::from_client(client))
    }

    pub fn player_id(&self) -> String {
        self.client.player_id().to_string()
    }

    pub fn connect(&mut self) {
        self.client.connect();
    }

    pub fn on_connected(&mut self) {
        self.client.on_connected();
    }

    pub fn on_connection_lost(&mut self, reason: &str) {
        self.client.on_connection_lost(reason);
    }

    pub fn on_private_reply(&mut self, body: &str) {
        self.client.on_private_reply(body);
    }

    pub fn on_broadcast(&mut self, body: &str) {
        self.client.on_broadcast(body);
    }

    pub fn on_response_ok(&mut self, id: u32, body: String) {
        self.client
            .on_response(RequestId::from(id), ResponseOutcome::Success(body));
    }

    pub fn on_response_err(&mut self, id: u32, status: u16, body: String) {
        self.client.on_response(
            RequestId::from(id),
            ResponseOutcome::Rejected { status, body },
        );
    }

    pub fn on_request_failed(&mut self, id: u32, reason: String) {
        self.client.on_response(
            RequestId::from(id),
            ResponseOutcome::TransportError(reason),
        );
    }

    pub fn create_room(&mut self) -> bool {
        accepted(self.client.create_room())
    }

    pub fn join_room(&mut self, room_id: &str) -> bool {
        accepted(self.client.join_room(room_id))
    }

    /// Pointer and origin in client coordinates (`event.clientX`, canvas
    /// bounding rect). Clicks that land on no position do nothing.
    pub fn board_click(&mut self, px: f64, py: f64, origin_x: f64, origin_y: f64) -> bool {
        let Some(position) = self
            .board
            .click(Point::new(px, py), Point::new(origin_x, origin_y))
        else {
            return false;
        };
        accepted(self.client.on_board_click(position))
    }

    pub fn inventory_click(&mut self, px: f64, py: f64, origin_x: f64, origin_y: f64) -> bool {
        let view = self.client.inventory_view();
        let Some((piece, slot)) =
            self.inventory
                .click(&view, Point::new(px, py), Point::new(origin_x, origin_y))
        else {
            return false;
        };
        let piece_id = piece.map(|p| p.id.clone());
        accepted(self.client.on_inventory_click(piece_id.as_deref(), slot))
    }

    /// Number of placements sent, or -1 when the action was refused.
    pub fn randomize(&mut self) -> i32 {
        match self.client.randomize() {
            Ok(sent) => i32::try_from(sent).unwrap_or(i32::MAX),
            Err(_) => -1,
        }
    }

    pub fn ready(&mut self) -> bool {
        accepted(self.client.ready())
    }

    pub fn tick(&mut self) -> u32 {
        u32::try_from(self.client.tick()).unwrap_or(u32::MAX)
    }

    pub fn teardown(&mut self) {
        self.client.teardown();
    }

    pub fn take_effects(&mut self) -> JsValue {
        let effects = self.client.take_effects();
        let mut host = Vec::with_capacity(effects.len());
        for effect in effects {
            match self.to_host(effect) {
                Ok(effect) => host.push(effect),
                Err((id, err)) => {
                    log::error!("could not encode effect: {err}");
                    if let Some(id) = id {
                        self.client
                            .on_response(id, ResponseOutcome::TransportError(err.to_string()));
                    }
                }
            }
        }
        to_js(&host)
    }

    pub fn view(&self) -> JsValue {
        let client = &self.client;
        let viewer = client.player_color();
        let state = client.state();
        let view = ClientView {
            player_id: client.player_id(),
            phase: client.phase(),
            room_id: client.room_id().map(|room| room.as_str()),
            player_color: viewer,
            status: state.map(|s| s.status),
            current_turn: state.and_then(|s| s.current_turn),
            winner: state.and_then(|s| s.winner),
            status_line: client.status_line(),
            message: client.message(),
            selected: client.selected(),
            ready_locked: client.is_ready_locked(),
            pieces: client
                .pieces()
                .iter()
                .map(|piece| PieceView::new(piece, viewer))
                .collect(),
        };
        to_js(&view)
    }

    pub fn board_draw_list(&self) -> JsValue {
        let mut list = DisplayList::new();
        self.board.draw(&mut list, &self.client.board_view());
        to_js(&list)
    }

    pub fn inventory_draw_list(&self) -> JsValue {
        let mut list = DisplayList::new();
        self.inventory.draw(&mut list, &self.client.inventory_view());
        to_js(&list)
    }

    pub fn events(&self) -> JsValue {
        let events: Vec<&ActionEvent> = self.client.events().collect();
        to_js(&events)
    }

    pub fn board_size(&self) -> Vec<f64> {
        let (width, height) = self.board.layout().surface_size();
        vec![width, height]
    }

    pub fn inventory_size(&self) -> Vec<f64> {
        let (width, height) = self.inventory.layout().surface_size();
        vec![width, height]
    }
}

impl JanggiClient {
    fn from_client(client: GameClient) -> Self {
        let config = client.config();
        Self {
            board: BoardRenderer::new(config.board),
            inventory: InventoryRenderer::new(config.inventory),
            client,
        }
    }

    fn to_host(&self, effect: Effect) -> Result<HostEffect, (Option<RequestId>, ClientError)> {
        let host = match effect {
            Effect::Connect { url } => HostEffect::Connect { url },
            Effect::Request { id, call } => {
                let request = call
                    .to_http(&self.client.config().server_url)
                    .map_err(|err| (Some(id), err))?;
                HostEffect::Request {
                    id,
                    method: request.method,
                    url: request.url,
                    body: request.body,
                }
            }
            Effect::Publish(frame) => HostEffect::Publish {
                destination: frame.destination(),
                body: frame.body().map_err(|err| (None, err))?,
            },
            Effect::Subscribe { topic } => HostEffect::Subscribe { topic },
            Effect::Unsubscribe { topic } => HostEffect::Unsubscribe { topic },
            Effect::Disconnect => HostEffect::Disconnect,
        };
        Ok(host)
    }
}

fn accepted(result: Result<Dispatch, ClientError>) -> bool {
    result.is_ok()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|err| {
        log::error!("serialization failed: {err}");
        JsValue::NULL
    })
}

fn to_js_error(err: ClientError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
