use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use web_time::{Instant, SystemTime, UNIX_EPOCH};

use crate::board::BoardView;
use crate::config::ClientConfig;
use crate::error::{ClientError, ValidationError};
use crate::events::{ActionEvent, ActionKind, EventLog, Outcome};
use crate::inventory::{InventoryMode, InventoryView};
use crate::merge::{adopt_roster, assign_missing_slots, merge_snapshot, slot_owner};
use crate::protocol::{
    ApiCall, Effect, JoinNotice, MoveRequest, PRIVATE_REPLY_TOPIC, Publish, RequestId,
    ResponseOutcome, parse_room_reply, parse_roster, parse_snapshot, rejection,
};
use crate::room_id::{RoomId, RoomIdError};
use crate::setup::{in_camp, random_assignment};
use crate::types::{Color, GameState, GameStatus, Piece, PieceId, PlayerId, Position};

const PLAYER_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const PLAYER_ID_SUFFIX_LEN: usize = 9;

/// `player-` followed by nine base-36 characters.
pub fn generate_player_id<R: Rng + ?Sized>(rng: &mut R) -> PlayerId {
    let suffix: String = (0..PLAYER_ID_SUFFIX_LEN)
        .map(|_| PLAYER_ID_ALPHABET[rng.random_range(0..PLAYER_ID_ALPHABET.len())] as char)
        .collect();
    format!("player-{suffix}")
}

/// Seeded from the wall clock; wasm32-unknown-unknown has no OS entropy.
pub fn clock_seeded_rng() -> SmallRng {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    SmallRng::seed_from_u64(seed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Connection {
    Disconnected,
    Connecting,
    Connected,
}

/// Connection state, then the snapshot status once one has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Disconnected,
    Connecting,
    /// Connected, no snapshot yet.
    Connected,
    Waiting,
    Setup,
    Playing,
    Finished,
}

/// What an accepted action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Sent(RequestId),
    Published,
    Applied,
    Ignored,
}

impl Dispatch {
    pub fn request_id(self) -> Option<RequestId> {
        match self {
            Dispatch::Sent(id) => Some(id),
            _ => None,
        }
    }

    fn outcome(self) -> Outcome {
        match self {
            Dispatch::Sent(_) | Dispatch::Published => Outcome::Sent,
            Dispatch::Applied => Outcome::Applied,
            Dispatch::Ignored => Outcome::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    CreateRoom,
    JoinRoom,
    FetchRoster,
    Place {
        piece_id: PieceId,
        target: Option<Position>,
        slot: Option<usize>,
    },
    Ready,
}

impl Pending {
    fn action(&self) -> ActionKind {
        match self {
            Pending::CreateRoom => ActionKind::CreateRoom,
            Pending::JoinRoom => ActionKind::JoinRoom,
            Pending::FetchRoster => ActionKind::FetchRoster,
            Pending::Place { target: Some(_), .. } => ActionKind::Place,
            Pending::Place { target: None, .. } => ActionKind::ReturnToInventory,
            Pending::Ready => ActionKind::Ready,
        }
    }

    fn fallback_message(&self) -> &'static str {
        match self {
            Pending::CreateRoom => "the server could not create a room",
            Pending::JoinRoom => "room not found or already full",
            Pending::FetchRoster => "could not load your pieces",
            Pending::Place { .. } => "placement rejected",
            Pending::Ready => "ready signal rejected",
        }
    }
}

#[derive(Debug)]
struct InFlight {
    request: Pending,
    sent_at: Instant,
}

enum Reply {
    Response(ResponseOutcome),
    TimedOut,
}

/// Client-side reconciliation engine.
///
/// Owns the merged piece view (authoritative snapshot plus client-local
/// inventory slots), the selection, and the room/subscription bookkeeping.
/// It performs no I/O: every command is queued as an [`Effect`] for the host,
/// which reports results back through the `on_*` methods.
pub struct GameClient {
    config: ClientConfig,
    player_id: PlayerId,
    connection: Connection,
    room_id: Option<RoomId>,
    subscribed_room: Option<RoomId>,
    private_subscribed: bool,
    player_color: Option<Color>,
    state: Option<GameState>,
    roster: Vec<Piece>,
    selected: Option<PieceId>,
    ready_locked: bool,
    in_flight: HashMap<RequestId, InFlight>,
    next_request_id: RequestId,
    effects: Vec<Effect>,
    message: Option<String>,
    log: EventLog,
    rng: SmallRng,
    torn_down: bool,
}

impl GameClient {
    pub fn new(config: ClientConfig) -> Self {
        let mut rng = clock_seeded_rng();
        let player_id = generate_player_id(&mut rng);
        Self::with_player(config, player_id, rng)
    }

    pub fn with_player(config: ClientConfig, player_id: PlayerId, rng: SmallRng) -> Self {
        let log = EventLog::new(config.event_log_capacity);
        Self {
            config,
            player_id,
            connection: Connection::Disconnected,
            room_id: None,
            subscribed_room: None,
            private_subscribed: false,
            player_color: None,
            state: None,
            roster: Vec::new(),
            selected: None,
            ready_locked: false,
            in_flight: HashMap::new(),
            next_request_id: 1,
            effects: Vec::new(),
            message: None,
            log,
            rng,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn phase(&self) -> Phase {
        match self.connection {
            Connection::Disconnected => Phase::Disconnected,
            Connection::Connecting => Phase::Connecting,
            Connection::Connected => match self.state.as_ref().map(|state| state.status) {
                None => Phase::Connected,
                Some(GameStatus::Waiting) => Phase::Waiting,
                Some(GameStatus::Setup) => Phase::Setup,
                Some(GameStatus::Playing) => Phase::Playing,
                Some(GameStatus::Finished) => Phase::Finished,
            },
        }
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.room_id.as_ref()
    }

    pub fn player_color(&self) -> Option<Color> {
        self.player_color
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Merged view: snapshot pieces with local slots, or the roster before
    /// the first snapshot.
    pub fn pieces(&self) -> &[Piece] {
        match &self.state {
            Some(state) => &state.pieces,
            None => &self.roster,
        }
    }

    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.pieces().iter().find(|piece| piece.id == id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_piece(&self) -> Option<&Piece> {
        self.selected.as_deref().and_then(|id| self.piece(id))
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_ready_locked(&self) -> bool {
        self.ready_locked
    }

    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &ActionEvent> {
        self.log.events()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Drains queued effects in emission order.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn board_view(&self) -> BoardView<'_> {
        BoardView {
            pieces: self.pieces(),
            viewer: self.player_color,
            selected: self.selected(),
        }
    }

    pub fn inventory_view(&self) -> InventoryView<'_> {
        let playing = matches!(
            self.state.as_ref().map(|state| state.status),
            Some(GameStatus::Playing | GameStatus::Finished)
        );
        InventoryView {
            pieces: self.pieces(),
            viewer: self.player_color,
            selected: self.selected(),
            mode: InventoryMode::from_playing(playing),
        }
    }

    pub fn status_line(&self) -> String {
        let Some(state) = &self.state else {
            return match self.connection {
                Connection::Connected => "waiting for the match...".to_string(),
                _ => "not connected".to_string(),
            };
        };
        match state.status {
            GameStatus::Waiting => "waiting for an opponent...".to_string(),
            GameStatus::Setup => match self.player_color {
                Some(color) if state.is_ready(color) => {
                    "ready; waiting for the opponent to finish setup".to_string()
                }
                _ => "setup: place your pieces".to_string(),
            },
            GameStatus::Playing => match state.current_turn {
                Some(turn) => format!("current turn: {turn}"),
                None => "playing".to_string(),
            },
            GameStatus::Finished => match state.winner {
                Some(winner) => format!("match over, winner: {winner}"),
                None => "match over".to_string(),
            },
        }
    }

    // --- connection -------------------------------------------------------

    pub fn connect(&mut self) {
        if self.torn_down || self.connection != Connection::Disconnected {
            self.log.record(ActionKind::Connect, Outcome::Ignored, None);
            return;
        }
        self.connection = Connection::Connecting;
        self.effects.push(Effect::Connect {
            url: self.config.ws_url(),
        });
        self.log.record(ActionKind::Connect, Outcome::Sent, None);
    }

    pub fn on_connected(&mut self) {
        if self.torn_down {
            return;
        }
        self.connection = Connection::Connected;
        self.message = Some("connected to the server".to_string());
        if !self.private_subscribed {
            self.effects.push(Effect::Subscribe {
                topic: PRIVATE_REPLY_TOPIC.to_string(),
            });
            self.private_subscribed = true;
        }
        self.sync_subscription();
        self.log.record(ActionKind::Connect, Outcome::Applied, None);
    }

    /// Not retried automatically; the host may call [`GameClient::connect`] again.
    pub fn on_connection_lost(&mut self, reason: &str) {
        if self.torn_down {
            return;
        }
        self.connection = Connection::Disconnected;
        self.subscribed_room = None;
        self.private_subscribed = false;
        self.message = Some(format!("not connected: {reason}"));
        self.log
            .record(ActionKind::Connect, Outcome::Failed(reason.to_string()), None);
    }

    /// Releases subscriptions and closes the connection. Every later inbound
    /// call is ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        if let Some(room) = self.subscribed_room.take() {
            self.effects.push(Effect::Unsubscribe { topic: room.topic() });
        }
        if self.private_subscribed {
            self.effects.push(Effect::Unsubscribe {
                topic: PRIVATE_REPLY_TOPIC.to_string(),
            });
            self.private_subscribed = false;
        }
        if self.connection != Connection::Disconnected {
            self.effects.push(Effect::Disconnect);
            self.connection = Connection::Disconnected;
        }
        self.in_flight.clear();
        self.torn_down = true;
        self.log.record(ActionKind::Teardown, Outcome::Applied, None);
    }

    fn sync_subscription(&mut self) {
        if self.connection != Connection::Connected || self.subscribed_room == self.room_id {
            return;
        }
        if let Some(old) = self.subscribed_room.take() {
            self.effects.push(Effect::Unsubscribe { topic: old.topic() });
        }
        if let Some(room) = &self.room_id {
            self.effects.push(Effect::Subscribe { topic: room.topic() });
            self.subscribed_room = Some(room.clone());
        }
    }

    /// Snapshots only fill an empty room id; a create/join reply may switch
    /// rooms, which drops everything scoped to the old one.
    fn adopt_room(&mut self, room: RoomId, from_reply: bool) {
        match &self.room_id {
            Some(current) if *current == room => return,
            Some(current) if !from_reply => {
                log::warn!("ignoring room id {room} while in {current}");
                return;
            }
            Some(_) => {
                self.state = None;
                self.roster.clear();
                self.selected = None;
                self.ready_locked = false;
                self.player_color = None;
            }
            None => {}
        }
        log::info!("room={room}");
        self.room_id = Some(room);
        self.sync_subscription();
    }

    // --- requests ---------------------------------------------------------

    fn send_request(&mut self, call: ApiCall, request: Pending) -> Dispatch {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight.insert(
            id,
            InFlight {
                request,
                sent_at: Instant::now(),
            },
        );
        self.effects.push(Effect::Request { id, call });
        Dispatch::Sent(id)
    }

    fn in_flight_id(&self, predicate: impl Fn(&Pending) -> bool) -> Option<RequestId> {
        self.in_flight
            .iter()
            .filter(|(_, flight)| predicate(&flight.request))
            .map(|(&id, _)| id)
            .min()
    }

    fn boundary(
        &mut self,
        action: ActionKind,
        result: Result<Dispatch, ClientError>,
    ) -> Result<Dispatch, ClientError> {
        match &result {
            Ok(dispatch) => self.log.record(action, dispatch.outcome(), None),
            Err(err) => self.fail(action, err, None),
        }
        result
    }

    fn fail(&mut self, action: ActionKind, err: &ClientError, latency: Option<web_time::Duration>) {
        let text = err.to_string();
        let outcome = match err {
            ClientError::Rejected { .. } | ClientError::Validation(_) => Outcome::Rejected(text.clone()),
            _ => Outcome::Failed(text.clone()),
        };
        self.log.record(action, outcome, latency);
        self.message = Some(text);
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.torn_down || self.connection != Connection::Connected {
            return Err(ClientError::NotConnected);
        }
        Ok(())
    }

    fn require_room(&self) -> Result<RoomId, ClientError> {
        self.room_id
            .clone()
            .ok_or(ClientError::Validation(ValidationError::NoRoom))
    }

    fn require_color(&self) -> Result<Color, ClientError> {
        self.player_color
            .ok_or(ClientError::Validation(ValidationError::NoColor))
    }

    fn require_status(&self, status: GameStatus) -> Result<(), ClientError> {
        match &self.state {
            Some(state) if state.status == status => Ok(()),
            _ => Err(ValidationError::WrongPhase.into()),
        }
    }

    pub fn create_room(&mut self) -> Result<Dispatch, ClientError> {
        let result = self.try_create_room();
        self.boundary(ActionKind::CreateRoom, result)
    }

    fn try_create_room(&mut self) -> Result<Dispatch, ClientError> {
        self.ensure_connected()?;
        if let Some(id) = self.in_flight_id(|p| matches!(p, Pending::CreateRoom | Pending::JoinRoom)) {
            return Ok(Dispatch::Sent(id));
        }
        self.message = Some("creating a room...".to_string());
        let call = ApiCall::CreateRoom {
            player_id: self.player_id.clone(),
        };
        Ok(self.send_request(call, Pending::CreateRoom))
    }

    pub fn join_room(&mut self, room_id: &str) -> Result<Dispatch, ClientError> {
        let result = self.try_join_room(room_id);
        self.boundary(ActionKind::JoinRoom, result)
    }

    fn try_join_room(&mut self, room_id: &str) -> Result<Dispatch, ClientError> {
        self.ensure_connected()?;
        let room_id = RoomId::parse(room_id).map_err(|err| match err {
            RoomIdError::Empty => ValidationError::EmptyRoomId,
            other => ValidationError::InvalidRoomId(other.to_string()),
        })?;
        if let Some(id) = self.in_flight_id(|p| matches!(p, Pending::CreateRoom | Pending::JoinRoom)) {
            return Ok(Dispatch::Sent(id));
        }
        self.message = Some(format!("joining room {room_id}..."));
        let call = ApiCall::JoinRoom {
            room_id,
            player_id: self.player_id.clone(),
        };
        Ok(self.send_request(call, Pending::JoinRoom))
    }

    // --- inbound ----------------------------------------------------------

    pub fn on_response(&mut self, id: RequestId, outcome: ResponseOutcome) {
        self.resolve(id, Reply::Response(outcome));
    }

    /// Fails every request older than the configured timeout; their late
    /// replies are then ignored. Returns how many expired.
    pub fn tick(&mut self) -> usize {
        let Some(timeout) = self.config.request_timeout() else {
            return 0;
        };
        let mut expired: Vec<RequestId> = self
            .in_flight
            .iter()
            .filter(|(_, flight)| flight.sent_at.elapsed() >= timeout)
            .map(|(&id, _)| id)
            .collect();
        expired.sort_unstable();
        for &id in &expired {
            self.resolve(id, Reply::TimedOut);
        }
        expired.len()
    }

    fn resolve(&mut self, id: RequestId, reply: Reply) {
        if self.torn_down {
            return;
        }
        let Some(flight) = self.in_flight.remove(&id) else {
            log::debug!("dropping reply for unknown request {id}");
            return;
        };
        let latency = flight.sent_at.elapsed();
        let action = flight.request.action();
        let body = match reply {
            Reply::Response(ResponseOutcome::Success(body)) => Ok(body),
            Reply::Response(ResponseOutcome::Rejected { status, body }) => {
                Err(rejection(status, &body, flight.request.fallback_message()))
            }
            Reply::Response(ResponseOutcome::TransportError(reason)) => {
                Err(ClientError::Transport(reason))
            }
            Reply::TimedOut => Err(ClientError::TimedOut),
        };
        let result = match flight.request {
            Pending::CreateRoom | Pending::JoinRoom => self.finish_room(body),
            Pending::FetchRoster => self.finish_roster(body),
            Pending::Place {
                piece_id,
                target,
                slot,
            } => self.finish_place(body, &piece_id, target, slot),
            Pending::Ready => self.finish_ready(body),
        };
        match result {
            Ok(()) => self.log.record(action, Outcome::Applied, Some(latency)),
            Err(err) => self.fail(action, &err, Some(latency)),
        }
    }

    fn finish_room(&mut self, body: Result<String, ClientError>) -> Result<(), ClientError> {
        let reply = parse_room_reply(&body?)?;
        let room = reply.room_id.clone();
        self.adopt_room(room.clone(), true);
        if let Some(color) = reply.player_color {
            self.player_color = Some(color);
        }
        if let Some(state) = reply.state {
            self.apply_state(state);
        }
        self.message = Some(reply.message.unwrap_or_else(|| format!("joined room {room}")));

        if self.connection == Connection::Connected {
            self.effects.push(Effect::Publish(Publish::Join(JoinNotice {
                player_id: self.player_id.clone(),
                room_id: room.clone(),
            })));
        }
        let call = ApiCall::FetchRoster {
            room_id: room,
            player_id: self.player_id.clone(),
        };
        self.send_request(call, Pending::FetchRoster);
        Ok(())
    }

    fn finish_roster(&mut self, body: Result<String, ClientError>) -> Result<(), ClientError> {
        let roster = parse_roster(&body?)?;
        if self.player_color.is_none() {
            self.player_color = roster.first().map(|piece| piece.color);
        }
        let capacity = self.config.inventory.capacity();
        let pieces = match &mut self.state {
            Some(state) => &mut state.pieces,
            None => &mut self.roster,
        };
        adopt_roster(pieces, roster, capacity);
        Ok(())
    }

    fn finish_place(
        &mut self,
        body: Result<String, ClientError>,
        piece_id: &str,
        target: Option<Position>,
        slot: Option<usize>,
    ) -> Result<(), ClientError> {
        body?;
        if let Some(piece) = self.piece_mut(piece_id) {
            piece.position = target;
            if slot.is_some() {
                piece.inventory_index = slot;
            }
        }
        Ok(())
    }

    fn finish_ready(&mut self, body: Result<String, ClientError>) -> Result<(), ClientError> {
        if let Err(err) = body {
            self.ready_locked = false;
            return Err(err);
        }
        self.message = Some("ready; waiting for the opponent".to_string());
        Ok(())
    }

    /// Snapshot from the private reply queue.
    pub fn on_private_reply(&mut self, body: &str) {
        self.on_snapshot_text(body);
    }

    /// Snapshot from the room broadcast topic.
    pub fn on_broadcast(&mut self, body: &str) {
        self.on_snapshot_text(body);
    }

    fn on_snapshot_text(&mut self, body: &str) {
        if self.torn_down {
            return;
        }
        match parse_snapshot(body) {
            Ok(state) => self.apply_snapshot(state),
            Err(err) => self.fail(ActionKind::Snapshot, &err, None),
        }
    }

    /// The single mutation entry point for server state.
    pub fn apply_snapshot(&mut self, state: GameState) {
        if self.torn_down {
            return;
        }
        if let Ok(room) = RoomId::parse(&state.room_id) {
            match &self.room_id {
                None => self.adopt_room(room, false),
                Some(current) if *current != room => {
                    self.log.record(ActionKind::Snapshot, Outcome::Ignored, None);
                    return;
                }
                Some(_) => {}
            }
        }
        self.apply_state(state);
        self.log.record(ActionKind::Snapshot, Outcome::Applied, None);
    }

    fn apply_state(&mut self, state: GameState) {
        let previous_status = self.state.as_ref().map(|s| s.status);
        let previous = match self.state.take() {
            Some(old) => old.pieces,
            None => std::mem::take(&mut self.roster),
        };
        let mut merged = merge_snapshot(&previous, state);
        log::debug!(
            "snapshot status={:?} pieces={} turn={:?}",
            merged.status,
            merged.pieces.len(),
            merged.current_turn
        );

        if let Some(color) = self.player_color {
            if merged.status == GameStatus::Setup {
                assign_missing_slots(&mut merged.pieces, color, self.config.inventory.capacity());
                if merged.is_ready(color) {
                    self.ready_locked = true;
                }
            }
        }
        if merged.status != GameStatus::Setup {
            self.ready_locked = false;
        }

        if let Some(id) = &self.selected {
            let still_valid = previous_status == Some(merged.status)
                && merged.pieces.iter().any(|piece| {
                    piece.id == *id && (!piece.captured || Some(piece.color) != self.player_color)
                });
            if !still_valid {
                self.selected = None;
            }
        }
        if let Some(message) = merged.message.as_ref().filter(|m| !m.trim().is_empty()) {
            self.message = Some(message.clone());
        }
        self.state = Some(merged);
    }

    fn piece_mut(&mut self, id: &str) -> Option<&mut Piece> {
        let pieces = match &mut self.state {
            Some(state) => &mut state.pieces,
            None => &mut self.roster,
        };
        pieces.iter_mut().find(|piece| piece.id == id)
    }

    // --- selection and clicks ---------------------------------------------

    /// Toggles: selecting the selected piece clears the selection.
    pub fn select(&mut self, piece_id: &str) -> Result<Dispatch, ClientError> {
        let result = if self.piece(piece_id).is_some() {
            self.toggle_selection(piece_id);
            Ok(Dispatch::Applied)
        } else {
            Err(ValidationError::UnknownPiece(piece_id.to_string()).into())
        };
        self.boundary(ActionKind::Select, result)
    }

    fn toggle_selection(&mut self, piece_id: &str) {
        if self.selected.as_deref() == Some(piece_id) {
            self.selected = None;
        } else {
            self.selected = Some(piece_id.to_string());
        }
    }

    /// Logical click on the board, as emitted by the board renderer.
    ///
    /// Clicking the selected piece deselects it. In SETUP any other occupied
    /// cell re-targets an existing selection and never becomes a placement;
    /// an empty camp cell places the selection. In PLAYING an own piece
    /// re-targets, while any other cell is the move target.
    pub fn on_board_click(&mut self, position: Position) -> Result<Dispatch, ClientError> {
        let action = match self.state.as_ref().map(|s| s.status) {
            Some(GameStatus::Playing) => ActionKind::Move,
            _ => ActionKind::Place,
        };
        let result = self.try_board_click(position);
        self.boundary(action, result)
    }

    fn try_board_click(&mut self, position: Position) -> Result<Dispatch, ClientError> {
        let Some(state) = &self.state else {
            return Ok(Dispatch::Ignored);
        };
        let status = state.status;
        let clicked = state
            .piece_at(position)
            .map(|piece| (piece.id.clone(), piece.color));
        let color = self.player_color;

        if let Some((id, _)) = &clicked {
            if self.selected.as_deref() == Some(id.as_str()) {
                self.selected = None;
                return Ok(Dispatch::Applied);
            }
        }

        match status {
            GameStatus::Setup => match clicked {
                Some((id, owner)) if Some(owner) == color => {
                    self.selected = Some(id);
                    Ok(Dispatch::Applied)
                }
                Some((id, _)) if self.selected.is_some() => {
                    self.selected = Some(id);
                    Ok(Dispatch::Applied)
                }
                Some(_) => Ok(Dispatch::Ignored),
                None => match self.selected.clone() {
                    Some(id) => self.try_place(&id, position),
                    None => Ok(Dispatch::Ignored),
                },
            },
            GameStatus::Playing => match clicked {
                Some((id, owner)) if Some(owner) == color => {
                    self.selected = Some(id);
                    Ok(Dispatch::Applied)
                }
                _ if self.selected.is_some() => self.try_move(position),
                _ => Ok(Dispatch::Ignored),
            },
            GameStatus::Waiting | GameStatus::Finished => Ok(Dispatch::Ignored),
        }
    }

    /// Slot click as emitted by the inventory renderer.
    pub fn on_inventory_click(
        &mut self,
        piece_id: Option<&str>,
        slot: usize,
    ) -> Result<Dispatch, ClientError> {
        let result = self.try_inventory_click(piece_id, slot);
        let action = match &result {
            Ok(Dispatch::Sent(_)) => ActionKind::ReturnToInventory,
            _ if piece_id.is_some() => ActionKind::Select,
            _ => ActionKind::Rearrange,
        };
        self.boundary(action, result)
    }

    fn try_inventory_click(
        &mut self,
        piece_id: Option<&str>,
        slot: usize,
    ) -> Result<Dispatch, ClientError> {
        let Some(status) = self.state.as_ref().map(|s| s.status) else {
            return Ok(Dispatch::Ignored);
        };
        if let Some(id) = piece_id {
            if self.piece(id).is_none() {
                return Err(ValidationError::UnknownPiece(id.to_string()).into());
            }
            self.toggle_selection(id);
            return Ok(Dispatch::Applied);
        }
        let Some(selected) = self.selected.clone() else {
            return Ok(Dispatch::Ignored);
        };
        match status {
            GameStatus::Setup => self.try_return_to_inventory(&selected, slot),
            GameStatus::Playing | GameStatus::Finished => self.try_move_trophy(&selected, slot),
            GameStatus::Waiting => Ok(Dispatch::Ignored),
        }
    }

    fn try_move_trophy(&mut self, piece_id: &str, slot: usize) -> Result<Dispatch, ClientError> {
        let capacity = self.config.inventory.capacity();
        if slot >= capacity {
            return Err(ValidationError::SlotOutOfRange { slot, capacity }.into());
        }
        let viewer = self.player_color;
        let view = self.inventory_view();
        if let Some(occupant) = view.piece_at(slot) {
            if occupant.id != piece_id {
                return Err(ValidationError::SlotOccupied(slot).into());
            }
        }
        let Some(piece) = self.piece_mut(piece_id) else {
            return Err(ValidationError::UnknownPiece(piece_id.to_string()).into());
        };
        if !piece.captured || Some(piece.color) == viewer {
            self.selected = None;
            return Ok(Dispatch::Ignored);
        }
        piece.inventory_index = Some(slot);
        self.selected = None;
        Ok(Dispatch::Applied)
    }

    // --- actions ----------------------------------------------------------

    /// Moves the selected board piece to `target`. The selection is cleared
    /// as soon as the command is issued; the next snapshot decides the result.
    pub fn move_selected(&mut self, target: Position) -> Result<Dispatch, ClientError> {
        let result = self.try_move(target);
        self.boundary(ActionKind::Move, result)
    }

    fn try_move(&mut self, target: Position) -> Result<Dispatch, ClientError> {
        self.ensure_connected()?;
        self.require_status(GameStatus::Playing)?;
        let room_id = self.require_room()?;
        let selected = self
            .selected
            .take()
            .ok_or(ClientError::Validation(ValidationError::NoSelection))?;
        let from = self
            .piece(&selected)
            .filter(|piece| piece.is_on_board())
            .and_then(|piece| piece.position)
            .ok_or(ClientError::Validation(ValidationError::NoSelection))?;
        self.effects.push(Effect::Publish(Publish::Move(MoveRequest {
            room_id,
            player_id: self.player_id.clone(),
            from,
            to: target,
        })));
        Ok(Dispatch::Published)
    }

    fn check_setup_piece(&self, piece_id: &str) -> Result<(RoomId, Color, &Piece), ClientError> {
        self.ensure_connected()?;
        let room_id = self.require_room()?;
        let color = self.require_color()?;
        self.require_status(GameStatus::Setup)?;
        if self.ready_locked {
            return Err(ValidationError::ReadyLocked.into());
        }
        let piece = self
            .piece(piece_id)
            .ok_or_else(|| ValidationError::UnknownPiece(piece_id.to_string()))?;
        if piece.color != color {
            return Err(ValidationError::NotOwnPiece(piece_id.to_string()).into());
        }
        if piece.captured {
            return Err(ValidationError::PieceCaptured(piece_id.to_string()).into());
        }
        Ok((room_id, color, piece))
    }

    fn placement_in_flight(&self, piece_id: &str) -> bool {
        self.in_flight_id(|p| matches!(p, Pending::Place { piece_id: id, .. } if id == piece_id))
            .is_some()
    }

    /// Places a piece on `target`, which must lie in the player's camp.
    pub fn place(&mut self, piece_id: &str, target: Position) -> Result<Dispatch, ClientError> {
        let result = self.try_place(piece_id, target);
        self.boundary(ActionKind::Place, result)
    }

    fn try_place(&mut self, piece_id: &str, target: Position) -> Result<Dispatch, ClientError> {
        let (room_id, color, _) = self.check_setup_piece(piece_id)?;
        if !in_camp(color, target) {
            return Err(ValidationError::OutsideCamp {
                color,
                position: target,
            }
            .into());
        }
        if self.placement_in_flight(piece_id) {
            return Err(ValidationError::PlacementPending(piece_id.to_string()).into());
        }
        self.selected = None;
        let call = ApiCall::Place {
            room_id,
            player_id: self.player_id.clone(),
            piece_id: piece_id.to_string(),
            position: Some(target),
        };
        Ok(self.send_request(
            call,
            Pending::Place {
                piece_id: piece_id.to_string(),
                target: Some(target),
                slot: None,
            },
        ))
    }

    /// Sends a placed piece back to inventory `slot`. For a piece that is
    /// already unplaced this only moves it between slots, locally.
    pub fn return_to_inventory(
        &mut self,
        piece_id: &str,
        slot: usize,
    ) -> Result<Dispatch, ClientError> {
        let result = self.try_return_to_inventory(piece_id, slot);
        let action = match &result {
            Ok(Dispatch::Applied) => ActionKind::Rearrange,
            _ => ActionKind::ReturnToInventory,
        };
        self.boundary(action, result)
    }

    fn try_return_to_inventory(
        &mut self,
        piece_id: &str,
        slot: usize,
    ) -> Result<Dispatch, ClientError> {
        let (room_id, color, piece) = self.check_setup_piece(piece_id)?;
        let on_board = piece.position.is_some();
        let capacity = self.config.inventory.capacity();
        if slot >= capacity {
            return Err(ValidationError::SlotOutOfRange { slot, capacity }.into());
        }
        if slot_owner(self.pieces(), color, slot).is_some_and(|owner| owner.id != piece_id) {
            return Err(ValidationError::SlotOccupied(slot).into());
        }
        self.selected = None;

        if !on_board {
            if let Some(piece) = self.piece_mut(piece_id) {
                piece.inventory_index = Some(slot);
            }
            return Ok(Dispatch::Applied);
        }
        if self.placement_in_flight(piece_id) {
            return Err(ValidationError::PlacementPending(piece_id.to_string()).into());
        }
        let call = ApiCall::Place {
            room_id,
            player_id: self.player_id.clone(),
            piece_id: piece_id.to_string(),
            position: None,
        };
        Ok(self.send_request(
            call,
            Pending::Place {
                piece_id: piece_id.to_string(),
                target: None,
                slot: Some(slot),
            },
        ))
    }

    /// Places every unplaced piece on a distinct random free camp cell.
    /// Individual rejections are logged and skipped. Returns how many
    /// placements were sent.
    pub fn randomize(&mut self) -> Result<usize, ClientError> {
        let result = self.try_randomize();
        match &result {
            Ok(_) => self.log.record(ActionKind::Randomize, Outcome::Sent, None),
            Err(err) => self.fail(ActionKind::Randomize, err, None),
        }
        result
    }

    fn try_randomize(&mut self) -> Result<usize, ClientError> {
        self.ensure_connected()?;
        self.require_room()?;
        let color = self.require_color()?;
        self.require_status(GameStatus::Setup)?;
        if self.ready_locked {
            return Err(ValidationError::ReadyLocked.into());
        }
        let pieces = match &self.state {
            Some(state) => &state.pieces,
            None => &self.roster,
        };
        let plan = random_assignment(pieces, color, &mut self.rng);

        let mut sent = 0;
        for (piece_id, cell) in plan {
            match self.try_place(&piece_id, cell) {
                Ok(_) => {
                    sent += 1;
                    self.log.record(ActionKind::Place, Outcome::Sent, None);
                }
                Err(err) => {
                    self.log
                        .record(ActionKind::Place, Outcome::Rejected(err.to_string()), None);
                }
            }
        }
        Ok(sent)
    }

    /// Signals readiness once every own piece is placed. Repeated calls while
    /// a signal is in flight or acknowledged do nothing.
    pub fn ready(&mut self) -> Result<Dispatch, ClientError> {
        let result = self.try_ready();
        self.boundary(ActionKind::Ready, result)
    }

    fn try_ready(&mut self) -> Result<Dispatch, ClientError> {
        self.ensure_connected()?;
        let room_id = self.require_room()?;
        let color = self.require_color()?;
        self.require_status(GameStatus::Setup)?;
        if self.ready_locked {
            return Ok(Dispatch::Ignored);
        }
        let remaining = self
            .pieces()
            .iter()
            .filter(|piece| piece.color == color && piece.is_in_inventory())
            .count();
        if remaining > 0 {
            return Err(ValidationError::PiecesNotPlaced { remaining }.into());
        }
        self.ready_locked = true;
        self.selected = None;
        let call = ApiCall::Ready {
            room_id,
            player_id: self.player_id.clone(),
        };
        Ok(self.send_request(call, Pending::Ready))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::setup::camp_cells;

    const ROOM: &str = "room-1";

    fn client() -> GameClient {
        GameClient::with_player(
            ClientConfig::default(),
            "player-test".to_string(),
            SmallRng::seed_from_u64(5),
        )
    }

    fn cell(x: u8, y: u8) -> Position {
        Position::cell(x, y).unwrap()
    }

    fn requests(effects: &[Effect]) -> Vec<(RequestId, ApiCall)> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Request { id, call } => Some((*id, call.clone())),
                _ => None,
            })
            .collect()
    }

    fn roster_json(color: &str, count: usize) -> String {
        let pieces: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                json!({
                    "id": format!("{}-{i}", color.to_lowercase()),
                    "color": color,
                    "type": {"symbol": "兵", "koreanName": "병"},
                    "position": null,
                })
            })
            .collect();
        serde_json::Value::Array(pieces).to_string()
    }

    fn snapshot(status: &str, pieces: serde_json::Value) -> String {
        json!({
            "roomId": ROOM,
            "status": status,
            "currentTurn": "RED",
            "pieces": pieces,
            "redPlayerReady": false,
            "bluePlayerReady": false,
        })
        .to_string()
    }

    /// Connected, joined as `color`, roster of `count` pieces loaded, SETUP
    /// snapshot (without the roster) applied, effects drained.
    fn in_setup(color: &str, count: usize) -> GameClient {
        let mut c = client();
        c.connect();
        c.on_connected();
        let join = c.join_room(ROOM).unwrap().request_id().unwrap();
        c.on_response(
            join,
            ResponseOutcome::Success(json!({"roomId": ROOM, "playerColor": color}).to_string()),
        );
        let effects = c.take_effects();
        let (roster_id, _) = requests(&effects)
            .into_iter()
            .find(|(_, call)| matches!(call, ApiCall::FetchRoster { .. }))
            .unwrap();
        c.on_response(roster_id, ResponseOutcome::Success(roster_json(color, count)));
        c.on_broadcast(&snapshot("SETUP", json!([])));
        c.take_effects();
        c
    }

    #[test]
    fn connect_flow_subscribes_private_queue() {
        let mut c = client();
        assert_eq!(c.phase(), Phase::Disconnected);
        c.connect();
        assert_eq!(c.phase(), Phase::Connecting);
        assert_eq!(
            c.take_effects(),
            vec![Effect::Connect {
                url: "http://localhost:7184/ws".to_string()
            }]
        );

        c.on_connected();
        assert_eq!(c.phase(), Phase::Connected);
        assert_eq!(
            c.take_effects(),
            vec![Effect::Subscribe {
                topic: PRIVATE_REPLY_TOPIC.to_string()
            }]
        );
    }

    #[test]
    fn join_reply_assigns_room_subscribes_and_bootstraps() {
        let mut c = client();
        c.connect();
        c.on_connected();
        c.take_effects();

        let id = c.join_room(" room-1 ").unwrap().request_id().unwrap();
        c.take_effects();
        c.on_response(
            id,
            ResponseOutcome::Success(json!({"roomId": ROOM, "playerColor": "BLUE"}).to_string()),
        );

        let effects = c.take_effects();
        let room = RoomId::parse(ROOM).unwrap();
        assert_eq!(effects[0], Effect::Subscribe { topic: room.topic() });
        assert_eq!(
            effects[1],
            Effect::Publish(Publish::Join(JoinNotice {
                player_id: "player-test".to_string(),
                room_id: room.clone(),
            }))
        );
        assert!(matches!(
            &effects[2],
            Effect::Request { call: ApiCall::FetchRoster { room_id, .. }, .. } if *room_id == room
        ));
        assert_eq!(c.room_id(), Some(&room));
        assert_eq!(c.player_color(), Some(Color::Blue));
    }

    #[test]
    fn private_reply_racing_ahead_does_not_assign_room_twice() {
        let mut c = client();
        c.connect();
        c.on_connected();
        let id = c.create_room().unwrap().request_id().unwrap();
        c.take_effects();

        c.on_private_reply(&snapshot("WAITING", json!([])));
        c.on_response(
            id,
            ResponseOutcome::Success(json!({"roomId": ROOM, "playerColor": "RED"}).to_string()),
        );

        let subscribes = c
            .take_effects()
            .into_iter()
            .filter(|effect| matches!(effect, Effect::Subscribe { .. }))
            .count();
        assert_eq!(subscribes, 1);
        assert_eq!(c.phase(), Phase::Waiting);
    }

    #[test]
    fn joining_another_room_resubscribes() {
        let mut c = client();
        c.connect();
        c.on_connected();
        let first = c.join_room("alpha").unwrap().request_id().unwrap();
        c.on_response(first, ResponseOutcome::Success(r#"{"roomId":"alpha"}"#.to_string()));
        c.take_effects();

        let second = c.join_room("beta").unwrap().request_id().unwrap();
        c.take_effects();
        c.on_response(second, ResponseOutcome::Success(r#"{"roomId":"beta"}"#.to_string()));
        let effects = c.take_effects();
        assert_eq!(
            effects[0],
            Effect::Unsubscribe {
                topic: "/topic/game.alpha".to_string()
            }
        );
        assert_eq!(
            effects[1],
            Effect::Subscribe {
                topic: "/topic/game.beta".to_string()
            }
        );
    }

    #[test]
    fn room_subscription_waits_for_connection() {
        let mut c = client();
        c.apply_snapshot(parse_snapshot(&snapshot("WAITING", json!([]))).unwrap());
        assert!(c.take_effects().is_empty());

        c.connect();
        c.on_connected();
        let effects = c.take_effects();
        assert!(effects.contains(&Effect::Subscribe {
            topic: "/topic/game.room-1".to_string()
        }));
    }

    #[test]
    fn snapshots_for_other_rooms_are_ignored() {
        let mut c = in_setup("RED", 2);
        let foreign = json!({"roomId": "other", "status": "PLAYING", "pieces": []}).to_string();
        c.on_broadcast(&foreign);
        assert_eq!(c.phase(), Phase::Setup);
    }

    #[test]
    fn malformed_join_reply_is_reported_without_assigning_room() {
        let mut c = client();
        c.connect();
        c.on_connected();
        let id = c.join_room(ROOM).unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::Success(r#"{"message":"ok"}"#.to_string()));
        assert!(c.room_id().is_none());
        assert_eq!(c.message(), Some("malformed response: reply has no room id"));
    }

    #[test]
    fn rejected_join_surfaces_server_message() {
        let mut c = client();
        c.connect();
        c.on_connected();
        let id = c.join_room(ROOM).unwrap().request_id().unwrap();
        c.on_response(
            id,
            ResponseOutcome::Rejected {
                status: 404,
                body: String::new(),
            },
        );
        assert_eq!(
            c.message(),
            Some("server rejected the request: room not found or already full")
        );
        assert_eq!(c.pending_requests(), 0);
    }

    #[test]
    fn blank_room_id_is_rejected_locally() {
        let mut c = client();
        c.connect();
        c.on_connected();
        c.take_effects();
        assert_eq!(
            c.join_room("   "),
            Err(ClientError::Validation(ValidationError::EmptyRoomId))
        );
        assert!(c.take_effects().is_empty());
    }

    #[test]
    fn room_id_with_path_characters_never_reaches_a_url() {
        let mut c = client();
        c.connect();
        c.on_connected();
        c.take_effects();
        let err = c.join_room("abc/../../admin?x=1").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidRoomId(_))
        ));
        assert!(c.take_effects().is_empty());
        assert_eq!(c.pending_requests(), 0);
    }

    #[test]
    fn roster_populates_inventory_slots_in_order() {
        let c = in_setup("RED", 3);
        let slots: Vec<(&str, Option<usize>)> = c
            .pieces()
            .iter()
            .map(|p| (p.id.as_str(), p.inventory_index))
            .collect();
        assert_eq!(
            slots,
            vec![("red-0", Some(0)), ("red-1", Some(1)), ("red-2", Some(2))]
        );
        assert_eq!(c.inventory_view().slots().len(), 3);
    }

    #[test]
    fn roster_color_is_adopted_when_reply_omits_it() {
        let mut c = client();
        c.connect();
        c.on_connected();
        let id = c.join_room(ROOM).unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::Success(json!({"roomId": ROOM}).to_string()));
        let (roster_id, _) = requests(&c.take_effects()).pop().unwrap();
        c.on_response(roster_id, ResponseOutcome::Success(roster_json("BLUE", 1)));
        assert_eq!(c.player_color(), Some(Color::Blue));
    }

    #[test]
    fn selecting_twice_clears_selection() {
        let mut c = in_setup("RED", 2);
        c.select("red-1").unwrap();
        assert_eq!(c.selected(), Some("red-1"));
        c.select("red-1").unwrap();
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn inventory_click_toggles_and_retargets() {
        let mut c = in_setup("RED", 2);
        c.on_inventory_click(Some("red-0"), 0).unwrap();
        c.on_inventory_click(Some("red-1"), 1).unwrap();
        assert_eq!(c.selected(), Some("red-1"));
        c.on_inventory_click(Some("red-1"), 1).unwrap();
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn placement_outside_camp_never_reaches_the_network() {
        let mut c = in_setup("RED", 1);
        for x in [5u8, 8, 9] {
            let err = c.place("red-0", cell(x, 3)).unwrap_err();
            assert!(matches!(
                err,
                ClientError::Validation(ValidationError::OutsideCamp { .. })
            ));
        }
        assert!(c.place("red-0", Position::LINK_UPPER).is_err());
        assert!(c.take_effects().is_empty());
        assert!(c.message().unwrap().contains("own camp"));
    }

    #[test]
    fn placement_inside_camp_is_forwarded() {
        let mut c = in_setup("RED", 1);
        let dispatch = c.place("red-0", cell(3, 6)).unwrap();
        let effects = c.take_effects();
        assert_eq!(
            effects,
            vec![Effect::Request {
                id: dispatch.request_id().unwrap(),
                call: ApiCall::Place {
                    room_id: RoomId::parse(ROOM).unwrap(),
                    player_id: "player-test".to_string(),
                    piece_id: "red-0".to_string(),
                    position: Some(cell(3, 6)),
                },
            }]
        );
    }

    #[test]
    fn blue_camp_excludes_its_front_line() {
        let mut c = in_setup("BLUE", 1);
        assert!(c.place("blue-0", cell(8, 0)).is_err());
        assert!(c.place("blue-0", cell(13, 6)).is_ok());
    }

    #[test]
    fn board_click_places_selected_inventory_piece() {
        let mut c = in_setup("RED", 2);
        c.on_inventory_click(Some("red-1"), 1).unwrap();
        let dispatch = c.on_board_click(cell(0, 0)).unwrap();
        assert!(matches!(dispatch, Dispatch::Sent(_)));
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn successful_placement_moves_piece_and_keeps_slot() {
        let mut c = in_setup("RED", 2);
        let id = c.place("red-1", cell(2, 2)).unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::Success("{}".to_string()));

        let piece = c.piece("red-1").unwrap();
        assert_eq!(piece.position, Some(cell(2, 2)));
        assert_eq!(piece.inventory_index, Some(1));

        // The next SETUP push still omits the roster; the piece stays placed.
        c.on_broadcast(&snapshot("SETUP", json!([])));
        assert_eq!(c.piece("red-1").unwrap().position, Some(cell(2, 2)));
        assert_eq!(c.inventory_view().slots().len(), 1);
    }

    #[test]
    fn rejected_placement_changes_nothing() {
        let mut c = in_setup("RED", 1);
        let id = c.place("red-0", cell(2, 2)).unwrap().request_id().unwrap();
        c.on_response(
            id,
            ResponseOutcome::Rejected {
                status: 409,
                body: r#"{"message":"cell occupied"}"#.to_string(),
            },
        );
        assert_eq!(c.piece("red-0").unwrap().position, None);
        assert_eq!(c.message(), Some("server rejected the request: cell occupied"));
    }

    #[test]
    fn second_placement_for_same_piece_waits_for_the_first() {
        let mut c = in_setup("RED", 1);
        c.place("red-0", cell(0, 0)).unwrap();
        assert_eq!(
            c.place("red-0", cell(0, 1)),
            Err(ClientError::Validation(ValidationError::PlacementPending(
                "red-0".to_string()
            )))
        );
    }

    #[test]
    fn board_click_on_own_piece_retargets_instead_of_placing() {
        let mut c = in_setup("RED", 2);
        let id = c.place("red-0", cell(1, 1)).unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::Success("{}".to_string()));
        c.take_effects();

        c.select("red-1").unwrap();
        c.on_board_click(cell(1, 1)).unwrap();
        assert_eq!(c.selected(), Some("red-0"));
        assert!(c.take_effects().is_empty());

        c.on_board_click(cell(1, 1)).unwrap();
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn setup_click_on_opponent_piece_retargets_selection() {
        let mut c = in_setup("RED", 1);
        c.on_broadcast(&snapshot(
            "SETUP",
            json!([{"id": "blue-0", "color": "BLUE", "position": {"x": 9, "y": 2}}]),
        ));
        c.take_effects();

        assert_eq!(c.on_board_click(cell(9, 2)), Ok(Dispatch::Ignored));
        assert_eq!(c.selected(), None);

        c.select("red-0").unwrap();
        assert_eq!(c.on_board_click(cell(9, 2)), Ok(Dispatch::Applied));
        assert_eq!(c.selected(), Some("blue-0"));
        assert!(c.take_effects().is_empty());
        assert_eq!(c.piece("red-0").unwrap().position, None);
    }

    #[test]
    fn return_to_inventory_clears_position_and_takes_chosen_slot() {
        let mut c = in_setup("RED", 2);
        let id = c.place("red-0", cell(4, 4)).unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::Success("{}".to_string()));
        c.take_effects();

        c.on_board_click(cell(4, 4)).unwrap();
        let dispatch = c.on_inventory_click(None, 20).unwrap();
        let effects = c.take_effects();
        assert!(matches!(
            &effects[0],
            Effect::Request { call: ApiCall::Place { position: None, .. }, .. }
        ));

        c.on_response(dispatch.request_id().unwrap(), ResponseOutcome::Success("{}".to_string()));
        let piece = c.piece("red-0").unwrap();
        assert_eq!(piece.position, None);
        assert_eq!(piece.inventory_index, Some(20));
    }

    #[test]
    fn inventory_pieces_rearrange_locally() {
        let mut c = in_setup("RED", 2);
        c.select("red-0").unwrap();
        assert_eq!(c.on_inventory_click(None, 1), Err(ClientError::Validation(ValidationError::SlotOccupied(1))));
        assert_eq!(c.selected(), Some("red-0"));
        assert_eq!(c.on_inventory_click(None, 30), Ok(Dispatch::Applied));
        assert_eq!(c.piece("red-0").unwrap().inventory_index, Some(30));
        assert!(c.take_effects().is_empty());
    }

    #[test]
    fn server_return_to_inventory_never_stacks_two_pieces_on_one_slot() {
        let mut c = in_setup("RED", 2);
        let id = c.place("red-0", cell(1, 1)).unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::Success("{}".to_string()));
        assert_eq!(c.return_to_inventory("red-1", 0), Ok(Dispatch::Applied));

        c.on_broadcast(&snapshot(
            "SETUP",
            json!([{"id": "red-0", "color": "RED", "position": null}]),
        ));

        let mut slots: Vec<usize> = c
            .inventory_view()
            .slots()
            .into_iter()
            .map(|(slot, _)| slot)
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1]);
        assert_eq!(c.piece("red-1").unwrap().inventory_index, Some(0));
        assert_eq!(c.piece("red-0").unwrap().inventory_index, Some(1));
    }

    #[test]
    fn randomize_places_every_unplaced_piece_on_distinct_camp_cells() {
        let mut c = in_setup("BLUE", 16);
        let sent = c.randomize().unwrap();
        assert_eq!(sent, 16);

        let placements: Vec<(PieceId, Position)> = requests(&c.take_effects())
            .into_iter()
            .filter_map(|(_, call)| match call {
                ApiCall::Place {
                    piece_id,
                    position: Some(position),
                    ..
                } => Some((piece_id, position)),
                _ => None,
            })
            .collect();
        assert_eq!(placements.len(), 16);
        let distinct: HashSet<(u64, u64)> = placements
            .iter()
            .map(|(_, p)| (p.x().to_bits(), p.y().to_bits()))
            .collect();
        assert_eq!(distinct.len(), 16);
        assert!(placements
            .iter()
            .all(|(_, p)| camp_cells(Color::Blue).contains(p)));
        let order: Vec<String> = placements.into_iter().map(|(id, _)| id).collect();
        let expected: Vec<String> = (0..16).map(|i| format!("blue-{i}")).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn randomize_skips_pieces_that_cannot_be_placed() {
        let mut c = in_setup("RED", 4);
        c.place("red-2", cell(0, 0)).unwrap();
        c.take_effects();

        assert_eq!(c.randomize(), Ok(3));
        assert_eq!(requests(&c.take_effects()).len(), 3);
    }

    #[test]
    fn ready_requires_every_piece_placed() {
        let mut c = in_setup("RED", 2);
        assert_eq!(
            c.ready(),
            Err(ClientError::Validation(ValidationError::PiecesNotPlaced { remaining: 2 }))
        );
        assert!(c.take_effects().is_empty());
    }

    fn all_placed(color: &str, count: usize) -> GameClient {
        let mut c = in_setup(color, count);
        c.randomize().unwrap();
        for (id, _) in requests(&c.take_effects()) {
            c.on_response(id, ResponseOutcome::Success("{}".to_string()));
        }
        c
    }

    #[test]
    fn ready_is_sent_once_and_locks_placement() {
        let mut c = all_placed("RED", 3);
        let first = c.ready().unwrap();
        assert!(matches!(first, Dispatch::Sent(_)));
        assert_eq!(c.ready(), Ok(Dispatch::Ignored));
        assert_eq!(requests(&c.take_effects()).len(), 1);

        assert_eq!(
            c.return_to_inventory("red-0", 10),
            Err(ClientError::Validation(ValidationError::ReadyLocked))
        );
        assert_eq!(c.randomize(), Err(ClientError::Validation(ValidationError::ReadyLocked)));

        c.on_response(first.request_id().unwrap(), ResponseOutcome::Success("{}".to_string()));
        assert_eq!(c.ready(), Ok(Dispatch::Ignored));
    }

    #[test]
    fn rejected_ready_can_be_retried() {
        let mut c = all_placed("RED", 1);
        let id = c.ready().unwrap().request_id().unwrap();
        c.on_response(id, ResponseOutcome::TransportError("offline".to_string()));
        assert!(!c.is_ready_locked());
        assert!(matches!(c.ready(), Ok(Dispatch::Sent(_))));
    }

    #[test]
    fn leaving_setup_releases_ready_lock() {
        let mut c = all_placed("RED", 1);
        c.ready().unwrap();
        c.on_broadcast(&snapshot(
            "PLAYING",
            json!([{"id": "red-0", "color": "RED", "position": {"x": 0, "y": 0}}]),
        ));
        assert!(!c.is_ready_locked());
        assert_eq!(c.phase(), Phase::Playing);
    }

    fn playing() -> GameClient {
        let mut c = in_setup("RED", 0);
        c.on_broadcast(&snapshot(
            "PLAYING",
            json!([
                {"id": "r", "color": "RED", "type": {"symbol": "車"}, "position": {"x": 4, "y": 1}},
                {"id": "b", "color": "BLUE", "type": null, "position": {"x": 9, "y": 1}},
                {"id": "t", "color": "BLUE", "type": {"symbol": "卒"}, "position": null, "captured": true},
            ]),
        ));
        c.take_effects();
        c
    }

    #[test]
    fn move_publishes_and_clears_selection() {
        let mut c = playing();
        c.on_board_click(cell(4, 1)).unwrap();
        assert_eq!(c.selected(), Some("r"));

        assert_eq!(c.on_board_click(cell(9, 1)), Ok(Dispatch::Published));
        assert_eq!(c.selected(), None);
        assert_eq!(
            c.take_effects(),
            vec![Effect::Publish(Publish::Move(MoveRequest {
                room_id: RoomId::parse(ROOM).unwrap(),
                player_id: "player-test".to_string(),
                from: cell(4, 1),
                to: cell(9, 1),
            }))]
        );
    }

    #[test]
    fn opponent_piece_cannot_be_selected() {
        let mut c = playing();
        assert_eq!(c.on_board_click(cell(9, 1)), Ok(Dispatch::Ignored));
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn trophies_show_in_play_mode_and_can_be_rearranged() {
        let mut c = playing();
        let view = c.inventory_view();
        assert_eq!(view.mode, InventoryMode::Play);
        assert_eq!(view.piece_at(0).map(|p| p.id.as_str()), Some("t"));

        c.on_inventory_click(Some("t"), 0).unwrap();
        assert_eq!(c.on_inventory_click(None, 12), Ok(Dispatch::Applied));
        assert_eq!(c.piece("t").unwrap().inventory_index, Some(12));

        // Slot survives the next push.
        c.on_broadcast(&snapshot(
            "PLAYING",
            json!([{"id": "t", "color": "BLUE", "position": null, "captured": true}]),
        ));
        assert_eq!(c.piece("t").unwrap().inventory_index, Some(12));
    }

    #[test]
    fn playing_snapshot_drops_pieces_it_omits() {
        let mut c = playing();
        c.on_broadcast(&snapshot(
            "PLAYING",
            json!([{"id": "r", "color": "RED", "position": {"x": 4, "y": 2}}]),
        ));
        assert_eq!(c.pieces().len(), 1);
    }

    #[test]
    fn disconnected_actions_are_no_ops() {
        let mut c = playing();
        c.on_board_click(cell(4, 1)).unwrap();
        c.on_connection_lost("socket closed");
        assert_eq!(c.phase(), Phase::Disconnected);

        assert_eq!(c.move_selected(cell(4, 2)), Err(ClientError::NotConnected));
        assert!(c.take_effects().is_empty());
        assert_eq!(c.message(), Some("not connected to the server"));
    }

    #[test]
    fn teardown_releases_subscriptions_and_ignores_late_replies() {
        let mut c = in_setup("RED", 1);
        let id = c.place("red-0", cell(0, 0)).unwrap().request_id().unwrap();
        c.take_effects();

        c.teardown();
        assert_eq!(
            c.take_effects(),
            vec![
                Effect::Unsubscribe {
                    topic: "/topic/game.room-1".to_string()
                },
                Effect::Unsubscribe {
                    topic: PRIVATE_REPLY_TOPIC.to_string()
                },
                Effect::Disconnect,
            ]
        );

        c.on_response(id, ResponseOutcome::Success("{}".to_string()));
        c.on_broadcast(&snapshot("PLAYING", json!([])));
        assert_eq!(c.piece("red-0").unwrap().position, None);
        assert!(c.is_torn_down());
    }

    #[test]
    fn tick_expires_hung_requests() {
        let config = ClientConfig {
            request_timeout_ms: Some(0),
            ..ClientConfig::default()
        };
        let mut c = GameClient::with_player(config, "p".to_string(), SmallRng::seed_from_u64(1));
        c.connect();
        c.on_connected();
        let id = c.create_room().unwrap().request_id().unwrap();

        assert_eq!(c.tick(), 1);
        assert_eq!(c.message(), Some("request timed out"));
        c.on_response(id, ResponseOutcome::Success(json!({"roomId": ROOM}).to_string()));
        assert!(c.room_id().is_none());
    }

    #[test]
    fn duplicate_room_request_is_coalesced() {
        let mut c = client();
        c.connect();
        c.on_connected();
        let first = c.create_room().unwrap();
        let second = c.create_room().unwrap();
        assert_eq!(first, second);
        assert_eq!(requests(&c.take_effects()).len(), 1);
    }

    #[test]
    fn status_line_follows_snapshot() {
        let mut c = playing();
        assert_eq!(c.status_line(), "current turn: RED");
        c.on_broadcast(
            &json!({"roomId": ROOM, "status": "FINISHED", "winner": "BLUE", "pieces": []}).to_string(),
        );
        assert_eq!(c.status_line(), "match over, winner: BLUE");
    }

    #[test]
    fn snapshot_message_becomes_status_message() {
        let mut c = in_setup("RED", 1);
        c.on_broadcast(
            &json!({"roomId": ROOM, "status": "SETUP", "pieces": [], "message": "opponent is ready"})
                .to_string(),
        );
        assert_eq!(c.message(), Some("opponent is ready"));
    }

    #[test]
    fn player_ids_are_prefixed_base36() {
        let mut rng = SmallRng::seed_from_u64(3);
        let id = generate_player_id(&mut rng);
        assert!(id.starts_with("player-"));
        assert_eq!(id.len(), "player-".len() + 9);
        assert!(id["player-".len()..]
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));
    }

    #[test]
    fn action_boundary_records_events() {
        let mut c = in_setup("RED", 1);
        let _ = c.place("red-0", cell(5, 0));
        let last = c.events().last().unwrap();
        assert_eq!(last.action, ActionKind::Place);
        assert!(matches!(last.outcome, Outcome::Rejected(_)));
    }
}
