use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use web_time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Connect,
    CreateRoom,
    JoinRoom,
    FetchRoster,
    Select,
    Move,
    Place,
    ReturnToInventory,
    Rearrange,
    Randomize,
    Ready,
    Snapshot,
    Teardown,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Connect => "connect",
            ActionKind::CreateRoom => "create_room",
            ActionKind::JoinRoom => "join_room",
            ActionKind::FetchRoster => "fetch_roster",
            ActionKind::Select => "select",
            ActionKind::Move => "move",
            ActionKind::Place => "place",
            ActionKind::ReturnToInventory => "return_to_inventory",
            ActionKind::Rearrange => "rearrange",
            ActionKind::Randomize => "randomize",
            ActionKind::Ready => "ready",
            ActionKind::Snapshot => "snapshot",
            ActionKind::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum Outcome {
    /// Command handed to the transport.
    Sent,
    /// Local or server-confirmed effect applied.
    Applied,
    /// Nothing to do (no-op click, duplicate signal, late reply).
    Ignored,
    Rejected(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    pub action: ActionKind,
    pub outcome: Outcome,
    pub latency_ms: Option<f64>,
}

/// Bounded, oldest-first record of what happened at the action boundary.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<ActionEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn record(&mut self, action: ActionKind, outcome: Outcome, latency: Option<Duration>) {
        let latency_ms = latency.map(|d| d.as_micros() as f64 / 1000.0);
        match &outcome {
            Outcome::Rejected(reason) | Outcome::Failed(reason) => {
                log::warn!("action={action} outcome={outcome:?} latency_ms={latency_ms:?} reason={reason}");
            }
            Outcome::Ignored => log::debug!("action={action} outcome=ignored"),
            _ => log::info!("action={action} outcome={outcome:?} latency_ms={latency_ms:?}"),
        }
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(ActionEvent {
            action,
            outcome,
            latency_ms,
        });
    }

    pub fn events(&self) -> impl Iterator<Item = &ActionEvent> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&ActionEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_events() {
        let mut log = EventLog::new(2);
        log.record(ActionKind::Place, Outcome::Sent, None);
        log.record(ActionKind::Place, Outcome::Applied, Some(Duration::from_millis(12)));
        log.record(ActionKind::Ready, Outcome::Rejected("nope".into()), None);

        let actions: Vec<(ActionKind, &Outcome)> =
            log.events().map(|e| (e.action, &e.outcome)).collect();
        assert_eq!(
            actions,
            vec![
                (ActionKind::Place, &Outcome::Applied),
                (ActionKind::Ready, &Outcome::Rejected("nope".into())),
            ]
        );
        assert_eq!(log.events().next().unwrap().latency_ms, Some(12.0));
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut log = EventLog::new(0);
        log.record(ActionKind::Move, Outcome::Sent, None);
        assert!(log.is_empty());
    }

    #[test]
    fn events_serialize_with_tagged_outcome() {
        let event = ActionEvent {
            action: ActionKind::ReturnToInventory,
            outcome: Outcome::Failed("timeout".into()),
            latency_ms: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "returnToInventory");
        assert_eq!(json["outcome"]["kind"], "failed");
        assert_eq!(json["outcome"]["detail"], "timeout");
    }
}
