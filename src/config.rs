use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::ClientError;
use crate::geometry::{BoardLayout, InventoryLayout};

/// Host-supplied settings. Every field has a default, so a partial JSON
/// document (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub server_url: String,
    pub ws_path: String,
    pub board: BoardLayout,
    pub inventory: InventoryLayout,
    /// `None` waits forever for a reply.
    pub request_timeout_ms: Option<u64>,
    pub event_log_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:7184".to_string(),
            ws_path: "/ws".to_string(),
            board: BoardLayout::default(),
            inventory: InventoryLayout::default(),
            request_timeout_ms: Some(10_000),
            event_log_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// The document must be a JSON object; absent fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ClientError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|err| ClientError::Config(err.to_string()))?;
        if !value.is_object() {
            return Err(ClientError::Config("expected a JSON object".to_string()));
        }
        let config: Self =
            serde_json::from_value(value).map_err(|err| ClientError::Config(err.to_string()))?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self, ClientError> {
        self.server_url = self.server_url.trim().trim_end_matches('/').to_string();
        if self.server_url.is_empty() {
            return Err(ClientError::Config("server_url is empty".to_string()));
        }
        if self.board.cell <= 0.0 || self.inventory.cell <= 0.0 {
            return Err(ClientError::Config("cell size must be positive".to_string()));
        }
        if self.inventory.rows == 0 || self.inventory.cols == 0 {
            return Err(ClientError::Config("inventory grid is empty".to_string()));
        }
        if !self.ws_path.starts_with('/') {
            self.ws_path.insert(0, '/');
        }
        Ok(self)
    }

    pub fn ws_url(&self) -> String {
        format!("{}{}", self.server_url, self.ws_path)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
