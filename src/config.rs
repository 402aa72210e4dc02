use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";
pub const BASE_URL_ENV: &str = "CHAT_BASE_URL";
pub const CSRF_TOKEN_ENV: &str = "CHAT_CSRF_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the chat API, e.g. `http://127.0.0.1:8000/chat/`.
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub message_poll_ms: u64,
    pub roster_poll_ms: u64,
    pub notification_poll_ms: u64,
    pub typing_idle_ms: u64,
    pub presence_grace_ms: u64,
    pub room_read_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub notification_db: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/chat/".to_string(),
            csrf_token: None,
            message_poll_ms: 1_000,
            roster_poll_ms: 10_000,
            notification_poll_ms: 4_000,
            typing_idle_ms: 3_000,
            presence_grace_ms: 100,
            room_read_delay_ms: 1_000,
            request_timeout_ms: 10_000,
            notification_db: PathBuf::from("data/notifications.db"),
        }
    }
}

impl SyncConfig {
    pub fn message_poll(&self) -> Duration {
        Duration::from_millis(self.message_poll_ms.max(1))
    }

    pub fn roster_poll(&self) -> Duration {
        Duration::from_millis(self.roster_poll_ms.max(1))
    }

    pub fn notification_poll(&self) -> Duration {
        Duration::from_millis(self.notification_poll_ms.max(1))
    }

    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }

    pub fn presence_grace(&self) -> Duration {
        Duration::from_millis(self.presence_grace_ms)
    }

    pub fn room_read_delay(&self) -> Duration {
        Duration::from_millis(self.room_read_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    /// Environment wins over the file; call after `dotenvy::dotenv()`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url;
            }
        }
        if let Ok(token) = env::var(CSRF_TOKEN_ENV) {
            self.csrf_token = Some(token);
        }
    }
}

pub fn load_config(path: &str) -> SyncConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|err| {
            log::warn!("Failed to parse config file {}: {err}", path.display());
            SyncConfig::default()
        }),
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            SyncConfig::default()
        }
    }
}

fn parse_config(content: &str) -> Result<SyncConfig, serde_json::Error> {
    serde_json::from_str::<SyncConfig>(content)
}
