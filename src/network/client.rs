use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::common::{MessageId, RoomId, User, UserId};
use crate::error::StoreError;

use super::store::{FetchedMessage, LatestNotification, RemoteStore};
use super::transport::build_http_client;

const USERS_PATH: &str = "api/users/";
const CREATE_ROOM_PATH: &str = "api/create-room/";
const SEND_MESSAGE_PATH: &str = "api/send-message/";
const MESSAGES_PATH: &str = "api/messages/";
const MARK_READ_PATH: &str = "api/mark-read/";
const MARK_ROOM_READ_PATH: &str = "api/mark-room-read/";
const TYPING_PATH: &str = "api/typing-status/";
const PRESENCE_PATH: &str = "api/user-presence/";
const NOTIFICATIONS_PATH: &str = "api/get-notifications/";

const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `RemoteStore` over the chat HTTP API.
pub struct HttpStore {
    client: reqwest::Client,
    base: Url,
    csrf_token: String,
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        csrf_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let client = build_http_client(csrf_token.as_deref(), timeout)?;
        Ok(Self {
            client,
            base: parse_base_url(base_url)?,
            csrf_token: csrf_token.unwrap_or_default(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base
            .join(path)
            .map_err(|err| StoreError::Protocol(format!("bad endpoint {path}: {err}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .get(self.endpoint(path)?)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        decode_envelope(response.json::<Value>().await?)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, StoreError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        decode_envelope(response.json::<Value>().await?)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, Box<dyn Error>> {
    // `Url::join` drops the last path segment unless it ends with a slash.
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?)
}

/// Every endpoint answers `{success, error?, ...}`. A missing `success` field is
/// accepted (the notification endpoint omits it).
fn decode_envelope<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(StoreError::Application(message));
    }
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Deserialize)]
struct UsersBody {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: u64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    is_online: bool,
    #[serde(default)]
    unread_count: u32,
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        let display_name = wire
            .full_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(wire.username);
        User {
            id: UserId(wire.id),
            display_name,
            avatar_ref: wire.avatar,
            is_online: wire.is_online,
            unread_count: wire.unread_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoomBody {
    room_id: u64,
}

#[derive(Debug, Deserialize)]
struct SentBody {
    message_id: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesBody {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: u64,
    #[serde(default)]
    sender_id: Option<u64>,
    #[serde(default)]
    sender_name: String,
    content: String,
    #[serde(deserialize_with = "server_time")]
    timestamp: NaiveDateTime,
    is_sender: bool,
    is_read: bool,
}

impl From<WireMessage> for FetchedMessage {
    fn from(wire: WireMessage) -> Self {
        FetchedMessage {
            id: MessageId(wire.id),
            sender_id: wire.sender_id.map(UserId),
            sender_name: wire.sender_name,
            content: wire.content,
            timestamp: wire.timestamp,
            is_sender: wire.is_sender,
            is_read: wire.is_read,
        }
    }
}

fn server_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, SERVER_TIME_FORMAT).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
struct UpdatedBody {
    #[serde(default)]
    updated_count: u64,
}

#[derive(Debug, Deserialize)]
struct TypingBody {
    #[serde(default)]
    is_typing: bool,
}

#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Debug, Deserialize)]
struct NotificationBody {
    #[serde(default)]
    last_message_id: Option<u64>,
    #[serde(default)]
    last_message_content: Option<String>,
    #[serde(default)]
    last_message_sender: Option<String>,
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let body: UsersBody = self.get(USERS_PATH, &[]).await?;
        Ok(body.users.into_iter().map(User::from).collect())
    }

    async fn create_or_get_room(&self, peer: UserId) -> Result<RoomId, StoreError> {
        let body: RoomBody = self
            .post(CREATE_ROOM_PATH, json!({ "user_id": peer.0 }))
            .await?;
        Ok(RoomId(body.room_id))
    }

    async fn send_message(&self, room: RoomId, content: &str) -> Result<MessageId, StoreError> {
        let body: SentBody = self
            .post(
                SEND_MESSAGE_PATH,
                json!({ "room_id": room.0, "content": content }),
            )
            .await?;
        Ok(MessageId(body.message_id))
    }

    async fn list_messages(
        &self,
        room: RoomId,
        since: MessageId,
    ) -> Result<Vec<FetchedMessage>, StoreError> {
        let query = [
            ("room_id", room.0.to_string()),
            ("last_id", since.0.to_string()),
        ];
        let body: MessagesBody = self.get(MESSAGES_PATH, &query).await?;
        Ok(body.messages.into_iter().map(FetchedMessage::from).collect())
    }

    async fn mark_messages_read(
        &self,
        room: RoomId,
        ids: &[MessageId],
    ) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<u64> = ids.iter().map(|id| id.0).collect();
        let body: UpdatedBody = self
            .post(
                MARK_READ_PATH,
                json!({ "message_ids": ids, "room_id": room.0 }),
            )
            .await?;
        Ok(body.updated_count)
    }

    async fn mark_room_read(&self, room: RoomId) -> Result<u64, StoreError> {
        let body: UpdatedBody = self
            .post(MARK_ROOM_READ_PATH, json!({ "room_id": room.0 }))
            .await?;
        Ok(body.updated_count)
    }

    async fn set_presence(&self, online: bool) -> Result<(), StoreError> {
        let _: Ack = self.post(PRESENCE_PATH, json!({ "online": online })).await?;
        Ok(())
    }

    fn presence_beacon(&self, online: bool) {
        let url = match self.endpoint(PRESENCE_PATH) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("Presence beacon dropped: {err}");
                return;
            }
        };
        let request = self.client.post(url).json(&json!({
            "online": online,
            "csrfmiddlewaretoken": self.csrf_token,
        }));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = request.send().await;
                });
            }
            Err(_) => log::warn!("No async runtime available; presence beacon dropped"),
        }
    }

    async fn set_typing(&self, room: RoomId, is_typing: bool) -> Result<(), StoreError> {
        let _: Ack = self
            .post(
                TYPING_PATH,
                json!({ "room_id": room.0, "is_typing": is_typing }),
            )
            .await?;
        Ok(())
    }

    async fn get_typing(&self, room: RoomId) -> Result<bool, StoreError> {
        let body: TypingBody = self
            .get(TYPING_PATH, &[("room_id", room.0.to_string())])
            .await?;
        Ok(body.is_typing)
    }

    async fn latest_notification(&self) -> Result<LatestNotification, StoreError> {
        let body: NotificationBody = self
            .get(NOTIFICATIONS_PATH, &[("detail", "1".to_string())])
            .await?;
        Ok(LatestNotification {
            message_id: body.last_message_id.map(MessageId),
            sender: body.last_message_sender,
            content: body.last_message_content,
        })
    }
}
