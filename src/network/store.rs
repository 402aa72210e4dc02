use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::common::{Message, MessageId, RoomId, User, UserId};
use crate::error::StoreError;

/// A message row as returned by `list_messages`, before it is bound to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    pub id: MessageId,
    pub sender_id: Option<UserId>,
    pub sender_name: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
    pub is_sender: bool,
    pub is_read: bool,
}

impl FetchedMessage {
    pub fn into_message(self, room_id: RoomId) -> Message {
        Message {
            id: self.id,
            room_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            is_sender: self.is_sender,
            is_read: self.is_read,
            content: self.content,
            timestamp: self.timestamp,
        }
    }
}

/// Most recent message addressed to the local user across all rooms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LatestNotification {
    pub message_id: Option<MessageId>,
    pub sender: Option<String>,
    pub content: Option<String>,
}

/// Query/command surface of the chat store. There is no push channel; everything
/// the engine learns comes from polling these calls.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Idempotent per (caller, peer).
    async fn create_or_get_room(&self, peer: UserId) -> Result<RoomId, StoreError>;

    async fn send_message(&self, room: RoomId, content: &str) -> Result<MessageId, StoreError>;

    /// Messages with `id > since`, plus any message whose read state changed since
    /// the caller last looked, regardless of id.
    async fn list_messages(
        &self,
        room: RoomId,
        since: MessageId,
    ) -> Result<Vec<FetchedMessage>, StoreError>;

    /// Returns the number of rows the server actually flipped.
    async fn mark_messages_read(
        &self,
        room: RoomId,
        ids: &[MessageId],
    ) -> Result<u64, StoreError>;

    async fn mark_room_read(&self, room: RoomId) -> Result<u64, StoreError>;

    async fn set_presence(&self, online: bool) -> Result<(), StoreError>;

    /// Best-effort presence report for page teardown. Must not block or wait for a
    /// response; there is no retry and no result.
    fn presence_beacon(&self, online: bool);

    async fn set_typing(&self, room: RoomId, is_typing: bool) -> Result<(), StoreError>;

    async fn get_typing(&self, room: RoomId) -> Result<bool, StoreError>;

    async fn latest_notification(&self) -> Result<LatestNotification, StoreError>;
}
