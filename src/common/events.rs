use uuid::Uuid;

use super::types::{DisplayStatus, Message, MessageId, RoomId, User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub user: UserId,
    pub is_online: bool,
    pub unread_count: u32,
}

/// Everything the view needs to re-render, emitted by the sync engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// The previous room's transcript and typing indicator should be cleared.
    RoomLeft { room: Option<RoomId> },
    /// A room became active; the input area can be shown.
    RoomEntered { room: RoomId, peer: UserId },
    /// Messages not previously rendered, in id order.
    MessagesAppended(Vec<Message>),
    StatusChanged { id: MessageId, status: DisplayStatus },
    /// Local placeholder shown while a send is outstanding.
    PendingSend { local_id: Uuid, content: String },
    SendSucceeded { local_id: Uuid, message_id: MessageId },
    /// The typed content is handed back so the view can keep it in the input.
    SendFailed {
        local_id: Uuid,
        content: String,
        notice: String,
    },
    SendControl { enabled: bool },
    PeerTyping(bool),
    RosterReplaced(Vec<User>),
    RosterPatched(Vec<PresenceChange>),
    /// Presence of the peer shown in the room header changed.
    PeerPresence { user: UserId, is_online: bool },
    /// A received message arrived that was not known before.
    IncomingMessage { id: MessageId },
    /// Cross-room alert from the notification watcher.
    IncomingNotification {
        message_id: MessageId,
        sender: String,
        content: String,
    },
    Notice { level: NoticeLevel, text: String },
}
