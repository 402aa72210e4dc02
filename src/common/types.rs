use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Server-assigned message id, monotonic within a room.
    MessageId
);
numeric_id!(RoomId);
numeric_id!(UserId);

/// Lifecycle shown next to a message.
///
/// Own messages go `Sending -> Sent -> Read`, received ones `Delivered -> Read`.
/// The declaration order is the forward order, so `Ord` can be used to reject
/// regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DisplayStatus {
    Sending,
    Sent,
    Delivered,
    Read,
}

impl DisplayStatus {
    pub fn derive(is_sender: bool, is_read: bool) -> Self {
        match (is_sender, is_read) {
            (_, true) => DisplayStatus::Read,
            (true, false) => DisplayStatus::Sent,
            (false, false) => DisplayStatus::Delivered,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            DisplayStatus::Sending => "⏳",
            DisplayStatus::Sent => "✓",
            DisplayStatus::Delivered => "✓",
            DisplayStatus::Read => "✓✓",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DisplayStatus::Sending => "sending",
            DisplayStatus::Sent => "sent",
            DisplayStatus::Delivered => "delivered",
            DisplayStatus::Read => "read",
        };
        f.write_str(label)
    }
}

/// A message as held in the local view of the active room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: Option<UserId>,
    pub sender_name: String,
    pub is_sender: bool,
    pub is_read: bool,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl Message {
    pub fn status(&self) -> DisplayStatus {
        DisplayStatus::derive(self.is_sender, self.is_read)
    }

    /// Received and not yet read by the local user.
    pub fn awaiting_read(&self) -> bool {
        self.status() == DisplayStatus::Delivered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub peer: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub avatar_ref: String,
    pub is_online: bool,
    #[serde(default)]
    pub unread_count: u32,
}

/// Vertical extent in view coordinates; `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub top: f32,
    pub bottom: f32,
}

impl Span {
    pub fn new(top: f32, bottom: f32) -> Self {
        Self { top, bottom }
    }

    pub fn intersects(&self, other: &Span) -> bool {
        self.top < other.bottom && other.top < self.bottom
    }
}

/// Where the view drew a message, reported back when scrolling settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub bounds: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}
