pub mod commands;
pub mod events;
pub mod types;

pub use commands::ChatCommand;
pub use events::{ChatEvent, NoticeLevel, PresenceChange};
pub use types::{
    DisplayStatus, Message, MessageId, RenderedMessage, Room, RoomId, Span, User, UserId,
    Visibility,
};
