use uuid::Uuid;

use crate::common::{
    ChatEvent, DisplayStatus, Message, MessageId, RenderedMessage, Room, Span, User, UserId,
};

/// Height of one transcript row in view coordinates.
pub const ROW_HEIGHT: f32 = 1.0;

/// Local mirror of what the engine has told the view.
#[derive(Debug, Default)]
pub struct ViewState {
    pub users: Vec<User>,
    pub room: Option<Room>,
    pub transcript: Vec<Message>,
    pub pending: Option<(Uuid, String)>,
    pub peer_typing: bool,
    pub peer_online: Option<bool>,
    pub send_enabled: bool,
    /// Text handed back by a failed send.
    pub draft: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            send_enabled: true,
            ..Self::default()
        }
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Fold an engine event in. Returns true when the transcript layout changed.
    pub fn apply(&mut self, event: &ChatEvent) -> bool {
        match event {
            ChatEvent::RoomLeft { .. } => {
                self.room = None;
                self.transcript.clear();
                self.pending = None;
                self.peer_typing = false;
                self.peer_online = None;
                false
            }
            ChatEvent::RoomEntered { room, peer } => {
                self.room = Some(Room {
                    id: *room,
                    peer: *peer,
                });
                self.peer_online = self.user(*peer).map(|user| user.is_online);
                false
            }
            ChatEvent::MessagesAppended(messages) => {
                self.transcript.extend(messages.iter().cloned());
                self.transcript.sort_by_key(|message| message.id);
                true
            }
            ChatEvent::StatusChanged { id, status } => {
                if let Some(message) = self.transcript.iter_mut().find(|m| m.id == *id) {
                    message.is_read = *status == DisplayStatus::Read;
                }
                false
            }
            ChatEvent::PendingSend { local_id, content } => {
                self.pending = Some((*local_id, content.clone()));
                self.draft = None;
                false
            }
            ChatEvent::SendSucceeded { local_id, .. } => {
                self.drop_pending(*local_id);
                false
            }
            ChatEvent::SendFailed {
                local_id, content, ..
            } => {
                self.drop_pending(*local_id);
                self.draft = Some(content.clone());
                false
            }
            ChatEvent::SendControl { enabled } => {
                self.send_enabled = *enabled;
                false
            }
            ChatEvent::PeerTyping(is_typing) => {
                self.peer_typing = *is_typing;
                false
            }
            ChatEvent::RosterReplaced(users) => {
                self.users = users.clone();
                false
            }
            ChatEvent::RosterPatched(changes) => {
                for change in changes {
                    if let Some(user) = self.users.iter_mut().find(|u| u.id == change.user) {
                        user.is_online = change.is_online;
                        user.unread_count = change.unread_count;
                    }
                }
                false
            }
            ChatEvent::PeerPresence { is_online, .. } => {
                self.peer_online = Some(*is_online);
                false
            }
            ChatEvent::IncomingMessage { .. }
            | ChatEvent::IncomingNotification { .. }
            | ChatEvent::Notice { .. } => false,
        }
    }

    fn drop_pending(&mut self, local_id: Uuid) {
        if self
            .pending
            .as_ref()
            .is_some_and(|(pending, _)| *pending == local_id)
        {
            self.pending = None;
        }
    }

    /// Row layout of the transcript. The console prints every row, so the whole
    /// transcript is in view.
    pub fn layout(&self) -> (Span, Vec<RenderedMessage>) {
        let rendered: Vec<RenderedMessage> = self
            .transcript
            .iter()
            .enumerate()
            .map(|(row, message)| {
                let top = row as f32 * ROW_HEIGHT;
                RenderedMessage {
                    id: message.id,
                    bounds: Span::new(top, top + ROW_HEIGHT),
                }
            })
            .collect();
        let viewport = Span::new(0.0, rendered.len() as f32 * ROW_HEIGHT);
        (viewport, rendered)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.transcript.iter().find(|message| message.id == id)
    }
}
