use crate::common::{RoomId, UserId};
use crate::config::SyncConfig;
use crate::storage::NotificationLog;

use super::RoomTicket;
use super::messages::MessageLog;
use super::notify::NotificationWatcher;
use super::presence::PresenceTracker;
use super::receipts::ReadReceiptTracker;
use super::roster::Roster;
use super::typing::{TypingCoordinator, TypingSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveRoom {
    pub ticket: RoomTicket,
    pub peer: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    epoch: u64,
    peer: UserId,
}

/// What leaving the active room left behind for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeftRoom {
    pub room: Option<RoomId>,
    /// The old room still had us marked as typing.
    pub typing_stop: bool,
    /// A send was outstanding and its control must be re-enabled.
    pub send_abandoned: bool,
}

/// All session state, owned by the session controller. Components are plain
/// fields so each can be borrowed independently inside one handler turn.
pub struct SessionState {
    active: Option<ActiveRoom>,
    selecting: Option<Selection>,
    last_epoch: u64,
    pub messages: MessageLog,
    pub typing: TypingCoordinator,
    pub receipts: ReadReceiptTracker,
    pub presence: PresenceTracker,
    pub roster: Roster,
    pub notifications: NotificationWatcher,
}

impl SessionState {
    pub fn new(config: &SyncConfig, marker: Option<NotificationLog>) -> Self {
        Self {
            active: None,
            selecting: None,
            last_epoch: 0,
            messages: MessageLog::new(),
            typing: TypingCoordinator::new(config.typing_idle()),
            receipts: ReadReceiptTracker::new(config.room_read_delay()),
            presence: PresenceTracker::new(config.presence_grace()),
            roster: Roster::new(),
            notifications: NotificationWatcher::new(marker),
        }
    }

    pub fn active(&self) -> Option<ActiveRoom> {
        self.active
    }

    pub fn active_ticket(&self) -> Option<RoomTicket> {
        self.active.map(|active| active.ticket)
    }

    /// A response tagged with `ticket` may still touch state.
    pub fn is_current(&self, ticket: RoomTicket) -> bool {
        self.active_ticket() == Some(ticket)
    }

    /// Tear down everything scoped to the active room. After this no room is
    /// active and any response for the old ticket is stale.
    pub fn leave_room(&mut self) -> LeftRoom {
        let send_abandoned = self.messages.send_in_flight();
        let typing_stop = self.typing.reset() == Some(TypingSignal::Stop);
        self.messages.clear();
        self.receipts.reset();
        self.roster.select(None);
        LeftRoom {
            room: self.active.take().map(|active| active.ticket.room),
            typing_stop,
            send_abandoned,
        }
    }

    /// Start resolving a room for `peer`. Supersedes any selection still waiting.
    pub fn begin_selection(&mut self, peer: UserId) -> u64 {
        self.last_epoch += 1;
        self.selecting = Some(Selection {
            epoch: self.last_epoch,
            peer,
        });
        self.roster.select(Some(peer));
        self.last_epoch
    }

    /// Returns false when a newer selection has replaced this one.
    pub fn finish_selection(&mut self, epoch: u64) -> bool {
        match self.selecting {
            Some(selection) if selection.epoch == epoch => {
                self.selecting = None;
                true
            }
            _ => false,
        }
    }

    pub fn abort_selection(&mut self) {
        self.roster.select(None);
    }

    /// Activate `room` for the selection identified by `epoch`: cursor back to 0,
    /// room-entry read-mark armed.
    pub fn enter_room(&mut self, room: RoomId, epoch: u64, peer: UserId) -> RoomTicket {
        let ticket = RoomTicket { room, epoch };
        self.messages.reset(ticket);
        self.receipts.room_entered();
        self.roster.select(Some(peer));
        self.active = Some(ActiveRoom { ticket, peer });
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MessageId;

    fn state() -> SessionState {
        SessionState::new(&SyncConfig::default(), None)
    }

    #[test]
    fn newer_selection_supersedes_older() {
        let mut state = state();
        let first = state.begin_selection(UserId(1));
        let second = state.begin_selection(UserId(2));
        assert!(!state.finish_selection(first));
        assert!(state.finish_selection(second));
        assert!(!state.finish_selection(second));
    }

    #[test]
    fn reselecting_same_room_gets_a_new_ticket() {
        let mut state = state();
        let epoch = state.begin_selection(UserId(1));
        state.finish_selection(epoch);
        let first = state.enter_room(RoomId(10), epoch, UserId(1));

        state.leave_room();
        let epoch = state.begin_selection(UserId(1));
        state.finish_selection(epoch);
        let second = state.enter_room(RoomId(10), epoch, UserId(1));

        assert_eq!(first.room, second.room);
        assert_ne!(first, second);
        assert!(!state.is_current(first));
        assert!(state.is_current(second));
    }

    #[test]
    fn leaving_resets_room_scoped_state() {
        let mut state = state();
        let epoch = state.begin_selection(UserId(1));
        state.finish_selection(epoch);
        let ticket = state.enter_room(RoomId(3), epoch, UserId(1));
        state.messages.begin_send("hello").unwrap();
        state.typing.on_keystroke(tokio::time::Instant::now(), "hello", true);

        let left = state.leave_room();
        assert_eq!(
            left,
            LeftRoom {
                room: Some(RoomId(3)),
                typing_stop: true,
                send_abandoned: true,
            }
        );
        assert_eq!(state.active(), None);
        assert_eq!(state.messages.cursor(), MessageId(0));
        assert!(state.messages.begin_poll(ticket).is_none());
    }

    #[test]
    fn leaving_without_room_is_harmless() {
        let mut state = state();
        assert_eq!(
            state.leave_room(),
            LeftRoom {
                room: None,
                typing_stop: false,
                send_abandoned: false,
            }
        );
    }
}
