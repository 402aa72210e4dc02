pub mod messages;
pub mod notify;
pub mod presence;
pub mod receipts;
pub mod roster;
pub mod session;
pub mod state;
pub mod typing;

use crate::common::RoomId;

/// Identifies one activation of a room. Every room-scoped request carries the
/// ticket it was issued for; a response whose ticket no longer matches the active
/// one is discarded. The epoch separates two selections of the same room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomTicket {
    pub room: RoomId,
    pub epoch: u64,
}

pub use messages::{BatchOutcome, MessageLog, PendingSend};
pub use notify::NotificationWatcher;
pub use presence::PresenceTracker;
pub use receipts::ReadReceiptTracker;
pub use roster::{Roster, RosterUpdate};
pub use session::SessionController;
pub use state::{ActiveRoom, SessionState};
pub use typing::{TypingCoordinator, TypingSignal};
