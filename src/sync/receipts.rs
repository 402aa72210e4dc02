//! Read receipts for received messages.
//!
//! Two triggers feed the same idempotent marking: what the user can actually see
//! when scrolling settles, and a one-off bulk mark shortly after entering a room.
//! If the bulk mark fails, the ids still shown as delivered are marked one by one
//! instead. Re-marking a read message is a no-op on both sides, so a bulk call that
//! succeeded server-side but lost its response cannot double-count.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::common::{MessageId, RenderedMessage, Span};

use super::messages::MessageLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryPhase {
    Idle,
    AwaitingFirstBatch,
    Scheduled(Instant),
    InFlight,
    Done,
}

#[derive(Debug)]
pub struct ReadReceiptTracker {
    delay: Duration,
    entry: EntryPhase,
    /// Ids with a mark-read request outstanding.
    in_flight: BTreeSet<MessageId>,
}

impl ReadReceiptTracker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            entry: EntryPhase::Idle,
            in_flight: BTreeSet::new(),
        }
    }

    pub fn reset(&mut self) {
        self.entry = EntryPhase::Idle;
        self.in_flight.clear();
    }

    pub fn room_entered(&mut self) {
        self.reset();
        self.entry = EntryPhase::AwaitingFirstBatch;
    }

    /// The first batch of the room has been handed to the view; arm the bulk mark.
    pub fn batch_rendered(&mut self, now: Instant) {
        if self.entry == EntryPhase::AwaitingFirstBatch {
            self.entry = EntryPhase::Scheduled(now + self.delay);
        }
    }

    pub fn entry_deadline(&self) -> Option<Instant> {
        match self.entry {
            EntryPhase::Scheduled(due) => Some(due),
            _ => None,
        }
    }

    /// Returns true exactly once, when the bulk mark should be issued.
    pub fn take_entry_due(&mut self, now: Instant) -> bool {
        match self.entry {
            EntryPhase::Scheduled(due) if due <= now => {
                self.entry = EntryPhase::InFlight;
                true
            }
            _ => false,
        }
    }

    pub fn entry_finished(&mut self) {
        self.entry = EntryPhase::Done;
    }

    /// Received, still-delivered messages whose drawn bounds intersect the viewport.
    pub fn visible_unread(
        &self,
        log: &MessageLog,
        viewport: Span,
        rendered: &[RenderedMessage],
    ) -> Vec<MessageId> {
        let ids: BTreeSet<MessageId> = rendered
            .iter()
            .filter(|item| viewport.intersects(&item.bounds))
            .filter(|item| log.get(item.id).is_some_and(|message| message.awaiting_read()))
            .map(|item| item.id)
            .filter(|id| !self.in_flight.contains(id))
            .collect();
        ids.into_iter().collect()
    }

    /// Client-side replacement for a failed bulk mark.
    pub fn fallback_ids(&self, log: &MessageLog) -> Vec<MessageId> {
        log.delivered_ids()
            .into_iter()
            .filter(|id| !self.in_flight.contains(id))
            .collect()
    }

    pub fn claim(&mut self, ids: &[MessageId]) {
        self.in_flight.extend(ids.iter().copied());
    }

    pub fn release(&mut self, ids: &[MessageId]) {
        for id in ids {
            self.in_flight.remove(id);
        }
    }
}
