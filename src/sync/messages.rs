//! Local transcript of the active room and the incremental fetch protocol.
//!
//! The store has no push channel, so the transcript is rebuilt from repeated
//! `list_messages(room, cursor)` calls. A fetch may return rows at or below the
//! cursor when their read state changed, so every returned row is reconciled,
//! not only the ones above the watermark. Servers that only return rows above the
//! cursor are covered by a status sweep: a fetch from id 0 whose rows may only
//! flip read flags of messages already known.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::common::{DisplayStatus, Message, MessageId};
use crate::error::{FetchError, SendError, StoreError};
use crate::network::FetchedMessage;

use super::RoomTicket;

/// A send that the server has not acknowledged yet. Never part of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub local_id: Uuid,
    pub content: String,
}

impl PendingSend {
    pub fn status(&self) -> DisplayStatus {
        DisplayStatus::Sending
    }
}

/// What a reconciled batch changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchOutcome {
    /// The whole batch as bound to the room, in id order.
    pub fetched: Vec<Message>,
    /// Rows that were not known before.
    pub appended: Vec<Message>,
    pub status_changes: Vec<(MessageId, DisplayStatus)>,
    /// First newly seen message written by the peer, if any.
    pub first_incoming: Option<MessageId>,
}

#[derive(Debug, Default)]
pub struct MessageLog {
    ticket: Option<RoomTicket>,
    cursor: MessageId,
    messages: BTreeMap<MessageId, Message>,
    poll_in_flight: bool,
    sweep_in_flight: bool,
    refetch_requested: bool,
    pending: HashMap<Uuid, PendingSend>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the log to a freshly activated room: cursor back to 0, transcript and
    /// outstanding sends dropped.
    pub fn reset(&mut self, ticket: RoomTicket) {
        self.clear();
        self.ticket = Some(ticket);
    }

    /// Forget the current room entirely. Late completions for it become stale.
    pub fn clear(&mut self) {
        self.ticket = None;
        self.cursor = MessageId(0);
        self.messages.clear();
        self.poll_in_flight = false;
        self.sweep_in_flight = false;
        self.refetch_requested = false;
        self.pending.clear();
    }

    pub fn cursor(&self) -> MessageId {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    /// Claim the single poll slot. Returns the cursor to fetch from, or `None` when
    /// a poll for this room is still outstanding (the tick is skipped, not queued).
    pub fn begin_poll(&mut self, ticket: RoomTicket) -> Option<MessageId> {
        if self.ticket != Some(ticket) || self.poll_in_flight {
            return None;
        }
        self.poll_in_flight = true;
        Some(self.cursor)
    }

    pub fn poll_in_flight(&self) -> bool {
        self.poll_in_flight
    }

    /// Ask for one more fetch as soon as the outstanding one lands.
    pub fn request_refetch(&mut self) {
        self.refetch_requested = true;
    }

    pub fn take_refetch(&mut self) -> bool {
        std::mem::take(&mut self.refetch_requested)
    }

    /// Apply the result of a fetch issued for `issued_for`.
    pub fn apply_fetch(
        &mut self,
        issued_for: RoomTicket,
        result: Result<Vec<FetchedMessage>, StoreError>,
    ) -> Result<BatchOutcome, FetchError> {
        if self.ticket != Some(issued_for) {
            return Err(FetchError::Stale { issued_for });
        }
        self.poll_in_flight = false;
        let batch = result?;
        Ok(self.reconcile(issued_for, batch))
    }

    /// Claim the status-sweep slot. Only worth it while some known message can
    /// still flip to read.
    pub fn begin_sweep(&mut self, ticket: RoomTicket) -> bool {
        if self.ticket != Some(ticket) || self.sweep_in_flight || !self.has_unread() {
            return false;
        }
        self.sweep_in_flight = true;
        true
    }

    /// Apply a full-room fetch as status updates only. Unknown rows are ignored and
    /// the cursor stays where it is.
    pub fn apply_sweep(
        &mut self,
        issued_for: RoomTicket,
        result: Result<Vec<FetchedMessage>, StoreError>,
    ) -> Result<Vec<(MessageId, DisplayStatus)>, FetchError> {
        if self.ticket != Some(issued_for) {
            return Err(FetchError::Stale { issued_for });
        }
        self.sweep_in_flight = false;
        let mut batch = result?;
        batch.sort_by_key(|message| message.id);
        Ok(batch
            .iter()
            .filter_map(|fetched| self.refresh_status(fetched.id, fetched.is_read))
            .collect())
    }

    pub fn has_unread(&self) -> bool {
        self.messages.values().any(|message| !message.is_read)
    }

    /// Read is one-way: a stale unread row never regresses a read one.
    fn refresh_status(&mut self, id: MessageId, is_read: bool) -> Option<(MessageId, DisplayStatus)> {
        let known = self.messages.get_mut(&id)?;
        if !is_read || known.is_read {
            return None;
        }
        known.is_read = true;
        Some((id, known.status()))
    }

    fn reconcile(&mut self, ticket: RoomTicket, mut batch: Vec<FetchedMessage>) -> BatchOutcome {
        batch.sort_by_key(|message| message.id);

        let mut outcome = BatchOutcome::default();
        for fetched in batch {
            let incoming = fetched.into_message(ticket.room);
            outcome.fetched.push(incoming.clone());

            if self.messages.contains_key(&incoming.id) {
                outcome
                    .status_changes
                    .extend(self.refresh_status(incoming.id, incoming.is_read));
            } else {
                if !incoming.is_sender && outcome.first_incoming.is_none() {
                    outcome.first_incoming = Some(incoming.id);
                }
                self.messages.insert(incoming.id, incoming.clone());
                outcome.appended.push(incoming);
            }
        }

        if let Some(max) = outcome.fetched.last().map(|message| message.id) {
            self.cursor = self.cursor.max(max);
        }
        outcome
    }

    /// Flip the given received messages to read. Ids that are unknown, sent by us,
    /// or already read are skipped, so repeating a call is a no-op.
    pub fn mark_read(&mut self, ids: &[MessageId]) -> Vec<MessageId> {
        let mut flipped = Vec::new();
        for id in ids {
            if let Some(message) = self.messages.get_mut(id) {
                if message.awaiting_read() {
                    message.is_read = true;
                    flipped.push(*id);
                }
            }
        }
        flipped
    }

    pub fn mark_all_delivered_read(&mut self) -> Vec<MessageId> {
        let ids = self.delivered_ids();
        self.mark_read(&ids)
    }

    /// Received messages the local user has not read yet.
    pub fn delivered_ids(&self) -> Vec<MessageId> {
        self.messages
            .values()
            .filter(|message| message.awaiting_read())
            .map(|message| message.id)
            .collect()
    }

    /// Validate and register an outgoing message. Only one send may be outstanding.
    pub fn begin_send(&mut self, content: &str) -> Result<PendingSend, SendError> {
        if self.ticket.is_none() {
            return Err(SendError::NoActiveRoom);
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(SendError::EmptyContent);
        }
        if !self.pending.is_empty() {
            return Err(SendError::SendInFlight);
        }

        let pending = PendingSend {
            local_id: Uuid::new_v4(),
            content: content.to_string(),
        };
        self.pending.insert(pending.local_id, pending.clone());
        Ok(pending)
    }

    pub fn finish_send(&mut self, local_id: Uuid) -> Option<PendingSend> {
        self.pending.remove(&local_id)
    }

    pub fn send_in_flight(&self) -> bool {
        !self.pending.is_empty()
    }
}
