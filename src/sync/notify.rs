use crate::common::{ChatEvent, MessageId};
use crate::network::LatestNotification;
use crate::storage::NotificationLog;

/// Cross-room "new message" alerts, independent of which room is open.
pub struct NotificationWatcher {
    last_notified: Option<MessageId>,
    marker: Option<NotificationLog>,
    fetch_in_flight: bool,
}

impl NotificationWatcher {
    pub fn new(marker: Option<NotificationLog>) -> Self {
        let last_notified = marker.as_ref().and_then(|store| match store.last_notified() {
            Ok(id) => id,
            Err(err) => {
                log::warn!("Failed to read notification marker: {err}");
                None
            }
        });
        Self {
            last_notified,
            marker,
            fetch_in_flight: false,
        }
    }

    pub fn last_notified(&self) -> Option<MessageId> {
        self.last_notified
    }

    pub fn begin_fetch(&mut self) -> bool {
        if self.fetch_in_flight {
            return false;
        }
        self.fetch_in_flight = true;
        true
    }

    pub fn fetch_failed(&mut self) {
        self.fetch_in_flight = false;
    }

    /// `already_shown` is true when the message is in the open room's transcript;
    /// the marker still advances but no alert is raised.
    pub fn observe(
        &mut self,
        latest: LatestNotification,
        already_shown: bool,
    ) -> Option<ChatEvent> {
        self.fetch_in_flight = false;

        let LatestNotification {
            message_id: Some(message_id),
            sender: Some(sender),
            content: Some(content),
        } = latest
        else {
            return None;
        };
        if self.last_notified == Some(message_id) {
            return None;
        }

        self.last_notified = Some(message_id);
        if let Some(store) = &self.marker {
            if let Err(err) = store.record(message_id) {
                log::warn!("Failed to persist notification marker {message_id}: {err}");
            }
        }

        if already_shown {
            return None;
        }
        Some(ChatEvent::IncomingNotification {
            message_id,
            sender,
            content,
        })
    }
}
