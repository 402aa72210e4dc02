use std::time::Duration;

use tokio::time::Instant;

use crate::common::Visibility;

/// Maps foreground/background transitions to online/offline reports.
///
/// Going hidden only reports offline after a short grace period; becoming visible
/// inside that window cancels the pending report.
#[derive(Debug)]
pub struct PresenceTracker {
    grace: Duration,
    visibility: Visibility,
    /// Last value sent; `None` until the first report or after a failed one.
    reported: Option<bool>,
    offline_due: Option<Instant>,
}

impl PresenceTracker {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            visibility: Visibility::Visible,
            reported: None,
            offline_due: None,
        }
    }

    pub fn reported(&self) -> Option<bool> {
        self.reported
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.offline_due
    }

    /// Returns the value to report now, if any.
    pub fn on_visibility(&mut self, visibility: Visibility, now: Instant) -> Option<bool> {
        self.visibility = visibility;
        match visibility {
            Visibility::Visible => {
                self.offline_due = None;
                self.report(true)
            }
            Visibility::Hidden => {
                if self.offline_due.is_none() {
                    self.offline_due = Some(now + self.grace);
                }
                None
            }
        }
    }

    pub fn on_deadline(&mut self, now: Instant) -> Option<bool> {
        match self.offline_due {
            Some(due) if due <= now => {
                self.offline_due = None;
                if self.visibility == Visibility::Hidden {
                    self.report(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// A report did not reach the server; the next transition re-sends.
    pub fn report_failed(&mut self, online: bool) {
        if self.reported == Some(online) {
            self.reported = None;
        }
    }

    /// Page teardown. Any pending grace timer is dropped; the caller sends the
    /// offline beacon unconditionally.
    pub fn on_teardown(&mut self) {
        self.offline_due = None;
        self.visibility = Visibility::Hidden;
        self.reported = Some(false);
    }

    fn report(&mut self, online: bool) -> Option<bool> {
        if self.reported == Some(online) {
            return None;
        }
        self.reported = Some(online);
        Some(online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_millis(100);

    #[test]
    fn first_visible_reports_online_once() {
        let mut presence = PresenceTracker::new(GRACE);
        let now = Instant::now();
        assert_eq!(presence.on_visibility(Visibility::Visible, now), Some(true));
        assert_eq!(presence.on_visibility(Visibility::Visible, now), None);
    }

    #[test]
    fn hidden_reports_offline_after_grace() {
        let mut presence = PresenceTracker::new(GRACE);
        let now = Instant::now();
        presence.on_visibility(Visibility::Visible, now);

        assert_eq!(presence.on_visibility(Visibility::Hidden, now), None);
        assert_eq!(presence.deadline(), Some(now + GRACE));
        assert_eq!(presence.on_deadline(now + Duration::from_millis(50)), None);
        assert_eq!(presence.on_deadline(now + GRACE), Some(false));
        assert_eq!(presence.reported(), Some(false));
        assert_eq!(presence.deadline(), None);
    }

    #[test]
    fn flicker_inside_grace_window_is_suppressed() {
        let mut presence = PresenceTracker::new(GRACE);
        let now = Instant::now();
        presence.on_visibility(Visibility::Visible, now);

        presence.on_visibility(Visibility::Hidden, now);
        let back = now + Duration::from_millis(40);
        assert_eq!(presence.on_visibility(Visibility::Visible, back), None);
        assert_eq!(presence.deadline(), None);
        assert_eq!(presence.on_deadline(now + GRACE), None);
        assert_eq!(presence.reported(), Some(true));
    }

    #[test]
    fn repeated_hidden_does_not_extend_grace() {
        let mut presence = PresenceTracker::new(GRACE);
        let now = Instant::now();
        presence.on_visibility(Visibility::Hidden, now);
        presence.on_visibility(Visibility::Hidden, now + Duration::from_millis(80));
        assert_eq!(presence.deadline(), Some(now + GRACE));
    }

    #[test]
    fn failed_report_is_retried_on_next_transition() {
        let mut presence = PresenceTracker::new(GRACE);
        let now = Instant::now();
        assert_eq!(presence.on_visibility(Visibility::Visible, now), Some(true));
        presence.report_failed(true);
        assert_eq!(presence.on_visibility(Visibility::Visible, now), Some(true));
    }

    #[test]
    fn teardown_cancels_pending_grace() {
        let mut presence = PresenceTracker::new(GRACE);
        let now = Instant::now();
        presence.on_visibility(Visibility::Hidden, now);
        presence.on_teardown();
        assert_eq!(presence.deadline(), None);
        assert_eq!(presence.reported(), Some(false));
    }
}
