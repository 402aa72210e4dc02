use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    Stop,
}

impl TypingSignal {
    pub fn is_typing(self) -> bool {
        self == TypingSignal::Start
    }
}

/// Debounces keystrokes into one `Start` and one delayed `Stop`, and tracks the
/// peer's polled typing flag.
///
/// The inactivity deadline is a single slot: each keystroke moves it, it never
/// stacks a second timer.
#[derive(Debug)]
pub struct TypingCoordinator {
    idle: Duration,
    is_typing: bool,
    armed_until: Option<Instant>,
    peer_typing: bool,
    poll_in_flight: bool,
}

impl TypingCoordinator {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            is_typing: false,
            armed_until: None,
            peer_typing: false,
            poll_in_flight: false,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed_until
    }

    pub fn on_keystroke(&mut self, now: Instant, input: &str, room_active: bool) -> Option<TypingSignal> {
        if !room_active || input.trim().is_empty() {
            return None;
        }
        self.armed_until = Some(now + self.idle);
        if self.is_typing {
            return None;
        }
        self.is_typing = true;
        Some(TypingSignal::Start)
    }

    pub fn on_deadline(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.armed_until {
            Some(deadline) if deadline <= now => self.stop(),
            _ => None,
        }
    }

    pub fn on_blur(&mut self) -> Option<TypingSignal> {
        self.stop()
    }

    pub fn before_send(&mut self) -> Option<TypingSignal> {
        self.stop()
    }

    fn stop(&mut self) -> Option<TypingSignal> {
        self.armed_until = None;
        if !self.is_typing {
            return None;
        }
        self.is_typing = false;
        Some(TypingSignal::Stop)
    }

    /// Drop all room-scoped typing state. Returns `Stop` if the old room still
    /// believes we are typing.
    pub fn reset(&mut self) -> Option<TypingSignal> {
        let signal = self.stop();
        self.peer_typing = false;
        self.poll_in_flight = false;
        signal
    }

    pub fn begin_peer_poll(&mut self) -> bool {
        if self.poll_in_flight {
            return false;
        }
        self.poll_in_flight = true;
        true
    }

    /// Record a polled peer flag. `None` means the poll failed and the indicator
    /// stays as it was. Returns the new value when it changed.
    pub fn observe_peer(&mut self, polled: Option<bool>) -> Option<bool> {
        self.poll_in_flight = false;
        let is_typing = polled?;
        if is_typing == self.peer_typing {
            return None;
        }
        self.peer_typing = is_typing;
        Some(is_typing)
    }

    pub fn peer_typing(&self) -> bool {
        self.peer_typing
    }
}
