use std::time::{Duration, Instant};

/// Single rearmable timer.
///
/// Holds at most one pending deadline. Re-arming replaces the previous
/// deadline, so only the last event of a burst decides when the callback
/// fires.
#[derive(Debug)]
pub(super) struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub(super) fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and schedule a new one `delay` after `now`.
    pub(super) fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub(super) fn cancel(&mut self) {
        self.deadline = None;
    }

    pub(super) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending deadline if it has passed.
    pub(super) fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
