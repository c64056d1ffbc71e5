use core::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debouncer for recalculation triggers.
///
/// Each signal pushes the deadline out to `now + window`; the debouncer fires
/// once the window passes without a further signal. Time is passed in by the
/// caller, so the state machine itself never sleeps.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// Quiet period required before firing.
    window: Duration,
    state: DebounceState,
    /// Signals that landed while already armed and were merged into the pending trigger.
    coalesced_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Armed { deadline: Instant },
}

impl Debouncer {
    #[inline]
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
            coalesced_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Record a trigger at `now`, (re)arming the deadline.
    pub fn signal(&mut self, now: Instant) {
        if self.is_armed() {
            self.coalesced_count = self.coalesced_count.saturating_add(1);
        }
        self.state = DebounceState::Armed {
            deadline: now + self.window,
        };
    }

    /// Pending deadline, if armed.
    #[inline]
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Armed { deadline } => Some(deadline),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, DebounceState::Armed { .. })
    }

    /// Returns `true` exactly once per armed window, when `now` has reached the
    /// deadline, and returns to idle.
    #[must_use]
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Armed { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            DebounceState::Idle | DebounceState::Armed { .. } => false,
        }
    }

    /// Drop a pending trigger without firing.
    pub fn cancel(&mut self) {
        self.state = DebounceState::Idle;
    }

    /// Total signals merged into an already pending trigger since creation.
    #[inline]
    #[must_use]
    pub const fn coalesced(&self) -> u64 {
        self.coalesced_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    #[test]
    fn fires_once_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.fire_if_due(start));

        debouncer.signal(start);
        assert_eq!(debouncer.deadline(), Some(start + WINDOW));
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(199)));
        assert!(debouncer.fire_if_due(start + WINDOW));
        assert!(!debouncer.fire_if_due(start + WINDOW * 2));
        assert!(!debouncer.is_armed());
    }

    #[test]
    fn later_signals_push_the_deadline_out() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.signal(start);
        debouncer.signal(start + Duration::from_millis(150));

        assert!(!debouncer.fire_if_due(start + WINDOW));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(350)));
        assert_eq!(debouncer.coalesced(), 1);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.signal(start);
        debouncer.cancel();
        assert_eq!(debouncer.deadline(), None);
        assert!(!debouncer.fire_if_due(start + WINDOW));
    }
}
