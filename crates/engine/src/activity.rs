use std::time::{SystemTime, UNIX_EPOCH};
use watchword_protocol::ACTIVITY_THROTTLE_MS;

/// Fixed-window rate limit on the activity heartbeat: one stored timestamp,
/// no smoothing. A burst right after the window opens is judged against
/// that single timestamp only.
#[derive(Debug)]
pub struct ActivityThrottle {
    last_accepted_ms: u64,
    window_ms: u64,
}

impl ActivityThrottle {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_accepted_ms: 0,
            window_ms: ACTIVITY_THROTTLE_MS,
        }
    }

    #[cfg(test)]
    const fn with_window(window_ms: u64) -> Self {
        Self {
            last_accepted_ms: 0,
            window_ms,
        }
    }

    /// Whether a heartbeat at `now_ms` passes the throttle. On acceptance
    /// the stored timestamp moves, before any persistence happens.
    pub fn accept(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_accepted_ms) < self.window_ms {
            return false;
        }
        self.last_accepted_ms = now_ms;
        true
    }
}

impl Default for ActivityThrottle {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| u64::try_from(dur.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::ActivityThrottle;

    #[test]
    fn second_event_inside_window_is_rejected() {
        let mut throttle = ActivityThrottle::with_window(5_000);
        assert!(throttle.accept(10_000));
        assert!(!throttle.accept(13_000));
    }

    #[test]
    fn event_after_window_is_accepted() {
        let mut throttle = ActivityThrottle::with_window(5_000);
        assert!(throttle.accept(10_000));
        assert!(!throttle.accept(13_000));
        // 6000 ms after the first accepted event, not after the rejected one.
        assert!(throttle.accept(16_000));
    }

    #[test]
    fn rejected_events_do_not_move_the_window() {
        let mut throttle = ActivityThrottle::with_window(5_000);
        assert!(throttle.accept(10_000));
        assert!(!throttle.accept(14_000));
        assert!(!throttle.accept(14_900));
        assert!(throttle.accept(15_000));
    }
}
