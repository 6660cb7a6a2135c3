use std::time::{Duration, Instant};

/// Absolute point in monotonic time.
///
/// Timed waits take a deadline rather than a relative timeout so that
/// re-entering a wait after a spurious wakeup never extends the total wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline {
    instant: Instant,
}

impl Deadline {
    /// Deadline at an explicit instant
    pub fn at(instant: Instant) -> Self {
        Self { instant }
    }

    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        // Saturate on overflow instead of panicking for absurd timeouts
        let instant = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(far_future);
        Self { instant }
    }

    /// A deadline that has already passed
    pub fn now() -> Self {
        Self { instant: Instant::now() }
    }

    pub fn instant(&self) -> Instant {
        self.instant
    }

    pub fn has_elapsed(&self) -> bool {
        Instant::now() >= self.instant
    }

    /// Time left until the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.instant.saturating_duration_since(Instant::now())
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self::at(instant)
    }
}

fn far_future() -> Instant {
    // ~30 years is far enough for any wait and still representable everywhere
    let now = Instant::now();
    now.checked_add(Duration::from_secs(60 * 60 * 24 * 365 * 30))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_after_is_in_the_future() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.has_elapsed());
        assert!(deadline.remaining() > Duration::from_secs(59));
    }

    #[test]
    fn past_deadline_has_no_time_remaining() {
        let deadline = Deadline::now();
        assert!(deadline.has_elapsed());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn huge_timeout_saturates() {
        let deadline = Deadline::after(Duration::MAX);
        assert!(!deadline.has_elapsed());
    }

    #[test]
    fn deadlines_order_by_instant() {
        let start = Instant::now();
        let early = Deadline::at(start);
        let late = Deadline::from(start + Duration::from_millis(5));
        assert!(early < late);
        assert_eq!(late.instant(), start + Duration::from_millis(5));
    }
}
