use chrono::{DateTime, Duration, Utc};

/// Advisory cooldown window between critical-alert emissions
///
/// Prevents alert storms from rapid snapshot changes. This is a timestamp
/// comparison, not a lock: single-threaded callers get exact behavior,
/// concurrent callers get best-effort deduplication.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last_fired: Option<DateTime<Utc>>,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(Duration::milliseconds(10_000))
    }
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// True when enough time has passed since the last emission
    pub fn ready(&self) -> bool {
        self.ready_at(Utc::now())
    }

    /// Record an emission at the current time
    pub fn fire(&mut self) {
        self.fire_at(Utc::now());
    }

    /// Check readiness against a specific instant
    ///
    /// Primarily used for testing with controlled timestamps.
    pub fn ready_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_fired {
            Some(last) => now - last >= self.window,
            None => true,
        }
    }

    /// Record an emission at a specific instant
    ///
    /// Primarily used for testing with controlled timestamps.
    pub fn fire_at(&mut self, now: DateTime<Utc>) {
        self.last_fired = Some(now);
    }
}
