use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use crate::models::Timestamp;

/// Source of "now" for timestamp bookkeeping.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    /// Settable time, advanced by hand. Used by tests and replays.
    Manual(Arc<Mutex<Timestamp>>),
}

impl Clock {
    pub fn manual(start: Timestamp) -> Self {
        Clock::Manual(Arc::new(Mutex::new(start)))
    }

    pub fn now(&self) -> Timestamp {
        match self {
            Clock::System => Utc::now(),
            Clock::Manual(at) => *at.lock().expect("clock poisoned"),
        }
    }

    /// No-op for the system clock.
    pub fn advance(&self, by: Duration) {
        if let Clock::Manual(at) = self {
            let mut guard = at.lock().expect("clock poisoned");
            *guard += by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances_and_is_shared_between_clones() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let clock = Clock::manual(start);
        let other = clock.clone();
        other.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));

        clock.advance(Duration::minutes(-5));
        assert_eq!(other.now(), start);
    }

    #[test]
    fn system_clock_ignores_manual_adjustments() {
        let clock = Clock::System;
        let before = Utc::now();
        clock.advance(Duration::days(365));
        assert!(clock.now() < before + Duration::days(1));
    }
}
