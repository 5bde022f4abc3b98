//! Debounce for list writes.
//!
//! The first change after a write arms a deadline; further changes before the
//! deadline ride along with it instead of pushing it back.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SaveSchedule {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SaveSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Note a change made at `now`. Returns true if this armed a new deadline.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.delay);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_change_arms_deadline() {
        let start = Instant::now();
        let mut schedule = SaveSchedule::new(Duration::from_secs(5));
        assert!(!schedule.is_pending());
        assert!(schedule.schedule(start));
        assert_eq!(schedule.deadline(), Some(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_later_changes_coalesce() {
        let start = Instant::now();
        let mut schedule = SaveSchedule::new(Duration::from_secs(5));
        schedule.schedule(start);
        assert!(!schedule.schedule(start + Duration::from_secs(4)));

        assert!(!schedule.is_due(start + Duration::from_secs(4)));
        assert!(schedule.is_due(start + Duration::from_secs(5)));

        schedule.clear();
        assert!(!schedule.is_due(start + Duration::from_secs(60)));
        assert!(schedule.schedule(start + Duration::from_secs(60)));
    }
}
