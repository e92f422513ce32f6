//! Sliding window of recent verification attempts for one identifier.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Timestamps of admitted attempts, oldest first
///
/// An attempt at `t` stays inside the window while `now - t <= window`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl AttemptWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop attempts that have left the window
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        while let Some(oldest) = self.timestamps.front() {
            if now - *oldest > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Prune, then record `now` if fewer than `max_attempts` remain
    ///
    /// Returns the attempt count including the new one, or, when the cap is
    /// reached, the time until the oldest attempt leaves the window. A
    /// rejected attempt is not recorded.
    pub fn try_admit(
        &mut self,
        now: DateTime<Utc>,
        window: Duration,
        max_attempts: u32,
    ) -> Result<usize, Duration> {
        self.prune(now, window);

        if self.timestamps.len() >= max_attempts as usize {
            let retry_after = match self.timestamps.front() {
                Some(oldest) => window.checked_sub(&(now - *oldest)).unwrap_or(window),
                None => window,
            };
            return Err(retry_after);
        }

        self.timestamps.push_back(now);
        Ok(self.timestamps.len())
    }

    /// True when every recorded attempt has left the window at `now`
    pub fn is_idle_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.timestamps.back().map_or(true, |newest| now - *newest > window)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_admits_up_to_cap() {
        let mut window = AttemptWindow::new();
        let w = Duration::minutes(10);

        assert_eq!(window.try_admit(t0(), w, 3), Ok(1));
        assert_eq!(window.try_admit(t0() + Duration::seconds(1), w, 3), Ok(2));
        assert_eq!(window.try_admit(t0() + Duration::seconds(2), w, 3), Ok(3));

        let rejected = window.try_admit(t0() + Duration::seconds(3), w, 3);
        assert_eq!(rejected, Err(Duration::minutes(10) - Duration::seconds(3)));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_window_slides() {
        let mut window = AttemptWindow::new();
        let w = Duration::minutes(10);

        window.try_admit(t0(), w, 2).unwrap();
        window.try_admit(t0() + Duration::minutes(5), w, 2).unwrap();
        assert!(window.try_admit(t0() + Duration::minutes(9), w, 2).is_err());

        // An attempt exactly one window old still counts
        assert!(window.try_admit(t0() + Duration::minutes(10), w, 2).is_err());
        assert_eq!(
            window.try_admit(t0() + Duration::minutes(10) + Duration::milliseconds(1), w, 2),
            Ok(2)
        );
    }

    #[test]
    fn test_is_idle_at() {
        let mut window = AttemptWindow::new();
        let w = Duration::minutes(10);
        assert!(window.is_idle_at(t0(), w));

        window.try_admit(t0(), w, 3).unwrap();
        window.try_admit(t0() + Duration::minutes(5), w, 3).unwrap();
        assert!(!window.is_idle_at(t0() + Duration::minutes(15), w));
        assert!(window.is_idle_at(t0() + Duration::minutes(15) + Duration::milliseconds(1), w));
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let mut window = AttemptWindow::new();
        let w = Duration::milliseconds(i64::MAX);

        window.try_admit(t0(), w, 1).unwrap();
        let retry_after = window.try_admit(t0() + Duration::seconds(1), w, 1).unwrap_err();
        assert!(retry_after > Duration::zero());
    }

    #[test]
    fn test_prune_empties_window() {
        let mut window = AttemptWindow::new();
        let w = Duration::minutes(10);

        window.try_admit(t0(), w, 3).unwrap();
        window.prune(t0() + Duration::minutes(11), w);
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_cap_rejects_everything() {
        let mut window = AttemptWindow::new();
        assert_eq!(window.try_admit(t0(), Duration::minutes(10), 0), Err(Duration::minutes(10)));
        assert!(window.is_empty());
    }
}
