//! Shared wall-clock deadline

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::traits::{Clock, SystemClock};

/// Entries and token buckets scanned between two deadline checks
pub const RULE_CHECK_INTERVAL: u64 = 10_000;

/// Subsets tested between two deadline checks
pub const COMBINATION_CHECK_INTERVAL: u64 = 10_000_000;

/// Deadline shared by every loop of a reconciliation run
#[derive(Clone)]
pub struct Budget {
    deadline: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    rule_check_interval: u64,
    combination_check_interval: u64,
}

impl Budget {
    /// Deadline `timeout` from now on the given clock
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        let deadline = clock
            .now()
            .checked_add_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::with_deadline(deadline, clock)
    }

    pub fn with_deadline(deadline: DateTime<Utc>, clock: Arc<dyn Clock>) -> Self {
        Self {
            deadline,
            clock,
            rule_check_interval: RULE_CHECK_INTERVAL,
            combination_check_interval: COMBINATION_CHECK_INTERVAL,
        }
    }

    /// Budget that never expires in practice
    pub fn unlimited() -> Self {
        Self::with_deadline(DateTime::<Utc>::MAX_UTC, Arc::new(SystemClock))
    }

    /// Override how often the inner loops consult the clock
    pub fn with_check_intervals(mut self, rules: u64, combinations: u64) -> Self {
        self.rule_check_interval = rules.max(1);
        self.combination_check_interval = combinations.max(1);
        self
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Ticker for the rule scanning loops
    pub fn rule_ticker(&self) -> Ticker {
        Ticker::new(self.rule_check_interval)
    }

    /// Ticker for the combination enumeration loops
    pub fn combination_ticker(&self) -> Ticker {
        Ticker::new(self.combination_check_interval)
    }

    pub fn expired(&self) -> bool {
        self.clock.now() > self.deadline
    }
}

impl std::fmt::Debug for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Budget")
            .field("deadline", &self.deadline)
            .field("rule_check_interval", &self.rule_check_interval)
            .field("combination_check_interval", &self.combination_check_interval)
            .finish()
    }
}

/// How far a pass got before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Completed,
    TimedOut,
}

impl Progress {
    pub fn timed_out(self) -> bool {
        self == Progress::TimedOut
    }
}

/// Iteration counter that consults the budget every `interval` ticks
#[derive(Debug)]
pub struct Ticker {
    interval: u64,
    count: u64,
}

impl Ticker {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            count: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Count one iteration. Returns `true` when this tick lands on a check
    /// point.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        self.count % self.interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FixedClock;
    use chrono::TimeZone;

    fn clock_at(hour: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()))
    }

    #[test]
    fn test_budget_expiry() {
        let deadline = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert!(!Budget::with_deadline(deadline, clock_at(11)).expired());
        assert!(!Budget::with_deadline(deadline, clock_at(12)).expired());
        assert!(Budget::with_deadline(deadline, clock_at(13)).expired());
    }

    #[test]
    fn test_budget_from_timeout() {
        let budget = Budget::new(Duration::minutes(5), clock_at(10));

        assert_eq!(
            budget.deadline(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap()
        );
        assert!(!budget.expired());
        assert!(Budget::new(Duration::seconds(-1), clock_at(10)).expired());
    }

    #[test]
    fn test_unlimited_budget() {
        assert!(!Budget::unlimited().expired());
    }

    #[test]
    fn test_check_intervals() {
        let budget = Budget::unlimited();
        assert!(!budget.rule_ticker().tick());
        assert!(!budget.combination_ticker().tick());

        let budget = budget.with_check_intervals(1, 0);
        assert!(budget.rule_ticker().tick());
        assert!(budget.combination_ticker().tick());
    }

    #[test]
    fn test_ticker_interval() {
        let mut ticker = Ticker::new(3);
        let hits: Vec<bool> = (0..6).map(|_| ticker.tick()).collect();

        assert_eq!(hits, vec![false, false, true, false, false, true]);
        assert_eq!(ticker.count(), 6);
    }
}
