//! Date windows sliding over the requested period
//!
//! Each window starts half a window length after the previous one so entries
//! close to a boundary get a second chance in the following window. Matches
//! spanning more than the overlap can still be missed.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Length of a reconciliation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLength {
    Days(u32),
    Months(u32),
}

impl WindowLength {
    pub fn units(&self) -> u32 {
        match self {
            WindowLength::Days(n) | WindowLength::Months(n) => *n,
        }
    }

    /// Distance between two consecutive window starts
    pub fn step(&self) -> u32 {
        (self.units() / 2).max(1)
    }

    fn offset(&self, date: NaiveDate, units: u64) -> Option<NaiveDate> {
        match self {
            WindowLength::Days(_) => date.checked_add_days(Days::new(units)),
            WindowLength::Months(_) => {
                let months = u32::try_from(units).ok()?;
                date.checked_add_months(Months::new(months))
            }
        }
    }
}

/// Inclusive date range handled in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Lazy, finite and restartable sequence of overlapping windows
#[derive(Debug, Clone)]
pub struct WindowSchedule {
    first: NaiveDate,
    last: NaiveDate,
    length: WindowLength,
    index: u64,
    finished: bool,
}

impl WindowSchedule {
    pub fn new(first: NaiveDate, last: NaiveDate, length: WindowLength) -> Self {
        Self {
            first,
            last,
            length,
            index: 0,
            finished: false,
        }
    }

    /// Rewind to the first window
    pub fn restart(&mut self) {
        self.index = 0;
        self.finished = false;
    }
}

impl Iterator for WindowSchedule {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        if self.finished {
            return None;
        }

        // Starts are computed from the first date so month-end clamping
        // never accumulates.
        let start = self
            .length
            .offset(self.first, self.index * u64::from(self.length.step()));
        let start = match start {
            Some(start) if start <= self.last => start,
            _ => {
                self.finished = true;
                return None;
            }
        };

        let end = self
            .length
            .offset(start, u64::from(self.length.units()))
            .map_or(self.last, |end| end.min(self.last));

        self.index += 1;
        Some(DateWindow { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_windows_overlap_by_half() {
        let windows: Vec<DateWindow> =
            WindowSchedule::new(date(2024, 1, 1), date(2024, 1, 20), WindowLength::Days(10))
                .collect();

        assert_eq!(
            windows,
            vec![
                DateWindow { start: date(2024, 1, 1), end: date(2024, 1, 11) },
                DateWindow { start: date(2024, 1, 6), end: date(2024, 1, 16) },
                DateWindow { start: date(2024, 1, 11), end: date(2024, 1, 20) },
                DateWindow { start: date(2024, 1, 16), end: date(2024, 1, 20) },
            ]
        );
    }

    #[test]
    fn test_single_day_period() {
        let windows: Vec<DateWindow> =
            WindowSchedule::new(date(2024, 3, 1), date(2024, 3, 1), WindowLength::Days(60))
                .collect();

        assert_eq!(
            windows,
            vec![DateWindow { start: date(2024, 3, 1), end: date(2024, 3, 1) }]
        );
    }

    #[test]
    fn test_step_is_at_least_one_unit() {
        let windows: Vec<DateWindow> =
            WindowSchedule::new(date(2024, 1, 1), date(2024, 1, 3), WindowLength::Days(1))
                .collect();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1].start, date(2024, 1, 2));
        assert_eq!(windows[1].end, date(2024, 1, 3));
    }

    #[test]
    fn test_month_windows() {
        let windows: Vec<DateWindow> =
            WindowSchedule::new(date(2024, 1, 31), date(2024, 6, 30), WindowLength::Months(4))
                .collect();

        assert_eq!(windows[0], DateWindow { start: date(2024, 1, 31), end: date(2024, 5, 31) });
        assert_eq!(windows[1], DateWindow { start: date(2024, 3, 31), end: date(2024, 6, 30) });
        assert_eq!(windows[2], DateWindow { start: date(2024, 5, 31), end: date(2024, 6, 30) });
        assert_eq!(windows.len(), 3);
    }

    #[test]
    fn test_restart() {
        let mut schedule =
            WindowSchedule::new(date(2024, 1, 1), date(2024, 1, 10), WindowLength::Days(4));
        let first_pass: Vec<DateWindow> = schedule.by_ref().collect();
        assert!(schedule.next().is_none());

        schedule.restart();
        let second_pass: Vec<DateWindow> = schedule.collect();

        assert_eq!(first_pass, second_pass);
    }
}
