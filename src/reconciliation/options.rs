//! Run configuration

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Precision;
use super::window::WindowLength;
use crate::types::{EntryFilter, LedgerError, LedgerResult};

/// How the combinatorial pass looks for balancing groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Every subset of size 2, then 3, ... in bucket order
    #[default]
    Exhaustive,
    /// One anchor at a time against opposite-side candidates
    AnchoredGreedy,
}

/// Parameters of a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Restrict to these accounts (empty means every reconcilable account)
    pub accounts: Vec<String>,
    /// Restrict to these parties (empty means all)
    pub parties: Vec<String>,
    /// Defaults to the earliest open entry
    pub start_date: Option<NaiveDate>,
    /// Defaults to the latest open entry
    pub end_date: Option<NaiveDate>,
    /// Maximum number of entries in a group found by search
    pub max_group_size: usize,
    pub window: WindowLength,
    /// Maximum computation time in seconds
    pub timeout_secs: u64,
    pub use_combinations: bool,
    pub use_rules: bool,
    pub strategy: SearchStrategy,
    /// Keep parties apart; when false, buckets span every party of an account
    pub split_by_party: bool,
    /// Decimal digits of the company currency. Buckets holding finer
    /// amounts are compared at their own, wider scale.
    pub precision: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            parties: Vec::new(),
            start_date: None,
            end_date: None,
            max_group_size: 2,
            window: WindowLength::Days(60),
            timeout_secs: 300,
            use_combinations: true,
            use_rules: false,
            strategy: SearchStrategy::Exhaustive,
            split_by_party: true,
            precision: 2,
        }
    }
}

impl ReconcileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_parties(mut self, parties: Vec<String>) -> Self {
        self.parties = parties;
        self
    }

    pub fn with_period(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }

    pub fn with_max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size;
        self
    }

    pub fn with_window(mut self, window: WindowLength) -> Self {
        self.window = window;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_combinations(mut self, use_combinations: bool) -> Self {
        self.use_combinations = use_combinations;
        self
    }

    pub fn with_rules(mut self, use_rules: bool) -> Self {
        self.use_rules = use_rules;
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_split_by_party(mut self, split_by_party: bool) -> Self {
        self.split_by_party = split_by_party;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn precision(&self) -> Precision {
        Precision::new(self.precision)
    }

    pub fn timeout(&self) -> chrono::Duration {
        let secs = i64::try_from(self.timeout_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1000))
    }

    /// Candidate filter without any date bounds
    pub fn base_filter(&self) -> EntryFilter {
        EntryFilter {
            accounts: self.accounts.clone(),
            parties: self.parties.clone(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.max_group_size == 0 {
            return Err(LedgerError::Validation(
                "Maximum group size must be at least 1".to_string(),
            ));
        }

        if self.window.units() == 0 {
            return Err(LedgerError::Validation(
                "Window length must be at least 1".to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(LedgerError::Validation(format!(
                    "Start date {} is after end date {}",
                    start, end
                )));
            }
        }

        Ok(())
    }
}
