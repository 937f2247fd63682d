//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::types::*;

/// Storage abstraction for the reconciliation engine
///
/// This trait allows the engine to work with any ledger backend (PostgreSQL,
/// SQLite, in-memory, etc.). Every fetch applies the implicit candidate
/// conditions: the entry's account is reconcilable and the entry has no
/// reconciliation. Fetches must reflect groups committed earlier in the same
/// run.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Open entries matching the filter, ordered by ascending date with a
    /// stable tie-break
    async fn fetch_open_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<Entry>>;

    /// Distinct `(account, party)` pairs among the open entries matching the
    /// filter, without materialising the entries themselves
    async fn fetch_distinct_bucket_keys(&self, filter: &EntryFilter)
        -> LedgerResult<Vec<BucketKey>>;

    /// Earliest and latest date among the open entries matching the filter
    async fn open_date_range(
        &self,
        filter: &EntryFilter,
    ) -> LedgerResult<Option<(NaiveDate, NaiveDate)>>;

    /// Atomically mark the entries as one reconciliation and return its id
    ///
    /// Calling it again with the exact member set of an existing group
    /// returns that group's id. Fails if any entry is already reconciled in
    /// some other group.
    async fn commit_group(&mut self, entry_ids: &[String]) -> LedgerResult<String>;
}

/// Source of the current time for deadline tracking
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant, useful for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
