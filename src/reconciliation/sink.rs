//! Commit point for discovered groups

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::traits::ReconciliationStore;
use crate::types::LedgerResult;

/// Which pass found a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Rule,
    Combination,
}

/// A committed, exactly balanced group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledGroup {
    pub group_id: String,
    pub entry_ids: Vec<String>,
    pub source: MatchSource,
}

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Reconciled entry ids in commit order
    pub reconciled: Vec<String>,
    pub groups: Vec<ReconciledGroup>,
    pub windows_processed: usize,
    /// The deadline stopped the run before every window was handled
    pub timed_out: bool,
}

impl ReconciliationReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn reconciled_count(&self) -> usize {
        self.reconciled.len()
    }
}

/// Sole writer of reconciliations during a run
///
/// Each entry is claimed by at most one group. A group overlapping entries
/// already claimed in this run is skipped.
pub struct ReconciliationSink<'a, S: ReconciliationStore> {
    store: &'a mut S,
    claimed: HashSet<String>,
    report: ReconciliationReport,
}

impl<'a, S: ReconciliationStore> ReconciliationSink<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            claimed: HashSet::new(),
            report: ReconciliationReport::default(),
        }
    }

    pub fn store(&self) -> &S {
        self.store
    }

    pub fn is_claimed(&self, entry_id: &str) -> bool {
        self.claimed.contains(entry_id)
    }

    pub fn reconciled_count(&self) -> usize {
        self.report.reconciled.len()
    }

    pub fn report_mut(&mut self) -> &mut ReconciliationReport {
        &mut self.report
    }

    /// Commit a group and return its id, or `None` when one of the entries
    /// was already claimed
    pub async fn commit(
        &mut self,
        entry_ids: Vec<String>,
        source: MatchSource,
    ) -> LedgerResult<Option<String>> {
        if entry_ids.iter().any(|id| self.claimed.contains(id)) {
            return Ok(None);
        }

        let group_id = self.store.commit_group(&entry_ids).await?;
        debug!(group_id = %group_id, size = entry_ids.len(), ?source, "committed group");

        self.claimed.extend(entry_ids.iter().cloned());
        self.report.reconciled.extend(entry_ids.iter().cloned());
        self.report.groups.push(ReconciledGroup {
            group_id: group_id.clone(),
            entry_ids,
            source,
        });
        Ok(Some(group_id))
    }

    pub fn into_report(self) -> ReconciliationReport {
        self.report
    }
}
