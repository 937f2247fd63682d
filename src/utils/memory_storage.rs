//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_entry;

#[derive(Debug, Default)]
struct EntryTable {
    rows: Vec<Entry>,
    index: HashMap<String, usize>,
}

/// In-memory storage implementation for testing and development
///
/// Entries keep their insertion order as the tie-break between equal dates.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    entries: Arc<RwLock<EntryTable>>,
    groups: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

fn read<T>(lock: &RwLock<T>) -> LedgerResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| LedgerError::Storage("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> LedgerResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| LedgerError::Storage("lock poisoned".to_string()))
}

impl MemoryStore {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            entries: Arc::new(RwLock::new(EntryTable::default())),
            groups: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn add_account(&self, account: Account) -> LedgerResult<()> {
        write(&self.accounts)?.insert(account.id.clone(), account);
        Ok(())
    }

    pub fn add_entry(&self, entry: Entry) -> LedgerResult<()> {
        validate_entry(&entry)?;

        let mut table = write(&self.entries)?;
        if table.index.contains_key(&entry.id) {
            return Err(LedgerError::Validation(format!(
                "Entry with ID '{}' already exists",
                entry.id
            )));
        }
        let position = table.rows.len();
        table.index.insert(entry.id.clone(), position);
        table.rows.push(entry);
        Ok(())
    }

    pub fn get_entry(&self, entry_id: &str) -> LedgerResult<Option<Entry>> {
        let table = read(&self.entries)?;
        Ok(table
            .index
            .get(entry_id)
            .map(|&position| table.rows[position].clone()))
    }

    /// Member ids of a committed group
    pub fn group_members(&self, group_id: &str) -> LedgerResult<Option<Vec<String>>> {
        Ok(read(&self.groups)?.get(group_id).cloned())
    }

    pub fn group_count(&self) -> LedgerResult<usize> {
        Ok(read(&self.groups)?.len())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        write(&self.accounts)?.clear();
        *write(&self.entries)? = EntryTable::default();
        write(&self.groups)?.clear();
        Ok(())
    }

    /// Open candidates matching the filter, in storage order
    fn candidates(&self, filter: &EntryFilter) -> LedgerResult<Vec<Entry>> {
        let accounts = read(&self.accounts)?;
        let table = read(&self.entries)?;
        Ok(table
            .rows
            .iter()
            .filter(|entry| {
                accounts
                    .get(&entry.account_id)
                    .is_some_and(|account| account.reconcile)
            })
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconciliationStore for MemoryStore {
    async fn fetch_open_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<Entry>> {
        let mut entries = self.candidates(filter)?;
        // Stable sort keeps insertion order between equal dates
        entries.sort_by_key(|entry| entry.date);
        Ok(entries)
    }

    async fn fetch_distinct_bucket_keys(
        &self,
        filter: &EntryFilter,
    ) -> LedgerResult<Vec<BucketKey>> {
        let keys: BTreeSet<BucketKey> = self
            .candidates(filter)?
            .into_iter()
            .map(|entry| BucketKey::new(entry.account_id, entry.party_id))
            .collect();
        Ok(keys.into_iter().collect())
    }

    async fn open_date_range(
        &self,
        filter: &EntryFilter,
    ) -> LedgerResult<Option<(NaiveDate, NaiveDate)>> {
        let entries = self.candidates(filter)?;
        let first = entries.iter().map(|entry| entry.date).min();
        let last = entries.iter().map(|entry| entry.date).max();
        Ok(first.zip(last))
    }

    async fn commit_group(&mut self, entry_ids: &[String]) -> LedgerResult<String> {
        if entry_ids.is_empty() {
            return Err(LedgerError::Validation(
                "Cannot reconcile an empty group".to_string(),
            ));
        }
        let requested: HashSet<&String> = entry_ids.iter().collect();
        if requested.len() != entry_ids.len() {
            return Err(LedgerError::Validation(
                "Group lists the same entry twice".to_string(),
            ));
        }

        // Both locks are held until the group is written so the commit is
        // all-or-nothing.
        let mut table = write(&self.entries)?;
        let mut groups = write(&self.groups)?;

        let mut positions = Vec::with_capacity(entry_ids.len());
        for id in entry_ids {
            let position = *table
                .index
                .get(id)
                .ok_or_else(|| LedgerError::EntryNotFound(id.clone()))?;
            positions.push(position);
        }

        // Same group committed again
        if let Some(existing) = table.rows[positions[0]].reconciliation.clone() {
            let same_group = groups.get(&existing).is_some_and(|members| {
                members.len() == requested.len() && members.iter().all(|m| requested.contains(m))
            });
            if same_group {
                return Ok(existing);
            }
        }

        for &position in &positions {
            let entry = &table.rows[position];
            if entry.reconciliation.is_some() {
                return Err(LedgerError::AlreadyReconciled(entry.id.clone()));
            }
        }

        let account_id = &table.rows[positions[0]].account_id;
        if positions
            .iter()
            .any(|&position| &table.rows[position].account_id != account_id)
        {
            return Err(LedgerError::Validation(
                "Reconciled entries must share the same account".to_string(),
            ));
        }

        // Exact decimal sum, no rounding to any currency precision
        let total: BigDecimal = positions
            .iter()
            .map(|&position| table.rows[position].signed_amount())
            .sum();
        if !total.is_zero() {
            return Err(LedgerError::Unbalanced(format!(
                "group of {} entries sums to {}",
                entry_ids.len(),
                total
            )));
        }

        let group_id = Uuid::new_v4().to_string();
        for &position in &positions {
            table.rows[position].reconciliation = Some(group_id.clone());
        }
        groups.insert(group_id.clone(), entry_ids.to_vec());
        Ok(group_id)
    }
}
