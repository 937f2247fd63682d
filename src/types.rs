//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit entry - positive signed amount
    Debit,
    /// Credit entry - negative signed amount
    Credit,
}

impl EntryType {
    /// The side that settles this one
    pub fn opposite(self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

/// Account as seen by the reconciliation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Human-readable account name
    pub name: String,
    /// Only entries of reconcilable accounts are ever candidates
    pub reconcile: bool,
}

impl Account {
    /// Create a new account
    pub fn new(id: String, name: String, reconcile: bool) -> Self {
        Self { id, name, reconcile }
    }

    /// Create a reconcilable account
    pub fn reconcilable(id: String, name: String) -> Self {
        Self::new(id, name, true)
    }
}

/// A single ledger line eligible for reconciliation
///
/// Amounts are kept as a `(debit, credit)` pair where exactly one side is
/// non-zero. The signed value is `debit - credit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier for the entry
    pub id: String,
    /// Account the entry is posted to
    pub account_id: String,
    /// Optional counterparty
    pub party_id: Option<String>,
    /// Accounting date
    pub date: NaiveDate,
    /// Optional due date
    pub maturity_date: Option<NaiveDate>,
    /// Debit side of the amount
    pub debit: BigDecimal,
    /// Credit side of the amount
    pub credit: BigDecimal,
    /// Free text, consulted only by reconciliation rules
    pub description: Option<String>,
    /// Group that settled this entry, `None` while open
    pub reconciliation: Option<String>,
}

impl Entry {
    /// Create a new open entry
    pub fn new(
        id: String,
        account_id: String,
        date: NaiveDate,
        entry_type: EntryType,
        amount: BigDecimal,
    ) -> Self {
        let (debit, credit) = match entry_type {
            EntryType::Debit => (amount, BigDecimal::from(0)),
            EntryType::Credit => (BigDecimal::from(0), amount),
        };
        Self {
            id,
            account_id,
            party_id: None,
            date,
            maturity_date: None,
            debit,
            credit,
            description: None,
            reconciliation: None,
        }
    }

    /// Create a debit entry
    pub fn debit(id: String, account_id: String, date: NaiveDate, amount: BigDecimal) -> Self {
        Self::new(id, account_id, date, EntryType::Debit, amount)
    }

    /// Create a credit entry
    pub fn credit(id: String, account_id: String, date: NaiveDate, amount: BigDecimal) -> Self {
        Self::new(id, account_id, date, EntryType::Credit, amount)
    }

    /// Set the counterparty
    pub fn with_party(mut self, party_id: impl Into<String>) -> Self {
        self.party_id = Some(party_id.into());
        self
    }

    /// Set the free-text description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the maturity date
    pub fn with_maturity_date(mut self, maturity_date: NaiveDate) -> Self {
        self.maturity_date = Some(maturity_date);
        self
    }

    /// Signed amount (`debit - credit`)
    pub fn signed_amount(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    /// Which side carries the amount
    pub fn side(&self) -> EntryType {
        if self.credit > BigDecimal::from(0) {
            EntryType::Credit
        } else {
            EntryType::Debit
        }
    }

    /// Whether the entry is still waiting for a reconciliation
    pub fn is_open(&self) -> bool {
        self.reconciliation.is_none()
    }
}

/// Externally configured pattern used to derive a grouping token from an
/// entry description. Capture group 1 of the expression is the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRule {
    pub id: String,
    pub account_id: String,
    /// Example: `Invoice nº((\d|\s)+)`
    pub expression: String,
}

impl ReconcileRule {
    pub fn new(id: String, account_id: String, expression: String) -> Self {
        Self {
            id,
            account_id,
            expression,
        }
    }
}

/// Counterparty part of a bucket key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartyScope {
    /// Entries of every party share the bucket
    Any,
    /// Only entries with exactly this party (`None` for party-less entries)
    Only(Option<String>),
}

impl PartyScope {
    pub fn matches(&self, party_id: Option<&str>) -> bool {
        match self {
            PartyScope::Any => true,
            PartyScope::Only(party) => party.as_deref() == party_id,
        }
    }
}

/// The unit of independence: entries sharing account and party
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub account_id: String,
    pub party: PartyScope,
}

impl BucketKey {
    pub fn new(account_id: String, party_id: Option<String>) -> Self {
        Self {
            account_id,
            party: PartyScope::Only(party_id),
        }
    }

    /// Bucket spanning every party of an account
    pub fn account(account_id: String) -> Self {
        Self {
            account_id,
            party: PartyScope::Any,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.party {
            PartyScope::Any => write!(f, "{}/*", self.account_id),
            PartyScope::Only(Some(party)) => write!(f, "{}/{}", self.account_id, party),
            PartyScope::Only(None) => write!(f, "{}/-", self.account_id),
        }
    }
}

/// Selection of open entries handed to the store
///
/// Stores must always apply the implicit conditions as well: the account is
/// reconcilable and the entry has no reconciliation yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Restrict to these accounts (empty means all)
    pub accounts: Vec<String>,
    /// Restrict to these parties (empty means all)
    pub parties: Vec<String>,
    /// Inclusive lower date bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub end_date: Option<NaiveDate>,
    /// Restrict to one bucket
    pub bucket: Option<BucketKey>,
}

impl EntryFilter {
    /// Same filter restricted to a date range
    pub fn within(&self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..self.clone()
        }
    }

    /// Same filter restricted to a bucket
    pub fn for_bucket(&self, bucket: BucketKey) -> Self {
        Self {
            bucket: Some(bucket),
            ..self.clone()
        }
    }

    /// Check the explicit conditions of the filter against an entry.
    /// The reconcilable-account condition is left to the store.
    pub fn matches(&self, entry: &Entry) -> bool {
        if !entry.is_open() {
            return false;
        }
        if !self.accounts.is_empty() && !self.accounts.contains(&entry.account_id) {
            return false;
        }
        if !self.parties.is_empty() {
            match &entry.party_id {
                Some(party) if self.parties.contains(party) => {}
                _ => return false,
            }
        }
        if let Some(start) = self.start_date {
            if entry.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if entry.date > end {
                return false;
            }
        }
        if let Some(bucket) = &self.bucket {
            if bucket.account_id != entry.account_id
                || !bucket.party.matches(entry.party_id.as_deref())
            {
                return false;
            }
        }
        true
    }
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    #[error("Entry already reconciled: {0}")]
    AlreadyReconciled(String),
    #[error("Entries do not balance: {0}")]
    Unbalanced(String),
    #[error("Invalid expression '{expression}' in reconcile rule {rule_id}: {reason}")]
    InvalidRule {
        rule_id: String,
        expression: String,
        reason: String,
    },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
