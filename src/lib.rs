//! # Ledger Reconcile
//!
//! Automatic reconciliation of open ledger entries: finds groups of entries of
//! the same account (and party) whose amounts sum to exactly zero and marks
//! them as settled.
//!
//! ## Features
//!
//! - **Exact balancing**: amounts are compared as fixed-point integers,
//!   never rounded and never with a tolerance
//! - **Reference rules**: regular expressions that extract an invoice or
//!   payment reference from descriptions and reconcile matching entries
//! - **Combination search**: exhaustive or anchored search for balancing
//!   subsets of bounded size
//! - **Date windows**: the period is processed in overlapping windows
//! - **Deadline**: a run stops cleanly when its time budget is spent
//! - **Storage abstraction**: the engine talks to any backend through the
//!   `ReconciliationStore` trait
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_reconcile::{Account, Entry, ReconcileOptions, Reconciler};
//! use ledger_reconcile::utils::MemoryStore;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> ledger_reconcile::LedgerResult<()> {
//! let store = MemoryStore::new();
//! store.add_account(Account::reconcilable("430".to_string(), "Receivable".to_string()))?;
//! let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! store.add_entry(Entry::debit("l1".to_string(), "430".to_string(), date, BigDecimal::from(100)))?;
//! store.add_entry(Entry::credit("l2".to_string(), "430".to_string(), date, BigDecimal::from(100)))?;
//!
//! let mut reconciler = Reconciler::new(store);
//! let report = reconciler.run(&ReconcileOptions::default(), &[]).await?;
//! assert_eq!(report.reconciled.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
