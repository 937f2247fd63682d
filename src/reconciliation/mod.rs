//! Reconciliation engine for open ledger entries
//!
//! Open entries are split into date windows and, inside each window, into
//! independent `(account, party)` buckets. Each bucket is searched for
//! groups whose amounts sum to exactly zero, first through reference rules
//! and then through bounded combination search, under a shared deadline.

pub mod budget;
pub mod engine;
pub mod money;
pub mod options;
pub mod planner;
pub mod rules;
pub mod search;
pub mod sink;
pub mod window;

pub use budget::{Budget, Progress};
pub use engine::Reconciler;
pub use money::{Money, Precision};
pub use options::{ReconcileOptions, SearchStrategy};
pub use rules::{CompiledRule, RuleSet};
pub use sink::{MatchSource, ReconciledGroup, ReconciliationReport, ReconciliationSink};
pub use window::{DateWindow, WindowLength, WindowSchedule};
