//! Reconciliation run orchestrator
//!
//! Windows are processed in sequence, buckets one at a time inside each
//! window. Rules run first on a bucket, then the combination search on
//! whatever is still open. Hitting the deadline is not an error: the run
//! stops and reports what was committed so far.

use std::sync::Arc;
use tracing::info;

use super::budget::{Budget, Progress};
use super::options::ReconcileOptions;
use super::planner::{load_bucket, plan_buckets};
use super::rules::{match_by_rules, RuleSet};
use super::search::{search, Pool};
use super::sink::{ReconciliationReport, ReconciliationSink};
use super::window::WindowSchedule;
use crate::traits::*;
use crate::types::*;

/// Reconciliation engine over a storage backend
pub struct Reconciler<S: ReconciliationStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: ReconciliationStore> Reconciler<S> {
    /// Create a new reconciler using the system clock
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a new reconciler with a custom clock
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Reconcile every open entry selected by the options.
    ///
    /// Rules are compiled before anything is fetched; an invalid expression
    /// aborts the run. Store failures abort the run too, but groups already
    /// committed stay committed.
    pub async fn run(
        &mut self,
        options: &ReconcileOptions,
        rules: &[ReconcileRule],
    ) -> LedgerResult<ReconciliationReport> {
        options.validate()?;
        let rules = RuleSet::compile(rules)?;
        let budget = Budget::new(options.timeout(), Arc::clone(&self.clock));
        self.run_with_budget(options, &rules, &budget).await
    }

    /// Same as [`Reconciler::run`] with already compiled rules and an
    /// externally owned deadline
    pub async fn run_with_budget(
        &mut self,
        options: &ReconcileOptions,
        rules: &RuleSet,
        budget: &Budget,
    ) -> LedgerResult<ReconciliationReport> {
        let filter = options.base_filter();
        let (start_date, end_date) = match (options.start_date, options.end_date) {
            (Some(start), Some(end)) => (start, end),
            (start, end) => match self.store.open_date_range(&filter).await? {
                Some((first, last)) => (start.unwrap_or(first), end.unwrap_or(last)),
                None => return Ok(ReconciliationReport::default()),
            },
        };

        info!("Starting moves reconciliation");
        let mut sink = ReconciliationSink::new(&mut self.store);

        for window in WindowSchedule::new(start_date, end_date, options.window) {
            if budget.expired() {
                info!("Timeout reached.");
                sink.report_mut().timed_out = true;
                break;
            }

            info!("Reconciling lines between {} and {}", window.start, window.end);
            let before = sink.reconciled_count();
            let progress = reconcile_window(
                &mut sink,
                &filter.within(window.start, window.end),
                options,
                rules,
                budget,
            )
            .await?;
            sink.report_mut().windows_processed += 1;
            info!("Reconciled {} lines", sink.reconciled_count() - before);

            if progress.timed_out() {
                sink.report_mut().timed_out = true;
                break;
            }
        }

        let report = sink.into_report();
        info!("Finished. Reconciled {} lines", report.reconciled.len());
        Ok(report)
    }
}

async fn reconcile_window<S: ReconciliationStore>(
    sink: &mut ReconciliationSink<'_, S>,
    filter: &EntryFilter,
    options: &ReconcileOptions,
    rules: &RuleSet,
    budget: &Budget,
) -> LedgerResult<Progress> {
    let buckets = plan_buckets(sink.store(), filter, options.split_by_party).await?;

    for bucket in &buckets {
        if budget.expired() {
            info!("Timeout reached.");
            return Ok(Progress::TimedOut);
        }
        if reconcile_bucket(sink, filter, bucket, options, rules, budget)
            .await?
            .timed_out()
        {
            return Ok(Progress::TimedOut);
        }
    }

    Ok(Progress::Completed)
}

async fn reconcile_bucket<S: ReconciliationStore>(
    sink: &mut ReconciliationSink<'_, S>,
    filter: &EntryFilter,
    bucket: &BucketKey,
    options: &ReconcileOptions,
    rules: &RuleSet,
    budget: &Budget,
) -> LedgerResult<Progress> {
    let precision = options.precision();
    let mut entries = load_bucket(sink.store(), filter, bucket).await?;

    if options.use_rules {
        let account_rules = rules.for_account(&bucket.account_id);
        if !account_rules.is_empty() {
            let before = sink.reconciled_count();
            let progress =
                match_by_rules(&entries, account_rules, precision, budget, sink).await?;
            if progress.timed_out() {
                return Ok(progress);
            }
            if sink.reconciled_count() > before {
                entries = load_bucket(sink.store(), filter, bucket).await?;
            }
        }
    }

    if options.use_combinations {
        let mut pool = Pool::from_entries(&entries, precision, sink)?;
        return search(
            options.strategy,
            &mut pool,
            options.max_group_size,
            budget,
            sink,
        )
        .await;
    }

    Ok(Progress::Completed)
}
