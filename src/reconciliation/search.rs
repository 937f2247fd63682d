//! Combination search for zero-sum groups inside one bucket
//!
//! Two strategies share the same live pool. Whatever is committed is
//! consumed from the pool at once so later subsets can never reuse it.

use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::{debug, info};

use super::budget::{Budget, Progress, Ticker};
use super::money::{Money, Precision};
use super::options::SearchStrategy;
use super::sink::{MatchSource, ReconciliationSink};
use crate::traits::ReconciliationStore;
use crate::types::*;

/// An open entry reduced to what the search needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
}

impl Candidate {
    pub fn from_entry(entry: &Entry, precision: Precision) -> LedgerResult<Self> {
        Ok(Self {
            id: entry.id.clone(),
            amount: precision.entry_amount(entry)?,
            date: entry.date,
            maturity_date: entry.maturity_date,
        })
    }
}

/// Candidates of a bucket in bucket order, with the ones already committed
/// marked as consumed
#[derive(Debug, Clone)]
pub struct Pool {
    candidates: Vec<Candidate>,
    consumed: Vec<bool>,
}

impl Pool {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let consumed = vec![false; candidates.len()];
        Self {
            candidates,
            consumed,
        }
    }

    /// Pool of the entries not yet claimed in this run. The precision is
    /// widened to the finest amount of the bucket.
    pub fn from_entries<S: ReconciliationStore>(
        entries: &[Entry],
        precision: Precision,
        sink: &ReconciliationSink<'_, S>,
    ) -> LedgerResult<Self> {
        let precision = precision.widen_for(entries);
        let candidates = entries
            .iter()
            .filter(|entry| !sink.is_claimed(&entry.id))
            .map(|entry| Candidate::from_entry(entry, precision))
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(Self::new(candidates))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> &Candidate {
        &self.candidates[index]
    }

    pub fn is_consumed(&self, index: usize) -> bool {
        self.consumed[index]
    }

    pub fn consume(&mut self, indices: &[usize]) {
        for &index in indices {
            self.consumed[index] = true;
        }
    }

    pub fn live_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.consumed[i]).collect()
    }

    /// Live entries of the opposite side to `anchor`, largest magnitude
    /// first, then earliest maturity (entries without one last)
    pub fn opposite_candidates(&self, anchor: usize) -> Vec<usize> {
        let anchor_amount = self.candidates[anchor].amount;
        let mut indices: Vec<usize> = self
            .live_indices()
            .into_iter()
            .filter(|&i| i != anchor)
            .filter(|&i| {
                let amount = self.candidates[i].amount;
                (anchor_amount.is_positive() && amount.is_negative())
                    || (anchor_amount.is_negative() && amount.is_positive())
            })
            .collect();
        indices.sort_by(|&a, &b| {
            let (a, b) = (&self.candidates[a], &self.candidates[b]);
            b.amount
                .abs()
                .cmp(&a.amount.abs())
                .then_with(|| match (a.maturity_date, b.maturity_date) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
        });
        indices
    }

    fn ids(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|&i| self.candidates[i].id.clone())
            .collect()
    }
}

/// k-subsets of a list of pool indices in lexicographic order
#[derive(Debug)]
pub struct Combinations {
    items: Vec<usize>,
    positions: Vec<usize>,
    exhausted: bool,
}

impl Combinations {
    pub fn new(items: Vec<usize>, size: usize) -> Self {
        let exhausted = size == 0 || size > items.len();
        Self {
            items,
            positions: (0..size).collect(),
            exhausted,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Pool indices of the current subset
    pub fn current(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().map(|&p| self.items[p])
    }

    pub fn advance(&mut self) {
        let n = self.items.len();
        let k = self.positions.len();
        for i in (0..k).rev() {
            if self.positions[i] < n - k + i {
                self.positions[i] += 1;
                for j in i + 1..k {
                    self.positions[j] = self.positions[j - 1] + 1;
                }
                return;
            }
        }
        self.exhausted = true;
    }

    /// Continue over a shrunk item list, from the first subset whose leading
    /// item comes after `after`. Every earlier subset either was already
    /// visited or contains `after` itself.
    pub fn resume_after(&mut self, items: Vec<usize>, after: usize) {
        let k = self.positions.len();
        match items.iter().position(|&i| i > after) {
            Some(first) if first + k <= items.len() => {
                self.positions = (first..first + k).collect();
            }
            _ => self.exhausted = true,
        }
        self.items = items;
    }
}

/// Run the configured strategy over the pool
pub async fn search<S: ReconciliationStore>(
    strategy: SearchStrategy,
    pool: &mut Pool,
    max_group_size: usize,
    budget: &Budget,
    sink: &mut ReconciliationSink<'_, S>,
) -> LedgerResult<Progress> {
    match strategy {
        SearchStrategy::Exhaustive => search_exhaustive(pool, max_group_size, budget, sink).await,
        SearchStrategy::AnchoredGreedy => {
            search_anchored(pool, max_group_size, budget, sink).await
        }
    }
}

/// Try every subset of size 2 up to `max_group_size`, smallest sizes first,
/// committing each balanced subset as soon as it is found
pub async fn search_exhaustive<S: ReconciliationStore>(
    pool: &mut Pool,
    max_group_size: usize,
    budget: &Budget,
    sink: &mut ReconciliationSink<'_, S>,
) -> LedgerResult<Progress> {
    let mut ticker = budget.combination_ticker();

    for size in 2..=max_group_size {
        if budget.expired() {
            info!("Timeout reached.");
            return Ok(Progress::TimedOut);
        }
        let live = pool.live_indices();
        if live.len() < size {
            break;
        }
        info!("Reconciling {} in {} batches", live.len(), size);

        let mut combinations = Combinations::new(live, size);
        while !combinations.is_exhausted() {
            if ticker.tick() {
                info!(
                    "{} combinations processed with {} lines reconciled",
                    ticker.count(),
                    sink.reconciled_count()
                );
                if budget.expired() {
                    info!("Timeout reached.");
                    return Ok(Progress::TimedOut);
                }
            }

            let total: Money = combinations.current().map(|i| pool.get(i).amount).sum();
            if total.is_zero() {
                let members: Vec<usize> = combinations.current().collect();
                if sink
                    .commit(pool.ids(&members), MatchSource::Combination)
                    .await?
                    .is_some()
                {
                    pool.consume(&members);
                    combinations.resume_after(pool.live_indices(), members[0]);
                    continue;
                }
            }
            combinations.advance();
        }
    }

    Ok(Progress::Completed)
}

enum AnchorMatch {
    Found(Vec<usize>),
    NotFound,
    TimedOut,
}

/// Walk the pool in order, using each open entry as an anchor and looking
/// for opposite-side candidates that settle it exactly
pub async fn search_anchored<S: ReconciliationStore>(
    pool: &mut Pool,
    max_group_size: usize,
    budget: &Budget,
    sink: &mut ReconciliationSink<'_, S>,
) -> LedgerResult<Progress> {
    let mut ticker = budget.combination_ticker();

    for anchor in 0..pool.len() {
        if pool.is_consumed(anchor) || pool.get(anchor).amount.is_zero() {
            continue;
        }
        if budget.expired() {
            info!("Timeout reached.");
            return Ok(Progress::TimedOut);
        }

        let candidates = pool.opposite_candidates(anchor);
        match match_anchor(pool, anchor, &candidates, max_group_size, budget, &mut ticker) {
            AnchorMatch::TimedOut => {
                info!("Timeout reached.");
                return Ok(Progress::TimedOut);
            }
            AnchorMatch::NotFound => {}
            AnchorMatch::Found(subset) => {
                let mut members = Vec::with_capacity(subset.len() + 1);
                members.push(anchor);
                members.extend(subset);
                if sink
                    .commit(pool.ids(&members), MatchSource::Combination)
                    .await?
                    .is_some()
                {
                    debug!(anchor = %pool.get(anchor).id, size = members.len(), "anchor settled");
                    pool.consume(&members);
                }
            }
        }
    }

    Ok(Progress::Completed)
}

/// Smallest candidate subset settling the anchor. Group size counts the
/// anchor, so subsets hold at most `max_group_size - 1` candidates.
fn match_anchor(
    pool: &Pool,
    anchor: usize,
    candidates: &[usize],
    max_group_size: usize,
    budget: &Budget,
    ticker: &mut Ticker,
) -> AnchorMatch {
    let anchor_amount = pool.get(anchor).amount;

    for size in 1..max_group_size {
        if candidates.len() < size {
            break;
        }

        if size == 1 {
            for &candidate in candidates {
                let amount = pool.get(candidate).amount;
                // Candidates only get smaller from here.
                if anchor_amount.abs() > amount.abs() {
                    break;
                }
                if (anchor_amount + amount).is_zero() {
                    return AnchorMatch::Found(vec![candidate]);
                }
            }
            continue;
        }

        let mut combinations = Combinations::new(candidates.to_vec(), size);
        while !combinations.is_exhausted() {
            if ticker.tick() && budget.expired() {
                return AnchorMatch::TimedOut;
            }
            let total = anchor_amount
                + combinations
                    .current()
                    .map(|i| pool.get(i).amount)
                    .sum::<Money>();
            if total.is_zero() {
                return AnchorMatch::Found(combinations.current().collect());
            }
            combinations.advance();
        }
    }

    AnchorMatch::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::sink::ReconciledGroup;
    use crate::utils::MemoryStore;
    use bigdecimal::BigDecimal;

    fn store(amounts: &[i128]) -> MemoryStore {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = MemoryStore::new();
        store
            .add_account(Account::reconcilable("430".into(), "Receivable".into()))
            .unwrap();
        for (i, &units) in amounts.iter().enumerate() {
            let amount = BigDecimal::new(units.abs().into(), 2);
            let id = format!("l{}", i + 1);
            let entry = if units >= 0 {
                Entry::debit(id, "430".into(), date, amount)
            } else {
                Entry::credit(id, "430".into(), date, amount)
            };
            store.add_entry(entry).unwrap();
        }
        store
    }

    fn pool(amounts: &[i128]) -> Pool {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Pool::new(
            amounts
                .iter()
                .enumerate()
                .map(|(i, &units)| Candidate {
                    id: format!("l{}", i + 1),
                    amount: Money::from_units(units),
                    date,
                    maturity_date: None,
                })
                .collect(),
        )
    }

    fn committed(report_groups: &[ReconciledGroup]) -> Vec<Vec<String>> {
        report_groups
            .iter()
            .map(|group| group.entry_ids.clone())
            .collect()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_combinations_in_lexicographic_order() {
        let mut combinations = Combinations::new(vec![0, 1, 2, 3], 2);
        let mut seen = Vec::new();
        while !combinations.is_exhausted() {
            seen.push(combinations.current().collect::<Vec<_>>());
            combinations.advance();
        }

        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn test_combinations_larger_than_items() {
        assert!(Combinations::new(vec![0, 1], 3).is_exhausted());
        assert!(Combinations::new(vec![0, 1], 0).is_exhausted());
    }

    #[test]
    fn test_resume_after_skips_consumed_prefix() {
        let mut combinations = Combinations::new(vec![0, 1, 2, 3, 4], 2);
        combinations.advance(); // [0, 2]
        combinations.resume_after(vec![1, 3, 4], 0);

        assert_eq!(combinations.current().collect::<Vec<_>>(), vec![1, 3]);

        combinations.resume_after(vec![4], 3);
        assert!(combinations.is_exhausted());
    }

    #[test]
    fn test_opposite_candidates_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let candidate = |id: &str, units: i128, maturity: Option<u32>| Candidate {
            id: id.into(),
            amount: Money::from_units(units),
            date,
            maturity_date: maturity.map(|d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap()),
        };
        let pool = Pool::new(vec![
            candidate("anchor", 100, None),
            candidate("a", -30, None),
            candidate("b", -80, Some(20)),
            candidate("c", -80, Some(5)),
            candidate("d", 40, None),
            candidate("e", -80, None),
        ]);

        assert_eq!(pool.opposite_candidates(0), vec![3, 2, 5, 1]);
        assert_eq!(pool.opposite_candidates(4), vec![3, 2, 5, 1]);
    }

    #[tokio::test]
    async fn test_exhaustive_pair() {
        let mut store = store(&[10000, -10000]);
        let mut sink = ReconciliationSink::new(&mut store);
        let mut pool = pool(&[10000, -10000]);

        let progress = search_exhaustive(&mut pool, 2, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();

        assert_eq!(progress, Progress::Completed);
        let report = sink.into_report();
        assert_eq!(committed(&report.groups), vec![ids(&["l1", "l2"])]);
    }

    #[tokio::test]
    async fn test_exhaustive_needs_three() {
        let amounts = [10000, 20000, -5000, -7500, -30000];
        let mut store = store(&amounts);

        {
            let mut sink = ReconciliationSink::new(&mut store);
            let mut pool = pool(&[10000, 20000, -5000, -7500]);
            search_exhaustive(&mut pool, 3, &Budget::unlimited(), &mut sink)
                .await
                .unwrap();
            assert!(sink.into_report().is_empty());
        }

        let mut sink = ReconciliationSink::new(&mut store);
        let mut pool = pool(&amounts);
        search_exhaustive(&mut pool, 2, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();
        assert!(sink.report_mut().is_empty());

        search_exhaustive(&mut pool, 3, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();
        let report = sink.into_report();
        assert_eq!(committed(&report.groups), vec![ids(&["l1", "l2", "l5"])]);
        assert!(!pool.is_consumed(2));
        assert!(!pool.is_consumed(3));
    }

    #[tokio::test]
    async fn test_exhaustive_does_not_reuse_entries() {
        // l1 could pair with l2 or l3; only one of them may take it.
        let mut store = store(&[500, -500, -500, 500]);
        let mut sink = ReconciliationSink::new(&mut store);
        let mut pool = pool(&[500, -500, -500, 500]);

        search_exhaustive(&mut pool, 2, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();

        let report = sink.into_report();
        assert_eq!(
            committed(&report.groups),
            vec![ids(&["l1", "l2"]), ids(&["l3", "l4"])]
        );
    }

    #[tokio::test]
    async fn test_exhaustive_smaller_sizes_first() {
        let mut store = store(&[300, -100, -200, -300]);
        let mut sink = ReconciliationSink::new(&mut store);
        let mut pool = pool(&[300, -100, -200, -300]);

        search_exhaustive(&mut pool, 3, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();

        let report = sink.into_report();
        assert_eq!(committed(&report.groups), vec![ids(&["l1", "l4"])]);
    }

    #[tokio::test]
    async fn test_anchored_single_candidate() {
        let mut store = store(&[7500, -10000, -7500]);
        let mut sink = ReconciliationSink::new(&mut store);
        let mut pool = pool(&[7500, -10000, -7500]);

        search_anchored(&mut pool, 2, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();

        let report = sink.into_report();
        assert_eq!(committed(&report.groups), vec![ids(&["l1", "l3"])]);
    }

    #[tokio::test]
    async fn test_anchored_group_size_counts_anchor() {
        let amounts = [10000, -2500, -7500];
        let mut store = store(&amounts);

        {
            let mut sink = ReconciliationSink::new(&mut store);
            let mut pool = pool(&amounts);
            search_anchored(&mut pool, 2, &Budget::unlimited(), &mut sink)
                .await
                .unwrap();
            assert!(sink.into_report().is_empty());
        }

        let mut sink = ReconciliationSink::new(&mut store);
        let mut pool = pool(&amounts);
        search_anchored(&mut pool, 3, &Budget::unlimited(), &mut sink)
            .await
            .unwrap();
        let report = sink.into_report();
        // Candidates are tried largest first.
        assert_eq!(committed(&report.groups), vec![ids(&["l1", "l3", "l2"])]);
    }

    #[tokio::test]
    async fn test_search_stops_on_expired_budget() {
        use crate::traits::FixedClock;
        use chrono::{TimeZone, Utc};
        use std::sync::Arc;

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let budget = Budget::with_deadline(
            now - chrono::Duration::seconds(1),
            Arc::new(FixedClock(now)),
        );
        let mut store = store(&[100, -100]);
        let mut sink = ReconciliationSink::new(&mut store);

        for strategy in [SearchStrategy::Exhaustive, SearchStrategy::AnchoredGreedy] {
            let mut pool = pool(&[100, -100]);
            let progress = search(strategy, &mut pool, 2, &budget, &mut sink).await.unwrap();
            assert_eq!(progress, Progress::TimedOut);
        }
        assert!(sink.into_report().is_empty());
    }
}
