//! Bucket planning
//!
//! Only the distinct bucket keys are fetched up front. Entries are loaded one
//! bucket at a time, right before the bucket is processed.

use crate::traits::ReconciliationStore;
use crate::types::*;

/// Independent buckets for the filter, in a stable order
pub async fn plan_buckets<S: ReconciliationStore>(
    store: &S,
    filter: &EntryFilter,
    split_by_party: bool,
) -> LedgerResult<Vec<BucketKey>> {
    let mut keys = store.fetch_distinct_bucket_keys(filter).await?;
    if !split_by_party {
        keys = keys
            .into_iter()
            .map(|key| BucketKey::account(key.account_id))
            .collect();
    }
    keys.sort();
    keys.dedup();
    Ok(keys)
}

/// Current open entries of one bucket, in bucket order
pub async fn load_bucket<S: ReconciliationStore>(
    store: &S,
    filter: &EntryFilter,
    key: &BucketKey,
) -> LedgerResult<Vec<Entry>> {
    store
        .fetch_open_entries(&filter.for_bucket(key.clone()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStore;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn store() -> MemoryStore {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = MemoryStore::new();
        store
            .add_account(Account::reconcilable("430".into(), "Receivable".into()))
            .unwrap();
        store
            .add_account(Account::reconcilable("400".into(), "Payable".into()))
            .unwrap();
        store
            .add_account(Account::new("700".into(), "Sales".into(), false))
            .unwrap();

        let entries = [
            Entry::debit("l1".into(), "430".into(), date, BigDecimal::from(10)).with_party("p2"),
            Entry::debit("l2".into(), "430".into(), date, BigDecimal::from(10)).with_party("p1"),
            Entry::credit("l3".into(), "430".into(), date, BigDecimal::from(10)),
            Entry::credit("l4".into(), "400".into(), date, BigDecimal::from(10)).with_party("p1"),
            Entry::credit("l5".into(), "700".into(), date, BigDecimal::from(10)).with_party("p1"),
            Entry::debit("l6".into(), "430".into(), date, BigDecimal::from(5)).with_party("p1"),
        ];
        for entry in entries {
            store.add_entry(entry).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_buckets_by_account_and_party() {
        let keys = plan_buckets(&store(), &EntryFilter::default(), true)
            .await
            .unwrap();

        assert_eq!(
            keys,
            vec![
                BucketKey::new("400".into(), Some("p1".into())),
                BucketKey::new("430".into(), None),
                BucketKey::new("430".into(), Some("p1".into())),
                BucketKey::new("430".into(), Some("p2".into())),
            ]
        );
    }

    #[tokio::test]
    async fn test_buckets_without_party_split() {
        let keys = plan_buckets(&store(), &EntryFilter::default(), false)
            .await
            .unwrap();

        assert_eq!(
            keys,
            vec![
                BucketKey::account("400".into()),
                BucketKey::account("430".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_load_bucket() {
        let store = store();
        let key = BucketKey::new("430".into(), Some("p1".into()));
        let entries = load_bucket(&store, &EntryFilter::default(), &key)
            .await
            .unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec!["l2", "l6"]);

        let all = load_bucket(&store, &EntryFilter::default(), &BucketKey::account("430".into()))
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }
}
