//! Basic reconciliation example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use ledger_reconcile::utils::MemoryStore;
use ledger_reconcile::{
    Account, Entry, ReconcileOptions, ReconcileRule, Reconciler, SearchStrategy, WindowLength,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Ledger Reconcile - Basic Example\n");

    let store = MemoryStore::new();
    store.add_account(Account::reconcilable(
        "430".to_string(),
        "Trade receivables".to_string(),
    ))?;
    store.add_account(Account::reconcilable(
        "400".to_string(),
        "Trade payables".to_string(),
    ))?;

    // 1. Open entries: invoices and the payments that settle them
    println!("📥 Loading open entries...");
    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    let entries = vec![
        Entry::debit("inv-1".into(), "430".into(), day(2), BigDecimal::from(1200))
            .with_party("acme")
            .with_description("Invoice nº 1001"),
        Entry::credit("pay-1".into(), "430".into(), day(9), BigDecimal::from(1200))
            .with_party("acme")
            .with_description("Transfer Invoice nº1001"),
        Entry::debit("inv-2".into(), "430".into(), day(3), BigDecimal::from(500))
            .with_party("acme"),
        Entry::debit("inv-3".into(), "430".into(), day(4), BigDecimal::from(250))
            .with_party("acme"),
        Entry::credit("pay-2".into(), "430".into(), day(20), BigDecimal::from(750))
            .with_party("acme"),
        Entry::credit("bill-1".into(), "400".into(), day(5), BigDecimal::from(80))
            .with_party("paper-co"),
        Entry::debit("pay-3".into(), "400".into(), day(25), BigDecimal::from(80))
            .with_party("paper-co"),
    ];
    for entry in entries {
        println!("  ✓ {} on {}: {}", entry.id, entry.account_id, entry.signed_amount());
        store.add_entry(entry)?;
    }
    println!();

    // 2. Reference rules first, then groups of up to three entries
    let rules = vec![ReconcileRule::new(
        "invoice-ref".to_string(),
        "430".to_string(),
        r"Invoice nº((\d|\s)+)".to_string(),
    )];
    let options = ReconcileOptions::new()
        .with_rules(true)
        .with_max_group_size(3)
        .with_window(WindowLength::Months(1))
        .with_strategy(SearchStrategy::Exhaustive)
        .with_timeout_secs(30);

    println!("🔍 Reconciling...");
    let mut reconciler = Reconciler::new(store.clone());
    let report = reconciler.run(&options, &rules).await?;

    for group in &report.groups {
        println!(
            "  ✓ {:?} group {}: {}",
            group.source,
            group.group_id,
            group.entry_ids.join(", ")
        );
    }
    println!();

    // 3. Summary
    println!("📊 Summary");
    println!("  Windows processed: {}", report.windows_processed);
    println!("  Entries reconciled: {}", report.reconciled_count());
    println!("  Timed out: {}", report.timed_out);

    let second = reconciler.run(&options, &rules).await?;
    println!("  Second run reconciled: {}", second.reconciled_count());

    Ok(())
}
