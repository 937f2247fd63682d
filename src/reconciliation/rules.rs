//! Rule matching: entries whose descriptions carry the same reference are
//! reconciled together when, and only when, they balance as a whole.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::budget::{Budget, Progress};
use super::money::{Money, Precision};
use super::sink::{MatchSource, ReconciliationSink};
use crate::traits::ReconciliationStore;
use crate::types::*;
use crate::utils::validate_rule;

/// A reconcile rule with its expression compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule_id: String,
    regex: Regex,
}

impl CompiledRule {
    pub fn compile(rule: &ReconcileRule) -> LedgerResult<Self> {
        validate_rule(rule)?;
        let invalid = |reason: String| LedgerError::InvalidRule {
            rule_id: rule.id.clone(),
            expression: rule.expression.clone(),
            reason,
        };

        let regex = Regex::new(&rule.expression).map_err(|e| invalid(e.to_string()))?;
        if regex.captures_len() < 2 {
            return Err(invalid("expression has no capture group".to_string()));
        }

        Ok(Self {
            rule_id: rule.id.clone(),
            regex,
        })
    }
}

/// Compiled rules grouped by account, in the order they were supplied
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    by_account: HashMap<String, Vec<CompiledRule>>,
}

impl RuleSet {
    /// Compile every rule up front. The first invalid expression aborts.
    pub fn compile(rules: &[ReconcileRule]) -> LedgerResult<Self> {
        let mut by_account: HashMap<String, Vec<CompiledRule>> = HashMap::new();
        for rule in rules {
            let compiled = CompiledRule::compile(rule)?;
            by_account
                .entry(rule.account_id.clone())
                .or_default()
                .push(compiled);
        }
        Ok(Self { by_account })
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }

    pub fn for_account(&self, account_id: &str) -> &[CompiledRule] {
        self.by_account
            .get(account_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Token of the first rule whose expression matches the description.
///
/// The token is capture group 1 with all whitespace removed, so
/// `"nº 123"` and `"nº123"` agree.
pub fn extract_token(rules: &[CompiledRule], description: &str) -> Option<String> {
    let captures = rules
        .iter()
        .find_map(|rule| rule.regex.captures(description))?;
    let token: String = captures
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    (!token.is_empty()).then_some(token)
}

/// Bucket entries by token. Returns `None` if the deadline passed while
/// scanning.
pub fn group_by_token<'e>(
    entries: &'e [Entry],
    rules: &[CompiledRule],
    budget: &Budget,
) -> Option<BTreeMap<String, Vec<&'e Entry>>> {
    let mut tokens: BTreeMap<String, Vec<&Entry>> = BTreeMap::new();
    let mut ticker = budget.rule_ticker();

    for entry in entries {
        if ticker.tick() {
            info!("{} entries scanned for references", ticker.count());
            if budget.expired() {
                return None;
            }
        }
        let Some(description) = entry.description.as_deref() else {
            continue;
        };
        if let Some(token) = extract_token(rules, description) {
            tokens.entry(token).or_default().push(entry);
        }
    }

    Some(tokens)
}

/// Commit every token bucket of two or more entries whose amounts sum to
/// exactly zero. Unbalanced buckets are left untouched.
pub async fn match_by_rules<S: ReconciliationStore>(
    entries: &[Entry],
    rules: &[CompiledRule],
    precision: Precision,
    budget: &Budget,
    sink: &mut ReconciliationSink<'_, S>,
) -> LedgerResult<Progress> {
    if rules.is_empty() {
        return Ok(Progress::Completed);
    }

    let Some(tokens) = group_by_token(entries, rules, budget) else {
        info!("Timeout reached.");
        return Ok(Progress::TimedOut);
    };

    let mut ticker = budget.rule_ticker();
    for (token, members) in tokens {
        if ticker.tick() {
            info!(
                "{} references processed with {} lines reconciled",
                ticker.count(),
                sink.reconciled_count()
            );
            if budget.expired() {
                info!("Timeout reached.");
                return Ok(Progress::TimedOut);
            }
        }
        if members.len() < 2 {
            continue;
        }

        let precision = precision.widen_for(members.iter().copied());
        let amounts = members
            .iter()
            .map(|entry| precision.entry_amount(entry))
            .collect::<LedgerResult<Vec<Money>>>()?;
        if !Money::checked_sum(amounts)?.is_zero() {
            continue;
        }

        let ids = members.iter().map(|entry| entry.id.clone()).collect();
        if let Some(group_id) = sink.commit(ids, MatchSource::Rule).await? {
            debug!(%token, %group_id, size = members.len(), "reconciled by reference");
        }
    }

    Ok(Progress::Completed)
}
