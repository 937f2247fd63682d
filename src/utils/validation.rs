//! Validation utilities

use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is not negative
pub fn validate_non_negative_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an account ID is valid
pub fn validate_account_id(account_id: &str) -> LedgerResult<()> {
    if account_id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account ID cannot be empty".to_string(),
        ));
    }

    if account_id.len() > 64 {
        return Err(LedgerError::Validation(
            "Account ID cannot exceed 64 characters".to_string(),
        ));
    }

    if !account_id
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':'))
    {
        return Err(LedgerError::Validation(
            "Account ID can only contain alphanumeric characters and - _ . / :".to_string(),
        ));
    }

    Ok(())
}

/// Validate a ledger entry before it is offered for reconciliation
pub fn validate_entry(entry: &Entry) -> LedgerResult<()> {
    if entry.id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Entry ID cannot be empty".to_string(),
        ));
    }

    validate_account_id(&entry.account_id)?;
    validate_non_negative_amount(&entry.debit)?;
    validate_non_negative_amount(&entry.credit)?;

    let zero = BigDecimal::from(0);
    if entry.debit != zero && entry.credit != zero {
        return Err(LedgerError::Validation(format!(
            "Entry '{}' cannot have both a debit and a credit",
            entry.id
        )));
    }
    if entry.debit == zero && entry.credit == zero {
        return Err(LedgerError::Validation(format!(
            "Entry '{}' has no amount",
            entry.id
        )));
    }

    Ok(())
}

/// Validate a reconcile rule's identity. The expression itself is checked
/// when rules are compiled.
pub fn validate_rule(rule: &ReconcileRule) -> LedgerResult<()> {
    let invalid = |reason: String| LedgerError::InvalidRule {
        rule_id: rule.id.clone(),
        expression: rule.expression.clone(),
        reason,
    };

    validate_account_id(&rule.account_id).map_err(|err| match err {
        LedgerError::Validation(reason) => invalid(reason),
        other => other,
    })?;

    if rule.expression.trim().is_empty() {
        return Err(invalid("expression is empty".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(debit: i64, credit: i64) -> Entry {
        let mut entry = Entry::debit(
            "l1".into(),
            "430".into(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            BigDecimal::from(debit),
        );
        entry.credit = BigDecimal::from(credit);
        entry
    }

    #[test]
    fn test_valid_entry() {
        assert!(validate_entry(&entry(100, 0)).is_ok());
        assert!(validate_entry(&entry(0, 100)).is_ok());
    }

    #[test]
    fn test_entry_needs_exactly_one_side() {
        assert!(validate_entry(&entry(100, 100)).is_err());
        assert!(validate_entry(&entry(0, 0)).is_err());
        assert!(validate_entry(&entry(-5, 0)).is_err());
    }

    #[test]
    fn test_account_id_rules() {
        assert!(validate_account_id("430-00_1").is_ok());
        assert!(validate_account_id("4300.01").is_ok());
        assert!(validate_account_id("430/1").is_ok());
        assert!(validate_account_id(" ").is_err());
        assert!(validate_account_id("430 1").is_err());
        assert!(validate_account_id("430;drop").is_err());
        assert!(validate_account_id(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_rule_account_error_names_rule() {
        let rule = ReconcileRule::new("r7".into(), "430 01".into(), r"(\d+)".into());

        match validate_rule(&rule) {
            Err(LedgerError::InvalidRule { rule_id, .. }) => assert_eq!(rule_id, "r7"),
            other => panic!("unexpected result: {other:?}"),
        }
        let dotted = ReconcileRule::new("r8".into(), "4300.01".into(), r"(\d+)".into());
        assert!(validate_rule(&dotted).is_ok());
    }

    #[test]
    fn test_dotted_account_entry_is_valid() {
        let entry = Entry::credit(
            "l1".into(),
            "4300.01".into(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            BigDecimal::from(5),
        );
        assert!(validate_entry(&entry).is_ok());
    }

    #[test]
    fn test_empty_rule_expression() {
        let rule = ReconcileRule::new("r1".into(), "430".into(), "  ".into());
        assert!(matches!(
            validate_rule(&rule),
            Err(LedgerError::InvalidRule { .. })
        ));
    }
}
