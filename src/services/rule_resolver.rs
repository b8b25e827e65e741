//! Picks the gain/loss thresholds that apply to one company.
//!
//! Priority is company rule, then sector rule, then the scope's base rule,
//! then the built-in fallback of +15% / -15%. Names compare lower-cased and
//! must match exactly. When two rules claim the same company or sector the
//! one that comes first in the input wins.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::models::{AlertRule, RuleScope};

pub const DEFAULT_GAIN_PCT: f64 = 15.0;
pub const DEFAULT_LOSS_PCT: f64 = -15.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub gain_pct: f64,
    pub loss_pct: f64,
}

impl Thresholds {
    pub const FALLBACK: Thresholds = Thresholds {
        gain_pct: DEFAULT_GAIN_PCT,
        loss_pct: DEFAULT_LOSS_PCT,
    };

    /// Reads the thresholds off a stored rule, refusing anything a
    /// comparison could not use safely.
    pub fn from_rule(rule: &AlertRule) -> Result<Self, RuleError> {
        let rule_id = rule.id.to_hex();
        let kind = rule.scope.kind();

        let gain_pct = rule.gain_pct.ok_or_else(|| RuleError::MissingThreshold {
            rule_id: rule_id.clone(),
            kind,
            field: "gain",
        })?;
        let loss_pct = rule.loss_pct.ok_or_else(|| RuleError::MissingThreshold {
            rule_id: rule_id.clone(),
            kind,
            field: "loss",
        })?;

        if !gain_pct.is_finite() || !loss_pct.is_finite() {
            return Err(RuleError::NonFinite { rule_id });
        }
        if gain_pct <= loss_pct {
            return Err(RuleError::InvertedThresholds {
                rule_id,
                gain_pct,
                loss_pct,
            });
        }

        Ok(Self { gain_pct, loss_pct })
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::FALLBACK
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("alert rule {rule_id} ({kind}) has no {field} threshold")]
    MissingThreshold {
        rule_id: String,
        kind: &'static str,
        field: &'static str,
    },

    #[error("alert rule {rule_id} has a non-finite threshold")]
    NonFinite { rule_id: String },

    #[error("alert rule {rule_id} has gain threshold {gain_pct}% at or below loss threshold {loss_pct}%")]
    InvertedThresholds {
        rule_id: String,
        gain_pct: f64,
        loss_pct: f64,
    },

    #[error("user {user_id} has more than one base alert rule ({first}, {second})")]
    DuplicateBase {
        user_id: String,
        first: String,
        second: String,
    },
}

/// The validated rules of one scope, indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    by_company: HashMap<String, Thresholds>,
    by_sector: HashMap<String, Thresholds>,
    base: Option<(String, Thresholds)>,
}

impl RuleBook {
    /// Builds the book for a single scope. Every rule is validated, not only
    /// the ones that end up matching.
    pub fn new(rules: &[AlertRule]) -> Result<Self, RuleError> {
        let mut book = RuleBook::default();

        for rule in rules {
            let thresholds = Thresholds::from_rule(rule)?;

            match &rule.scope {
                RuleScope::Company { company_name } => {
                    book.by_company
                        .entry(company_name.to_lowercase())
                        .or_insert(thresholds);
                }
                RuleScope::Sector { sector_name, .. } => {
                    book.by_sector
                        .entry(sector_name.to_lowercase())
                        .or_insert(thresholds);
                }
                RuleScope::Base => {
                    if let Some((first, _)) = &book.base {
                        return Err(RuleError::DuplicateBase {
                            user_id: rule.user_id.clone(),
                            first: first.clone(),
                            second: rule.id.to_hex(),
                        });
                    }
                    book.base = Some((rule.id.to_hex(), thresholds));
                }
            }
        }

        Ok(book)
    }

    pub fn resolve(&self, company_name: &str, sector_name: Option<&str>) -> Thresholds {
        if let Some(t) = self.by_company.get(&company_name.to_lowercase()) {
            return *t;
        }

        let sector = sector_name
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        if let Some(t) = sector.and_then(|s| self.by_sector.get(&s)) {
            return *t;
        }

        match &self.base {
            Some((_, t)) => *t,
            None => Thresholds::FALLBACK,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_company.is_empty() && self.by_sector.is_empty() && self.base.is_none()
    }
}

/// One-shot resolution against an unindexed rule list of a single scope.
pub fn resolve(
    company_name: &str,
    sector_name: Option<&str>,
    rules: &[AlertRule],
) -> Result<Thresholds, RuleError> {
    Ok(RuleBook::new(rules)?.resolve(company_name, sector_name))
}

/// Splits a mixed rule list by owner and builds one book per user, keeping
/// each user's rules in their original order.
pub fn books_by_user(rules: &[AlertRule]) -> Result<HashMap<String, RuleBook>, RuleError> {
    let mut grouped: HashMap<&str, Vec<AlertRule>> = HashMap::new();
    for rule in rules {
        grouped
            .entry(rule.user_id.as_str())
            .or_default()
            .push(rule.clone());
    }

    grouped
        .into_iter()
        .map(|(user_id, rules)| Ok((user_id.to_string(), RuleBook::new(&rules)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn rule(scope: RuleScope, gain: f64, loss: f64) -> AlertRule {
        AlertRule {
            id: ObjectId::new(),
            user_id: "u1".to_string(),
            scope,
            gain_pct: Some(gain),
            loss_pct: Some(loss),
            created_at: 0,
            updated_at: None,
        }
    }

    fn company(name: &str, gain: f64, loss: f64) -> AlertRule {
        rule(RuleScope::Company { company_name: name.to_string() }, gain, loss)
    }

    fn sector(name: &str, gain: f64, loss: f64) -> AlertRule {
        rule(
            RuleScope::Sector { sector_id: None, sector_name: name.to_string() },
            gain,
            loss,
        )
    }

    fn base(gain: f64, loss: f64) -> AlertRule {
        rule(RuleScope::Base, gain, loss)
    }

    #[test]
    fn company_rule_beats_sector_and_base() {
        let rules = vec![base(5.0, -5.0), sector("Banking", 8.0, -8.0), company("Acme", 25.0, -10.0)];

        let t = resolve("Acme", Some("Banking"), &rules).unwrap();
        assert_eq!(t, Thresholds { gain_pct: 25.0, loss_pct: -10.0 });
    }

    #[test]
    fn sector_rule_beats_base() {
        let rules = vec![base(5.0, -5.0), sector("Banking", 8.0, -8.0), company("Other", 25.0, -10.0)];

        let t = resolve("Acme", Some("banking"), &rules).unwrap();
        assert_eq!(t, Thresholds { gain_pct: 8.0, loss_pct: -8.0 });
    }

    #[test]
    fn base_rule_used_when_nothing_specific_matches() {
        let rules = vec![sector("Energy", 8.0, -8.0), base(12.0, -7.5)];

        let t = resolve("Acme", Some("Banking"), &rules).unwrap();
        assert_eq!(t, Thresholds { gain_pct: 12.0, loss_pct: -7.5 });
    }

    #[test]
    fn fallback_without_any_rules() {
        let t = resolve("Acme", None, &[]).unwrap();
        assert_eq!(t, Thresholds { gain_pct: 15.0, loss_pct: -15.0 });
        assert_eq!(Thresholds::default(), Thresholds::FALLBACK);
    }

    #[test]
    fn names_match_case_insensitively_but_exactly() {
        let rules = vec![company("ACME Ltd", 30.0, -30.0)];
        let book = RuleBook::new(&rules).unwrap();

        assert_eq!(book.resolve("acme ltd", None).gain_pct, 30.0);
        assert_eq!(book.resolve("acme", None), Thresholds::FALLBACK);
        assert_eq!(book.resolve("acme ltd ", None), Thresholds::FALLBACK);
    }

    #[test]
    fn missing_sector_never_matches_sector_rules() {
        let rules = vec![sector("", 8.0, -8.0), sector("Banking", 9.0, -9.0)];
        let book = RuleBook::new(&rules).unwrap();

        assert_eq!(book.resolve("Acme", None), Thresholds::FALLBACK);
        assert_eq!(book.resolve("Acme", Some("")), Thresholds::FALLBACK);
    }

    #[test]
    fn first_duplicate_company_rule_wins() {
        let rules = vec![company("Acme", 20.0, -20.0), company("acme", 40.0, -40.0)];

        let t = resolve("Acme", None, &rules).unwrap();
        assert_eq!(t.gain_pct, 20.0);
    }

    #[test]
    fn second_base_rule_is_rejected() {
        let rules = vec![base(10.0, -10.0), base(20.0, -20.0)];

        let err = RuleBook::new(&rules).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateBase { .. }));
    }

    #[test]
    fn missing_threshold_is_a_validation_error() {
        let mut r = company("Acme", 20.0, -20.0);
        r.loss_pct = None;

        let err = resolve("Acme", None, &[r]).unwrap_err();
        assert!(matches!(err, RuleError::MissingThreshold { field: "loss", .. }));
        assert!(err.to_string().contains("no loss threshold"));
    }

    #[test]
    fn unmatched_invalid_rule_still_fails() {
        let rules = vec![company("Acme", 20.0, -20.0), sector("Energy", f64::NAN, -5.0)];

        let err = resolve("Acme", None, &rules).unwrap_err();
        assert!(matches!(err, RuleError::NonFinite { .. }));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = resolve("Acme", None, &[base(-5.0, 5.0)]).unwrap_err();
        assert!(matches!(err, RuleError::InvertedThresholds { .. }));

        let err = resolve("Acme", None, &[base(5.0, 5.0)]).unwrap_err();
        assert!(matches!(err, RuleError::InvertedThresholds { .. }));
    }

    #[test]
    fn resolving_twice_gives_the_same_answer() {
        let rules = vec![sector("Banking", 8.0, -8.0), base(12.0, -7.5)];

        let a = resolve("Acme", Some("Banking"), &rules).unwrap();
        let b = resolve("Acme", Some("Banking"), &rules).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn books_are_scoped_per_user() {
        let mut other = base(30.0, -30.0);
        other.user_id = "u2".to_string();
        let rules = vec![base(10.0, -10.0), other];

        let books = books_by_user(&rules).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books["u1"].resolve("Acme", None).gain_pct, 10.0);
        assert_eq!(books["u2"].resolve("Acme", None).gain_pct, 30.0);
    }
}
