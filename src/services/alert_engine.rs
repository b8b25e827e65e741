//! Threshold evaluation for IPO holdings.
//!
//! For each holding the current market price (CMP) is compared with the
//! issue price and the listing price. Each reference that moved at least as
//! far as the resolved gain or loss threshold contributes one reason, and a
//! holding with at least one reason yields one [`AlertRecord`].

use std::collections::HashMap;
use std::fmt;

use crate::models::Ipo;

use super::rule_resolver::{RuleBook, Thresholds};

/// Current market prices for one batch, keyed by company name without
/// regard to case.
#[derive(Debug, Clone, Default)]
pub struct CmpMap {
    prices: HashMap<String, f64>,
}

impl CmpMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, company_name: &str, price: f64) {
        self.prices.insert(company_name.to_lowercase(), price);
    }

    pub fn get(&self, company_name: &str) -> Option<f64> {
        self.prices.get(&company_name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for CmpMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut map = CmpMap::new();
        for (name, price) in iter {
            map.insert(name.as_ref(), price);
        }
        map
    }
}

/// Two decimal places, exact halves going to the even neighbour
/// (`15.125` -> `15.12`, `15.135` -> `15.14`).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Turns a stored price such as `"₹1,234.50"` or `"141-148"` into a number.
/// Ranges keep their first value. Anything that does not parse is `None`.
pub fn parse_reference_price(raw: Option<&str>) -> Option<f64> {
    let cleaned: String = raw?
        .chars()
        .filter(|c| *c != '₹' && *c != ',' && !c.is_whitespace())
        .collect();

    let first = cleaned.split('-').next()?.split("to").next()?;
    if first.is_empty() {
        return None;
    }

    first.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `(cmp - reference) * 100 / reference`, rounded to 2 decimals. Undefined
/// when the reference is missing or zero.
pub fn percentage_change(cmp: f64, reference: Option<f64>) -> Option<f64> {
    match reference {
        Some(r) if r != 0.0 => Some(round2((cmp - r) * 100.0 / r)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Issue,
    Listing,
}

impl ReferenceKind {
    pub fn label(self) -> &'static str {
        match self {
            ReferenceKind::Issue => "Issue Price",
            ReferenceKind::Listing => "Listing Price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Gain,
    Loss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertReason {
    pub reference: ReferenceKind,
    pub direction: Direction,
    pub pct: f64,
    pub reference_price: f64,
    pub threshold: f64,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Gain => write!(
                f,
                "🟢 {:+.2}% vs {} (₹{}) - above gain threshold of +{}%",
                self.pct,
                self.reference.label(),
                self.reference_price,
                self.threshold
            ),
            Direction::Loss => write!(
                f,
                "🔴 {:.2}% vs {} (₹{}) - below loss threshold of {}%",
                self.pct,
                self.reference.label(),
                self.reference_price,
                self.threshold
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub company_name: String,
    pub sector: Option<String>,
    pub cmp: f64,
    pub issue_price: Option<f64>,
    pub listing_price: Option<f64>,
    pub pct_vs_issue: Option<f64>,
    pub pct_vs_listing: Option<f64>,
    pub thresholds: Thresholds,
    pub reasons: Vec<AlertReason>,
}

impl AlertRecord {
    pub fn reason_lines(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }

    pub fn all_gains(&self) -> bool {
        self.reasons.iter().all(|r| r.direction == Direction::Gain)
    }
}

fn check_reference(
    reference: ReferenceKind,
    pct: Option<f64>,
    reference_price: Option<f64>,
    thresholds: &Thresholds,
) -> Option<AlertReason> {
    let (pct, reference_price) = (pct?, reference_price?);

    let (direction, threshold) = if pct >= thresholds.gain_pct {
        (Direction::Gain, thresholds.gain_pct)
    } else if pct <= thresholds.loss_pct {
        (Direction::Loss, thresholds.loss_pct)
    } else {
        return None;
    };

    Some(AlertReason {
        reference,
        direction,
        pct,
        reference_price,
        threshold,
    })
}

/// Evaluates one holding. `None` when there is no price for the company or
/// no threshold was crossed.
pub fn evaluate_ipo(ipo: &Ipo, rules: &RuleBook, cmp_map: &CmpMap) -> Option<AlertRecord> {
    let Some(cmp) = cmp_map.get(&ipo.company_name) else {
        tracing::info!("no CMP for {}, skipping alert check", ipo.company_name);
        return None;
    };

    let thresholds = rules.resolve(&ipo.company_name, ipo.sector_name.as_deref());

    let issue_price = parse_reference_price(ipo.issue_price.as_deref());
    let listing_price = parse_reference_price(ipo.listing_price.as_deref());

    let pct_vs_issue = percentage_change(cmp, issue_price);
    let pct_vs_listing = percentage_change(cmp, listing_price);

    let reasons: Vec<AlertReason> = [
        check_reference(ReferenceKind::Issue, pct_vs_issue, issue_price, &thresholds),
        check_reference(ReferenceKind::Listing, pct_vs_listing, listing_price, &thresholds),
    ]
    .into_iter()
    .flatten()
    .collect();

    if reasons.is_empty() {
        return None;
    }

    Some(AlertRecord {
        company_name: ipo.company_name.clone(),
        sector: ipo.sector_name.clone(),
        cmp,
        issue_price,
        listing_price,
        pct_vs_issue,
        pct_vs_listing,
        thresholds,
        reasons,
    })
}

/// Evaluates every holding against one rule book, keeping input order.
pub fn evaluate(ipos: &[Ipo], rules: &RuleBook, cmp_map: &CmpMap) -> Vec<AlertRecord> {
    ipos.iter()
        .filter_map(|ipo| evaluate_ipo(ipo, rules, cmp_map))
        .collect()
}
