use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use serde::Deserialize;

use crate::{
    models::{AlertRule, RuleScope},
    AppState,
};

use super::rule_resolver::{DEFAULT_GAIN_PCT, DEFAULT_LOSS_PCT};

fn default_gain() -> f64 {
    DEFAULT_GAIN_PCT
}

fn default_loss() -> f64 {
    DEFAULT_LOSS_PCT
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    #[serde(rename = "type")]
    pub kind: String,
    pub sector_id: Option<String>,
    pub sector_name: Option<String>,
    pub company_name: Option<String>,
    #[serde(default = "default_gain")]
    pub gain_pct: f64,
    #[serde(default = "default_loss")]
    pub loss_pct: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulePatch {
    pub gain_pct: Option<f64>,
    pub loss_pct: Option<f64>,
    pub sector_id: Option<String>,
    pub sector_name: Option<String>,
    pub company_name: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl NewRule {
    pub fn scope(&self) -> Result<RuleScope, String> {
        match self.kind.to_lowercase().as_str() {
            "base" => Ok(RuleScope::Base),
            "sector" => {
                let sector_name = non_empty(&self.sector_name)
                    .ok_or_else(|| "sector rules need a sector_name".to_string())?;
                Ok(RuleScope::Sector {
                    sector_id: non_empty(&self.sector_id),
                    sector_name,
                })
            }
            "company" => {
                let company_name = non_empty(&self.company_name)
                    .ok_or_else(|| "company rules need a company_name".to_string())?;
                Ok(RuleScope::Company { company_name })
            }
            other => Err(format!("unknown rule type \"{other}\" (expected base, sector or company)")),
        }
    }
}

/// Gain must be a positive percentage and loss a negative one.
pub fn validate_thresholds(gain_pct: f64, loss_pct: f64) -> Result<(), String> {
    if !gain_pct.is_finite() || !loss_pct.is_finite() {
        return Err("thresholds must be finite numbers".to_string());
    }
    if gain_pct <= 0.0 {
        return Err("gain_pct must be greater than 0".to_string());
    }
    if loss_pct >= 0.0 {
        return Err("loss_pct must be less than 0".to_string());
    }
    Ok(())
}

/// Case-insensitive exact match on a name, the way the resolver compares.
fn name_eq(name: &str) -> Document {
    doc! { "$regex": format!("^{}$", regex::escape(name)), "$options": "i" }
}

/// Filter for the rule a new one of the same scope would replace.
fn existing_filter(user_id: &str, scope: &RuleScope) -> Document {
    match scope {
        RuleScope::Base => doc! { "user_id": user_id, "type": "base" },
        RuleScope::Sector { sector_id: Some(id), .. } => {
            doc! { "user_id": user_id, "type": "sector", "sector_id": id }
        }
        RuleScope::Sector { sector_id: None, sector_name } => {
            doc! { "user_id": user_id, "type": "sector", "sector_name": name_eq(sector_name) }
        }
        RuleScope::Company { company_name } => {
            doc! { "user_id": user_id, "type": "company", "company_name": name_eq(company_name) }
        }
    }
}

/// Update for an upsert. `user_id`, `type` and a `sector_id` come from the
/// filter's equality clauses when the rule is inserted.
fn upsert_update(
    scope: &RuleScope,
    gain_pct: f64,
    loss_pct: f64,
    new_id: ObjectId,
    now: i64,
) -> Document {
    let mut set = doc! { "gain_pct": gain_pct, "loss_pct": loss_pct, "updated_at": now };
    match scope {
        RuleScope::Sector { sector_name, .. } => {
            set.insert("sector_name", sector_name);
        }
        RuleScope::Company { company_name } => {
            set.insert("company_name", company_name);
        }
        RuleScope::Base => {}
    }

    doc! {
        "$set": set,
        "$setOnInsert": { "_id": new_id, "created_at": now },
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Command(c) => c.code == DUPLICATE_KEY,
        ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == DUPLICATE_KEY,
        _ => false,
    }
}

pub async fn list_user_rules(state: &AppState, user_id: &str) -> Result<Vec<AlertRule>, String> {
    let rules = state.db.collection::<AlertRule>("alert_rules");
    let find_opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();

    let mut cursor = rules
        .find(doc! { "user_id": user_id }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<AlertRule> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }
    Ok(items)
}

/// Creates the rule, or updates the thresholds of the user's existing rule
/// for the same scope, in one atomic upsert. The bool is true when a new
/// rule was inserted.
pub async fn upsert_rule(
    state: &AppState,
    user_id: &str,
    scope: RuleScope,
    gain_pct: f64,
    loss_pct: f64,
) -> Result<(AlertRule, bool), String> {
    let rules = state.db.collection::<AlertRule>("alert_rules");
    let filter = existing_filter(user_id, &scope);

    let opts = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();

    // A concurrent insert of the same base rule trips the unique index; the
    // second attempt then finds and updates that rule.
    let mut attempt = 0;
    loop {
        attempt += 1;
        let new_id = ObjectId::new();
        let update = upsert_update(&scope, gain_pct, loss_pct, new_id, Utc::now().timestamp());

        match rules
            .find_one_and_update(filter.clone(), update, opts.clone())
            .await
        {
            Ok(Some(rule)) => {
                let created = rule.id == new_id;
                return Ok((rule, created));
            }
            Ok(None) => return Err("upsert returned no document".to_string()),
            Err(e) if attempt < 2 && is_duplicate_key(&e) => {
                tracing::warn!("concurrent {} rule insert for {}, retrying", scope.kind(), user_id);
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}

/// Applies a patch to one of the user's rules. The merged thresholds are
/// validated before anything is written. `Ok(None)` when there is no such
/// rule.
pub async fn update_rule(
    state: &AppState,
    user_id: &str,
    rule_id: ObjectId,
    patch: &RulePatch,
) -> Result<Option<AlertRule>, RuleUpdateError> {
    let rules = state.db.collection::<AlertRule>("alert_rules");
    let filter = doc! { "_id": rule_id, "user_id": user_id };

    let Some(current) = rules
        .find_one(filter.clone(), None)
        .await
        .map_err(|e| RuleUpdateError::Db(e.to_string()))?
    else {
        return Ok(None);
    };

    let gain_pct = patch.gain_pct.or(current.gain_pct).unwrap_or(DEFAULT_GAIN_PCT);
    let loss_pct = patch.loss_pct.or(current.loss_pct).unwrap_or(DEFAULT_LOSS_PCT);
    validate_thresholds(gain_pct, loss_pct).map_err(RuleUpdateError::Invalid)?;

    let mut set = doc! {
        "gain_pct": gain_pct,
        "loss_pct": loss_pct,
        "updated_at": Utc::now().timestamp(),
    };
    if let Some(v) = &patch.sector_id {
        set.insert("sector_id", v);
    }
    if let Some(v) = non_empty(&patch.sector_name) {
        set.insert("sector_name", v);
    }
    if let Some(v) = non_empty(&patch.company_name) {
        set.insert("company_name", v);
    }

    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    rules
        .find_one_and_update(filter, doc! { "$set": set }, opts)
        .await
        .map_err(|e| RuleUpdateError::Db(e.to_string()))
}

#[derive(Debug)]
pub enum RuleUpdateError {
    Invalid(String),
    Db(String),
}

pub async fn delete_rule(state: &AppState, user_id: &str, rule_id: ObjectId) -> Result<(), String> {
    let rules = state.db.collection::<AlertRule>("alert_rules");

    rules
        .delete_one(doc! { "_id": rule_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
