use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// What an alert rule applies to. Stored flattened with a `type` tag of
/// `base`, `sector` or `company`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleScope {
    Base,
    Sector {
        #[serde(default)]
        sector_id: Option<String>,
        sector_name: String,
    },
    Company {
        company_name: String,
    },
}

impl RuleScope {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleScope::Base => "base",
            RuleScope::Sector { .. } => "sector",
            RuleScope::Company { .. } => "company",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: String,

    #[serde(flatten)]
    pub scope: RuleScope,

    // Optional so a document missing a threshold still loads and is
    // rejected with a validation error when the rule book is built.
    #[serde(default)]
    pub gain_pct: Option<f64>,
    #[serde(default)]
    pub loss_pct: Option<f64>,

    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}
