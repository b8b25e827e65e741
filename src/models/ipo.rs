use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipo {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // value of the x-user-id header that created the record
    pub user_id: String,

    pub company_name: String,
    #[serde(default)]
    pub sector_id: Option<String>,
    #[serde(default)]
    pub sector_name: Option<String>,

    #[serde(default)]
    pub portfolio: bool,
    #[serde(default)]
    pub no_of_shares: Option<f64>,
    #[serde(default)]
    pub buy_price: Option<f64>,

    #[serde(default)]
    pub groww_link: Option<String>,
    #[serde(default)]
    pub listed_on: Option<String>,

    // raw text as entered or scraped, e.g. "₹1,234" or "141-148"
    #[serde(default)]
    pub issue_price: Option<String>,
    #[serde(default)]
    pub listing_price: Option<String>,

    #[serde(default)]
    pub issue_size: Option<String>,
    #[serde(default)]
    pub qib_subscription: Option<String>,
    #[serde(default)]
    pub nii_subscription: Option<String>,
    #[serde(default)]
    pub rii_subscription: Option<String>,
    #[serde(default)]
    pub total_subscription: Option<String>,

    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Ipo {
    pub fn new(user_id: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            company_name: company_name.into(),
            sector_id: None,
            sector_name: None,
            portfolio: false,
            no_of_shares: None,
            buy_price: None,
            groww_link: None,
            listed_on: None,
            issue_price: None,
            listing_price: None,
            issue_size: None,
            qib_subscription: None,
            nii_subscription: None,
            rii_subscription: None,
            total_subscription: None,
            created_at: Utc::now().timestamp(),
            updated_at: None,
        }
    }
}
