use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use serde::{Deserialize, Serialize};

use crate::{models::Ipo, AppState};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewIpo {
    pub company_name: String,
    pub sector_id: Option<String>,
    pub sector_name: Option<String>,
    #[serde(default)]
    pub portfolio: bool,
    pub no_of_shares: Option<f64>,
    pub buy_price: Option<f64>,
    pub groww_link: Option<String>,
    pub listed_on: Option<String>,
    pub issue_price: Option<String>,
    pub listing_price: Option<String>,
    pub issue_size: Option<String>,
    pub qib_subscription: Option<String>,
    pub nii_subscription: Option<String>,
    pub rii_subscription: Option<String>,
    pub total_subscription: Option<String>,
}

/// Partial update; only the fields present are written.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IpoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_of_shares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groww_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qib_subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nii_subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rii_subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_subscription: Option<String>,
}

impl NewIpo {
    pub fn into_ipo(self, user_id: &str) -> Ipo {
        let mut ipo = Ipo::new(user_id, self.company_name.trim());
        ipo.sector_id = self.sector_id;
        ipo.sector_name = self.sector_name;
        ipo.portfolio = self.portfolio;
        ipo.no_of_shares = self.no_of_shares;
        ipo.buy_price = self.buy_price;
        ipo.groww_link = self.groww_link;
        ipo.listed_on = self.listed_on;
        ipo.issue_price = self.issue_price;
        ipo.listing_price = self.listing_price;
        ipo.issue_size = self.issue_size;
        ipo.qib_subscription = self.qib_subscription;
        ipo.nii_subscription = self.nii_subscription;
        ipo.rii_subscription = self.rii_subscription;
        ipo.total_subscription = self.total_subscription;
        ipo
    }
}

pub async fn list_user_ipos(
    state: &AppState,
    user_id: &str,
    portfolio_only: bool,
) -> Result<Vec<Ipo>, String> {
    let ipos = state.db.collection::<Ipo>("ipos");

    let mut filter = doc! { "user_id": user_id };
    if portfolio_only {
        filter.insert("portfolio", true);
    }
    let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

    let mut cursor = ipos
        .find(filter, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<Ipo> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }
    Ok(items)
}

pub async fn create_ipo(state: &AppState, user_id: &str, input: NewIpo) -> Result<Ipo, String> {
    let ipos = state.db.collection::<Ipo>("ipos");
    let ipo = input.into_ipo(user_id);

    ipos.insert_one(&ipo, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(ipo)
}

pub async fn get_user_ipo(
    state: &AppState,
    user_id: &str,
    ipo_id: ObjectId,
) -> Result<Option<Ipo>, String> {
    let ipos = state.db.collection::<Ipo>("ipos");
    ipos.find_one(doc! { "_id": ipo_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())
}

/// Returns the updated record, or `None` when the user has no such IPO.
pub async fn update_ipo(
    state: &AppState,
    user_id: &str,
    ipo_id: ObjectId,
    patch: &IpoPatch,
) -> Result<Option<Ipo>, String> {
    let ipos = state.db.collection::<Ipo>("ipos");

    let mut set = bson::to_document(patch).map_err(|e| e.to_string())?;
    set.insert("updated_at", Utc::now().timestamp());

    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    ipos.find_one_and_update(
        doc! { "_id": ipo_id, "user_id": user_id },
        doc! { "$set": set },
        opts,
    )
    .await
    .map_err(|e| e.to_string())
}

pub async fn delete_ipo(state: &AppState, user_id: &str, ipo_id: ObjectId) -> Result<(), String> {
    let ipos = state.db.collection::<Ipo>("ipos");

    ipos.delete_one(doc! { "_id": ipo_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = IpoPatch {
            listing_price: Some("152".to_string()),
            portfolio: Some(true),
            ..IpoPatch::default()
        };

        let set = bson::to_document(&patch).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("listing_price").unwrap(), "152");
        assert!(set.get_bool("portfolio").unwrap());
    }

    #[test]
    fn new_ipo_is_owned_by_caller() {
        let input = NewIpo {
            company_name: "  Acme  ".to_string(),
            issue_price: Some("141-148".to_string()),
            portfolio: true,
            ..NewIpo::default()
        };

        let ipo = input.into_ipo("u1");
        assert_eq!(ipo.user_id, "u1");
        assert_eq!(ipo.company_name, "Acme");
        assert_eq!(ipo.issue_price.as_deref(), Some("141-148"));
        assert!(ipo.portfolio);
        assert_eq!(ipo.updated_at, None);
    }
}
