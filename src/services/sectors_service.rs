use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;

use crate::{models::Sector, AppState};

pub async fn list_sectors(state: &AppState) -> Result<Vec<Sector>, String> {
    let sectors = state.db.collection::<Sector>("sectors");
    let find_opts = FindOptions::builder().sort(doc! { "name": 1 }).build();

    let mut cursor = sectors
        .find(doc! {}, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<Sector> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }
    Ok(items)
}

pub async fn sector_exists(state: &AppState, name: &str) -> Result<bool, String> {
    let sectors = state.db.collection::<Sector>("sectors");
    let found = sectors
        .find_one(doc! { "name": name }, None)
        .await
        .map_err(|e| e.to_string())?;
    Ok(found.is_some())
}

pub async fn create_sector(state: &AppState, name: &str) -> Result<Sector, String> {
    let sectors = state.db.collection::<Sector>("sectors");

    let sector = Sector {
        id: ObjectId::new(),
        name: name.to_string(),
        created_at: Utc::now().timestamp(),
    };

    sectors
        .insert_one(&sector, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(sector)
}

pub async fn delete_sector(state: &AppState, sector_id: ObjectId) -> Result<(), String> {
    let sectors = state.db.collection::<Sector>("sectors");

    sectors
        .delete_one(doc! { "_id": sector_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
