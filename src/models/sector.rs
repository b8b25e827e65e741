use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,
    pub created_at: i64,
}
