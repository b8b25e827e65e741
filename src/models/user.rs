use serde::{Deserialize, Serialize};

/// Caller identity taken from the `x-user-id` header. Users are managed by
/// the frontend's auth provider; the API only scopes data by this id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}
