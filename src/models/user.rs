use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Account record owned by the surrounding service; only read here to find
/// where a notification should go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,

    #[serde(default)]
    pub username: Option<String>,
}
