use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Some(Direction::Above),
            "below" => Some(Direction::Below),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    // upstream id, e.g. "bitcoin"
    pub asset_id: String,
    pub asset_name: String,
    pub asset_symbol: String,

    pub target_price: f64,
    pub direction: Direction,

    // informational only
    #[serde(default)]
    pub last_price: f64,

    pub active: bool,
    pub fired: bool,
    #[serde(default)]
    pub fired_at: Option<i64>,
    #[serde(default)]
    pub notified: bool,

    pub created_at: i64,

    /// Resolved from `users` when alerts are loaded for a cycle.
    #[serde(default, skip_serializing)]
    pub user_email: Option<String>,
}

impl Alert {
    /// Only alerts in this state are ever evaluated.
    pub fn is_watching(&self) -> bool {
        self.active && !self.fired
    }
}
