use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    pub coin: i64,
    pub vip: bool,
    pub is_admin: bool,
    /// Subscribed comic ids, oldest subscription first.
    pub subscribe: Vec<i64>,
    pub like: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_subscribed_to(&self, comic_id: i64) -> bool {
        self.subscribe.contains(&comic_id)
    }
}
