use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: i64,
    pub comic_id: i64,
    pub title: String,
    pub position: i32,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}
