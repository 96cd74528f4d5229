use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored comic together with its ordered relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Comic {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub thumb_img: Option<String>,
    pub preview_img: Option<String>,
    pub author_id: Option<i64>,
    pub total_sub: i64,
    pub chapters: Vec<i64>,
    pub genres: Vec<String>,
    pub rates: Vec<RateEntry>,
    pub comments: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RateEntry {
    pub user_id: i64,
    pub rate: i32,
}

/// Partial update applied by `ComicStore::update`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumb_img: Option<String>,
    pub preview_img: Option<String>,
    pub genre: Option<Vec<String>>,
}

impl ComicPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.thumb_img.is_none()
            && self.preview_img.is_none()
            && self.genre.is_none()
    }
}

/// Read-only projection returned by the comic endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub thumb_img: Option<String>,
    pub preview_img: Option<String>,
    pub chapters: Vec<i64>,
    pub genre: Vec<String>,
    pub author: Option<i64>,
    pub rate: Vec<RateEntry>,
    pub comment: Vec<i64>,
    pub total_sub: i64,
    pub total_views: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rates: Option<i64>,
}

impl ComicView {
    pub fn project(comic: &Comic, total_views: i64) -> Self {
        Self {
            id: comic.id,
            title: comic.title.clone(),
            description: comic.description.clone(),
            thumb_img: comic.thumb_img.clone(),
            preview_img: comic.preview_img.clone(),
            chapters: comic.chapters.clone(),
            genre: comic.genres.clone(),
            author: comic.author_id,
            rate: comic.rates.clone(),
            comment: comic.comments.clone(),
            total_sub: comic.total_sub,
            total_views,
            total_rates: None,
        }
    }

    pub fn with_total_rates(mut self, total_rates: i64) -> Self {
        self.total_rates = Some(total_rates);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicDetailView {
    #[serde(flatten)]
    pub comic: ComicView,
    pub is_sub: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    pub id: i64,
    pub title: String,
    pub thumb_img: Option<String>,
}

impl From<&Comic> for SubscriptionEntry {
    fn from(comic: &Comic) -> Self {
        Self {
            id: comic.id,
            title: comic.title.clone(),
            thumb_img: comic.thumb_img.clone(),
        }
    }
}

/// Outcome of a subscription toggle: the new membership state and the
/// comic's subscriber counter after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionToggle {
    pub subscribed: bool,
    pub total_sub: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub comic_id: RawId,
}
