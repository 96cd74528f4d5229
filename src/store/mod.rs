//! Collaborator interfaces used by the aggregation pipeline.
//!
//! Production wiring uses [`crate::db::MySqlStore`] for all four traits; tests
//! use the in-memory store.

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Chapter, Comic, ComicPatch, SubscriptionToggle, User};

#[async_trait]
pub trait ChapterViewSource: Send + Sync {
    async fn get_view(&self, chapter_id: i64) -> Result<i64, StoreError>;

    /// Returns the chapters in the order of `ids`. Unknown ids are skipped.
    async fn get_chapters_by_ids(&self, ids: &[i64]) -> Result<Vec<Chapter>, StoreError>;
}

#[async_trait]
pub trait ComicStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Comic, StoreError>;
    async fn get_all(&self) -> Result<Vec<Comic>, StoreError>;
    async fn get_by_genre(&self, genre: &str) -> Result<Vec<Comic>, StoreError>;
    async fn search_by_name(&self, text: &str) -> Result<Vec<Comic>, StoreError>;
    async fn get_newest(&self, limit: i64) -> Result<Vec<Comic>, StoreError>;
    async fn update(&self, id: i64, patch: ComicPatch) -> Result<Comic, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Flips membership of `comic_id` in the user's subscribe set and adjusts
    /// the comic's `total_sub` in the same atomic unit.
    async fn toggle_subscription(
        &self,
        user_id: i64,
        comic_id: i64,
    ) -> Result<SubscriptionToggle, StoreError>;
}
