use std::collections::HashMap;

use async_trait::async_trait;

use super::MySqlStore;
use super::comics::in_list;
use crate::error::StoreError;
use crate::models::Chapter;
use crate::store::ChapterViewSource;

#[async_trait]
impl ChapterViewSource for MySqlStore {
    async fn get_view(&self, chapter_id: i64) -> Result<i64, StoreError> {
        let (views,) = sqlx::query_as::<_, (i64,)>("SELECT views FROM chapters WHERE id = ?")
            .bind(chapter_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::chapter_not_found(chapter_id))?;

        Ok(views)
    }

    async fn get_chapters_by_ids(&self, ids: &[i64]) -> Result<Vec<Chapter>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Chapter> = in_list(
            "SELECT id, comic_id, title, position, views, created_at FROM chapters WHERE id IN (",
            ids,
            ")",
        )
        .build_query_as::<Chapter>()
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<i64, Chapter> =
            rows.into_iter().map(|chapter| (chapter.id, chapter)).collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
