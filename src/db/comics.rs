use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, QueryBuilder};

use super::MySqlStore;
use crate::error::StoreError;
use crate::models::{Comic, ComicPatch, RateEntry};
use crate::store::ComicStore;

#[derive(Debug, FromRow)]
struct ComicRow {
    id: i64,
    title: String,
    description: Option<String>,
    thumb_img: Option<String>,
    preview_img: Option<String>,
    author_id: Option<i64>,
    total_sub: i64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct RateRow {
    comic_id: i64,
    user_id: i64,
    rate: i32,
}

const COMIC_COLUMNS: &str = r#"
    c.id, c.title, c.description, c.thumb_img, c.preview_img,
    c.author_id, c.total_sub, c.created_at, c.updated_at
"#;

/// `prefix (?, ?, ...) suffix` with one bound parameter per id.
pub(super) fn in_list(prefix: &str, ids: &[i64], suffix: &str) -> QueryBuilder<'static, MySql> {
    let mut query_builder = QueryBuilder::<MySql>::new(prefix);
    {
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
    }
    query_builder.push(suffix);
    query_builder
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn group_ids(rows: Vec<(i64, i64)>) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (comic_id, id) in rows {
        grouped.entry(comic_id).or_default().push(id);
    }
    grouped
}

impl MySqlStore {
    /// Loads chapters, genres, rates and comments for the given rows, one
    /// query per relation.
    async fn hydrate(&self, rows: Vec<ComicRow>) -> Result<Vec<Comic>, sqlx::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let comic_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let chapter_rows: Vec<(i64, i64)> = in_list(
            "SELECT comic_id, id FROM chapters WHERE comic_id IN (",
            &comic_ids,
            ") ORDER BY comic_id, position, id",
        )
        .build_query_as::<(i64, i64)>()
        .fetch_all(&self.pool)
        .await?;

        let genre_rows: Vec<(i64, String)> = in_list(
            "SELECT comic_id, genre FROM comic_genres WHERE comic_id IN (",
            &comic_ids,
            ") ORDER BY comic_id, genre",
        )
        .build_query_as::<(i64, String)>()
        .fetch_all(&self.pool)
        .await?;

        let rate_rows: Vec<RateRow> = in_list(
            "SELECT comic_id, user_id, rate FROM comic_rates WHERE comic_id IN (",
            &comic_ids,
            ") ORDER BY comic_id, created_at, id",
        )
        .build_query_as::<RateRow>()
        .fetch_all(&self.pool)
        .await?;

        let comment_rows: Vec<(i64, i64)> = in_list(
            "SELECT comic_id, id FROM comments WHERE comic_id IN (",
            &comic_ids,
            ") ORDER BY comic_id, created_at, id",
        )
        .build_query_as::<(i64, i64)>()
        .fetch_all(&self.pool)
        .await?;

        let mut chapters = group_ids(chapter_rows);
        let mut comments = group_ids(comment_rows);

        let mut genres: HashMap<i64, Vec<String>> = HashMap::new();
        for (comic_id, genre) in genre_rows {
            genres.entry(comic_id).or_default().push(genre);
        }

        let mut rates: HashMap<i64, Vec<RateEntry>> = HashMap::new();
        for row in rate_rows {
            rates.entry(row.comic_id).or_default().push(RateEntry {
                user_id: row.user_id,
                rate: row.rate,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Comic {
                chapters: chapters.remove(&row.id).unwrap_or_default(),
                genres: genres.remove(&row.id).unwrap_or_default(),
                rates: rates.remove(&row.id).unwrap_or_default(),
                comments: comments.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                description: row.description,
                thumb_img: row.thumb_img,
                preview_img: row.preview_img,
                author_id: row.author_id,
                total_sub: row.total_sub,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl ComicStore for MySqlStore {
    async fn get_by_id(&self, id: i64) -> Result<Comic, StoreError> {
        let row = sqlx::query_as::<_, ComicRow>(&format!(
            "SELECT {} FROM comics c WHERE c.id = ?",
            COMIC_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::comic_not_found(id))?;

        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or_else(|| StoreError::comic_not_found(id))
    }

    async fn get_all(&self) -> Result<Vec<Comic>, StoreError> {
        let rows = sqlx::query_as::<_, ComicRow>(&format!(
            "SELECT {} FROM comics c ORDER BY c.id ASC",
            COMIC_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(self.hydrate(rows).await?)
    }

    async fn get_by_genre(&self, genre: &str) -> Result<Vec<Comic>, StoreError> {
        let rows = sqlx::query_as::<_, ComicRow>(&format!(
            r#"
            SELECT {}
            FROM comics c
            JOIN comic_genres g ON g.comic_id = c.id
            WHERE g.genre = ?
            ORDER BY c.id ASC
            "#,
            COMIC_COLUMNS
        ))
        .bind(genre)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.hydrate(rows).await?)
    }

    async fn search_by_name(&self, text: &str) -> Result<Vec<Comic>, StoreError> {
        let pattern = format!("%{}%", escape_like(text));
        let rows = sqlx::query_as::<_, ComicRow>(&format!(
            "SELECT {} FROM comics c WHERE c.title LIKE ? ORDER BY c.id ASC",
            COMIC_COLUMNS
        ))
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.hydrate(rows).await?)
    }

    async fn get_newest(&self, limit: i64) -> Result<Vec<Comic>, StoreError> {
        let rows = sqlx::query_as::<_, ComicRow>(&format!(
            "SELECT {} FROM comics c ORDER BY c.created_at DESC, c.id DESC LIMIT ?",
            COMIC_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.hydrate(rows).await?)
    }

    async fn update(&self, id: i64, patch: ComicPatch) -> Result<Comic, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_as::<_, (i64,)>("SELECT id FROM comics WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::comic_not_found(id))?;

        sqlx::query(
            r#"
            UPDATE comics SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                thumb_img = COALESCE(?, thumb_img),
                preview_img = COALESCE(?, preview_img),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.thumb_img)
        .bind(&patch.preview_img)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(genres) = &patch.genre {
            sqlx::query("DELETE FROM comic_genres WHERE comic_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for genre in genres {
                let genre = genre.trim();
                if genre.is_empty() {
                    continue;
                }
                sqlx::query("INSERT IGNORE INTO comic_genres (comic_id, genre) VALUES (?, ?)")
                    .bind(id)
                    .bind(genre)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }
}
