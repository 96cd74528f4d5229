use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::MySqlStore;
use crate::error::StoreError;
use crate::models::{SubscriptionToggle, User};
use crate::store::{SubscriptionStore, UserStore};

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    hashed_password: Option<String>,
    coin: i64,
    vip: bool,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, hashed_password, coin, vip, is_admin, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::user_not_found(id))?;

        let subscribe: Vec<i64> = sqlx::query_scalar(
            "SELECT comic_id FROM user_subscriptions WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let like: Vec<i64> = sqlx::query_scalar(
            "SELECT comic_id FROM user_likes WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            hashed_password: row.hashed_password,
            coin: row.coin,
            vip: row.vip,
            is_admin: row.is_admin,
            subscribe,
            like,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// SQLSTATE MySQL reports for InnoDB deadlocks (error 1213).
const DEADLOCK_SQLSTATE: &str = "40001";

fn is_deadlock(err: &StoreError) -> bool {
    match err {
        StoreError::Database(sqlx::Error::Database(db_err)) => {
            db_err.code().as_deref() == Some(DEADLOCK_SQLSTATE)
        }
        _ => false,
    }
}

#[async_trait]
impl SubscriptionStore for MySqlStore {
    async fn toggle_subscription(
        &self,
        user_id: i64,
        comic_id: i64,
    ) -> Result<SubscriptionToggle, StoreError> {
        match self.toggle_once(user_id, comic_id).await {
            Err(err) if is_deadlock(&err) => {
                tracing::warn!(
                    user_id = user_id,
                    comic_id = comic_id,
                    "subscription toggle deadlocked; retrying once"
                );
                self.toggle_once(user_id, comic_id).await
            }
            outcome => outcome,
        }
    }
}

impl MySqlStore {
    async fn toggle_once(
        &self,
        user_id: i64,
        comic_id: i64,
    ) -> Result<SubscriptionToggle, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The comic row lock serializes concurrent toggles on the same comic,
        // so the membership read below needs no lock of its own.
        sqlx::query_scalar::<_, i64>("SELECT total_sub FROM comics WHERE id = ? FOR UPDATE")
            .bind(comic_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::comic_not_found(comic_id))?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::user_not_found(user_id))?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM user_subscriptions WHERE user_id = ? AND comic_id = ?",
        )
        .bind(user_id)
        .bind(comic_id)
        .fetch_optional(&mut *tx)
        .await?;

        let subscribed = match existing {
            Some(subscription_id) => {
                sqlx::query("DELETE FROM user_subscriptions WHERE id = ?")
                    .bind(subscription_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE comics SET total_sub = GREATEST(total_sub - 1, 0) WHERE id = ?")
                    .bind(comic_id)
                    .execute(&mut *tx)
                    .await?;
                false
            }
            None => {
                sqlx::query("INSERT INTO user_subscriptions (user_id, comic_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(comic_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE comics SET total_sub = total_sub + 1 WHERE id = ?")
                    .bind(comic_id)
                    .execute(&mut *tx)
                    .await?;
                true
            }
        };

        let total_sub =
            sqlx::query_scalar::<_, i64>("SELECT total_sub FROM comics WHERE id = ?")
                .bind(comic_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(SubscriptionToggle {
            subscribed,
            total_sub,
        })
    }
}
