mod chapters;
mod comics;
mod users;

use sqlx::{MySqlPool, mysql::MySqlPoolOptions};

/// MySQL-backed implementation of every collaborator trait in [`crate::store`].
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug)]
enum AdminPromotion {
    Applied,
    NoSuchUser,
    Failed(sqlx::Error),
}

impl AdminPromotion {
    fn from_result(result: Result<u64, sqlx::Error>) -> Self {
        match result {
            Ok(0) => Self::NoSuchUser,
            Ok(_) => Self::Applied,
            Err(err) => Self::Failed(err),
        }
    }
}

pub async fn init_db(
    database_url: &str,
    max_connections: u32,
    admin_username: Option<&str>,
) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            username VARCHAR(191) NOT NULL UNIQUE,
            email VARCHAR(191) NOT NULL UNIQUE,
            hashed_password VARCHAR(255) NULL,
            coin BIGINT NOT NULL DEFAULT 0,
            vip BOOLEAN NOT NULL DEFAULT FALSE,
            is_admin BOOLEAN NOT NULL DEFAULT FALSE,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NULL,
            CONSTRAINT chk_users_coin CHECK (coin >= 0)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comics (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            description TEXT NULL,
            thumb_img TEXT NULL,
            preview_img TEXT NULL,
            author_id BIGINT NULL,
            total_sub BIGINT NOT NULL DEFAULT 0,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NULL,
            INDEX idx_comics_created_at (created_at),
            INDEX idx_comics_title (title),
            CONSTRAINT fk_comics_author_id FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE SET NULL
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comic_genres (
            comic_id BIGINT NOT NULL,
            genre VARCHAR(64) NOT NULL,
            PRIMARY KEY (comic_id, genre),
            INDEX idx_comic_genres_genre (genre),
            CONSTRAINT fk_comic_genres_comic_id FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapters (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            comic_id BIGINT NOT NULL,
            title VARCHAR(255) NOT NULL,
            position INT NOT NULL DEFAULT 0,
            views BIGINT NOT NULL DEFAULT 0,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_chapters_comic_position (comic_id, position),
            CONSTRAINT chk_chapters_views CHECK (views >= 0),
            CONSTRAINT fk_chapters_comic_id FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comic_rates (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            comic_id BIGINT NOT NULL,
            user_id BIGINT NOT NULL,
            rate INT NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_comic_rates_comic_id (comic_id),
            CONSTRAINT fk_comic_rates_comic_id FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE,
            CONSTRAINT fk_comic_rates_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            comic_id BIGINT NOT NULL,
            user_id BIGINT NOT NULL,
            content TEXT NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NULL,
            INDEX idx_comments_comic_id_created_at (comic_id, created_at),
            CONSTRAINT fk_comments_comic_id FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE,
            CONSTRAINT fk_comments_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_subscriptions (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL,
            comic_id BIGINT NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            UNIQUE KEY uq_user_subscriptions_user_comic (user_id, comic_id),
            INDEX idx_user_subscriptions_comic_id (comic_id),
            CONSTRAINT fk_user_subscriptions_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            CONSTRAINT fk_user_subscriptions_comic_id FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_likes (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL,
            comic_id BIGINT NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            UNIQUE KEY uq_user_likes_user_comic (user_id, comic_id),
            CONSTRAINT fk_user_likes_user_id FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            CONSTRAINT fk_user_likes_comic_id FOREIGN KEY (comic_id) REFERENCES comics(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    if let Some(admin_username) = admin_username {
        let result = sqlx::query("UPDATE users SET is_admin = 1 WHERE username = ?")
            .bind(admin_username)
            .execute(&pool)
            .await
            .map(|done| done.rows_affected());

        match AdminPromotion::from_result(result) {
            AdminPromotion::Applied => {
                tracing::info!("Admin promotion applied for username: {}", admin_username)
            }
            AdminPromotion::NoSuchUser => tracing::warn!(
                "Admin promotion skipped, no user named {} (or already admin)",
                admin_username
            ),
            AdminPromotion::Failed(err) => tracing::warn!(
                "Admin promotion failed for username {}: {}",
                admin_username,
                err
            ),
        }
    }

    Ok(pool)
}
