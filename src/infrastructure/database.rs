// Database - SQLite connection pool and schema shared by both services

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        to_user_id INTEGER,
        root_id INTEGER,
        content TEXT NOT NULL,
        hot INTEGER NOT NULL DEFAULT 0,
        comment_type TEXT NOT NULL,
        create_time INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS likes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        comment_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        create_time INTEGER NOT NULL,
        UNIQUE(comment_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        nickname TEXT NOT NULL,
        avatar TEXT,
        email TEXT UNIQUE,
        phone TEXT UNIQUE,
        sign TEXT,
        create_time INTEGER NOT NULL,
        comment_total INTEGER NOT NULL DEFAULT 0
    )",
    // Written by the post service, read here for existence checks
    "CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT ''
    )",
    "CREATE INDEX IF NOT EXISTS idx_comments_post_time ON comments(post_id, create_time, id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_root ON comments(root_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_to_user ON comments(to_user_id)",
    "CREATE INDEX IF NOT EXISTS idx_likes_user ON likes(user_id, comment_id)",
];

#[derive(Clone)]
pub struct ForumDatabase {
    pool: SqlitePool,
}

impl ForumDatabase {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid DATABASE_URL {}: {}", config.url, e)))?
            .create_if_missing(true);

        let filename = options.clone().get_filename();
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::ConfigurationError(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", config.url, e)))?;

        info!("Connected to database {}", config.url);
        Ok(Self { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    /// Every pooled connection to `sqlite::memory:` opens its own database,
    /// so the pool is capped at one.
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    pub async fn init(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;
        }
        debug!("Schema applied ({} statements)", SCHEMA.len());
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let db = ForumDatabase::new_in_memory().await.unwrap();
        db.init().await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/forum.db");
        let config = DatabaseConfig {
            url: format!("sqlite:{}", path.display()),
            max_connections: 2,
        };

        let db = ForumDatabase::connect(&config).await.unwrap();
        db.init().await.unwrap();
        db.health_check().await.unwrap();
        assert!(path.exists());
    }
}
