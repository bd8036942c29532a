// Collaborators the comment service calls out to

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::{Post, UserSummary};

#[async_trait]
pub trait PostDirectory: Send + Sync {
    async fn get_post(&self, post_id: i64) -> AppResult<Option<Post>>;
}

/// Batch author lookup. Implementations must return an entry for every
/// existing user in `ids`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_users_by_ids(&self, ids: &[i64]) -> AppResult<HashMap<i64, UserSummary>>;
}

/// Reads the `posts` table maintained by the post service
#[derive(Clone)]
pub struct SqlPostDirectory {
    pool: SqlitePool,
}

impl SqlPostDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert used when the post service shares this database
    pub async fn save_post(&self, post: &Post) -> AppResult<()> {
        sqlx::query("INSERT OR REPLACE INTO posts (id, user_id, title) VALUES (?, ?, ?)")
            .bind(post.id)
            .bind(post.user_id)
            .bind(&post.title)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to save post {}: {}", post.id, e)))?;
        Ok(())
    }
}

#[async_trait]
impl PostDirectory for SqlPostDirectory {
    async fn get_post(&self, post_id: i64) -> AppResult<Option<Post>> {
        let row = sqlx::query("SELECT id, user_id, title FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post {}: {}", post_id, e)))?;

        Ok(row.map(|row| Post {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ForumDatabase;

    #[tokio::test]
    async fn test_post_lookup() {
        let db = ForumDatabase::new_in_memory().await.unwrap();
        let posts = SqlPostDirectory::new(db.pool().clone());
        let post = Post {
            id: 7,
            user_id: 3,
            title: "hello".to_string(),
        };
        posts.save_post(&post).await.unwrap();

        assert_eq!(posts.get_post(7).await.unwrap(), Some(post));
        assert_eq!(posts.get_post(8).await.unwrap(), None);
    }
}
