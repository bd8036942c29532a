// Comment repository - SQL access to the comments and likes tables

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::infrastructure::current_time_millis;
use crate::models::{Comment, CommentType};

const COMMENT_COLUMNS: &str =
    "id, post_id, user_id, to_user_id, root_id, content, hot, comment_type, create_time";

/// Validated comment ready for insertion
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub post_id: i64,
    pub user_id: i64,
    pub to_user_id: Option<i64>,
    /// Ignored for roots, which point at themselves
    pub root_id: Option<i64>,
    pub content: String,
    pub comment_type: CommentType,
    pub create_time: i64,
}

/// Rows removed by a (possibly cascading) delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedComments {
    /// `(comment_id, author_id)` of every removed comment
    pub comments: Vec<(i64, i64)>,
    pub likes: u64,
}

#[derive(Clone)]
pub struct CommentRepository {
    pool: SqlitePool,
}

fn row_to_comment(row: &SqliteRow) -> AppResult<Comment> {
    let id: i64 = row.get("id");
    let comment_type = row
        .get::<String, _>("comment_type")
        .parse::<CommentType>()
        .map_err(|e| AppError::DatabaseError(format!("Comment {} has {}", id, e)))?;

    Ok(Comment {
        id,
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        to_user_id: row.get::<Option<i64>, _>("to_user_id"),
        root_id: row.get::<Option<i64>, _>("root_id").unwrap_or(id),
        content: row.get("content"),
        hot: row.get("hot"),
        comment_type,
        create_time: row.get("create_time"),
    })
}

fn rows_to_comments(rows: Vec<SqliteRow>) -> AppResult<Vec<Comment>> {
    rows.iter().map(row_to_comment).collect()
}

impl CommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the comment and, for a root, back-fills `root_id` with the
    /// new id in the same transaction. An answer is only written while its
    /// root still exists as a root of the same post; the check and the
    /// insert are one statement, so a concurrent thread delete either sees
    /// the answer and removes it or makes this return `NotFound`.
    pub async fn insert(&self, draft: &CommentDraft) -> AppResult<Comment> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let (id, root_id) = match draft.comment_type {
            CommentType::Root => {
                let result = sqlx::query(
                    "INSERT INTO comments (post_id, user_id, to_user_id, root_id, content, hot, comment_type, create_time)
                     VALUES (?, ?, ?, NULL, ?, 0, ?, ?)",
                )
                .bind(draft.post_id)
                .bind(draft.user_id)
                .bind(draft.to_user_id)
                .bind(&draft.content)
                .bind(draft.comment_type.as_str())
                .bind(draft.create_time)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to insert comment: {}", e)))?;

                let id = result.last_insert_rowid();
                sqlx::query("UPDATE comments SET root_id = ? WHERE id = ?")
                    .bind(id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Failed to set root id of comment {}: {}", id, e))
                    })?;
                (id, id)
            }
            CommentType::Answer => {
                let root_id = draft
                    .root_id
                    .ok_or_else(|| AppError::Validation("an answer requires root_id".to_string()))?;

                let result = sqlx::query(
                    "INSERT INTO comments (post_id, user_id, to_user_id, root_id, content, hot, comment_type, create_time)
                     SELECT ?, ?, ?, ?, ?, 0, ?, ?
                     WHERE EXISTS (
                         SELECT 1 FROM comments WHERE id = ? AND comment_type = 'root' AND post_id = ?
                     )",
                )
                .bind(draft.post_id)
                .bind(draft.user_id)
                .bind(draft.to_user_id)
                .bind(root_id)
                .bind(&draft.content)
                .bind(draft.comment_type.as_str())
                .bind(draft.create_time)
                .bind(root_id)
                .bind(draft.post_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to insert comment: {}", e)))?;

                if result.rows_affected() == 0 {
                    tx.rollback().await.map_err(|e| {
                        AppError::DatabaseError(format!("Failed to rollback transaction: {}", e))
                    })?;
                    return Err(AppError::NotFound(format!(
                        "Root comment {} does not exist on post {}",
                        root_id, draft.post_id
                    )));
                }
                (result.last_insert_rowid(), root_id)
            }
        };

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit comment {}: {}", id, e))
        })?;

        Ok(Comment {
            id,
            post_id: draft.post_id,
            user_id: draft.user_id,
            to_user_id: draft.to_user_id,
            root_id,
            content: draft.content.clone(),
            hot: 0,
            comment_type: draft.comment_type,
            create_time: draft.create_time,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Comment>> {
        let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", id, e)))?;

        row.as_ref().map(row_to_comment).transpose()
    }

    /// The comment only if `user_id` wrote it
    pub async fn find_owned(&self, id: i64, user_id: i64) -> AppResult<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE id = ? AND user_id = ?",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", id, e)))?;

        row.as_ref().map(row_to_comment).transpose()
    }

    /// All comments of a post in creation order, ties broken by id
    pub async fn list_by_post(&self, post_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE post_id = ? ORDER BY create_time ASC, id ASC",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list comments of post {}: {}", post_id, e))
        })?;

        rows_to_comments(rows)
    }

    pub async fn list_by_root(&self, root_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE root_id = ? ORDER BY create_time ASC, id ASC",
            COMMENT_COLUMNS
        ))
        .bind(root_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list thread {}: {}", root_id, e))
        })?;

        rows_to_comments(rows)
    }

    pub async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE user_id = ? ORDER BY create_time ASC, id ASC",
            COMMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list comments of user {}: {}", user_id, e))
        })?;

        rows_to_comments(rows)
    }

    /// Replies addressed to `user_id`, excluding the ones they wrote themselves
    pub async fn list_answered_to(&self, user_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE to_user_id = ? AND user_id != ? ORDER BY create_time ASC, id ASC",
            COMMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list replies to user {}: {}", user_id, e))
        })?;

        rows_to_comments(rows)
    }

    pub async fn update_content(&self, id: i64, content: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update comment {}: {}", id, e)))?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a comment and its likes. A root takes its whole thread with
    /// it. The comment rows are claimed by a single `DELETE ... RETURNING`,
    /// so answers committed up to that point go with their root.
    pub async fn delete_cascade(&self, comment: &Comment) -> AppResult<RemovedComments> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let rows = if comment.is_root() {
            sqlx::query("DELETE FROM comments WHERE id = ? OR root_id = ? RETURNING id, user_id")
                .bind(comment.id)
                .bind(comment.id)
                .fetch_all(&mut *tx)
                .await
        } else {
            sqlx::query("DELETE FROM comments WHERE id = ? RETURNING id, user_id")
                .bind(comment.id)
                .fetch_all(&mut *tx)
                .await
        }
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete comment {}: {}", comment.id, e)))?;

        let mut targets: Vec<(i64, i64)> = rows
            .iter()
            .map(|row| (row.get::<i64, _>("id"), row.get::<i64, _>("user_id")))
            .collect();
        targets.sort_unstable();

        if targets.is_empty() {
            tx.rollback().await.map_err(|e| {
                AppError::DatabaseError(format!("Failed to rollback transaction: {}", e))
            })?;
            return Ok(RemovedComments::default());
        }

        let mut likes_qb = QueryBuilder::<Sqlite>::new("DELETE FROM likes WHERE comment_id IN (");
        let mut separated = likes_qb.separated(",");
        for (id, _) in &targets {
            separated.push_bind(*id);
        }
        likes_qb.push(")");
        let likes = likes_qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete likes: {}", e)))?
            .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit delete of comment {}: {}", comment.id, e))
        })?;

        Ok(RemovedComments {
            comments: targets,
            likes,
        })
    }

    /// Which of `comment_ids` the user has liked
    pub async fn liked_comment_ids(&self, user_id: i64, comment_ids: &[i64]) -> AppResult<HashSet<i64>> {
        if comment_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT comment_id FROM likes WHERE user_id = ");
        qb.push_bind(user_id);
        qb.push(" AND comment_id IN (");
        let mut separated = qb.separated(",");
        for id in comment_ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to get likes of user {}: {}", user_id, e))
            })?;

        Ok(rows.into_iter().map(|row| row.get::<i64, _>("comment_id")).collect())
    }

    pub async fn count_likes(&self, comment_id: i64) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM likes WHERE comment_id = ?")
            .bind(comment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count likes of {}: {}", comment_id, e))
            })?;
        Ok(row.get("total"))
    }

    /// Records a like and bumps `hot`. Returns false if it already existed.
    pub async fn add_like(&self, comment_id: i64, user_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO likes (comment_id, user_id, create_time) VALUES (?, ?, ?)",
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(current_time_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to like comment {}: {}", comment_id, e)))?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE comments SET hot = hot + 1 WHERE id = ?")
                .bind(comment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to raise hot of {}: {}", comment_id, e))
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit like of {}: {}", comment_id, e))
        })?;
        Ok(inserted)
    }

    /// Removes a like and lowers `hot`. Returns false if there was none.
    pub async fn remove_like(&self, comment_id: i64, user_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let removed = sqlx::query("DELETE FROM likes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to unlike comment {}: {}", comment_id, e))
            })?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query("UPDATE comments SET hot = MAX(hot - 1, 0) WHERE id = ?")
                .bind(comment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to lower hot of {}: {}", comment_id, e))
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit unlike of {}: {}", comment_id, e))
        })?;
        Ok(removed)
    }
}
