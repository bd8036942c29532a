// User repository - SQL access to the users table

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str =
    "id, username, nickname, avatar, email, phone, sign, create_time, comment_total";

/// Escapes LIKE wildcards so user input only matches itself
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        avatar: row.get("avatar"),
        email: row.get("email"),
        phone: row.get("phone"),
        sign: row.get("sign"),
        create_time: row.get("create_time"),
        comment_total: row.get("comment_total"),
    }
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new_user: &NewUser, create_time: i64) -> AppResult<User> {
        let nickname = new_user
            .nickname
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| new_user.username.clone());

        let result = sqlx::query(
            "INSERT INTO users (username, nickname, avatar, email, phone, sign, create_time, comment_total)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&new_user.username)
        .bind(&nickname)
        .bind(&new_user.avatar)
        .bind(&new_user.email)
        .bind(&new_user.phone)
        .bind(&new_user.sign)
        .bind(create_time)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "a user with the same username, phone or email already exists".to_string(),
            ),
            _ => AppError::DatabaseError(format!("Failed to insert user {}: {}", new_user.username, e)),
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: new_user.username.clone(),
            nickname,
            avatar: new_user.avatar.clone(),
            email: new_user.email.clone(),
            phone: new_user.phone.clone(),
            sign: new_user.sign.clone(),
            create_time,
            comment_total: 0,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get user {}: {}", id, e)))?;

        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users WHERE id IN (", USER_COLUMNS));
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY id");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get users: {}", e)))?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    /// Whether any of the unique fields is already taken
    pub async fn exists_conflicting(
        &self,
        username: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM users WHERE username = ? OR email = ? OR phone = ?",
        )
        .bind(username)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to check user uniqueness: {}", e)))?;

        Ok(row.get::<i64, _>("total") > 0)
    }

    pub async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to check email: {}", e)))?;
        Ok(row.get::<i64, _>("total") > 0)
    }

    pub async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to check username: {}", e)))?;
        Ok(row.get::<i64, _>("total") > 0)
    }

    /// Users whose username or nickname contains `fragment` literally
    pub async fn search(&self, fragment: &str, limit: i64) -> AppResult<Vec<User>> {
        let pattern = format!("%{}%", escape_like(fragment));
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username LIKE ? ESCAPE '\\' OR nickname LIKE ? ESCAPE '\\' ORDER BY id LIMIT ?",
            USER_COLUMNS
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to search users: {}", e)))?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    /// Adds `delta` to the comment counter, never going below zero.
    /// Returns false if the user does not exist.
    pub async fn adjust_comment_total(&self, user_id: i64, delta: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET comment_total = MAX(comment_total + ?, 0) WHERE id = ?",
        )
        .bind(delta)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to update comment total of {}: {}", user_id, e))
        })?;

        Ok(result.rows_affected() > 0)
    }
}
