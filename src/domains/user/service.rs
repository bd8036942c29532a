// UserService - registration, profile lookup and per-user statistics

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::domains::user::repository::UserRepository;
use crate::error::{AppError, AppResult};
use crate::infrastructure::current_time_millis;
use crate::models::{NewUser, User, UserGeneral, UserSummary, UserView};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,32}$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{6,15}$").unwrap());

const SEARCH_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    pub async fn register_user(&self, new_user: NewUser) -> AppResult<User> {
        if !USERNAME_RE.is_match(&new_user.username) {
            return Err(AppError::Validation(
                "username must be 3-32 letters, digits or underscores".to_string(),
            ));
        }
        if let Some(email) = &new_user.email {
            if !EMAIL_RE.is_match(email) {
                return Err(AppError::Validation(format!("invalid email: {}", email)));
            }
        }
        if let Some(phone) = &new_user.phone {
            if !PHONE_RE.is_match(phone) {
                return Err(AppError::Validation(format!("invalid phone: {}", phone)));
            }
        }

        let taken = self
            .users
            .exists_conflicting(
                &new_user.username,
                new_user.email.as_deref(),
                new_user.phone.as_deref(),
            )
            .await?;
        if taken {
            warn!(username = %new_user.username, "registration rejected, duplicate identity");
            return Err(AppError::Conflict(
                "a user with the same username, phone or email already exists".to_string(),
            ));
        }

        let user = self.users.insert(&new_user, current_time_millis()).await?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn get_user_info(&self, user_id: i64) -> AppResult<UserView> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| UserView::from(&user))
            .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))
    }

    /// Summaries keyed by id; unknown ids are simply absent
    pub async fn get_users_by_ids(&self, ids: &[i64]) -> AppResult<HashMap<i64, UserSummary>> {
        let users = self.users.find_by_ids(ids).await?;
        Ok(users
            .iter()
            .map(|user| (user.id, UserSummary::from(user)))
            .collect())
    }

    /// Statistics of `other_user_id` if given, otherwise of the caller
    pub async fn get_user_general_info(
        &self,
        viewer: Option<i64>,
        other_user_id: Option<i64>,
    ) -> AppResult<UserGeneral> {
        let user_id = other_user_id
            .or(viewer)
            .ok_or_else(|| AppError::Validation("either a caller or other_user_id is required".to_string()))?;

        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| UserGeneral::from(&user))
            .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))
    }

    pub async fn check_email(&self, email: &str) -> AppResult<bool> {
        self.users.exists_by_email(email).await
    }

    pub async fn check_username(&self, username: &str) -> AppResult<bool> {
        self.users.exists_by_username(username).await
    }

    pub async fn search_users(&self, fragment: &str) -> AppResult<Vec<UserView>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(AppError::Validation("search text is empty".to_string()));
        }
        let users = self.users.search(fragment, SEARCH_LIMIT).await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    pub async fn adjust_comment_total(&self, user_id: i64, delta: i64) -> AppResult<()> {
        if !self.users.adjust_comment_total(user_id, delta).await? {
            warn!(user_id, delta, "comment total not adjusted, unknown user");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ForumDatabase;

    async fn service() -> UserService {
        let db = ForumDatabase::new_in_memory().await.unwrap();
        UserService::new(UserRepository::new(db.pool().clone()))
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: Some(format!("{}@example.com", username)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_defaults_nickname() {
        let service = service().await;
        let user = service.register_user(new_user("alice")).await.unwrap();
        assert_eq!(user.nickname, "alice");
        assert_eq!(user.comment_total, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let service = service().await;
        service.register_user(new_user("alice")).await.unwrap();

        let same_name = service.register_user(new_user("alice")).await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));

        let mut same_email = new_user("bob");
        same_email.email = Some("alice@example.com".to_string());
        assert!(matches!(service.register_user(same_email).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let service = service().await;
        assert!(matches!(service.register_user(new_user("a")).await, Err(AppError::Validation(_))));

        let mut bad_phone = new_user("carol");
        bad_phone.phone = Some("call me".to_string());
        assert!(matches!(service.register_user(bad_phone).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_general_info_prefers_other_user() {
        let service = service().await;
        let alice = service.register_user(new_user("alice")).await.unwrap();
        let bob = service.register_user(new_user("bob")).await.unwrap();
        service.adjust_comment_total(bob.id, 2).await.unwrap();

        let general = service.get_user_general_info(Some(alice.id), Some(bob.id)).await.unwrap();
        assert_eq!(general, UserGeneral { user_id: bob.id, comment_total: 2 });

        let own = service.get_user_general_info(Some(alice.id), None).await.unwrap();
        assert_eq!(own.user_id, alice.id);

        assert!(matches!(
            service.get_user_general_info(None, None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_comment_total_never_negative() {
        let service = service().await;
        let alice = service.register_user(new_user("alice")).await.unwrap();
        service.adjust_comment_total(alice.id, 1).await.unwrap();
        service.adjust_comment_total(alice.id, -3).await.unwrap();

        let general = service.get_user_general_info(None, Some(alice.id)).await.unwrap();
        assert_eq!(general.comment_total, 0);
    }

    #[tokio::test]
    async fn test_lookup_and_search() {
        let service = service().await;
        let alice = service.register_user(new_user("alice")).await.unwrap();
        service.register_user(new_user("alicia")).await.unwrap();
        service.register_user(new_user("bob")).await.unwrap();

        let found = service.search_users("ali").await.unwrap();
        assert_eq!(found.len(), 2);

        let summaries = service.get_users_by_ids(&[alice.id, 999]).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[&alice.id].username, "alice");

        assert!(service.check_username("bob").await.unwrap());
        assert!(!service.check_email("nobody@example.com").await.unwrap());
        assert!(matches!(service.get_user_info(999).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let service = service().await;
        for name in ["alice", "bob", "carol_x", "dave100pct"] {
            service.register_user(new_user(name)).await.unwrap();
        }

        let underscore = service.search_users("_").await.unwrap();
        assert_eq!(
            underscore.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
            vec!["carol_x"]
        );
        assert!(service.search_users("%").await.unwrap().is_empty());
        assert!(service.search_users("a%e").await.unwrap().is_empty());
    }
}
