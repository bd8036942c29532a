// In-process UserDirectory backed by the user service, with an LRU of
// author summaries in front of it

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domains::comment::collaborators::UserDirectory;
use crate::domains::user::service::UserService;
use crate::error::AppResult;
use crate::infrastructure::Cache;
use crate::models::UserSummary;

#[derive(Clone)]
pub struct LocalUserDirectory {
    users: UserService,
    cache: Arc<Mutex<Cache<i64, UserSummary>>>,
}

impl LocalUserDirectory {
    pub fn new(users: UserService, cache_capacity: usize) -> Self {
        Self {
            users,
            cache: Arc::new(Mutex::new(Cache::new(cache_capacity))),
        }
    }
}

#[async_trait]
impl UserDirectory for LocalUserDirectory {
    async fn get_users_by_ids(&self, ids: &[i64]) -> AppResult<HashMap<i64, UserSummary>> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();
        {
            let mut cache = self.cache.lock().await;
            for id in ids {
                match cache.get(id) {
                    Some(summary) => {
                        found.insert(*id, summary.clone());
                    }
                    None => missing.push(*id),
                }
            }
        }

        if !missing.is_empty() {
            debug!(hits = found.len(), misses = missing.len(), "user summary lookup");
            let loaded = self.users.get_users_by_ids(&missing).await?;
            let mut cache = self.cache.lock().await;
            for (id, summary) in loaded {
                cache.insert(id, summary.clone());
                found.insert(id, summary);
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::user::repository::UserRepository;
    use crate::infrastructure::ForumDatabase;
    use crate::models::NewUser;

    #[tokio::test]
    async fn test_lookup_fills_cache() {
        let db = ForumDatabase::new_in_memory().await.unwrap();
        let users = UserService::new(UserRepository::new(db.pool().clone()));
        let alice = users
            .register_user(NewUser {
                username: "alice".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let directory = LocalUserDirectory::new(users, 8);
        let first = directory.get_users_by_ids(&[alice.id, 404]).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(directory.cache.lock().await.len(), 1);

        let second = directory.get_users_by_ids(&[alice.id]).await.unwrap();
        assert_eq!(second[&alice.id].username, "alice");
    }
}
