use serde::{Deserialize, Serialize};

/// Post as seen by the comment service. Owned by the post service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Author of the post
    pub user_id: i64,
    pub title: String,
}
