use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COMMENT_EXCHANGE: &str = "comment.exchange";
pub const COMMENT_INSERT_KEY: &str = "comment.insert";
pub const COMMENT_DELETE_KEY: &str = "comment.delete";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCreated {
    pub comment_id: i64,
    pub post_id: i64,
    /// Comment author
    pub user_id: i64,
    /// Author of the commented post
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDeleted {
    pub comment_id: i64,
    pub post_id: i64,
    pub user_id: i64,
    /// Number of comment rows removed, replies included
    pub effect_num: i64,
    /// Removed comment count per author
    #[serde(default)]
    pub removed_by_author: BTreeMap<i64, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CommentEvent {
    Created(CommentCreated),
    Deleted(CommentDeleted),
}

impl CommentEvent {
    pub fn routing_key(&self) -> &'static str {
        match self {
            CommentEvent::Created(_) => COMMENT_INSERT_KEY,
            CommentEvent::Deleted(_) => COMMENT_DELETE_KEY,
        }
    }
}

/// Event as delivered on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub exchange: String,
    pub routing_key: String,
    pub published_at: i64,
    pub payload: CommentEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = CommentEvent::Created(CommentCreated {
            comment_id: 1,
            post_id: 7,
            user_id: 10,
            author_id: 3,
        });
        assert_eq!(event.routing_key(), COMMENT_INSERT_KEY);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "created");
        assert_eq!(json["author_id"], 3);
    }
}
