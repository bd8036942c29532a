use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::user::UserSummary;

/// Position of a comment inside a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    /// Top-level comment attached directly to a post
    Root,
    /// Reply to a root comment
    Answer,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Root => "root",
            CommentType::Answer => "answer",
        }
    }
}

impl fmt::Display for CommentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(CommentType::Root),
            "answer" => Ok(CommentType::Answer),
            other => Err(format!("invalid comment type: {}", other)),
        }
    }
}

/// Persisted comment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub to_user_id: Option<i64>,
    /// Equals `id` for a root comment
    pub root_id: i64,
    pub content: String,
    pub hot: i64,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    /// Epoch milliseconds
    pub create_time: i64,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.comment_type == CommentType::Root
    }
}

/// Comment submission as received from a client. The author is the
/// caller, never a body field.
///
/// `comment_type` stays a raw string so an unknown type surfaces as a
/// validation error instead of a deserialization failure, and `hot` is
/// accepted only so a client-supplied value can be rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: i64,
    #[serde(default)]
    pub to_user_id: Option<i64>,
    #[serde(default)]
    pub root_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub hot: Option<i64>,
    #[serde(rename = "type")]
    pub comment_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentEdit {
    pub content: String,
    #[serde(default)]
    pub hot: Option<i64>,
}

/// Root comment in a post feed, carrying its replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub root_id: i64,
    pub content: String,
    pub hot: i64,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    pub create_time: i64,
    pub user_info: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_like: Option<bool>,
    pub answer_comment_list: Vec<AnswerCommentView>,
}

impl RootCommentView {
    pub fn from_comment(comment: &Comment, user_info: Option<UserSummary>, is_like: Option<bool>) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            root_id: comment.root_id,
            content: comment.content.clone(),
            hot: comment.hot,
            comment_type: comment.comment_type,
            create_time: comment.create_time,
            user_info,
            is_like,
            answer_comment_list: Vec::new(),
        }
    }
}

/// Flat comment view: a reply inside a thread, or an entry in a
/// per-user comment list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub to_user_id: Option<i64>,
    pub root_id: i64,
    pub content: String,
    pub hot: i64,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    pub create_time: i64,
    pub user_info: Option<UserSummary>,
    /// Author being replied to; `None` for a root comment
    pub answer_user_info: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_like: Option<bool>,
}

impl AnswerCommentView {
    pub fn from_comment(
        comment: &Comment,
        user_info: Option<UserSummary>,
        answer_user_info: Option<UserSummary>,
        is_like: Option<bool>,
    ) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            to_user_id: comment.to_user_id,
            root_id: comment.root_id,
            content: comment.content.clone(),
            hot: comment.hot,
            comment_type: comment.comment_type,
            create_time: comment.create_time,
            user_info,
            answer_user_info,
            is_like,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_type_parse() {
        assert_eq!("root".parse::<CommentType>(), Ok(CommentType::Root));
        assert_eq!("answer".parse::<CommentType>(), Ok(CommentType::Answer));
        assert!("ROOT".parse::<CommentType>().is_err());
        assert!("reply".parse::<CommentType>().is_err());
    }

    #[test]
    fn test_new_comment_from_json() {
        let raw = r#"{"post_id": 7, "content": "hi", "type": "answer", "root_id": 1, "to_user_id": 10}"#;
        let new_comment: NewComment = serde_json::from_str(raw).unwrap();
        assert_eq!(new_comment.comment_type, "answer");
        assert_eq!(new_comment.root_id, Some(1));
        assert_eq!(new_comment.hot, None);
    }

    #[test]
    fn test_is_like_omitted_when_unset() {
        let comment = Comment {
            id: 1,
            post_id: 7,
            user_id: 10,
            to_user_id: None,
            root_id: 1,
            content: "first".to_string(),
            hot: 0,
            comment_type: CommentType::Root,
            create_time: 1,
        };
        let view = RootCommentView::from_comment(&comment, None, None);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("is_like").is_none());
        assert_eq!(json["type"], "root");
    }
}
