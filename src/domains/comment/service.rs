// CommentService - submission, editing, deletion, likes and feed assembly

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domains::comment::collaborators::{PostDirectory, UserDirectory};
use crate::domains::comment::repository::{CommentDraft, CommentRepository};
use crate::domains::comment::thread::{self, ThreadError};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{current_time_millis, EventPublisher};
use crate::models::{
    AnswerCommentView, Comment, CommentCreated, CommentDeleted, CommentEdit, CommentEvent,
    CommentType, NewComment, RootCommentView,
};

#[derive(Clone)]
pub struct CommentService {
    comments: CommentRepository,
    posts: Arc<dyn PostDirectory>,
    users: Arc<dyn UserDirectory>,
    events: Arc<dyn EventPublisher>,
}

impl CommentService {
    pub fn new(
        comments: CommentRepository,
        posts: Arc<dyn PostDirectory>,
        users: Arc<dyn UserDirectory>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
            events,
        }
    }

    /// Validates and stores a comment written by `user_id`, then announces it
    pub async fn send_user_comment(&self, user_id: i64, new_comment: NewComment) -> AppResult<Comment> {
        info!(user_id, post_id = new_comment.post_id, "submitting comment");

        let post = self
            .posts
            .get_post(new_comment.post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} does not exist", new_comment.post_id)))?;

        if new_comment.hot.is_some() {
            return Err(AppError::Validation("hot cannot be supplied by clients".to_string()));
        }
        let comment_type: CommentType = new_comment
            .comment_type
            .parse()
            .map_err(AppError::Validation)?;
        if new_comment.content.trim().is_empty() {
            return Err(AppError::Validation("comment content is empty".to_string()));
        }

        match comment_type {
            CommentType::Root => {
                if new_comment.to_user_id.is_some() || new_comment.root_id.is_some() {
                    return Err(AppError::Validation(
                        "a root comment cannot carry a reply target or root id".to_string(),
                    ));
                }
            }
            CommentType::Answer => {
                if new_comment.to_user_id.is_none() {
                    return Err(AppError::Validation("choose a user to reply to".to_string()));
                }
                let root_id = new_comment
                    .root_id
                    .ok_or_else(|| AppError::Validation("an answer requires root_id".to_string()))?;
                let root = self
                    .comments
                    .find_by_id(root_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Root comment {} does not exist", root_id)))?;
                if !root.is_root() || root.post_id != post.id {
                    return Err(AppError::Validation(format!(
                        "comment {} is not a root comment of post {}",
                        root_id, post.id
                    )));
                }
            }
        }

        let comment = self
            .comments
            .insert(&CommentDraft {
                post_id: post.id,
                user_id,
                to_user_id: new_comment.to_user_id,
                root_id: new_comment.root_id,
                content: new_comment.content,
                comment_type,
                create_time: current_time_millis(),
            })
            .await?;

        self.events
            .publish(CommentEvent::Created(CommentCreated {
                comment_id: comment.id,
                post_id: comment.post_id,
                user_id,
                author_id: post.user_id,
            }))
            .await;

        Ok(comment)
    }

    /// Deletes a comment owned by `user_id`; a root takes its replies and
    /// all their likes with it
    pub async fn delete_user_comment(&self, user_id: i64, comment_id: i64) -> AppResult<CommentDeleted> {
        info!(user_id, comment_id, "deleting comment");

        let comment = self
            .comments
            .find_owned(comment_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden(format!("Comment {} does not belong to user {}", comment_id, user_id))
            })?;

        let removed = self.comments.delete_cascade(&comment).await?;

        let mut removed_by_author = BTreeMap::new();
        for (_, author_id) in &removed.comments {
            *removed_by_author.entry(*author_id).or_insert(0) += 1;
        }

        if comment.is_root() {
            info!(
                comment_id,
                removed = removed.comments.len(),
                likes = removed.likes,
                "root comment deleted with its replies"
            );
        } else {
            info!(comment_id, likes = removed.likes, "answer comment deleted");
        }

        let deleted = CommentDeleted {
            comment_id,
            post_id: comment.post_id,
            user_id,
            effect_num: removed.comments.len() as i64,
            removed_by_author,
        };
        self.events.publish(CommentEvent::Deleted(deleted.clone())).await;

        Ok(deleted)
    }

    /// Threaded feed of a post, newest thread first
    pub async fn get_post_comments(&self, viewer: Option<i64>, post_id: i64) -> AppResult<Vec<RootCommentView>> {
        let comments = self.comments.list_by_post(post_id).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids = thread::referenced_user_ids(&comments);
        let comment_ids: Vec<i64> = comments.iter().map(|c| c.id).collect();

        let likes = async {
            match viewer {
                Some(viewer_id) => self.comments.liked_comment_ids(viewer_id, &comment_ids).await,
                None => Ok(HashSet::new()),
            }
        };
        let (users, liked) = futures::try_join!(self.users.get_users_by_ids(&user_ids), likes)?;

        thread::assemble(comments, &users, &liked, viewer).map_err(|err| {
            match &err {
                ThreadError::OrphanedReply { comment_id, root_id } => error!(
                    post_id,
                    comment_id,
                    root_id,
                    "answer without a preceding root, creation time or root id is inconsistent"
                ),
                other => error!(post_id, "thread assembly failed: {}", other),
            }
            AppError::from(err)
        })
    }

    pub async fn get_user_comments(&self, user_id: i64) -> AppResult<Vec<AnswerCommentView>> {
        let comments = self.comments.list_by_user(user_id).await?;
        self.comment_convert_answer_view(comments).await
    }

    /// Comments replying to `to_user_id`, written by someone else
    pub async fn get_user_answered_comments(&self, to_user_id: i64) -> AppResult<Vec<AnswerCommentView>> {
        let comments = self.comments.list_answered_to(to_user_id).await?;
        self.comment_convert_answer_view(comments).await
    }

    /// Only the author may edit, and only the content changes
    pub async fn update_comment(&self, user_id: i64, comment_id: i64, edit: CommentEdit) -> AppResult<Comment> {
        if edit.hot.is_some() {
            return Err(AppError::Validation("hot cannot be supplied by clients".to_string()));
        }
        if edit.content.trim().is_empty() {
            return Err(AppError::Validation("comment content is empty".to_string()));
        }

        let old = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} does not exist", comment_id)))?;
        if old.user_id != user_id {
            warn!(user_id, comment_id, owner = old.user_id, "rejected edit by non-owner");
            return Err(AppError::Forbidden(format!(
                "Comment {} does not belong to user {}",
                comment_id, user_id
            )));
        }

        self.comments.update_content(comment_id, &edit.content).await?;
        Ok(Comment {
            content: edit.content,
            ..old
        })
    }

    /// Flat views with author and reply target resolved in one batch
    pub async fn comment_convert_answer_view(&self, comments: Vec<Comment>) -> AppResult<Vec<AnswerCommentView>> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let users = self
            .users
            .get_users_by_ids(&thread::referenced_user_ids(&comments))
            .await?;

        Ok(comments
            .iter()
            .map(|comment| {
                AnswerCommentView::from_comment(
                    comment,
                    users.get(&comment.user_id).cloned(),
                    comment.to_user_id.and_then(|id| users.get(&id).cloned()),
                    None,
                )
            })
            .collect())
    }

    /// Returns false when the like already existed
    pub async fn like_comment(&self, user_id: i64, comment_id: i64) -> AppResult<bool> {
        self.require_comment(comment_id).await?;
        let added = self.comments.add_like(comment_id, user_id).await?;
        info!(user_id, comment_id, added, "comment liked");
        Ok(added)
    }

    /// Returns false when there was nothing to remove
    pub async fn unlike_comment(&self, user_id: i64, comment_id: i64) -> AppResult<bool> {
        self.require_comment(comment_id).await?;
        let removed = self.comments.remove_like(comment_id, user_id).await?;
        info!(user_id, comment_id, removed, "comment unliked");
        Ok(removed)
    }

    async fn require_comment(&self, comment_id: i64) -> AppResult<Comment> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} does not exist", comment_id)))
    }
}
