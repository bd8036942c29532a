// Thread assembly - rebuilds the two-level comment tree of one post
// from its flat comment rows

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::warn;

use crate::error::AppError;
use crate::models::{AnswerCommentView, Comment, CommentType, RootCommentView, UserSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// An answer whose root is not among the comments seen before it
    OrphanedReply { comment_id: i64, root_id: i64 },
    /// A second root claiming an already registered thread
    DuplicateRoot { comment_id: i64, root_id: i64 },
    MixedPosts { comment_id: i64, expected: i64, found: i64 },
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadError::OrphanedReply { comment_id, root_id } => write!(
                f,
                "answer comment {} references root {} which does not precede it",
                comment_id, root_id
            ),
            ThreadError::DuplicateRoot { comment_id, root_id } => write!(
                f,
                "root comment {} claims thread {} which already has a root",
                comment_id, root_id
            ),
            ThreadError::MixedPosts { comment_id, expected, found } => write!(
                f,
                "comment {} belongs to post {} while assembling post {}",
                comment_id, found, expected
            ),
        }
    }
}

impl std::error::Error for ThreadError {}

impl From<ThreadError> for AppError {
    fn from(err: ThreadError) -> Self {
        AppError::ThreadConsistency(err.to_string())
    }
}

/// Every user id a set of comments refers to, as author or reply target
pub fn referenced_user_ids(comments: &[Comment]) -> Vec<i64> {
    let mut ids = BTreeSet::new();
    for comment in comments {
        ids.insert(comment.user_id);
        if let Some(to_user_id) = comment.to_user_id {
            ids.insert(to_user_id);
        }
    }
    ids.into_iter().collect()
}

fn is_creation_ordered(comments: &[Comment]) -> bool {
    comments
        .windows(2)
        .all(|pair| (pair[0].create_time, pair[0].id) <= (pair[1].create_time, pair[1].id))
}

/// Builds the feed of one post.
///
/// Roots come out newest first; replies inside a thread stay in creation
/// order. `is_like` is only filled in when `viewer` is present. A user id
/// missing from `users` leaves the matching info field empty.
pub fn assemble(
    mut comments: Vec<Comment>,
    users: &HashMap<i64, UserSummary>,
    liked: &HashSet<i64>,
    viewer: Option<i64>,
) -> Result<Vec<RootCommentView>, ThreadError> {
    let post_id = match comments.first() {
        Some(first) => first.post_id,
        None => return Ok(Vec::new()),
    };
    if let Some(stray) = comments.iter().find(|c| c.post_id != post_id) {
        return Err(ThreadError::MixedPosts {
            comment_id: stray.id,
            expected: post_id,
            found: stray.post_id,
        });
    }

    if !is_creation_ordered(&comments) {
        warn!(post_id, "comments not in creation order, re-sorting before assembly");
        comments.sort_by_key(|c| (c.create_time, c.id));
    }

    let is_like = |comment_id: i64| viewer.map(|_| liked.contains(&comment_id));

    // Arena of roots in creation order, with a parallel arena of reply lists
    let mut roots: Vec<RootCommentView> = Vec::new();
    let mut replies: Vec<Vec<AnswerCommentView>> = Vec::new();
    let mut slot_by_root: HashMap<i64, usize> = HashMap::new();

    for comment in &comments {
        match comment.comment_type {
            CommentType::Root => {
                match slot_by_root.entry(comment.root_id) {
                    Entry::Occupied(_) => {
                        return Err(ThreadError::DuplicateRoot {
                            comment_id: comment.id,
                            root_id: comment.root_id,
                        })
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(roots.len());
                    }
                }
                roots.push(RootCommentView::from_comment(
                    comment,
                    users.get(&comment.user_id).cloned(),
                    is_like(comment.id),
                ));
                replies.push(Vec::new());
            }
            CommentType::Answer => {
                let slot = *slot_by_root.get(&comment.root_id).ok_or(
                    ThreadError::OrphanedReply {
                        comment_id: comment.id,
                        root_id: comment.root_id,
                    },
                )?;
                let answer_user = comment.to_user_id.and_then(|id| users.get(&id).cloned());
                replies[slot].push(AnswerCommentView::from_comment(
                    comment,
                    users.get(&comment.user_id).cloned(),
                    answer_user,
                    is_like(comment.id),
                ));
            }
        }
    }

    Ok(roots
        .into_iter()
        .zip(replies)
        .rev()
        .map(|(mut root, answers)| {
            root.answer_comment_list = answers;
            root
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(id: i64, user_id: i64, time: i64) -> Comment {
        Comment {
            id,
            post_id: 7,
            user_id,
            to_user_id: None,
            root_id: id,
            content: format!("root {}", id),
            hot: 0,
            comment_type: CommentType::Root,
            create_time: time,
        }
    }

    fn answer(id: i64, root_id: i64, user_id: i64, to_user_id: i64, time: i64) -> Comment {
        Comment {
            id,
            post_id: 7,
            user_id,
            to_user_id: Some(to_user_id),
            root_id,
            content: format!("answer {}", id),
            hot: 0,
            comment_type: CommentType::Answer,
            create_time: time,
        }
    }

    fn users(ids: &[i64]) -> HashMap<i64, UserSummary> {
        ids.iter()
            .map(|&id| {
                (
                    id,
                    UserSummary {
                        id,
                        username: format!("user{}", id),
                        nickname: format!("User {}", id),
                        avatar: None,
                    },
                )
            })
            .collect()
    }

    fn scenario() -> Vec<Comment> {
        vec![
            root(1, 10, 100),
            answer(2, 1, 11, 10, 200),
            root(3, 12, 300),
            answer(4, 3, 10, 12, 400),
        ]
    }

    #[test]
    fn test_post_scenario() {
        let feed = assemble(scenario(), &users(&[10, 11, 12]), &HashSet::new(), None).unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, 3);
        assert_eq!(feed[0].answer_comment_list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![4]);
        assert_eq!(feed[1].id, 1);
        assert_eq!(feed[1].answer_comment_list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2]);

        let reply = &feed[1].answer_comment_list[0];
        assert_eq!(reply.user_info.as_ref().map(|u| u.id), Some(11));
        assert_eq!(reply.answer_user_info.as_ref().map(|u| u.id), Some(10));
        assert_eq!(feed[0].user_info.as_ref().map(|u| u.id), Some(12));
    }

    #[test]
    fn test_newest_root_first() {
        let comments = vec![root(1, 10, 100), root(2, 10, 200), root(3, 10, 300)];
        let feed = assemble(comments, &users(&[10]), &HashSet::new(), None).unwrap();
        assert_eq!(feed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_replies_keep_creation_order() {
        let comments = vec![
            root(1, 10, 100),
            answer(2, 1, 11, 10, 200),
            root(3, 12, 250),
            answer(4, 1, 12, 11, 300),
            answer(5, 1, 10, 12, 400),
        ];
        let feed = assemble(comments, &users(&[10, 11, 12]), &HashSet::new(), None).unwrap();

        let thread = feed.iter().find(|r| r.id == 1).unwrap();
        assert_eq!(
            thread.answer_comment_list.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![2, 4, 5]
        );
        assert!(feed.iter().find(|r| r.id == 3).unwrap().answer_comment_list.is_empty());
    }

    #[test]
    fn test_like_flags_with_viewer() {
        let liked: HashSet<i64> = [1, 4].into_iter().collect();
        let feed = assemble(scenario(), &users(&[10, 11, 12]), &liked, Some(10)).unwrap();

        assert_eq!(feed[0].is_like, Some(false));
        assert_eq!(feed[0].answer_comment_list[0].is_like, Some(true));
        assert_eq!(feed[1].is_like, Some(true));
        assert_eq!(feed[1].answer_comment_list[0].is_like, Some(false));
    }

    #[test]
    fn test_like_flags_unset_without_viewer() {
        let liked: HashSet<i64> = [1, 2, 3, 4].into_iter().collect();
        let feed = assemble(scenario(), &users(&[10, 11, 12]), &liked, None).unwrap();

        for root in &feed {
            assert_eq!(root.is_like, None);
            for reply in &root.answer_comment_list {
                assert_eq!(reply.is_like, None);
            }
        }
    }

    #[test]
    fn test_orphaned_reply_is_rejected() {
        let comments = vec![root(1, 10, 100), answer(2, 9, 11, 10, 200)];
        let err = assemble(comments, &users(&[10, 11]), &HashSet::new(), None).unwrap_err();
        assert_eq!(err, ThreadError::OrphanedReply { comment_id: 2, root_id: 9 });

        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::ThreadConsistency(msg) if msg.contains('2') && msg.contains('9')));
    }

    #[test]
    fn test_unordered_input_is_resorted() {
        let mut comments = scenario();
        comments.reverse();
        let feed = assemble(comments, &users(&[10, 11, 12]), &HashSet::new(), None).unwrap();
        assert_eq!(feed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn test_reply_older_than_root_is_orphaned() {
        // Clock skew: the reply carries an earlier timestamp than its root
        let comments = vec![answer(2, 1, 11, 10, 50), root(1, 10, 100)];
        let err = assemble(comments, &users(&[10, 11]), &HashSet::new(), None).unwrap_err();
        assert_eq!(err, ThreadError::OrphanedReply { comment_id: 2, root_id: 1 });
    }

    #[test]
    fn test_mixed_posts_are_rejected() {
        let mut stray = root(5, 10, 500);
        stray.post_id = 8;
        let mut comments = scenario();
        comments.push(stray);

        let err = assemble(comments, &users(&[10, 11, 12]), &HashSet::new(), None).unwrap_err();
        assert_eq!(err, ThreadError::MixedPosts { comment_id: 5, expected: 7, found: 8 });
    }

    #[test]
    fn test_duplicate_root_is_rejected() {
        let mut second = root(2, 10, 200);
        second.root_id = 1;
        let err = assemble(vec![root(1, 10, 100), second], &users(&[10]), &HashSet::new(), None)
            .unwrap_err();
        assert_eq!(err, ThreadError::DuplicateRoot { comment_id: 2, root_id: 1 });
    }

    #[test]
    fn test_missing_user_leaves_info_empty() {
        let feed = assemble(scenario(), &users(&[10]), &HashSet::new(), None).unwrap();
        assert!(feed[0].user_info.is_none());
        assert_eq!(feed[0].answer_comment_list[0].user_info.as_ref().map(|u| u.id), Some(10));
        assert!(feed[0].answer_comment_list[0].answer_user_info.is_none());
    }

    #[test]
    fn test_empty_input() {
        let feed = assemble(Vec::new(), &HashMap::new(), &HashSet::new(), Some(1)).unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_referenced_user_ids() {
        assert_eq!(referenced_user_ids(&scenario()), vec![10, 11, 12]);
    }
}
