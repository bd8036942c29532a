// Comment HTTP API

use axum::{
    extract::{Path, State},
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};

use crate::domains::comment::service::CommentService;
use crate::error::AppResult;
use crate::infrastructure::{viewer_context_middleware, Vc};
use crate::models::{
    AnswerCommentView, ApiResponse, Comment, CommentDeleted, CommentEdit, NewComment,
    RootCommentView,
};

pub async fn send_comment_handler(
    State(service): State<CommentService>,
    vc: Vc,
    Json(new_comment): Json<NewComment>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let user_id = vc.require_user()?;
    let comment = service.send_user_comment(user_id, new_comment).await?;
    Ok(Json(ApiResponse::ok_with_message(comment, "comment sent")))
}

pub async fn update_comment_handler(
    State(service): State<CommentService>,
    vc: Vc,
    Path(comment_id): Path<i64>,
    Json(edit): Json<CommentEdit>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let user_id = vc.require_user()?;
    let comment = service.update_comment(user_id, comment_id, edit).await?;
    Ok(Json(ApiResponse::ok(comment)))
}

pub async fn delete_comment_handler(
    State(service): State<CommentService>,
    vc: Vc,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<ApiResponse<CommentDeleted>>> {
    let user_id = vc.require_user()?;
    let deleted = service.delete_user_comment(user_id, comment_id).await?;
    Ok(Json(ApiResponse::ok_with_message(deleted, "comment deleted")))
}

pub async fn post_comments_handler(
    State(service): State<CommentService>,
    vc: Vc,
    Path(post_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<RootCommentView>>>> {
    let feed = service.get_post_comments(vc.user_id, post_id).await?;
    Ok(Json(ApiResponse::ok(feed)))
}

pub async fn user_comments_handler(
    State(service): State<CommentService>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<AnswerCommentView>>>> {
    let comments = service.get_user_comments(user_id).await?;
    Ok(Json(ApiResponse::ok(comments)))
}

pub async fn answered_comments_handler(
    State(service): State<CommentService>,
    vc: Vc,
) -> AppResult<Json<ApiResponse<Vec<AnswerCommentView>>>> {
    let user_id = vc.require_user()?;
    let comments = service.get_user_answered_comments(user_id).await?;
    Ok(Json(ApiResponse::ok(comments)))
}

pub async fn like_comment_handler(
    State(service): State<CommentService>,
    vc: Vc,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let user_id = vc.require_user()?;
    let added = service.like_comment(user_id, comment_id).await?;
    Ok(Json(ApiResponse::ok(added)))
}

pub async fn unlike_comment_handler(
    State(service): State<CommentService>,
    vc: Vc,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let user_id = vc.require_user()?;
    let removed = service.unlike_comment(user_id, comment_id).await?;
    Ok(Json(ApiResponse::ok(removed)))
}

pub fn create_comment_router(service: CommentService) -> Router {
    Router::new()
        .route("/send", post(send_comment_handler))
        .route("/{id}", put(update_comment_handler).delete(delete_comment_handler))
        .route("/{id}/like", post(like_comment_handler).delete(unlike_comment_handler))
        .route("/post/{post_id}", get(post_comments_handler))
        .route("/user/{user_id}", get(user_comments_handler))
        .route("/answered", get(answered_comments_handler))
        .with_state(service)
        .layer(middleware::from_fn(viewer_context_middleware))
}
