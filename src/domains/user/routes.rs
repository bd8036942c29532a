// User HTTP API

use axum::{
    extract::{Query, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::domains::user::service::UserService;
use crate::error::AppResult;
use crate::infrastructure::{viewer_context_middleware, Vc};
use crate::models::{ApiResponse, NewUser, User, UserGeneral, UserSummary, UserView};

#[derive(Deserialize)]
pub struct DetailQuery {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct GeneralQuery {
    pub other_user_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

pub async fn register_handler(
    State(service): State<UserService>,
    Json(new_user): Json<NewUser>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = service.register_user(new_user).await?;
    Ok(Json(ApiResponse::ok_with_message(user, "registered")))
}

pub async fn detail_handler(
    State(service): State<UserService>,
    Query(query): Query<DetailQuery>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    Ok(Json(ApiResponse::ok(service.get_user_info(query.user_id).await?)))
}

pub async fn general_handler(
    State(service): State<UserService>,
    vc: Vc,
    Query(query): Query<GeneralQuery>,
) -> AppResult<Json<ApiResponse<UserGeneral>>> {
    let general = service
        .get_user_general_info(vc.user_id, query.other_user_id)
        .await?;
    Ok(Json(ApiResponse::ok(general)))
}

pub async fn check_email_handler(
    State(service): State<UserService>,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let taken = service.check_email(&query.email).await?;
    if taken {
        return Ok(Json(ApiResponse::ok_with_message(true, "email already registered")));
    }
    Ok(Json(ApiResponse::ok(false)))
}

pub async fn check_username_handler(
    State(service): State<UserService>,
    Query(query): Query<UsernameQuery>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let taken = service.check_username(&query.username).await?;
    if taken {
        return Ok(Json(ApiResponse::ok_with_message(true, "username already taken")));
    }
    Ok(Json(ApiResponse::ok(false)))
}

pub async fn search_handler(
    State(service): State<UserService>,
    Query(query): Query<UsernameQuery>,
) -> AppResult<Json<ApiResponse<Vec<UserView>>>> {
    Ok(Json(ApiResponse::ok(service.search_users(&query.username).await?)))
}

/// Batch summary lookup used by other services
pub async fn batch_handler(
    State(service): State<UserService>,
    Json(ids): Json<Vec<i64>>,
) -> AppResult<Json<ApiResponse<HashMap<i64, UserSummary>>>> {
    Ok(Json(ApiResponse::ok(service.get_users_by_ids(&ids).await?)))
}

pub fn create_user_router(service: UserService) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/detail", get(detail_handler))
        .route("/general", get(general_handler))
        .route("/check/email", get(check_email_handler))
        .route("/check/username", get(check_username_handler))
        .route("/search", get(search_handler))
        .route("/batch", post(batch_handler))
        .with_state(service)
        .layer(middleware::from_fn(viewer_context_middleware))
}
