// ViewerContext Extractor - hands the request's ViewerContext to handlers

use std::sync::Arc;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;

/// Cheap-to-clone handle over the request's `ViewerContext`.
/// Requires `viewer_context_middleware` on the router.
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    /// The caller's user id, or `Unauthorized` for anonymous requests
    pub fn require_user(&self) -> AppResult<i64> {
        self.0
            .user_id
            .ok_or_else(|| AppError::Unauthorized("missing userid header".to_string()))
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR);

        async move { vc }
    }
}
