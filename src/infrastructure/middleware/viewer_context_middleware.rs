// ViewerContext Middleware - builds the request-scoped caller identity
// from the gateway header and injects it into request extensions

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::infrastructure::viewer::ViewerContext;

/// Header carrying the authenticated user id, set by the gateway
pub const USER_ID_HEADER: &str = "userid";

pub async fn viewer_context_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = extract_user_id(request.headers())?;
    let viewer_context = create_viewer_context(user_id);

    tracing::debug!(
        request_id = %viewer_context.request_id,
        user_id = ?viewer_context.user_id,
        "viewer context created"
    );

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

/// A present but non-numeric header is a bad request, not an anonymous one
fn extract_user_id(headers: &HeaderMap) -> Result<Option<i64>, StatusCode> {
    match headers.get(USER_ID_HEADER) {
        Some(value) => {
            let raw = value.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;
            raw.trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StatusCode::BAD_REQUEST)
        }
        None => Ok(None),
    }
}

fn create_viewer_context(user_id: Option<i64>) -> Arc<ViewerContext> {
    let request_id = format!("req-{}", Uuid::new_v4());
    let viewer_context = match user_id {
        Some(id) => ViewerContext::authenticated(id, request_id),
        None => ViewerContext::anonymous(request_id),
    };
    Arc::new(viewer_context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_user_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));

        assert_eq!(extract_user_id(&headers).unwrap(), Some(42));
    }

    #[test]
    fn test_extract_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_user_id(&headers).unwrap(), None);
    }

    #[test]
    fn test_extract_malformed_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("abc"));

        assert_eq!(extract_user_id(&headers), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_create_viewer_context() {
        let vc = create_viewer_context(Some(7));
        assert!(vc.is_authenticated());
        assert!(vc.request_id.starts_with("req-"));
        assert!(!create_viewer_context(None).is_authenticated());
    }
}
