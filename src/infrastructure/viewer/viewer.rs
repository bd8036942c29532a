/// Identity of the caller for one request.
///
/// The gateway authenticates and forwards the user id in a header, so an
/// absent `user_id` means an anonymous reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub user_id: Option<i64>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn authenticated(user_id: i64, request_id: String) -> Self {
        ViewerContext {
            user_id: Some(user_id),
            request_id,
        }
    }

    pub fn anonymous(request_id: String) -> Self {
        ViewerContext {
            user_id: None,
            request_id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}
