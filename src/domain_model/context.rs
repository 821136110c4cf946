use super::UserId;

/// Per-request context handed to handlers behind the auth filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Option<UserId>,
}

impl RequestContext {
    pub fn authenticated(user_id: UserId) -> Self {
        RequestContext {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}
