use disclose_core::UserId;

/// Authenticated caller identity for a request.
///
/// Produced by the attestation middleware from the identity platform's
/// token; must be present for all protected routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    user_id: UserId,
}

impl CallerContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
