//! Identity-provider collaborator boundary (admin-privileged).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use disclose_core::UserId;

/// Failures from the external identity platform.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider rejected the operation (invalid address, delivery
    /// refusal, policy). The message is surfaced verbatim to the caller.
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or answered out of protocol.
    #[error("identity provider unavailable")]
    Unavailable(#[from] anyhow::Error),
}

/// Admin-privileged operations against the external identity platform.
///
/// Implementations hold elevated credentials (account search, invitation
/// issuance) and must run in a trusted execution context. They are never
/// handed to the requesting user's session; the caller's own permissions are
/// checked by the engine before this boundary is crossed.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Direct lookup of an account by email, case-sensitive exact match
    /// against the provider's record.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, IdentityError>;

    /// Invite a new account and return the provider-created (unconfirmed)
    /// user id. The confirmation link redirects to `redirect_to`. Delivery
    /// of the email itself belongs to the platform.
    async fn invite_user_by_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<UserId, IdentityError>;
}

#[async_trait]
impl<I> IdentityProvider for Arc<I>
where
    I: IdentityProvider + ?Sized,
{
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, IdentityError> {
        (**self).find_user_by_email(email).await
    }

    async fn invite_user_by_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<UserId, IdentityError> {
        (**self).invite_user_by_email(email, redirect_to).await
    }
}
