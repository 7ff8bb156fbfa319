//! Access-control failure taxonomy.

use thiserror::Error;

use crate::store::StoreError;

/// Failure taxonomy for access-control operations.
///
/// Expected business conditions are values here, never panics. `Storage` is
/// the one variant representing an unexpected infrastructure failure and the
/// only one callers may retry at their discretion; permission checks must
/// treat it as "no access", never "access granted".
#[derive(Debug, Error)]
pub enum AccessError {
    /// No resolvable caller identity. Surfaced to the caller, never retried.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Caller authenticated but lacks the capability for the requested
    /// action. Surfaced verbatim, never downgraded to a partial result.
    #[error("not authorized")]
    NotAuthorized,

    /// The resolved user already holds a membership in the target company.
    /// User-correctable; no invitation is sent and no row is created.
    #[error("user is already a member of this company")]
    AlreadyMember,

    /// The addressed record does not exist.
    #[error("not found")]
    NotFound,

    /// Mutation rejected before any write: it would violate an invariant
    /// (e.g. removing the sole owner).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Invitation issuance failed; the provider's message passes through
    /// verbatim. Not blindly retryable: invitation emails are not
    /// idempotent.
    #[error("invite failed: {0}")]
    InviteFailed(String),

    /// Unexpected persistence failure. Logged at the point of origin; safe
    /// for the caller to retry.
    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AccessError::NotFound,
            StoreError::DuplicateMember => AccessError::AlreadyMember,
            StoreError::SoleOwner => {
                AccessError::InvalidTransition("company must retain at least one owner".to_string())
            }
            StoreError::Backend(e) => AccessError::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_maps_to_already_member() {
        let err: AccessError = StoreError::DuplicateMember.into();
        assert!(matches!(err, AccessError::AlreadyMember));
    }

    #[test]
    fn sole_owner_refusal_maps_to_invalid_transition() {
        let err: AccessError = StoreError::SoleOwner.into();
        match err {
            AccessError::InvalidTransition(msg) => assert!(msg.contains("owner")),
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn backend_failures_stay_distinct_from_business_results() {
        let err: AccessError = StoreError::Backend(anyhow::anyhow!("connection reset")).into();
        assert!(matches!(err, AccessError::Storage(_)));
    }
}
