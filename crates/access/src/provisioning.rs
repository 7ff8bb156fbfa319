//! Member provisioning: email → identity → membership.
//!
//! Resolves an email address to a user identity against the external
//! identity platform, issuing an invitation when no account exists, then
//! creates the membership through the engine's insertion path. Runs with the
//! platform's elevated credentials, which is why the requesting caller's own
//! permission is checked first, inside this flow, before any directory call.

use chrono::Utc;

use disclose_core::{CompanyId, UserId};

use crate::engine::AccessEngine;
use crate::error::AccessError;
use crate::identity::{IdentityError, IdentityProvider};
use crate::store::MembershipStore;
use crate::{AccessType, CompanyMember, NewMember, Role};

/// Outcome of a provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedMember {
    pub member: CompanyMember,
    /// Whether an invitation email was issued (the address had no account).
    /// Lets callers distinguish "member added" from "invitation sent".
    pub invited: bool,
}

/// The trusted provisioning flow.
///
/// Holds the admin-privileged directory handle; construct it only in trusted
/// wiring (server-side), never from a caller's session.
pub struct MemberProvisioning<S, I> {
    engine: AccessEngine<S>,
    directory: I,
    redirect_to: String,
}

impl<S, I> MemberProvisioning<S, I>
where
    S: MembershipStore,
    I: IdentityProvider,
{
    /// `redirect_to` is the confirmation-callback target embedded in
    /// invitation links.
    pub fn new(engine: AccessEngine<S>, directory: I, redirect_to: impl Into<String>) -> Self {
        Self {
            engine,
            directory,
            redirect_to: redirect_to.into(),
        }
    }

    /// Add a member to a company, inviting the address if it has no account.
    ///
    /// Order matters:
    /// 1. the inviter's capability is checked before any directory call;
    /// 2. an existing member short-circuits with `AlreadyMember` before any
    ///    invitation is issued;
    /// 3. the store's uniqueness constraint arbitrates concurrent attempts,
    ///    also surfacing as `AlreadyMember`.
    pub async fn add_member(
        &self,
        company_id: CompanyId,
        inviter: UserId,
        email: &str,
        role: Role,
        access_type: AccessType,
    ) -> Result<ProvisionedMember, AccessError> {
        if !self.engine.can_manage_members(inviter, company_id).await? {
            return Err(AccessError::NotAuthorized);
        }

        let existing = self
            .directory
            .find_user_by_email(email)
            .await
            .map_err(lookup_failure)?;

        let (user_id, invited) = match existing {
            Some(user_id) => {
                if self
                    .engine
                    .resolve_membership(user_id, company_id)
                    .await?
                    .is_some()
                {
                    return Err(AccessError::AlreadyMember);
                }
                (user_id, false)
            }
            None => {
                let user_id = self
                    .directory
                    .invite_user_by_email(email, &self.redirect_to)
                    .await
                    .map_err(invite_failure)?;
                tracing::info!(company_id = %company_id, "invitation issued");
                (user_id, true)
            }
        };

        let member = self
            .engine
            .add_member(NewMember {
                company_id,
                user_id,
                role,
                access_type,
                invited_by: Some(inviter),
                invited_at: Utc::now(),
            })
            .await?;

        Ok(ProvisionedMember { member, invited })
    }
}

/// A failed account lookup is an infrastructure failure, not a business
/// outcome: nothing was resolved, nothing may proceed.
fn lookup_failure(err: IdentityError) -> AccessError {
    match err {
        IdentityError::Rejected(msg) => AccessError::Storage(anyhow::anyhow!(msg)),
        IdentityError::Unavailable(e) => AccessError::Storage(e),
    }
}

/// Invitation failures surface the provider's message verbatim so the caller
/// can show it. Never retried automatically: invitation emails are not
/// idempotent.
fn invite_failure(err: IdentityError) -> AccessError {
    match err {
        IdentityError::Rejected(msg) => AccessError::InviteFailed(msg),
        IdentityError::Unavailable(e) => AccessError::InviteFailed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::memory::{InMemoryDirectory, InMemoryMembershipStore};

    struct Fixture {
        store: Arc<InMemoryMembershipStore>,
        directory: Arc<InMemoryDirectory>,
        provisioning:
            MemberProvisioning<Arc<InMemoryMembershipStore>, Arc<InMemoryDirectory>>,
        company_id: CompanyId,
        owner: UserId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryMembershipStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let engine = AccessEngine::new(store.clone());

        let company_id = CompanyId::new();
        let owner = UserId::new();
        engine
            .add_member(NewMember {
                company_id,
                user_id: owner,
                role: Role::Owner,
                access_type: AccessType::All,
                invited_by: None,
                invited_at: Utc::now(),
            })
            .await
            .unwrap();

        let provisioning = MemberProvisioning::new(
            AccessEngine::new(store.clone()),
            directory.clone(),
            "https://app.test/auth/callback",
        );

        Fixture {
            store,
            directory,
            provisioning,
            company_id,
            owner,
        }
    }

    #[tokio::test]
    async fn existing_account_is_added_without_invitation() {
        let fx = fixture().await;
        let user_id = fx.directory.register_user("casey@example.com");

        let outcome = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "casey@example.com",
                Role::Editor,
                AccessType::Selected,
            )
            .await
            .unwrap();

        assert!(!outcome.invited);
        assert_eq!(outcome.member.user_id, user_id);
        assert_eq!(outcome.member.role, Role::Editor);
        assert_eq!(outcome.member.access_type, AccessType::Selected);
        assert_eq!(outcome.member.invited_by, Some(fx.owner));
        assert!(fx.directory.invitations().is_empty());
    }

    #[tokio::test]
    async fn unknown_address_is_invited_and_enrolled() {
        let fx = fixture().await;

        let outcome = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "new@example.com",
                Role::Viewer,
                AccessType::All,
            )
            .await
            .unwrap();

        assert!(outcome.invited);
        let invitations = fx.directory.invitations();
        assert_eq!(invitations.len(), 1);
        assert_eq!(invitations[0].email, "new@example.com");
        assert_eq!(invitations[0].redirect_to, "https://app.test/auth/callback");
        assert_eq!(outcome.member.user_id, invitations[0].user_id);

        // The new member is immediately visible to decisions.
        let engine = AccessEngine::new(fx.store.clone());
        assert_eq!(
            engine
                .resolve_role(outcome.member.user_id, fx.company_id)
                .await
                .unwrap(),
            Some(Role::Viewer)
        );
    }

    #[tokio::test]
    async fn invited_viewer_with_all_scope_views_but_never_edits() {
        let fx = fixture().await;
        fx.store.register_topic(disclose_core::TopicId::new());
        let topic_id = disclose_core::TopicId::new();
        fx.store.register_topic(topic_id);

        let outcome = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "new@x.com",
                Role::Viewer,
                AccessType::All,
            )
            .await
            .unwrap();
        assert!(outcome.invited);

        let engine = AccessEngine::new(fx.store.clone());
        assert!(engine
            .can_view_topic(outcome.member.user_id, fx.company_id, topic_id)
            .await
            .unwrap());
        assert!(!engine
            .can_edit_topic(outcome.member.user_id, fx.company_id, topic_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn already_member_fails_before_any_invitation() {
        let fx = fixture().await;
        fx.directory.register_user("casey@example.com");

        fx.provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "casey@example.com",
                Role::Editor,
                AccessType::All,
            )
            .await
            .unwrap();

        let err = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "casey@example.com",
                Role::Viewer,
                AccessType::All,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AlreadyMember));

        // One membership, zero invitations.
        assert_eq!(
            fx.store
                .members_of_company(fx.company_id)
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(fx.directory.invitations().is_empty());
    }

    #[tokio::test]
    async fn non_administrative_inviter_is_rejected_before_directory_access() {
        let fx = fixture().await;
        let editor = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "editor@example.com",
                Role::Editor,
                AccessType::All,
            )
            .await
            .unwrap();

        for inviter in [editor.member.user_id, UserId::new()] {
            let err = fx
                .provisioning
                .add_member(
                    fx.company_id,
                    inviter,
                    "someone@example.com",
                    Role::Viewer,
                    AccessType::All,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AccessError::NotAuthorized));
        }
        // No lookup result was ever acted on.
        assert_eq!(fx.directory.invitations().len(), 1);
    }

    #[tokio::test]
    async fn provider_rejection_passes_message_through_verbatim() {
        let fx = fixture().await;
        fx.directory
            .fail_invitations_with("email address is not allowed by policy");

        let err = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "blocked@example.com",
                Role::Viewer,
                AccessType::All,
            )
            .await
            .unwrap_err();

        match err {
            AccessError::InviteFailed(msg) => {
                assert_eq!(msg, "email address is not allowed by policy");
            }
            other => panic!("Expected InviteFailed, got {other:?}"),
        }
        // No membership row was created for the failed invitation.
        assert_eq!(
            fx.store
                .members_of_company(fx.company_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn lost_duplicate_race_surfaces_already_member() {
        let fx = fixture().await;
        let user_id = fx.directory.register_user("racer@example.com");

        // A concurrent request inserted the membership between our lookup
        // and insert; the store's uniqueness constraint arbitrates.
        let engine = AccessEngine::new(fx.store.clone());
        engine
            .add_member(NewMember {
                company_id: fx.company_id,
                user_id,
                role: Role::Viewer,
                access_type: AccessType::All,
                invited_by: Some(fx.owner),
                invited_at: Utc::now(),
            })
            .await
            .unwrap();

        let err = fx
            .provisioning
            .add_member(
                fx.company_id,
                fx.owner,
                "racer@example.com",
                Role::Viewer,
                AccessType::All,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AlreadyMember));
    }
}
