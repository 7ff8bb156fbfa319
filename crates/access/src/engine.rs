//! Access-control decision engine.
//!
//! Stateless between calls: every operation is a short sequence of store
//! reads/writes with the invariant-bearing conditions pushed down into the
//! store (see [`crate::store`]). Construct one engine per call context with
//! an injected store handle; there is deliberately no shared singleton.
//!
//! Read operations are safe to call with arbitrary concurrency. Two calls
//! within the same request do not observe a consistent snapshot unless the
//! store batches them; callers that need one decision per topic should
//! prefer [`AccessEngine::accessible_topics`] over a probe per topic.

use disclose_core::{CompanyId, MemberId, TopicId, UserId};

use crate::error::AccessError;
use crate::policy;
use crate::store::MembershipStore;
use crate::{
    AccessType, CompanyMember, MemberUpdate, MemberWithTopicAccess, NewMember, Role, TopicAccess,
    TopicGrant,
};

/// The authorization decision API.
///
/// Answers (user, company, topic, action) questions and mutates membership
/// and topic-access state under invariant control. Absence of a membership is
/// not an error: it means "unauthenticated for this company" and every
/// decision fails closed on it.
#[derive(Debug, Clone)]
pub struct AccessEngine<S> {
    store: S,
}

impl<S> AccessEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: MembershipStore> AccessEngine<S> {
    /// Full membership record for a user in a company, if any.
    pub async fn resolve_membership(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<CompanyMember>, AccessError> {
        Ok(self.store.member_by_user(company_id, user_id).await?)
    }

    /// Membership record by id (management surfaces address members by id).
    pub async fn member_by_id(
        &self,
        member_id: MemberId,
    ) -> Result<Option<CompanyMember>, AccessError> {
        Ok(self.store.member_by_id(member_id).await?)
    }

    /// Role of a user in a company, if any. No implicit access.
    pub async fn resolve_role(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Role>, AccessError> {
        Ok(self
            .resolve_membership(user_id, company_id)
            .await?
            .map(|m| m.role))
    }

    pub async fn has_company_access(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<bool, AccessError> {
        Ok(self.resolve_role(user_id, company_id).await?.is_some())
    }

    /// Whether the user may manage members and topic grants (owner or admin).
    pub async fn can_manage_members(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<bool, AccessError> {
        Ok(self
            .resolve_role(user_id, company_id)
            .await?
            .is_some_and(Role::is_administrative))
    }

    /// Whether the user may view the given topic.
    pub async fn can_view_topic(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        topic_id: TopicId,
    ) -> Result<bool, AccessError> {
        let Some(member) = self.resolve_membership(user_id, company_id).await? else {
            return Ok(false);
        };

        // Unrestricted members never need the grant row.
        let grant = if member.is_unrestricted() {
            None
        } else {
            self.store.topic_grant(member.id, topic_id).await?
        };

        Ok(policy::can_view_topic(&member, grant.as_ref()))
    }

    /// Whether the user may edit the given topic.
    pub async fn can_edit_topic(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        topic_id: TopicId,
    ) -> Result<bool, AccessError> {
        let Some(member) = self.resolve_membership(user_id, company_id).await? else {
            return Ok(false);
        };

        // Only a selected-scope editor's decision depends on the grant row.
        let grant = match (member.role, member.access_type) {
            (Role::Editor, AccessType::Selected) => {
                self.store.topic_grant(member.id, topic_id).await?
            }
            _ => None,
        };

        Ok(policy::can_edit_topic(&member, grant.as_ref()))
    }

    /// All topic ids the user may view: the full catalog for unrestricted
    /// members, otherwise the member's viewable grants. No membership means
    /// an empty set.
    pub async fn accessible_topics(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Vec<TopicId>, AccessError> {
        let Some(member) = self.resolve_membership(user_id, company_id).await? else {
            return Ok(Vec::new());
        };

        if member.is_unrestricted() {
            return Ok(self.store.topic_catalog().await?);
        }

        let grants = self.store.topic_grants_of_member(member.id).await?;
        Ok(grants
            .into_iter()
            .filter(|g| g.can_view)
            .map(|g| g.topic_id)
            .collect())
    }

    /// All members of a company joined with their topic grants, ordered by
    /// `created_at`.
    pub async fn members_with_access(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<MemberWithTopicAccess>, AccessError> {
        let members = self.store.members_of_company(company_id).await?;
        let mut result = Vec::with_capacity(members.len());
        for member in members {
            let topic_access = self.store.topic_grants_of_member(member.id).await?;
            result.push(MemberWithTopicAccess {
                member,
                topic_access,
            });
        }
        Ok(result)
    }

    /// Insertion path for new memberships.
    ///
    /// Identity resolution belongs to the provisioning flow; this inserts
    /// the already-resolved record. A uniqueness violation from the store is
    /// an expected concurrent-invite outcome and maps to `AlreadyMember`.
    pub async fn add_member(&self, record: NewMember) -> Result<CompanyMember, AccessError> {
        let member = self.store.insert_member(record).await?;
        tracing::info!(
            company_id = %member.company_id,
            user_id = %member.user_id,
            role = %member.role,
            access_type = %member.access_type,
            "member added"
        );
        Ok(member)
    }

    /// Partial update of role and/or access scope.
    ///
    /// Rejects with `InvalidTransition` when the change would leave the
    /// company without an owner; the store evaluates that condition
    /// atomically with the write.
    pub async fn update_member(
        &self,
        member_id: MemberId,
        update: MemberUpdate,
    ) -> Result<CompanyMember, AccessError> {
        if update.is_empty() {
            return self
                .store
                .member_by_id(member_id)
                .await?
                .ok_or(AccessError::NotFound);
        }

        let member = self.store.update_member(member_id, update).await?;
        tracing::info!(
            member_id = %member.id,
            company_id = %member.company_id,
            role = %member.role,
            access_type = %member.access_type,
            "member updated"
        );
        Ok(member)
    }

    /// Remove a membership, with the same last-owner guard as
    /// [`AccessEngine::update_member`].
    pub async fn remove_member(&self, member_id: MemberId) -> Result<(), AccessError> {
        self.store.delete_member(member_id).await?;
        tracing::info!(member_id = %member_id, "member removed");
        Ok(())
    }

    /// Idempotent upsert of a per-topic grant.
    ///
    /// The stored pair is re-derived from the requested intent inside the
    /// engine: requesting edit forces view, clearing view clears edit.
    /// Caller-supplied booleans are never echoed to storage unrepaired.
    pub async fn set_topic_access(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
        can_view: bool,
        can_edit: bool,
    ) -> Result<TopicAccess, AccessError> {
        if self.store.member_by_id(member_id).await?.is_none() {
            return Err(AccessError::NotFound);
        }

        let grant = TopicGrant::new(can_view, can_edit).normalized();
        let row = self
            .store
            .upsert_topic_grant(member_id, topic_id, grant)
            .await?;
        tracing::debug!(
            member_id = %member_id,
            topic_id = %topic_id,
            can_view = row.can_view,
            can_edit = row.can_edit,
            "topic grant set"
        );
        Ok(row)
    }

    /// Revoke all topic-scoped grants for the pair. Under `selected` scope
    /// the pair falls back to "no access", not to "all access".
    pub async fn remove_topic_access(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<(), AccessError> {
        self.store.delete_topic_grant(member_id, topic_id).await?;
        tracing::debug!(member_id = %member_id, topic_id = %topic_id, "topic grant removed");
        Ok(())
    }
}
