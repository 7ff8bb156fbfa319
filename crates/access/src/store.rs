//! Membership store collaborator boundary.
//!
//! The engine owns the rules; the store owns record lifetime and referential
//! integrity. Implementations must keep three conditions atomic at the
//! storage layer (never as engine-side read-then-write pairs):
//!
//! - uniqueness of `(company_id, user_id)` on insert,
//! - the owner-count condition on role changes and deletes,
//! - writing both grant booleans together on upsert.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use disclose_core::{CompanyId, MemberId, TopicId, UserId};

use crate::{CompanyMember, MemberUpdate, NewMember, TopicAccess, TopicGrant};

/// Persistence failures surfaced by a [`MembershipStore`].
///
/// Uniqueness and owner-count refusals are typed variants so the engine can
/// map them to business results instead of treating them as generic backend
/// failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found")]
    NotFound,

    /// Insert refused: a membership already exists for `(company, user)`.
    #[error("membership already exists for this user and company")]
    DuplicateMember,

    /// Conditional mutation refused: it would leave the company ownerless.
    #[error("operation would leave the company without an owner")]
    SoleOwner,

    /// Unexpected backend failure (connectivity, protocol, corruption).
    #[error("storage backend failure")]
    Backend(#[from] anyhow::Error),
}

/// Keyed CRUD over `company_member` and `company_member_topic_access`, plus
/// read-only access to the externally-owned topic catalog.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Point lookup by `(company_id, user_id)`.
    async fn member_by_user(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<Option<CompanyMember>, StoreError>;

    /// Point lookup by membership id.
    async fn member_by_id(&self, member_id: MemberId) -> Result<Option<CompanyMember>, StoreError>;

    /// All members of a company, ordered by `created_at`.
    async fn members_of_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CompanyMember>, StoreError>;

    /// Insert a membership. The store's uniqueness constraint on
    /// `(company_id, user_id)` is the final arbiter under concurrent
    /// inserts; violations surface as [`StoreError::DuplicateMember`].
    async fn insert_member(&self, record: NewMember) -> Result<CompanyMember, StoreError>;

    /// Apply a partial update. Refuses with [`StoreError::SoleOwner`] when a
    /// role change would leave the company without an owner; the condition
    /// is evaluated atomically with the write.
    async fn update_member(
        &self,
        member_id: MemberId,
        update: MemberUpdate,
    ) -> Result<CompanyMember, StoreError>;

    /// Delete a membership, with the same atomic owner-count condition as
    /// [`MembershipStore::update_member`].
    async fn delete_member(&self, member_id: MemberId) -> Result<(), StoreError>;

    /// Point lookup by `(company_member_id, topic_id)`.
    async fn topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<Option<TopicAccess>, StoreError>;

    /// All grants held by one member.
    async fn topic_grants_of_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<TopicAccess>, StoreError>;

    /// Atomic upsert keyed on `(company_member_id, topic_id)`; last writer
    /// wins, and both booleans are written together.
    async fn upsert_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
        grant: TopicGrant,
    ) -> Result<TopicAccess, StoreError>;

    /// Delete a grant. Deleting an absent grant is a no-op (the pair already
    /// has no access under `selected` scope).
    async fn delete_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<(), StoreError>;

    /// Full topic catalog (externally owned; read-only here).
    async fn topic_catalog(&self) -> Result<Vec<TopicId>, StoreError>;
}

#[async_trait]
impl<S> MembershipStore for Arc<S>
where
    S: MembershipStore + ?Sized,
{
    async fn member_by_user(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<Option<CompanyMember>, StoreError> {
        (**self).member_by_user(company_id, user_id).await
    }

    async fn member_by_id(&self, member_id: MemberId) -> Result<Option<CompanyMember>, StoreError> {
        (**self).member_by_id(member_id).await
    }

    async fn members_of_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CompanyMember>, StoreError> {
        (**self).members_of_company(company_id).await
    }

    async fn insert_member(&self, record: NewMember) -> Result<CompanyMember, StoreError> {
        (**self).insert_member(record).await
    }

    async fn update_member(
        &self,
        member_id: MemberId,
        update: MemberUpdate,
    ) -> Result<CompanyMember, StoreError> {
        (**self).update_member(member_id, update).await
    }

    async fn delete_member(&self, member_id: MemberId) -> Result<(), StoreError> {
        (**self).delete_member(member_id).await
    }

    async fn topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<Option<TopicAccess>, StoreError> {
        (**self).topic_grant(member_id, topic_id).await
    }

    async fn topic_grants_of_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<TopicAccess>, StoreError> {
        (**self).topic_grants_of_member(member_id).await
    }

    async fn upsert_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
        grant: TopicGrant,
    ) -> Result<TopicAccess, StoreError> {
        (**self).upsert_topic_grant(member_id, topic_id, grant).await
    }

    async fn delete_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<(), StoreError> {
        (**self).delete_topic_grant(member_id, topic_id).await
    }

    async fn topic_catalog(&self) -> Result<Vec<TopicId>, StoreError> {
        (**self).topic_catalog().await
    }
}
