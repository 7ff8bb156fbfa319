//! In-memory store and identity directory for tests and dev wiring.
//!
//! Both types keep their state behind a single `RwLock`, so the conditional
//! mutations (duplicate membership, sole owner) are atomic under the write
//! lock the same way the SQL implementations are atomic per statement.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;

use disclose_core::{CompanyId, GrantId, MemberId, TopicId, UserId};

use crate::identity::{IdentityError, IdentityProvider};
use crate::store::{MembershipStore, StoreError};
use crate::{CompanyMember, MemberUpdate, NewMember, Role, TopicAccess, TopicGrant};

#[derive(Debug, Default)]
struct MembershipState {
    members: HashMap<MemberId, CompanyMember>,
    grants: HashMap<(MemberId, TopicId), TopicAccess>,
    topics: Vec<TopicId>,
}

impl MembershipState {
    fn other_owner_exists(&self, company_id: CompanyId, except: MemberId) -> bool {
        self.members
            .values()
            .any(|m| m.company_id == company_id && m.role == Role::Owner && m.id != except)
    }
}

/// In-memory membership store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    inner: RwLock<MembershipState>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the externally-owned topic catalog.
    pub fn register_topic(&self, topic_id: TopicId) {
        if let Ok(mut state) = self.inner.write() {
            if !state.topics.contains(&topic_id) {
                state.topics.push(topic_id);
            }
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend(anyhow!("membership store lock poisoned"))
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn member_by_user(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<Option<CompanyMember>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state
            .members
            .values()
            .find(|m| m.company_id == company_id && m.user_id == user_id)
            .cloned())
    }

    async fn member_by_id(&self, member_id: MemberId) -> Result<Option<CompanyMember>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.members.get(&member_id).cloned())
    }

    async fn members_of_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CompanyMember>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        let mut members: Vec<CompanyMember> = state
            .members
            .values()
            .filter(|m| m.company_id == company_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn insert_member(&self, record: NewMember) -> Result<CompanyMember, StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        let duplicate = state
            .members
            .values()
            .any(|m| m.company_id == record.company_id && m.user_id == record.user_id);
        if duplicate {
            return Err(StoreError::DuplicateMember);
        }

        let member = CompanyMember {
            id: MemberId::new(),
            company_id: record.company_id,
            user_id: record.user_id,
            role: record.role,
            access_type: record.access_type,
            invited_by: record.invited_by,
            invited_at: record.invited_at,
            created_at: Utc::now(),
        };
        state.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update_member(
        &self,
        member_id: MemberId,
        update: MemberUpdate,
    ) -> Result<CompanyMember, StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;

        let current = state.members.get(&member_id).ok_or(StoreError::NotFound)?;
        let new_role = update.role.unwrap_or(current.role);
        if current.role == Role::Owner
            && new_role != Role::Owner
            && !state.other_owner_exists(current.company_id, member_id)
        {
            return Err(StoreError::SoleOwner);
        }

        let member = state
            .members
            .get_mut(&member_id)
            .ok_or(StoreError::NotFound)?;
        member.role = new_role;
        if let Some(access_type) = update.access_type {
            member.access_type = access_type;
        }
        Ok(member.clone())
    }

    async fn delete_member(&self, member_id: MemberId) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;

        let current = state.members.get(&member_id).ok_or(StoreError::NotFound)?;
        if current.role == Role::Owner && !state.other_owner_exists(current.company_id, member_id) {
            return Err(StoreError::SoleOwner);
        }

        state.members.remove(&member_id);
        state.grants.retain(|(m, _), _| *m != member_id);
        Ok(())
    }

    async fn topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<Option<TopicAccess>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.grants.get(&(member_id, topic_id)).cloned())
    }

    async fn topic_grants_of_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<TopicAccess>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        let mut grants: Vec<TopicAccess> = state
            .grants
            .values()
            .filter(|g| g.company_member_id == member_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(grants)
    }

    async fn upsert_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
        grant: TopicGrant,
    ) -> Result<TopicAccess, StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        let row = state
            .grants
            .entry((member_id, topic_id))
            .and_modify(|row| {
                // Both booleans together, never independently.
                row.can_view = grant.can_view;
                row.can_edit = grant.can_edit;
            })
            .or_insert_with(|| TopicAccess {
                id: GrantId::new(),
                company_member_id: member_id,
                topic_id,
                can_view: grant.can_view,
                can_edit: grant.can_edit,
                created_at: Utc::now(),
            });
        Ok(row.clone())
    }

    async fn delete_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        state.grants.remove(&(member_id, topic_id));
        Ok(())
    }

    async fn topic_catalog(&self) -> Result<Vec<TopicId>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.topics.clone())
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<String, UserId>,
    invitations: Vec<Invitation>,
    invite_failure: Option<String>,
}

/// Record of an issued invitation (for assertions and dev inspection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub email: String,
    pub user_id: UserId,
    pub redirect_to: String,
}

/// In-memory identity directory for tests/dev.
///
/// Plays the role of the external identity platform's admin API: account
/// lookup by email and invitation issuance. Lookups are case-sensitive exact
/// matches, like the platform's records.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing, confirmed account.
    pub fn register_user(&self, email: &str) -> UserId {
        let user_id = UserId::new();
        if let Ok(mut state) = self.inner.write() {
            state.users.insert(email.to_string(), user_id);
        }
        user_id
    }

    /// Make subsequent invitations fail with the given provider message.
    pub fn fail_invitations_with(&self, message: &str) {
        if let Ok(mut state) = self.inner.write() {
            state.invite_failure = Some(message.to_string());
        }
    }

    /// Invitations issued so far.
    pub fn invitations(&self) -> Vec<Invitation> {
        self.inner
            .read()
            .map(|state| state.invitations.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, IdentityError> {
        let state = self
            .inner
            .read()
            .map_err(|_| IdentityError::Unavailable(anyhow!("directory lock poisoned")))?;
        Ok(state.users.get(email).copied())
    }

    async fn invite_user_by_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<UserId, IdentityError> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| IdentityError::Unavailable(anyhow!("directory lock poisoned")))?;

        if let Some(message) = &state.invite_failure {
            return Err(IdentityError::Rejected(message.clone()));
        }

        let user_id = UserId::new();
        state.users.insert(email.to_string(), user_id);
        state.invitations.push(Invitation {
            email: email.to_string(),
            user_id,
            redirect_to: redirect_to.to_string(),
        });
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessType;

    fn new_member(company_id: CompanyId, role: Role) -> NewMember {
        NewMember {
            company_id,
            user_id: UserId::new(),
            role,
            access_type: AccessType::All,
            invited_by: None,
            invited_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_company_user_pair() {
        let store = InMemoryMembershipStore::new();
        let company_id = CompanyId::new();
        let record = new_member(company_id, Role::Owner);

        store.insert_member(record.clone()).await.unwrap();
        let err = store.insert_member(record).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateMember));

        assert_eq!(store.members_of_company(company_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sole_owner_cannot_be_demoted_or_deleted() {
        let store = InMemoryMembershipStore::new();
        let company_id = CompanyId::new();
        let owner = store
            .insert_member(new_member(company_id, Role::Owner))
            .await
            .unwrap();

        let demote = MemberUpdate {
            role: Some(Role::Admin),
            access_type: None,
        };
        let err = store.update_member(owner.id, demote).await.unwrap_err();
        assert!(matches!(err, StoreError::SoleOwner));

        let err = store.delete_member(owner.id).await.unwrap_err();
        assert!(matches!(err, StoreError::SoleOwner));
    }

    #[tokio::test]
    async fn second_owner_unlocks_demotion_and_deletion() {
        let store = InMemoryMembershipStore::new();
        let company_id = CompanyId::new();
        let first = store
            .insert_member(new_member(company_id, Role::Owner))
            .await
            .unwrap();
        let second = store
            .insert_member(new_member(company_id, Role::Owner))
            .await
            .unwrap();

        let demoted = store
            .update_member(
                first.id,
                MemberUpdate {
                    role: Some(Role::Editor),
                    access_type: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(demoted.role, Role::Editor);

        // `second` is now the sole owner again.
        let err = store.delete_member(second.id).await.unwrap_err();
        assert!(matches!(err, StoreError::SoleOwner));
    }

    #[tokio::test]
    async fn owner_guard_is_scoped_per_company() {
        let store = InMemoryMembershipStore::new();
        let owner_a = store
            .insert_member(new_member(CompanyId::new(), Role::Owner))
            .await
            .unwrap();
        // An owner of a different company does not satisfy the guard.
        store
            .insert_member(new_member(CompanyId::new(), Role::Owner))
            .await
            .unwrap();

        let err = store.delete_member(owner_a.id).await.unwrap_err();
        assert!(matches!(err, StoreError::SoleOwner));
    }

    #[tokio::test]
    async fn upsert_updates_in_place_and_keeps_identity() {
        let store = InMemoryMembershipStore::new();
        let member = store
            .insert_member(new_member(CompanyId::new(), Role::Editor))
            .await
            .unwrap();
        let topic_id = TopicId::new();

        let first = store
            .upsert_topic_grant(member.id, topic_id, TopicGrant::new(true, false))
            .await
            .unwrap();
        let second = store
            .upsert_topic_grant(member.id, topic_id, TopicGrant::new(true, true))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.can_edit);
        assert_eq!(
            store.topic_grants_of_member(member.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn delete_member_cascades_grants() {
        let store = InMemoryMembershipStore::new();
        let company_id = CompanyId::new();
        store
            .insert_member(new_member(company_id, Role::Owner))
            .await
            .unwrap();
        let editor = store
            .insert_member(new_member(company_id, Role::Editor))
            .await
            .unwrap();
        store
            .upsert_topic_grant(editor.id, TopicId::new(), TopicGrant::new(true, false))
            .await
            .unwrap();

        store.delete_member(editor.id).await.unwrap();
        assert!(store
            .topic_grants_of_member(editor.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn deleting_absent_grant_is_a_noop() {
        let store = InMemoryMembershipStore::new();
        store
            .delete_topic_grant(MemberId::new(), TopicId::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn directory_lookup_is_case_sensitive() {
        let directory = InMemoryDirectory::new();
        let id = directory.register_user("Casey@example.com");

        assert_eq!(
            directory
                .find_user_by_email("Casey@example.com")
                .await
                .unwrap(),
            Some(id)
        );
        assert_eq!(
            directory
                .find_user_by_email("casey@example.com")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn invitation_records_email_and_redirect() {
        let directory = InMemoryDirectory::new();
        let id = directory
            .invite_user_by_email("new@example.com", "https://app.test/auth/callback")
            .await
            .unwrap();

        let invitations = directory.invitations();
        assert_eq!(invitations.len(), 1);
        assert_eq!(invitations[0].email, "new@example.com");
        assert_eq!(invitations[0].user_id, id);
        assert_eq!(invitations[0].redirect_to, "https://app.test/auth/callback");

        // The invited (unconfirmed) account is findable afterwards.
        assert_eq!(
            directory.find_user_by_email("new@example.com").await.unwrap(),
            Some(id)
        );
    }
}
