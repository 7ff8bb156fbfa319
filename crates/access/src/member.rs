//! Membership records and per-topic access grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use disclose_core::{CompanyId, GrantId, MemberId, TopicId, UserId};

use crate::{AccessType, Role};

/// One user's relationship to one company.
///
/// At most one record exists per `(company_id, user_id)` pair; the store's
/// uniqueness constraint is the final arbiter under concurrent inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMember {
    pub id: MemberId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub role: Role,
    pub access_type: AccessType,
    /// Inviting user; absent for the founding owner seeded at company creation.
    pub invited_by: Option<UserId>,
    pub invited_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CompanyMember {
    /// Whether topic visibility is unrestricted for this member.
    ///
    /// Owner and admin are unrestricted regardless of `access_type`; the
    /// field is semantically inert for those roles.
    pub fn is_unrestricted(&self) -> bool {
        self.role.is_administrative() || self.access_type == AccessType::All
    }
}

/// Per-member, per-topic capability grant.
///
/// Meaningful only while the owning member has `access_type = selected` and a
/// non-administrative role; rows held by other members are inert. At most one
/// record exists per `(company_member_id, topic_id)` pair (upsert semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAccess {
    pub id: GrantId,
    pub company_member_id: MemberId,
    pub topic_id: TopicId,
    pub can_view: bool,
    pub can_edit: bool,
    pub created_at: DateTime<Utc>,
}

impl TopicAccess {
    pub fn grant(&self) -> TopicGrant {
        TopicGrant {
            can_view: self.can_view,
            can_edit: self.can_edit,
        }
    }
}

/// A requested view/edit pair for a topic grant.
///
/// Editing without viewing is meaningless, so every stored pair must satisfy
/// `can_edit ⇒ can_view`. [`TopicGrant::normalized`] re-derives a consistent
/// pair from the requested intent: requesting edit implies view, and a pair
/// without edit keeps the requested view bit. Callers are not a security
/// boundary; the repair happens inside the engine, never by echoing
/// caller-supplied booleans.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGrant {
    pub can_view: bool,
    pub can_edit: bool,
}

impl TopicGrant {
    pub fn new(can_view: bool, can_edit: bool) -> Self {
        Self { can_view, can_edit }
    }

    /// Repair the pair so the `can_edit ⇒ can_view` invariant holds.
    pub fn normalized(self) -> Self {
        Self {
            can_view: self.can_view || self.can_edit,
            can_edit: self.can_edit,
        }
    }

    /// Whether the invariant `can_edit ⇒ can_view` holds.
    pub fn is_consistent(self) -> bool {
        self.can_view || !self.can_edit
    }
}

/// New membership record for the engine's insertion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub role: Role,
    pub access_type: AccessType,
    pub invited_by: Option<UserId>,
    pub invited_at: DateTime<Utc>,
}

/// Partial update to a membership: role and/or access scope only.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemberUpdate {
    pub role: Option<Role>,
    pub access_type: Option<AccessType>,
}

impl MemberUpdate {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.access_type.is_none()
    }
}

/// A member joined with its topic grants (management listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberWithTopicAccess {
    #[serde(flatten)]
    pub member: CompanyMember,
    pub topic_access: Vec<TopicAccess>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn member(role: Role, access_type: AccessType) -> CompanyMember {
        CompanyMember {
            id: MemberId::new(),
            company_id: CompanyId::new(),
            user_id: UserId::new(),
            role,
            access_type,
            invited_by: None,
            invited_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owner_and_admin_are_unrestricted_even_when_selected() {
        assert!(member(Role::Owner, AccessType::Selected).is_unrestricted());
        assert!(member(Role::Admin, AccessType::Selected).is_unrestricted());
    }

    #[test]
    fn editor_and_viewer_restriction_follows_access_type() {
        assert!(member(Role::Editor, AccessType::All).is_unrestricted());
        assert!(!member(Role::Editor, AccessType::Selected).is_unrestricted());
        assert!(member(Role::Viewer, AccessType::All).is_unrestricted());
        assert!(!member(Role::Viewer, AccessType::Selected).is_unrestricted());
    }

    #[test]
    fn normalized_forces_view_when_edit_requested() {
        let repaired = TopicGrant::new(false, true).normalized();
        assert_eq!(repaired, TopicGrant::new(true, true));
    }

    #[test]
    fn normalized_keeps_view_only_pair() {
        let grant = TopicGrant::new(true, false).normalized();
        assert_eq!(grant, TopicGrant::new(true, false));
    }

    #[test]
    fn normalized_keeps_revoked_pair() {
        let grant = TopicGrant::new(false, false).normalized();
        assert_eq!(grant, TopicGrant::new(false, false));
    }

    proptest! {
        #[test]
        fn normalized_always_satisfies_edit_implies_view(can_view: bool, can_edit: bool) {
            let grant = TopicGrant::new(can_view, can_edit).normalized();
            prop_assert!(grant.is_consistent());
        }

        #[test]
        fn normalized_is_idempotent(can_view: bool, can_edit: bool) {
            let once = TopicGrant::new(can_view, can_edit).normalized();
            prop_assert_eq!(once, once.normalized());
        }

        #[test]
        fn normalized_never_drops_requested_edit(can_view: bool, can_edit: bool) {
            let grant = TopicGrant::new(can_view, can_edit).normalized();
            prop_assert_eq!(grant.can_edit, can_edit);
        }
    }
}
