use core::str::FromStr;

use serde::{Deserialize, Serialize};

use disclose_core::DomainError;

/// Membership role within a company.
///
/// Ordered by privilege: owner > admin > editor > viewer. Privilege is
/// capability-based rather than purely hierarchical: editor and viewer differ
/// only in edit capability, not in view scope.
///
/// Roles are a closed enumeration so that every decision tree branching on
/// role is forced through exhaustive matching.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Owners and admins administer membership and topic grants, and their
    /// topic visibility is unconditional.
    pub fn is_administrative(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// Whether a member's topic visibility is unrestricted or enumerated through
/// explicit per-topic grants.
///
/// Semantically inert for owner/admin members: the engine treats those roles
/// as unrestricted regardless of this field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    All,
    Selected,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::All => "all",
            AccessType::Selected => "selected",
        }
    }
}

impl core::fmt::Display for AccessType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AccessType::All),
            "selected" => Ok(AccessType::Selected),
            other => Err(DomainError::validation(format!("unknown access type: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serde_uses_lowercase_tags() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"viewer\"").unwrap(),
            Role::Viewer
        );
    }

    #[test]
    fn role_parse_roundtrip() {
        for role in [Role::Owner, Role::Admin, Role::Editor, Role::Viewer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn role_parse_rejects_unknown() {
        let err = "superuser".parse::<Role>().unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn only_owner_and_admin_are_administrative() {
        assert!(Role::Owner.is_administrative());
        assert!(Role::Admin.is_administrative());
        assert!(!Role::Editor.is_administrative());
        assert!(!Role::Viewer.is_administrative());
    }

    #[test]
    fn access_type_parse_roundtrip() {
        for at in [AccessType::All, AccessType::Selected] {
            assert_eq!(at.as_str().parse::<AccessType>().unwrap(), at);
        }
    }
}
