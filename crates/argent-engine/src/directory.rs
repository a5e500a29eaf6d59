//! # Branch Directory
//!
//! Branch metadata and the actors who work against it.
//!
//! The directory mirrors `branchMetadata/{branchId} = { name, users }` from
//! the tree. Authorization is uniform: an admin may touch any branch, anyone
//! else only branches they are assigned to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// =============================================================================
// Actor
// =============================================================================

/// Role of the person driving an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The person driving an operation. Authentication happens upstream; the
/// engine only cares about the username and role.
#[derive(Debug, Clone)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn admin(username: impl Into<String>) -> Self {
        Actor {
            username: username.into(),
            role: Role::Admin,
        }
    }

    pub fn user(username: impl Into<String>) -> Self {
        Actor {
            username: username.into(),
            role: Role::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Directory
// =============================================================================

/// Metadata for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

/// All known branches, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct BranchDirectory {
    branches: HashMap<String, BranchInfo>,
}

impl BranchDirectory {
    /// Builds a directory from the `branchMetadata` subtree.
    /// Unknown fields on the metadata objects are ignored.
    pub fn from_tree(tree: Value) -> Result<Self, serde_json::Error> {
        let branches: HashMap<String, BranchInfo> = serde_json::from_value(tree)?;
        Ok(BranchDirectory { branches })
    }

    /// Resolves a branch name to its id.
    pub fn resolve_id(&self, name: &str) -> Option<&str> {
        self.branches
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(id, _)| id.as_str())
    }

    /// True if the username is assigned to the branch.
    pub fn is_assigned(&self, branch_id: &str, username: &str) -> bool {
        self.branches
            .get(branch_id)
            .map(|info| info.users.iter().any(|u| u == username))
            .unwrap_or(false)
    }

    /// The display name of a branch.
    pub fn name(&self, branch_id: &str) -> Option<&str> {
        self.branches.get(branch_id).map(|info| info.name.as_str())
    }

    /// True if the branch id exists.
    pub fn contains(&self, branch_id: &str) -> bool {
        self.branches.contains_key(branch_id)
    }

    /// True if any branch already uses this name.
    pub fn name_taken(&self, name: &str) -> bool {
        self.resolve_id(name).is_some()
    }

    /// Registers a branch.
    pub fn insert(&mut self, branch_id: impl Into<String>, info: BranchInfo) {
        self.branches.insert(branch_id.into(), info);
    }

    /// Iterates over `(id, info)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BranchInfo)> {
        self.branches.iter().map(|(id, info)| (id.as_str(), info))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directory() -> BranchDirectory {
        BranchDirectory::from_tree(json!({
            "b-1": { "name": "downtown", "users": ["sara", "omar"] },
            "b-2": { "name": "harbor", "users": [] },
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_and_name() {
        let dir = directory();
        assert_eq!(dir.resolve_id("downtown"), Some("b-1"));
        assert_eq!(dir.resolve_id("nowhere"), None);
        assert_eq!(dir.name("b-2"), Some("harbor"));
    }

    #[test]
    fn test_assignment() {
        let dir = directory();
        assert!(dir.is_assigned("b-1", "sara"));
        assert!(!dir.is_assigned("b-2", "sara"));
        assert!(!dir.is_assigned("missing", "sara"));
    }

    #[test]
    fn test_legacy_metadata_with_extra_fields_loads() {
        let dir = BranchDirectory::from_tree(json!({
            "b-1": {
                "name": "downtown",
                "users": ["sara"],
                "createdAt": "2023-01-01T00:00:00Z",
                "isActive": true,
            }
        }))
        .unwrap();
        assert!(dir.contains("b-1"));
    }

    #[test]
    fn test_actor_roles() {
        assert!(Actor::admin("boss").is_admin());
        assert!(!Actor::user("sara").is_admin());
    }
}
