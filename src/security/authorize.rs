//! Role-based authorization.
//!
//! Membership is exact: there is no role hierarchy, so a route that admits
//! admins must list `admin` explicitly.

use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, Principal, Role};

/// The set of roles permitted on a route group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedRoles(Vec<Role>);

impl AllowedRoles {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut set: Vec<Role> = Vec::new();
        for role in roles {
            if !set.contains(&role) {
                set.push(role);
            }
        }
        Self(set)
    }

    pub fn only(role: Role) -> Self {
        Self(vec![role])
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }
}

impl From<Role> for AllowedRoles {
    fn from(role: Role) -> Self {
        Self::only(role)
    }
}

impl<const N: usize> From<[Role; N]> for AllowedRoles {
    fn from(roles: [Role; N]) -> Self {
        Self::new(roles)
    }
}

/// Check `principal` against `allowed`.
///
/// A missing principal is always rejected, never passed through.
pub fn authorize(principal: Option<&Principal>, allowed: &AllowedRoles) -> Result<(), AuthError> {
    let principal = principal.ok_or(AuthError::NotAuthenticated)?;
    if allowed.contains(principal.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
