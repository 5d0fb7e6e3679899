//! Legacy role hierarchy
//!
//! Roles are held by identities, access levels are required by routes and
//! handlers. Both resolve to bit masks; an identity satisfies an access level
//! when the two masks share at least one bit.

use serde_json::Value;

use crate::identity::Identity;

/// Named privilege tier held by an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Role {
    pub name: &'static str,
    pub bit_mask: u32,
}

/// Named privilege tier required by a route or handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessLevel {
    pub name: &'static str,
    pub bit_mask: u32,
}

pub const PUBLIC: &str = "public";

pub const PUBLIC_ROLE: Role = Role { name: PUBLIC, bit_mask: 0b1000 };
pub const USER_ROLE: Role = Role { name: "user", bit_mask: 0b0001 };
pub const STAFF_ROLE: Role = Role { name: "staff", bit_mask: 0b0010 };
pub const ADMIN_ROLE: Role = Role { name: "admin", bit_mask: 0b0100 };

pub const ROLES: [Role; 4] = [PUBLIC_ROLE, USER_ROLE, STAFF_ROLE, ADMIN_ROLE];

// Each level admits its own role and every role above it.
pub const PUBLIC_ACCESS: AccessLevel = AccessLevel { name: PUBLIC, bit_mask: 0b1111 };
pub const USER_ACCESS: AccessLevel = AccessLevel { name: "user", bit_mask: 0b0111 };
pub const STAFF_ACCESS: AccessLevel = AccessLevel { name: "staff", bit_mask: 0b0110 };
pub const ADMIN_ACCESS: AccessLevel = AccessLevel { name: "admin", bit_mask: 0b0100 };

pub const ACCESS_LEVELS: [AccessLevel; 4] = [PUBLIC_ACCESS, USER_ACCESS, STAFF_ACCESS, ADMIN_ACCESS];

/// Resolve a role by exact name, falling back to the public role
pub fn resolve_role(name: Option<&str>) -> Role {
    name.and_then(|name| ROLES.iter().find(|role| role.name == name))
        .copied()
        .unwrap_or(PUBLIC_ROLE)
}

/// Resolve a role from an untyped profile field. Anything but a known role
/// name (missing, null, numbers, objects) resolves to the public role.
pub fn role_from_value(value: Option<&Value>) -> Role {
    resolve_role(value.and_then(Value::as_str))
}

/// Resolve an access level by exact name, falling back to public access
pub fn resolve_access_level(name: Option<&str>) -> AccessLevel {
    name.and_then(|name| ACCESS_LEVELS.iter().find(|level| level.name == name))
        .copied()
        .unwrap_or(PUBLIC_ACCESS)
}

/// True when the access level requires nothing beyond public access
pub fn is_public(access_level: Option<&str>) -> bool {
    match access_level {
        None => true,
        Some(name) => name == PUBLIC,
    }
}

/// Check whether a role satisfies an access level
pub fn role_satisfies(role: Role, access_level: AccessLevel) -> bool {
    access_level.bit_mask & role.bit_mask != 0
}

/// Check an identity against a named access level.
///
/// A missing identity is treated as holding the public role.
pub fn is_authorized(identity: Option<&Identity>, access_level: Option<&str>) -> bool {
    let role = identity.map(|identity| identity.role).unwrap_or(PUBLIC_ROLE);
    role_satisfies(role, resolve_access_level(access_level))
}
