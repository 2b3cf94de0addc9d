use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

/// Closed set of roles an authenticated principal can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// Only patients book slots for themselves.
    pub fn can_book(&self) -> bool {
        matches!(self, Role::Patient)
    }

    /// Admins may cancel any appointment regardless of ownership.
    pub fn can_cancel_any(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_cancel_own(&self) -> bool {
        matches!(self, Role::Patient | Role::Admin)
    }

    /// Patients list the appointments they booked.
    pub fn can_view_own(&self) -> bool {
        matches!(self, Role::Patient)
    }

    pub fn can_view_schedule(&self) -> bool {
        matches!(self, Role::Doctor)
    }

    pub fn can_view_all(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// The principal's role, if the token carried a recognised one.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: Option<&str>) -> User {
        User {
            id: "user-1".to_string(),
            email: None,
            role: role.map(str::to_string),
            created_at: None,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(user_with_role(Some("admin")).role(), Some(Role::Admin));
        assert_eq!(user_with_role(Some("authenticated")).role(), None);
        assert_eq!(user_with_role(None).role(), None);
    }

    #[test]
    fn test_capabilities() {
        assert!(Role::Patient.can_book());
        assert!(!Role::Doctor.can_book());
        assert!(!Role::Admin.can_book());

        assert!(Role::Admin.can_cancel_any());
        assert!(!Role::Patient.can_cancel_any());
        assert!(Role::Patient.can_cancel_own());
        assert!(!Role::Doctor.can_cancel_own());

        assert!(Role::Patient.can_view_own());
        assert!(!Role::Admin.can_view_own());
        assert!(Role::Doctor.can_view_schedule());
        assert!(Role::Admin.can_view_all());
        assert!(!Role::Doctor.can_view_all());
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), "\"doctor\"");
        assert_eq!(Role::Patient.to_string(), "patient");
    }
}
