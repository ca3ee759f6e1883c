//! Caller session: bearer token and role, passed explicitly to every authorized call.

use serde::{Deserialize, Serialize};

/// Account role granted at login.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// Login request (`login` is a username or an email).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Successful login response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub role: Role,
}

/// Who is calling. Anonymous until built from an [`AuthGrant`]; `logout` returns it to anonymous.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    token: Option<String>,
    role: Option<Role>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_grant(grant: AuthGrant) -> Self {
        Self {
            token: Some(grant.token),
            role: Some(grant.role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role == Some(Role::Admin)
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drop the token and role.
    pub fn logout(&mut self) {
        self.token = None;
        self.role = None;
    }
}
