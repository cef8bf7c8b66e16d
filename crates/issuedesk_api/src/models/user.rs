//! User identity and authentication payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    /// Name shown in the UI: display name when set, email otherwise.
    pub fn display(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

/// Request body for both login and register.
#[derive(Debug, Serialize, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// `data` of the login/register envelopes. Register may omit the token.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthPayload {
    pub user: User,
    #[serde(default)]
    pub token: Option<String>,
}
