//! Session and identity payloads exchanged with the login endpoints.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use ratatoskr_states::State;
use serde::{Deserialize, Serialize};

/// Identity of a user as known by the backend's user management.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub userid: i64,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
}

/// Outcome of the last login, logout or login-state request.
///
/// Every field defaults when absent from the response, so a partial payload
/// still renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginResult {
    pub success: bool,
    pub errormessage: String,
    pub authorized: bool,
    pub user: User,
    pub original_request_url: Option<String>,
}

impl LoginResult {
    /// Logged in and holding the role the application requires.
    pub fn is_signed_in(&self) -> bool {
        self.success && self.authorized
    }

    pub fn username(&self) -> Option<&str> {
        if self.success && !self.user.username.is_empty() {
            Some(self.user.username.as_str())
        } else {
            None
        }
    }

    pub fn is_signed_in_as(&self, username: &str) -> bool {
        self.is_signed_in() && self.username() == Some(username)
    }
}

impl State for LoginResult {}

/// What the user typed into the login form.
///
/// Lives only in the form and in the login command that consumes it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The wire form: the password base64-encoded. This is an encoding only;
    /// confidentiality comes from the transport.
    pub fn into_payload(self) -> LoginPayload {
        LoginPayload {
            password: STANDARD.encode(self.password.as_bytes()),
            username: self.username,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Request body of `POST /api/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}
