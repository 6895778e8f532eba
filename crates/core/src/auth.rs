use serde::{Deserialize, Serialize};

/// Kind of account signed in to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Applicant filling benefit forms.
    Citizen,
    /// Reviewing officer.
    Officer,
}

/// Identity persisted between client runs.
///
/// Screens and services receive this value explicitly; persistence is the job
/// of a session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    user_type: UserType,
    token: String,
    username: String,
    designation: Option<String>,
    verified: bool,
}

impl SessionIdentity {
    /// Creates a session identity from the login response.
    #[must_use]
    pub fn new(
        user_type: UserType,
        token: impl Into<String>,
        username: impl Into<String>,
        designation: Option<String>,
        verified: bool,
    ) -> Self {
        Self {
            user_type,
            token: token.into(),
            username: username.into(),
            designation,
            verified,
        }
    }

    /// Returns the account kind.
    #[must_use]
    pub fn user_type(&self) -> UserType {
        self.user_type
    }

    /// Returns the bearer token for API calls.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns the officer designation, if any.
    #[must_use]
    pub fn designation(&self) -> Option<&str> {
        self.designation.as_deref()
    }

    /// Returns whether OTP verification completed.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }
}
