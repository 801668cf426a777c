use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Stable identity of a user. Ownership is decided by this key alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A resolved user. The username is a lookup alias and may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[schema(value_type = String, example = "8a7f3c0e5b9d")]
    pub key: UserKey,
    #[schema(example = "ada")]
    pub username: String,
    pub display_name: Option<String>,
}

impl UserProfile {
    pub fn new(key: impl Into<UserKey>, username: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            username: username.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub user_key: String,
    pub username: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

impl From<DbUser> for UserProfile {
    fn from(value: DbUser) -> Self {
        UserProfile {
            key: UserKey::new(value.user_key),
            username: value.username,
            display_name: value.display_name,
        }
    }
}
