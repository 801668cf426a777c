use std::collections::BTreeSet;

use crate::models::user::UserKey;

/// Snapshot of who may use the system at all.
///
/// Built once at startup and handed to the policy engine; nothing reads
/// approval settings from the environment after that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalConfig {
    approved_users: BTreeSet<UserKey>,
    approved_groups: BTreeSet<String>,
}

impl ApprovalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, K>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<UserKey>,
    {
        self.approved_users = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approved_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Reads `APPROVED_USERS` and `APPROVED_GROUPS` (comma separated).
    pub fn from_env() -> Self {
        let users = std::env::var("APPROVED_USERS").unwrap_or_default();
        let groups = std::env::var("APPROVED_GROUPS").unwrap_or_default();

        Self::new()
            .with_users(split_list(&users).map(UserKey::from))
            .with_groups(split_list(&groups))
    }

    pub fn approved_users(&self) -> impl Iterator<Item = &UserKey> {
        self.approved_users.iter()
    }

    pub fn approved_groups(&self) -> impl Iterator<Item = &str> {
        self.approved_groups.iter().map(String::as_str)
    }

    /// Nobody is approved while both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.approved_users.is_empty() && self.approved_groups.is_empty()
    }

    pub fn is_user_approved(&self, key: &UserKey) -> bool {
        self.approved_users.contains(key)
    }

    pub fn is_group_approved(&self, group: &str) -> bool {
        self.approved_groups.contains(group)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
