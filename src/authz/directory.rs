use std::collections::HashSet;

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::team::Team;
use crate::models::user::{UserKey, UserProfile};

/// Read-only team membership lookups.
///
/// The two queries are independent reads; a membership change landing
/// between them can yield a combined view that never existed at a single
/// instant. Coordination checks accept that.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Teams listing `username` as a member.
    async fn teams_of_user(&self, username: &str) -> AppResult<HashSet<Team>>;

    /// Teams listing `username` as a coordinator.
    async fn coordinator_teams_of_user(&self, username: &str) -> AppResult<HashSet<Team>>;
}

/// Identity facts about users.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn profile_by_key(&self, key: &UserKey) -> AppResult<Option<UserProfile>>;

    async fn profile_by_username(&self, username: &str) -> AppResult<Option<UserProfile>>;

    /// Unknown users are not administrators.
    async fn is_admin(&self, key: &UserKey) -> AppResult<bool>;

    async fn group_names(&self, username: &str) -> AppResult<HashSet<String>>;
}
