use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::authz::IdentityDirectory;
use crate::errors::AppResult;
use crate::models::user::{DbUser, UserKey, UserProfile};
use crate::utils::{to_db_timestamp, utc_now};

/// Identity facts read from the `users` and `user_groups` tables.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates or replaces a user and their group list.
    pub async fn upsert<I, S>(&self, profile: &UserProfile, is_admin: bool, groups: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (user_key, username, display_name, is_admin, created_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_key) DO UPDATE SET username = excluded.username, \
             display_name = excluded.display_name, is_admin = excluded.is_admin",
        )
        .bind(profile.key.as_str())
        .bind(&profile.username)
        .bind(&profile.display_name)
        .bind(is_admin)
        .bind(to_db_timestamp(utc_now()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_groups WHERE user_key = ?")
            .bind(profile.key.as_str())
            .execute(&mut *tx)
            .await?;

        for group in groups {
            sqlx::query("INSERT OR IGNORE INTO user_groups (user_key, group_name) VALUES (?, ?)")
                .bind(profile.key.as_str())
                .bind(group.as_ref())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(user_key = %profile.key, username = %profile.username, is_admin, "user stored");
        Ok(())
    }

    async fn user_by_key(&self, key: &UserKey) -> AppResult<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT user_key, username, display_name, is_admin FROM users WHERE user_key = ?",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl IdentityDirectory for UserDirectory {
    async fn profile_by_key(&self, key: &UserKey) -> AppResult<Option<UserProfile>> {
        Ok(self.user_by_key(key).await?.map(UserProfile::from))
    }

    async fn profile_by_username(&self, username: &str) -> AppResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT user_key, username, display_name, is_admin FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user.map(UserProfile::from))
    }

    async fn is_admin(&self, key: &UserKey) -> AppResult<bool> {
        Ok(self.user_by_key(key).await?.map(|u| u.is_admin).unwrap_or(false))
    }

    async fn group_names(&self, username: &str) -> AppResult<HashSet<String>> {
        let groups = sqlx::query_scalar::<_, String>(
            "SELECT g.group_name FROM user_groups g JOIN users u ON u.user_key = g.user_key WHERE u.username = ?",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups.into_iter().collect())
    }
}
