use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::authz::TeamDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::team::{Team, TeamRole, TeamRoster};
use crate::models::user::UserKey;

/// SQLite-backed team storage; also serves team membership lookups.
#[derive(Debug, Clone)]
pub struct TeamStore {
    pool: SqlitePool,
}

impl TeamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, name: &str) -> AppResult<Team> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("team name must not be empty"));
        }

        let id = sqlx::query("INSERT INTO teams (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|err| AppError::from_unique_violation(err, format!("team '{name}' already exists")))?
            .last_insert_rowid();

        tracing::info!(team_id = id, team = %name, "team created");
        Ok(Team { id, name: name.to_string() })
    }

    /// Deletes the team by name. Returns `false` if no such team exists.
    pub async fn remove_team(&self, name: &str) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM teams WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed > 0 {
            tracing::info!(team = %name, "team removed");
        }
        Ok(removed > 0)
    }

    pub async fn all(&self) -> AppResult<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>("SELECT id, name FROM teams ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }

    pub async fn team_by_id(&self, id: i64) -> AppResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(team)
    }

    pub async fn team_by_name(&self, name: &str) -> AppResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(team)
    }

    pub async fn add_member(&self, team: &Team, user_key: &UserKey, role: TeamRole) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO team_members (team_id, user_key, role) VALUES (?, ?, ?)")
            .bind(team.id)
            .bind(user_key.as_str())
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        tracing::info!(team = %team.name, user_key = %user_key, role = %role, "team membership added");
        Ok(())
    }

    pub async fn roster(&self, team: &Team) -> AppResult<TeamRoster> {
        let rows = sqlx::query("SELECT user_key, role FROM team_members WHERE team_id = ?")
            .bind(team.id)
            .fetch_all(&self.pool)
            .await?;

        let mut members = BTreeSet::new();
        let mut coordinators = BTreeSet::new();
        for row in rows {
            let key = UserKey::new(row.try_get::<String, _>("user_key")?);
            let role: TeamRole = row.try_get::<String, _>("role")?.parse()?;
            match role {
                TeamRole::Member => members.insert(key),
                TeamRole::Coordinator => coordinators.insert(key),
            };
        }

        Ok(TeamRoster { team: team.clone(), members, coordinators })
    }

    async fn teams_with_role(&self, username: &str, role: TeamRole) -> AppResult<HashSet<Team>> {
        let teams = sqlx::query_as::<_, Team>(
            "SELECT DISTINCT t.id, t.name FROM teams t \
             JOIN team_members m ON m.team_id = t.id \
             JOIN users u ON u.user_key = m.user_key \
             WHERE u.username = ? AND m.role = ?",
        )
        .bind(username)
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(teams.into_iter().collect())
    }
}

#[async_trait]
impl TeamDirectory for TeamStore {
    async fn teams_of_user(&self, username: &str) -> AppResult<HashSet<Team>> {
        self.teams_with_role(username, TeamRole::Member).await
    }

    async fn coordinator_teams_of_user(&self, username: &str) -> AppResult<HashSet<Team>> {
        self.teams_with_role(username, TeamRole::Coordinator).await
    }
}
