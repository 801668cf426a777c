use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::user::UserKey;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Team {
    pub id: i64,
    #[schema(example = "Catroid")]
    pub name: String,
}

/// How a user is attached to a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Member,
    Coordinator,
}

impl TeamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::Member => "member",
            TeamRole::Coordinator => "coordinator",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TeamRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(TeamRole::Member),
            "coordinator" => Ok(TeamRole::Coordinator),
            other => Err(AppError::internal(format!("invalid team role: {other}"))),
        }
    }
}

/// A team together with the keys of its members and coordinators.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamRoster {
    pub team: Team,
    #[schema(value_type = Vec<String>)]
    pub members: BTreeSet<UserKey>,
    #[schema(value_type = Vec<String>)]
    pub coordinators: BTreeSet<UserKey>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamCreateRequest {
    #[schema(example = "Catroid")]
    pub name: String,
}
