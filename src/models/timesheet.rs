use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserKey;

/// Timesheet header. The owning key is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Timesheet {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub user_key: UserKey,
    pub created_at: DateTime<Utc>,
}

impl Timesheet {
    pub fn owned_by(&self, key: &UserKey) -> bool {
        &self.user_key == key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimesheetEntry {
    pub id: Uuid,
    /// Header of the sheet this entry belongs to.
    pub timesheet: Timesheet,
    pub begin_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub team_id: Option<i64>,
    pub is_imported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimesheetEntry {
    pub fn span(&self) -> EntrySpan {
        EntrySpan {
            begin: self.begin_date,
            end: self.end_date,
            is_imported: self.is_imported,
        }
    }
}

/// The parts of an entry the edit/delete windows look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySpan {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_imported: bool,
}

impl EntrySpan {
    pub fn new(begin: DateTime<Utc>, end: DateTime<Utc>, is_imported: bool) -> Self {
        Self { begin, end, is_imported }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimesheetDetail {
    #[serde(flatten)]
    pub sheet: Timesheet,
    pub entries: Vec<TimesheetEntry>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EntryRequest {
    pub begin_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub team_id: Option<i64>,
    /// Only honoured on creation; provenance never changes afterwards.
    #[serde(default)]
    pub is_imported: bool,
}

/// Years representable in the stored RFC3339 text.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

impl EntryRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [("begin_date", self.begin_date), ("end_date", self.end_date)] {
            if !STORABLE_YEARS.contains(&value.year()) {
                return Err(AppError::bad_request(format!("{field} must fall within years 0000 to 9999")));
            }
        }
        if self.end_date < self.begin_date {
            return Err(AppError::bad_request("end_date must not be before begin_date"));
        }
        Ok(())
    }

    pub fn span(&self) -> EntrySpan {
        EntrySpan::new(self.begin_date, self.end_date, self.is_imported)
    }
}
