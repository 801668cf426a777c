use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::timesheet::{Timesheet, TimesheetEntry};
use crate::models::user::UserKey;

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // RFC3339 (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite default timestamp format: "YYYY-MM-DD HH:MM:SS" (optional fraction)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s.trim()).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T, AppError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::internal(format!("missing {}: {}", name, e)))
}

/// Expects `id`, `user_key`, `created_at`.
pub fn timesheet_from_row(row: &SqliteRow) -> Result<Timesheet, AppError> {
    let id_s: String = column(row, "id")?;
    let user_key: String = column(row, "user_key")?;
    let created_at_s: String = column(row, "created_at")?;

    Ok(Timesheet {
        id: parse_uuid(&id_s)?,
        user_key: UserKey::new(user_key),
        created_at: parse_datetime(&created_at_s)?,
    })
}

/// Expects the entry columns plus the owning sheet as
/// `sheet_user_key` and `sheet_created_at`.
pub fn timesheet_entry_from_row(row: &SqliteRow) -> Result<TimesheetEntry, AppError> {
    let id_s: String = column(row, "id")?;
    let timesheet_id_s: String = column(row, "timesheet_id")?;
    let sheet_user_key: String = column(row, "sheet_user_key")?;
    let sheet_created_at_s: String = column(row, "sheet_created_at")?;
    let begin_s: String = column(row, "begin_date")?;
    let end_s: String = column(row, "end_date")?;
    let description: Option<String> = column(row, "description")?;
    let category_id: Option<i64> = column(row, "category_id")?;
    let team_id: Option<i64> = column(row, "team_id")?;
    let is_imported: bool = column(row, "is_imported")?;
    let created_at_s: String = column(row, "created_at")?;
    let updated_at_s: String = column(row, "updated_at")?;

    let timesheet = Timesheet {
        id: parse_uuid(&timesheet_id_s)?,
        user_key: UserKey::new(sheet_user_key),
        created_at: parse_datetime(&sheet_created_at_s)?,
    };

    Ok(TimesheetEntry {
        id: parse_uuid(&id_s)?,
        timesheet,
        begin_date: parse_datetime(&begin_s)?,
        end_date: parse_datetime(&end_s)?,
        description,
        category_id,
        team_id,
        is_imported,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}
