use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::row_parsers::{timesheet_entry_from_row, timesheet_from_row};
use crate::errors::{AppError, AppResult};
use crate::models::timesheet::{EntryRequest, Timesheet, TimesheetDetail, TimesheetEntry};
use crate::models::user::UserKey;
use crate::utils::{to_db_timestamp, utc_now};

const ENTRY_COLUMNS: &str = "e.id, e.timesheet_id, s.user_key AS sheet_user_key, s.created_at AS sheet_created_at, \
     e.begin_date, e.end_date, e.description, e.category_id, e.team_id, e.is_imported, e.created_at, e.updated_at";

#[derive(Debug, Clone)]
pub struct TimesheetStore {
    pool: SqlitePool,
}

impl TimesheetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Each user owns at most one timesheet.
    pub async fn create(&self, user_key: &UserKey) -> AppResult<Timesheet> {
        let sheet = Timesheet {
            id: Uuid::new_v4(),
            user_key: user_key.clone(),
            created_at: utc_now(),
        };

        sqlx::query("INSERT INTO timesheets (id, user_key, created_at) VALUES (?, ?, ?)")
            .bind(sheet.id.to_string())
            .bind(sheet.user_key.as_str())
            .bind(to_db_timestamp(sheet.created_at))
            .execute(&self.pool)
            .await
            .map_err(|err| AppError::from_unique_violation(err, "user already has a timesheet"))?;

        tracing::info!(sheet = %sheet.id, user_key = %sheet.user_key, "timesheet created");
        Ok(sheet)
    }

    pub async fn by_id(&self, id: Uuid) -> AppResult<Option<Timesheet>> {
        let row = sqlx::query("SELECT id, user_key, created_at FROM timesheets WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(timesheet_from_row).transpose()
    }

    pub async fn by_user_key(&self, user_key: &UserKey) -> AppResult<Option<Timesheet>> {
        let row = sqlx::query("SELECT id, user_key, created_at FROM timesheets WHERE user_key = ?")
            .bind(user_key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(timesheet_from_row).transpose()
    }

    /// Entries ordered by begin date.
    pub async fn entries(&self, sheet: &Timesheet) -> AppResult<Vec<TimesheetEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM timesheet_entries e JOIN timesheets s ON s.id = e.timesheet_id \
             WHERE e.timesheet_id = ? ORDER BY e.begin_date ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(sheet.id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(timesheet_entry_from_row).collect()
    }

    pub async fn detail(&self, sheet: Timesheet) -> AppResult<TimesheetDetail> {
        let entries = self.entries(&sheet).await?;
        Ok(TimesheetDetail { sheet, entries })
    }

    pub async fn entry_by_id(&self, id: Uuid) -> AppResult<Option<TimesheetEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM timesheet_entries e JOIN timesheets s ON s.id = e.timesheet_id WHERE e.id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(timesheet_entry_from_row).transpose()
    }

    pub async fn insert_entry(&self, sheet: &Timesheet, payload: &EntryRequest) -> AppResult<TimesheetEntry> {
        payload.validate()?;
        let id = Uuid::new_v4();
        let now = to_db_timestamp(utc_now());

        sqlx::query(
            "INSERT INTO timesheet_entries (id, timesheet_id, begin_date, end_date, description, category_id, team_id, is_imported, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(sheet.id.to_string())
        .bind(to_db_timestamp(payload.begin_date))
        .bind(to_db_timestamp(payload.end_date))
        .bind(&payload.description)
        .bind(payload.category_id)
        .bind(payload.team_id)
        .bind(payload.is_imported)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::info!(sheet = %sheet.id, entry = %id, is_imported = payload.is_imported, "timesheet entry created");
        self.fetch_entry(id).await
    }

    /// Rewrites times, description and links. Provenance is left as stored.
    pub async fn update_entry(&self, entry: &TimesheetEntry, payload: &EntryRequest) -> AppResult<TimesheetEntry> {
        payload.validate()?;

        sqlx::query(
            "UPDATE timesheet_entries SET begin_date = ?, end_date = ?, description = ?, category_id = ?, team_id = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(to_db_timestamp(payload.begin_date))
        .bind(to_db_timestamp(payload.end_date))
        .bind(&payload.description)
        .bind(payload.category_id)
        .bind(payload.team_id)
        .bind(to_db_timestamp(utc_now()))
        .bind(entry.id.to_string())
        .execute(&self.pool)
        .await?;

        tracing::info!(sheet = %entry.timesheet.id, entry = %entry.id, "timesheet entry updated");
        self.fetch_entry(entry.id).await
    }

    pub async fn delete_entry(&self, entry: &TimesheetEntry) -> AppResult<()> {
        sqlx::query("DELETE FROM timesheet_entries WHERE id = ?")
            .bind(entry.id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::info!(sheet = %entry.timesheet.id, entry = %entry.id, "timesheet entry deleted");
        Ok(())
    }

    async fn fetch_entry(&self, id: Uuid) -> AppResult<TimesheetEntry> {
        self.entry_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("timesheet entry not found"))
    }
}
