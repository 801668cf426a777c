use std::fmt;

use chrono::{DateTime, Duration, Months, Utc};

use crate::utils::utc_now;

/// Source of "now" for time-window decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        utc_now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// `true` when `timestamp` lies strictly more than `days` days before `now`.
pub fn is_older_than_days(timestamp: DateTime<Utc>, days: i64, now: DateTime<Utc>) -> bool {
    now - timestamp > Duration::days(days)
}

/// Calendar variant: the cutoff is `now` minus `years` calendar years.
/// An instant exactly on the cutoff is not older. A cutoff that cannot be
/// represented counts as older.
pub fn is_older_than_years(timestamp: DateTime<Utc>, years: u32, now: DateTime<Utc>) -> bool {
    match now.checked_sub_months(Months::new(years.saturating_mul(12))) {
        Some(cutoff) => timestamp < cutoff,
        None => true,
    }
}

/// Editing window that applies to an entry, chosen by its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditWindow {
    /// Manually entered: 30 days.
    Manual,
    /// Imported: 5 calendar years.
    Imported,
}

impl EditWindow {
    pub const MANUAL_DAYS: i64 = 30;
    pub const IMPORTED_YEARS: u32 = 5;

    pub fn for_provenance(is_imported: bool) -> Self {
        if is_imported {
            EditWindow::Imported
        } else {
            EditWindow::Manual
        }
    }

    pub fn is_outside(self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            EditWindow::Manual => is_older_than_days(timestamp, Self::MANUAL_DAYS, now),
            EditWindow::Imported => is_older_than_years(timestamp, Self::IMPORTED_YEARS, now),
        }
    }

    /// An entry is outside the window when either of its timestamps is.
    pub fn excludes(self, begin: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.is_outside(begin, now) || self.is_outside(end, now)
    }
}

impl fmt::Display for EditWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditWindow::Manual => write!(f, "{} days", Self::MANUAL_DAYS),
            EditWindow::Imported => write!(f, "{} years", Self::IMPORTED_YEARS),
        }
    }
}
