use std::fmt;

use super::window::EditWindow;

/// Mutating actions on a timesheet entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Edit,
    Delete,
}

impl EntryAction {
    pub fn verb(self) -> &'static str {
        match self {
            EntryAction::Edit => "edit",
            EntryAction::Delete => "delete",
        }
    }
}

impl fmt::Display for EntryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Why a request was refused. `Display` is the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    UserDoesNotExist,
    NotApproved,
    CannotViewTimesheet,
    EntryTooOld { action: EntryAction, window: EditWindow },
    NotAdministrator { action: EntryAction },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::UserDoesNotExist => f.write_str("User does not exist."),
            DenialReason::NotApproved => f.write_str("User is not approved."),
            DenialReason::CannotViewTimesheet => f.write_str("You are not allowed to see this timesheet."),
            DenialReason::EntryTooOld { action, window: EditWindow::Manual } => {
                write!(f, "You can not {action} an entry that is older than {}.", EditWindow::Manual)
            }
            DenialReason::EntryTooOld { action, window: EditWindow::Imported } => {
                write!(f, "You can not {action} an imported entry that is older than {}.", EditWindow::Imported)
            }
            DenialReason::NotAdministrator { .. } => f.write_str("You are not an administrator."),
        }
    }
}

/// Outcome of an entry access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allowed => f.write_str("allowed"),
            Decision::Denied(reason) => write!(f, "denied: {reason}"),
        }
    }
}
