//! Authorization for timesheets.
//!
//! Decides whether a resolved user may view a timesheet or edit/delete one
//! of its entries. Inputs:
//! - ownership (user key equality)
//! - administrator status
//! - team coordination (one hop: coordinator of a team the owner is a member of)
//! - the entry's edit window (30 days manual, 5 years imported)
//!
//! Approval gates use of the system as a whole and is checked before the rest.

mod approval;
mod decision;
mod directory;
mod policy;
mod window;

pub use approval::ApprovalConfig;
pub use decision::{Decision, DenialReason, EntryAction};
pub use directory::{IdentityDirectory, TeamDirectory};
pub use policy::PermissionPolicy;
pub use window::{is_older_than_days, is_older_than_years, Clock, EditWindow, FixedClock, SystemClock};
