pub mod category;
pub mod team;
pub mod timesheet;
pub mod user;
