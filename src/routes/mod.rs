pub mod categories;
pub mod health;
pub mod teams;
pub mod timesheets;
