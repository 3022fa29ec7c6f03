//! Shared error type and calendar-data constants for the tsubame workspace.

pub mod constants;
pub mod error;
