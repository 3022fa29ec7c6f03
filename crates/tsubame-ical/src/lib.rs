//! Calendar-data engine for a CalDAV server.
//!
//! Parses, represents, validates, repairs, normalizes, and expands iCalendar
//! (RFC 5545) object graphs, and resolves the per-user and per-instance
//! overlays needed for shared scheduling. The engine is synchronous and
//! performs no I/O; storage and transport live elsewhere.

pub mod build;
pub mod core;
pub mod error;
pub mod expand;
pub mod normalize;
pub mod parse;
pub mod peruser;
pub mod scheduling;
pub mod validate;

#[cfg(test)]
mod tests;

pub use crate::core::{Calendar, Component, ComponentKind, Property};
pub use crate::error::{IcalError, IcalResult};
