//! Core calendar-data models (RFC 5545).
//!
//! These types are designed for:
//! - Round-trip fidelity: unknown properties and parameters are preserved
//! - Mutation-aware caching: serialization memos dropped on every change
//! - Type safety: a closed tagged union per RFC 5545 value type

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod rrule;
mod value;

pub use component::{Calendar, Component, ComponentKind};
pub use datetime::{CalDateTime, Date, DateTime, DateTimeForm, Time, UtcOffset};
pub use duration::Duration;
pub use parameter::Parameter;
pub use property::Property;
pub use rrule::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};
pub use value::{Period, Value};
