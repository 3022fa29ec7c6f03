//! Recurrence expansion, derivation, truncation, and series splitting.

mod derive;
mod instance;
mod split;
pub mod timezone;
mod truncate;
pub mod vtimezone;

pub use instance::{Instance, InstanceSet, MAX_INSTANCES};
pub use timezone::TzResolver;

pub(crate) use instance::{list_utc, master_rids, rule_rids};
