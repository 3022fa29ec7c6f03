//! Crate-level scenario tests exercising whole flows across modules.
//! Single-module behavior is covered by the unit tests next to each module.


mod round_trip;
mod validate_repair;
