//! # Domain Models
//!
//! Plain data shared by the stash crates, with `serde` as the only dependency.
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod config;
pub mod constants;
