//! Core domain types and configuration for carlot.
//!
//! This crate holds everything the other crates agree on:
//! - the vehicle record as stored in inventory,
//! - the filter mapping accumulated over a search conversation,
//! - application configuration with file/env layering.
//!
//! It deliberately has no async runtime or I/O dependencies; the db and
//! agent crates bring their own.

pub mod config;
pub mod domain;

pub use domain::filters::{FilterMap, FilterValue, RECOGNIZED_FILTER_KEYS};
pub use domain::vehicle::Vehicle;
