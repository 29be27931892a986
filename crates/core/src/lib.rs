//! Domain core for letter dispositions.
//!
//! This crate has no I/O of its own. It defines the identifiers, error
//! taxonomy, roles, authorization predicates, Disposition domain types and
//! the async port traits that the persistence and notification layers
//! implement.

pub mod authorization;
pub mod disposition;
pub mod error;
pub mod hashing;
pub mod notifications;
pub mod ports;
pub mod retry;
pub mod roles;
pub mod storage;
pub mod types;
