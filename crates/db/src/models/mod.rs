//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus the create DTO used for inserts where the table has
//! one.

pub mod activity;
pub mod disposition;
pub mod history;
pub mod letter;
pub mod notification;
pub mod user;
