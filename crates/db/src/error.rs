//! Classification of `sqlx` errors into the domain taxonomy.
//!
//! | Source                                         | Result                          |
//! |------------------------------------------------|---------------------------------|
//! | pool timeout / closed, I/O, TLS                | `Database { transient: true }`  |
//! | SQLSTATE `40001`, `40P01`, `08xxx`, `57P01`    | `Database { transient: true }`  |
//! | SQLSTATE `P0001` (raised by link procedures)   | `Conflict`                      |
//! | SQLSTATE `P0002` (raised by link procedures)   | `Reference`                     |
//! | SQLSTATE `22023` (raised by link procedures)   | `Validation`                    |
//! | anything else                                  | `Database { transient: false }` |

use surat_core::error::CoreError;
use surat_core::types::DbId;

/// Serialization failure under concurrent transactions.
pub const SERIALIZATION_FAILURE: &str = "40001";
pub const DEADLOCK_DETECTED: &str = "40P01";
pub const ADMIN_SHUTDOWN: &str = "57P01";
pub const RAISE_EXCEPTION: &str = "P0001";
pub const NO_DATA_FOUND: &str = "P0002";
pub const INVALID_PARAMETER_VALUE: &str = "22023";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a `sqlx` error onto [`CoreError`].
pub fn classify(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            transient(&err)
        }
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            let message = db_err.message().to_string();
            match code.as_str() {
                SERIALIZATION_FAILURE | DEADLOCK_DETECTED | ADMIN_SHUTDOWN => transient(&err),
                c if c.starts_with("08") => transient(&err),
                RAISE_EXCEPTION => CoreError::Conflict(message),
                NO_DATA_FOUND => parse_reference(&message).unwrap_or_else(|| {
                    tracing::error!(error = %message, "Unparseable reference error from store");
                    CoreError::Database {
                        message,
                        transient: false,
                    }
                }),
                INVALID_PARAMETER_VALUE => CoreError::Validation(message),
                _ => permanent(&err),
            }
        }
        _ => permanent(&err),
    }
}

/// The violated foreign-key constraint, if `err` is one.
pub fn foreign_key_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

fn transient(err: &sqlx::Error) -> CoreError {
    tracing::warn!(error = %err, "Transient database error");
    CoreError::Database {
        message: err.to_string(),
        transient: true,
    }
}

fn permanent(err: &sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Database {
        message: err.to_string(),
        transient: false,
    }
}

/// Parse `"<Entity> not found: <uuid>"` as raised by the link procedures.
fn parse_reference(message: &str) -> Option<CoreError> {
    let (entity, ids) = message.split_once(" not found: ")?;
    let entity = match entity.trim() {
        "Letter" => "Letter",
        "Activity" => "Activity",
        "User" => "User",
        _ => return None,
    };
    let ids = ids
        .split(',')
        .map(|s| s.trim().parse::<DbId>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    Some(CoreError::Reference { entity, ids })
}
