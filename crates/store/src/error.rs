//! sqlx → domain error mapping.
//!
//! | Postgres code | Meaning                    | DomainError |
//! |---------------|----------------------------|-------------|
//! | `23505`       | unique violation           | `Conflict`  |
//! | `23503`       | foreign key violation      | `NotFound`  |
//! | `23514`       | check constraint violation | `Validation`|
//! | anything else | infrastructure failure     | `Storage`   |
//!
//! The unique/check mappings make the schema the concurrency backstop: a
//! duplicate insert racing past the application-level pre-check still
//! surfaces to the caller as a conflict, and a quantity underflow racing a
//! concurrent write surfaces as a validation failure.

use stockdesk_core::DomainError;

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                return DomainError::conflict(format!(
                    "unique key violated ({})",
                    db.constraint().unwrap_or("unknown constraint")
                ));
            }
            Some("23503") => {
                return DomainError::not_found(format!(
                    "referenced record ({})",
                    db.constraint().unwrap_or("unknown constraint")
                ));
            }
            Some("23514") => {
                return DomainError::validation(format!(
                    "constraint violated ({})",
                    db.constraint().unwrap_or("unknown constraint")
                ));
            }
            _ => {}
        }
    }
    tracing::error!(operation, error = %err, "database operation failed");
    DomainError::storage(format!("{operation}: {err}"))
}
