//! Domain-level error types.

use std::fmt::Display;

use thiserror::Error;

/// Domain errors - business logic failures.
///
/// Form problems are not errors; they are reported back on the form.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing, or hidden from the viewer, which looks the same.
    #[error("Entity not found: {entity_type} {key}")]
    NotFound {
        entity_type: &'static str,
        key: String,
    },
}

impl DomainError {
    /// Not-found error for an entity identified by `key` (id, slug or username).
    pub fn not_found(entity_type: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity_type,
            key: key.to_string(),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}
