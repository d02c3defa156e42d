//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// visibility, ordering races). Storage failures belong to the infrastructure layer,
/// which wraps this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A referenced catalog entity or city does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The city is missing or deactivated.
    #[error("invalid city: {0}")]
    InvalidCity(String),

    /// The entity exists but is not visible in the city being operated on.
    #[error("not assigned: {0}")]
    NotAssigned(String),

    /// A reorder request was not a permutation of every category.
    #[error("incomplete order: {0}")]
    IncompleteOrder(String),

    /// The category order changed underneath the caller; re-read and resubmit.
    #[error("order conflict (expected version {expected}, actual {actual})")]
    OrderConflict { expected: u64, actual: u64 },

    /// Import source and target are the same city.
    #[error("source and target city are the same")]
    SameCity,

    /// Missing or malformed fields on create/update.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl CatalogError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_city(msg: impl Into<String>) -> Self {
        Self::InvalidCity(msg.into())
    }

    pub fn not_assigned(msg: impl Into<String>) -> Self {
        Self::NotAssigned(msg.into())
    }

    pub fn incomplete_order(msg: impl Into<String>) -> Self {
        Self::IncompleteOrder(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code (used in API error bodies and logs).
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "not_found",
            CatalogError::InvalidCity(_) => "invalid_city",
            CatalogError::NotAssigned(_) => "not_assigned",
            CatalogError::IncompleteOrder(_) => "incomplete_order",
            CatalogError::OrderConflict { .. } => "order_conflict",
            CatalogError::SameCity => "same_city",
            CatalogError::Validation(_) => "validation_error",
        }
    }
}
