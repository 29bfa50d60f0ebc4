//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Ledger / assembly / lookup failures            │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Flat taxonomy the request layer maps on        │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant raised inside a mutating operation aborts its transaction.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad caller input; nothing was mutated.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Reservation asked for more than the article holds.
    ///
    /// ## User Workflow
    /// ```text
    /// Create product (article 7, 12.5 kg)
    ///      │
    ///      ▼
    /// Lock article 7: kg = 10.0
    ///      │
    ///      ▼
    /// InsufficientStock { article: 7, available: 10.0, requested: 12.5 }
    ///      │
    ///      ▼
    /// Transaction rolled back, stock untouched
    /// ```
    #[error("Insufficient stock for article {article}: available {available}, requested {requested}")]
    InsufficientStock {
        article: i64,
        available: f64,
        requested: f64,
    },

    /// The ledger was asked to move stock of an article that has no row.
    #[error("Article not found: {0}")]
    ArticleNotFound(i64),

    /// The product cannot join (or stay in) the order in its current status.
    #[error("Product {product} is unavailable: {reason}")]
    ProductUnavailable { product: i64, reason: String },

    /// The product is already linked to another order.
    #[error("Product {product} is already linked to order {order}")]
    ProductConflict { product: i64, order: i64 },

    /// Every generated product name candidate was already taken.
    #[error("Could not generate a unique product name after {attempts} attempts")]
    NameExhausted { attempts: u32 },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::ArticleNotFound(_) => ErrorKind::ArticleNotFound,
            CoreError::ProductUnavailable { .. } => ErrorKind::ProductUnavailable,
            CoreError::ProductConflict { .. } => ErrorKind::ProductConflict,
            CoreError::NameExhausted { .. } => ErrorKind::Unavailable,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any SQL runs, so the caller can fix the request and retry.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., an unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., the same product twice in one order).
    #[error("{field} '{value}' is duplicated")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Error Kind
// =============================================================================

/// Flat error taxonomy shared by every layer.
///
/// The request layer maps these onto transport responses:
///
/// | Kind                 | HTTP |
/// |----------------------|------|
/// | `Validation`         | 400  |
/// | `NotFound`           | 404  |
/// | `InsufficientStock`  | 409  |
/// | `ArticleNotFound`    | 409  |
/// | `ProductUnavailable` | 409  |
/// | `ProductConflict`    | 409  |
/// | `Internal`           | 500  |
/// | `Unavailable`        | 503  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    ArticleNotFound,
    ProductUnavailable,
    ProductConflict,
    Internal,
    Unavailable,
}

impl ErrorKind {
    /// HTTP status code equivalent.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientStock
            | ErrorKind::ArticleNotFound
            | ErrorKind::ProductUnavailable
            | ErrorKind::ProductConflict => 409,
            ErrorKind::Internal => 500,
            ErrorKind::Unavailable => 503,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
