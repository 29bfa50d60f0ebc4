//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! Everything that decides a number lives here: how raw numeric input is
//! read, what a product costs, how much an order still owes, and how much of
//! an article is still free. None of it touches the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Request layer (HTTP / CLI)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               stockroom-db (transactions, SQL)                  │   │
//! │  │   ledger ─► products ─► orders ─► payments ─► balance          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │ numeric │ │ pricing │ │  debt   │ │ balance │ │validate │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`numeric`] - Locale-flexible number parsing and tolerant serde helpers
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Domain types (Article, Product, Order, Payment, ...)
//! - [`pricing`] - Derived product fields from allocations
//! - [`debt`] - Order debt and product status targeting
//! - [`balance`] - Per-article stock snapshot math
//! - [`payment_time`] - Payment date parsing and filter bounds
//! - [`validation`] - Input and selection rules
//! - [`naming`] - Generated lot names
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::numeric::normalize;
//! use stockroom_core::money::Money;
//!
//! assert_eq!(normalize("1 234,56"), "1234.56");
//!
//! let price = Money::from_amount(419.57);
//! assert_eq!(price.to_string(), "419.57");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod debt;
pub mod error;
pub mod money;
pub mod naming;
pub mod numeric;
pub mod payment_time;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tolerance used when comparing stock weights.
///
/// Weights travel through `f64` arithmetic; a reservation that matches the
/// remaining stock exactly must not fail on the last binary digit.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Upper bound of a product discount, in percent.
pub const MAX_DISCOUNT_PERCENT: f64 = 100.0;
