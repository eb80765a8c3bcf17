//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core (this file)                                           │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db                                                          │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - CoreError | DbError during order placement     │
//! │                                                                         │
//! │  storefront-api                                                         │
//! │  └── ApiError         - HTTP status + {success:false, message}         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → ApiError → client │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant carries enough context to build the short human-readable
/// message the client sees.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog item does not exist or was soft-deleted.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Cart line does not exist for this user.
    #[error("Cart line not found: {0}")]
    CartLineNotFound(String),

    /// Order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Checkout attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Requested quantity exceeds the current stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: "Dune" x10
    ///      │
    ///      ▼
    /// Place order → stock re-read: 3
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Dune", available: 3, requested: 10 }
    ///      │
    ///      ▼
    /// Client shows: "Insufficient stock for Dune: available 3, requested 10"
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Caller is neither the owner of the resource nor an admin.
    #[error("Not allowed to access {0}")]
    Forbidden(String),

    /// Cart has reached its line limit.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// A request field failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InsufficientStock error.
    pub fn insufficient_stock(item: impl Into<String>, available: i64, requested: i64) -> Self {
        CoreError::InsufficientStock {
            item: item.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single field of a request failed its check.
///
/// Raised before any business logic or persistence runs; the message
/// names the field so the client can highlight it.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} needs at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} allows at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Outside an inclusive numeric range (prices, discounts, quantities).
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Email or id that does not parse.
    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
