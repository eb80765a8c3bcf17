//! # storefront-core: Pure Business Logic for the Storefront
//!
//! Everything that decides *what* an order costs and *what* an order looks
//! like lives here, as plain functions over plain data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 React SPA (admin + storefront)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-api (axum handlers)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storefront-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Order    │  │   Money   │  │ subtotal  │  │   rules   │  │   │
//! │  │   │  CartLine │  │  TaxRate  │  │ ship, tax │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-db (SQLite + checkout)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point)
//! - [`pricing`] - Subtotal, shipping tier, tax and total for a set of lines
//! - [`types`] - Domain types (CatalogItem, CartLine, Order, statuses)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::pricing::{calculate, PriceInput, PricingConfig};
//!
//! let lines = [PriceInput::new(Money::from_cents(10_000), 10, 2)];
//! let quote = calculate(&lines, &PricingConfig::default()).unwrap();
//!
//! assert_eq!(quote.subtotal.cents(), 18_000); // $180.00
//! assert_eq!(quote.shipping.cents(), 0);      // over the $50 threshold
//! assert_eq!(quote.tax.cents(), 1_800);       // 10%
//! assert_eq!(quote.total.cents(), 19_800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{PriceBreakdown, PriceInput, PricingConfig};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct lines a single cart may hold.
pub const MAX_CART_LINES: usize = 100;

/// Highest unit price a catalog item may carry ($1,000,000.00).
///
/// With `MAX_ITEM_QUANTITY` and `MAX_CART_LINES` this keeps every order
/// amount far inside `i64` cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Maximum quantity of a single item in a cart line.
///
/// Guards against typos like 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;
