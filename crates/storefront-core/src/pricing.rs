//! # Pricing Calculator
//!
//! Turns `(unit price, discount %, quantity)` lines into the four numbers an
//! order stores: subtotal, shipping, tax and total.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line_total = round½↑( unit_price × (100 − discount%) / 100 × qty )     │
//! │  subtotal   = Σ line_total                                              │
//! │  shipping   = 0            if subtotal >  free_shipping_threshold       │
//! │               flat_cost    otherwise   (threshold is EXCLUSIVE)         │
//! │  tax        = round½↑( subtotal × tax_rate )                            │
//! │  total      = subtotal + shipping + tax                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All rounding happens once per produced amount, so `total` is an exact
//! integer sum of the other three.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{div_round_half_up, Money};
use crate::types::TaxRate;
use crate::validation::{validate_discount_percent, validate_price_cents, validate_quantity};

// =============================================================================
// Configuration
// =============================================================================

/// Pricing policy knobs.
///
/// Defaults: free shipping strictly above $50.00, otherwise a flat $5.00,
/// and 10% tax on the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Subtotals strictly greater than this ship for free.
    pub free_shipping_threshold: Money,
    /// Shipping charged at or below the threshold.
    pub flat_shipping_cost: Money,
    /// Tax applied to the subtotal.
    pub tax_rate: TaxRate,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            free_shipping_threshold: Money::from_cents(5_000),
            flat_shipping_cost: Money::from_cents(500),
            tax_rate: TaxRate::from_bps(1_000),
        }
    }
}

impl PricingConfig {
    /// Shipping cost for a given subtotal.
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_threshold {
            Money::zero()
        } else {
            self.flat_shipping_cost
        }
    }
}

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// One line to be priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceInput {
    pub unit_price: Money,
    /// Whole percent, 0-100.
    pub discount_percent: u8,
    pub quantity: i64,
}

impl PriceInput {
    pub fn new(unit_price: Money, discount_percent: u8, quantity: i64) -> Self {
        PriceInput {
            unit_price,
            discount_percent,
            quantity,
        }
    }

    fn validate(&self) -> CoreResult<()> {
        validate_price_cents(self.unit_price.cents())?;
        validate_discount_percent(self.discount_percent)?;
        validate_quantity(self.quantity)?;
        Ok(())
    }
}

/// Result of pricing a set of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    /// Per-line totals, same order as the input.
    pub line_totals: Vec<Money>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

// =============================================================================
// Calculation
// =============================================================================

/// Prices a single line, rounding half-up to the cent.
///
/// Fails with a validation error when the amount does not fit in `i64`
/// cents; inputs that pass `validate_price_cents` and `validate_quantity`
/// never get there.
///
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::pricing::{line_total, PriceInput};
///
/// // $19.99 at 15% off, x3 = $50.9745 → $50.97
/// let input = PriceInput::new(Money::from_cents(1999), 15, 3);
/// assert_eq!(line_total(&input).unwrap().cents(), 5097);
/// ```
pub fn line_total(input: &PriceInput) -> CoreResult<Money> {
    let keep_percent = 100 - i128::from(input.discount_percent.min(100));
    let scaled = i128::from(input.unit_price.cents()) * keep_percent * i128::from(input.quantity);
    let cents = i64::try_from(div_round_half_up(scaled, 100)).map_err(|_| overflow("lineTotal"))?;
    Ok(Money::from_cents(cents))
}

/// Prices a set of lines under the given policy.
///
/// ## Errors
/// `CoreError::Validation` when a line has a price outside
/// `0..=MAX_PRICE_CENTS`, a discount outside 0-100, or a quantity outside
/// `1..=MAX_ITEM_QUANTITY`, or when an amount overflows. No partial result
/// is returned.
pub fn calculate(inputs: &[PriceInput], config: &PricingConfig) -> CoreResult<PriceBreakdown> {
    for input in inputs {
        input.validate()?;
    }

    let line_totals = inputs.iter().map(line_total).collect::<CoreResult<Vec<Money>>>()?;
    let subtotal = line_totals
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(*line))
        .ok_or_else(|| overflow("subtotal"))?;
    let shipping = config.shipping_for(subtotal);
    let tax = subtotal.apply_rate(config.tax_rate).ok_or_else(|| overflow("tax"))?;
    let total = subtotal
        .checked_add(shipping)
        .and_then(|sum| sum.checked_add(tax))
        .ok_or_else(|| overflow("total"))?;

    Ok(PriceBreakdown {
        line_totals,
        subtotal,
        shipping,
        tax,
        total,
    })
}

fn overflow(field: &str) -> CoreError {
    CoreError::Validation(ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

/// Validates a pricing configuration loaded from settings.
pub fn validate_config(config: &PricingConfig) -> CoreResult<()> {
    if config.free_shipping_threshold.is_negative() || config.flat_shipping_cost.is_negative() {
        return Err(CoreError::Validation(ValidationError::OutOfRange {
            field: "shipping".to_string(),
            min: 0,
            max: i64::MAX,
        }));
    }
    crate::validation::validate_tax_rate_bps(config.tax_rate.bps())?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
