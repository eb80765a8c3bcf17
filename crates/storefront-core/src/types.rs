//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │    CartLine     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  item_id        │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  user_id        │   │  lines[] ───────┼──┐    │
//! │  │  discount %     │   │  quantity       │   │  totals (cents) │  │    │
//! │  │  stock >= 0     │   └─────────────────┘   │  order_status   │  │    │
//! │  └─────────────────┘                         │  payment_status │  │    │
//! │                                              └─────────────────┘  │    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐  │    │
//! │  │    TaxRate      │   │  OrderStatus    │   │   OrderLine     │◄─┘    │
//! │  │  bps (u32)      │   │  pending        │   │  name snapshot  │       │
//! │  │  1000 = 10%     │   │  processing     │   │  price snapshot │       │
//! │  └─────────────────┘   │  shipped        │   │  discount snap. │       │
//! │                        │  delivered      │   └─────────────────┘       │
//! │                        │  cancelled      │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An `OrderLine` copies the item's name, price and discount at the moment
//! the order is placed. Later catalog edits never touch historical orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, PriceBreakdown, PriceInput, PricingConfig};
use crate::validation;

/// Generates a fresh UUID v4 string identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Converts a stored discount column into a whole percent.
fn clamp_discount(discount_percent: i64) -> u8 {
    discount_percent.clamp(0, 100) as u8
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percent (10 → 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        TaxRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Applies this rate to an amount, rounding half-up to the cent.
    /// `None` when the result overflows.
    pub fn apply_to(&self, amount: Money) -> Option<Money> {
        amount.apply_rate(*self)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A purchasable product with a price, a discount and a stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    pub description: Option<String>,

    /// Free-form grouping used by the storefront filters.
    pub category: Option<String>,

    /// Price in cents before discount.
    pub price_cents: i64,

    /// Whole percent, 0-100.
    pub discount_percent: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// False once the item is soft-deleted.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Builds a new active item from validated input.
    pub fn create(input: NewCatalogItem, now: DateTime<Utc>) -> CoreResult<Self> {
        input.validate()?;

        Ok(CatalogItem {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category.filter(|c| !c.trim().is_empty()),
            price_cents: input.price_cents,
            discount_percent: i64::from(input.discount_percent),
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn discount(&self) -> u8 {
        clamp_discount(self.discount_percent)
    }

    /// Fails with `InsufficientStock` naming this item when `quantity`
    /// exceeds the current stock.
    pub fn ensure_available(&self, quantity: i64) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::ItemNotFound(self.id.clone()));
        }
        if self.stock < quantity {
            return Err(CoreError::insufficient_stock(&self.name, self.stock, quantity));
        }
        Ok(())
    }

    /// Applies a partial admin edit.
    pub fn apply_update(&mut self, update: CatalogItemUpdate, now: DateTime<Utc>) -> CoreResult<()> {
        update.validate()?;

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(category) = update.category {
            self.category = Some(category).filter(|c| !c.trim().is_empty());
        }
        if let Some(price_cents) = update.price_cents {
            self.price_cents = price_cents;
        }
        if let Some(discount) = update.discount_percent {
            self.discount_percent = i64::from(discount);
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Input for creating a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_percent: u8,
    #[serde(default)]
    pub stock: i64,
}

impl NewCatalogItem {
    pub fn validate(&self) -> CoreResult<()> {
        validation::validate_item_name(&self.name)?;
        if let Some(category) = &self.category {
            validation::validate_category(category)?;
        }
        validation::validate_price_cents(self.price_cents)?;
        validation::validate_discount_percent(self.discount_percent)?;
        validation::validate_stock(self.stock)?;
        Ok(())
    }
}

/// Partial update for a catalog item. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub discount_percent: Option<u8>,
    pub stock: Option<i64>,
}

impl CatalogItemUpdate {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(name) = &self.name {
            validation::validate_item_name(name)?;
        }
        if let Some(category) = &self.category {
            validation::validate_category(category)?;
        }
        if let Some(price) = self.price_cents {
            validation::validate_price_cents(price)?;
        }
        if let Some(discount) = self.discount_percent {
            validation::validate_discount_percent(discount)?;
        }
        if let Some(stock) = self.stock {
            validation::validate_stock(stock)?;
        }
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line in a user's cart. A user has at most one line per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with the item's current catalog values.
///
/// `in_stock` is recomputed on every read, so a stale cart shows which
/// lines can no longer be bought without the cart itself changing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub line_id: String,
    pub item_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub discount_percent: i64,
    pub quantity: i64,
    /// Current stock of the item.
    pub stock: i64,
    pub is_active: bool,
    pub in_stock: bool,
}

impl CartLineView {
    pub fn price_input(&self) -> PriceInput {
        PriceInput::new(
            Money::from_cents(self.unit_price_cents),
            clamp_discount(self.discount_percent),
            self.quantity,
        )
    }
}

/// The cart as shown to its owner: lines plus a pricing preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub lines: Vec<CartLineView>,
    /// Absent for an empty cart.
    pub pricing: Option<PriceBreakdown>,
    /// True when the cart is non-empty and every line can be fulfilled now.
    pub purchasable: bool,
}

impl CartSummary {
    pub fn build(lines: Vec<CartLineView>, config: &PricingConfig) -> CoreResult<Self> {
        if lines.is_empty() {
            return Ok(CartSummary {
                lines,
                pricing: None,
                purchasable: false,
            });
        }

        let inputs: Vec<PriceInput> = lines.iter().map(CartLineView::price_input).collect();
        let pricing = pricing::calculate(&inputs, config)?;
        let purchasable = lines.iter().all(|l| l.in_stock);

        Ok(CartSummary {
            lines,
            pricing: Some(pricing),
            purchasable,
        })
    }
}

// =============================================================================
// Status Enums
// =============================================================================

/// Fulfilment status of an order.
///
/// Any status may follow any other; the admin is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer intends to pay. Recorded only; no gateway is called.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
    CashOnDelivery,
}

// =============================================================================
// Shipping Address
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl ShippingAddress {
    /// Returns a copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        ShippingAddress {
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            zip: self.zip.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze catalog data at time of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: String,
    /// Item name at time of purchase (frozen).
    pub name: String,
    pub quantity: i64,
    /// Unit price in cents at time of purchase (frozen).
    pub unit_price_cents: i64,
    /// Discount at time of purchase (frozen).
    pub discount_percent: i64,
    /// Discounted line total, rounded once.
    pub line_total_cents: i64,
}

impl OrderLine {
    /// Freezes the item's current name, price and discount.
    pub fn snapshot(item: &CatalogItem, quantity: i64) -> CoreResult<Self> {
        let input = PriceInput::new(item.price(), item.discount(), quantity);
        Ok(OrderLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            quantity,
            unit_price_cents: item.price_cents,
            discount_percent: item.discount_percent,
            line_total_cents: pricing::line_total(&input)?.cents(),
        })
    }

    pub fn price_input(&self) -> PriceInput {
        PriceInput::new(
            Money::from_cents(self.unit_price_cents),
            clamp_discount(self.discount_percent),
            self.quantity,
        )
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Totals are computed once, at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds a `pending/pending` order from snapshotted lines and their
    /// price breakdown.
    pub fn new_pending(
        user_id: impl Into<String>,
        lines: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        breakdown: &PriceBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        Order {
            id: new_id(),
            user_id: user_id.into(),
            lines,
            shipping_address,
            payment_method,
            subtotal_cents: breakdown.subtotal.cents(),
            shipping_cents: breakdown.shipping.cents(),
            tax_cents: breakdown.tax.cents(),
            total_cents: breakdown.total.cents(),
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            paid_at: None,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// True when the stored totals add up.
    pub fn totals_consistent(&self) -> bool {
        self.subtotal_cents + self.shipping_cents + self.tax_cents == self.total_cents
    }

    /// Owner or admin may read an order.
    pub fn ensure_visible_to(&self, user_id: &str, role: Role) -> CoreResult<()> {
        if role == Role::Admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!("order {}", self.id)))
        }
    }
}

// =============================================================================
// Order Status Update
// =============================================================================

/// Administrative status change. Each field is independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderStatusUpdate {
    pub fn is_empty(&self) -> bool {
        self.order_status.is_none() && self.payment_status.is_none()
    }

    /// Overwrites the given fields on `order`.
    ///
    /// Moving into `delivered` stamps `delivered_at`; moving into `paid`
    /// stamps `paid_at`. Nothing else happens: no transition rules, and
    /// cancelling does not return stock.
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) {
        if let Some(status) = self.order_status {
            if status == OrderStatus::Delivered && order.order_status != OrderStatus::Delivered {
                order.delivered_at = Some(now);
            }
            order.order_status = status;
        }

        if let Some(status) = self.payment_status {
            if status == PaymentStatus::Paid && order.payment_status != PaymentStatus::Paid {
                order.paid_at = Some(now);
            }
            order.payment_status = status;
        }

        order.updated_at = now;
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Stored lowercased.
    pub email: String,
    pub name: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Normalizes an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
