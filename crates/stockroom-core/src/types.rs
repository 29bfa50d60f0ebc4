//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Article      │◄──│   Allocation    │──►│    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  service_id     │   │  article        │   │  status         │       │
//! │  │  id / code      │   │  curs, price    │   │  discount       │       │
//! │  │  kg (remaining) │   │  weight         │   │  derived prices │       │
//! │  │  income_kg      │   │  sum_euro/_rub  │   │  weight         │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ 0..1 order      │
//! │                        ┌─────────────────┐   ┌────────▼────────┐       │
//! │                        │    Payment      │──►│     Order       │       │
//! │                        │  ─────────────  │   │  ─────────────  │       │
//! │                        │  method, amount │   │  status         │       │
//! │                        │  paid_at        │   │  shipment       │       │
//! │                        └─────────────────┘   │  quantity, debt │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Input vs Stored Types
//! `*Input` types are what callers send: raw status codes and tolerant
//! numbers (string or number). Stored types carry validated enums and
//! derived figures, and are what every read returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::numeric::{flexible_f64, flexible_i64};

// =============================================================================
// Product Status
// =============================================================================

/// Sale state of a product.
///
/// Serialized as its numeric code, the same form callers send.
///
/// ```text
///  AVAILABLE(1) ──attach to order──► RESERVED(2) ──order shipped──► SOLD(3)
///       ▲                                │
///       └──────────detach / order deleted┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
#[ts(export, type = "number")]
#[serde(into = "i64", try_from = "i64")]
pub enum ProductStatus {
    /// On sale, not linked to any order.
    Available = 1,
    /// Held by an order that has not shipped.
    Reserved = 2,
    /// Shipped to the customer.
    Sold = 3,
}

impl ProductStatus {
    /// Numeric code as stored and as sent by callers.
    #[inline]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl From<ProductStatus> for i64 {
    fn from(status: ProductStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for ProductStatus {
    type Error = ValidationError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ProductStatus::Available),
            2 => Ok(ProductStatus::Reserved),
            3 => Ok(ProductStatus::Sold),
            _ => Err(ValidationError::OutOfRange {
                field: "status".to_string(),
                min: 1,
                max: 3,
            }),
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment state of an order: `NEW(0) → READY_TO_SHIP(1) → SHIPPED(2)`.
///
/// Callers may set any of the three values; only entering `Shipped` has a
/// side effect on products. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
#[ts(export, type = "number")]
#[serde(into = "i64", try_from = "i64")]
pub enum OrderStatus {
    New = 0,
    ReadyToShip = 1,
    Shipped = 2,
}

impl OrderStatus {
    /// Numeric code as stored and as sent by callers.
    #[inline]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::New
    }
}

impl From<OrderStatus> for i64 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for OrderStatus {
    type Error = ValidationError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OrderStatus::New),
            1 => Ok(OrderStatus::ReadyToShip),
            2 => Ok(OrderStatus::Shipped),
            _ => Err(ValidationError::OutOfRange {
                field: "status".to_string(),
                min: 0,
                max: 2,
            }),
        }
    }
}

// =============================================================================
// Article
// =============================================================================

/// A stock-keeping unit of raw goods tracked by weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Article {
    /// Surrogate key; allocations reference this.
    pub service_id: i64,
    /// Business id from the supplier sheet (may repeat across variants).
    pub id: i64,
    pub no: String,
    pub code: String,
    pub description: String,
    /// Unit price in euro.
    pub euro: f64,
    pub colli: f64,
    /// Remaining stock in kg. Only the ledger mutates this.
    pub kg: f64,
    /// Stock as registered or imported, in kg.
    pub income_kg: f64,
    pub value: f64,
}

/// Manual article entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleInput {
    #[serde(with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub id: i64,
    #[serde(default)]
    pub no: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub euro: f64,
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub colli: f64,
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub kg: f64,
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub value: f64,
}

// =============================================================================
// Allocation
// =============================================================================

/// A portion of one article assigned into a product, as sent by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AllocationInput {
    /// Article `service_id`.
    #[serde(with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub article: i64,
    /// Euro → rouble exchange rate.
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub curs: f64,
    /// Price per kg in euro.
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub price_euro: f64,
    /// Weight taken from the article, in kg.
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub weight: f64,
    /// Piece count (informational).
    #[serde(default, with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub count: i64,
}

/// A stored allocation with its computed sub-totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Allocation {
    pub id: i64,
    pub product_id: i64,
    pub article: i64,
    pub curs: f64,
    pub price_euro: f64,
    pub weight: f64,
    pub count: i64,
    /// `price_euro × weight`, in euro.
    pub sum_euro: Money,
    /// `sum_euro × curs`, in roubles.
    pub sum_rub: Money,
}

// =============================================================================
// Product
// =============================================================================

/// Product create/update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductInput {
    /// Raw status code (1, 2 or 3).
    #[serde(with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub status: i64,
    #[serde(default)]
    pub name: String,
    /// Discount in percent, clamped to 0..=100 when pricing.
    #[serde(default, with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub discount_percent: f64,
    #[serde(default, with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub count: i64,
    #[serde(default)]
    pub video: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allocations: Vec<AllocationInput>,
}

/// A sellable lot composed of allocations.
///
/// Every money and weight figure here is derived from `allocations`; the
/// composer recomputes them on each write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub status: ProductStatus,
    pub name: String,
    /// Σ allocation weight, in kg.
    pub weight: f64,
    pub discount_percent: f64,
    /// Σ allocation `sum_rub`.
    pub total_price: Money,
    /// `total_price` after discount; this is what an order owes.
    pub discounted_price: Money,
    /// `discounted_price / weight`.
    pub unit_price: Money,
    pub count: i64,
    pub video: String,
    pub description: String,
    pub allocations: Vec<Allocation>,
}

// =============================================================================
// Order
// =============================================================================

/// Shipment metadata carried by an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ShipmentDetails {
    pub ship_date: String,
    pub city: String,
    pub full_name: String,
    pub phone: String,
    pub passport_inn: String,
    /// Transport company.
    pub carrier: String,
    #[serde(with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub places: i64,
    /// Carrier charge; informational, not part of the debt.
    #[serde(with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub price: f64,
    #[serde(with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub weight: f64,
}

/// Order create/update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Raw status code (0, 1 or 2).
    #[serde(default, with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub status: i64,
    #[serde(default)]
    pub shipment: ShipmentDetails,
    #[serde(default)]
    pub product_ids: Vec<i64>,
    #[serde(default)]
    pub payments: Vec<PaymentInput>,
}

/// A customer order with its products and payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: OrderStatus,
    pub shipment: ShipmentDetails,
    /// Number of linked products.
    pub quantity: i64,
    /// Σ product `discounted_price` − Σ payment `amount`.
    pub debt: Money,
    pub products: Vec<Product>,
    pub payments: Vec<Payment>,
}

// =============================================================================
// Payment
// =============================================================================

/// Payment request, standalone or embedded in an order request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentInput {
    /// Existing payment id when reconciling an order; `0` for new.
    #[serde(default, with = "flexible_i64")]
    #[ts(type = "number | string")]
    pub id: i64,
    /// Order to charge; ignored for payments embedded in an order request.
    #[serde(default)]
    pub order_id: Option<i64>,
    /// Payment date; blank means now. Ignored for embedded payments.
    #[serde(default)]
    pub date: String,
    pub method: String,
    #[serde(with = "flexible_f64")]
    #[ts(type = "number | string")]
    pub amount: f64,
    #[serde(default)]
    pub comment: String,
}

/// A payment ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: i64,
    pub order_id: Option<i64>,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub method: String,
    pub amount: Money,
    pub comment: String,
}

/// An entry of the payment-method registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub id: i64,
    pub method: String,
}

/// Filter for listing payments. Blank fields do not filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PaymentFilter {
    pub method: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

// =============================================================================
// Clients
// =============================================================================

/// Client create/update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ClientInput {
    pub city: String,
    /// Required.
    pub full_name: String,
    pub phone: String,
    pub passport_number: String,
    /// Preferred transport company.
    pub carrier: String,
    pub comment: String,
}

/// A customer card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Client {
    pub id: i64,
    pub city: String,
    pub full_name: String,
    pub phone: String,
    pub passport_number: String,
    pub carrier: String,
    pub comment: String,
}

// =============================================================================
// Shipments
// =============================================================================

/// A dispatch journal entry, independent of orders.
///
/// Requests carry the same fields as an order's [`ShipmentDetails`];
/// `ship_date` and `full_name` are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Shipment {
    pub id: i64,
    #[serde(flatten)]
    pub details: ShipmentDetails,
}

/// Shipment note request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ShipmentNoteInput {
    pub ship_date: String,
    pub note: String,
}

/// A free-text note attached to a shipping day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShipmentNote {
    pub id: i64,
    pub ship_date: String,
    pub note: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
