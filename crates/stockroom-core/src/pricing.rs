//! # Product Pricing
//!
//! Derives every computed figure of a product from its allocations.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per allocation                                                         │
//! │    sum_euro = price_euro × weight                     (rounded to 0.01) │
//! │    sum_rub  = price_euro × weight × curs              (rounded to 0.01) │
//! │                                                                         │
//! │  per product                                                            │
//! │    total_price      = Σ sum_rub                                         │
//! │    discounted_price = total_price × (1 − clamp(discount, 0, 100)/100)   │
//! │    weight           = Σ weight                                          │
//! │    unit_price       = discounted_price / weight      (0 when weight 0)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The result depends only on the allocation list and the discount, so
//! recomputing from the same inputs always yields the same figures.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::money::{clamp_discount, Money};
use crate::numeric::round2;
use crate::types::{Allocation, AllocationInput};

/// Computed sub-totals of one allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationTotals {
    pub sum_euro: Money,
    pub sum_rub: Money,
}

/// Computed fields of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFields {
    /// Sub-totals, in the order of the input allocations.
    pub allocations: Vec<AllocationTotals>,
    /// Σ allocation weight, rounded to 0.01 kg.
    pub weight: f64,
    /// Discount actually applied, after clamping.
    pub discount_percent: f64,
    pub total_price: Money,
    pub discounted_price: Money,
    pub unit_price: Money,
}

/// Computes the euro and rouble sub-totals of a single allocation.
///
/// ## Example
/// ```rust
/// use stockroom_core::pricing::allocation_totals;
/// use stockroom_core::AllocationInput;
///
/// let a = AllocationInput { article: 1, curs: 100.0, price_euro: 4.5, weight: 2.0, count: 0 };
/// let totals = allocation_totals(&a);
/// assert_eq!(totals.sum_euro.to_string(), "9.00");
/// assert_eq!(totals.sum_rub.to_string(), "900.00");
/// ```
pub fn allocation_totals(allocation: &AllocationInput) -> AllocationTotals {
    let sum_euro = allocation.price_euro * allocation.weight;
    AllocationTotals {
        sum_euro: Money::from_amount(sum_euro),
        sum_rub: Money::from_amount(sum_euro * allocation.curs),
    }
}

/// Computes every derived field of a product.
pub fn compute_derived(discount_percent: f64, allocations: &[AllocationInput]) -> DerivedFields {
    let totals: Vec<AllocationTotals> = allocations.iter().map(allocation_totals).collect();

    let total_price: Money = totals.iter().map(|t| t.sum_rub).sum();
    let raw_weight: f64 = allocations.iter().map(|a| a.weight).sum();

    let discount_percent = clamp_discount(discount_percent);
    let discounted_price = total_price.apply_percentage_discount(discount_percent);
    let unit_price = discounted_price.per(raw_weight);

    DerivedFields {
        allocations: totals,
        weight: round2(raw_weight),
        discount_percent,
        total_price,
        discounted_price,
        unit_price,
    }
}

/// Sums requested weight per article `service_id`.
///
/// Zero weights are dropped. The map is ordered so rows are always locked in
/// ascending key order.
pub fn requested_weights<I>(allocations: I) -> BTreeMap<i64, f64>
where
    I: IntoIterator<Item = (i64, f64)>,
{
    let mut weights: BTreeMap<i64, f64> = BTreeMap::new();
    for (article, weight) in allocations {
        if article <= 0 || weight == 0.0 {
            continue;
        }
        *weights.entry(article).or_insert(0.0) += weight;
    }
    weights
}

impl From<&Allocation> for AllocationInput {
    fn from(a: &Allocation) -> Self {
        AllocationInput {
            article: a.article,
            curs: a.curs,
            price_euro: a.price_euro,
            weight: a.weight,
            count: a.count,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
