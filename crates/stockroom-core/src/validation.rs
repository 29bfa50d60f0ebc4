//! # Validation Module
//!
//! Input and selection rules, checked before any row is written.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde + numeric::flexible_*)                │
//! │  └── Strings or numbers → typed values                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── validate_product / validate_order / validate_payment             │
//! │  ├── validate_client / validate_shipment / validate_shipment_note     │
//! │  └── check_selection (needs product snapshots from the database)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on status codes and amounts                     │
//! │  ├── UNIQUE order_products(product_id)                                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    ArticleInput, ClientInput, OrderInput, OrderStatus, PaymentInput, ProductInput, ProductStatus,
    ShipmentDetails, ShipmentNoteInput,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a product or order name.
pub const MAX_NAME_LENGTH: usize = 200;

// =============================================================================
// Articles
// =============================================================================

/// Validates an article registration: positive external id, finite
/// non-negative figures.
pub fn validate_article(input: &ArticleInput) -> ValidationResult<()> {
    if input.id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "id".to_string(),
        });
    }
    for (field, value) in [
        ("euro", input.euro),
        ("colli", input.colli),
        ("kg", input.kg),
        ("value", input.value),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ValidationError::MustNotBeNegative {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Products
// =============================================================================

/// Validates a product request and returns its status.
///
/// ## Rules
/// - status is 1, 2 or 3
/// - name is at most 200 characters
/// - every allocation references a positive article key
/// - every allocation weight is > 0, count / price / rate are not negative
///
/// The first violation is returned.
pub fn validate_product(input: &ProductInput) -> ValidationResult<ProductStatus> {
    let status = ProductStatus::try_from(input.status)?;
    validate_name(&input.name)?;

    for (i, allocation) in input.allocations.iter().enumerate() {
        let field = |name: &str| format!("allocations[{}].{}", i, name);

        if allocation.article <= 0 {
            return Err(ValidationError::MustBePositive {
                field: field("article"),
            });
        }
        if !(allocation.weight.is_finite() && allocation.weight > 0.0) {
            return Err(ValidationError::MustBePositive {
                field: field("weight"),
            });
        }
        if allocation.count < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: field("count"),
            });
        }
        if !(allocation.price_euro.is_finite() && allocation.price_euro >= 0.0) {
            return Err(ValidationError::MustNotBeNegative {
                field: field("priceEuro"),
            });
        }
        if !(allocation.curs.is_finite() && allocation.curs >= 0.0) {
            return Err(ValidationError::MustNotBeNegative {
                field: field("curs"),
            });
        }
    }

    Ok(status)
}

fn validate_name(name: &str) -> ValidationResult<()> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

// =============================================================================
// Orders
// =============================================================================

/// Validates the static parts of an order request: status, name and
/// product id hygiene. Payments are checked by [`validate_payment`].
///
/// ## Returns
/// The order status and the product ids in request order.
pub fn validate_order(input: &OrderInput) -> ValidationResult<(OrderStatus, Vec<i64>)> {
    let status = OrderStatus::try_from(input.status)?;
    validate_name(&input.name)?;
    let product_ids = collect_product_ids(&input.product_ids)?;
    Ok((status, product_ids))
}

/// Rejects non-positive and duplicated product ids.
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::collect_product_ids;
///
/// assert_eq!(collect_product_ids(&[3, 1]).unwrap(), vec![3, 1]);
/// assert!(collect_product_ids(&[3, 3]).is_err());
/// assert!(collect_product_ids(&[0]).is_err());
/// ```
pub fn collect_product_ids(ids: &[i64]) -> ValidationResult<Vec<i64>> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut out = Vec::with_capacity(ids.len());

    for &id in ids {
        if id <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "productIds".to_string(),
            });
        }
        if !seen.insert(id) {
            return Err(ValidationError::Duplicate {
                field: "productIds".to_string(),
                value: id.to_string(),
            });
        }
        out.push(id);
    }

    Ok(out)
}

// =============================================================================
// Payments
// =============================================================================

/// Validates a payment request against the payment-method registry.
///
/// ## Returns
/// The amount as [`Money`], guaranteed positive.
pub fn validate_payment(payment: &PaymentInput, registry: &[String]) -> ValidationResult<Money> {
    let method = payment.method.trim();
    if method.is_empty() {
        return Err(ValidationError::Required {
            field: "method".to_string(),
        });
    }
    if !registry.iter().any(|m| m == method) {
        return Err(ValidationError::NotAllowed {
            field: "method".to_string(),
            allowed: registry.to_vec(),
        });
    }

    let amount = Money::from_amount(payment.amount);
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(amount)
}

// =============================================================================
// Clients & Shipments
// =============================================================================

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// A client needs a full name.
pub fn validate_client(input: &ClientInput) -> ValidationResult<()> {
    require("fullName", &input.full_name)
}

/// A shipment needs a date and a recipient; counts and figures must not be
/// negative.
pub fn validate_shipment(input: &ShipmentDetails) -> ValidationResult<()> {
    require("shipDate", &input.ship_date)?;
    require("fullName", &input.full_name)?;

    if input.places < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "places".to_string(),
        });
    }
    for (field, value) in [("price", input.price), ("weight", input.weight)] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ValidationError::MustNotBeNegative {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_shipment_note(input: &ShipmentNoteInput) -> ValidationResult<()> {
    require("shipDate", &input.ship_date)?;
    require("note", &input.note)
}

// =============================================================================
// Order Product Selection
// =============================================================================

/// What the selection check needs to know about one candidate product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductLink {
    pub product_id: i64,
    pub status: ProductStatus,
    /// Order currently holding the product, if any.
    pub linked_order: Option<i64>,
}

/// Checks that every candidate product may belong to `order_id`.
///
/// ## Rules
/// ```text
/// already linked to this order?
///   ├── yes: SOLD → ProductUnavailable, otherwise fine
///   └── no:  linked to another order → ProductConflict
///            not AVAILABLE           → ProductUnavailable
/// ```
/// Use `order_id = 0` and an empty `already_linked` set for a new order.
pub fn check_selection(
    order_id: i64,
    candidates: &[ProductLink],
    already_linked: &HashSet<i64>,
) -> CoreResult<()> {
    for candidate in candidates {
        if already_linked.contains(&candidate.product_id) {
            if candidate.status == ProductStatus::Sold {
                return Err(CoreError::ProductUnavailable {
                    product: candidate.product_id,
                    reason: "already sold and cannot remain in the order".to_string(),
                });
            }
            continue;
        }

        if let Some(other) = candidate.linked_order.filter(|&o| o != order_id) {
            return Err(CoreError::ProductConflict {
                product: candidate.product_id,
                order: other,
            });
        }

        if candidate.status != ProductStatus::Available {
            return Err(CoreError::ProductUnavailable {
                product: candidate.product_id,
                reason: "not available for adding to an order".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AllocationInput;

    fn product_input(status: i64, allocations: Vec<AllocationInput>) -> ProductInput {
        ProductInput {
            status,
            name: "Lot".to_string(),
            allocations,
            ..Default::default()
        }
    }

    fn alloc(article: i64, weight: f64) -> AllocationInput {
        AllocationInput {
            article,
            curs: 100.0,
            price_euro: 1.0,
            weight,
            count: 0,
        }
    }

    #[test]
    fn test_validate_article() {
        let mut input = ArticleInput {
            id: 100,
            kg: 12.5,
            ..Default::default()
        };
        assert!(validate_article(&input).is_ok());

        input.kg = -1.0;
        assert_eq!(
            validate_article(&input).unwrap_err().to_string(),
            "kg must not be negative"
        );

        input.kg = 1.0;
        input.id = 0;
        assert!(validate_article(&input).is_err());
    }

    #[test]
    fn test_validate_product_ok() {
        let status = validate_product(&product_input(1, vec![alloc(1, 2.0)])).unwrap();
        assert_eq!(status, ProductStatus::Available);
    }

    #[test]
    fn test_validate_product_status_range() {
        assert!(matches!(
            validate_product(&product_input(0, vec![])),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_product(&product_input(4, vec![])).is_err());
    }

    #[test]
    fn test_validate_product_first_violation() {
        let err = validate_product(&product_input(1, vec![alloc(1, 1.0), alloc(0, 1.0)])).unwrap_err();
        assert_eq!(err.to_string(), "allocations[1].article must be positive");

        let err = validate_product(&product_input(1, vec![alloc(1, 0.0)])).unwrap_err();
        assert_eq!(err.to_string(), "allocations[0].weight must be positive");

        let mut negative_count = alloc(1, 1.0);
        negative_count.count = -1;
        let err = validate_product(&product_input(1, vec![negative_count])).unwrap_err();
        assert_eq!(err.to_string(), "allocations[0].count must not be negative");
    }

    #[test]
    fn test_validate_order() {
        let input = OrderInput {
            status: 2,
            product_ids: vec![6001, 6002],
            ..Default::default()
        };
        let (status, ids) = validate_order(&input).unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert_eq!(ids, vec![6001, 6002]);

        let bad = OrderInput {
            status: 5,
            ..Default::default()
        };
        assert!(validate_order(&bad).is_err());

        let empty = OrderInput::default();
        assert!(validate_order(&empty).unwrap().1.is_empty());
    }

    #[test]
    fn test_validate_payment() {
        let registry = vec!["нал".to_string(), "втб".to_string()];
        let mut payment = PaymentInput {
            method: "нал".to_string(),
            amount: 10000.0,
            ..Default::default()
        };
        assert_eq!(validate_payment(&payment, &registry).unwrap().cents(), 1_000_000);

        payment.amount = 0.0;
        assert!(matches!(
            validate_payment(&payment, &registry),
            Err(ValidationError::MustBePositive { .. })
        ));

        payment.amount = 1.0;
        payment.method = "crypto".to_string();
        assert!(matches!(
            validate_payment(&payment, &registry),
            Err(ValidationError::NotAllowed { .. })
        ));

        payment.method = "  ".to_string();
        assert!(matches!(
            validate_payment(&payment, &registry),
            Err(ValidationError::Required { .. })
        ));
    }

    fn link(product_id: i64, status: ProductStatus, linked_order: Option<i64>) -> ProductLink {
        ProductLink {
            product_id,
            status,
            linked_order,
        }
    }

    #[test]
    fn test_validate_client() {
        let mut input = ClientInput {
            full_name: "Ivanov I.".to_string(),
            ..Default::default()
        };
        assert!(validate_client(&input).is_ok());

        input.full_name = "   ".to_string();
        assert!(matches!(
            validate_client(&input),
            Err(ValidationError::Required { field }) if field == "fullName"
        ));
    }

    #[test]
    fn test_validate_shipment() {
        let mut input = ShipmentDetails {
            ship_date: "2024-03-01".to_string(),
            full_name: "Petrov".to_string(),
            places: 3,
            weight: 41.5,
            ..Default::default()
        };
        assert!(validate_shipment(&input).is_ok());

        input.places = -1;
        assert!(matches!(
            validate_shipment(&input),
            Err(ValidationError::MustNotBeNegative { field }) if field == "places"
        ));

        input.places = 0;
        input.ship_date.clear();
        assert!(matches!(
            validate_shipment(&input),
            Err(ValidationError::Required { field }) if field == "shipDate"
        ));
    }

    #[test]
    fn test_validate_shipment_note() {
        let input = ShipmentNoteInput {
            ship_date: "2024-03-01".to_string(),
            note: String::new(),
        };
        assert!(matches!(
            validate_shipment_note(&input),
            Err(ValidationError::Required { field }) if field == "note"
        ));
    }

    #[test]
    fn test_selection_new_order() {
        let candidates = [link(1, ProductStatus::Available, None)];
        assert!(check_selection(0, &candidates, &HashSet::new()).is_ok());
    }

    #[test]
    fn test_selection_conflict_with_other_order() {
        let candidates = [link(1, ProductStatus::Reserved, Some(7))];
        let err = check_selection(8, &candidates, &HashSet::new()).unwrap_err();
        assert!(matches!(err, CoreError::ProductConflict { product: 1, order: 7 }));
    }

    #[test]
    fn test_selection_rejects_unavailable() {
        let candidates = [link(1, ProductStatus::Sold, None)];
        let err = check_selection(0, &candidates, &HashSet::new()).unwrap_err();
        assert!(matches!(err, CoreError::ProductUnavailable { product: 1, .. }));
    }

    #[test]
    fn test_selection_already_linked() {
        let linked: HashSet<i64> = [1, 2].into_iter().collect();

        let keep = [link(1, ProductStatus::Reserved, Some(5))];
        assert!(check_selection(5, &keep, &linked).is_ok());

        let sold = [link(2, ProductStatus::Sold, Some(5))];
        assert!(matches!(
            check_selection(5, &sold, &linked),
            Err(CoreError::ProductUnavailable { product: 2, .. })
        ));
    }
}
