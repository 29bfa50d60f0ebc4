//! # Debt Calculator
//!
//! ```text
//! debt = Σ product.discounted_price − Σ payment.amount
//! ```
//!
//! A negative debt means the customer has overpaid. The database layer
//! re-derives this from persisted rows after every change that can move
//! either side of the equation.

use crate::money::Money;
use crate::types::{OrderStatus, Payment, Product, ProductStatus};

/// Order debt from already-loaded products and payments.
pub fn debt(products: &[Product], payments: &[Payment]) -> Money {
    debt_from_amounts(
        products.iter().map(|p| p.discounted_price),
        payments.iter().map(|p| p.amount),
    )
}

/// Order debt from raw amounts.
///
/// ## Example
/// ```rust
/// use stockroom_core::debt::debt_from_amounts;
/// use stockroom_core::Money;
///
/// let prices = [Money::from_amount(41957.0), Money::from_amount(38402.0)];
/// let paid = [Money::from_amount(10000.0)];
/// assert_eq!(debt_from_amounts(prices, paid).to_string(), "70359.00");
/// ```
pub fn debt_from_amounts<P, Q>(product_prices: P, payment_amounts: Q) -> Money
where
    P: IntoIterator<Item = Money>,
    Q: IntoIterator<Item = Money>,
{
    let owed: Money = product_prices.into_iter().sum();
    let paid: Money = payment_amounts.into_iter().sum();
    owed - paid
}

/// Product status implied by the status of the order holding it.
///
/// `Shipped` sells the product, every other order status holds it.
pub const fn target_status(order_status: OrderStatus) -> ProductStatus {
    match order_status {
        OrderStatus::Shipped => ProductStatus::Sold,
        OrderStatus::New | OrderStatus::ReadyToShip => ProductStatus::Reserved,
    }
}

/// True when an order moves into `Shipped` from any other status.
pub fn enters_shipped(old: OrderStatus, new: OrderStatus) -> bool {
    old != OrderStatus::Shipped && new == OrderStatus::Shipped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: i64, price: f64) -> Product {
        Product {
            id,
            status: ProductStatus::Reserved,
            name: String::new(),
            weight: 1.0,
            discount_percent: 0.0,
            total_price: Money::from_amount(price),
            discounted_price: Money::from_amount(price),
            unit_price: Money::from_amount(price),
            count: 0,
            video: String::new(),
            description: String::new(),
            allocations: vec![],
        }
    }

    fn payment(amount: f64) -> Payment {
        Payment {
            id: 1,
            order_id: Some(1),
            paid_at: Utc::now(),
            method: "нал".to_string(),
            amount: Money::from_amount(amount),
            comment: String::new(),
        }
    }

    #[test]
    fn test_debt_two_products_one_payment() {
        let products = [product(1, 41957.0), product(2, 38402.0)];
        let payments = [payment(10000.0)];
        assert_eq!(debt(&products, &payments).to_string(), "70359.00");
    }

    #[test]
    fn test_debt_can_go_negative() {
        let products = [product(1, 100.0)];
        let payments = [payment(60.0), payment(60.0)];
        assert_eq!(debt(&products, &payments).to_string(), "-20.00");
    }

    #[test]
    fn test_debt_empty_order() {
        assert_eq!(debt(&[], &[]), Money::zero());
    }

    #[test]
    fn test_target_status() {
        assert_eq!(target_status(OrderStatus::New), ProductStatus::Reserved);
        assert_eq!(target_status(OrderStatus::ReadyToShip), ProductStatus::Reserved);
        assert_eq!(target_status(OrderStatus::Shipped), ProductStatus::Sold);
    }

    #[test]
    fn test_enters_shipped() {
        assert!(enters_shipped(OrderStatus::ReadyToShip, OrderStatus::Shipped));
        assert!(enters_shipped(OrderStatus::New, OrderStatus::Shipped));
        assert!(!enters_shipped(OrderStatus::Shipped, OrderStatus::Shipped));
        assert!(!enters_shipped(OrderStatus::New, OrderStatus::ReadyToShip));
    }
}
