//! # Cart
//!
//! Cart lines assembled during a sale.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Cart Method            Line Change            │
//! │  ───────────────          ───────────            ───────────            │
//! │                                                                         │
//! │  Scan Product ───────────► add_product() ───────► push / qty += n      │
//! │                                                                         │
//! │  Change Quantity ────────► update_quantity() ───► qty = n (0 removes)  │
//! │                                                                         │
//! │  Line Discount ──────────► set_line_discount() ─► discount = d         │
//! │                                                                         │
//! │  Remove ─────────────────► remove_line() ───────► lines.remove(i)      │
//! │                                                                         │
//! │  Cancel Sale ────────────► clear() ─────────────► lines.clear()        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Discount, Product};
use crate::validation::{validate_discount, validate_price_cents, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A line in the cart.
///
/// ## Design Notes
/// Product data (sku, name, price) is frozen when the line is created, so
/// the cart stays consistent even if the catalog changes mid-sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    /// Product ID (UUID)
    pub product_id: String,

    /// SKU at time of adding (frozen)
    pub sku: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    /// Unit price at time of adding (frozen)
    pub unit_price: Money,

    /// Quantity in cart
    pub quantity: i64,

    /// Discount applied to this line
    pub discount: Discount,

    /// When this line was added to cart
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a new cart line from a product and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price: product.price(),
            quantity,
            discount: Discount::None,
            added_at: Utc::now(),
        }
    }

    /// Gross line total (unit price × quantity).
    pub fn gross_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Discount taken off this line, never more than the line itself.
    ///
    /// - Fixed: value off each unit (value × qty)
    /// - Percent: share of the gross line total
    pub fn discount_amount(&self) -> Money {
        let gross = self.gross_total();
        let discount = match self.discount {
            Discount::None => Money::zero(),
            Discount::Fixed(value) => value.multiply_quantity(self.quantity),
            Discount::Percent(rate) => gross.percent_of(rate),
        };
        discount.clamp_non_negative().min(gross)
    }

    /// Line total after the line discount.
    pub fn net_total(&self) -> Money {
        self.gross_total() - self.discount_amount()
    }
}

/// The cart of the sale being assembled.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is always in 1..=999
/// - At most 100 lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds a product or increases the quantity if already present.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        validate_price_cents(product.price_cents)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Updates the quantity of a line. A quantity of 0 removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(product_id);
        }

        validate_quantity(quantity)?;
        self.line_mut(product_id)?.quantity = quantity;
        Ok(())
    }

    /// Sets the discount of a line.
    pub fn set_line_discount(&mut self, product_id: &str, discount: Discount) -> CoreResult<()> {
        validate_discount("line discount", &discount)?;
        self.line_mut(product_id)?.discount = discount;
        Ok(())
    }

    /// Removes a line by product ID.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Returns the lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the number of unique lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        Cart {
            lines: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Rate;

    pub(crate) fn test_product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            sku: format!("SKU-{}", id),
            barcode: None,
            name: format!("Produto {}", id),
            price_cents,
        }
    }

    #[test]
    fn test_cart_add_product() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 999), 2).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.lines()[0].gross_total().cents(), 1998);
    }

    #[test]
    fn test_cart_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let product = test_product("1", 999);

        cart.add_product(&product, 2).unwrap();
        cart.add_product(&product, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_rejects_negative_price() {
        let mut cart = Cart::new();
        let err = cart.add_product(&test_product("1", -500), 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_quantity_limit() {
        let mut cart = Cart::new();
        let product = test_product("1", 100);

        cart.add_product(&product, 998).unwrap();
        let err = cart.add_product(&product, 2).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { requested: 1000, .. }));
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 500), 1).unwrap();

        cart.update_quantity("1", 0).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(
            cart.update_quantity("1", 2),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_line_discounts() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000), 3).unwrap();

        // R$ 1,00 off each of 3 units
        cart.set_line_discount("1", Discount::Fixed(Money::from_cents(100)))
            .unwrap();
        assert_eq!(cart.lines()[0].discount_amount().cents(), 300);
        assert_eq!(cart.lines()[0].net_total().cents(), 2700);

        // 10% of R$ 30,00
        cart.set_line_discount("1", Discount::Percent(Rate::from_percent(10)))
            .unwrap();
        assert_eq!(cart.lines()[0].discount_amount().cents(), 300);
    }

    #[test]
    fn test_fixed_line_discount_clamped_to_line() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 500), 2).unwrap();
        cart.set_line_discount("1", Discount::Fixed(Money::from_cents(800)))
            .unwrap();

        assert_eq!(cart.lines()[0].discount_amount().cents(), 1000);
        assert!(cart.lines()[0].net_total().is_zero());
    }
}
