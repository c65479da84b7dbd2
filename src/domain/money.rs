//! Monetary types for price and quantity representation.

use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Base-asset quantity represented as a Decimal for precision.
///
/// Positions use the same type with a sign: positive is long, negative short.
pub type Quantity = Decimal;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_and_quantity_are_decimal() {
        let price: Price = dec!(100.5);
        let qty: Quantity = dec!(0.01);

        assert_eq!(price * qty, dec!(1.005));
    }
}
