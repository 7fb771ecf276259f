//! Money helpers

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency label used in messages and exports. Amounts carry no currency code.
pub const CURRENCY: &str = "EUR";

/// Decimal places for stored monetary amounts (`numeric(10,2)`)
pub const MONEY_SCALE: u32 = 2;

/// Precision and scale of a Postgres `numeric(p, s)` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericColumn {
    pub precision: u32,
    pub scale: u32,
}

impl NumericColumn {
    pub const fn new(precision: u32, scale: u32) -> Self {
        Self { precision, scale }
    }

    /// Whether the value is stored without rounding
    pub fn holds_scale(&self, value: Decimal) -> bool {
        value.normalize().scale() <= self.scale
    }

    /// Whether the integer part fits the column
    pub fn holds_magnitude(&self, value: Decimal) -> bool {
        let integer_digits = self.precision.saturating_sub(self.scale);
        match 10i64.checked_pow(integer_digits) {
            Some(limit) => value.abs() < Decimal::from(limit),
            None => true,
        }
    }
}

/// `numeric(12,3)`: refill and ledger quantities
pub const QUANTITY_COLUMN: NumericColumn = NumericColumn::new(12, 3);
/// `numeric(10,4)`: purchase unit prices
pub const UNIT_PRICE_COLUMN: NumericColumn = NumericColumn::new(10, 4);
/// `numeric(10,2)`: stored monetary amounts
pub const MONEY_COLUMN: NumericColumn = NumericColumn::new(10, MONEY_SCALE);
/// `numeric(5,2)`: VAT rate in percent
pub const TAX_RATE_COLUMN: NumericColumn = NumericColumn::new(5, 2);

/// Round a monetary amount to cents, half away from zero like Postgres numeric
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for user-facing messages, e.g. "12.00 €"
pub fn format_eur(value: Decimal) -> String {
    format!("{:.2} €", round_money(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::from_str("14.165").unwrap()), Decimal::from_str("14.17").unwrap());
        assert_eq!(round_money(Decimal::from_str("-0.005").unwrap()), Decimal::from_str("-0.01").unwrap());
        assert_eq!(round_money(Decimal::from_str("14.16666").unwrap()), Decimal::from_str("14.17").unwrap());
    }

    #[test]
    fn test_numeric_columns() {
        let dec = |s: &str| Decimal::from_str(s).unwrap();

        assert!(MONEY_COLUMN.holds_scale(dec("0.01")));
        assert!(MONEY_COLUMN.holds_scale(dec("1.5000")));
        assert!(!MONEY_COLUMN.holds_scale(dec("0.005")));
        assert!(QUANTITY_COLUMN.holds_scale(dec("2.125")));
        assert!(!UNIT_PRICE_COLUMN.holds_scale(dec("0.12345")));

        assert!(MONEY_COLUMN.holds_magnitude(dec("99999999.99")));
        assert!(!MONEY_COLUMN.holds_magnitude(dec("100000000")));
        assert!(QUANTITY_COLUMN.holds_magnitude(dec("999999999.999")));
        assert!(!QUANTITY_COLUMN.holds_magnitude(Decimal::MAX));
    }

    #[test]
    fn test_format_eur() {
        assert_eq!(format_eur(Decimal::from(12)), "12.00 €");
    }
}
