//! Refill price calculation
//!
//! Turns refill lines plus the header adjustments (order discount, shipping,
//! deposit) into subtotal, VAT and grand total. Entered prices are either
//! VAT-inclusive (VAT is backed out of the adjusted total) or net (VAT is
//! added on top). Shipping and deposit are added after the VAT split.
//!
//! All arithmetic is exact decimal; only the reported amounts are rounded to
//! cents. Rounding is arranged so `subtotal + tax_amount + shipping_cost +
//! deposit_amount == total_amount` holds exactly on the rounded values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RefillError, RefillResult};
use crate::types::round_money;

/// Default VAT rate in percent
pub const DEFAULT_TAX_RATE: u32 = 20;

/// Monetary inputs of one refill line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingLine {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub line_discount: Decimal,
    #[serde(default)]
    pub line_discount_reason: Option<String>,
}

impl PricingLine {
    pub fn new(quantity: Decimal, unit_price: Decimal, line_discount: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
            line_discount,
            line_discount_reason: None,
        }
    }

    /// quantity × unit price, before the line discount
    pub fn gross(&self) -> RefillResult<Decimal> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| out_of_range("total_price"))
    }

    /// Exact line total after the line discount
    pub fn total(&self) -> RefillResult<Decimal> {
        line_total(self.quantity, self.unit_price, self.line_discount)
    }
}

/// Everything the calculator needs for one refill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub lines: Vec<PricingLine>,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    #[serde(default = "default_prices_include_tax")]
    pub prices_include_tax: bool,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub deposit_amount: Decimal,
    /// Order-level discount, taken off before the VAT split
    #[serde(default)]
    pub discount_amount: Decimal,
}

impl Default for PricingInput {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            tax_rate: default_tax_rate(),
            prices_include_tax: default_prices_include_tax(),
            shipping_cost: Decimal::ZERO,
            deposit_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
        }
    }
}

fn default_tax_rate() -> Decimal {
    Decimal::from(DEFAULT_TAX_RATE)
}

fn default_prices_include_tax() -> bool {
    true
}

/// Computed refill amounts, all rounded to cents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillTotals {
    /// Per-line totals after line discounts, in input order
    pub line_totals: Vec<Decimal>,
    /// Σ quantity × unit price
    pub gross_total: Decimal,
    pub line_discount_total: Decimal,
    /// Σ line totals
    pub items_total: Decimal,
    pub discount_amount: Decimal,
    /// items_total − order discount
    pub adjusted_total: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub deposit_amount: Decimal,
    pub total_amount: Decimal,
    /// Line discounts plus order discount
    pub total_savings: Decimal,
}

/// Exact line total: quantity × unit price − line discount
pub fn line_total(quantity: Decimal, unit_price: Decimal, line_discount: Decimal) -> RefillResult<Decimal> {
    quantity
        .checked_mul(unit_price)
        .and_then(|gross| gross.checked_sub(line_discount))
        .ok_or_else(|| out_of_range("total_price"))
}

/// Σ line totals, exact
pub fn items_total(lines: &[PricingLine]) -> RefillResult<Decimal> {
    checked_sum("total_price", lines.iter().map(PricingLine::total))
}

fn out_of_range(field: &str) -> RefillError {
    RefillError::AmountOutOfRange {
        field: field.to_string(),
    }
}

fn checked_sum<I>(field: &str, values: I) -> RefillResult<Decimal>
where
    I: IntoIterator<Item = RefillResult<Decimal>>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value?).ok_or_else(|| out_of_range(field))
    })
}

fn add(field: &str, a: Decimal, b: Decimal) -> RefillResult<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(field))
}

/// Split a VAT-inclusive amount into its net part. Exact, unrounded.
pub fn net_from_gross(gross: Decimal, tax_rate: Decimal) -> RefillResult<Decimal> {
    let divisor = Decimal::ONE + tax_rate / Decimal::ONE_HUNDRED;
    if divisor <= Decimal::ZERO {
        return Err(RefillError::TaxRateNotInvertible);
    }
    gross.checked_div(divisor).ok_or_else(|| out_of_range("subtotal"))
}

/// Run the refill calculation.
///
/// Fails for a tax rate of -100 % or lower, where VAT cannot be backed out,
/// and for amounts too large for decimal arithmetic. Amount policy
/// (non-negative amounts, discount limits, column ranges) is checked
/// separately by [`crate::validation::validate_refill_amounts`].
pub fn calculate_totals(input: &PricingInput) -> RefillResult<RefillTotals> {
    let rate = input.tax_rate / Decimal::ONE_HUNDRED;
    if Decimal::ONE + rate <= Decimal::ZERO {
        return Err(RefillError::TaxRateNotInvertible);
    }

    let gross_total = checked_sum("total_price", input.lines.iter().map(PricingLine::gross))?;
    let line_discount_total = checked_sum("line_discount", input.lines.iter().map(|l| Ok(l.line_discount)))?;
    let items_total = items_total(&input.lines)?;
    let adjusted_total = items_total
        .checked_sub(input.discount_amount)
        .ok_or_else(|| out_of_range("discount_amount"))?;

    let (subtotal, tax_amount) = if input.prices_include_tax {
        let subtotal = round_money(net_from_gross(adjusted_total, input.tax_rate)?);
        (subtotal, round_money(adjusted_total) - subtotal)
    } else {
        let tax = adjusted_total
            .checked_mul(rate)
            .ok_or_else(|| out_of_range("tax_amount"))?;
        (round_money(adjusted_total), round_money(tax))
    };

    let shipping_cost = round_money(input.shipping_cost);
    let deposit_amount = round_money(input.deposit_amount);
    let total_amount = checked_sum(
        "total_amount",
        [subtotal, tax_amount, shipping_cost, deposit_amount].map(Ok),
    )?;
    let line_totals = input
        .lines
        .iter()
        .map(|l| l.total().map(round_money))
        .collect::<RefillResult<Vec<_>>>()?;

    Ok(RefillTotals {
        line_totals,
        gross_total: round_money(gross_total),
        line_discount_total: round_money(line_discount_total),
        items_total: round_money(items_total),
        discount_amount: round_money(input.discount_amount),
        adjusted_total: round_money(adjusted_total),
        subtotal,
        tax_amount,
        shipping_cost,
        deposit_amount,
        total_amount,
        total_savings: round_money(add("discount_amount", line_discount_total, input.discount_amount)?),
    })
}
