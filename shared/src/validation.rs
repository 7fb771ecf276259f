//! Validation rules for refill submissions
//!
//! Discounts are validated, never clamped: a discount larger than the value
//! it applies to is rejected so totals can never go negative.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;

use crate::error::{RefillError, RefillResult};
use crate::pricing::{calculate_totals, items_total, PricingInput};
use crate::types::{round_money, NumericColumn, MONEY_COLUMN, QUANTITY_COLUMN, TAX_RATE_COLUMN, UNIT_PRICE_COLUMN};

// ============================================================================
// Amount Validations
// ============================================================================

/// Check every monetary input of a refill before it is calculated and stored.
///
/// Lines are reported with their 1-based position. Amounts must fit their
/// `numeric` columns exactly so the stored row reproduces the calculated
/// totals.
pub fn validate_refill_amounts(input: &PricingInput) -> RefillResult<()> {
    if input.lines.is_empty() {
        return Err(RefillError::NoLines);
    }

    for (index, line) in input.lines.iter().enumerate() {
        let line_no = index + 1;
        validate_line_column(line_no, "quantity", line.quantity, QUANTITY_COLUMN)?;
        validate_line_column(line_no, "unit_price", line.unit_price, UNIT_PRICE_COLUMN)?;
        validate_line_column(line_no, "line_discount", line.line_discount, MONEY_COLUMN)?;

        if line.quantity <= Decimal::ZERO {
            return Err(RefillError::NonPositiveQuantity { line: line_no });
        }
        if line.unit_price < Decimal::ZERO {
            return Err(RefillError::NegativeUnitPrice { line: line_no });
        }
        if line.line_discount < Decimal::ZERO {
            return Err(RefillError::NegativeLineDiscount { line: line_no });
        }
        if line.line_discount > line.gross()? {
            return Err(RefillError::LineDiscountExceedsGross { line: line_no });
        }
        validate_line_column(line_no, "total_price", round_money(line.total()?), MONEY_COLUMN)?;
    }

    validate_tax_rate(input.tax_rate)?;
    validate_column("tax_rate", input.tax_rate, TAX_RATE_COLUMN)?;
    for (field, amount) in [
        ("shipping_cost", input.shipping_cost),
        ("deposit_amount", input.deposit_amount),
        ("discount_amount", input.discount_amount),
    ] {
        validate_non_negative(field, amount)?;
        validate_column(field, amount, MONEY_COLUMN)?;
    }

    if input.discount_amount > items_total(&input.lines)? {
        return Err(RefillError::OrderDiscountExceedsItems);
    }

    let totals = calculate_totals(input)?;
    validate_column("total_amount", totals.total_amount, MONEY_COLUMN)
}

/// Value must be storable in `column` without rounding or overflow
pub fn validate_column(field: &str, value: Decimal, column: NumericColumn) -> RefillResult<()> {
    if !column.holds_scale(value) {
        return Err(RefillError::TooManyDecimals {
            field: field.to_string(),
            scale: column.scale,
        });
    }
    if !column.holds_magnitude(value) {
        return Err(RefillError::AmountOutOfRange {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_line_column(line: usize, field: &str, value: Decimal, column: NumericColumn) -> RefillResult<()> {
    validate_column(field, value, column).map_err(|e| match e {
        RefillError::TooManyDecimals { field, scale } => RefillError::LineTooManyDecimals { line, field, scale },
        RefillError::AmountOutOfRange { field } => RefillError::LineAmountOutOfRange { line, field },
        other => other,
    })
}

/// VAT rate must be a percentage between 0 and 100
pub fn validate_tax_rate(tax_rate: Decimal) -> RefillResult<()> {
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(RefillError::TaxRateOutOfRange);
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, amount: Decimal) -> RefillResult<()> {
    if amount < Decimal::ZERO {
        return Err(RefillError::NegativeAmount {
            field: field.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Attachment Validations
// ============================================================================

/// Receipt attachments are plain base64 or a `data:<mime>;base64,` URL
pub fn validate_receipt(data: &str) -> RefillResult<()> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((_mime, payload)) => payload,
            None => return Err(RefillError::InvalidReceipt),
        },
        None => data,
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(RefillError::InvalidReceipt);
    }
    STANDARD
        .decode(compact.as_bytes())
        .map(|_| ())
        .map_err(|_| RefillError::InvalidReceipt)
}
