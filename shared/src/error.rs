//! Errors raised while parsing, validating and planning refills

use thiserror::Error;
use uuid::Uuid;

/// Everything that can make a refill submission unacceptable.
///
/// Line numbers are 1-based positions of the kept form rows, the way the
/// operator sees them in the refill form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefillError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: String, value: String },

    #[error("Invalid decimal '{value}' in {field}")]
    InvalidDecimal { field: String, value: String },

    #[error("Invalid id '{value}' in {field}")]
    InvalidId { field: String, value: String },

    #[error("Line {line}: missing {field}")]
    MissingLineField { line: usize, field: String },

    #[error("A refill needs at least one line item")]
    NoLines,

    #[error("Line {line}: quantity must be greater than zero")]
    NonPositiveQuantity { line: usize },

    #[error("Line {line}: unit price must not be negative")]
    NegativeUnitPrice { line: usize },

    #[error("Line {line}: discount must not be negative")]
    NegativeLineDiscount { line: usize },

    #[error("Line {line}: discount exceeds the line value")]
    LineDiscountExceedsGross { line: usize },

    #[error("{field} must not be negative")]
    NegativeAmount { field: String },

    #[error("Order discount exceeds the sum of all lines")]
    OrderDiscountExceedsItems,

    #[error("Tax rate must be between 0 and 100 percent")]
    TaxRateOutOfRange,

    #[error("VAT cannot be backed out of a tax rate of -100 percent or less")]
    TaxRateNotInvertible,

    #[error("{field} allows at most {scale} decimal places")]
    TooManyDecimals { field: String, scale: u32 },

    #[error("Line {line}: {field} allows at most {scale} decimal places")]
    LineTooManyDecimals { line: usize, field: String, scale: u32 },

    #[error("{field} is too large")]
    AmountOutOfRange { field: String },

    #[error("Line {line}: {field} is too large")]
    LineAmountOutOfRange { line: usize, field: String },

    #[error("Line {line}: unknown product {product_id}")]
    UnknownProduct { line: usize, product_id: Uuid },

    #[error("Unknown supplier {0}")]
    UnknownSupplier(Uuid),

    #[error("Unknown device {0}")]
    UnknownDevice(Uuid),

    #[error("Receipt attachment is not valid base64 data")]
    InvalidReceipt,
}

impl RefillError {
    /// Name of the submission field the error refers to
    pub fn field(&self) -> String {
        match self {
            RefillError::MissingField { field }
            | RefillError::InvalidDate { field, .. }
            | RefillError::InvalidDecimal { field, .. }
            | RefillError::InvalidId { field, .. }
            | RefillError::NegativeAmount { field }
            | RefillError::TooManyDecimals { field, .. }
            | RefillError::AmountOutOfRange { field } => field.clone(),
            RefillError::MissingLineField { field, .. }
            | RefillError::LineTooManyDecimals { field, .. }
            | RefillError::LineAmountOutOfRange { field, .. } => format!("{}[]", field),
            RefillError::NoLines | RefillError::UnknownProduct { .. } => "product_id[]".to_string(),
            RefillError::NonPositiveQuantity { .. } => "quantity[]".to_string(),
            RefillError::NegativeUnitPrice { .. } => "unit_price[]".to_string(),
            RefillError::NegativeLineDiscount { .. }
            | RefillError::LineDiscountExceedsGross { .. } => "line_discount[]".to_string(),
            RefillError::OrderDiscountExceedsItems => "discount_amount".to_string(),
            RefillError::TaxRateOutOfRange | RefillError::TaxRateNotInvertible => "tax_rate".to_string(),
            RefillError::UnknownSupplier(_) => "supplier_id".to_string(),
            RefillError::UnknownDevice(_) => "device_id".to_string(),
            RefillError::InvalidReceipt => "receipt_data".to_string(),
        }
    }

    /// German message shown in the refill form
    pub fn message_de(&self) -> String {
        match self {
            RefillError::MissingField { field } => format!("Pflichtfeld fehlt: {}", field),
            RefillError::InvalidDate { value, .. } => {
                format!("Ungültiges Datum '{}', erwartet JJJJ-MM-TT", value)
            }
            RefillError::InvalidDecimal { field, value } => {
                format!("Ungültige Zahl '{}' in {}", value, field)
            }
            RefillError::InvalidId { field, value } => format!("Ungültige ID '{}' in {}", value, field),
            RefillError::MissingLineField { line, field } => {
                format!("Position {}: {} fehlt", line, field)
            }
            RefillError::NoLines => "Mindestens eine Position ist erforderlich".to_string(),
            RefillError::NonPositiveQuantity { line } => {
                format!("Position {}: Menge muss größer als null sein", line)
            }
            RefillError::NegativeUnitPrice { line } => {
                format!("Position {}: Einzelpreis darf nicht negativ sein", line)
            }
            RefillError::NegativeLineDiscount { line } => {
                format!("Position {}: Rabatt darf nicht negativ sein", line)
            }
            RefillError::LineDiscountExceedsGross { line } => {
                format!("Position {}: Rabatt übersteigt den Positionswert", line)
            }
            RefillError::NegativeAmount { field } => format!("{} darf nicht negativ sein", field),
            RefillError::OrderDiscountExceedsItems => {
                "Gesamtrabatt übersteigt die Summe der Positionen".to_string()
            }
            RefillError::TaxRateOutOfRange => {
                "MwSt-Satz muss zwischen 0 und 100 Prozent liegen".to_string()
            }
            RefillError::TaxRateNotInvertible => {
                "MwSt-Satz von -100 Prozent oder weniger ist ungültig".to_string()
            }
            RefillError::TooManyDecimals { field, scale } => {
                format!("{} erlaubt höchstens {} Nachkommastellen", field, scale)
            }
            RefillError::LineTooManyDecimals { line, field, scale } => {
                format!("Position {}: {} erlaubt höchstens {} Nachkommastellen", line, field, scale)
            }
            RefillError::AmountOutOfRange { field } => format!("{} ist zu groß", field),
            RefillError::LineAmountOutOfRange { line, field } => {
                format!("Position {}: {} ist zu groß", line, field)
            }
            RefillError::UnknownProduct { line, .. } => {
                format!("Position {}: Produkt nicht gefunden", line)
            }
            RefillError::UnknownSupplier(_) => "Lieferant nicht gefunden".to_string(),
            RefillError::UnknownDevice(_) => "Gerät nicht gefunden".to_string(),
            RefillError::InvalidReceipt => "Kassenbon ist keine gültige Base64-Datei".to_string(),
        }
    }
}

pub type RefillResult<T> = Result<T, RefillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_errors_point_at_array_fields() {
        assert_eq!(RefillError::NonPositiveQuantity { line: 2 }.field(), "quantity[]");
        assert_eq!(
            RefillError::MissingLineField { line: 1, field: "unit_price".to_string() }.field(),
            "unit_price[]"
        );
        assert_eq!(RefillError::OrderDiscountExceedsItems.field(), "discount_amount");
        assert_eq!(
            RefillError::LineTooManyDecimals { line: 1, field: "line_discount".to_string(), scale: 2 }.field(),
            "line_discount[]"
        );
    }

    #[test]
    fn test_tax_rate_errors_are_worded_apart() {
        assert!(RefillError::TaxRateOutOfRange.to_string().contains("between 0 and 100"));
        assert!(RefillError::TaxRateNotInvertible.to_string().contains("-100 percent or less"));
        assert_eq!(RefillError::TaxRateNotInvertible.field(), "tax_rate");
    }

    #[test]
    fn test_messages_name_the_line() {
        let err = RefillError::LineDiscountExceedsGross { line: 3 };
        assert!(err.to_string().contains("Line 3"));
        assert!(err.message_de().contains("Position 3"));
    }
}
