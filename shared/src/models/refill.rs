//! Refill aggregate: stored header and lines, plus the submission format
//! the refill form posts

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RefillError, RefillResult};
use crate::pricing::{PricingInput, PricingLine, DEFAULT_TAX_RATE};
use crate::validation::validate_receipt;

/// Refill lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "refill_status", rename_all = "snake_case"))]
pub enum RefillStatus {
    /// Stored with totals, no ledger entries and no expense yet
    Draft,
    /// Ledger entries and expense written
    Posted,
    /// Compensated by OUT movements, expense removed
    Voided,
}

impl RefillStatus {
    pub fn can_post(&self) -> bool {
        matches!(self, RefillStatus::Draft)
    }

    pub fn can_void(&self) -> bool {
        matches!(self, RefillStatus::Posted)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, RefillStatus::Draft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefillStatus::Draft => "draft",
            RefillStatus::Posted => "posted",
            RefillStatus::Voided => "voided",
        }
    }
}

/// Stored refill header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Refill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub supplier_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub invoice_number: Option<String>,
    pub delivery_note: Option<String>,
    pub shipping_cost: Decimal,
    pub deposit_amount: Decimal,
    pub tax_rate: Decimal,
    pub prices_include_tax: bool,
    pub discount_amount: Decimal,
    pub discount_reason: Option<String>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub receipt_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_data: Option<String>,
    pub notes: Option<String>,
    pub status: RefillStatus,
    pub posted_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub expense_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Refill {
    /// Rebuild the calculator input from the stored header and its lines
    pub fn pricing_input(&self, items: &[RefillItem]) -> PricingInput {
        PricingInput {
            lines: items.iter().map(RefillItem::pricing_line).collect(),
            tax_rate: self.tax_rate,
            prices_include_tax: self.prices_include_tax,
            shipping_cost: self.shipping_cost,
            deposit_amount: self.deposit_amount,
            discount_amount: self.discount_amount,
        }
    }
}

/// Stored refill line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RefillItem {
    pub id: Uuid,
    pub refill_id: Uuid,
    pub product_id: Uuid,
    /// 1-based position within the refill
    pub line_no: i32,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_discount: Decimal,
    pub line_discount_reason: Option<String>,
    pub total_price: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl RefillItem {
    pub fn pricing_line(&self) -> PricingLine {
        PricingLine {
            quantity: self.quantity,
            unit_price: self.unit_price,
            line_discount: self.line_discount,
            line_discount_reason: self.line_discount_reason.clone(),
        }
    }
}

/// One parsed line of a refill submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_discount: Decimal,
    pub line_discount_reason: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Inline receipt attachment (base64 or data URL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptAttachment {
    pub filename: Option<String>,
    pub data: String,
}

/// A fully typed refill submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillDraft {
    pub date: NaiveDate,
    pub supplier_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub invoice_number: Option<String>,
    pub delivery_note: Option<String>,
    pub shipping_cost: Decimal,
    pub deposit_amount: Decimal,
    pub tax_rate: Decimal,
    pub prices_include_tax: bool,
    pub discount_amount: Decimal,
    pub discount_reason: Option<String>,
    pub notes: Option<String>,
    pub receipt: Option<ReceiptAttachment>,
    pub lines: Vec<RefillLine>,
    /// Store without posting
    pub draft: bool,
}

impl RefillDraft {
    pub fn pricing_input(&self) -> PricingInput {
        PricingInput {
            lines: self
                .lines
                .iter()
                .map(|line| PricingLine {
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_discount: line.line_discount,
                    line_discount_reason: line.line_discount_reason.clone(),
                })
                .collect(),
            tax_rate: self.tax_rate,
            prices_include_tax: self.prices_include_tax,
            shipping_cost: self.shipping_cost,
            deposit_amount: self.deposit_amount,
            discount_amount: self.discount_amount,
        }
    }
}

// ============================================================================
// Submission format
// ============================================================================

/// A raw form or JSON value. Accepts strings, numbers, booleans and null so
/// the same schema reads both `application/json` and form-encoded bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValue(pub String);

impl FormValue {
    /// Trimmed text, `None` when blank
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue(value.to_string())
    }
}

impl<'de> Deserialize<'de> for FormValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FormValueVisitor;

        impl<'de> Visitor<'de> for FormValueVisitor {
            type Value = FormValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FormValue, E> {
                Ok(FormValue(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<FormValue, E> {
                Ok(FormValue(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<FormValue, E> {
                Ok(FormValue(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FormValue, E> {
                Ok(FormValue(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FormValue, E> {
                Ok(FormValue(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<FormValue, E> {
                Ok(FormValue(v.to_string()))
            }

            fn visit_none<E: de::Error>(self) -> Result<FormValue, E> {
                Ok(FormValue::default())
            }

            fn visit_unit<E: de::Error>(self) -> Result<FormValue, E> {
                Ok(FormValue::default())
            }

            fn visit_some<D2>(self, deserializer: D2) -> Result<FormValue, D2::Error>
            where
                D2: Deserializer<'de>,
            {
                FormValue::deserialize(deserializer)
            }
        }

        deserializer.deserialize_any(FormValueVisitor)
    }
}

/// Defaults applied to blank header fields
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionDefaults {
    pub tax_rate: Decimal,
    /// Used when the flag is absent. Form bodies pass `false` because an
    /// unchecked checkbox is simply not sent.
    pub prices_include_tax: bool,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::from(DEFAULT_TAX_RATE),
            prices_include_tax: true,
        }
    }
}

impl SubmissionDefaults {
    pub fn for_form(self) -> Self {
        Self {
            prices_include_tax: false,
            ..self
        }
    }
}

/// The refill form as submitted: header fields plus positional line arrays.
/// Index `i` across the arrays describes one line. Form bodies use the
/// `product_id[]` style keys, JSON bodies the plain names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefillSubmission {
    #[serde(default)]
    pub date: Option<FormValue>,
    #[serde(default)]
    pub supplier_id: Option<FormValue>,
    #[serde(default)]
    pub device_id: Option<FormValue>,
    #[serde(default)]
    pub order_number: Option<FormValue>,
    #[serde(default)]
    pub invoice_number: Option<FormValue>,
    #[serde(default)]
    pub delivery_note: Option<FormValue>,
    #[serde(default)]
    pub shipping_cost: Option<FormValue>,
    #[serde(default)]
    pub deposit_amount: Option<FormValue>,
    #[serde(default)]
    pub tax_rate: Option<FormValue>,
    #[serde(default)]
    pub prices_include_tax: Option<FormValue>,
    #[serde(default)]
    pub discount_amount: Option<FormValue>,
    #[serde(default)]
    pub discount_reason: Option<FormValue>,
    #[serde(default)]
    pub notes: Option<FormValue>,
    #[serde(default)]
    pub receipt_filename: Option<FormValue>,
    #[serde(default)]
    pub receipt_data: Option<FormValue>,
    #[serde(default)]
    pub draft: Option<FormValue>,

    #[serde(default, alias = "product_id[]")]
    pub product_id: Vec<FormValue>,
    #[serde(default, alias = "quantity[]")]
    pub quantity: Vec<FormValue>,
    #[serde(default, alias = "unit_price[]")]
    pub unit_price: Vec<FormValue>,
    #[serde(default, alias = "line_discount[]")]
    pub line_discount: Vec<FormValue>,
    #[serde(default, alias = "line_discount_reason[]")]
    pub line_discount_reason: Vec<FormValue>,
    #[serde(default, alias = "batch_number[]")]
    pub batch_number: Vec<FormValue>,
    #[serde(default, alias = "expiry_date[]")]
    pub expiry_date: Vec<FormValue>,
}

fn text(value: &Option<FormValue>) -> Option<String> {
    value.as_ref().and_then(FormValue::text).map(str::to_string)
}

fn cell(values: &[FormValue], row: usize) -> Option<&str> {
    values.get(row).and_then(FormValue::text)
}

/// Parse a decimal, accepting a comma as decimal separator ("1,20")
pub fn parse_decimal(field: &str, raw: &str) -> RefillResult<Decimal> {
    Decimal::from_str(&raw.trim().replace(',', ".")).map_err(|_| RefillError::InvalidDecimal {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn parse_date(field: &str, raw: &str) -> RefillResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| RefillError::InvalidDate {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn parse_id(field: &str, raw: &str) -> RefillResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| RefillError::InvalidId {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn optional_id(field: &str, value: &Option<FormValue>) -> RefillResult<Option<Uuid>> {
    text(value).map(|raw| parse_id(field, &raw)).transpose()
}

fn amount_or(field: &str, value: &Option<FormValue>, default: Decimal) -> RefillResult<Decimal> {
    match text(value) {
        Some(raw) => parse_decimal(field, &raw),
        None => Ok(default),
    }
}

/// Checkbox semantics: "on", "true", "1" and "yes" are checked
fn checkbox(value: &Option<FormValue>) -> Option<bool> {
    value.as_ref().map(|v| {
        matches!(
            v.text().map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "true" | "1" | "yes")
        )
    })
}

impl RefillSubmission {
    /// Turn the raw submission into a typed draft.
    ///
    /// Rows with a blank product id are empty form rows and are skipped.
    /// Every kept row needs a quantity and a unit price; the optional
    /// arrays may be shorter than `product_id`. Amount policy is not
    /// checked here.
    pub fn parse(&self, defaults: &SubmissionDefaults) -> RefillResult<RefillDraft> {
        let date = match text(&self.date) {
            Some(raw) => parse_date("date", &raw)?,
            None => {
                return Err(RefillError::MissingField {
                    field: "date".to_string(),
                })
            }
        };

        let mut lines = Vec::new();
        for (row, raw_product) in self.product_id.iter().enumerate() {
            let Some(raw_product) = raw_product.text() else {
                continue;
            };
            let line = lines.len() + 1;

            let product_id = parse_id("product_id[]", raw_product)?;
            let quantity = match cell(&self.quantity, row) {
                Some(raw) => parse_decimal("quantity[]", raw)?,
                None => {
                    return Err(RefillError::MissingLineField {
                        line,
                        field: "quantity".to_string(),
                    })
                }
            };
            let unit_price = match cell(&self.unit_price, row) {
                Some(raw) => parse_decimal("unit_price[]", raw)?,
                None => {
                    return Err(RefillError::MissingLineField {
                        line,
                        field: "unit_price".to_string(),
                    })
                }
            };
            let line_discount = cell(&self.line_discount, row)
                .map(|raw| parse_decimal("line_discount[]", raw))
                .transpose()?
                .unwrap_or(Decimal::ZERO);
            let expiry_date = cell(&self.expiry_date, row)
                .map(|raw| parse_date("expiry_date[]", raw))
                .transpose()?;

            lines.push(RefillLine {
                product_id,
                quantity,
                unit_price,
                line_discount,
                line_discount_reason: cell(&self.line_discount_reason, row).map(str::to_string),
                batch_number: cell(&self.batch_number, row).map(str::to_string),
                expiry_date,
            });
        }

        let receipt = match text(&self.receipt_data) {
            Some(data) => {
                validate_receipt(&data)?;
                Some(ReceiptAttachment {
                    filename: text(&self.receipt_filename),
                    data,
                })
            }
            None => None,
        };

        Ok(RefillDraft {
            date,
            supplier_id: optional_id("supplier_id", &self.supplier_id)?,
            device_id: optional_id("device_id", &self.device_id)?,
            order_number: text(&self.order_number),
            invoice_number: text(&self.invoice_number),
            delivery_note: text(&self.delivery_note),
            shipping_cost: amount_or("shipping_cost", &self.shipping_cost, Decimal::ZERO)?,
            deposit_amount: amount_or("deposit_amount", &self.deposit_amount, Decimal::ZERO)?,
            tax_rate: amount_or("tax_rate", &self.tax_rate, defaults.tax_rate)?,
            prices_include_tax: checkbox(&self.prices_include_tax).unwrap_or(defaults.prices_include_tax),
            discount_amount: amount_or("discount_amount", &self.discount_amount, Decimal::ZERO)?,
            discount_reason: text(&self.discount_reason),
            notes: text(&self.notes),
            receipt,
            lines,
            draft: checkbox(&self.draft).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn values(items: &[&str]) -> Vec<FormValue> {
        items.iter().map(|s| FormValue::from(*s)).collect()
    }

    fn submission(product_ids: &[&str]) -> RefillSubmission {
        RefillSubmission {
            date: Some("2024-03-01".into()),
            product_id: values(product_ids),
            quantity: values(&["10", "5", "3"][..product_ids.len()]),
            unit_price: values(&["1.20", "2,00", "0.5"][..product_ids.len()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(RefillStatus::Draft.can_post());
        assert!(RefillStatus::Draft.can_delete());
        assert!(!RefillStatus::Draft.can_void());
        assert!(RefillStatus::Posted.can_void());
        assert!(!RefillStatus::Posted.can_post());
        assert!(!RefillStatus::Posted.can_delete());
        assert!(!RefillStatus::Voided.can_void());
    }

    #[test]
    fn test_parse_applies_defaults() {
        let id = Uuid::new_v4().to_string();
        let draft = submission(&[&id]).parse(&SubmissionDefaults::default()).unwrap();

        assert_eq!(draft.tax_rate, dec("20"));
        assert!(draft.prices_include_tax);
        assert_eq!(draft.shipping_cost, Decimal::ZERO);
        assert!(!draft.draft);
        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.lines[0].unit_price, dec("1.20"));
    }

    #[test]
    fn test_form_defaults_leave_checkbox_unchecked() {
        let id = Uuid::new_v4().to_string();
        let draft = submission(&[&id])
            .parse(&SubmissionDefaults::default().for_form())
            .unwrap();
        assert!(!draft.prices_include_tax);

        let mut checked = submission(&[&id]);
        checked.prices_include_tax = Some("on".into());
        let draft = checked.parse(&SubmissionDefaults::default().for_form()).unwrap();
        assert!(draft.prices_include_tax);
    }

    #[test]
    fn test_blank_product_rows_are_skipped() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        let draft = submission(&[&a, "", &b]).parse(&SubmissionDefaults::default()).unwrap();

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[1].quantity, dec("3"));
        assert_eq!(draft.lines[1].unit_price, dec("0.5"));
    }

    #[test]
    fn test_comma_decimal_separator() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        let draft = submission(&[&a, &b]).parse(&SubmissionDefaults::default()).unwrap();
        assert_eq!(draft.lines[1].unit_price, dec("2.00"));
    }

    #[test]
    fn test_missing_date() {
        let mut raw = submission(&[]);
        raw.date = None;
        assert_eq!(
            raw.parse(&SubmissionDefaults::default()),
            Err(RefillError::MissingField { field: "date".to_string() })
        );
    }

    #[test]
    fn test_invalid_date_and_decimal() {
        let mut raw = submission(&[]);
        raw.date = Some("01.03.2024".into());
        assert!(matches!(
            raw.parse(&SubmissionDefaults::default()),
            Err(RefillError::InvalidDate { .. })
        ));

        let mut raw = submission(&[]);
        raw.shipping_cost = Some("drei".into());
        assert!(matches!(
            raw.parse(&SubmissionDefaults::default()),
            Err(RefillError::InvalidDecimal { .. })
        ));
    }

    #[test]
    fn test_missing_quantity_names_the_line() {
        let id = Uuid::new_v4().to_string();
        let mut raw = submission(&[&id]);
        raw.quantity = values(&[""]);
        assert_eq!(
            raw.parse(&SubmissionDefaults::default()),
            Err(RefillError::MissingLineField { line: 1, field: "quantity".to_string() })
        );
    }

    #[test]
    fn test_invalid_product_id() {
        let raw = submission(&["not-a-uuid"]);
        assert!(matches!(
            raw.parse(&SubmissionDefaults::default()),
            Err(RefillError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_json_body_with_numbers_and_bools() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"date":"2024-03-01","tax_rate":7,"prices_include_tax":false,"draft":true,
                "shipping_cost":null,"product_id":["{}"],"quantity":[2.5],"unit_price":["11.99"]}}"#,
            id
        );
        let raw: RefillSubmission = serde_json::from_str(&json).unwrap();
        let draft = raw.parse(&SubmissionDefaults::default()).unwrap();

        assert_eq!(draft.tax_rate, dec("7"));
        assert!(!draft.prices_include_tax);
        assert!(draft.draft);
        assert_eq!(draft.shipping_cost, Decimal::ZERO);
        assert_eq!(draft.lines[0].product_id, id);
        assert_eq!(draft.lines[0].quantity, dec("2.5"));
    }

    #[test]
    fn test_receipt_must_be_base64() {
        let mut raw = submission(&[]);
        raw.receipt_data = Some("data:image/png;base64,iVBORw0KGgo=".into());
        raw.receipt_filename = Some("bon.png".into());
        let draft = raw.parse(&SubmissionDefaults::default()).unwrap();
        assert_eq!(draft.receipt.unwrap().filename.as_deref(), Some("bon.png"));

        let mut raw = submission(&[]);
        raw.receipt_data = Some("%%% not base64 %%%".into());
        assert_eq!(raw.parse(&SubmissionDefaults::default()), Err(RefillError::InvalidReceipt));
    }

    #[test]
    fn test_pricing_input_mirrors_draft() {
        let id = Uuid::new_v4().to_string();
        let mut raw = submission(&[&id]);
        raw.line_discount = values(&["1.00"]);
        raw.discount_amount = Some("0.50".into());
        let input = raw.parse(&SubmissionDefaults::default()).unwrap().pricing_input();

        assert_eq!(input.lines[0].line_discount, dec("1.00"));
        assert_eq!(input.discount_amount, dec("0.50"));
    }
}
