//! WebAssembly module for the Automaten Manager
//!
//! Runs the refill calculator in the browser so the totals shown while an
//! invoice is typed in are the ones the server will store.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{calculate_totals, line_total, parse_decimal, round_money, validate_refill_amounts, PricingInput, RefillTotals};
use wasm_bindgen::prelude::*;

/// Error payload returned to JavaScript
#[derive(Debug, Serialize, PartialEq)]
struct CalculationError {
    field: String,
    message_en: String,
    message_de: String,
}

fn totals_from_json(input_json: &str) -> Result<RefillTotals, CalculationError> {
    let input: PricingInput = serde_json::from_str(input_json).map_err(|e| CalculationError {
        field: "input".to_string(),
        message_en: format!("Invalid refill JSON: {}", e),
        message_de: "Ungültige Eingabe".to_string(),
    })?;

    validate_refill_amounts(&input)
        .and_then(|_| calculate_totals(&input))
        .map_err(|e| CalculationError {
            field: e.field(),
            message_en: e.to_string(),
            message_de: e.message_de(),
        })
}

fn line_total_of(quantity: &str, unit_price: &str, line_discount: &str) -> Result<Decimal, String> {
    let quantity = parse_decimal("quantity", quantity).map_err(|e| e.to_string())?;
    let unit_price = parse_decimal("unit_price", unit_price).map_err(|e| e.to_string())?;
    let line_discount = if line_discount.trim().is_empty() {
        Decimal::ZERO
    } else {
        parse_decimal("line_discount", line_discount).map_err(|e| e.to_string())?
    };
    line_total(quantity, unit_price, line_discount)
        .map(round_money)
        .map_err(|e| e.to_string())
}

/// Calculate refill totals.
///
/// Takes the same JSON the `/refills/preview` endpoint accepts and returns
/// the totals as JSON. Throws an `Error` whose message is a JSON object
/// `{ field, message_en, message_de }` when the input is rejected.
#[wasm_bindgen]
pub fn calculate_refill_totals(input_json: &str) -> Result<String, JsValue> {
    match totals_from_json(input_json) {
        Ok(totals) => serde_json::to_string(&totals).map_err(|e| js_sys::Error::new(&e.to_string()).into()),
        Err(error) => {
            web_sys::console::warn_1(&JsValue::from_str(&error.message_en));
            let payload = serde_json::to_string(&error).unwrap_or_else(|_| error.message_en.clone());
            Err(js_sys::Error::new(&payload).into())
        }
    }
}

/// Total of one line in cents: quantity × unit price − discount.
/// Accepts "1,20" as well as "1.20"; an empty discount counts as zero.
#[wasm_bindgen]
pub fn calculate_line_total(quantity: &str, unit_price: &str, line_discount: &str) -> Result<String, JsValue> {
    line_total_of(quantity, unit_price, line_discount)
        .map(|total| total.to_string())
        .map_err(|message| js_sys::Error::new(&message).into())
}

/// Format an amount the way the refill form shows it, e.g. "12.00 €"
#[wasm_bindgen]
pub fn format_amount(amount: &str) -> String {
    Decimal::from_str(amount.trim())
        .map(shared::format_eur)
        .unwrap_or_default()
}
