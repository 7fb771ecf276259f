//! Refill submission parsing tests
//!
//! JSON bodies and the refill form share one schema of header strings and
//! positional line arrays.

use rust_decimal::Decimal;
use shared::{RefillError, RefillSubmission, SubmissionDefaults};
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn parse(json: &str, defaults: &SubmissionDefaults) -> Result<shared::RefillDraft, RefillError> {
    let submission: RefillSubmission = serde_json::from_str(json).unwrap();
    submission.parse(defaults)
}

#[test]
fn test_json_body_with_numbers_and_strings() {
    let product = Uuid::new_v4();
    let json = format!(
        r#"{{
            "date": "2024-03-01",
            "shipping_cost": 4.9,
            "tax_rate": "",
            "prices_include_tax": false,
            "product_id": ["{product}"],
            "quantity": [12],
            "unit_price": ["0,89"]
        }}"#
    );

    let draft = parse(&json, &SubmissionDefaults::default()).unwrap();
    assert_eq!(draft.shipping_cost, dec("4.9"));
    assert_eq!(draft.tax_rate, dec("20"));
    assert!(!draft.prices_include_tax);
    assert_eq!(draft.lines.len(), 1);
    assert_eq!(draft.lines[0].product_id, product);
    assert_eq!(draft.lines[0].quantity, dec("12"));
    assert_eq!(draft.lines[0].unit_price, dec("0.89"));
    assert!(!draft.draft);
}

#[test]
fn test_form_style_keys() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let json = format!(
        r#"{{
            "date": "2024-03-02",
            "prices_include_tax": "on",
            "product_id[]": ["{first}", "", "{second}"],
            "quantity[]": ["10", "", "2"],
            "unit_price[]": ["1.00", "", "3.50"],
            "line_discount[]": ["0.50"],
            "batch_number[]": ["L-7731"]
        }}"#
    );

    let draft = parse(&json, &SubmissionDefaults::default().for_form()).unwrap();
    assert!(draft.prices_include_tax);
    assert_eq!(draft.lines.len(), 2);
    assert_eq!(draft.lines[0].line_discount, dec("0.50"));
    assert_eq!(draft.lines[0].batch_number.as_deref(), Some("L-7731"));
    assert_eq!(draft.lines[1].product_id, second);
    assert_eq!(draft.lines[1].line_discount, Decimal::ZERO);
}

#[test]
fn test_unchecked_box_on_the_form_means_net_prices() {
    let json = format!(
        r#"{{"date": "2024-03-02", "product_id[]": ["{}"], "quantity[]": ["1"], "unit_price[]": ["1"]}}"#,
        Uuid::new_v4()
    );

    let form = parse(&json, &SubmissionDefaults::default().for_form()).unwrap();
    assert!(!form.prices_include_tax);

    let api = parse(&json, &SubmissionDefaults::default()).unwrap();
    assert!(api.prices_include_tax);
}

#[test]
fn test_missing_date() {
    let err = parse(r#"{"product_id": []}"#, &SubmissionDefaults::default()).unwrap_err();
    assert_eq!(
        err,
        RefillError::MissingField {
            field: "date".to_string()
        }
    );
}

#[test]
fn test_missing_quantity_names_the_line() {
    let json = format!(
        r#"{{"date": "2024-03-02", "product_id": ["{}", "{}"], "quantity": ["1"], "unit_price": ["1", "2"]}}"#,
        Uuid::new_v4(),
        Uuid::new_v4()
    );
    let err = parse(&json, &SubmissionDefaults::default()).unwrap_err();
    assert_eq!(
        err,
        RefillError::MissingLineField {
            line: 2,
            field: "quantity".to_string()
        }
    );
}

#[test]
fn test_garbage_receipt_is_rejected() {
    let json = format!(
        r#"{{
            "date": "2024-03-02",
            "receipt_data": "data:image/png;base64,@@not-base64@@",
            "product_id": ["{}"], "quantity": ["1"], "unit_price": ["1"]
        }}"#,
        Uuid::new_v4()
    );
    let err = parse(&json, &SubmissionDefaults::default()).unwrap_err();
    assert_eq!(err, RefillError::InvalidReceipt);
}

#[test]
fn test_invalid_decimal() {
    let json = format!(
        r#"{{"date": "2024-03-02", "shipping_cost": "vier", "product_id": ["{}"], "quantity": ["1"], "unit_price": ["1"]}}"#,
        Uuid::new_v4()
    );
    let err = parse(&json, &SubmissionDefaults::default()).unwrap_err();
    assert!(matches!(err, RefillError::InvalidDecimal { ref field, .. } if field == "shipping_cost"));
}
