//! Bookkeeping expense models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Expense categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "expense_category", rename_all = "snake_case"))]
pub enum ExpenseCategory {
    Acquisition,
    ChangeMoney,
    Maintenance,
    Repair,
    Refill,
    Electricity,
    Rent,
    Insurance,
    Cleaning,
    Other,
}

impl ExpenseCategory {
    pub fn label_de(&self) -> &'static str {
        match self {
            ExpenseCategory::Acquisition => "Anschaffung",
            ExpenseCategory::ChangeMoney => "Wechselgeld",
            ExpenseCategory::Maintenance => "Wartung",
            ExpenseCategory::Repair => "Reparatur",
            ExpenseCategory::Refill => "Nachfüllung",
            ExpenseCategory::Electricity => "Strom",
            ExpenseCategory::Rent => "Miete",
            ExpenseCategory::Insurance => "Versicherung",
            ExpenseCategory::Cleaning => "Reinigung",
            ExpenseCategory::Other => "Sonstiges",
        }
    }
}

/// A booked expense
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An expense that has been planned but not yet written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    pub id: Uuid,
    pub device_id: Option<Uuid>,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
}

/// Description written on the expense mirrored from a refill
pub fn refill_expense_description(line_count: usize) -> String {
    format!("Nachfüllung - {} Produkte", line_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refill_expense_description() {
        assert_eq!(refill_expense_description(3), "Nachfüllung - 3 Produkte");
    }

    #[test]
    fn test_category_wire_name() {
        assert_eq!(serde_json::to_string(&ExpenseCategory::ChangeMoney).unwrap(), "\"change_money\"");
        assert_eq!(ExpenseCategory::Refill.label_de(), "Nachfüllung");
    }
}
