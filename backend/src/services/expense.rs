//! Expense bookkeeping: the refill bridge and expense listing

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{round_money, Expense, ExpenseCategory, NewExpense};

/// Expense service
#[derive(Clone)]
pub struct ExpenseService {
    db: PgPool,
}

/// Filters for the expense listing
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub device_id: Option<Uuid>,
}

/// Expense listing with its sum
#[derive(Debug, Serialize)]
pub struct ExpenseList {
    pub expenses: Vec<Expense>,
    pub total_amount: Decimal,
}

impl ExpenseService {
    /// Create a new ExpenseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Write a planned expense on the caller's transaction
    pub async fn insert(conn: &mut PgConnection, user_id: Uuid, expense: &NewExpense) -> AppResult<()> {
        if expense.amount < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Expense amount must not be negative".to_string(),
                message_de: "Betrag darf nicht negativ sein".to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, user_id, device_id, category, amount, date, description, supplier, invoice_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(expense.id)
        .bind(user_id)
        .bind(expense.device_id)
        .bind(expense.category)
        .bind(round_money(expense.amount))
        .bind(expense.date)
        .bind(&expense.description)
        .bind(&expense.supplier)
        .bind(&expense.invoice_number)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Remove a mirrored expense on the caller's transaction
    pub async fn delete(conn: &mut PgConnection, user_id: Uuid, expense_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(expense_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// List expenses, newest first
    pub async fn list(&self, user_id: Uuid, filter: &ExpenseFilter) -> AppResult<ExpenseList> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT * FROM expenses
            WHERE user_id = $1
              AND ($2::expense_category IS NULL OR category = $2)
              AND ($3::date IS NULL OR date >= $3)
              AND ($4::date IS NULL OR date <= $4)
              AND ($5::uuid IS NULL OR device_id = $5)
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.category)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.device_id)
        .fetch_all(&self.db)
        .await?;

        let total_amount = expenses.iter().map(|e| e.amount).sum();

        Ok(ExpenseList {
            expenses,
            total_amount,
        })
    }
}
