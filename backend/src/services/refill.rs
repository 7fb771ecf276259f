//! Refill service: submission, lifecycle and queries
//!
//! A submission is parsed, checked against the operator's catalog and turned
//! into a posting plan before the transaction opens. The transaction then
//! only executes the plan: expense, refill header, items, ledger entries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    calculate_totals, plan_post, plan_refill, plan_void, validate_refill_amounts, PostingPlan,
    PricingInput, ProductUnit, Refill, RefillDraft, RefillItem, RefillStatus, RefillSubmission,
    RefillTotals, SubmissionDefaults,
};
use crate::services::catalog::CatalogService;
use crate::services::expense::ExpenseService;
use crate::services::ledger::LedgerService;

/// Refill service
#[derive(Clone)]
pub struct RefillService {
    db: PgPool,
}

/// Filters for the refill listing
#[derive(Debug, Default, Deserialize)]
pub struct RefillFilter {
    pub status: Option<RefillStatus>,
    pub supplier_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One row of the refill listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RefillSummary {
    pub id: Uuid,
    pub date: NaiveDate,
    pub status: RefillStatus,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub device_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub invoice_number: Option<String>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Refill line with its product
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RefillItemDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: RefillItem,
    pub product_name: String,
    pub unit: ProductUnit,
}

/// Refill header with its lines and savings
#[derive(Debug, Clone, Serialize)]
pub struct RefillDetail {
    #[serde(flatten)]
    pub refill: Refill,
    pub supplier_name: Option<String>,
    pub device_name: Option<String>,
    pub items: Vec<RefillItemDetail>,
    pub line_discount_total: Decimal,
    /// Line discounts plus the order discount
    pub total_savings: Decimal,
}

impl RefillService {
    /// Create a new RefillService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Run the calculator without writing anything
    pub fn preview(input: &PricingInput) -> AppResult<RefillTotals> {
        validate_refill_amounts(input)?;
        Ok(calculate_totals(input)?)
    }

    /// Record a refill submission. Posted unless the submission asks for a
    /// draft. Either everything is written or nothing is.
    pub async fn create(
        &self,
        user_id: Uuid,
        submission: &RefillSubmission,
        defaults: &SubmissionDefaults,
    ) -> AppResult<RefillDetail> {
        let draft = submission.parse(defaults)?;
        let refs = CatalogService::new(self.db.clone())
            .owned_references(user_id, &draft)
            .await?;
        let plan = plan_refill(&draft, &refs)?;

        self.ensure_unique_invoice(user_id, &draft).await?;

        let mut tx = self.db.begin().await?;

        if let Some(posting) = &plan.posting {
            ExpenseService::insert(&mut *tx, user_id, &posting.expense).await?;
        }
        Self::insert_refill(&mut *tx, user_id, &draft, &plan).await?;
        Self::insert_items(&mut *tx, &plan).await?;
        LedgerService::append_movements(&mut *tx, user_id, plan.movements()).await?;

        tx.commit().await?;

        tracing::info!(
            refill_id = %plan.refill_id,
            user_id = %user_id,
            status = plan.status.as_str(),
            lines = plan.items.len(),
            total = %plan.totals.total_amount,
            "Refill recorded"
        );

        self.get(user_id, plan.refill_id).await
    }

    async fn ensure_unique_invoice(&self, user_id: Uuid, draft: &RefillDraft) -> AppResult<()> {
        let (Some(supplier_id), Some(invoice_number)) = (draft.supplier_id, &draft.invoice_number)
        else {
            return Ok(());
        };

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM refills
                WHERE user_id = $1 AND supplier_id = $2 AND invoice_number = $3
                  AND status <> 'voided'
            )
            "#,
        )
        .bind(user_id)
        .bind(supplier_id)
        .bind(invoice_number)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::Conflict {
                resource: "invoice_number".to_string(),
                message: format!("Invoice {} is already recorded for this supplier", invoice_number),
                message_de: format!(
                    "Rechnung {} ist für diesen Lieferanten bereits erfasst",
                    invoice_number
                ),
            });
        }
        Ok(())
    }

    async fn insert_refill(
        conn: &mut PgConnection,
        user_id: Uuid,
        draft: &RefillDraft,
        plan: &PostingPlan,
    ) -> AppResult<()> {
        let posted_at = plan.posting.as_ref().map(|_| Utc::now());

        sqlx::query(
            r#"
            INSERT INTO refills (
                id, user_id, date, supplier_id, device_id, order_number, invoice_number,
                delivery_note, shipping_cost, deposit_amount, tax_rate, prices_include_tax,
                discount_amount, discount_reason, subtotal, tax_amount, total_amount,
                receipt_filename, receipt_data, notes, status, posted_at, expense_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23
            )
            "#,
        )
        .bind(plan.refill_id)
        .bind(user_id)
        .bind(draft.date)
        .bind(draft.supplier_id)
        .bind(draft.device_id)
        .bind(&draft.order_number)
        .bind(&draft.invoice_number)
        .bind(&draft.delivery_note)
        .bind(plan.totals.shipping_cost)
        .bind(plan.totals.deposit_amount)
        .bind(draft.tax_rate)
        .bind(draft.prices_include_tax)
        .bind(plan.totals.discount_amount)
        .bind(&draft.discount_reason)
        .bind(plan.totals.subtotal)
        .bind(plan.totals.tax_amount)
        .bind(plan.totals.total_amount)
        .bind(draft.receipt.as_ref().and_then(|r| r.filename.clone()))
        .bind(draft.receipt.as_ref().map(|r| r.data.clone()))
        .bind(&draft.notes)
        .bind(plan.status)
        .bind(posted_at)
        .bind(plan.expense_id())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::DuplicateEntry("invoice_number".to_string());
                }
            }
            AppError::DatabaseError(e)
        })?;

        Ok(())
    }

    async fn insert_items(conn: &mut PgConnection, plan: &PostingPlan) -> AppResult<()> {
        for item in &plan.items {
            sqlx::query(
                r#"
                INSERT INTO refill_items (
                    id, refill_id, product_id, line_no, quantity, unit_price, line_discount,
                    line_discount_reason, total_price, batch_number, expiry_date
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(item.id)
            .bind(plan.refill_id)
            .bind(item.product_id)
            .bind(item.line_no)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_discount)
            .bind(&item.line_discount_reason)
            .bind(item.total_price)
            .bind(&item.batch_number)
            .bind(item.expiry_date)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// List refills, newest first
    pub async fn list(&self, user_id: Uuid, filter: &RefillFilter) -> AppResult<Vec<RefillSummary>> {
        let refills = sqlx::query_as::<_, RefillSummary>(
            r#"
            SELECT r.id, r.date, r.status, r.supplier_id, s.name AS supplier_name,
                   r.device_id, d.name AS device_name, r.invoice_number,
                   r.subtotal, r.tax_amount, r.total_amount,
                   (SELECT COUNT(*) FROM refill_items ri WHERE ri.refill_id = r.id) AS item_count,
                   r.created_at
            FROM refills r
            LEFT JOIN suppliers s ON s.id = r.supplier_id
            LEFT JOIN devices d ON d.id = r.device_id
            WHERE r.user_id = $1
              AND ($2::refill_status IS NULL OR r.status = $2)
              AND ($3::uuid IS NULL OR r.supplier_id = $3)
              AND ($4::uuid IS NULL OR r.device_id = $4)
              AND ($5::date IS NULL OR r.date >= $5)
              AND ($6::date IS NULL OR r.date <= $6)
            ORDER BY r.date DESC, r.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.supplier_id)
        .bind(filter.device_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(refills)
    }

    async fn header(&self, user_id: Uuid, refill_id: Uuid) -> AppResult<Refill> {
        sqlx::query_as::<_, Refill>("SELECT * FROM refills WHERE id = $1 AND user_id = $2")
            .bind(refill_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Refill".to_string()))
    }

    async fn lock_header(conn: &mut PgConnection, user_id: Uuid, refill_id: Uuid) -> AppResult<Refill> {
        sqlx::query_as::<_, Refill>(
            "SELECT * FROM refills WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(refill_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Refill".to_string()))
    }

    async fn items(conn: &mut PgConnection, refill_id: Uuid) -> AppResult<Vec<RefillItem>> {
        let items = sqlx::query_as::<_, RefillItem>(
            "SELECT * FROM refill_items WHERE refill_id = $1 ORDER BY line_no",
        )
        .bind(refill_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(items)
    }

    /// Refill with its lines, product names and savings
    pub async fn get(&self, user_id: Uuid, refill_id: Uuid) -> AppResult<RefillDetail> {
        let refill = self.header(user_id, refill_id).await?;

        let items = sqlx::query_as::<_, RefillItemDetail>(
            r#"
            SELECT ri.*, p.name AS product_name, p.unit
            FROM refill_items ri
            JOIN products p ON p.id = ri.product_id
            WHERE ri.refill_id = $1
            ORDER BY ri.line_no
            "#,
        )
        .bind(refill_id)
        .fetch_all(&self.db)
        .await?;

        let (supplier_name, device_name) = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            r#"
            SELECT
                (SELECT name FROM suppliers WHERE id = $1),
                (SELECT name FROM devices WHERE id = $2)
            "#,
        )
        .bind(refill.supplier_id)
        .bind(refill.device_id)
        .fetch_one(&self.db)
        .await?;

        let line_discount_total: Decimal = items.iter().map(|i| i.item.line_discount).sum();
        let total_savings = line_discount_total + refill.discount_amount;

        Ok(RefillDetail {
            refill,
            supplier_name,
            device_name,
            items,
            line_discount_total,
            total_savings,
        })
    }

    /// Post a stored draft: ledger entries and expense are written with the
    /// totals saved on the draft
    pub async fn post(&self, user_id: Uuid, refill_id: Uuid) -> AppResult<RefillDetail> {
        let mut tx = self.db.begin().await?;

        let refill = Self::lock_header(&mut *tx, user_id, refill_id).await?;
        if !refill.status.can_post() {
            return Err(AppError::InvalidStateTransition {
                message: format!("Refill is {} and cannot be posted", refill.status.as_str()),
                message_de: "Nur Entwürfe können gebucht werden".to_string(),
            });
        }

        let items = Self::items(&mut *tx, refill_id).await?;
        let supplier_name = match refill.supplier_id {
            Some(supplier_id) => {
                sqlx::query_scalar::<_, String>("SELECT name FROM suppliers WHERE id = $1")
                    .bind(supplier_id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let posting = plan_post(&refill, &items, supplier_name);

        ExpenseService::insert(&mut *tx, user_id, &posting.expense).await?;
        LedgerService::append_movements(&mut *tx, user_id, &posting.movements).await?;

        sqlx::query(
            r#"
            UPDATE refills
            SET status = 'posted', posted_at = NOW(), expense_id = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(posting.expense.id)
        .bind(refill_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            refill_id = %refill_id,
            lines = items.len(),
            total = %refill.total_amount,
            "Refill draft posted"
        );

        self.get(user_id, refill_id).await
    }

    /// Void a posted refill. Compensating OUT entries bring the stock back;
    /// the mirrored expense is removed. The original entries stay.
    pub async fn void(&self, user_id: Uuid, refill_id: Uuid) -> AppResult<RefillDetail> {
        let mut tx = self.db.begin().await?;

        let refill = Self::lock_header(&mut *tx, user_id, refill_id).await?;
        if !refill.status.can_void() {
            return Err(AppError::InvalidStateTransition {
                message: format!("Refill is {} and cannot be voided", refill.status.as_str()),
                message_de: "Nur gebuchte Nachfüllungen können storniert werden".to_string(),
            });
        }

        let items = Self::items(&mut *tx, refill_id).await?;
        let movements = plan_void(&refill, &items);
        LedgerService::append_movements(&mut *tx, user_id, &movements).await?;

        sqlx::query(
            r#"
            UPDATE refills
            SET status = 'voided', voided_at = NOW(), expense_id = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(refill_id)
        .execute(&mut *tx)
        .await?;

        if let Some(expense_id) = refill.expense_id {
            ExpenseService::delete(&mut *tx, user_id, expense_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            refill_id = %refill_id,
            lines = items.len(),
            total = %refill.total_amount,
            "Refill voided"
        );

        self.get(user_id, refill_id).await
    }

    /// Delete a draft together with its lines
    pub async fn delete(&self, user_id: Uuid, refill_id: Uuid) -> AppResult<()> {
        let refill = self.header(user_id, refill_id).await?;
        if !refill.status.can_delete() {
            return Err(AppError::InvalidStateTransition {
                message: "Only drafts can be deleted; void a posted refill instead".to_string(),
                message_de: "Nur Entwürfe können gelöscht werden, gebuchte Nachfüllungen bitte stornieren"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM refills WHERE id = $1 AND user_id = $2 AND status = 'draft'")
            .bind(refill_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(refill_id = %refill_id, "Refill draft deleted");
        Ok(())
    }
}
