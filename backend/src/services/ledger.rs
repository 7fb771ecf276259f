//! Inventory ledger: appends stock movements and answers stock queries
//!
//! Stock is never stored. Every figure here is the signed sum of the
//! movement log, using the same sign table as `shared::MovementType::sign`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    average_purchase_price, classify_stock, stocktaking_movement, suggested_order_quantity,
    validate_column, InventoryMovement, MovementType, NewMovement, Product, ProductUnit,
    StockStatus, QUANTITY_COLUMN, REASON_STOCKTAKING,
};

/// Signed quantity expression for aggregate queries
const SIGNED_QUANTITY: &str =
    "CASE WHEN movement_type IN ('IN', 'ADJUSTMENT') THEN quantity ELSE -quantity END";

/// Counts must be non-negative, fit `numeric(12,3)` and name each product
/// once: every correction is computed against the stock before the count.
fn validate_counts(counts: &[StockCount]) -> AppResult<()> {
    if counts.is_empty() {
        return Err(AppError::Validation {
            field: "counts".to_string(),
            message: "At least one count is required".to_string(),
            message_de: "Mindestens eine Zählung ist erforderlich".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(counts.len());
    for count in counts {
        if count.counted < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "counted".to_string(),
                message: "Counted quantity must not be negative".to_string(),
                message_de: "Gezählte Menge darf nicht negativ sein".to_string(),
            });
        }
        validate_column("counted", count.counted, QUANTITY_COLUMN)?;
        if !seen.insert(count.product_id) {
            return Err(AppError::Validation {
                field: "counts".to_string(),
                message: format!("Product {} is counted more than once", count.product_id),
                message_de: format!("Produkt {} wurde mehrfach gezählt", count.product_id),
            });
        }
    }
    Ok(())
}

/// Inventory ledger service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Stock of one product, optionally at one device
#[derive(Debug, Clone, Serialize)]
pub struct ProductStock {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: ProductUnit,
    pub device_id: Option<Uuid>,
    pub stock: Decimal,
    pub status: StockStatus,
    pub suggested_order_quantity: Decimal,
}

/// Low-stock alert entry
#[derive(Debug, Clone, Serialize)]
pub struct LowStockAlert {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: ProductUnit,
    pub stock: Decimal,
    pub min_stock: Decimal,
    pub reorder_point: Option<Decimal>,
    pub status: StockStatus,
    pub suggested_order_quantity: Decimal,
    pub default_supplier_id: Option<Uuid>,
}

/// Physical count of one product
#[derive(Debug, Clone, Deserialize)]
pub struct StockCount {
    pub product_id: Uuid,
    pub counted: Decimal,
}

/// Input for a stocktaking run
#[derive(Debug, Clone, Deserialize)]
pub struct StocktakingInput {
    pub device_id: Option<Uuid>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub counts: Vec<StockCount>,
}

/// Outcome for one counted product
#[derive(Debug, Clone, Serialize)]
pub struct StocktakingLine {
    pub product_id: Uuid,
    pub previous_stock: Decimal,
    pub counted: Decimal,
    pub difference: Decimal,
    /// `None` when the count matched the ledger
    pub movement_type: Option<MovementType>,
}

/// Average purchase price of a product over its posted refill lines
#[derive(Debug, Clone, Serialize)]
pub struct AveragePrice {
    pub product_id: Uuid,
    pub average_price: Decimal,
    pub line_count: usize,
    /// True when no posted lines exist and the default price was used
    pub from_default_price: bool,
}

/// Ledger row for CSV export
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementExportRow {
    pub created_at: DateTime<Utc>,
    pub product_name: String,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub signed_quantity: Decimal,
    pub device_name: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append planned movements on the caller's transaction. Any failure
    /// (e.g. a stale product id) aborts the caller's transaction.
    pub async fn append_movements(
        conn: &mut PgConnection,
        user_id: Uuid,
        movements: &[NewMovement],
    ) -> AppResult<()> {
        for movement in movements {
            sqlx::query(
                r#"
                INSERT INTO inventory_movements (
                    id, user_id, product_id, device_id, refill_item_id,
                    movement_type, quantity, reason, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(movement.id)
            .bind(user_id)
            .bind(movement.product_id)
            .bind(movement.device_id)
            .bind(movement.refill_item_id)
            .bind(movement.movement_type)
            .bind(movement.quantity)
            .bind(&movement.reason)
            .bind(&movement.notes)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Derived stock of a product, optionally restricted to one device
    pub async fn stock_of<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        product_id: Uuid,
        device_id: Option<Uuid>,
    ) -> AppResult<Decimal> {
        let stock = sqlx::query_scalar::<_, Decimal>(&format!(
            r#"
            SELECT COALESCE(SUM({}), 0)
            FROM inventory_movements
            WHERE user_id = $1 AND product_id = $2
              AND ($3::uuid IS NULL OR device_id = $3)
            "#,
            SIGNED_QUANTITY
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(device_id)
        .fetch_one(executor)
        .await?;
        Ok(stock)
    }

    async fn product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Stock level and status of one product
    pub async fn get_product_stock(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        device_id: Option<Uuid>,
    ) -> AppResult<ProductStock> {
        let product = self.product(user_id, product_id).await?;
        let stock = Self::stock_of(&self.db, user_id, product_id, device_id).await?;

        Ok(ProductStock {
            product_id,
            product_name: product.name.clone(),
            unit: product.unit,
            device_id,
            stock,
            status: classify_stock(&product, stock),
            suggested_order_quantity: suggested_order_quantity(&product, stock),
        })
    }

    /// Ledger entries of one product, newest first
    pub async fn list_movements(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<InventoryMovement>> {
        self.product(user_id, product_id).await?;

        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT * FROM inventory_movements
            WHERE user_id = $1 AND product_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Active products that are empty, below minimum or at the reorder point
    pub async fn low_stock(&self, user_id: Uuid) -> AppResult<Vec<LowStockAlert>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE user_id = $1 AND is_active ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let stocks: std::collections::HashMap<Uuid, Decimal> =
            sqlx::query_as::<_, (Uuid, Decimal)>(&format!(
                r#"
                SELECT product_id, COALESCE(SUM({}), 0)
                FROM inventory_movements
                WHERE user_id = $1
                GROUP BY product_id
                "#,
                SIGNED_QUANTITY
            ))
            .bind(user_id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .collect();

        let alerts = products
            .into_iter()
            .filter_map(|product| {
                let stock = stocks.get(&product.id).copied().unwrap_or(Decimal::ZERO);
                let status = classify_stock(&product, stock);
                status.needs_reorder().then(|| LowStockAlert {
                    product_id: product.id,
                    suggested_order_quantity: suggested_order_quantity(&product, stock),
                    product_name: product.name,
                    unit: product.unit,
                    stock,
                    min_stock: product.min_stock,
                    reorder_point: product.reorder_point,
                    status,
                    default_supplier_id: product.default_supplier_id,
                })
            })
            .collect();

        Ok(alerts)
    }

    /// Bring the ledger in line with a physical count. All corrections are
    /// written in one transaction.
    pub async fn stocktaking(
        &self,
        user_id: Uuid,
        input: StocktakingInput,
    ) -> AppResult<Vec<StocktakingLine>> {
        validate_counts(&input.counts)?;

        let product_ids: Vec<Uuid> = input.counts.iter().map(|c| c.product_id).collect();
        let owned = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT id) FROM products WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(&product_ids)
        .fetch_one(&self.db)
        .await?;
        if owned as usize != product_ids.len() {
            return Err(AppError::NotFound("Product".to_string()));
        }

        if let Some(device_id) = input.device_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM devices WHERE id = $1 AND user_id = $2)",
            )
            .bind(device_id)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Device".to_string()));
            }
        }

        let reason = input
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| REASON_STOCKTAKING.to_string());

        let mut tx = self.db.begin().await?;
        let mut lines = Vec::with_capacity(input.counts.len());
        let mut movements = Vec::new();

        for count in &input.counts {
            let previous =
                Self::stock_of(&mut *tx, user_id, count.product_id, input.device_id).await?;
            let correction = stocktaking_movement(previous, count.counted);

            if let Some((movement_type, quantity)) = correction {
                movements.push(NewMovement {
                    id: Uuid::new_v4(),
                    product_id: count.product_id,
                    device_id: input.device_id,
                    refill_item_id: None,
                    movement_type,
                    quantity,
                    reason: reason.clone(),
                    notes: input.notes.clone(),
                });
            }

            lines.push(StocktakingLine {
                product_id: count.product_id,
                previous_stock: previous,
                counted: count.counted,
                difference: count.counted - previous,
                movement_type: correction.map(|(kind, _)| kind),
            });
        }

        Self::append_movements(&mut *tx, user_id, &movements).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            counted = lines.len(),
            corrections = movements.len(),
            "Stocktaking recorded"
        );

        Ok(lines)
    }

    /// Weighted average purchase price over posted refill lines
    pub async fn average_price(&self, user_id: Uuid, product_id: Uuid) -> AppResult<AveragePrice> {
        let product = self.product(user_id, product_id).await?;

        let lines = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT ri.total_price, ri.quantity
            FROM refill_items ri
            JOIN refills r ON r.id = ri.refill_id
            WHERE r.user_id = $1 AND ri.product_id = $2 AND r.status = 'posted'
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(AveragePrice {
            product_id,
            average_price: average_purchase_price(&lines, product.default_price).round_dp(4),
            line_count: lines.len(),
            from_default_price: lines.is_empty(),
        })
    }

    /// Full ledger for CSV export, oldest first
    pub async fn export_rows(&self, user_id: Uuid) -> AppResult<Vec<MovementExportRow>> {
        let rows = sqlx::query_as::<_, MovementExportRow>(&format!(
            r#"
            SELECT m.created_at, p.name AS product_name, m.movement_type, m.quantity,
                   m.signed_quantity, d.name AS device_name, m.reason, m.notes
            FROM (SELECT *, {} AS signed_quantity FROM inventory_movements WHERE user_id = $1) m
            JOIN products p ON p.id = m.product_id
            LEFT JOIN devices d ON d.id = m.device_id
            ORDER BY m.created_at
            "#,
            SIGNED_QUANTITY
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
