//! Reporting service for supplier statistics and CSV exports

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{round_money, RefillStatus};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Purchase statistics of one supplier over its posted refills
#[derive(Debug, Serialize)]
pub struct SupplierStatistics {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub refill_count: i64,
    pub total_spent: Decimal,
    pub average_order_value: Decimal,
    pub last_refill_date: Option<NaiveDate>,
}

/// Refill row for CSV export
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RefillExportRow {
    pub date: NaiveDate,
    pub status: RefillStatus,
    pub supplier: Option<String>,
    pub device: Option<String>,
    pub invoice_number: Option<String>,
    pub item_count: i64,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub deposit_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

/// Date range for exports
#[derive(Debug, Default, Deserialize)]
pub struct ExportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub format: Option<String>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Statistics for one supplier. Drafts and voided refills are not counted.
    pub async fn supplier_statistics(
        &self,
        user_id: Uuid,
        supplier_id: Uuid,
    ) -> AppResult<SupplierStatistics> {
        let supplier_name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM suppliers WHERE id = $1 AND user_id = $2",
        )
        .bind(supplier_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        let (refill_count, total_spent, last_refill_date) =
            sqlx::query_as::<_, (i64, Decimal, Option<NaiveDate>)>(
                r#"
                SELECT COUNT(*), COALESCE(SUM(total_amount), 0), MAX(date)
                FROM refills
                WHERE user_id = $1 AND supplier_id = $2 AND status = 'posted'
                "#,
            )
            .bind(user_id)
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;

        let average_order_value = if refill_count > 0 {
            round_money(total_spent / Decimal::from(refill_count))
        } else {
            Decimal::ZERO
        };

        Ok(SupplierStatistics {
            supplier_id,
            supplier_name,
            refill_count,
            total_spent,
            average_order_value,
            last_refill_date,
        })
    }

    /// Refills in a date range, oldest first
    pub async fn refill_export_rows(
        &self,
        user_id: Uuid,
        filter: &ExportFilter,
    ) -> AppResult<Vec<RefillExportRow>> {
        let rows = sqlx::query_as::<_, RefillExportRow>(
            r#"
            SELECT r.date, r.status, s.name AS supplier, d.name AS device, r.invoice_number,
                   (SELECT COUNT(*) FROM refill_items ri WHERE ri.refill_id = r.id) AS item_count,
                   r.subtotal, r.tax_amount, r.shipping_cost, r.deposit_amount,
                   r.discount_amount, r.total_amount
            FROM refills r
            LEFT JOIN suppliers s ON s.id = r.supplier_id
            LEFT JOIN devices d ON d.id = r.device_id
            WHERE r.user_id = $1
              AND ($2::date IS NULL OR r.date >= $2)
              AND ($3::date IS NULL OR r.date <= $3)
            ORDER BY r.date, r.created_at
            "#,
        )
        .bind(user_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_export_to_csv_writes_header_and_rows() {
        let rows = vec![RefillExportRow {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: RefillStatus::Posted,
            supplier: Some("Metro".to_string()),
            device: None,
            invoice_number: Some("RE-1001".to_string()),
            item_count: 2,
            subtotal: Decimal::from_str("14.17").unwrap(),
            tax_amount: Decimal::from_str("2.83").unwrap(),
            shipping_cost: Decimal::from_str("3.00").unwrap(),
            deposit_amount: Decimal::from_str("1.00").unwrap(),
            discount_amount: Decimal::from_str("2.00").unwrap(),
            total_amount: Decimal::from_str("21.00").unwrap(),
        }];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("date,status,supplier,device,invoice_number,item_count,subtotal,tax_amount,shipping_cost,deposit_amount,discount_amount,total_amount")
        );
        assert_eq!(
            lines.next(),
            Some("2024-03-01,posted,Metro,,RE-1001,2,14.17,2.83,3.00,1.00,2.00,21.00")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_empty() {
        let rows: Vec<RefillExportRow> = Vec::new();
        assert_eq!(ReportingService::export_to_csv(&rows).unwrap(), "");
    }
}
