//! Inventory ledger models and derived stock

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Product;

/// Ledger reason written for goods received through a refill
pub const REASON_REFILL: &str = "Nachfüllung";

/// Ledger reason written when a posted refill is voided
pub const REASON_REFILL_VOID: &str = "Storno Nachfüllung";

/// Default ledger reason for stocktaking corrections
pub const REASON_STOCKTAKING: &str = "Manuelle Inventur";

/// Kind of stock movement. The quantity on a movement is always a
/// magnitude; the type decides the sign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MovementType {
    /// Goods received
    In,
    /// Goods consumed or returned
    Out,
    /// Stocktaking found more than the ledger says
    Adjustment,
    /// Stocktaking found less than the ledger says
    Correction,
}

impl MovementType {
    /// +1 for movements that add stock, -1 for those that remove it
    pub fn sign(&self) -> Decimal {
        match self {
            MovementType::In | MovementType::Adjustment => Decimal::ONE,
            MovementType::Out | MovementType::Correction => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Correction => "CORRECTION",
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub device_id: Option<Uuid>,
    /// Originating refill line, kept as history when the line is removed
    pub refill_item_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn signed_quantity(&self) -> Decimal {
        self.movement_type.sign() * self.quantity
    }
}

/// A ledger entry that has been planned but not yet written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub device_id: Option<Uuid>,
    pub refill_item_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reason: String,
    pub notes: Option<String>,
}

impl NewMovement {
    pub fn signed_quantity(&self) -> Decimal {
        self.movement_type.sign() * self.quantity
    }
}

/// Current stock of a product: the signed sum of its movements, optionally
/// restricted to one device. A movement without a device only counts
/// towards the overall stock.
pub fn derived_stock(movements: &[InventoryMovement], product_id: Uuid, device_id: Option<Uuid>) -> Decimal {
    movements
        .iter()
        .filter(|m| m.product_id == product_id)
        .filter(|m| device_id.is_none() || m.device_id == device_id)
        .map(InventoryMovement::signed_quantity)
        .sum()
}

/// Stock situation of a product relative to its limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Empty,
    BelowMinimum,
    Reorder,
    Ok,
    Overstock,
}

impl StockStatus {
    /// Whether the product should show up in low-stock alerts
    pub fn needs_reorder(&self) -> bool {
        matches!(self, StockStatus::Empty | StockStatus::BelowMinimum | StockStatus::Reorder)
    }
}

/// Classify a stock level against the product limits
pub fn classify_stock(product: &Product, stock: Decimal) -> StockStatus {
    if stock <= Decimal::ZERO {
        return StockStatus::Empty;
    }
    if stock < product.min_stock {
        return StockStatus::BelowMinimum;
    }
    if let Some(reorder_point) = product.reorder_point {
        if stock <= reorder_point {
            return StockStatus::Reorder;
        }
    }
    if let Some(max_stock) = product.max_stock {
        if stock > max_stock {
            return StockStatus::Overstock;
        }
    }
    StockStatus::Ok
}

/// Quantity to order to fill up to max stock, or back to the reorder point
/// when no max is configured
pub fn suggested_order_quantity(product: &Product, stock: Decimal) -> Decimal {
    let target = product
        .max_stock
        .or(product.reorder_point)
        .unwrap_or(product.min_stock);
    (target - stock).max(Decimal::ZERO)
}

/// Movement needed to bring the ledger in line with a physical count.
/// Returns `None` when the count matches.
pub fn stocktaking_movement(current: Decimal, counted: Decimal) -> Option<(MovementType, Decimal)> {
    let difference = counted - current;
    if difference > Decimal::ZERO {
        Some((MovementType::Adjustment, difference))
    } else if difference < Decimal::ZERO {
        Some((MovementType::Correction, difference.abs()))
    } else {
        None
    }
}

/// Weighted average purchase price over `(line_total, quantity)` pairs,
/// falling back to the product's default price
pub fn average_purchase_price(lines: &[(Decimal, Decimal)], default_price: Option<Decimal>) -> Decimal {
    let total_value: Decimal = lines.iter().map(|(value, _)| *value).sum();
    let total_quantity: Decimal = lines.iter().map(|(_, qty)| *qty).sum();

    if lines.is_empty() || total_quantity <= Decimal::ZERO {
        return default_price.unwrap_or(Decimal::ZERO);
    }
    total_value / total_quantity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductCategory, ProductUnit};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn movement(product_id: Uuid, device_id: Option<Uuid>, kind: MovementType, qty: &str) -> InventoryMovement {
        InventoryMovement {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            product_id,
            device_id,
            refill_item_id: None,
            movement_type: kind,
            quantity: dec(qty),
            reason: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn product(min: &str, reorder: Option<&str>, max: Option<&str>) -> Product {
        Product {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: "Bohnen".to_string(),
            category: ProductCategory::Coffee,
            unit: ProductUnit::Kg,
            description: None,
            barcode: None,
            article_number: None,
            default_price: None,
            min_price: None,
            max_price: None,
            min_stock: dec(min),
            reorder_point: reorder.map(dec),
            max_stock: max.map(dec),
            usage_per_serving: None,
            default_supplier_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_table() {
        assert_eq!(MovementType::In.sign(), Decimal::ONE);
        assert_eq!(MovementType::Adjustment.sign(), Decimal::ONE);
        assert_eq!(MovementType::Out.sign(), Decimal::NEGATIVE_ONE);
        assert_eq!(MovementType::Correction.sign(), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn test_derived_stock_overall_and_per_device() {
        let product_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let device = Uuid::new_v4();
        let movements = vec![
            movement(product_id, Some(device), MovementType::In, "10"),
            movement(product_id, None, MovementType::In, "5"),
            movement(product_id, Some(device), MovementType::Out, "3"),
            movement(product_id, None, MovementType::Correction, "1"),
            movement(other, Some(device), MovementType::In, "100"),
        ];

        assert_eq!(derived_stock(&movements, product_id, None), dec("11"));
        assert_eq!(derived_stock(&movements, product_id, Some(device)), dec("7"));
        assert_eq!(derived_stock(&[], product_id, None), Decimal::ZERO);
    }

    #[test]
    fn test_classify_stock() {
        let p = product("2", Some("5"), Some("20"));
        assert_eq!(classify_stock(&p, dec("0")), StockStatus::Empty);
        assert_eq!(classify_stock(&p, dec("1")), StockStatus::BelowMinimum);
        assert_eq!(classify_stock(&p, dec("5")), StockStatus::Reorder);
        assert_eq!(classify_stock(&p, dec("10")), StockStatus::Ok);
        assert_eq!(classify_stock(&p, dec("21")), StockStatus::Overstock);
        assert!(StockStatus::Reorder.needs_reorder());
        assert!(!StockStatus::Overstock.needs_reorder());
    }

    #[test]
    fn test_suggested_order_quantity() {
        assert_eq!(suggested_order_quantity(&product("2", Some("5"), Some("20")), dec("4")), dec("16"));
        assert_eq!(suggested_order_quantity(&product("2", Some("5"), None), dec("4")), dec("1"));
        assert_eq!(suggested_order_quantity(&product("2", None, None), dec("4")), Decimal::ZERO);
    }

    #[test]
    fn test_stocktaking_movement() {
        assert_eq!(stocktaking_movement(dec("10"), dec("12.5")), Some((MovementType::Adjustment, dec("2.5"))));
        assert_eq!(stocktaking_movement(dec("10"), dec("7")), Some((MovementType::Correction, dec("3"))));
        assert_eq!(stocktaking_movement(dec("10"), dec("10.000")), None);
    }

    #[test]
    fn test_average_purchase_price() {
        let lines = vec![(dec("12.00"), dec("10")), (dec("10.00"), dec("5"))];
        assert_eq!(average_purchase_price(&lines, None).round_dp(4), dec("1.4667"));
        assert_eq!(average_purchase_price(&[], Some(dec("1.10"))), dec("1.10"));
        assert_eq!(average_purchase_price(&[], None), Decimal::ZERO);
    }
}
