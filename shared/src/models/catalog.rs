//! Reference data consumed by refills: products, suppliers and devices

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "product_category", rename_all = "snake_case"))]
pub enum ProductCategory {
    Coffee,
    Cups,
    Sugar,
    Milk,
    Snacks,
    Beverages,
    Stirrers,
    Cocoa,
    Tea,
    Cleaning,
    Other,
}

impl ProductCategory {
    pub fn label_de(&self) -> &'static str {
        match self {
            ProductCategory::Coffee => "Kaffee",
            ProductCategory::Cups => "Becher",
            ProductCategory::Sugar => "Zucker",
            ProductCategory::Milk => "Milch",
            ProductCategory::Snacks => "Snacks",
            ProductCategory::Beverages => "Getränke",
            ProductCategory::Stirrers => "Rührstäbchen",
            ProductCategory::Cocoa => "Kakao",
            ProductCategory::Tea => "Tee",
            ProductCategory::Cleaning => "Reinigung",
            ProductCategory::Other => "Sonstiges",
        }
    }
}

/// Units a product is stocked in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "product_unit", rename_all = "snake_case"))]
pub enum ProductUnit {
    Piece,
    Kg,
    Liter,
    Pack,
    Box,
    Gram,
    Ml,
}

impl std::fmt::Display for ProductUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductUnit::Piece => write!(f, "Stück"),
            ProductUnit::Kg => write!(f, "kg"),
            ProductUnit::Liter => write!(f, "l"),
            ProductUnit::Pack => write!(f, "Packung"),
            ProductUnit::Box => write!(f, "Kiste"),
            ProductUnit::Gram => write!(f, "g"),
            ProductUnit::Ml => write!(f, "ml"),
        }
    }
}

/// Product master data. Stock is never stored here; see
/// [`crate::models::inventory::derived_stock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    pub description: Option<String>,
    pub barcode: Option<String>,
    /// Article number at the supplier
    pub article_number: Option<String>,
    pub default_price: Option<Decimal>,
    /// Best purchase price seen so far
    pub min_price: Option<Decimal>,
    /// Highest purchase price seen so far
    pub max_price: Option<Decimal>,
    pub min_stock: Decimal,
    pub reorder_point: Option<Decimal>,
    pub max_stock: Option<Decimal>,
    /// Consumption per serving, e.g. 0.007 kg coffee per cup
    pub usage_per_serving: Option<Decimal>,
    pub default_supplier_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Supplier master data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    /// Our customer number at the supplier
    pub customer_number: Option<String>,
    pub payment_terms: Option<String>,
    pub delivery_time_days: Option<i32>,
    pub min_order_value: Option<Decimal>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vending machine types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "device_type", rename_all = "snake_case"))]
pub enum DeviceType {
    Coffee,
    Beverages,
    Snacks,
    Combo,
}

/// Operational state of a vending machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "device_status", rename_all = "snake_case"))]
pub enum DeviceStatus {
    #[default]
    Active,
    Maintenance,
    Inactive,
    Defect,
}

/// A vending machine that refills can be booked against
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&ProductCategory::Stirrers).unwrap();
        assert_eq!(json, "\"stirrers\"");
        let parsed: ProductCategory = serde_json::from_str("\"cocoa\"").unwrap();
        assert_eq!(parsed, ProductCategory::Cocoa);
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        assert!(serde_json::from_str::<ProductUnit>("\"bucket\"").is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(ProductCategory::Beverages.label_de(), "Getränke");
        assert_eq!(ProductUnit::Piece.to_string(), "Stück");
    }
}
