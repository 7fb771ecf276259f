//! Catalog service: products, suppliers and devices
//!
//! Every row is owned by one operator; lookups by a foreign id behave like
//! missing rows.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::models::{
    Device, DeviceStatus, DeviceType, OwnedReferences, Product, ProductCategory, ProductUnit,
    RefillDraft, Supplier,
};

/// Catalog service for products, suppliers and devices
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

fn validate_not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// Inputs
// ============================================================================

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub barcode: Option<String>,
    #[validate(length(max = 100))]
    pub article_number: Option<String>,
    #[validate(custom = "validate_not_negative")]
    pub default_price: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub min_stock: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub reorder_point: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub max_stock: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub usage_per_serving: Option<Decimal>,
    pub default_supplier_id: Option<Uuid>,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub unit: Option<ProductUnit>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub barcode: Option<String>,
    #[validate(length(max = 100))]
    pub article_number: Option<String>,
    #[validate(custom = "validate_not_negative")]
    pub default_price: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub min_stock: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub reorder_point: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub max_stock: Option<Decimal>,
    #[validate(custom = "validate_not_negative")]
    pub usage_per_serving: Option<Decimal>,
    pub default_supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Input for creating or updating a supplier
#[derive(Debug, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub customer_number: Option<String>,
    #[validate(length(max = 200))]
    pub payment_terms: Option<String>,
    #[validate(range(min = 0, max = 365))]
    pub delivery_time_days: Option<i32>,
    #[validate(custom = "validate_not_negative")]
    pub min_order_value: Option<Decimal>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for creating a device
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeviceInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub device_type: DeviceType,
    pub status: Option<DeviceStatus>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating a device
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDeviceInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub device_type: Option<DeviceType>,
    pub status: Option<DeviceStatus>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    pub notes: Option<String>,
}

fn check_stock_limits(
    min_stock: Decimal,
    reorder_point: Option<Decimal>,
    max_stock: Option<Decimal>,
) -> AppResult<()> {
    if let Some(max_stock) = max_stock {
        if max_stock < min_stock {
            return Err(AppError::Validation {
                field: "max_stock".to_string(),
                message: "Maximum stock must not be below minimum stock".to_string(),
                message_de: "Maximalbestand darf nicht unter dem Mindestbestand liegen".to_string(),
            });
        }
        if reorder_point.is_some_and(|r| r > max_stock) {
            return Err(AppError::Validation {
                field: "reorder_point".to_string(),
                message: "Reorder point must not exceed maximum stock".to_string(),
                message_de: "Meldebestand darf den Maximalbestand nicht überschreiten".to_string(),
            });
        }
    }
    Ok(())
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn ensure_supplier(&self, user_id: Uuid, supplier_id: Option<Uuid>) -> AppResult<()> {
        if let Some(supplier_id) = supplier_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND user_id = $2)",
            )
            .bind(supplier_id)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Supplier".to_string()));
            }
        }
        Ok(())
    }

    /// Load the operator's rows referenced by a draft. Ids that are not
    /// found are simply absent from the result.
    pub async fn owned_references(&self, user_id: Uuid, draft: &RefillDraft) -> AppResult<OwnedReferences> {
        let product_ids: Vec<Uuid> = draft.lines.iter().map(|l| l.product_id).collect();

        let products = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(&product_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let mut refs = OwnedReferences {
            products,
            ..Default::default()
        };

        if let Some(supplier_id) = draft.supplier_id {
            let name = sqlx::query_scalar::<_, String>(
                "SELECT name FROM suppliers WHERE id = $1 AND user_id = $2",
            )
            .bind(supplier_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
            if let Some(name) = name {
                refs.suppliers.insert(supplier_id, name);
            }
        }

        if let Some(device_id) = draft.device_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM devices WHERE id = $1 AND user_id = $2)",
            )
            .bind(device_id)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
            if exists {
                refs.devices.insert(device_id);
            }
        }

        Ok(refs)
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Create a product
    pub async fn create_product(&self, user_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        let min_stock = input.min_stock.unwrap_or(Decimal::ZERO);
        check_stock_limits(min_stock, input.reorder_point, input.max_stock)?;
        self.ensure_supplier(user_id, input.default_supplier_id).await?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                id, user_id, name, category, unit, description, barcode, article_number,
                default_price, min_stock, reorder_point, max_stock, usage_per_serving,
                default_supplier_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.category)
        .bind(input.unit)
        .bind(&input.description)
        .bind(&input.barcode)
        .bind(&input.article_number)
        .bind(input.default_price)
        .bind(min_stock)
        .bind(input.reorder_point)
        .bind(input.max_stock)
        .bind(input.usage_per_serving)
        .bind(input.default_supplier_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// List products, optionally including inactive ones
    pub async fn list_products(&self, user_id: Uuid, include_inactive: bool) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE user_id = $1 AND (is_active OR $2) ORDER BY category, name",
        )
        .bind(user_id)
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    /// Get a product
    pub async fn get_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Update a product
    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;
        let existing = self.get_product(user_id, product_id).await?;

        let min_stock = input.min_stock.unwrap_or(existing.min_stock);
        let reorder_point = input.reorder_point.or(existing.reorder_point);
        let max_stock = input.max_stock.or(existing.max_stock);
        check_stock_limits(min_stock, reorder_point, max_stock)?;

        let default_supplier_id = input.default_supplier_id.or(existing.default_supplier_id);
        if input.default_supplier_id.is_some() {
            self.ensure_supplier(user_id, default_supplier_id).await?;
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $1, category = $2, unit = $3, description = $4, barcode = $5,
                article_number = $6, default_price = $7, min_stock = $8, reorder_point = $9,
                max_stock = $10, usage_per_serving = $11, default_supplier_id = $12,
                is_active = $13, updated_at = NOW()
            WHERE id = $14 AND user_id = $15
            RETURNING *
            "#,
        )
        .bind(input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name))
        .bind(input.category.unwrap_or(existing.category))
        .bind(input.unit.unwrap_or(existing.unit))
        .bind(input.description.or(existing.description))
        .bind(input.barcode.or(existing.barcode))
        .bind(input.article_number.or(existing.article_number))
        .bind(input.default_price.or(existing.default_price))
        .bind(min_stock)
        .bind(reorder_point)
        .bind(max_stock)
        .bind(input.usage_per_serving.or(existing.usage_per_serving))
        .bind(default_supplier_id)
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(product_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// Delete a product. Refused while refill lines or ledger entries
    /// reference it; deactivate it instead.
    pub async fn delete_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        self.get_product(user_id, product_id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM refill_items WHERE product_id = $1)
                OR EXISTS(SELECT 1 FROM inventory_movements WHERE product_id = $1)
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Product has refills or stock movements; deactivate it instead".to_string(),
                message_de: "Produkt hat Nachfüllungen oder Lagerbewegungen und kann nur deaktiviert werden"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Suppliers
    // ========================================================================

    /// Create a supplier
    pub async fn create_supplier(&self, user_id: Uuid, input: SupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        let name = match input.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(AppError::Validation {
                    field: "name".to_string(),
                    message: "Supplier name is required".to_string(),
                    message_de: "Name des Lieferanten ist erforderlich".to_string(),
                })
            }
        };

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (
                id, user_id, name, contact_person, phone, email, website, address,
                customer_number, payment_terms, delivery_time_days, min_order_value, notes, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.website)
        .bind(&input.address)
        .bind(&input.customer_number)
        .bind(&input.payment_terms)
        .bind(input.delivery_time_days)
        .bind(input.min_order_value)
        .bind(&input.notes)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// List suppliers
    pub async fn list_suppliers(&self, user_id: Uuid) -> AppResult<Vec<Supplier>> {
        let suppliers =
            sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE user_id = $1 ORDER BY name")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;
        Ok(suppliers)
    }

    /// Get a supplier
    pub async fn get_supplier(&self, user_id: Uuid, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1 AND user_id = $2")
            .bind(supplier_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Update a supplier
    pub async fn update_supplier(
        &self,
        user_id: Uuid,
        supplier_id: Uuid,
        input: SupplierInput,
    ) -> AppResult<Supplier> {
        input.validate()?;
        let existing = self.get_supplier(user_id, supplier_id).await?;

        let name = match input.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(AppError::Validation {
                    field: "name".to_string(),
                    message: "Supplier name cannot be empty".to_string(),
                    message_de: "Name des Lieferanten darf nicht leer sein".to_string(),
                })
            }
            Some(name) => name.to_string(),
            None => existing.name,
        };

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers
            SET name = $1, contact_person = $2, phone = $3, email = $4, website = $5,
                address = $6, customer_number = $7, payment_terms = $8,
                delivery_time_days = $9, min_order_value = $10, notes = $11,
                is_active = $12, updated_at = NOW()
            WHERE id = $13 AND user_id = $14
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(input.contact_person.or(existing.contact_person))
        .bind(input.phone.or(existing.phone))
        .bind(input.email.or(existing.email))
        .bind(input.website.or(existing.website))
        .bind(input.address.or(existing.address))
        .bind(input.customer_number.or(existing.customer_number))
        .bind(input.payment_terms.or(existing.payment_terms))
        .bind(input.delivery_time_days.or(existing.delivery_time_days))
        .bind(input.min_order_value.or(existing.min_order_value))
        .bind(input.notes.or(existing.notes))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(supplier_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Delete a supplier. Refused while refills reference it.
    pub async fn delete_supplier(&self, user_id: Uuid, supplier_id: Uuid) -> AppResult<()> {
        self.get_supplier(user_id, supplier_id).await?;

        let refills = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refills WHERE supplier_id = $1")
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;

        if refills > 0 {
            return Err(AppError::Conflict {
                resource: "supplier".to_string(),
                message: format!("Supplier is referenced by {} refills", refills),
                message_de: format!("Lieferant wird von {} Nachfüllungen verwendet", refills),
            });
        }

        sqlx::query("DELETE FROM suppliers WHERE id = $1 AND user_id = $2")
            .bind(supplier_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Devices
    // ========================================================================

    /// Create a device
    pub async fn create_device(&self, user_id: Uuid, input: CreateDeviceInput) -> AppResult<Device> {
        input.validate()?;

        let device = sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices (id, user_id, name, device_type, status, serial_number, location, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.device_type)
        .bind(input.status.unwrap_or_default())
        .bind(&input.serial_number)
        .bind(&input.location)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(device_id = %device.id, "Device created");
        Ok(device)
    }

    /// List devices
    pub async fn list_devices(&self, user_id: Uuid) -> AppResult<Vec<Device>> {
        let devices =
            sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE user_id = $1 ORDER BY name")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;
        Ok(devices)
    }

    /// Get a device
    pub async fn get_device(&self, user_id: Uuid, device_id: Uuid) -> AppResult<Device> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Device".to_string()))
    }

    /// Update a device
    pub async fn update_device(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        input: UpdateDeviceInput,
    ) -> AppResult<Device> {
        input.validate()?;
        let existing = self.get_device(user_id, device_id).await?;

        let device = sqlx::query_as::<_, Device>(
            r#"
            UPDATE devices
            SET name = $1, device_type = $2, status = $3, serial_number = $4,
                location = $5, notes = $6, updated_at = NOW()
            WHERE id = $7 AND user_id = $8
            RETURNING *
            "#,
        )
        .bind(input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name))
        .bind(input.device_type.unwrap_or(existing.device_type))
        .bind(input.status.unwrap_or(existing.status))
        .bind(input.serial_number.or(existing.serial_number))
        .bind(input.location.or(existing.location))
        .bind(input.notes.or(existing.notes))
        .bind(device_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(device)
    }

    /// Delete a device. Refused while refills were booked against it.
    pub async fn delete_device(&self, user_id: Uuid, device_id: Uuid) -> AppResult<()> {
        self.get_device(user_id, device_id).await?;

        let refills = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refills WHERE device_id = $1")
            .bind(device_id)
            .fetch_one(&self.db)
            .await?;

        if refills > 0 {
            return Err(AppError::Conflict {
                resource: "device".to_string(),
                message: format!("Device is referenced by {} refills", refills),
                message_de: format!("Gerät wird von {} Nachfüllungen verwendet", refills),
            });
        }

        sqlx::query("DELETE FROM devices WHERE id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_negative_prices_are_rejected() {
        let input: CreateProductInput = serde_json::from_str(
            r#"{"name":"Milchpulver","category":"milk","unit":"kg","default_price":"-1.00"}"#,
        )
        .unwrap();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("default_price"));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = serde_json::from_str::<CreateProductInput>(
            r#"{"name":"Bohnen","category":"beans","unit":"kg"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_supplier_email_format() {
        let input: SupplierInput =
            serde_json::from_str(r#"{"name":"Metro","email":"not-an-email"}"#).unwrap();
        assert!(input.validate().is_err());

        let input: SupplierInput =
            serde_json::from_str(r#"{"name":"Metro","email":"einkauf@metro.de"}"#).unwrap();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_stock_limits() {
        assert!(check_stock_limits(dec("5"), Some(dec("10")), Some(dec("20"))).is_ok());
        assert!(check_stock_limits(dec("5"), None, Some(dec("4"))).is_err());
        assert!(check_stock_limits(dec("5"), Some(dec("25")), Some(dec("20"))).is_err());
        assert!(check_stock_limits(dec("5"), Some(dec("25")), None).is_ok());
    }
}
