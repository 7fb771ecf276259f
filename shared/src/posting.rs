//! Refill posting plans
//!
//! Everything a refill writes is decided here, before the first database
//! statement runs: ids for the refill, its lines, the ledger entries and the
//! mirrored expense are assigned up front so every link is known. The
//! backend only executes a plan inside one transaction, which keeps the
//! all-or-nothing rule simple: a plan that cannot be built produces no
//! writes at all.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{RefillError, RefillResult};
use crate::models::{
    refill_expense_description, ExpenseCategory, MovementType, NewExpense, NewMovement, Refill,
    RefillDraft, RefillItem, RefillStatus, REASON_REFILL, REASON_REFILL_VOID,
};
use crate::pricing::{calculate_totals, RefillTotals};
use crate::validation::validate_refill_amounts;

/// Catalog entries owned by the submitting user, restricted to the ids a
/// submission references
#[derive(Debug, Clone, Default)]
pub struct OwnedReferences {
    pub products: HashSet<Uuid>,
    /// Supplier id to supplier name
    pub suppliers: HashMap<Uuid, String>,
    pub devices: HashSet<Uuid>,
}

impl OwnedReferences {
    /// Reject any product, supplier or device the user does not own
    pub fn check(&self, draft: &RefillDraft) -> RefillResult<()> {
        if let Some(supplier_id) = draft.supplier_id {
            if !self.suppliers.contains_key(&supplier_id) {
                return Err(RefillError::UnknownSupplier(supplier_id));
            }
        }
        if let Some(device_id) = draft.device_id {
            if !self.devices.contains(&device_id) {
                return Err(RefillError::UnknownDevice(device_id));
            }
        }
        for (index, line) in draft.lines.iter().enumerate() {
            if !self.products.contains(&line.product_id) {
                return Err(RefillError::UnknownProduct {
                    line: index + 1,
                    product_id: line.product_id,
                });
            }
        }
        Ok(())
    }

    pub fn supplier_name(&self, supplier_id: Option<Uuid>) -> Option<String> {
        supplier_id.and_then(|id| self.suppliers.get(&id).cloned())
    }
}

/// A refill line with its id and computed total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedItem {
    pub id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_discount: Decimal,
    pub line_discount_reason: Option<String>,
    pub total_price: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Ledger entries and expense written when a refill is posted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerPosting {
    pub movements: Vec<NewMovement>,
    pub expense: NewExpense,
}

/// Complete write set for a new refill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostingPlan {
    pub refill_id: Uuid,
    pub status: RefillStatus,
    pub totals: RefillTotals,
    pub items: Vec<PlannedItem>,
    /// `None` for drafts
    pub posting: Option<LedgerPosting>,
}

impl PostingPlan {
    pub fn expense_id(&self) -> Option<Uuid> {
        self.posting.as_ref().map(|p| p.expense.id)
    }

    pub fn movements(&self) -> &[NewMovement] {
        self.posting.as_ref().map(|p| p.movements.as_slice()).unwrap_or(&[])
    }
}

/// Build the write set for a new refill.
///
/// Checks ownership of every referenced id, validates the amounts and runs
/// the calculator. Drafts get items and totals only; everything else is
/// posted right away.
pub fn plan_refill(draft: &RefillDraft, refs: &OwnedReferences) -> RefillResult<PostingPlan> {
    refs.check(draft)?;

    let input = draft.pricing_input();
    validate_refill_amounts(&input)?;
    let totals = calculate_totals(&input)?;

    let items: Vec<PlannedItem> = draft
        .lines
        .iter()
        .zip(totals.line_totals.iter())
        .enumerate()
        .map(|(index, (line, total_price))| PlannedItem {
            id: Uuid::new_v4(),
            line_no: index as i32 + 1,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_discount: line.line_discount,
            line_discount_reason: line.line_discount_reason.clone(),
            total_price: *total_price,
            batch_number: line.batch_number.clone(),
            expiry_date: line.expiry_date,
        })
        .collect();

    let posting = if draft.draft {
        None
    } else {
        let movements = movements_for(
            items.iter().map(|i| (i.id, i.product_id, i.quantity)),
            draft.device_id,
            MovementType::In,
            REASON_REFILL,
        );
        let expense = refill_expense(
            totals.total_amount,
            draft.date,
            draft.device_id,
            items.len(),
            refs.supplier_name(draft.supplier_id),
            draft.invoice_number.clone(),
        );
        Some(LedgerPosting { movements, expense })
    };

    Ok(PostingPlan {
        refill_id: Uuid::new_v4(),
        status: if draft.draft {
            RefillStatus::Draft
        } else {
            RefillStatus::Posted
        },
        totals,
        items,
        posting,
    })
}

/// Ledger entries and expense for posting a stored draft. Uses the totals
/// persisted with the draft.
pub fn plan_post(refill: &Refill, items: &[RefillItem], supplier_name: Option<String>) -> LedgerPosting {
    let movements = movements_for(
        items.iter().map(|i| (i.id, i.product_id, i.quantity)),
        refill.device_id,
        MovementType::In,
        REASON_REFILL,
    );
    let expense = refill_expense(
        refill.total_amount,
        refill.date,
        refill.device_id,
        items.len(),
        supplier_name,
        refill.invoice_number.clone(),
    );
    LedgerPosting { movements, expense }
}

/// Compensating OUT entries for voiding a posted refill, one per line
pub fn plan_void(refill: &Refill, items: &[RefillItem]) -> Vec<NewMovement> {
    movements_for(
        items.iter().map(|i| (i.id, i.product_id, i.quantity)),
        refill.device_id,
        MovementType::Out,
        REASON_REFILL_VOID,
    )
}

fn movements_for(
    lines: impl Iterator<Item = (Uuid, Uuid, Decimal)>,
    device_id: Option<Uuid>,
    movement_type: MovementType,
    reason: &str,
) -> Vec<NewMovement> {
    lines
        .map(|(item_id, product_id, quantity)| NewMovement {
            id: Uuid::new_v4(),
            product_id,
            device_id,
            refill_item_id: Some(item_id),
            movement_type,
            quantity,
            reason: reason.to_string(),
            notes: None,
        })
        .collect()
}

fn refill_expense(
    amount: Decimal,
    date: NaiveDate,
    device_id: Option<Uuid>,
    line_count: usize,
    supplier: Option<String>,
    invoice_number: Option<String>,
) -> NewExpense {
    NewExpense {
        id: Uuid::new_v4(),
        device_id,
        category: ExpenseCategory::Refill,
        amount,
        date,
        description: refill_expense_description(line_count),
        supplier,
        invoice_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefillLine;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(product_id: Uuid, q: &str, p: &str, d: &str) -> RefillLine {
        RefillLine {
            product_id,
            quantity: dec(q),
            unit_price: dec(p),
            line_discount: dec(d),
            line_discount_reason: None,
            batch_number: None,
            expiry_date: None,
        }
    }

    fn draft(lines: Vec<RefillLine>) -> RefillDraft {
        RefillDraft {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            supplier_id: None,
            device_id: None,
            order_number: None,
            invoice_number: Some("RE-1001".to_string()),
            delivery_note: None,
            shipping_cost: dec("3.00"),
            deposit_amount: dec("1.00"),
            tax_rate: dec("20"),
            prices_include_tax: true,
            discount_amount: dec("2.00"),
            discount_reason: None,
            notes: None,
            receipt: None,
            lines,
            draft: false,
        }
    }

    fn refs(products: &[Uuid]) -> OwnedReferences {
        OwnedReferences {
            products: products.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_posted_plan_links_everything() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let supplier = Uuid::new_v4();
        let device = Uuid::new_v4();
        let mut submission = draft(vec![line(a, "10", "1.00", "1.00"), line(b, "5", "2.00", "0")]);
        submission.supplier_id = Some(supplier);
        submission.device_id = Some(device);
        let mut owned = refs(&[a, b]);
        owned.suppliers.insert(supplier, "Kaffee Rösterei".to_string());
        owned.devices.insert(device);

        let plan = plan_refill(&submission, &owned).unwrap();

        assert_eq!(plan.status, RefillStatus::Posted);
        assert_eq!(plan.totals.total_amount, dec("21.00"));
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].total_price, dec("9.00"));
        assert_eq!(plan.items[1].line_no, 2);

        let movements = plan.movements();
        assert_eq!(movements.len(), 2);
        for (movement, item) in movements.iter().zip(&plan.items) {
            assert_eq!(movement.movement_type, MovementType::In);
            assert_eq!(movement.quantity, item.quantity);
            assert_eq!(movement.refill_item_id, Some(item.id));
            assert_eq!(movement.device_id, Some(device));
            assert_eq!(movement.reason, REASON_REFILL);
        }

        let expense = &plan.posting.as_ref().unwrap().expense;
        assert_eq!(expense.amount, dec("21.00"));
        assert_eq!(expense.category, ExpenseCategory::Refill);
        assert_eq!(expense.description, "Nachfüllung - 2 Produkte");
        assert_eq!(expense.supplier.as_deref(), Some("Kaffee Rösterei"));
        assert_eq!(expense.invoice_number.as_deref(), Some("RE-1001"));
        assert_eq!(plan.expense_id(), Some(expense.id));
    }

    #[test]
    fn test_draft_plan_has_no_ledger_entries() {
        let a = Uuid::new_v4();
        let mut submission = draft(vec![line(a, "1", "1.00", "0")]);
        submission.discount_amount = Decimal::ZERO;
        submission.draft = true;

        let plan = plan_refill(&submission, &refs(&[a])).unwrap();

        assert_eq!(plan.status, RefillStatus::Draft);
        assert!(plan.posting.is_none());
        assert!(plan.movements().is_empty());
        assert_eq!(plan.expense_id(), None);
    }

    #[test]
    fn test_foreign_product_plans_nothing() {
        let (mine, foreign) = (Uuid::new_v4(), Uuid::new_v4());
        let submission = draft(vec![line(mine, "10", "1.00", "0"), line(foreign, "5", "2.00", "0")]);

        assert_eq!(
            plan_refill(&submission, &refs(&[mine])),
            Err(RefillError::UnknownProduct { line: 2, product_id: foreign })
        );
    }

    #[test]
    fn test_foreign_supplier_and_device() {
        let a = Uuid::new_v4();
        let mut submission = draft(vec![line(a, "10", "1.00", "0")]);
        let supplier = Uuid::new_v4();
        submission.supplier_id = Some(supplier);
        assert_eq!(plan_refill(&submission, &refs(&[a])), Err(RefillError::UnknownSupplier(supplier)));

        submission.supplier_id = None;
        let device = Uuid::new_v4();
        submission.device_id = Some(device);
        assert_eq!(plan_refill(&submission, &refs(&[a])), Err(RefillError::UnknownDevice(device)));
    }

    #[test]
    fn test_policy_violation_plans_nothing() {
        let a = Uuid::new_v4();
        let submission = draft(vec![line(a, "1", "1.00", "1.50")]);
        assert_eq!(
            plan_refill(&submission, &refs(&[a])),
            Err(RefillError::LineDiscountExceedsGross { line: 1 })
        );
    }

    fn stored(status: RefillStatus, device_id: Option<Uuid>) -> (Refill, Vec<RefillItem>) {
        let refill_id = Uuid::new_v4();
        let now = Utc::now();
        let refill = Refill {
            id: refill_id,
            user_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            supplier_id: None,
            device_id,
            order_number: None,
            invoice_number: None,
            delivery_note: None,
            shipping_cost: Decimal::ZERO,
            deposit_amount: Decimal::ZERO,
            tax_rate: dec("20"),
            prices_include_tax: true,
            discount_amount: Decimal::ZERO,
            discount_reason: None,
            subtotal: dec("10.00"),
            tax_amount: dec("2.00"),
            total_amount: dec("12.00"),
            receipt_filename: None,
            receipt_data: None,
            notes: None,
            status,
            posted_at: None,
            voided_at: None,
            expense_id: None,
            created_at: now,
            updated_at: now,
        };
        let items = vec![RefillItem {
            id: Uuid::new_v4(),
            refill_id,
            product_id: Uuid::new_v4(),
            line_no: 1,
            quantity: dec("10"),
            unit_price: dec("1.20"),
            line_discount: Decimal::ZERO,
            line_discount_reason: None,
            total_price: dec("12.00"),
            batch_number: None,
            expiry_date: None,
            created_at: now,
        }];
        (refill, items)
    }

    #[test]
    fn test_post_stored_draft() {
        let device = Uuid::new_v4();
        let (refill, items) = stored(RefillStatus::Draft, Some(device));

        let posting = plan_post(&refill, &items, Some("Metro".to_string()));

        assert_eq!(posting.movements.len(), 1);
        assert_eq!(posting.movements[0].refill_item_id, Some(items[0].id));
        assert_eq!(posting.movements[0].device_id, Some(device));
        assert_eq!(posting.expense.amount, dec("12.00"));
        assert_eq!(posting.expense.date, refill.date);
        assert_eq!(posting.expense.supplier.as_deref(), Some("Metro"));
    }

    #[test]
    fn test_void_nets_stock_back() {
        let (refill, items) = stored(RefillStatus::Posted, None);
        let posted = plan_post(&refill, &items, None).movements;
        let voided = plan_void(&refill, &items);

        assert_eq!(voided.len(), items.len());
        assert!(voided.iter().all(|m| m.movement_type == MovementType::Out));
        assert!(voided.iter().all(|m| m.reason == REASON_REFILL_VOID));

        let net: Decimal = posted.iter().chain(voided.iter()).map(NewMovement::signed_quantity).sum();
        assert_eq!(net, Decimal::ZERO);
    }
}
