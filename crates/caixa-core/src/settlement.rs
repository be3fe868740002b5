//! # Settlement Composer
//!
//! Builds the commit-ready settlement from a validated plan.
//!
//! ## Output
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compose_settlement()                                                   │
//! │                                                                         │
//! │   CartLine ×N ───────────────► SaleLine ×N (same sale_id, totals and   │
//! │                                 payment snapshot on every row)         │
//! │                                                                         │
//! │   SettledLeg Cash/Card/Pix/ ──► LedgerEntry  Paid     due today        │
//! │   Coupon/Cashback                                                      │
//! │                                                                         │
//! │   SettledLeg StoreCredit ─────► LedgerEntry  Pending  ×N installments  │
//! │                                                                         │
//! │   everything ─────────────────► SettlementRecord (immutable)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No I/O happens here: the caller supplies the sale id, the ledger category
//! and the clock.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::CartLine;
use crate::crediario::InstallmentReceivable;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::payment::{SettledLeg, ValidatedPlan};
use crate::totals::Totals;
use crate::types::{
    LedgerEntry, LedgerStatus, ReceiptPreference, SaleChannel, SaleLine, SaleMeta,
};

/// Finalized sale, immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementRecord {
    pub sale_id: String,
    pub totals: Totals,
    /// Payment snapshot: settled legs with change, card fee and schedule.
    pub payment: ValidatedPlan,
    pub customer_id: Option<String>,
    pub seller: String,
    pub channel: SaleChannel,
    pub receipt: ReceiptPreference,
    pub notes: Option<String>,
    pub change: Money,
    pub cashback_redeemed: Money,
    pub cashback_earned: Money,
    /// Crediário receivables, empty when nothing was financed.
    pub installments: Vec<InstallmentReceivable>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Everything a commit writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub record: SettlementRecord,
    pub sale_lines: Vec<SaleLine>,
    pub ledger_entries: Vec<LedgerEntry>,
}

/// Inputs of [`compose_settlement`].
#[derive(Debug, Clone, Copy)]
pub struct SettlementRequest<'a> {
    pub sale_id: &'a str,
    pub category_id: &'a str,
    pub plan: &'a ValidatedPlan,
    pub totals: &'a Totals,
    pub lines: &'a [CartLine],
    pub meta: &'a SaleMeta,
    /// Due date of receivables settled at the counter.
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

/// Composes the sale rows, ledger entries and record for one sale.
///
/// ## Errors
/// - `EmptyCart` when there are no lines
/// - `Snapshot` if the payment snapshot cannot be encoded
pub fn compose_settlement(req: SettlementRequest<'_>) -> CoreResult<Settlement> {
    if req.lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let payment_snapshot = serde_json::to_string(&req.plan.legs)?;

    let sale_lines = req
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| sale_line(&req, index, line, &payment_snapshot))
        .collect();

    let ledger_entries = req
        .plan
        .legs
        .iter()
        .flat_map(|leg| ledger_entries_for(&req, leg))
        .collect();

    let installments = req
        .plan
        .legs
        .iter()
        .filter_map(|leg| leg.schedule.as_ref())
        .flat_map(|schedule| schedule.installments.iter().copied())
        .collect();

    let record = SettlementRecord {
        sale_id: req.sale_id.to_string(),
        totals: req.totals.clone(),
        payment: req.plan.clone(),
        customer_id: req.plan.customer_id.clone(),
        seller: req.meta.seller.clone(),
        channel: req.meta.channel,
        receipt: req.meta.receipt,
        notes: req.meta.notes.clone(),
        change: req.plan.change(),
        cashback_redeemed: req.plan.cashback_redeemed(),
        cashback_earned: req.totals.cashback_earned,
        installments,
        created_at: req.now,
    };

    Ok(Settlement {
        record,
        sale_lines,
        ledger_entries,
    })
}

fn sale_line(
    req: &SettlementRequest<'_>,
    index: usize,
    line: &CartLine,
    payment_snapshot: &str,
) -> SaleLine {
    let totals = req.totals;
    SaleLine {
        id: Uuid::new_v4().to_string(),
        sale_id: req.sale_id.to_string(),
        line_number: index as i64 + 1,
        product_id: line.product_id.clone(),
        sku_snapshot: line.sku.clone(),
        name_snapshot: line.name.clone(),
        unit_price_cents: line.unit_price.cents(),
        quantity: line.quantity,
        line_discount_cents: line.discount_amount().cents(),
        line_total_cents: line.net_total().cents(),
        subtotal_cents: totals.subtotal.cents(),
        item_discount_cents: totals.item_discount_total.cents(),
        order_discount_cents: totals.order_discount.cents(),
        surcharge_cents: totals.surcharge.cents(),
        freight_cents: totals.freight_charged.cents(),
        amount_due_cents: totals.amount_due.cents(),
        payment_snapshot: payment_snapshot.to_string(),
        customer_id: req.plan.customer_id.clone(),
        seller: req.meta.seller.clone(),
        channel: req.meta.channel,
        receipt_preference: req.meta.receipt,
        coupon_code: totals.coupon_code.clone(),
        created_at: req.now,
    }
}

fn ledger_entries_for(req: &SettlementRequest<'_>, leg: &SettledLeg) -> Vec<LedgerEntry> {
    let kind = leg.kind();
    let entry = |description: String, amount: Money, due_date: NaiveDate, status: LedgerStatus| LedgerEntry {
        id: Uuid::new_v4().to_string(),
        sale_id: req.sale_id.to_string(),
        category_id: req.category_id.to_string(),
        description,
        method: kind,
        amount_cents: amount.cents(),
        due_date,
        status,
        installment_number: None,
        installment_count: None,
        customer_id: req.plan.customer_id.clone(),
        created_at: req.now,
    };

    match &leg.schedule {
        Some(schedule) => {
            let count = schedule.len() as i64;
            schedule
                .installments
                .iter()
                .map(|inst| LedgerEntry {
                    installment_number: Some(inst.sequence as i64),
                    installment_count: Some(count),
                    ..entry(
                        format!(
                            "Venda {} - {} {}/{}",
                            req.sale_id,
                            kind.label(),
                            inst.sequence,
                            count
                        ),
                        inst.amount,
                        inst.due_date,
                        LedgerStatus::Pending,
                    )
                })
                .collect()
        }
        // A fully discounted sale leaves nothing to receive.
        None if leg.amount.is_zero() => Vec::new(),
        None => vec![entry(
            format!("Venda {} - {}", req.sale_id, kind.label()),
            leg.amount,
            req.today,
            LedgerStatus::Paid,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::test_product;
    use crate::cart::Cart;
    use crate::payment::{validate_payment, PaymentContext, PaymentLeg, PaymentMethod, PaymentPlan};
    use crate::totals::{compute_totals, CouponTable};
    use crate::types::{Customer, Discount, OrderAdjustments, PaymentKind, Rate};

    struct Fixture {
        cart: Cart,
        totals: Totals,
        coupons: CouponTable,
        customer: Customer,
        meta: SaleMeta,
    }

    fn fixture() -> Fixture {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 3000), 2).unwrap();
        cart.add_product(&test_product("2", 4000), 1).unwrap();

        let coupons = CouponTable::default();
        let adjustments = OrderAdjustments {
            cashback_earn_rate: Rate::from_percent(2),
            ..OrderAdjustments::default()
        };
        let totals = compute_totals(cart.lines(), &adjustments, &coupons).unwrap();

        Fixture {
            cart,
            totals,
            coupons,
            customer: Customer {
                id: "cust-1".to_string(),
                name: "Maria".to_string(),
                phone: None,
                cashback_balance_cents: 0,
            },
            meta: SaleMeta::counter("joana"),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn compose(f: &Fixture, plan: &ValidatedPlan) -> Settlement {
        compose_settlement(SettlementRequest {
            sale_id: "240601-ABCD",
            category_id: "cat-vendas",
            plan,
            totals: &f.totals,
            lines: f.cart.lines(),
            meta: &f.meta,
            today: today(),
            now: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn test_pix_sale_produces_one_paid_entry() {
        let f = fixture();
        let ctx = PaymentContext::new(f.totals.amount_due, &f.coupons);
        let plan = validate_payment(&PaymentPlan::single(PaymentMethod::Pix), &ctx).unwrap();

        let settlement = compose(&f, &plan);

        assert_eq!(settlement.sale_lines.len(), 2);
        assert!(settlement
            .sale_lines
            .iter()
            .all(|l| l.sale_id == "240601-ABCD" && l.amount_due_cents == 10000));
        assert_eq!(settlement.sale_lines[1].line_number, 2);

        assert_eq!(settlement.ledger_entries.len(), 1);
        let entry = &settlement.ledger_entries[0];
        assert_eq!(entry.status, LedgerStatus::Paid);
        assert_eq!(entry.due_date, today());
        assert_eq!(entry.amount_cents, 10000);
        assert_eq!(entry.method, PaymentKind::Pix);

        assert_eq!(settlement.record.cashback_earned.cents(), 200);
    }

    #[test]
    fn test_split_with_store_credit() {
        let f = fixture();
        let ctx = PaymentContext::new(f.totals.amount_due, &f.coupons).with_customer(Some(&f.customer));
        let plan = validate_payment(
            &PaymentPlan::split(
                PaymentLeg::new(PaymentMethod::Cash, Money::from_cents(4000)),
                PaymentLeg::new(
                    PaymentMethod::StoreCredit {
                        installments: 3,
                        first_due_date: NaiveDate::from_ymd_opt(2024, 7, 1),
                    },
                    Money::from_cents(6000),
                ),
            ),
            &ctx,
        )
        .unwrap();

        let settlement = compose(&f, &plan);
        let entries = &settlement.ledger_entries;
        assert_eq!(entries.len(), 4);

        let paid: Vec<_> = entries.iter().filter(|e| e.status == LedgerStatus::Paid).collect();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].amount_cents, 4000);

        let pending: Vec<_> = entries
            .iter()
            .filter(|e| e.status == LedgerStatus::Pending)
            .collect();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending.iter().map(|e| e.amount_cents).sum::<i64>(), 6000);
        assert_eq!(pending[0].installment_number, Some(1));
        assert_eq!(pending[2].installment_count, Some(3));
        assert!(pending.iter().all(|e| e.customer_id.as_deref() == Some("cust-1")));

        assert_eq!(settlement.record.installments.len(), 3);
        assert_eq!(settlement.record.customer_id.as_deref(), Some("cust-1"));
    }

    #[test]
    fn test_fully_discounted_sale_has_no_paid_entry() {
        let mut f = fixture();
        let adjustments = OrderAdjustments {
            order_discount: Discount::Fixed(Money::from_cents(10000)),
            ..OrderAdjustments::default()
        };
        f.totals = compute_totals(f.cart.lines(), &adjustments, &f.coupons).unwrap();
        assert!(f.totals.amount_due.is_zero());

        let ctx = PaymentContext::new(f.totals.amount_due, &f.coupons);
        let plan = validate_payment(&PaymentPlan::single(PaymentMethod::Pix), &ctx).unwrap();

        let settlement = compose(&f, &plan);
        assert_eq!(settlement.sale_lines.len(), 2);
        assert!(settlement.ledger_entries.is_empty());
    }

    #[test]
    fn test_payment_snapshot_is_json() {
        let f = fixture();
        let ctx = PaymentContext::new(f.totals.amount_due, &f.coupons);
        let plan = validate_payment(&PaymentPlan::cash(Money::from_cents(12000)), &ctx).unwrap();

        let settlement = compose(&f, &plan);
        let legs: Vec<SettledLeg> =
            serde_json::from_str(&settlement.sale_lines[0].payment_snapshot).unwrap();
        assert_eq!(legs[0].change.cents(), 2000);
        assert_eq!(settlement.record.change.cents(), 2000);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let f = fixture();
        let ctx = PaymentContext::new(f.totals.amount_due, &f.coupons);
        let plan = validate_payment(&PaymentPlan::single(PaymentMethod::Pix), &ctx).unwrap();

        let result = compose_settlement(SettlementRequest {
            sale_id: "x",
            category_id: "c",
            plan: &plan,
            totals: &f.totals,
            lines: &[],
            meta: &f.meta,
            today: today(),
            now: Utc::now(),
        });
        assert!(matches!(result, Err(CoreError::EmptyCart)));
    }
}
