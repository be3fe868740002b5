//! # Payment Composition
//!
//! Payment plans and the leg validator.
//!
//! ## Plan Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PaymentPlan::Single { method, tendered }                              │
//! │    one instrument settles the whole amount due                         │
//! │    tendered = cash received / cashback to redeem (None = amount due)   │
//! │                                                                         │
//! │  PaymentPlan::Split { first, second }                                  │
//! │    exactly two legs, Σ amounts == amount due (± R$ 0,01)               │
//! │    a split inside a split cannot be expressed                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Validation Flow
//! ```text
//! PaymentPlan + PaymentContext
//!      │
//!      ▼
//! validate_payment() ── per-leg preconditions ── split reconciliation
//!      │                         │
//!      │                         └──► PaymentError (draft stays editable)
//!      ▼
//! ValidatedPlan (settled amounts, change, card fee, crediário schedule)
//! ```
//!
//! The validator is pure: the caller reads the cashback balance and the fee
//! profile beforehand and passes them in the context.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::crediario::{generate_schedule, validate_installment_count, CrediarioSchedule};
use crate::error::{PaymentError, PaymentResult};
use crate::fees::{fee_amount, resolve_fee, CardTier, FeeProfile};
use crate::money::{Money, RECONCILIATION_TOLERANCE};
use crate::totals::{normalize, CouponTable};
use crate::types::{Customer, PaymentKind, Rate};

// =============================================================================
// Plan Types
// =============================================================================

/// A payment instrument with its method-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "method", rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card {
        #[ts(as = "Option<String>")]
        tier: Option<CardTier>,
    },
    Pix,
    /// Crediário.
    StoreCredit {
        installments: u8,
        #[ts(as = "Option<String>")]
        first_due_date: Option<NaiveDate>,
    },
    CashbackRedeem,
    Coupon {
        code: String,
    },
}

impl PaymentMethod {
    /// Storage discriminant.
    pub fn kind(&self) -> PaymentKind {
        match self {
            PaymentMethod::Cash => PaymentKind::Cash,
            PaymentMethod::Card { .. } => PaymentKind::Card,
            PaymentMethod::Pix => PaymentKind::Pix,
            PaymentMethod::StoreCredit { .. } => PaymentKind::StoreCredit,
            PaymentMethod::CashbackRedeem => PaymentKind::CashbackRedeem,
            PaymentMethod::Coupon { .. } => PaymentKind::Coupon,
        }
    }
}

/// One leg of a split payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentLeg {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl PaymentLeg {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        PaymentLeg { method, amount }
    }
}

/// How the sale is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentPlan {
    Single {
        method: PaymentMethod,
        /// Cash received, or cashback to redeem. `None` means the amount due.
        tendered: Option<Money>,
    },
    Split {
        first: PaymentLeg,
        second: PaymentLeg,
    },
}

impl PaymentPlan {
    /// Single-method plan settling exactly the amount due.
    pub fn single(method: PaymentMethod) -> Self {
        PaymentPlan::Single {
            method,
            tendered: None,
        }
    }

    /// Cash plan with the amount handed over by the customer.
    pub fn cash(received: Money) -> Self {
        PaymentPlan::Single {
            method: PaymentMethod::Cash,
            tendered: Some(received),
        }
    }

    pub fn split(first: PaymentLeg, second: PaymentLeg) -> Self {
        PaymentPlan::Split { first, second }
    }
}

// =============================================================================
// Context & Result
// =============================================================================

/// Everything the validator needs besides the plan.
#[derive(Debug, Clone, Copy)]
pub struct PaymentContext<'a> {
    pub amount_due: Money,
    /// Customer bound at sale open.
    pub customer: Option<&'a Customer>,
    /// Balance read from the cashback ledger for this validation.
    pub cashback_balance: Option<Money>,
    /// Fee profile selected for this sale.
    pub fee_profile: Option<&'a FeeProfile>,
    pub coupons: &'a CouponTable,
    /// Coupon already discounted in the totals; it cannot pay a leg too.
    pub applied_coupon: Option<&'a str>,
}

impl<'a> PaymentContext<'a> {
    pub fn new(amount_due: Money, coupons: &'a CouponTable) -> Self {
        PaymentContext {
            amount_due,
            customer: None,
            cashback_balance: None,
            fee_profile: None,
            coupons,
            applied_coupon: None,
        }
    }

    pub fn with_customer(mut self, customer: Option<&'a Customer>) -> Self {
        self.customer = customer;
        self
    }

    pub fn with_cashback_balance(mut self, balance: Option<Money>) -> Self {
        self.cashback_balance = balance;
        self
    }

    pub fn with_fee_profile(mut self, profile: Option<&'a FeeProfile>) -> Self {
        self.fee_profile = profile;
        self
    }

    pub fn with_applied_coupon(mut self, code: Option<&'a str>) -> Self {
        self.applied_coupon = code;
        self
    }

    /// The authoritative balance, falling back to the directory snapshot.
    fn balance(&self) -> Money {
        self.cashback_balance
            .or_else(|| self.customer.map(Customer::cashback_balance))
            .unwrap_or_default()
    }
}

/// Card details resolved for a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CardCharge {
    #[ts(as = "String")]
    pub tier: CardTier,
    pub rate: Rate,
    /// Display-only fee on the leg amount.
    pub fee: Money,
}

/// A leg after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettledLeg {
    pub method: PaymentMethod,
    /// Amount this leg settles against the amount due.
    pub amount: Money,
    /// What the customer handed over (cash) or asked to redeem (cashback).
    pub tendered: Option<Money>,
    /// Cash change owed to the customer.
    pub change: Money,
    pub card: Option<CardCharge>,
    pub schedule: Option<CrediarioSchedule>,
}

impl SettledLeg {
    fn settled(method: PaymentMethod, amount: Money) -> Self {
        SettledLeg {
            method,
            amount,
            tendered: None,
            change: Money::zero(),
            card: None,
            schedule: None,
        }
    }

    pub fn kind(&self) -> PaymentKind {
        self.method.kind()
    }
}

/// A payment plan that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidatedPlan {
    /// Amount due the plan was validated against.
    pub amount_due: Money,
    pub legs: Vec<SettledLeg>,
    pub customer_id: Option<String>,
}

impl ValidatedPlan {
    /// Total cash change owed.
    pub fn change(&self) -> Money {
        self.legs.iter().map(|l| l.change).sum()
    }

    /// Cashback taken from the customer's balance.
    pub fn cashback_redeemed(&self) -> Money {
        self.legs
            .iter()
            .filter(|l| l.kind() == PaymentKind::CashbackRedeem)
            .map(|l| l.amount)
            .sum()
    }

    /// Sum of settled leg amounts.
    pub fn settled_total(&self) -> Money {
        self.legs.iter().map(|l| l.amount).sum()
    }

    pub fn is_split(&self) -> bool {
        self.legs.len() > 1
    }

    /// Re-checks the plan's shape before anything is written.
    ///
    /// The fields are public, so a plan may not come from
    /// [`validate_payment`]. This rejects one that breaks what the validator
    /// guarantees: one or two legs, legs summing to `amount_due`, the same
    /// customer, a card charge on card legs, and a crediário schedule that
    /// finances exactly its leg.
    ///
    /// ## Errors
    /// - `AmountMismatch` if the legs don't add up to `amount_due`
    /// - `MalformedPlan` for any other inconsistency
    pub fn verify(&self, amount_due: Money, customer_id: Option<&str>) -> PaymentResult<()> {
        if self.amount_due != amount_due {
            return Err(PaymentError::malformed(format!(
                "validated for {} but the sale totals {}",
                self.amount_due, amount_due
            )));
        }
        if self.legs.is_empty() || self.legs.len() > 2 {
            return Err(PaymentError::malformed(format!(
                "{} legs (expected 1 or 2)",
                self.legs.len()
            )));
        }
        if self.customer_id.as_deref() != customer_id {
            return Err(PaymentError::malformed("customer differs from the sale's"));
        }

        let legs_total = self.settled_total();
        if !legs_total.within(amount_due, RECONCILIATION_TOLERANCE) {
            return Err(PaymentError::AmountMismatch {
                amount_due,
                legs_total,
            });
        }

        for leg in &self.legs {
            if leg.amount.is_negative() || leg.change.is_negative() {
                return Err(PaymentError::malformed("negative leg amount"));
            }
            match (&leg.method, &leg.card, &leg.schedule) {
                (PaymentMethod::Card { .. }, None, _) => {
                    return Err(PaymentError::malformed("card leg without a card charge"));
                }
                (PaymentMethod::StoreCredit { .. }, _, None) => {
                    return Err(PaymentError::malformed("crediário leg without a schedule"));
                }
                (PaymentMethod::StoreCredit { .. }, _, Some(schedule))
                    if schedule.total() != leg.amount =>
                {
                    return Err(PaymentError::malformed(format!(
                        "schedule finances {} of a {} leg",
                        schedule.total(),
                        leg.amount
                    )));
                }
                (PaymentMethod::StoreCredit { .. } | PaymentMethod::CashbackRedeem, _, _)
                    if customer_id.is_none() =>
                {
                    return Err(PaymentError::missing_customer(leg.kind().label()));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates `plan` against `ctx`.
///
/// ## Errors
/// Any [`PaymentError`]; none of them consume the draft.
pub fn validate_payment(plan: &PaymentPlan, ctx: &PaymentContext<'_>) -> PaymentResult<ValidatedPlan> {
    let legs = match plan {
        PaymentPlan::Single { method, tendered } => {
            vec![validate_single(method, *tendered, ctx)?]
        }
        PaymentPlan::Split { first, second } => validate_split(first, second, ctx)?,
    };

    Ok(ValidatedPlan {
        amount_due: ctx.amount_due,
        legs,
        customer_id: ctx.customer.map(|c| c.id.clone()),
    })
}

fn validate_single(
    method: &PaymentMethod,
    tendered: Option<Money>,
    ctx: &PaymentContext<'_>,
) -> PaymentResult<SettledLeg> {
    let due = ctx.amount_due;

    match method {
        PaymentMethod::Cash => {
            let received = tendered.unwrap_or(due);
            if received < due {
                return Err(PaymentError::InsufficientAmount {
                    required: due,
                    received,
                });
            }
            Ok(SettledLeg {
                tendered: Some(received),
                change: received - due,
                ..SettledLeg::settled(method.clone(), due)
            })
        }
        PaymentMethod::CashbackRedeem => {
            let requested = tendered.unwrap_or(due);
            check_redemption(requested, due, ctx)?;
            if requested < due {
                return Err(PaymentError::PartialRedemptionNotAllowed {
                    amount_due: due,
                    requested,
                });
            }
            Ok(SettledLeg {
                tendered: Some(requested),
                ..SettledLeg::settled(method.clone(), due)
            })
        }
        _ => validate_leg_method(method, due, ctx),
    }
}

fn validate_split(
    first: &PaymentLeg,
    second: &PaymentLeg,
    ctx: &PaymentContext<'_>,
) -> PaymentResult<Vec<SettledLeg>> {
    if first.method.kind() == PaymentKind::CashbackRedeem
        && second.method.kind() == PaymentKind::CashbackRedeem
    {
        return Err(PaymentError::DuplicateRedemption);
    }
    if let (PaymentMethod::Coupon { code: a }, PaymentMethod::Coupon { code: b }) =
        (&first.method, &second.method)
    {
        if normalize(a) == normalize(b) {
            return Err(PaymentError::CouponAlreadyUsed { code: normalize(a) });
        }
    }

    let legs = [first, second]
        .into_iter()
        .map(|leg| validate_split_leg(leg, ctx))
        .collect::<PaymentResult<Vec<_>>>()?;

    let legs_total = first.amount + second.amount;
    if !legs_total.within(ctx.amount_due, RECONCILIATION_TOLERANCE) {
        return Err(PaymentError::AmountMismatch {
            amount_due: ctx.amount_due,
            legs_total,
        });
    }

    Ok(legs)
}

fn validate_split_leg(leg: &PaymentLeg, ctx: &PaymentContext<'_>) -> PaymentResult<SettledLeg> {
    if !leg.amount.is_positive() {
        return Err(PaymentError::InsufficientAmount {
            required: Money::from_cents(1),
            received: leg.amount,
        });
    }

    match &leg.method {
        // No change inside a split: the leg amount is what the drawer keeps.
        PaymentMethod::Cash => Ok(SettledLeg {
            tendered: Some(leg.amount),
            ..SettledLeg::settled(leg.method.clone(), leg.amount)
        }),
        PaymentMethod::CashbackRedeem => {
            check_redemption(leg.amount, Money::from_cents(1), ctx)?;
            Ok(SettledLeg {
                tendered: Some(leg.amount),
                ..SettledLeg::settled(leg.method.clone(), leg.amount)
            })
        }
        method => validate_leg_method(method, leg.amount, ctx),
    }
}

/// Checks shared by Card, Pix, StoreCredit and Coupon, wherever they appear.
fn validate_leg_method(
    method: &PaymentMethod,
    amount: Money,
    ctx: &PaymentContext<'_>,
) -> PaymentResult<SettledLeg> {
    match method {
        PaymentMethod::Card { tier } => {
            let profile = ctx
                .fee_profile
                .ok_or_else(|| PaymentError::ConfigurationMissing {
                    what: "Card fee profile".to_string(),
                })?;
            let tier = tier.ok_or_else(|| PaymentError::MissingSelection {
                what: "a card tier".to_string(),
            })?;
            let rate = resolve_fee(Some(profile), tier)?;
            Ok(SettledLeg {
                card: Some(CardCharge {
                    tier,
                    rate,
                    fee: fee_amount(amount, rate),
                }),
                ..SettledLeg::settled(method.clone(), amount)
            })
        }
        PaymentMethod::StoreCredit {
            installments,
            first_due_date,
        } => {
            if ctx.customer.is_none() {
                return Err(PaymentError::missing_customer(method.kind().label()));
            }
            let first_due = first_due_date.ok_or(PaymentError::MissingDate)?;
            validate_installment_count(*installments)?;
            let schedule = generate_schedule(amount, *installments, first_due)?;
            Ok(SettledLeg {
                schedule: Some(schedule),
                ..SettledLeg::settled(method.clone(), amount)
            })
        }
        PaymentMethod::Coupon { code } => {
            let value = ctx.coupons.resolve(code)?;
            let code = normalize(code);
            if ctx.applied_coupon.is_some_and(|applied| normalize(applied) == code) {
                return Err(PaymentError::CouponAlreadyUsed { code });
            }
            // A sole coupon settles the whole amount due, so it must cover it.
            if amount > value {
                return Err(PaymentError::CouponValueExceeded {
                    code,
                    value,
                    requested: amount,
                });
            }
            Ok(SettledLeg::settled(method.clone(), amount))
        }
        PaymentMethod::Pix | PaymentMethod::Cash | PaymentMethod::CashbackRedeem => {
            Ok(SettledLeg::settled(method.clone(), amount))
        }
    }
}

/// Customer bound, positive amount, within balance.
fn check_redemption(requested: Money, minimum: Money, ctx: &PaymentContext<'_>) -> PaymentResult<()> {
    if ctx.customer.is_none() {
        return Err(PaymentError::missing_customer(
            PaymentKind::CashbackRedeem.label(),
        ));
    }

    if !requested.is_positive() {
        return Err(PaymentError::InsufficientAmount {
            required: minimum,
            received: requested,
        });
    }

    let balance = ctx.balance();
    if requested > balance {
        return Err(PaymentError::InsufficientBalance { balance, requested });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::tests::test_profile;
    use crate::types::Customer;

    fn reais(r: i64) -> Money {
        Money::from_major_minor(r, 0)
    }

    fn customer(balance_cents: i64) -> Customer {
        Customer {
            id: "cust-1".to_string(),
            name: "Maria".to_string(),
            phone: Some("11999990000".to_string()),
            cashback_balance_cents: balance_cents,
        }
    }

    fn first_due() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 5, 10)
    }

    #[test]
    fn test_cash_change() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(Money::from_cents(7350), &coupons);

        let plan = validate_payment(&PaymentPlan::cash(reais(100)), &ctx).unwrap();
        assert_eq!(plan.change().cents(), 2650);
        assert_eq!(plan.legs[0].amount.cents(), 7350);

        let err = validate_payment(&PaymentPlan::cash(reais(50)), &ctx).unwrap_err();
        assert_eq!(
            err,
            PaymentError::InsufficientAmount {
                required: Money::from_cents(7350),
                received: reais(50),
            }
        );
    }

    #[test]
    fn test_split_reconciliation() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(reais(100), &coupons);

        let ok = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Pix, reais(60)),
            PaymentLeg::new(PaymentMethod::Cash, reais(40)),
        );
        let plan = validate_payment(&ok, &ctx).unwrap();
        assert!(plan.is_split());
        assert_eq!(plan.settled_total(), reais(100));
        assert!(plan.change().is_zero());

        let short = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Pix, reais(60)),
            PaymentLeg::new(PaymentMethod::Cash, reais(39)),
        );
        assert!(matches!(
            validate_payment(&short, &ctx),
            Err(PaymentError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_split_tolerates_one_cent() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(Money::from_cents(10000), &coupons);

        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Pix, Money::from_cents(3333)),
            PaymentLeg::new(PaymentMethod::Cash, Money::from_cents(6666)),
        );
        let validated = validate_payment(&plan, &ctx).unwrap();
        assert_eq!(validated.legs[0].amount.cents(), 3333);
        assert_eq!(validated.legs[1].amount.cents(), 6666);
    }

    #[test]
    fn test_sole_cashback_redemption() {
        let coupons = CouponTable::default();
        let maria = customer(10000);
        let ctx = PaymentContext::new(reais(80), &coupons)
            .with_customer(Some(&maria))
            .with_cashback_balance(Some(reais(100)));

        let redeem = |amount| PaymentPlan::Single {
            method: PaymentMethod::CashbackRedeem,
            tendered: Some(amount),
        };

        let plan = validate_payment(&redeem(reais(80)), &ctx).unwrap();
        assert_eq!(plan.cashback_redeemed(), reais(80));

        assert_eq!(
            validate_payment(&redeem(reais(50)), &ctx),
            Err(PaymentError::PartialRedemptionNotAllowed {
                amount_due: reais(80),
                requested: reais(50),
            })
        );
        assert_eq!(
            validate_payment(&redeem(reais(120)), &ctx),
            Err(PaymentError::InsufficientBalance {
                balance: reais(100),
                requested: reais(120),
            })
        );
    }

    #[test]
    fn test_cashback_over_due_settles_only_due() {
        let coupons = CouponTable::default();
        let maria = customer(0);
        let ctx = PaymentContext::new(reais(80), &coupons)
            .with_customer(Some(&maria))
            .with_cashback_balance(Some(reais(100)));

        let plan = PaymentPlan::Single {
            method: PaymentMethod::CashbackRedeem,
            tendered: Some(reais(90)),
        };
        let validated = validate_payment(&plan, &ctx).unwrap();
        assert_eq!(validated.cashback_redeemed(), reais(80));
        assert!(validated.change().is_zero());
    }

    #[test]
    fn test_cashback_requires_customer() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(reais(10), &coupons);

        assert!(matches!(
            validate_payment(&PaymentPlan::single(PaymentMethod::CashbackRedeem), &ctx),
            Err(PaymentError::MissingCustomer { .. })
        ));
    }

    #[test]
    fn test_split_partial_redemption_allowed() {
        let coupons = CouponTable::default();
        let maria = customer(0);
        let ctx = PaymentContext::new(reais(80), &coupons)
            .with_customer(Some(&maria))
            .with_cashback_balance(Some(reais(50)));

        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::CashbackRedeem, reais(50)),
            PaymentLeg::new(PaymentMethod::Pix, reais(30)),
        );
        let validated = validate_payment(&plan, &ctx).unwrap();
        assert_eq!(validated.cashback_redeemed(), reais(50));
        assert_eq!(validated.customer_id.as_deref(), Some("cust-1"));
    }

    #[test]
    fn test_duplicate_redemption() {
        let coupons = CouponTable::default();
        let maria = customer(100000);
        let ctx = PaymentContext::new(reais(80), &coupons).with_customer(Some(&maria));

        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::CashbackRedeem, reais(40)),
            PaymentLeg::new(PaymentMethod::CashbackRedeem, reais(40)),
        );
        assert_eq!(
            validate_payment(&plan, &ctx),
            Err(PaymentError::DuplicateRedemption)
        );
    }

    #[test]
    fn test_split_leg_must_be_positive() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(reais(80), &coupons);

        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Pix, reais(80)),
            PaymentLeg::new(PaymentMethod::Cash, Money::zero()),
        );
        assert!(matches!(
            validate_payment(&plan, &ctx),
            Err(PaymentError::InsufficientAmount { .. })
        ));
    }

    #[test]
    fn test_card_requires_profile_and_tier() {
        let coupons = CouponTable::default();
        let profile = test_profile();
        let no_profile = PaymentContext::new(reais(100), &coupons);
        let with_profile = no_profile.with_fee_profile(Some(&profile));

        let card = |tier| PaymentPlan::single(PaymentMethod::Card { tier });

        let err = validate_payment(&card(Some(CardTier::Debit)), &no_profile).unwrap_err();
        assert_eq!(err.kind(), crate::error::PaymentErrorKind::Configuration);

        assert!(matches!(
            validate_payment(&card(None), &with_profile),
            Err(PaymentError::MissingSelection { .. })
        ));
        assert!(matches!(
            validate_payment(&card(Some(CardTier::Credit(12))), &with_profile),
            Err(PaymentError::MissingSelection { .. })
        ));

        let plan = validate_payment(&card(Some(CardTier::Credit(2))), &with_profile).unwrap();
        let charge = plan.legs[0].card.unwrap();
        assert_eq!(charge.fee.cents(), 459);
        // fee is display-only
        assert_eq!(plan.settled_total(), reais(100));
    }

    #[test]
    fn test_store_credit_preconditions() {
        let coupons = CouponTable::default();
        let maria = customer(0);
        let anonymous = PaymentContext::new(reais(100), &coupons);
        let bound = anonymous.with_customer(Some(&maria));

        let credit = |installments, first_due_date| {
            PaymentPlan::single(PaymentMethod::StoreCredit {
                installments,
                first_due_date,
            })
        };

        assert!(matches!(
            validate_payment(&credit(3, first_due()), &anonymous),
            Err(PaymentError::MissingCustomer { .. })
        ));
        assert_eq!(
            validate_payment(&credit(3, None), &bound),
            Err(PaymentError::MissingDate)
        );
        assert!(matches!(
            validate_payment(&credit(7, first_due()), &bound),
            Err(PaymentError::InvalidInstallmentCount { requested: 7, .. })
        ));

        let zero_due = PaymentContext::new(Money::zero(), &coupons).with_customer(Some(&maria));
        assert_eq!(
            validate_payment(&credit(3, first_due()), &zero_due),
            Err(PaymentError::NothingToFinance)
        );

        let plan = validate_payment(&credit(3, first_due()), &bound).unwrap();
        let schedule = plan.legs[0].schedule.as_ref().unwrap();
        assert_eq!(schedule.total(), reais(100));
        assert_eq!(schedule.installments[0].amount.cents(), 3334);
    }

    #[test]
    fn test_store_credit_in_split_finances_leg_amount() {
        let coupons = CouponTable::default();
        let maria = customer(0);
        let ctx = PaymentContext::new(reais(100), &coupons).with_customer(Some(&maria));

        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Cash, reais(40)),
            PaymentLeg::new(
                PaymentMethod::StoreCredit {
                    installments: 2,
                    first_due_date: first_due(),
                },
                reais(60),
            ),
        );
        let validated = validate_payment(&plan, &ctx).unwrap();
        let schedule = validated.legs[1].schedule.as_ref().unwrap();
        assert_eq!(schedule.total(), reais(60));
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_coupon_method() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(reais(10), &coupons);

        let ok = PaymentPlan::single(PaymentMethod::Coupon {
            code: "DESC10".to_string(),
        });
        assert!(validate_payment(&ok, &ctx).is_ok());

        let bad = PaymentPlan::single(PaymentMethod::Coupon {
            code: "BOGUS".to_string(),
        });
        assert!(matches!(
            validate_payment(&bad, &ctx),
            Err(PaymentError::InvalidCoupon { .. })
        ));
    }

    #[test]
    fn test_coupon_leg_bounded_by_value() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(reais(1000), &coupons);
        let desc10 = || PaymentMethod::Coupon {
            code: "desc10".to_string(),
        };

        // Alone it would have to settle R$ 1.000,00.
        assert_eq!(
            validate_payment(&PaymentPlan::single(desc10()), &ctx),
            Err(PaymentError::CouponValueExceeded {
                code: "DESC10".to_string(),
                value: reais(10),
                requested: reais(1000),
            })
        );

        let inflated = PaymentPlan::split(
            PaymentLeg::new(desc10(), reais(990)),
            PaymentLeg::new(PaymentMethod::Pix, reais(10)),
        );
        assert!(matches!(
            validate_payment(&inflated, &ctx),
            Err(PaymentError::CouponValueExceeded { .. })
        ));

        let fair = PaymentPlan::split(
            PaymentLeg::new(desc10(), reais(10)),
            PaymentLeg::new(PaymentMethod::Pix, reais(990)),
        );
        let plan = validate_payment(&fair, &ctx).unwrap();
        assert_eq!(plan.legs[0].amount, reais(10));

        // A coupon worth more than the sale settles only the amount due.
        let small = PaymentContext::new(reais(8), &coupons);
        let plan = validate_payment(&PaymentPlan::single(desc10()), &small).unwrap();
        assert_eq!(plan.settled_total(), reais(8));
    }

    #[test]
    fn test_coupon_used_once_per_sale() {
        let coupons = CouponTable::default();
        let ctx = PaymentContext::new(reais(90), &coupons).with_applied_coupon(Some("DESC10"));
        let coupon = |code: &str| PaymentMethod::Coupon {
            code: code.to_string(),
        };

        let reused = PaymentPlan::split(
            PaymentLeg::new(coupon(" desc10 "), reais(10)),
            PaymentLeg::new(PaymentMethod::Pix, reais(80)),
        );
        assert_eq!(
            validate_payment(&reused, &ctx),
            Err(PaymentError::CouponAlreadyUsed {
                code: "DESC10".to_string()
            })
        );

        let twice = PaymentPlan::split(
            PaymentLeg::new(coupon("DESC20"), reais(20)),
            PaymentLeg::new(coupon("desc20"), reais(70)),
        );
        assert!(matches!(
            validate_payment(&twice, &ctx),
            Err(PaymentError::CouponAlreadyUsed { .. })
        ));
    }

    #[test]
    fn test_verify_accepts_validated_plan() {
        let coupons = CouponTable::default();
        let maria = customer(0);
        let ctx = PaymentContext::new(reais(100), &coupons).with_customer(Some(&maria));
        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Pix, reais(40)),
            PaymentLeg::new(
                PaymentMethod::StoreCredit {
                    installments: 3,
                    first_due_date: first_due(),
                },
                reais(60),
            ),
        );

        let validated = validate_payment(&plan, &ctx).unwrap();
        assert_eq!(validated.verify(reais(100), Some("cust-1")), Ok(()));
    }

    #[test]
    fn test_verify_rejects_hand_built_plans() {
        let empty = ValidatedPlan {
            amount_due: reais(100),
            legs: vec![],
            customer_id: None,
        };
        assert!(matches!(
            empty.verify(reais(100), None),
            Err(PaymentError::MalformedPlan { .. })
        ));

        let short = ValidatedPlan {
            legs: vec![SettledLeg::settled(PaymentMethod::Pix, reais(60))],
            ..empty.clone()
        };
        assert_eq!(
            short.verify(reais(100), None),
            Err(PaymentError::AmountMismatch {
                amount_due: reais(100),
                legs_total: reais(60),
            })
        );

        let other_customer = ValidatedPlan {
            legs: vec![SettledLeg::settled(PaymentMethod::Pix, reais(100))],
            customer_id: Some("cust-2".to_string()),
            ..empty.clone()
        };
        assert!(matches!(
            other_customer.verify(reais(100), Some("cust-1")),
            Err(PaymentError::MalformedPlan { .. })
        ));

        let bare_crediario = ValidatedPlan {
            legs: vec![SettledLeg::settled(
                PaymentMethod::StoreCredit {
                    installments: 2,
                    first_due_date: first_due(),
                },
                reais(100),
            )],
            customer_id: Some("cust-1".to_string()),
            ..empty
        };
        assert!(matches!(
            bare_crediario.verify(reais(100), Some("cust-1")),
            Err(PaymentError::MalformedPlan { .. })
        ));
    }

    #[test]
    fn test_plan_serde_shape() {
        let plan = PaymentPlan::split(
            PaymentLeg::new(PaymentMethod::Card { tier: Some(CardTier::Credit(3)) }, reais(60)),
            PaymentLeg::new(PaymentMethod::Pix, reais(40)),
        );
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["mode"], "split");
        assert_eq!(json["first"]["method"]["method"], "card");
        assert_eq!(json["first"]["method"]["tier"], "3x");
    }
}
