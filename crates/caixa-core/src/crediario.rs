//! # Crediário
//!
//! Store-issued installment credit: splits a principal into N monthly
//! receivables.
//!
//! ```text
//! principal R$ 100,00, N = 3, first due 2024-01-31
//!
//!   #1  2024-01-31  R$ 33,34   ◄── absorbs the remainder
//!   #2  2024-02-29  R$ 33,33   ◄── clamped to month end
//!   #3  2024-03-31  R$ 33,33   ◄── computed from the first date, not from #2
//! ```

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{PaymentError, PaymentResult};
use crate::money::Money;

/// Fewest installments a crediário may have.
pub const MIN_INSTALLMENTS: u8 = 2;

/// Most installments a crediário may have.
pub const MAX_INSTALLMENTS: u8 = 6;

/// One receivable of a crediário schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstallmentReceivable {
    /// 1-based position in the schedule.
    pub sequence: u8,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// Ordered installments of a crediário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CrediarioSchedule {
    pub installments: Vec<InstallmentReceivable>,
}

impl CrediarioSchedule {
    /// Sum of every installment (always equals the principal).
    pub fn total(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }
}

/// Checks the installment count against the allowed range.
pub fn validate_installment_count(count: u8) -> PaymentResult<()> {
    if (MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
        Ok(())
    } else {
        Err(PaymentError::InvalidInstallmentCount {
            requested: count,
            min: MIN_INSTALLMENTS,
            max: MAX_INSTALLMENTS,
        })
    }
}

/// Generates the schedule for `principal` over `count` months from `first_due`.
///
/// ## Errors
/// - `NothingToFinance` for a zero (or negative) principal
/// - `InvalidInstallmentCount` outside 2..=6
///
/// ## Example
/// ```rust
/// use caixa_core::crediario::generate_schedule;
/// use caixa_core::money::Money;
/// use chrono::NaiveDate;
///
/// let first = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// let schedule = generate_schedule(Money::from_cents(10000), 3, first).unwrap();
/// let amounts: Vec<i64> = schedule.installments.iter().map(|i| i.amount.cents()).collect();
/// assert_eq!(amounts, vec![3334, 3333, 3333]);
/// ```
pub fn generate_schedule(
    principal: Money,
    count: u8,
    first_due: NaiveDate,
) -> PaymentResult<CrediarioSchedule> {
    if !principal.is_positive() {
        return Err(PaymentError::NothingToFinance);
    }
    validate_installment_count(count)?;

    let (base, remainder) = principal.split_even(count as u32);

    let installments = (1..=count)
        .map(|sequence| {
            let amount = if sequence == 1 { base + remainder } else { base };
            Ok(InstallmentReceivable {
                sequence,
                due_date: due_date_for(first_due, sequence)?,
                amount,
            })
        })
        .collect::<PaymentResult<Vec<_>>>()?;

    Ok(CrediarioSchedule { installments })
}

/// Due date of installment `sequence`: `first_due + (sequence − 1)` months,
/// clamped to the last day of the target month.
fn due_date_for(first_due: NaiveDate, sequence: u8) -> PaymentResult<NaiveDate> {
    first_due
        .checked_add_months(Months::new(u32::from(sequence) - 1))
        .ok_or(PaymentError::MissingDate)
}
