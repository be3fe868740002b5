//! # Card Fees
//!
//! Fee schedule resolution for card payments.
//!
//! ## Fee Profiles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FeeProfile "Stone"                                                     │
//! │                                                                         │
//! │   debit ─► 1,99%     1x ─► 3,19%     2x ─► 4,59%   ...   12x ─► 0%     │
//! │                                                                  │      │
//! │                                                  not offered ◄───┘      │
//! │                                                                         │
//! │  resolve_fee(profile, 2x) ─► 4,59%                                     │
//! │  fee_amount(R$ 100,00, 4,59%) ─► R$ 4,59 (display only)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fees are shown to the operator and never change the amount due.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{PaymentError, PaymentResult, ValidationError};
use crate::money::Money;
use crate::types::Rate;

/// Highest credit installment tier a terminal may offer.
pub const MAX_CARD_INSTALLMENTS: u8 = 12;

// =============================================================================
// Card Tier
// =============================================================================

/// A card installment tier: debit or credit in 1 to 12 installments.
///
/// Serialized as `"debit"`, `"1x"` … `"12x"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CardTier {
    Debit,
    Credit(u8),
}

impl CardTier {
    /// All tiers a profile can configure, in display order.
    pub fn all() -> impl Iterator<Item = CardTier> {
        std::iter::once(CardTier::Debit).chain((1..=MAX_CARD_INSTALLMENTS).map(CardTier::Credit))
    }

    /// Number of installments the customer pays.
    pub fn installments(&self) -> u8 {
        match self {
            CardTier::Debit => 1,
            CardTier::Credit(n) => *n,
        }
    }
}

impl fmt::Display for CardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardTier::Debit => write!(f, "debit"),
            CardTier::Credit(n) => write!(f, "{}x", n),
        }
    }
}

impl FromStr for CardTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "debit" {
            return Ok(CardTier::Debit);
        }

        let invalid = || ValidationError::InvalidFormat {
            field: "card tier".to_string(),
            reason: format!("expected 'debit' or '1x'..'{}x'", MAX_CARD_INSTALLMENTS),
        };

        let count: u8 = s
            .strip_suffix('x')
            .and_then(|n| n.parse().ok())
            .ok_or_else(invalid)?;

        if (1..=MAX_CARD_INSTALLMENTS).contains(&count) {
            Ok(CardTier::Credit(count))
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for CardTier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CardTier> for String {
    fn from(tier: CardTier) -> Self {
        tier.to_string()
    }
}

// =============================================================================
// Fee Profile
// =============================================================================

/// A named card-terminal fee schedule ("machine").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeProfile {
    pub name: String,
    pub rates: BTreeMap<CardTier, Rate>,
}

impl FeeProfile {
    /// Creates an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        FeeProfile {
            name: name.into(),
            rates: BTreeMap::new(),
        }
    }

    /// Builder-style rate assignment.
    pub fn with_rate(mut self, tier: CardTier, rate: Rate) -> Self {
        self.rates.insert(tier, rate);
        self
    }
}

/// A tier as offered to the operator for the current amount due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierQuote {
    #[ts(as = "String")]
    pub tier: CardTier,
    pub rate: Rate,
    /// Fee on the amount due (display only).
    pub fee: Money,
    /// Amount due divided by the installment count, floored to the cent.
    pub per_installment: Money,
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves the rate configured for `tier`.
///
/// ## Errors
/// - `ConfigurationMissing` when no profile is selected
/// - `MissingSelection` when the tier is absent or configured at 0%
pub fn resolve_fee(profile: Option<&FeeProfile>, tier: CardTier) -> PaymentResult<Rate> {
    let profile = profile.ok_or_else(|| PaymentError::ConfigurationMissing {
        what: "Card fee profile".to_string(),
    })?;

    match profile.rates.get(&tier) {
        Some(rate) if !rate.is_zero() => Ok(*rate),
        _ => Err(PaymentError::MissingSelection {
            what: format!("a card tier offered by {}", profile.name),
        }),
    }
}

/// Tiers the profile offers (non-zero rate), in tier order.
pub fn offered_tiers(profile: &FeeProfile) -> Vec<CardTier> {
    profile
        .rates
        .iter()
        .filter(|(_, rate)| !rate.is_zero())
        .map(|(tier, _)| *tier)
        .collect()
}

/// Fee charged on `amount` at `rate`.
#[inline]
pub fn fee_amount(amount: Money, rate: Rate) -> Money {
    amount.percent_of(rate)
}

/// Quotes every offered tier for `amount_due`.
pub fn quote_tiers(profile: &FeeProfile, amount_due: Money) -> Vec<TierQuote> {
    offered_tiers(profile)
        .into_iter()
        .filter_map(|tier| {
            let rate = *profile.rates.get(&tier)?;
            let (per_installment, _) = amount_due.split_even(tier.installments() as u32);
            Some(TierQuote {
                tier,
                rate,
                fee: fee_amount(amount_due, rate),
                per_installment,
            })
        })
        .collect()
}
