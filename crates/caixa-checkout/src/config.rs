//! # Checkout Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAIXA_COMPANY_ID=loja-1                                            │
//! │     CAIXA_CASHBACK_RATE_BPS=200                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/caixa-pos/checkout.toml (Linux)                          │
//! │     ~/Library/Application Support/br.caixa.pos/checkout.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     5 sale-id attempts, DESC10/DESC20 coupons, counter sales           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! company_id = "loja-1"
//! terminal_id = "caixa-01"
//! database_path = "/var/lib/caixa/caixa.db"
//!
//! [sale]
//! sale_id_attempts = 5
//! cashback_earn_rate_bps = 200
//! card_fee_payer = "store"
//! default_channel = "counter"
//! default_receipt = "print"
//!
//! [coupons]
//! DESC10 = 1000
//! DESC20 = 2000
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use caixa_core::types::Rate;
use caixa_core::validation::{validate_amount, validate_coupon_code, validate_rate};
use caixa_core::{CouponTable, Money, ReceiptPreference, SaleChannel};
use caixa_db::DbConfig;

use crate::error::{ConfigError, ConfigResult};

/// Upper bound for `sale_id_attempts`.
pub const MAX_SALE_ID_ATTEMPTS: u32 = 20;

// =============================================================================
// Card Fee Payer
// =============================================================================

/// Who absorbs card fees.
///
/// Recorded for the back office only: fees are shown to the operator and
/// never added to the amount due, whatever this says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardFeePayer {
    #[default]
    Store,
    Customer,
}

impl std::str::FromStr for CardFeePayer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "store" | "loja" => Ok(CardFeePayer::Store),
            "customer" | "cliente" => Ok(CardFeePayer::Customer),
            other => Err(ConfigError::Invalid(format!(
                "Unknown card fee payer: '{}'. Valid options: store, customer",
                other
            ))),
        }
    }
}

fn parse_channel(s: &str) -> Option<SaleChannel> {
    match s.to_lowercase().as_str() {
        "counter" | "balcao" => Some(SaleChannel::Counter),
        "delivery" => Some(SaleChannel::Delivery),
        "online" => Some(SaleChannel::Online),
        _ => None,
    }
}

fn parse_receipt(s: &str) -> Option<ReceiptPreference> {
    match s.to_lowercase().as_str() {
        "none" => Some(ReceiptPreference::None),
        "print" => Some(ReceiptPreference::Print),
        "whatsapp" => Some(ReceiptPreference::Whatsapp),
        "email" => Some(ReceiptPreference::Email),
        _ => None,
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Which store and terminal this engine runs for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Owner of the fee profiles.
    #[serde(default = "default_company_id")]
    pub company_id: String,

    #[serde(default = "default_terminal_id")]
    pub terminal_id: String,

    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_company_id() -> String {
    "default-company".to_string()
}

fn default_terminal_id() -> String {
    "caixa-01".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            company_id: default_company_id(),
            terminal_id: default_terminal_id(),
            database_path: None,
        }
    }
}

// =============================================================================
// Sale Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSettings {
    /// Sale id candidates tried before giving up.
    #[serde(default = "default_sale_id_attempts")]
    pub sale_id_attempts: u32,

    /// Cashback earned per sale, in basis points of the amount due.
    #[serde(default)]
    pub cashback_earn_rate_bps: u32,

    #[serde(default)]
    pub card_fee_payer: CardFeePayer,

    #[serde(default)]
    pub default_channel: SaleChannel,

    #[serde(default)]
    pub default_receipt: ReceiptPreference,
}

fn default_sale_id_attempts() -> u32 {
    5
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            sale_id_attempts: default_sale_id_attempts(),
            cashback_earn_rate_bps: 0,
            card_fee_payer: CardFeePayer::default(),
            default_channel: SaleChannel::default(),
            default_receipt: ReceiptPreference::default(),
        }
    }
}

fn default_coupons() -> BTreeMap<String, i64> {
    BTreeMap::from([("DESC10".to_string(), 1000), ("DESC20".to_string(), 2000)])
}

// =============================================================================
// Main Checkout Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub sale: SaleSettings,

    /// Coupon code → fixed discount in cents.
    #[serde(default = "default_coupons")]
    pub coupons: BTreeMap<String, i64>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            store: StoreSettings::default(),
            sale: SaleSettings::default(),
            coupons: default_coupons(),
        }
    }
}

impl CheckoutConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.company_id.trim().is_empty() {
            return Err(ConfigError::Invalid("company_id must not be empty".into()));
        }
        if self.store.terminal_id.trim().is_empty() {
            return Err(ConfigError::Invalid("terminal_id must not be empty".into()));
        }

        if !(1..=MAX_SALE_ID_ATTEMPTS).contains(&self.sale.sale_id_attempts) {
            return Err(ConfigError::Invalid(format!(
                "sale_id_attempts must be between 1 and {}, got {}",
                MAX_SALE_ID_ATTEMPTS, self.sale.sale_id_attempts
            )));
        }

        validate_rate("cashback_earn_rate_bps", self.cashback_earn_rate())?;

        for (code, cents) in &self.coupons {
            validate_coupon_code(code)?;
            validate_amount(code, Money::from_cents(*cents))?;
        }

        Ok(())
    }

    /// Applies `CAIXA_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("CAIXA_COMPANY_ID") {
            debug!(company_id = %id, "Overriding company ID from environment");
            self.store.company_id = id;
        }

        if let Some(id) = lookup("CAIXA_TERMINAL_ID") {
            self.store.terminal_id = id;
        }

        if let Some(path) = lookup("CAIXA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Some(attempts) = lookup("CAIXA_SALE_ID_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.sale.sale_id_attempts = n,
                Err(_) => warn!(value = %attempts, "Invalid CAIXA_SALE_ID_ATTEMPTS"),
            }
        }

        if let Some(rate) = lookup("CAIXA_CASHBACK_RATE_BPS") {
            match rate.parse::<u32>() {
                Ok(bps) => self.sale.cashback_earn_rate_bps = bps,
                Err(_) => warn!(value = %rate, "Invalid CAIXA_CASHBACK_RATE_BPS"),
            }
        }

        if let Some(payer) = lookup("CAIXA_CARD_FEE_PAYER") {
            match payer.parse() {
                Ok(parsed) => self.sale.card_fee_payer = parsed,
                Err(e) => warn!(error = %e, "Ignoring CAIXA_CARD_FEE_PAYER"),
            }
        }

        if let Some(channel) = lookup("CAIXA_DEFAULT_CHANNEL") {
            match parse_channel(&channel) {
                Some(parsed) => self.sale.default_channel = parsed,
                None => warn!(channel = %channel, "Unknown sale channel in environment"),
            }
        }

        if let Some(receipt) = lookup("CAIXA_DEFAULT_RECEIPT") {
            match parse_receipt(&receipt) {
                Some(parsed) => self.sale.default_receipt = parsed,
                None => warn!(receipt = %receipt, "Unknown receipt preference in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "caixa", "pos")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn company_id(&self) -> &str {
        &self.store.company_id
    }

    pub fn cashback_earn_rate(&self) -> Rate {
        Rate::from_bps(self.sale.cashback_earn_rate_bps)
    }

    /// Coupon table for the totals cascade and coupon payments.
    pub fn coupon_table(&self) -> CouponTable {
        CouponTable::from_cents(self.coupons.iter().map(|(code, cents)| (code, *cents)))
    }

    /// SQLite file location: configured path, else the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        self.store.database_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("br", "caixa", "pos")
                .map(|dirs| dirs.data_dir().join("caixa.db"))
                .unwrap_or_else(|| PathBuf::from("caixa.db"))
        })
    }

    /// Pool configuration for [`caixa_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
    }
}
