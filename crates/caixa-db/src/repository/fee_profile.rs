//! # Fee Profile Repository
//!
//! Card-terminal fee schedules, stored one row per tier.
//!
//! ```text
//! fee_profile_rates
//! ┌────────────┬──────────────┬───────┬──────────┐
//! │ company_id │ profile_name │ tier  │ rate_bps │
//! ├────────────┼──────────────┼───────┼──────────┤
//! │ loja-1     │ Stone        │ debit │ 199      │
//! │ loja-1     │ Stone        │ 1x    │ 319      │   ──►  FeeProfile "Stone"
//! │ loja-1     │ Stone        │ 2x    │ 459      │
//! └────────────┴──────────────┴───────┴──────────┘
//! ```

use std::collections::BTreeMap;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use caixa_core::types::Rate;
use caixa_core::{CardTier, FeeProfile};

#[derive(Debug, sqlx::FromRow)]
struct FeeRateRow {
    profile_name: String,
    tier: String,
    rate_bps: i64,
}

/// Repository for fee profile operations.
#[derive(Debug, Clone)]
pub struct FeeProfileRepository {
    pool: SqlitePool,
}

impl FeeProfileRepository {
    /// Creates a new FeeProfileRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FeeProfileRepository { pool }
    }

    /// Loads every profile configured for `company_id`, ordered by name.
    pub async fn list_for_company(&self, company_id: &str) -> DbResult<Vec<FeeProfile>> {
        let rows = sqlx::query_as::<_, FeeRateRow>(
            r#"
            SELECT profile_name, tier, rate_bps
            FROM fee_profile_rates
            WHERE company_id = ?1
            ORDER BY profile_name
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        let mut profiles: BTreeMap<String, FeeProfile> = BTreeMap::new();
        for row in rows {
            let tier: CardTier = row.tier.parse().map_err(|e| DbError::InvalidRow {
                table: "fee_profile_rates".to_string(),
                reason: format!("{}", e),
            })?;
            let rate = u32::try_from(row.rate_bps).map_err(|_| DbError::InvalidRow {
                table: "fee_profile_rates".to_string(),
                reason: format!("negative rate {}", row.rate_bps),
            })?;

            profiles
                .entry(row.profile_name.clone())
                .or_insert_with(|| FeeProfile::new(row.profile_name))
                .rates
                .insert(tier, Rate::from_bps(rate));
        }

        debug!(company_id = %company_id, count = profiles.len(), "Fee profiles loaded");
        Ok(profiles.into_values().collect())
    }

    /// Inserts or replaces one tier rate.
    pub async fn upsert_rate(
        &self,
        company_id: &str,
        profile_name: &str,
        tier: CardTier,
        rate: Rate,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fee_profile_rates (company_id, profile_name, tier, rate_bps)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (company_id, profile_name, tier) DO UPDATE SET rate_bps = excluded.rate_bps
            "#,
        )
        .bind(company_id)
        .bind(profile_name)
        .bind(tier.to_string())
        .bind(rate.bps() as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stores a whole profile.
    pub async fn save(&self, company_id: &str, profile: &FeeProfile) -> DbResult<()> {
        for (tier, rate) in &profile.rates {
            self.upsert_rate(company_id, &profile.name, *tier, *rate).await?;
        }
        Ok(())
    }
}
