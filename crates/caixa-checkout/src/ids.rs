//! # Sale Identifiers
//!
//! Human-readable sale ids: local date plus a short random suffix.
//!
//! ```text
//!   241018-7F3A
//!   ──┬─── ──┬─
//!     │      └── 4 hex chars from a UUID v4
//!     └───────── YYMMDD (terminal local date)
//! ```
//!
//! Collisions are possible by construction; the engine checks each
//! candidate against storage and retries a bounded number of times.

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::ports::SaleIdGenerator;

/// Default generator: `YYMMDD-XXXX`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateSuffixIds;

impl DateSuffixIds {
    /// Candidate for a given date (exposed for tests and backfills).
    pub fn candidate_for(date: NaiveDate) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", date.format("%y%m%d"), suffix[..4].to_ascii_uppercase())
    }
}

impl SaleIdGenerator for DateSuffixIds {
    fn candidate(&self) -> String {
        Self::candidate_for(Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_format() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let id = DateSuffixIds::candidate_for(date);

        assert_eq!(id.len(), 11);
        assert!(id.starts_with("240601-"));
        assert!(id[7..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_candidates_vary() {
        let ids = DateSuffixIds;
        let candidates: std::collections::HashSet<_> = (0..20).map(|_| ids.candidate()).collect();
        assert!(candidates.len() > 1);
    }
}
