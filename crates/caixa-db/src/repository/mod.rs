//! # Repository Module
//!
//! One repository per table group. Each holds a clone of the pool and is
//! created on demand by [`Database`](crate::Database).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.products()      ──► products            catalog lookups            │
//! │  db.customers()     ──► customers           directory, cashback read   │
//! │  db.fee_profiles()  ──► fee_profile_rates   card fee schedules         │
//! │  db.sales()         ──► sale_lines          one row per cart line      │
//! │  db.ledger()        ──► ledger_categories   receivables                │
//! │                         ledger_entries                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customer;
pub mod fee_profile;
pub mod ledger;
pub mod product;
pub mod sale;
