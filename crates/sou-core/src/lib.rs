//! Sou Core Library
//!
//! Shared functionality for the sou personal finance ledger:
//! - Database access and migrations
//! - CSV import for bank transaction exports
//! - Classification rule engine (pattern matching, priority resolution)
//! - Bulk reclassification over the stored ledger
//! - Accounts, categories, payees

pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod reclassify;
pub mod rules;

pub use db::{Database, TransactionFilter, TransactionInsertResult};
pub use error::{Error, Result};
pub use import::{import_csv, ImportOutcome};
pub use reclassify::{Reclassifier, ReclassifyOutcome, RuleFireCount};
pub use rules::{rule_matches, Classification, CompiledRule, RuleSet, RuleWarning};
