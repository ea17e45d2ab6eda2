//! Domain models for sou

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A ledger profile (one person's books)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A bank account owning transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    /// Bank name as shown on the export (free text, display only)
    pub bank: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A spending category. Rows with `parent_id` set are sub-categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A counterparty (merchant, employer, utility, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payee {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// How a rule pattern is matched against a transaction label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Label contains the pattern as a substring
    Contains,
    /// Label starts with the pattern
    StartsWith,
    /// Label ends with the pattern
    EndsWith,
    /// Pattern is a regular expression, searched (not anchored)
    Regex,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Regex => "regex",
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "starts_with" | "startswith" => Ok(Self::StartsWith),
            "ends_with" | "endswith" => Ok(Self::EndsWith),
            "regex" => Ok(Self::Regex),
            _ => Err(format!("Unknown match mode: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-authored classification rule
///
/// Rules are evaluated in ascending priority order (ties broken by id).
/// Each rule carries up to four optional field assignments; a field left
/// `None` means the rule does not opine on that field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub user_id: i64,
    /// Display label, no semantic effect
    pub name: String,
    pub pattern: String,
    pub match_mode: MatchMode,
    pub case_sensitive: bool,
    /// 0-999, lower evaluates first
    pub priority: i64,
    pub enabled: bool,
    pub category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    pub payee_id: Option<i64>,
    pub payment_method: Option<String>,
    /// Times this rule contributed at least one field
    pub usage_count: i64,
    pub last_applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// True if the rule assigns at least one field when it matches
    pub fn has_actions(&self) -> bool {
        self.category_id.is_some()
            || self.sub_category_id.is_some()
            || self.payee_id.is_some()
            || self.payment_method.is_some()
    }
}

/// A rule to be created (before DB insertion)
#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub pattern: String,
    pub match_mode: MatchMode,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    pub payee_id: Option<i64>,
    pub payment_method: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// The four classification target fields of a transaction
///
/// `None` means unset. The engine only ever fills unset fields; a field
/// that already holds a value is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetFields {
    pub category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    pub payee_id: Option<i64>,
    pub payment_method: Option<String>,
}

impl TargetFields {
    /// All four fields hold a value; no rule can contribute further
    pub fn is_complete(&self) -> bool {
        self.category_id.is_some()
            && self.sub_category_id.is_some()
            && self.payee_id.is_some()
            && self.payment_method.is_some()
    }
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    /// Raw bank label, the engine's match target
    pub label: String,
    /// Negative = expense, positive = income
    pub amount: f64,
    pub category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    pub payee_id: Option<i64>,
    pub payment_method: Option<String>,
    /// Hash for import deduplication
    pub import_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// The current classification state of this transaction
    pub fn target_fields(&self) -> TargetFields {
        TargetFields {
            category_id: self.category_id,
            sub_category_id: self.sub_category_id,
            payee_id: self.payee_id,
            payment_method: self.payment_method.clone(),
        }
    }
}

/// A parsed transaction to be imported (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub label: String,
    pub amount: f64,
    pub import_hash: String,
}

/// Per-file import session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub filename: String,
    pub total_rows: i64,
    pub imported: i64,
    pub duplicates: i64,
    pub errors: i64,
    pub created_at: DateTime<Utc>,
}
