//! Bulk reclassification of stored transactions
//!
//! Re-runs the rule engine over a user's existing ledger, typically after a
//! rule was created or edited. The rule set is snapshotted once per run and
//! each transaction update is persisted independently, so an interrupted or
//! partially failed run leaves the ledger valid.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{Database, TransactionFilter};
use crate::error::Result;
use crate::rules::{RuleSet, RuleWarning};

/// How often one rule fired during a run
#[derive(Debug, Clone, Serialize)]
pub struct RuleFireCount {
    pub rule_id: i64,
    pub rule_name: String,
    pub fires: i64,
}

/// Aggregate outcome of one bulk run
///
/// `processed == changed + unchanged + failed` always holds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReclassifyOutcome {
    /// Transactions the run looked at
    pub processed: i64,
    /// Transactions whose fields were updated and persisted
    pub changed: i64,
    /// Transactions the rule set had nothing to add to
    pub unchanged: i64,
    /// Transactions whose update failed to persist
    pub failed: i64,
    /// Per-rule fire counts, descending
    pub rule_fires: Vec<RuleFireCount>,
    /// Rules that could not be compiled (invalid regex)
    pub warnings: Vec<RuleWarning>,
}

/// Per-user advisory locks serializing bulk runs
///
/// Two concurrent passes over the same ledger would interleave reads and
/// writes and double-count rule usage; runs for different users are
/// independent.
fn user_lock(user_id: i64) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<i64, Arc<Mutex<()>>>>> = OnceLock::new();

    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = locks.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(user_id).or_default().clone()
}

/// Applies the classification engine across a user's stored transactions
pub struct Reclassifier<'a> {
    db: &'a Database,
}

impl<'a> Reclassifier<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Run the rule engine over every transaction matching the filter
    ///
    /// Passing a filter with `unclassified_only` skips fully-classified
    /// rows up front; that is purely an optimization, since the engine
    /// never touches an already-set field either way.
    pub fn apply_to_all(
        &self,
        user_id: i64,
        filter: &TransactionFilter<'_>,
    ) -> Result<ReclassifyOutcome> {
        let lock = user_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        // Snapshot the rule set once; rule edits mid-run do not affect us
        let rules = self.db.list_rules_for_user(user_id)?;
        let set = RuleSet::build(rules);

        let mut outcome = ReclassifyOutcome {
            warnings: set.warnings().to_vec(),
            ..Default::default()
        };
        let mut fires: HashMap<i64, i64> = HashMap::new();

        self.db.for_each_transaction(user_id, filter, |tx| {
            outcome.processed += 1;

            let existing = tx.target_fields();
            let result = set.classify(&tx.label, &existing);

            // No rule contributed anything, nothing to persist
            if result.fired_rules.is_empty() {
                outcome.unchanged += 1;
                return;
            }

            match self.db.update_transaction_fields(tx.id, &result.fields) {
                Ok(()) => {
                    outcome.changed += 1;
                    for rule_id in &result.fired_rules {
                        *fires.entry(*rule_id).or_insert(0) += 1;
                    }
                    debug!(
                        "Reclassified transaction {} via rules {:?}",
                        tx.id, result.fired_rules
                    );
                }
                Err(e) => {
                    // Batch job: record the failure and keep going
                    warn!("Failed to persist transaction {}: {}", tx.id, e);
                    outcome.failed += 1;
                }
            }
        })?;

        // Flush usage counters for every rule that fired
        let now = Utc::now();
        for (rule_id, count) in &fires {
            if let Err(e) = self.db.increment_rule_usage(*rule_id, *count, now) {
                warn!("Failed to update usage counter for rule {}: {}", rule_id, e);
            }
        }

        outcome.rule_fires = set
            .rules()
            .iter()
            .filter_map(|compiled| {
                let rule = compiled.rule();
                fires.get(&rule.id).map(|count| RuleFireCount {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    fires: *count,
                })
            })
            .collect();
        outcome.rule_fires.sort_by(|a, b| b.fires.cmp(&a.fires));

        info!(
            "Bulk reclassification for user {}: {} processed, {} changed, {} failed",
            user_id, outcome.processed, outcome.changed, outcome.failed
        );
        Ok(outcome)
    }
}
