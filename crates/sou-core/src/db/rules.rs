//! Classification rule storage and usage counters

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{MatchMode, NewRule, Rule};

/// Priority must stay within this range; lower evaluates first
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 0..=999;

fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let mode_str: String = row.get("match_mode")?;
    let match_mode: MatchMode = mode_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;
    let last_applied_at: Option<String> = row.get("last_applied_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(Rule {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        pattern: row.get("pattern")?,
        match_mode,
        case_sensitive: row.get("case_sensitive")?,
        priority: row.get("priority")?,
        enabled: row.get("enabled")?,
        category_id: row.get("category_id")?,
        sub_category_id: row.get("sub_category_id")?,
        payee_id: row.get("payee_id")?,
        payment_method: row.get("payment_method")?,
        usage_count: row.get("usage_count")?,
        last_applied_at: last_applied_at.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at),
    })
}

fn validate(rule: &NewRule) -> Result<()> {
    if rule.pattern.is_empty() {
        return Err(Error::Rule("Pattern must not be empty".to_string()));
    }
    if !PRIORITY_RANGE.contains(&rule.priority) {
        return Err(Error::Rule(format!(
            "Priority {} out of range {}-{}",
            rule.priority,
            PRIORITY_RANGE.start(),
            PRIORITY_RANGE.end()
        )));
    }
    Ok(())
}

impl Database {
    /// Create a classification rule
    pub fn create_rule(&self, user_id: i64, rule: &NewRule) -> Result<i64> {
        validate(rule)?;
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO rules
                (user_id, name, pattern, match_mode, case_sensitive, priority, enabled,
                 category_id, sub_category_id, payee_id, payment_method)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                rule.name,
                rule.pattern,
                rule.match_mode.as_str(),
                rule.case_sensitive,
                rule.priority,
                rule.enabled,
                rule.category_id,
                rule.sub_category_id,
                rule.payee_id,
                rule.payment_method,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a rule by ID
    pub fn get_rule(&self, id: i64) -> Result<Option<Rule>> {
        let conn = self.conn()?;

        let rule = conn
            .query_row("SELECT * FROM rules WHERE id = ?", params![id], row_to_rule)
            .optional()?;

        Ok(rule)
    }

    /// List all of a user's rules in evaluation order
    ///
    /// Ascending priority, ties broken by insertion order, so the result is
    /// stable across runs. Disabled rules are included; the engine filters
    /// them when building the active rule set.
    pub fn list_rules_for_user(&self, user_id: i64) -> Result<Vec<Rule>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT * FROM rules WHERE user_id = ? ORDER BY priority ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_rule)?;

        let mut rules = Vec::new();
        for row in rows {
            rules.push(row?);
        }
        Ok(rules)
    }

    /// Update every editable field of a rule
    pub fn update_rule(&self, id: i64, rule: &NewRule) -> Result<()> {
        validate(rule)?;
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE rules
            SET name = ?, pattern = ?, match_mode = ?, case_sensitive = ?,
                priority = ?, enabled = ?, category_id = ?, sub_category_id = ?,
                payee_id = ?, payment_method = ?
            WHERE id = ?
            "#,
            params![
                rule.name,
                rule.pattern,
                rule.match_mode.as_str(),
                rule.case_sensitive,
                rule.priority,
                rule.enabled,
                rule.category_id,
                rule.sub_category_id,
                rule.payee_id,
                rule.payment_method,
                id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Enable or disable a rule
    pub fn set_rule_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE rules SET enabled = ? WHERE id = ?",
            params![enabled, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Delete a rule
    pub fn delete_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.execute("DELETE FROM rules WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Record that a rule contributed fields to `fires` transactions
    pub fn increment_rule_usage(
        &self,
        rule_id: i64,
        fires: i64,
        when: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            UPDATE rules
            SET usage_count = usage_count + ?, last_applied_at = ?
            WHERE id = ?
            "#,
            params![fires, when.format("%Y-%m-%d %H:%M:%S").to_string(), rule_id],
        )?;

        Ok(())
    }
}
