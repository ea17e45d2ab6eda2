//! Rule management command implementations

use anyhow::Result;
use sou_core::db::{Database, TransactionFilter};
use sou_core::models::{NewRule, Rule};
use sou_core::reclassify::Reclassifier;
use sou_core::rules::RuleSet;

use super::truncate;

/// Arguments for `sou rules add`, resolved from names to ids here
pub struct RuleArgs {
    pub name: String,
    pub pattern: String,
    pub mode: String,
    pub case_sensitive: bool,
    pub priority: i64,
    pub disabled: bool,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub payee: Option<String>,
    pub payment_method: Option<String>,
}

fn describe_actions(db: &Database, rule: &Rule) -> Result<String> {
    if !rule.has_actions() {
        return Ok("(no actions)".to_string());
    }

    let mut parts = Vec::new();

    if let Some(id) = rule.category_id {
        if let Some(cat) = db.get_category(id)? {
            parts.push(format!("category={}", cat.name));
        }
    }
    if let Some(id) = rule.sub_category_id {
        if let Some(cat) = db.get_category(id)? {
            parts.push(format!("sub={}", cat.name));
        }
    }
    if let Some(id) = rule.payee_id {
        if let Some(payee) = db.get_payee(id)? {
            parts.push(format!("payee={}", payee.name));
        }
    }
    if let Some(method) = &rule.payment_method {
        parts.push(format!("payment={}", method));
    }

    Ok(parts.join(", "))
}

pub fn cmd_rules_list(db: &Database, user_id: i64) -> Result<()> {
    let rules = db.list_rules_for_user(user_id)?;

    if rules.is_empty() {
        println!("No rules found. Add one with 'sou rules add'.");
        return Ok(());
    }

    println!();
    println!("🧮 Classification rules (evaluation order)");
    println!("   ──────────────────────────────────────────────────────────────");

    for rule in &rules {
        let status = if rule.enabled { " " } else { "✗" };
        println!(
            "   {}[{:>3}] #{:<4} {:<20} {}:{} {}",
            status,
            rule.priority,
            rule.id,
            truncate(&rule.name, 20),
            rule.match_mode,
            truncate(&rule.pattern, 24),
            describe_actions(db, rule)?,
        );
        if rule.usage_count > 0 {
            println!(
                "        applied {} time(s), last {}",
                rule.usage_count,
                rule.last_applied_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    Ok(())
}

pub fn cmd_rules_add(db: &Database, user_id: i64, args: RuleArgs) -> Result<()> {
    let match_mode = args
        .mode
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let category_id = match &args.category {
        Some(name) => Some(resolve_category(db, user_id, name, None)?),
        None => None,
    };
    let sub_category_id = match &args.sub_category {
        Some(name) => {
            let parent = category_id
                .ok_or_else(|| anyhow::anyhow!("--sub-category requires --category"))?;
            Some(resolve_category(db, user_id, name, Some(parent))?)
        }
        None => None,
    };
    let payee_id = match &args.payee {
        Some(name) => Some(
            db.list_payees(user_id)?
                .into_iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    anyhow::anyhow!("Payee not found: {} (add it with 'sou payees add')", name)
                })?
                .id,
        ),
        None => None,
    };

    let rule = NewRule {
        name: args.name,
        pattern: args.pattern,
        match_mode,
        case_sensitive: args.case_sensitive,
        priority: args.priority,
        enabled: !args.disabled,
        category_id,
        sub_category_id,
        payee_id,
        payment_method: args.payment_method,
    };

    let id = db.create_rule(user_id, &rule)?;
    println!("✅ Created rule '{}' (id: {})", rule.name, id);

    Ok(())
}

fn resolve_category(
    db: &Database,
    user_id: i64,
    name: &str,
    parent_id: Option<i64>,
) -> Result<i64> {
    db.find_category(user_id, name, parent_id)?
        .map(|c| c.id)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Category not found: {} (add it with 'sou categories add')",
                name
            )
        })
}

pub fn cmd_rules_rm(db: &Database, id: i64) -> Result<()> {
    db.delete_rule(id)?;
    println!("✅ Deleted rule {}", id);
    Ok(())
}

pub fn cmd_rules_toggle(db: &Database, id: i64) -> Result<()> {
    let rule = db
        .get_rule(id)?
        .ok_or_else(|| anyhow::anyhow!("Rule {} not found", id))?;

    let enabled = !rule.enabled;
    db.set_rule_enabled(id, enabled)?;
    println!(
        "✅ Rule '{}' is now {}",
        rule.name,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub fn cmd_rules_test(db: &Database, user_id: i64, label: &str, rule_id: Option<i64>) -> Result<()> {
    // Single-rule mode: does this one rule match?
    if let Some(id) = rule_id {
        let rule = db
            .get_rule(id)?
            .ok_or_else(|| anyhow::anyhow!("Rule {} not found", id))?;

        if sou_core::rule_matches(&rule, label) {
            println!("✅ Rule '{}' matches '{}'", rule.name, label);
        } else {
            println!("✗ Rule '{}' does not match '{}'", rule.name, label);
        }
        return Ok(());
    }

    let set = RuleSet::build(db.list_rules_for_user(user_id)?);
    for warning in set.warnings() {
        println!(
            "⚠️  Rule '{}' has an invalid pattern: {}",
            warning.rule_name, warning.message
        );
    }

    let result = set.preview(label);

    if result.fired_rules.is_empty() {
        println!("No rule classifies '{}'", label);
        return Ok(());
    }

    println!();
    println!("🔍 '{}' would be classified as:", label);
    if let Some(id) = result.fields.category_id {
        if let Some(cat) = db.get_category(id)? {
            println!("   Category:       {}", cat.name);
        }
    }
    if let Some(id) = result.fields.sub_category_id {
        if let Some(cat) = db.get_category(id)? {
            println!("   Sub-category:   {}", cat.name);
        }
    }
    if let Some(id) = result.fields.payee_id {
        if let Some(payee) = db.get_payee(id)? {
            println!("   Payee:          {}", payee.name);
        }
    }
    if let Some(method) = &result.fields.payment_method {
        println!("   Payment method: {}", method);
    }

    let names: Vec<String> = set
        .rules()
        .iter()
        .filter(|c| result.fired_rules.contains(&c.rule().id))
        .map(|c| c.rule().name.clone())
        .collect();
    println!("   Fired rules:    {}", names.join(" → "));

    Ok(())
}

pub fn cmd_rules_apply_all(db: &Database, user_id: i64, unclassified_only: bool) -> Result<()> {
    let filter = TransactionFilter::new().unclassified_only(unclassified_only);
    let outcome = Reclassifier::new(db).apply_to_all(user_id, &filter)?;

    for warning in &outcome.warnings {
        println!(
            "⚠️  Rule '{}' has an invalid pattern: {}",
            warning.rule_name, warning.message
        );
    }

    println!(
        "✅ {} of {} transactions updated ({} unchanged, {} failed)",
        outcome.changed, outcome.processed, outcome.unchanged, outcome.failed
    );
    for fire in &outcome.rule_fires {
        println!("   {} fired {} time(s)", fire.rule_name, fire.fires);
    }

    Ok(())
}
