//! Classification rule engine for automatic transaction enrichment
//!
//! Rules are user-authored patterns over the raw bank label. An active rule
//! set is evaluated in ascending priority order; the first rule to supply a
//! value for a target field wins, and fields that already hold a value are
//! never overwritten. Fields resolve independently: a priority-10 rule may
//! set the category while a priority-50 rule sets the payee.
//!
//! Regex patterns are user input and are compiled once per rule-set build.
//! A malformed pattern never aborts classification; the rule is treated as
//! never-matching and a warning is surfaced to the caller.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::models::{MatchMode, Rule, TargetFields};

/// Non-fatal diagnostic for a rule that could not be compiled
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleWarning {
    pub rule_id: i64,
    pub rule_name: String,
    pub message: String,
}

/// Result of classifying one label against a rule set
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// The transaction's target fields after evaluation
    pub fields: TargetFields,
    /// Ids of rules that contributed at least one field, in evaluation order
    pub fired_rules: Vec<i64>,
}

/// A rule with its pattern pre-compiled for repeated evaluation
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    pattern: CompiledPattern,
}

#[derive(Debug, Clone)]
enum CompiledPattern {
    /// Substring modes; the needle is pre-folded for insensitive rules
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Regex(Regex),
    /// Malformed regex, never matches
    Invalid,
}

impl CompiledRule {
    fn compile(rule: Rule) -> (Self, Option<RuleWarning>) {
        let pattern = match rule.match_mode {
            MatchMode::Contains => CompiledPattern::Contains(fold(&rule.pattern, rule.case_sensitive)),
            MatchMode::StartsWith => {
                CompiledPattern::StartsWith(fold(&rule.pattern, rule.case_sensitive))
            }
            MatchMode::EndsWith => CompiledPattern::EndsWith(fold(&rule.pattern, rule.case_sensitive)),
            MatchMode::Regex => match RegexBuilder::new(&rule.pattern)
                .case_insensitive(!rule.case_sensitive)
                .build()
            {
                Ok(re) => CompiledPattern::Regex(re),
                Err(e) => {
                    warn!(
                        "Rule {} ('{}') has an invalid regex pattern: {}",
                        rule.id, rule.name, e
                    );
                    let warning = RuleWarning {
                        rule_id: rule.id,
                        rule_name: rule.name.clone(),
                        message: e.to_string(),
                    };
                    return (
                        Self {
                            rule,
                            pattern: CompiledPattern::Invalid,
                        },
                        Some(warning),
                    );
                }
            },
        };

        (Self { rule, pattern }, None)
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Check the rule's pattern against a label
    pub fn matches(&self, label: &str) -> bool {
        let folded;
        let haystack = if self.rule.case_sensitive {
            label
        } else {
            folded = label.to_lowercase();
            folded.as_str()
        };

        match &self.pattern {
            CompiledPattern::Contains(needle) => haystack.contains(needle.as_str()),
            CompiledPattern::StartsWith(needle) => haystack.starts_with(needle.as_str()),
            CompiledPattern::EndsWith(needle) => haystack.ends_with(needle.as_str()),
            // Regex carries its own case-insensitive flag; match the raw label
            CompiledPattern::Regex(re) => re.is_match(label),
            CompiledPattern::Invalid => false,
        }
    }
}

/// Unicode-aware case fold for the substring match modes
fn fold(pattern: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        pattern.to_string()
    } else {
        pattern.to_lowercase()
    }
}

/// An ordered, compiled set of active rules for one user
///
/// Built once per run (import file or bulk pass) and reused for every
/// transaction so regex compilation happens once per rule.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    warnings: Vec<RuleWarning>,
}

impl RuleSet {
    /// Assemble the active rule set: enabled rules only, ascending priority,
    /// ties broken by insertion (id) order.
    pub fn build(all_rules: Vec<Rule>) -> Self {
        let mut active: Vec<Rule> = all_rules.into_iter().filter(|r| r.enabled).collect();
        active.sort_by_key(|r| (r.priority, r.id));

        let mut rules = Vec::with_capacity(active.len());
        let mut warnings = Vec::new();
        for rule in active {
            let (compiled, warning) = CompiledRule::compile(rule);
            rules.push(compiled);
            warnings.extend(warning);
        }

        debug!(
            "Built rule set: {} active rules, {} invalid",
            rules.len(),
            warnings.len()
        );
        Self { rules, warnings }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Rules that failed to compile during `build`
    pub fn warnings(&self) -> &[RuleWarning] {
        &self.warnings
    }

    /// Classify one label given the transaction's current field state
    ///
    /// Pure function: identical inputs always yield identical output. Fields
    /// already set in `existing` are returned untouched, so re-running over
    /// an already-classified transaction changes nothing.
    pub fn classify(&self, label: &str, existing: &TargetFields) -> Classification {
        let mut fields = existing.clone();
        let mut fired_rules = Vec::new();

        for compiled in &self.rules {
            // All four fields set: no rule can contribute further
            if fields.is_complete() {
                break;
            }
            if !compiled.matches(label) {
                continue;
            }

            let rule = compiled.rule();
            let mut contributed = false;

            if fields.category_id.is_none() {
                if let Some(id) = rule.category_id {
                    fields.category_id = Some(id);
                    contributed = true;
                }
            }
            if fields.sub_category_id.is_none() {
                if let Some(id) = rule.sub_category_id {
                    fields.sub_category_id = Some(id);
                    contributed = true;
                }
            }
            if fields.payee_id.is_none() {
                if let Some(id) = rule.payee_id {
                    fields.payee_id = Some(id);
                    contributed = true;
                }
            }
            if fields.payment_method.is_none() {
                if let Some(method) = &rule.payment_method {
                    fields.payment_method = Some(method.clone());
                    contributed = true;
                }
            }

            if contributed {
                fired_rules.push(rule.id);
            }
        }

        Classification {
            fields,
            fired_rules,
        }
    }

    /// Classify an ad-hoc label as if it were a brand-new transaction
    ///
    /// Used by the interactive rule tester; no persistence, no counters.
    pub fn preview(&self, label: &str) -> Classification {
        self.classify(label, &TargetFields::default())
    }
}

/// Test a single rule against a label without building a rule set
///
/// Compiles the pattern on the spot; a malformed regex simply fails to match.
/// The rule's `enabled` flag is ignored so users can try out a disabled rule.
pub fn rule_matches(rule: &Rule, label: &str) -> bool {
    let (compiled, _) = CompiledRule::compile(rule.clone());
    compiled.matches(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchMode;

    fn rule(id: i64, priority: i64, pattern: &str, mode: MatchMode) -> Rule {
        Rule {
            id,
            user_id: 1,
            name: format!("rule-{}", id),
            pattern: pattern.to_string(),
            match_mode: mode,
            case_sensitive: false,
            priority,
            enabled: true,
            category_id: None,
            sub_category_id: None,
            payee_id: None,
            payment_method: None,
            usage_count: 0,
            last_applied_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn match_mode_contains() {
        let r = rule(1, 0, "PAIEMENT PAR CARTE", MatchMode::Contains);
        assert!(rule_matches(&r, "PAIEMENT PAR CARTE X6984"));
        assert!(!rule_matches(&r, "VIR SEPA SALAIRE"));
    }

    #[test]
    fn match_mode_starts_with() {
        let r = rule(1, 0, "PAIEMENT", MatchMode::StartsWith);
        assert!(rule_matches(&r, "PAIEMENT PAR CARTE X6984"));
        assert!(!rule_matches(&r, "UN PAIEMENT"));
    }

    #[test]
    fn match_mode_ends_with() {
        let r = rule(1, 0, "X6984", MatchMode::EndsWith);
        assert!(rule_matches(&r, "PAIEMENT PAR CARTE X6984"));
        assert!(!rule_matches(&r, "X6984 PAIEMENT"));
    }

    #[test]
    fn match_mode_regex_is_a_search() {
        let r = rule(1, 0, r"CARTE X\d{4}", MatchMode::Regex);
        assert!(rule_matches(&r, "PAIEMENT PAR CARTE X6984"));
        assert!(!rule_matches(&r, "PAIEMENT PAR CARTE"));
    }

    #[test]
    fn case_insensitive_by_default() {
        let r = rule(1, 0, "picnic", MatchMode::Contains);
        assert!(rule_matches(&r, "PICNIC PARIS 02/10"));

        let mut sensitive = rule(1, 0, "picnic", MatchMode::Contains);
        sensitive.case_sensitive = true;
        assert!(!rule_matches(&sensitive, "PICNIC PARIS 02/10"));
    }

    #[test]
    fn regex_case_flag_instead_of_folding() {
        let r = rule(1, 0, r"picnic\s+paris", MatchMode::Regex);
        assert!(rule_matches(&r, "PICNIC  PARIS 02/10"));

        let mut sensitive = rule(1, 0, r"picnic\s+paris", MatchMode::Regex);
        sensitive.case_sensitive = true;
        assert!(!rule_matches(&sensitive, "PICNIC  PARIS 02/10"));
    }

    #[test]
    fn invalid_regex_fails_closed_with_warning() {
        let r = rule(7, 0, r"CARTE (\d{4}", MatchMode::Regex);
        assert!(!rule_matches(&r, "CARTE 6984"));

        let set = RuleSet::build(vec![r]);
        assert_eq!(set.warnings().len(), 1);
        assert_eq!(set.warnings()[0].rule_id, 7);

        // The broken rule never aborts classification of the label
        let result = set.preview("CARTE 6984");
        assert!(result.fired_rules.is_empty());
    }

    #[test]
    fn disabled_rules_are_excluded() {
        let mut r = rule(1, 0, "CARTE", MatchMode::Contains);
        r.payment_method = Some("carte".to_string());
        r.enabled = false;

        let set = RuleSet::build(vec![r]);
        assert!(set.is_empty());

        let result = set.preview("PAIEMENT PAR CARTE X6984");
        assert!(result.fired_rules.is_empty());
        assert_eq!(result.fields, TargetFields::default());
    }

    #[test]
    fn priority_ordering_first_fill_wins() {
        let mut low = rule(1, 5, "CARTE", MatchMode::Contains);
        low.category_id = Some(100);
        let mut high = rule(2, 50, "CARTE", MatchMode::Contains);
        high.category_id = Some(200);

        // Insertion order deliberately reversed; sort must fix it
        let set = RuleSet::build(vec![high, low]);
        let result = set.preview("PAIEMENT PAR CARTE");

        assert_eq!(result.fields.category_id, Some(100));
        assert_eq!(result.fired_rules, vec![1]);
    }

    #[test]
    fn equal_priority_ties_break_by_id() {
        let mut first = rule(3, 10, "CARTE", MatchMode::Contains);
        first.payee_id = Some(1);
        let mut second = rule(8, 10, "CARTE", MatchMode::Contains);
        second.payee_id = Some(2);

        let set = RuleSet::build(vec![second, first]);
        let result = set.preview("CARTE");
        assert_eq!(result.fields.payee_id, Some(1));
    }

    #[test]
    fn fields_resolve_independently() {
        let mut payee_rule = rule(1, 5, "CARTE", MatchMode::Contains);
        payee_rule.payee_id = Some(42);
        let mut category_rule = rule(2, 10, "CARTE", MatchMode::Contains);
        category_rule.category_id = Some(7);

        let set = RuleSet::build(vec![payee_rule, category_rule]);
        let result = set.preview("PAIEMENT PAR CARTE");

        assert_eq!(result.fields.payee_id, Some(42));
        assert_eq!(result.fields.category_id, Some(7));
        assert_eq!(result.fired_rules, vec![1, 2]);
    }

    #[test]
    fn never_overwrites_existing_fields() {
        let mut r = rule(1, 0, "CARTE", MatchMode::Contains);
        r.category_id = Some(999);

        let set = RuleSet::build(vec![r]);
        let existing = TargetFields {
            category_id: Some(5),
            ..Default::default()
        };
        let result = set.classify("PAIEMENT PAR CARTE", &existing);

        assert_eq!(result.fields.category_id, Some(5));
        // The rule had nothing left to contribute, so it did not fire
        assert!(result.fired_rules.is_empty());
    }

    #[test]
    fn matching_rule_with_no_actions_contributes_nothing() {
        let r = rule(1, 0, "CARTE", MatchMode::Contains);
        let set = RuleSet::build(vec![r]);
        let result = set.preview("PAIEMENT PAR CARTE");
        assert!(result.fired_rules.is_empty());
        assert_eq!(result.fields, TargetFields::default());
    }

    #[test]
    fn classification_is_idempotent() {
        let mut a = rule(1, 10, "Picnic", MatchMode::Contains);
        a.category_id = Some(1);
        a.payee_id = Some(2);
        let mut b = rule(2, 50, "CARTE", MatchMode::Contains);
        b.payment_method = Some("carte".to_string());

        let set = RuleSet::build(vec![a, b]);
        let label = "PAIEMENT PAR CARTE X6984 Picnic Paris 02/10";

        let first = set.classify(label, &TargetFields::default());
        let second = set.classify(label, &first.fields);

        assert_eq!(second.fields, first.fields);
        assert!(second.fired_rules.is_empty());
    }

    #[test]
    fn early_exit_when_all_fields_set() {
        let mut filler = rule(1, 0, "CARTE", MatchMode::Contains);
        filler.category_id = Some(1);
        filler.sub_category_id = Some(2);
        filler.payee_id = Some(3);
        filler.payment_method = Some("carte".to_string());

        let mut late = rule(2, 99, "CARTE", MatchMode::Contains);
        late.category_id = Some(100);

        let set = RuleSet::build(vec![filler, late]);
        let result = set.preview("CARTE");
        assert_eq!(result.fired_rules, vec![1]);
        assert_eq!(result.fields.category_id, Some(1));
    }

    #[test]
    fn end_to_end_grocery_scenario() {
        let mut picnic = rule(10, 10, "Picnic", MatchMode::Contains);
        picnic.category_id = Some(1); // Alimentation
        picnic.payee_id = Some(2); // Picnic
        let mut carte = rule(50, 50, "CARTE", MatchMode::Contains);
        carte.payment_method = Some("Carte bancaire".to_string());

        let set = RuleSet::build(vec![picnic, carte]);
        let result = set.preview("PAIEMENT PAR CARTE X6984 Picnic Paris 02/10");

        assert_eq!(result.fields.category_id, Some(1));
        assert_eq!(result.fields.payee_id, Some(2));
        assert_eq!(
            result.fields.payment_method.as_deref(),
            Some("Carte bancaire")
        );
        assert!(result.fields.sub_category_id.is_none());
        assert_eq!(result.fired_rules, vec![10, 50]);
    }

    #[test]
    fn unicode_case_folding() {
        let r = rule(1, 0, "café", MatchMode::Contains);
        assert!(rule_matches(&r, "CB CAFÉ DE LA GARE"));
    }
}
