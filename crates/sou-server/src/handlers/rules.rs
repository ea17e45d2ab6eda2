//! Classification rule handlers: CRUD, preview, bulk apply

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState};
use sou_core::models::{MatchMode, NewRule, Rule, TargetFields};
use sou_core::reclassify::{Reclassifier, ReclassifyOutcome};
use sou_core::rules::{RuleSet, RuleWarning};
use sou_core::TransactionFilter;

use super::UserScope;

/// GET /api/rules - List a profile's rules in evaluation order
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<Rule>>, AppError> {
    let rules = state.db.list_rules_for_user(scope.user_id)?;
    Ok(Json(rules))
}

/// Request body for creating or updating a rule
#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    #[serde(default = "super::default_user_id")]
    pub user_id: i64,
    #[serde(flatten)]
    pub rule: NewRule,
}

/// Reject regex patterns that will never compile
///
/// The engine fails closed on a malformed regex at evaluation time; this
/// check simply reports the problem while the user is still editing.
fn validate_pattern(rule: &NewRule) -> Result<(), AppError> {
    if rule.match_mode == MatchMode::Regex {
        if let Err(e) = regex::Regex::new(&rule.pattern) {
            return Err(AppError::bad_request(&format!("Invalid regex: {}", e)));
        }
    }
    Ok(())
}

/// POST /api/rules - Create a rule
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RuleRequest>,
) -> Result<Json<Rule>, AppError> {
    validate_pattern(&req.rule)?;

    let id = state.db.create_rule(req.user_id, &req.rule)?;
    let rule = state
        .db
        .get_rule(id)?
        .ok_or_else(|| AppError::not_found("Rule not found after creation"))?;

    Ok(Json(rule))
}

/// PUT /api/rules/:id - Update a rule
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RuleRequest>,
) -> Result<Json<Rule>, AppError> {
    validate_pattern(&req.rule)?;

    state.db.update_rule(id, &req.rule)?;
    let rule = state
        .db
        .get_rule(id)?
        .ok_or_else(|| AppError::not_found("Rule not found"))?;

    Ok(Json(rule))
}

/// DELETE /api/rules/:id - Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.delete_rule(id)?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// POST /api/rules/:id/toggle - Flip a rule's enabled flag
pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rule = state
        .db
        .get_rule(id)?
        .ok_or_else(|| AppError::not_found("Rule not found"))?;

    let enabled = !rule.enabled;
    state.db.set_rule_enabled(id, enabled)?;

    Ok(Json(serde_json::json!({ "id": id, "enabled": enabled })))
}

/// Request body for the rule tester
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default = "super::default_user_id")]
    pub user_id: i64,
    pub label: String,
    /// Restrict the test to a single rule instead of the whole set
    pub rule_id: Option<i64>,
}

/// A rule that contributed to a preview, in evaluation order
#[derive(Debug, Serialize)]
pub struct FiredRule {
    pub id: i64,
    pub name: String,
}

/// Response for the rule tester: assigned ids plus resolved display names
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub fields: TargetFields,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub payee: Option<String>,
    pub fired_rules: Vec<FiredRule>,
    pub warnings: Vec<RuleWarning>,
}

/// POST /api/rules/preview - Classify an ad-hoc label without persisting
pub async fn preview_label(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    // Single-rule mode: does this one rule match the label?
    if let Some(rule_id) = req.rule_id {
        let rule = state
            .db
            .get_rule(rule_id)?
            .ok_or_else(|| AppError::not_found("Rule not found"))?;
        let matched = sou_core::rule_matches(&rule, &req.label);

        return Ok(Json(PreviewResponse {
            fields: TargetFields::default(),
            category: None,
            sub_category: None,
            payee: None,
            fired_rules: if matched {
                vec![FiredRule {
                    id: rule.id,
                    name: rule.name,
                }]
            } else {
                vec![]
            },
            warnings: vec![],
        }));
    }

    let rules = state.db.list_rules_for_user(req.user_id)?;
    let set = RuleSet::build(rules);
    let result = set.preview(&req.label);

    let mut fired_rules = Vec::new();
    for compiled in set.rules() {
        let rule = compiled.rule();
        if result.fired_rules.contains(&rule.id) {
            fired_rules.push(FiredRule {
                id: rule.id,
                name: rule.name.clone(),
            });
        }
    }

    let resolve_category = |id: Option<i64>| -> Result<Option<String>, AppError> {
        Ok(match id {
            Some(id) => state.db.get_category(id)?.map(|c| c.name),
            None => None,
        })
    };

    let category = resolve_category(result.fields.category_id)?;
    let sub_category = resolve_category(result.fields.sub_category_id)?;
    let payee = match result.fields.payee_id {
        Some(id) => state.db.get_payee(id)?.map(|p| p.name),
        None => None,
    };

    Ok(Json(PreviewResponse {
        fields: result.fields,
        category,
        sub_category,
        payee,
        fired_rules,
        warnings: set.warnings().to_vec(),
    }))
}

/// Request body for the bulk apply action
#[derive(Debug, Deserialize)]
pub struct ApplyAllRequest {
    #[serde(default = "super::default_user_id")]
    pub user_id: i64,
    /// Skip transactions that already have all four fields set
    #[serde(default)]
    pub unclassified_only: bool,
}

/// POST /api/rules/apply-all - Re-run the engine over the stored ledger
pub async fn apply_all(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ApplyAllRequest>,
) -> Result<Json<ReclassifyOutcome>, AppError> {
    let filter = TransactionFilter::new().unclassified_only(req.unclassified_only);
    let outcome = Reclassifier::new(&state.db).apply_to_all(req.user_id, &filter)?;
    Ok(Json(outcome))
}
