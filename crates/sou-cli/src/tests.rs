//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use sou_core::db::Database;
use sou_core::models::TargetFields;

use crate::commands::{self, truncate, RuleArgs};

fn setup_test_db() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let user_id = db.ensure_default_user().unwrap();
    db.seed_starter_categories(user_id).unwrap();
    (db, user_id)
}

fn rule_args(name: &str, pattern: &str) -> RuleArgs {
    RuleArgs {
        name: name.to_string(),
        pattern: pattern.to_string(),
        mode: "contains".to_string(),
        case_sensitive: false,
        priority: 100,
        disabled: false,
        category: None,
        sub_category: None,
        payee: None,
        payment_method: None,
    }
}

// ========== Rules Command Tests ==========

#[test]
fn test_cmd_rules_add_and_list() {
    let (db, user_id) = setup_test_db();

    let mut args = rule_args("Courses", "CARREFOUR");
    args.category = Some("Alimentation".to_string());
    args.sub_category = Some("Supermarché".to_string());
    commands::cmd_rules_add(&db, user_id, args).unwrap();

    let rules = db.list_rules_for_user(user_id).unwrap();
    assert_eq!(rules.len(), 1);
    assert!(rules[0].category_id.is_some());
    assert!(rules[0].sub_category_id.is_some());

    assert!(commands::cmd_rules_list(&db, user_id).is_ok());
}

#[test]
fn test_cmd_rules_add_unknown_category_fails() {
    let (db, user_id) = setup_test_db();

    let mut args = rule_args("Courses", "CARREFOUR");
    args.category = Some("Inexistante".to_string());
    assert!(commands::cmd_rules_add(&db, user_id, args).is_err());
}

#[test]
fn test_cmd_rules_add_sub_category_requires_category() {
    let (db, user_id) = setup_test_db();

    let mut args = rule_args("Courses", "CARREFOUR");
    args.sub_category = Some("Supermarché".to_string());
    assert!(commands::cmd_rules_add(&db, user_id, args).is_err());
}

#[test]
fn test_cmd_rules_toggle_and_rm() {
    let (db, user_id) = setup_test_db();
    commands::cmd_rules_add(&db, user_id, rule_args("r", "X")).unwrap();
    let id = db.list_rules_for_user(user_id).unwrap()[0].id;

    commands::cmd_rules_toggle(&db, id).unwrap();
    assert!(!db.get_rule(id).unwrap().unwrap().enabled);

    commands::cmd_rules_rm(&db, id).unwrap();
    assert!(db.get_rule(id).unwrap().is_none());
}

#[test]
fn test_cmd_rules_test_runs() {
    let (db, user_id) = setup_test_db();

    let mut args = rule_args("Carte", "CARTE");
    args.payment_method = Some("carte".to_string());
    commands::cmd_rules_add(&db, user_id, args).unwrap();
    let id = db.list_rules_for_user(user_id).unwrap()[0].id;

    assert!(commands::cmd_rules_test(&db, user_id, "PAIEMENT PAR CARTE", None).is_ok());
    assert!(commands::cmd_rules_test(&db, user_id, "PAIEMENT PAR CARTE", Some(id)).is_ok());
    assert!(commands::cmd_rules_test(&db, user_id, "x", Some(9999)).is_err());
}

#[test]
fn test_cmd_rules_apply_all() {
    let (db, user_id) = setup_test_db();
    let account_id = db.upsert_account(user_id, "Courant", None).unwrap();

    let mut args = rule_args("Carte", "CARTE");
    args.payment_method = Some("carte".to_string());
    commands::cmd_rules_add(&db, user_id, args).unwrap();

    db.insert_transaction(
        account_id,
        &sou_core::models::NewTransaction {
            date: chrono::NaiveDate::from_ymd_opt(2024, 10, 2).unwrap(),
            label: "PAIEMENT PAR CARTE X6984".to_string(),
            amount: -23.9,
            import_hash: "h1".to_string(),
        },
        &TargetFields::default(),
    )
    .unwrap();

    commands::cmd_rules_apply_all(&db, user_id, false).unwrap();

    let filter = sou_core::db::TransactionFilter::new();
    let tx = &db.list_transactions(user_id, &filter, 10, 0).unwrap()[0];
    assert_eq!(tx.payment_method.as_deref(), Some("carte"));
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import_csv_file() {
    let (db, user_id) = setup_test_db();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "Date;Libellé;Montant\n02/10/2024;CB CARREFOUR PARIS;-42,50\n"
    )
    .unwrap();

    commands::cmd_import(&db, user_id, file.path(), Some("Courant")).unwrap();

    let filter = sou_core::db::TransactionFilter::new();
    assert_eq!(db.count_transactions(user_id, &filter).unwrap(), 1);

    // Importing the same file again only yields duplicates
    commands::cmd_import(&db, user_id, file.path(), Some("Courant")).unwrap();
    assert_eq!(db.count_transactions(user_id, &filter).unwrap(), 1);
}

// ========== Catalog Command Tests ==========

#[test]
fn test_cmd_categories_add_child() {
    let (db, user_id) = setup_test_db();

    commands::cmd_categories_add(&db, user_id, "Abonnements", None).unwrap();
    commands::cmd_categories_add(&db, user_id, "Streaming", Some("Abonnements")).unwrap();

    let parent = db
        .find_category(user_id, "Abonnements", None)
        .unwrap()
        .unwrap();
    assert!(db
        .find_category(user_id, "Streaming", Some(parent.id))
        .unwrap()
        .is_some());

    assert!(commands::cmd_categories_add(&db, user_id, "X", Some("Inexistante")).is_err());
}

#[test]
fn test_cmd_payees_add_and_list() {
    let (db, user_id) = setup_test_db();

    commands::cmd_payees_add(&db, user_id, "Carrefour").unwrap();
    assert!(commands::cmd_payees_list(&db, user_id).is_ok());
    assert_eq!(db.list_payees(user_id).unwrap().len(), 1);
}

// ========== Status / Helpers ==========

#[test]
fn test_cmd_status() {
    let (db, _user) = setup_test_db();
    assert!(commands::cmd_status(&db, false).is_ok());
    assert!(commands::cmd_status(&db, true).is_ok());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long label indeed", 10), "a very ...");
}
