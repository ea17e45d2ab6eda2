//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use sou_core::models::TargetFields;

fn setup_test_app() -> (Router, Database, i64) {
    let db = Database::in_memory().unwrap();
    let user_id = db.ensure_default_user().unwrap();
    let app = create_router(db.clone(), ServerConfig::default());
    (app, db, user_id)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _db, _user) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_list_rules() {
    let (app, db, user_id) = setup_test_app();
    let category = db.create_category(user_id, "Alimentation", None).unwrap();

    let body = serde_json::json!({
        "name": "Carrefour",
        "pattern": "CARREFOUR",
        "match_mode": "contains",
        "priority": 10,
        "category_id": category,
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/rules", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = get_body_json(response).await;
    assert_eq!(created["name"], "Carrefour");
    assert_eq!(created["enabled"], true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rules = get_body_json(response).await;
    assert_eq!(rules.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rule_rejects_invalid_regex() {
    let (app, _db, _user) = setup_test_app();

    let body = serde_json::json!({
        "name": "broken",
        "pattern": "CARTE (\\d+",
        "match_mode": "regex",
    });

    let response = app
        .oneshot(json_request("POST", "/api/rules", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid regex"));
}

#[tokio::test]
async fn test_toggle_rule() {
    let (app, db, user_id) = setup_test_app();

    let rule_id = db
        .create_rule(
            user_id,
            &sou_core::models::NewRule {
                name: "r".to_string(),
                pattern: "X".to_string(),
                match_mode: sou_core::models::MatchMode::Contains,
                case_sensitive: false,
                priority: 0,
                enabled: true,
                category_id: None,
                sub_category_id: None,
                payee_id: None,
                payment_method: None,
            },
        )
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/rules/{}/toggle", rule_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["enabled"], false);
    assert!(!db.get_rule(rule_id).unwrap().unwrap().enabled);
}

#[tokio::test]
async fn test_preview_resolves_names_and_order() {
    let (app, db, user_id) = setup_test_app();
    let category = db.create_category(user_id, "Alimentation", None).unwrap();
    let payee = db.create_payee(user_id, "Picnic").unwrap();

    db.create_rule(
        user_id,
        &sou_core::models::NewRule {
            name: "Picnic".to_string(),
            pattern: "Picnic".to_string(),
            match_mode: sou_core::models::MatchMode::Contains,
            case_sensitive: false,
            priority: 10,
            enabled: true,
            category_id: Some(category),
            sub_category_id: None,
            payee_id: Some(payee),
            payment_method: None,
        },
    )
    .unwrap();
    db.create_rule(
        user_id,
        &sou_core::models::NewRule {
            name: "Carte".to_string(),
            pattern: "CARTE".to_string(),
            match_mode: sou_core::models::MatchMode::Contains,
            case_sensitive: false,
            priority: 50,
            enabled: true,
            category_id: None,
            sub_category_id: None,
            payee_id: None,
            payment_method: Some("Carte bancaire".to_string()),
        },
    )
    .unwrap();

    let body = serde_json::json!({
        "label": "PAIEMENT PAR CARTE X6984 Picnic Paris 02/10",
    });

    let response = app
        .oneshot(json_request("POST", "/api/rules/preview", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["category"], "Alimentation");
    assert_eq!(json["payee"], "Picnic");
    assert_eq!(json["fields"]["payment_method"], "Carte bancaire");

    let fired: Vec<&str> = json["fired_rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(fired, vec!["Picnic", "Carte"]);
}

#[tokio::test]
async fn test_preview_single_rule_mode() {
    let (app, db, user_id) = setup_test_app();

    let rule_id = db
        .create_rule(
            user_id,
            &sou_core::models::NewRule {
                name: "Carte".to_string(),
                pattern: "CARTE".to_string(),
                match_mode: sou_core::models::MatchMode::Contains,
                case_sensitive: false,
                priority: 0,
                enabled: false,
                category_id: None,
                sub_category_id: None,
                payee_id: None,
                payment_method: None,
            },
        )
        .unwrap();

    // Disabled rules can still be tested individually
    let body = serde_json::json!({
        "label": "PAIEMENT PAR CARTE",
        "rule_id": rule_id,
    });

    let response = app
        .oneshot(json_request("POST", "/api/rules/preview", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["fired_rules"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_apply_all_returns_aggregates() {
    let (app, db, user_id) = setup_test_app();
    let account_id = db.upsert_account(user_id, "Courant", None).unwrap();
    let category = db.create_category(user_id, "Alimentation", None).unwrap();

    db.create_rule(
        user_id,
        &sou_core::models::NewRule {
            name: "Carte".to_string(),
            pattern: "CARTE".to_string(),
            match_mode: sou_core::models::MatchMode::Contains,
            case_sensitive: false,
            priority: 10,
            enabled: true,
            category_id: Some(category),
            sub_category_id: None,
            payee_id: None,
            payment_method: None,
        },
    )
    .unwrap();

    for (i, label) in ["PAIEMENT PAR CARTE X1", "VIR SEPA"].iter().enumerate() {
        db.insert_transaction(
            account_id,
            &sou_core::models::NewTransaction {
                date: chrono::NaiveDate::from_ymd_opt(2024, 10, i as u32 + 1).unwrap(),
                label: label.to_string(),
                amount: -5.0,
                import_hash: format!("h{}", i),
            },
            &TargetFields::default(),
        )
        .unwrap();
    }

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/rules/apply-all",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["processed"], 2);
    assert_eq!(json["changed"], 1);
    assert_eq!(json["unchanged"], 1);
    assert_eq!(json["failed"], 0);
    assert_eq!(json["rule_fires"][0]["fires"], 1);
}

#[tokio::test]
async fn test_list_transactions_paged() {
    let (app, db, user_id) = setup_test_app();
    let account_id = db.upsert_account(user_id, "Courant", None).unwrap();

    for i in 0..3 {
        db.insert_transaction(
            account_id,
            &sou_core::models::NewTransaction {
                date: chrono::NaiveDate::from_ymd_opt(2024, 10, i + 1).unwrap(),
                label: format!("TX {}", i),
                amount: -1.0,
                import_hash: format!("h{}", i),
            },
            &TargetFields::default(),
        )
        .unwrap();
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions?limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["transactions"].as_array().unwrap().len(), 2);
    // Newest first
    assert_eq!(json["transactions"][0]["label"], "TX 2");
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let (app, _db, _user) = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "Alimentation" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let root = get_body_json(response).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "Supermarché", "parent_id": root["id"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payees",
            serde_json::json!({ "name": "Carrefour" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let categories = get_body_json(response).await;
    assert_eq!(categories.as_array().unwrap().len(), 2);
}
