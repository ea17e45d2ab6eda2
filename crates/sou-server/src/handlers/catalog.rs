//! Catalog handlers: accounts, categories, payees

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use sou_core::models::{Account, Category, Payee};

use super::UserScope;

/// GET /api/accounts - List a profile's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = state.db.list_accounts(scope.user_id)?;
    Ok(Json(accounts))
}

/// GET /api/categories - List categories, roots before children
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = state.db.list_categories(scope.user_id)?;
    Ok(Json(categories))
}

/// Request body for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default = "super::default_user_id")]
    pub user_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// POST /api/categories - Create a category or sub-category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let id = state
        .db
        .create_category(req.user_id, &req.name, req.parent_id)?;
    let category = state
        .db
        .get_category(id)?
        .ok_or_else(|| AppError::not_found("Category not found after creation"))?;

    Ok(Json(category))
}

/// GET /api/payees - List a profile's payees
pub async fn list_payees(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<Payee>>, AppError> {
    let payees = state.db.list_payees(scope.user_id)?;
    Ok(Json(payees))
}

/// Request body for creating a payee
#[derive(Debug, Deserialize)]
pub struct CreatePayeeRequest {
    #[serde(default = "super::default_user_id")]
    pub user_id: i64,
    pub name: String,
}

/// POST /api/payees - Create a payee
pub async fn create_payee(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePayeeRequest>,
) -> Result<Json<Payee>, AppError> {
    let id = state.db.create_payee(req.user_id, &req.name)?;
    let payee = state
        .db
        .get_payee(id)?
        .ok_or_else(|| AppError::not_found("Payee not found after creation"))?;

    Ok(Json(payee))
}
