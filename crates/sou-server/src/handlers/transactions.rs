//! Transaction listing handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use sou_core::models::Transaction;
use sou_core::TransactionFilter;

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    #[serde(default = "super::default_user_id")]
    pub user_id: i64,
    pub account_id: Option<i64>,
    pub search: Option<String>,
    /// Only transactions with at least one unset classification field
    #[serde(default)]
    pub unclassified: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paged transaction listing
#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: i64,
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionPage>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, MAX_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let filter = TransactionFilter::new()
        .account_id(query.account_id)
        .search(query.search.as_deref())
        .unclassified_only(query.unclassified);

    let transactions = state
        .db
        .list_transactions(query.user_id, &filter, limit, offset)?;
    let total = state.db.count_transactions(query.user_id, &filter)?;

    Ok(Json(TransactionPage {
        transactions,
        total,
    }))
}
