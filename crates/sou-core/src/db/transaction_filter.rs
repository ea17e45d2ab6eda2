//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Shared by the listing, counting, and streaming queries so the WHERE
//! clause logic lives in one place.

use chrono::NaiveDate;

/// Builder for constructing transaction query filters
///
/// All queries are scoped to one user through the accounts join; the
/// builder only adds the optional narrowing conditions.
///
/// The lifetime `'query` represents how long the filter parameters
/// (the search term) must remain valid.
#[derive(Default, Clone)]
pub struct TransactionFilter<'query> {
    pub account_id: Option<i64>,
    pub search: Option<&'query str>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Only transactions with at least one unset target field
    pub unclassified_only: bool,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including the "WHERE" keyword and user scope
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> TransactionFilter<'query> {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set account_id filter
    pub fn account_id(mut self, id: Option<i64>) -> Self {
        self.account_id = id;
        self
    }

    /// Set search query (matches the transaction label)
    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    /// Set date range filter
    pub fn date_range(mut self, range: Option<(NaiveDate, NaiveDate)>) -> Self {
        self.date_range = range;
        self
    }

    /// Only transactions the classification engine could still enrich
    pub fn unclassified_only(mut self, value: bool) -> Self {
        self.unclassified_only = value;
        self
    }

    /// Build the filter components for queries of the shape
    /// `... FROM transactions t JOIN accounts a ON t.account_id = a.id`
    pub fn build(&self, user_id: i64) -> FilterResult {
        let mut conditions = vec!["a.user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(aid) = self.account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(aid));
        }

        if let Some(q) = self.search {
            if !q.trim().is_empty() {
                conditions.push("t.label LIKE ? COLLATE NOCASE".to_string());
                params.push(Box::new(format!("%{}%", q.trim())));
            }
        }

        if let Some((from_date, to_date)) = self.date_range {
            conditions.push("t.date >= ? AND t.date <= ?".to_string());
            params.push(Box::new(from_date.to_string()));
            params.push(Box::new(to_date.to_string()));
        }

        if self.unclassified_only {
            conditions.push(
                "(t.category_id IS NULL OR t.sub_category_id IS NULL \
                 OR t.payee_id IS NULL OR t.payment_method IS NULL)"
                    .to_string(),
            );
        }

        FilterResult {
            where_clause: format!("WHERE {}", conditions.join(" AND ")),
            params,
        }
    }
}

impl FilterResult {
    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Get mutable parameter vector to append pagination params
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}
