//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::transaction_filter::TransactionFilter;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, TargetFields, Transaction};

/// Result of inserting a transaction
#[derive(Debug, Clone)]
pub enum TransactionInsertResult {
    /// Transaction was inserted successfully, contains new transaction ID
    Inserted(i64),
    /// Transaction was a duplicate, contains existing transaction ID
    Duplicate(i64),
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get("date")?;
    let created_at: String = row.get("created_at")?;

    Ok(Transaction {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        label: row.get("label")?,
        amount: row.get("amount")?,
        category_id: row.get("category_id")?,
        sub_category_id: row.get("sub_category_id")?,
        payee_id: row.get("payee_id")?,
        payment_method: row.get("payment_method")?,
        import_hash: row.get("import_hash")?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert a transaction, with its classification fields if any
    ///
    /// Skips duplicates based on `import_hash` and reports which existing
    /// transaction the duplicate collided with.
    pub fn insert_transaction(
        &self,
        account_id: i64,
        tx: &NewTransaction,
        fields: &TargetFields,
    ) -> Result<TransactionInsertResult> {
        let conn = self.conn()?;

        // Check for duplicate
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            return Ok(TransactionInsertResult::Duplicate(existing_id));
        }

        conn.execute(
            r#"
            INSERT INTO transactions
                (account_id, date, label, amount, category_id, sub_category_id,
                 payee_id, payment_method, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                account_id,
                tx.date.to_string(),
                tx.label,
                tx.amount,
                fields.category_id,
                fields.sub_category_id,
                fields.payee_id,
                fields.payment_method,
                tx.import_hash,
            ],
        )?;

        Ok(TransactionInsertResult::Inserted(conn.last_insert_rowid()))
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let tx = conn
            .query_row(
                "SELECT * FROM transactions WHERE id = ?",
                params![id],
                row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// List transactions for a user, newest first
    pub fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter<'_>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT t.* FROM transactions t \
             JOIN accounts a ON t.account_id = a.id \
             {} ORDER BY t.date DESC, t.id DESC LIMIT ? OFFSET ?",
            built.where_clause
        );

        let mut query_params = built.into_params();
        query_params.push(Box::new(limit));
        query_params.push(Box::new(offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&param_refs[..], row_to_transaction)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?);
        }
        Ok(transactions)
    }

    /// Count transactions matching a filter
    pub fn count_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter<'_>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT COUNT(*) FROM transactions t \
             JOIN accounts a ON t.account_id = a.id {}",
            built.where_clause
        );

        let count =
            conn.query_row(&sql, &built.params_refs()[..], |row| row.get(0))?;
        Ok(count)
    }

    /// Stream transactions through a callback, oldest first
    ///
    /// Rows are walked with a cursor rather than collected, so a bulk pass
    /// over a large ledger stays bounded in memory.
    pub fn for_each_transaction<F>(
        &self,
        user_id: i64,
        filter: &TransactionFilter<'_>,
        mut f: F,
    ) -> Result<()>
    where
        F: FnMut(Transaction),
    {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT t.* FROM transactions t \
             JOIN accounts a ON t.account_id = a.id \
             {} ORDER BY t.date ASC, t.id ASC",
            built.where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&built.params_refs()[..], row_to_transaction)?;

        for row in rows {
            f(row?);
        }
        Ok(())
    }

    /// Persist the classification fields of a transaction
    pub fn update_transaction_fields(&self, id: i64, fields: &TargetFields) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET category_id = ?, sub_category_id = ?, payee_id = ?, payment_method = ?
            WHERE id = ?
            "#,
            params![
                fields.category_id,
                fields.sub_category_id,
                fields.payee_id,
                fields.payment_method,
                id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Record an import session for the audit trail
    pub fn record_import(
        &self,
        user_id: i64,
        account_id: i64,
        filename: &str,
        total_rows: i64,
        imported: i64,
        duplicates: i64,
        errors: i64,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO imports
                (user_id, account_id, filename, total_rows, imported, duplicates, errors)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                account_id,
                filename,
                total_rows,
                imported,
                duplicates,
                errors
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List a user's import sessions, newest first
    pub fn list_imports(&self, user_id: i64) -> Result<Vec<crate::models::ImportSession>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT * FROM imports WHERE user_id = ? ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let created_at: String = row.get("created_at")?;
            Ok(crate::models::ImportSession {
                id: row.get("id")?,
                user_id: row.get("user_id")?,
                account_id: row.get("account_id")?,
                filename: row.get("filename")?,
                total_rows: row.get("total_rows")?,
                imported: row.get("imported")?,
                duplicates: row.get("duplicates")?,
                errors: row.get("errors")?,
                created_at: parse_datetime(&created_at),
            })
        })?;

        let mut imports = Vec::new();
        for row in rows {
            imports.push(row?);
        }
        Ok(imports)
    }
}
