//! Bank account operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::Account;

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let created_at: String = row.get("created_at")?;

    Ok(Account {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        bank: row.get("bank")?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create an account, or return the existing one with the same name
    pub fn upsert_account(&self, user_id: i64, name: &str, bank: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE user_id = ? AND name = ?",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO accounts (user_id, name, bank) VALUES (?, ?, ?)",
            params![user_id, name, bank],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;

        let account = conn
            .query_row(
                "SELECT * FROM accounts WHERE id = ?",
                params![id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// List a user's accounts
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT * FROM accounts WHERE user_id = ? ORDER BY name ASC")?;
        let rows = stmt.query_map(params![user_id], row_to_account)?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }
}
