//! Payee operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Payee;

fn row_to_payee(row: &Row<'_>) -> rusqlite::Result<Payee> {
    let created_at: String = row.get("created_at")?;

    Ok(Payee {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a payee
    pub fn create_payee(&self, user_id: i64, name: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::InvalidData("Payee name must not be empty".to_string()));
        }
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO payees (user_id, name) VALUES (?, ?)",
            params![user_id, name.trim()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a payee by ID
    pub fn get_payee(&self, id: i64) -> Result<Option<Payee>> {
        let conn = self.conn()?;

        let payee = conn
            .query_row(
                "SELECT * FROM payees WHERE id = ?",
                params![id],
                row_to_payee,
            )
            .optional()?;

        Ok(payee)
    }

    /// List a user's payees
    pub fn list_payees(&self, user_id: i64) -> Result<Vec<Payee>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT * FROM payees WHERE user_id = ? ORDER BY name ASC")?;
        let rows = stmt.query_map(params![user_id], row_to_payee)?;

        let mut payees = Vec::new();
        for row in rows {
            payees.push(row?);
        }
        Ok(payees)
    }
}
