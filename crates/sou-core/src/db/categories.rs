//! Category and sub-category operations
//!
//! Categories form a two-level tree: rows with `parent_id IS NULL` are
//! categories, rows pointing at one are sub-categories.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Category;

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    let created_at: String = row.get("created_at")?;

    Ok(Category {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        parent_id: row.get("parent_id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a category or sub-category
    pub fn create_category(
        &self,
        user_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::InvalidData(
                "Category name must not be empty".to_string(),
            ));
        }
        let conn = self.conn()?;

        // A sub-category's parent must exist and must itself be a root
        if let Some(pid) = parent_id {
            let parent_of_parent: Option<Option<i64>> = conn
                .query_row(
                    "SELECT parent_id FROM categories WHERE id = ?",
                    params![pid],
                    |row| row.get(0),
                )
                .optional()?;

            match parent_of_parent {
                None => {
                    return Err(Error::NotFound(format!("Category {}", pid)));
                }
                Some(Some(_)) => {
                    return Err(Error::InvalidData(
                        "Sub-categories cannot have children".to_string(),
                    ));
                }
                Some(None) => {}
            }
        }

        conn.execute(
            "INSERT INTO categories (user_id, parent_id, name) VALUES (?, ?, ?)",
            params![user_id, parent_id, name.trim()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a category by ID
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;

        let category = conn
            .query_row(
                "SELECT * FROM categories WHERE id = ?",
                params![id],
                row_to_category,
            )
            .optional()?;

        Ok(category)
    }

    /// Find a category by name under an optional parent
    pub fn find_category(
        &self,
        user_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Option<Category>> {
        let conn = self.conn()?;

        let category = match parent_id {
            Some(pid) => conn
                .query_row(
                    "SELECT * FROM categories WHERE user_id = ? AND name = ? AND parent_id = ?",
                    params![user_id, name, pid],
                    row_to_category,
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT * FROM categories WHERE user_id = ? AND name = ? AND parent_id IS NULL",
                    params![user_id, name],
                    row_to_category,
                )
                .optional()?,
        };

        Ok(category)
    }

    /// List a user's categories, roots before children
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT * FROM categories WHERE user_id = ? \
             ORDER BY parent_id IS NOT NULL, name ASC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_category)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }
}
