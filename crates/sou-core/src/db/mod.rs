//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Bank account operations
//! - `categories` - Category and sub-category operations
//! - `payees` - Payee operations
//! - `rules` - Classification rule storage and usage counters
//! - `transactions` - Transaction CRUD, streaming, and field updates

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod accounts;
mod categories;
mod payees;
mod rules;
mod transaction_filter;
mod transactions;


pub use transaction_filter::{FilterResult, TransactionFilter};
pub use transactions::TransactionInsertResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Row counts for the status command
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub users: i64,
    pub accounts: i64,
    pub categories: i64,
    pub payees: i64,
    pub rules: i64,
    pub transactions: i64,
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every
    /// pooled connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/sou_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Ensure the default profile exists, returning its id
    pub fn ensure_default_user(&self) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE name = 'default'",
                [],
                |row| row.get(0),
            )
            .ok();

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute("INSERT INTO users (name) VALUES ('default')", [])?;
        Ok(conn.last_insert_rowid())
    }

    /// List all ledger profiles
    pub fn list_users(&self) -> Result<Vec<crate::models::User>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, name, created_at FROM users ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            let created_at: String = row.get("created_at")?;
            Ok(crate::models::User {
                id: row.get("id")?,
                name: row.get("name")?,
                created_at: parse_datetime(&created_at),
            })
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Seed a starter category tree for a profile (idempotent)
    pub fn seed_starter_categories(&self, user_id: i64) -> Result<()> {
        let starter: [(&str, &[&str]); 7] = [
            ("Alimentation", &["Supermarché", "Restaurant"]),
            ("Logement", &["Loyer", "Énergie"]),
            ("Transport", &["Carburant", "Transports en commun"]),
            ("Loisirs", &[]),
            ("Santé", &[]),
            ("Revenus", &["Salaire"]),
            ("Autre", &[]),
        ];

        for (name, children) in &starter {
            let parent_id = match self.find_category(user_id, name, None)? {
                Some(cat) => cat.id,
                None => self.create_category(user_id, name, None)?,
            };
            for child in *children {
                if self.find_category(user_id, child, Some(parent_id))?.is_none() {
                    self.create_category(user_id, child, Some(parent_id))?;
                }
            }
        }

        info!("Seeded starter categories for user {}", user_id);
        Ok(())
    }

    /// Row counts across the main tables
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        };

        Ok(DbStats {
            users: count("users")?,
            accounts: count("accounts")?,
            categories: count("categories")?,
            payees: count("payees")?,
            rules: count("rules")?,
            transactions: count("transactions")?,
        })
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory
            PRAGMA temp_store = MEMORY;

            -- Profiles (one person's books)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Bank accounts
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                bank TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

            -- Categories; rows with parent_id set are sub-categories
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                parent_id INTEGER REFERENCES categories(id),
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, parent_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
            CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);

            -- Payees (counterparties)
            CREATE TABLE IF NOT EXISTS payees (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_payees_user ON payees(user_id);

            -- Classification rules (user-defined auto-assignment patterns)
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                pattern TEXT NOT NULL,
                match_mode TEXT NOT NULL DEFAULT 'contains',
                case_sensitive BOOLEAN NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 0,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                category_id INTEGER REFERENCES categories(id),
                sub_category_id INTEGER REFERENCES categories(id),
                payee_id INTEGER REFERENCES payees(id),
                payment_method TEXT,
                usage_count INTEGER NOT NULL DEFAULT 0,
                last_applied_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_user ON rules(user_id);
            CREATE INDEX IF NOT EXISTS idx_rules_priority ON rules(priority);

            -- Transactions
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                date DATE NOT NULL,
                label TEXT NOT NULL,
                amount REAL NOT NULL,
                category_id INTEGER REFERENCES categories(id),
                sub_category_id INTEGER REFERENCES categories(id),
                payee_id INTEGER REFERENCES payees(id),
                payment_method TEXT,
                import_hash TEXT UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_payee ON transactions(payee_id);

            -- Import sessions (per-file audit trail)
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                filename TEXT NOT NULL,
                total_rows INTEGER NOT NULL DEFAULT 0,
                imported INTEGER NOT NULL DEFAULT 0,
                duplicates INTEGER NOT NULL DEFAULT 0,
                errors INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_imports_user ON imports(user_id);
            "#,
        )?;

        Ok(())
    }
}
