//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sou - Personal finance ledger with rule-based auto-classification
#[derive(Parser)]
#[command(name = "sou")]
#[command(about = "Self-hosted personal finance ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "sou.db", global = true)]
    pub db: PathBuf,

    /// Ledger profile id
    #[arg(long, default_value_t = 1, global = true)]
    pub user: i64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed the default profile
    Init,

    /// Import transactions from a bank CSV export
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Account name (defaults to the file name)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Manage classification rules (list, add, rm, toggle, test, apply-all)
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// List transactions
    Transactions {
        /// Only transactions with at least one unset classification field
        #[arg(long)]
        unclassified: bool,

        /// Filter by label substring
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of rows to show
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },

    /// Manage categories (list, add)
    Categories {
        #[command(subcommand)]
        action: Option<CatalogAction>,
    },

    /// Manage payees (list, add)
    Payees {
        #[command(subcommand)]
        action: Option<CatalogAction>,
    },

    /// Show database status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,

    /// Add a rule
    Add {
        /// Display name for the rule
        #[arg(short, long)]
        name: String,

        /// Pattern to match against transaction labels
        #[arg(short, long)]
        pattern: String,

        /// Match mode: contains, starts_with, ends_with, regex
        #[arg(short, long, default_value = "contains")]
        mode: String,

        /// Match case-sensitively
        #[arg(long)]
        case_sensitive: bool,

        /// Evaluation priority (0-999, lower first)
        #[arg(long, default_value_t = 100)]
        priority: i64,

        /// Create the rule disabled
        #[arg(long)]
        disabled: bool,

        /// Category name to assign
        #[arg(long)]
        category: Option<String>,

        /// Sub-category name to assign (requires --category)
        #[arg(long)]
        sub_category: Option<String>,

        /// Payee name to assign
        #[arg(long)]
        payee: Option<String>,

        /// Payment method to assign (e.g. carte, virement)
        #[arg(long)]
        payment_method: Option<String>,
    },

    /// Delete a rule
    Rm {
        /// Rule ID
        id: i64,
    },

    /// Enable/disable a rule
    Toggle {
        /// Rule ID
        id: i64,
    },

    /// Preview what a label would be classified as (no persistence)
    Test {
        /// Transaction label to test
        label: String,

        /// Test a single rule instead of the whole set
        #[arg(short, long)]
        rule: Option<i64>,
    },

    /// Re-run the rule engine over all stored transactions
    ApplyAll {
        /// Skip transactions that already have all four fields set
        #[arg(long)]
        unclassified_only: bool,
    },
}

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List entries
    List,

    /// Add an entry
    Add {
        /// Entry name
        name: String,

        /// Parent category name (sub-categories only)
        #[arg(long)]
        parent: Option<String>,
    },
}
