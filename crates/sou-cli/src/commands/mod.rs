//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init/status commands and shared utilities (open_db)
//! - `catalog` - category and payee commands
//! - `import` - CSV import command
//! - `rules` - rule management commands (list, add, test, apply-all)
//! - `serve` - web server command
//! - `transactions` - transaction listing

pub mod catalog;
pub mod core;
pub mod import;
pub mod rules;
pub mod serve;
pub mod transactions;

// Re-export command functions for main.rs
pub use catalog::*;
pub use core::*;
pub use import::*;
pub use rules::*;
pub use serve::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
