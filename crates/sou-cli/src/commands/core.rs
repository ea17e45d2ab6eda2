//! Core commands (init, status) and shared utilities

use std::path::Path;

use anyhow::Result;
use sou_core::db::Database;

/// Open an existing database
pub fn open_db(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid database path"))?;
    Ok(Database::new(path_str)?)
}

pub fn cmd_init(path: &Path) -> Result<()> {
    let db = open_db(path)?;
    let user_id = db.ensure_default_user()?;
    db.seed_starter_categories(user_id)?;

    println!("✅ Initialized database at {}", path.display());
    println!("   Default profile id: {}", user_id);
    Ok(())
}

pub fn cmd_status(db: &Database, json: bool) -> Result<()> {
    let stats = db.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let profiles: Vec<String> = db.list_users()?.into_iter().map(|u| u.name).collect();

    println!();
    println!("📒 Sou database: {}", db.path());
    println!("   ─────────────────────────────────");
    println!("   Profiles:       {} ({})", stats.users, profiles.join(", "));
    println!("   Accounts:       {}", stats.accounts);
    println!("   Categories:     {}", stats.categories);
    println!("   Payees:         {}", stats.payees);
    println!("   Rules:          {}", stats.rules);
    println!("   Transactions:   {}", stats.transactions);

    Ok(())
}
