//! Category and payee command implementations

use anyhow::Result;
use sou_core::db::Database;

pub fn cmd_categories_list(db: &Database, user_id: i64) -> Result<()> {
    let categories = db.list_categories(user_id)?;

    if categories.is_empty() {
        println!("No categories found. Run 'sou init' to seed the starter set.");
        return Ok(());
    }

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────");

    for category in categories.iter().filter(|c| c.parent_id.is_none()) {
        println!("   • {}", category.name);
        for child in categories.iter().filter(|c| c.parent_id == Some(category.id)) {
            println!("     • {}", child.name);
        }
    }

    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    user_id: i64,
    name: &str,
    parent: Option<&str>,
) -> Result<()> {
    let parent_id = match parent {
        Some(parent_name) => Some(
            db.find_category(user_id, parent_name, None)?
                .ok_or_else(|| anyhow::anyhow!("Parent category not found: {}", parent_name))?
                .id,
        ),
        None => None,
    };

    let id = db.create_category(user_id, name, parent_id)?;
    println!("✅ Created category '{}' (id: {})", name, id);

    Ok(())
}

pub fn cmd_payees_list(db: &Database, user_id: i64) -> Result<()> {
    let payees = db.list_payees(user_id)?;

    if payees.is_empty() {
        println!("No payees found.");
        return Ok(());
    }

    println!();
    println!("👤 Payees");
    println!("   ─────────────────────────────────");
    for payee in &payees {
        println!("   • {}", payee.name);
    }

    Ok(())
}

pub fn cmd_payees_add(db: &Database, user_id: i64, name: &str) -> Result<()> {
    let id = db.create_payee(user_id, name)?;
    println!("✅ Created payee '{}' (id: {})", name, id);
    Ok(())
}
