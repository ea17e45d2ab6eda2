//! CSV import command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use sou_core::db::Database;
use sou_core::import::import_csv;

pub fn cmd_import(db: &Database, user_id: i64, file: &Path, account: Option<&str>) -> Result<()> {
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("import.csv");
    let account_name = account.unwrap_or_else(|| {
        file.file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("import")
    });

    let account_id = db.upsert_account(user_id, account_name, None)?;
    let reader =
        File::open(file).with_context(|| format!("Cannot open {}", file.display()))?;

    let outcome = import_csv(db, user_id, account_id, file_name, reader)?;
    debug!("Import outcome for {}: {:?}", file_name, outcome);

    for warning in &outcome.warnings {
        println!(
            "⚠️  Rule '{}' has an invalid pattern: {}",
            warning.rule_name, warning.message
        );
    }

    println!(
        "✅ Imported {} of {} rows into '{}' ({} duplicates, {} errors)",
        outcome.imported, outcome.total_rows, account_name, outcome.duplicates, outcome.errors
    );
    for fire in &outcome.rule_fires {
        println!("   {} fired {} time(s)", fire.rule_name, fire.fires);
    }

    Ok(())
}
