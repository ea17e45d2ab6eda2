//! Sou CLI - Personal finance ledger with rule-based auto-classification
//!
//! Usage:
//!   sou init                  Initialize database
//!   sou import --file CSV     Import transactions (auto-detects dialect)
//!   sou rules list            Manage classification rules
//!   sou serve --port 3000     Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import { file, account } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, cli.user, &file, account.as_deref())
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db)?;
            match action.unwrap_or(RulesAction::List) {
                RulesAction::List => commands::cmd_rules_list(&db, cli.user),
                RulesAction::Add {
                    name,
                    pattern,
                    mode,
                    case_sensitive,
                    priority,
                    disabled,
                    category,
                    sub_category,
                    payee,
                    payment_method,
                } => commands::cmd_rules_add(
                    &db,
                    cli.user,
                    commands::RuleArgs {
                        name,
                        pattern,
                        mode,
                        case_sensitive,
                        priority,
                        disabled,
                        category,
                        sub_category,
                        payee,
                        payment_method,
                    },
                ),
                RulesAction::Rm { id } => commands::cmd_rules_rm(&db, id),
                RulesAction::Toggle { id } => commands::cmd_rules_toggle(&db, id),
                RulesAction::Test { label, rule } => {
                    commands::cmd_rules_test(&db, cli.user, &label, rule)
                }
                RulesAction::ApplyAll { unclassified_only } => {
                    commands::cmd_rules_apply_all(&db, cli.user, unclassified_only)
                }
            }
        }
        Commands::Transactions {
            unclassified,
            search,
            limit,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_transactions_list(&db, cli.user, unclassified, search.as_deref(), limit)
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db)?;
            match action.unwrap_or(CatalogAction::List) {
                CatalogAction::List => commands::cmd_categories_list(&db, cli.user),
                CatalogAction::Add { name, parent } => {
                    commands::cmd_categories_add(&db, cli.user, &name, parent.as_deref())
                }
            }
        }
        Commands::Payees { action } => {
            let db = commands::open_db(&cli.db)?;
            match action.unwrap_or(CatalogAction::List) {
                CatalogAction::List => commands::cmd_payees_list(&db, cli.user),
                CatalogAction::Add { name, .. } => commands::cmd_payees_add(&db, cli.user, &name),
            }
        }
        Commands::Status { json } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_status(&db, json)
        }
        Commands::Serve { port, host } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_serve(db, &host, port).await
        }
    }
}
