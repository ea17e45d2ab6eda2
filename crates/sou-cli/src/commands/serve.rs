//! Web server command

use anyhow::Result;
use sou_core::db::Database;
use sou_server::ServerConfig;

pub async fn cmd_serve(db: Database, host: &str, port: u16) -> Result<()> {
    sou_server::serve(db, host, port, ServerConfig::default()).await
}
