//! Transaction listing command

use anyhow::Result;
use sou_core::db::{Database, TransactionFilter};

use super::truncate;

pub fn cmd_transactions_list(
    db: &Database,
    user_id: i64,
    unclassified: bool,
    search: Option<&str>,
    limit: i64,
) -> Result<()> {
    let filter = TransactionFilter::new()
        .search(search)
        .unclassified_only(unclassified);

    let transactions = db.list_transactions(user_id, &filter, limit, 0)?;
    let total = db.count_transactions(user_id, &filter)?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!();
    println!("💶 Transactions ({} of {})", transactions.len(), total);
    println!("   ──────────────────────────────────────────────────────────────");

    for tx in &transactions {
        // One flag per classification field: category, sub, payee, payment
        let flags: String = [
            tx.category_id.map(|_| 'C'),
            tx.sub_category_id.map(|_| 'S'),
            tx.payee_id.map(|_| 'P'),
            tx.payment_method.as_ref().map(|_| 'M'),
        ]
        .iter()
        .map(|f| f.unwrap_or('·'))
        .collect();

        println!(
            "   #{:<5} {} {:>10.2}  [{}]  {}",
            tx.id,
            tx.date,
            tx.amount,
            flags,
            truncate(&tx.label, 48)
        );
    }

    Ok(())
}
