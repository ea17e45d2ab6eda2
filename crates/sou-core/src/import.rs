//! CSV import for bank transaction exports
//!
//! Two dialects are auto-detected from the header row: the common French
//! bank export (semicolon-separated, `Date;Libellé;Montant`, DD/MM/YYYY
//! dates, comma decimal separator) and a generic comma-separated
//! `Date,Description,Amount` export.
//!
//! Every inserted transaction is classified on the way in with a rule-set
//! snapshot loaded once per file, mirroring the bulk reclassifier.

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::db::{Database, TransactionInsertResult};
use crate::error::{Error, Result};
use crate::models::NewTransaction;
use crate::reclassify::RuleFireCount;
use crate::rules::{RuleSet, RuleWarning};

/// CSV flavor of a bank export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvDialect {
    /// French bank style: `;` separator, DD/MM/YYYY, `1 234,56` amounts
    Semicolon,
    /// Generic style: `,` separator, ISO or US dates, `1234.56` amounts
    Comma,
}

impl CsvDialect {
    fn delimiter(&self) -> u8 {
        match self {
            Self::Semicolon => b';',
            Self::Comma => b',',
        }
    }
}

/// Aggregate outcome of importing one file
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub import_id: i64,
    pub total_rows: i64,
    pub imported: i64,
    pub duplicates: i64,
    pub errors: i64,
    /// Rules that fired while classifying the new transactions
    pub rule_fires: Vec<RuleFireCount>,
    /// Rules that could not be compiled (invalid regex)
    pub warnings: Vec<RuleWarning>,
}

/// Detect the CSV dialect from the header line
///
/// Returns None if the line resembles neither dialect.
pub fn detect_dialect(header: &str) -> Option<CsvDialect> {
    let header = header.trim();

    if header.matches(';').count() >= 2 {
        return Some(CsvDialect::Semicolon);
    }
    if header.matches(',').count() >= 2 {
        return Some(CsvDialect::Comma);
    }
    None
}

/// Generate a unique hash for deduplication
fn generate_hash(date: &NaiveDate, label: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(label.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Resolve the date/label/amount column indices from the header record
fn resolve_columns(headers: &csv::StringRecord) -> Result<(usize, usize, usize)> {
    let mut date = None;
    let mut label = None;
    let mut amount = None;

    for (i, raw) in headers.iter().enumerate() {
        let name = raw.trim().to_lowercase();
        if date.is_none() && name.starts_with("date") {
            date = Some(i);
        } else if label.is_none()
            && (name.starts_with("libell") || name == "label" || name == "description")
        {
            label = Some(i);
        } else if amount.is_none() && (name == "montant" || name == "amount") {
            amount = Some(i);
        }
    }

    match (date, label, amount) {
        (Some(d), Some(l), Some(a)) => Ok((d, l, a)),
        _ => Err(Error::Import(format!(
            "Unrecognized CSV header: {:?}",
            headers
        ))),
    }
}

fn parse_date(s: &str, dialect: CsvDialect) -> Result<NaiveDate> {
    let s = s.trim();
    let formats: &[&str] = match dialect {
        CsvDialect::Semicolon => &["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d"],
        CsvDialect::Comma => &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"],
    };

    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    Err(Error::Import(format!("Unparseable date: {}", s)))
}

fn parse_amount(s: &str) -> Result<f64> {
    // Strip currency symbols, regular and non-breaking spaces
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '$' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unparseable amount: {}", s)))
}

/// Parse CSV data into candidate transactions
///
/// Rows that fail to parse are returned as errors alongside the good rows
/// so the caller can count them without aborting the file.
pub fn parse_csv(data: &str) -> Result<(Vec<NewTransaction>, i64)> {
    let header_line = data
        .lines()
        .next()
        .ok_or_else(|| Error::Import("Empty file".to_string()))?;
    let dialect = detect_dialect(header_line)
        .ok_or_else(|| Error::Import("Unrecognized CSV header".to_string()))?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(dialect.delimiter())
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let (date_col, label_col, amount_col) = resolve_columns(rdr.headers()?)?;

    let mut transactions = Vec::new();
    let mut errors = 0i64;

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed CSV record: {}", e);
                errors += 1;
                continue;
            }
        };

        let parsed = (|| -> Result<NewTransaction> {
            let date_str = record
                .get(date_col)
                .ok_or_else(|| Error::Import("Missing date".into()))?;
            let date = parse_date(date_str, dialect)?;

            let label = record
                .get(label_col)
                .ok_or_else(|| Error::Import("Missing label".into()))?
                .trim()
                .to_string();
            if label.is_empty() {
                return Err(Error::Import("Empty label".into()));
            }

            let amount_str = record
                .get(amount_col)
                .ok_or_else(|| Error::Import("Missing amount".into()))?;
            let amount = parse_amount(amount_str)?;

            let import_hash = generate_hash(&date, &label, amount);

            Ok(NewTransaction {
                date,
                label,
                amount,
                import_hash,
            })
        })();

        match parsed {
            Ok(tx) => transactions.push(tx),
            Err(e) => {
                warn!("Skipping CSV row: {}", e);
                errors += 1;
            }
        }
    }

    debug!(
        "Parsed {} transactions ({} bad rows) from {:?} CSV",
        transactions.len(),
        errors,
        dialect
    );
    Ok((transactions, errors))
}

/// Import a CSV export into an account, classifying each new transaction
pub fn import_csv<R: Read>(
    db: &Database,
    user_id: i64,
    account_id: i64,
    filename: &str,
    mut reader: R,
) -> Result<ImportOutcome> {
    let mut data = String::new();
    reader.read_to_string(&mut data)?;

    let (rows, parse_errors) = parse_csv(&data)?;
    let total_rows = rows.len() as i64 + parse_errors;

    // Snapshot the rule set once for the whole file
    let set = RuleSet::build(db.list_rules_for_user(user_id)?);

    let rule_names: HashMap<i64, String> = set
        .rules()
        .iter()
        .map(|c| (c.rule().id, c.rule().name.clone()))
        .collect();

    let mut imported = 0i64;
    let mut duplicates = 0i64;
    let mut errors = parse_errors;
    let mut fires: HashMap<i64, i64> = HashMap::new();

    for tx in &rows {
        let classified = set.preview(&tx.label);

        match db.insert_transaction(account_id, tx, &classified.fields) {
            Ok(TransactionInsertResult::Inserted(_)) => {
                imported += 1;
                for rule_id in &classified.fired_rules {
                    *fires.entry(*rule_id).or_insert(0) += 1;
                }
            }
            Ok(TransactionInsertResult::Duplicate(existing)) => {
                debug!(
                    "Skipping duplicate of transaction {}: {}",
                    existing, tx.label
                );
                duplicates += 1;
            }
            Err(e) => {
                warn!("Failed to insert transaction '{}': {}", tx.label, e);
                errors += 1;
            }
        }
    }

    // Flush usage counters for rules that classified inserted rows
    let now = chrono::Utc::now();
    for (rule_id, count) in &fires {
        if let Err(e) = db.increment_rule_usage(*rule_id, *count, now) {
            warn!("Failed to update usage counter for rule {}: {}", rule_id, e);
        }
    }

    let import_id = db.record_import(
        user_id,
        account_id,
        filename,
        total_rows,
        imported,
        duplicates,
        errors,
    )?;

    let mut rule_fires: Vec<RuleFireCount> = fires
        .into_iter()
        .map(|(rule_id, count)| RuleFireCount {
            rule_id,
            rule_name: rule_names.get(&rule_id).cloned().unwrap_or_default(),
            fires: count,
        })
        .collect();
    rule_fires.sort_by(|a, b| b.fires.cmp(&a.fires));

    Ok(ImportOutcome {
        import_id,
        total_rows,
        imported,
        duplicates,
        errors,
        rule_fires,
        warnings: set.warnings().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionFilter;
    use crate::models::{MatchMode, NewRule};

    const FRENCH_CSV: &str = "\
Date;Libellé;Montant
02/10/2024;PAIEMENT PAR CARTE X6984 Picnic Paris;-23,90
03/10/2024;VIR SEPA SALAIRE OCTOBRE;2 150,00
04/10/2024;PRLV SEPA EDF;-67,10
";

    const GENERIC_CSV: &str = "\
Date,Description,Amount
2024-10-02,COFFEE SHOP,-4.50
2024-10-03,PAYROLL,2150.00
";

    #[test]
    fn detects_dialects() {
        assert_eq!(
            detect_dialect("Date;Libellé;Montant"),
            Some(CsvDialect::Semicolon)
        );
        assert_eq!(
            detect_dialect("Date,Description,Amount"),
            Some(CsvDialect::Comma)
        );
        assert_eq!(detect_dialect("not a csv header"), None);
    }

    #[test]
    fn parses_french_rows() {
        let (rows, errors) = parse_csv(FRENCH_CSV).unwrap();
        assert_eq!(errors, 0);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].label, "PAIEMENT PAR CARTE X6984 Picnic Paris");
        assert_eq!(rows[0].amount, -23.9);
        assert_eq!(rows[0].date.to_string(), "2024-10-02");
        // French thousands separator and comma decimal
        assert_eq!(rows[1].amount, 2150.0);
    }

    #[test]
    fn parses_generic_rows() {
        let (rows, errors) = parse_csv(GENERIC_CSV).unwrap();
        assert_eq!(errors, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, -4.5);
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let csv = "\
Date;Libellé;Montant
02/10/2024;OK ROW;-1,00
not-a-date;BAD ROW;-1,00
03/10/2024;;-1,00
";
        let (rows, errors) = parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(errors, 2);
    }

    #[test]
    fn import_classifies_and_deduplicates() {
        let db = Database::in_memory().unwrap();
        let user_id = db.ensure_default_user().unwrap();
        let account_id = db.upsert_account(user_id, "Courant", None).unwrap();
        let category = db.create_category(user_id, "Alimentation", None).unwrap();

        let rule_id = db
            .create_rule(
                user_id,
                &NewRule {
                    name: "Picnic".to_string(),
                    pattern: "Picnic".to_string(),
                    match_mode: MatchMode::Contains,
                    case_sensitive: false,
                    priority: 10,
                    enabled: true,
                    category_id: Some(category),
                    sub_category_id: None,
                    payee_id: None,
                    payment_method: None,
                },
            )
            .unwrap();

        let outcome =
            import_csv(&db, user_id, account_id, "octobre.csv", FRENCH_CSV.as_bytes()).unwrap();
        assert_eq!(outcome.total_rows, 3);
        assert_eq!(outcome.imported, 3);
        assert_eq!(outcome.duplicates, 0);
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.rule_fires.len(), 1);
        assert_eq!(outcome.rule_fires[0].rule_id, rule_id);

        // The Picnic transaction was classified at insert time
        let filter = TransactionFilter::new().search(Some("picnic"));
        let found = db.list_transactions(user_id, &filter, 10, 0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category_id, Some(category));

        // Usage counter reflects the single fire
        assert_eq!(db.get_rule(rule_id).unwrap().unwrap().usage_count, 1);

        // Re-importing the same file only yields duplicates
        let again =
            import_csv(&db, user_id, account_id, "octobre.csv", FRENCH_CSV.as_bytes()).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.duplicates, 3);
        assert_eq!(db.get_rule(rule_id).unwrap().unwrap().usage_count, 1);

        // Both sessions left an audit trail, newest first
        let sessions = db.list_imports(user_id).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].duplicates, 3);
        assert_eq!(sessions[1].imported, 3);
        assert_eq!(sessions[1].filename, "octobre.csv");
    }
}
