use super::error::CoreError;
use super::money::parse_amount;
use chrono::NaiveDate;
use rigbooks_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;

/// Where a transaction was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Bank,
    Cash,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Bank => write!(f, "bank"),
            Source::Cash => write!(f, "cash"),
        }
    }
}

/// Direction of money relative to the corporation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    In,
    Out,
}

/// One normalized financial event.
///
/// `amount` is signed: positive is money received by the corporation,
/// negative is money paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub source: Source,
    pub category_hint: Option<String>,
}

impl TransactionRecord {
    pub fn flow(&self) -> Flow {
        if self.amount < Decimal::ZERO {
            Flow::Out
        } else {
            Flow::In
        }
    }

    /// Unsigned amount.
    pub fn gross(&self) -> Decimal {
        self.amount.abs()
    }
}

/// A bank statement row (CIBC export: no header, `date,description,debit,credit`).
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct BankRow {
    /// Posting date (YYYY-MM-DD)
    pub date: String,
    /// Statement description
    pub description: String,
    /// Money out of the account
    #[serde(default)]
    pub debit: Option<String>,
    /// Money into the account; exports often omit the trailing column
    #[serde(default)]
    pub credit: Option<String>,
}

/// A cash expense entered by hand.
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct CashExpenseRow {
    /// Date paid (YYYY-MM-DD)
    pub date: String,
    /// Vendor and purpose
    pub description: String,
    /// Amount paid, GST included
    pub amount: String,
    /// Category from the entry form
    #[serde(default)]
    pub category: Option<String>,
}

impl BankRow {
    pub fn into_record(self, id: String) -> Result<TransactionRecord, CoreError> {
        let date = parse_date(&id, &self.date)?;
        let debit = amount_field(&id, "debit", self.debit.as_deref())?.filter(|d| !d.is_zero());
        let credit = amount_field(&id, "credit", self.credit.as_deref())?.filter(|c| !c.is_zero());

        let amount = match (debit, credit) {
            (Some(d), None) => -d.abs(),
            (None, Some(c)) => c.abs(),
            (Some(_), Some(_)) => return Err(unclassifiable(&id, "row has both debit and credit")),
            (None, None) => return Err(unclassifiable(&id, "missing amount")),
        };

        Ok(TransactionRecord {
            id,
            date,
            description: self.description.trim().to_string(),
            amount,
            source: Source::Bank,
            category_hint: None,
        })
    }
}

impl CashExpenseRow {
    pub fn into_record(self, id: String) -> Result<TransactionRecord, CoreError> {
        let date = parse_date(&id, &self.date)?;
        let amount = amount_field(&id, "amount", Some(&self.amount))?
            .filter(|a| !a.is_zero())
            .ok_or_else(|| unclassifiable(&id, "missing amount"))?;

        Ok(TransactionRecord {
            id,
            date,
            description: self.description.trim().to_string(),
            amount: -amount.abs(),
            source: Source::Cash,
            category_hint: self.category.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Rows that parsed plus rows rejected as malformed, in input order.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub records: Vec<TransactionRecord>,
    pub rejected: Vec<CoreError>,
}

/// Read a headerless bank statement CSV.
pub fn read_bank_csv<R: Read>(reader: R) -> anyhow::Result<ParsedRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedRows::default();
    for (i, row) in rdr.deserialize::<BankRow>().enumerate() {
        let id = format!("bank-{:04}", i + 1);
        match row {
            Ok(row) => match row.into_record(id) {
                Ok(record) => parsed.records.push(record),
                Err(err) => parsed.rejected.push(err),
            },
            Err(err) => parsed.rejected.push(unclassifiable(&id, &err.to_string())),
        }
    }
    log::info!(
        "Read {} bank rows ({} rejected)",
        parsed.records.len(),
        parsed.rejected.len()
    );
    Ok(parsed)
}

/// Read a cash expense CSV with a header row.
pub fn read_cash_csv<R: Read>(reader: R) -> anyhow::Result<ParsedRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedRows::default();
    for (i, row) in rdr.deserialize::<CashExpenseRow>().enumerate() {
        let id = format!("cash-{:04}", i + 1);
        match row {
            Ok(row) => match row.into_record(id) {
                Ok(record) => parsed.records.push(record),
                Err(err) => parsed.rejected.push(err),
            },
            Err(err) => parsed.rejected.push(unclassifiable(&id, &err.to_string())),
        }
    }
    log::info!(
        "Read {} cash expenses ({} rejected)",
        parsed.records.len(),
        parsed.rejected.len()
    );
    Ok(parsed)
}

/// Drop repeated bank statement rows (same date, description and amount),
/// keeping the first. Cash entries are never dropped. Returns the ids of the
/// dropped records.
pub fn dedup_records(records: &mut Vec<TransactionRecord>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    records.retain(|r| {
        if r.source != Source::Bank {
            return true;
        }
        let key = (r.date, r.description.to_uppercase(), r.amount);
        if seen.insert(key) {
            true
        } else {
            log::debug!("Dropping duplicate row {} ({})", r.id, r.description);
            dropped.push(r.id.clone());
            false
        }
    });
    dropped
}

fn parse_date(id: &str, raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| unclassifiable(id, &format!("invalid date '{raw}'")))
}

fn amount_field(id: &str, field: &str, raw: Option<&str>) -> Result<Option<Decimal>, CoreError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_amount(raw)
            .map_err(|_| unclassifiable(id, &format!("invalid {field} '{}'", raw.trim()))),
    }
}

fn unclassifiable(id: &str, reason: &str) -> CoreError {
    CoreError::UnclassifiableTransaction {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}
