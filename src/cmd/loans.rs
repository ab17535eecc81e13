//! Loans command - shareholder loan account, balances and repayment deadlines

use crate::cmd::{open_input, InputArgs};
use crate::core::{
    format_cad, parse_amount, read_ledger_csv, CoreError, DeadlineViolation, LedgerEntry,
    ShareholderLoanLedger,
};
use crate::utils::{print_table, write_csv};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct LoansCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Opening balance carried from the prior year, e.g. Greg=1250.00 (repeatable)
    #[arg(short, long, value_parser = parse_opening)]
    opening: Vec<(String, Decimal)>,

    /// Manual ledger entries CSV (date,shareholder,direction,amount,description)
    #[arg(short, long)]
    entries: Option<PathBuf>,

    /// Date for balances and repayment deadline checks (default: today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Output ledger entries as CSV
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

fn parse_opening(s: &str) -> Result<(String, Decimal), String> {
    let (name, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=AMOUNT, got '{s}'"))?;
    let amount = parse_amount(amount)
        .map_err(|e| format!("invalid amount '{amount}': {e}"))?
        .ok_or_else(|| format!("missing amount for '{name}'"))?;
    Ok((name.trim().to_string(), amount))
}

#[derive(Debug, Clone, Tabled, Serialize)]
struct EntryRow {
    #[tabled(rename = "#")]
    seq: usize,

    #[tabled(rename = "Date")]
    date: String,

    #[tabled(rename = "Shareholder")]
    shareholder: String,

    #[tabled(rename = "Direction")]
    direction: String,

    #[tabled(rename = "Amount")]
    amount: String,

    #[tabled(rename = "Balance")]
    balance: String,

    #[tabled(rename = "Source")]
    source: String,

    #[tabled(rename = "Description")]
    description: String,
}

impl From<&LedgerEntry> for EntryRow {
    fn from(e: &LedgerEntry) -> Self {
        EntryRow {
            seq: e.seq,
            date: e.date.format("%Y-%m-%d").to_string(),
            shareholder: e.shareholder.clone(),
            direction: e.direction.to_string(),
            amount: format!("{:.2}", e.amount),
            balance: format!("{:.2}", e.balance_after),
            source: e.source_id.clone().unwrap_or_default(),
            description: e.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoansOutput<'a> {
    period: String,
    as_of: NaiveDate,
    opening: &'a BTreeMap<String, Decimal>,
    entries: &'a [LedgerEntry],
    balances_as_of: &'a BTreeMap<String, Decimal>,
    closing: BTreeMap<String, Decimal>,
    next_period: String,
    next_opening: &'a BTreeMap<String, Decimal>,
    violations: &'a [DeadlineViolation],
}

impl LoansCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (books, run) = self.input.classify()?;
        let manual = match &self.entries {
            Some(path) => read_ledger_csv(open_input(path)?)?,
            None => Vec::new(),
        };
        let opening: BTreeMap<String, Decimal> = self.opening.iter().cloned().collect();
        let ledger = books.loan_ledger(&run, opening, manual)?;

        let as_of = self
            .as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let violations = ledger.pending_deadline_violations(as_of);
        let balances = ledger
            .shareholders()
            .into_iter()
            .map(|name| {
                let balance = ledger.balance_as_of(&name, as_of)?;
                Ok((name, balance))
            })
            .collect::<Result<BTreeMap<_, _>, CoreError>>()?;
        let next = ShareholderLoanLedger::continue_from(&ledger)?;

        if self.csv {
            let rows: Vec<EntryRow> = ledger.entries().iter().map(EntryRow::from).collect();
            return write_csv(&rows, io::stdout());
        }
        if self.json {
            let output = LoansOutput {
                period: ledger.period.label.clone(),
                as_of,
                opening: &ledger.opening,
                entries: ledger.entries(),
                balances_as_of: &balances,
                closing: ledger.closing_balances(),
                next_period: next.period.label.clone(),
                next_opening: &next.opening,
                violations: &violations,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        print_ledger(&ledger, &balances, &next, &violations, as_of);
        Ok(())
    }
}

fn print_ledger(
    ledger: &ShareholderLoanLedger,
    balances: &BTreeMap<String, Decimal>,
    next: &ShareholderLoanLedger,
    violations: &[DeadlineViolation],
    as_of: NaiveDate,
) {
    println!();
    println!("SHAREHOLDER LOANS (FY {})", ledger.period);
    println!();

    let rows: Vec<EntryRow> = ledger.entries().iter().map(EntryRow::from).collect();
    if rows.is_empty() {
        println!("No loan account activity");
    } else {
        print_table(&rows);
    }

    println!();
    let as_of_heading = format!("At {as_of}");
    println!(
        "  {:20} {:>14} {:>14} {:>14}",
        "Shareholder", "Opening", as_of_heading, "Closing"
    );
    for (shareholder, closing) in ledger.closing_balances() {
        println!(
            "  {:20} {:>14} {:>14} {:>14}",
            shareholder,
            format_cad(ledger.opening_balance(&shareholder)),
            format_cad(balances.get(&shareholder).copied().unwrap_or_default()),
            format_cad(closing)
        );
    }
    println!("  (positive: owed to the corporation)");

    if !next.opening.is_empty() {
        println!();
        println!("Opening balances for FY {}:", next.period);
        for (shareholder, opening) in &next.opening {
            println!("  {:20} {:>14}", shareholder, format_cad(*opening));
        }
    }

    println!();
    if violations.is_empty() {
        println!("\u{2713} No advances past their repayment deadline as of {}", as_of);
    } else {
        println!(
            "\u{26A0} {} advance(s) past their repayment deadline as of {}:",
            violations.len(),
            as_of
        );
        for v in violations {
            println!(
                "  {} {} advanced {} (due {}): {} outstanding of {}",
                v.seq.map_or("opening".to_string(), |s| format!("#{s}")),
                v.shareholder,
                v.advanced_on,
                v.deadline,
                format_cad(v.outstanding),
                format_cad(v.original)
            );
        }
        println!("  Unrepaid amounts may be included in the shareholder's income.");
    }
}
