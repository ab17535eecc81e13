//! T5 command - Statement of Investment Income slips for dividends paid

use crate::cmd::{open_input, BooksArgs};
use crate::core::{declare_dividend, parse_amount, read_dividends_csv, DividendType, T5Slip};
use crate::utils::{print_table, write_csv};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct T5Command {
    #[command(flatten)]
    books: BooksArgs,

    /// Dividends paid CSV (header: date,shareholder,amount[,type])
    #[arg(short, long)]
    dividends: Option<PathBuf>,

    /// Total dividend declared, split by ownership (requires --date)
    #[arg(long, value_parser = parse_declared, requires = "date")]
    declare: Option<Decimal>,

    /// Payment date of the declared dividend
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Type of the declared dividend: eligible or non-eligible
    #[arg(long = "type", default_value = "eligible", requires = "declare")]
    dividend_type: DividendType,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

fn parse_declared(s: &str) -> Result<Decimal, String> {
    parse_amount(s)
        .map_err(|e| format!("invalid amount '{s}': {e}"))?
        .ok_or_else(|| "missing amount".to_string())
}

#[derive(Debug, Clone, Tabled, Serialize)]
struct SlipRow {
    #[tabled(rename = "Shareholder")]
    shareholder: String,

    #[tabled(rename = "Payments")]
    payments: usize,

    #[tabled(rename = "Box 24 Eligible")]
    eligible_actual: String,

    #[tabled(rename = "Box 25 Taxable")]
    eligible_taxable: String,

    #[tabled(rename = "Box 26 Credit")]
    eligible_credit: String,

    #[tabled(rename = "Box 10 Other")]
    other_actual: String,

    #[tabled(rename = "Box 11 Taxable")]
    other_taxable: String,

    #[tabled(rename = "Box 12 Credit")]
    other_credit: String,
}

impl From<&T5Slip> for SlipRow {
    fn from(slip: &T5Slip) -> Self {
        SlipRow {
            shareholder: slip.shareholder.clone(),
            payments: slip.payment_count,
            eligible_actual: format!("{:.2}", slip.eligible.actual),
            eligible_taxable: format!("{:.2}", slip.eligible.taxable),
            eligible_credit: format!("{:.2}", slip.eligible.tax_credit),
            other_actual: format!("{:.2}", slip.other_than_eligible.actual),
            other_taxable: format!("{:.2}", slip.other_than_eligible.taxable),
            other_credit: format!("{:.2}", slip.other_than_eligible.tax_credit),
        }
    }
}

impl T5Command {
    pub fn exec(&self) -> anyhow::Result<()> {
        let books = self.books.open()?;

        let mut payments = match &self.dividends {
            Some(path) => read_dividends_csv(open_input(path)?)?,
            None => Vec::new(),
        };
        if let (Some(total), Some(date)) = (self.declare, self.date) {
            payments.extend(declare_dividend(
                total,
                date,
                self.dividend_type,
                &books.config.split_allocations,
            )?);
        }
        if payments.is_empty() {
            anyhow::bail!("No dividends given. Provide --dividends and/or --declare with --date.");
        }

        let slips = books.t5_slips(&payments)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&slips)?);
            return Ok(());
        }

        let rows: Vec<SlipRow> = slips.iter().map(SlipRow::from).collect();
        if self.csv {
            return write_csv(&rows, io::stdout());
        }

        println!();
        println!("T5 SLIPS (FY {})", books.period);
        if let Some(payer) = &books.config.payer {
            match &payer.business_number {
                Some(bn) => println!("Payer: {} (BN {})", payer.name, bn),
                None => println!("Payer: {}", payer.name),
            }
        }
        println!();
        if rows.is_empty() {
            println!("No dividends paid in this fiscal year");
            return Ok(());
        }
        print_table(&rows);

        let config = &books.config;
        println!();
        println!(
            "Eligible: gross-up {}, credit rate {}. Other than eligible: gross-up {}, credit rate {}.",
            config.gross_up_factor,
            config.dividend_credit_rate,
            config.non_eligible_gross_up_factor,
            config.non_eligible_credit_rate
        );
        Ok(())
    }
}
