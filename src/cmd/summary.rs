//! Summary command - income statement for the fiscal year, a quarter or a date range

use crate::cmd::InputArgs;
use crate::core::{format_cad, IncomeStatement};
use crate::utils::print_table;
use chrono::NaiveDate;
use clap::Args;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Quarter of the fiscal year (1-4)
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=4),
        conflicts_with_all = ["from", "to"]
    )]
    quarter: Option<u32>,

    /// First day of the report (default: start of the fiscal year)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the report (default: end of the fiscal year)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct ExpenseRow {
    #[tabled(rename = "Category")]
    category: String,

    #[tabled(rename = "Expense")]
    amount: String,

    #[tabled(rename = "Deductible")]
    deductible: String,

    #[tabled(rename = "Count")]
    count: usize,
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (books, run) = self.input.classify()?;
        let window = match self.quarter {
            Some(_) => books.filing_window(self.quarter)?,
            None => books.period.range(self.from, self.to)?,
        };
        let statement = books.income_statement(&run, &window)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&statement)?);
            return Ok(());
        }

        println!();
        println!(
            "INCOME STATEMENT ({}: {} to {})",
            window.label, window.start, window.end
        );
        if let Some(payer) = &books.config.payer {
            println!("{}", payer.name);
        }
        println!();
        print_statement(&statement);
        Ok(())
    }
}

fn print_statement(statement: &IncomeStatement) {
    println!("  {:30} {:>14}", "Revenue (net of GST/HST)", format_cad(statement.revenue));
    println!("  {:30} {:>14}", "Other income", format_cad(statement.other_income));
    println!();

    if statement.expenses.is_empty() {
        println!("No operating expenses");
    } else {
        let rows: Vec<ExpenseRow> = statement
            .expenses
            .iter()
            .map(|line| ExpenseRow {
                category: line.category.to_string(),
                amount: format!("{:.2}", line.amount),
                deductible: format!("{:.2}", line.deductible),
                count: line.count,
            })
            .collect();
        print_table(&rows);
    }

    println!();
    println!("  {:30} {:>14}", "Total expenses", format_cad(statement.total_expenses));
    println!("  {:30} {:>14}", "Deductible expenses", format_cad(statement.total_deductible));
    println!("  {:30} {:>14}", "Net income", format_cad(statement.net_income));

    if !statement.excluded.is_empty() {
        println!();
        println!(
            "\u{26A0} {} uncategorized transaction(s) not included: {}",
            statement.excluded.len(),
            statement.excluded.join(", ")
        );
    }
}
