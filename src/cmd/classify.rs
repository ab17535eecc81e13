//! Classify command - categorize bank and cash transactions for a fiscal year

use crate::cmd::InputArgs;
use crate::core::{format_cad, ClassificationRun, ClassifiedTransaction};
use crate::utils::{cents, print_table, write_csv};
use clap::Args;
use serde::Serialize;
use std::io;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct ClassifyCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

/// Row for the classification table and CSV output
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ClassifiedRow {
    #[tabled(rename = "Id")]
    pub id: String,

    #[tabled(rename = "Date")]
    pub date: String,

    #[tabled(rename = "Description")]
    pub description: String,

    #[tabled(rename = "Amount")]
    pub amount: String,

    #[tabled(rename = "Category")]
    pub category: String,

    #[tabled(rename = "Rule")]
    pub rule: String,

    #[tabled(rename = "GST/HST")]
    pub gst: String,

    #[tabled(rename = "Deductible")]
    pub deductible: String,

    #[tabled(rename = "Receipt")]
    pub receipt: String,

    #[tabled(rename = "Split")]
    pub split: String,
}

impl From<&ClassifiedTransaction> for ClassifiedRow {
    fn from(c: &ClassifiedTransaction) -> Self {
        ClassifiedRow {
            id: c.id().to_string(),
            date: c.record.date.format("%Y-%m-%d").to_string(),
            description: c.record.description.clone(),
            amount: format!("{:.2}", c.record.amount),
            category: c.category.display().to_string(),
            rule: c.rule.clone(),
            gst: cents(c.gst.map(|g| g.amount)),
            deductible: format!("{:.2}", c.deductible),
            receipt: c.receipt.display().to_string(),
            split: c
                .allocation
                .as_ref()
                .map(|a| {
                    a.shares
                        .iter()
                        .map(|s| format!("{} {:.2}", s.beneficiary, s.amount))
                        .collect::<Vec<_>>()
                        .join(" / ")
                })
                .unwrap_or_default(),
        }
    }
}

impl ClassifyCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (books, run) = self.input.classify()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&run.classified)?);
            return Ok(());
        }

        let rows: Vec<ClassifiedRow> = run.classified.iter().map(ClassifiedRow::from).collect();
        if self.csv {
            return write_csv(&rows, io::stdout());
        }

        println!();
        println!("CLASSIFIED TRANSACTIONS (FY {})", books.period);
        println!();
        if rows.is_empty() {
            println!("No transactions in this fiscal year");
        } else {
            print_table(&rows);
        }
        print_totals(&run);
        Ok(())
    }
}

fn print_totals(run: &ClassificationRun) {
    let totals = run.deductible_by_category();
    if !totals.is_empty() {
        println!();
        println!("Deductible by category:");
        for (category, amount) in &totals {
            println!("  {:28} {:>14}", category.display(), format_cad(*amount));
        }
    }

    println!();
    println!(
        "{} classified, {} rejected, {} duplicates dropped, {} outside the fiscal year",
        run.classified.len(),
        run.rejected.len(),
        run.duplicates.len(),
        run.outside_period.len()
    );
    let review = run.review_items().len();
    if review > 0 {
        println!("{} item(s) need review; run `rigbooks validate` for details", review);
    }
}
