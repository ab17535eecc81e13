//! GST command - GST/HST return totals for the fiscal year or a quarter

use crate::cmd::InputArgs;
use crate::core::{format_cad, GstFilingSummary, NetPosition};
use clap::Args;

#[derive(Args, Debug)]
pub struct GstCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Quarter of the fiscal year (1-4); whole year if not specified
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=4))]
    quarter: Option<u32>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl GstCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (books, run) = self.input.classify()?;
        let summary = books.gst_summary(&run, self.quarter)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn print_summary(summary: &GstFilingSummary) {
    let window = &summary.window;
    println!();
    println!("GST/HST RETURN ({}: {} to {})", window.label, window.start, window.end);
    println!();
    println!("  {:40} {:>14}", "Line 101  Sales and other revenue", format_cad(summary.taxable_revenue));
    println!("  {:40} {:>14}", "Line 105  GST/HST collected", format_cad(summary.collected));
    println!("  {:40} {:>14}", "Line 108  Input tax credits", format_cad(summary.itc));
    println!("  {:40} {:>14}", "Line 109  Net tax", format_cad(summary.net));

    if !summary.itc_by_group.is_empty() {
        println!();
        println!("  Input tax credits by group:");
        for (group, amount) in &summary.itc_by_group {
            println!("    {:38} {:>14}", group.display(), format_cad(*amount));
        }
    }
    if !summary.exempt_revenue.is_zero() {
        println!();
        println!("  {:40} {:>14}", "Exempt revenue (not reported)", format_cad(summary.exempt_revenue));
    }

    println!();
    match summary.position() {
        NetPosition::Owing => println!("Balance owing: {}", format_cad(summary.net)),
        NetPosition::Refund => println!("Refund claimed: {}", format_cad(-summary.net)),
        NetPosition::Nil => println!("Nil return"),
    }
    println!(
        "{} transactions ({} collected, {} ITC)",
        summary.transaction_count,
        summary.collected_from.len(),
        summary.itc_from.len()
    );
}
