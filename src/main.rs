mod cmd;
mod core;
mod utils;

use clap::{Parser, Subcommand};

/// CRA bookkeeping for a small corporation: classify bank and cash
/// transactions, file GST/HST, report income, track shareholder loans and
/// issue T5 slips.
#[derive(Parser, Debug)]
#[command(name = "rigbooks", version, about)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorize transactions and compute GST/HST and deductible amounts
    Classify(cmd::classify::ClassifyCommand),
    /// GST/HST return totals for the fiscal year or a quarter
    Gst(cmd::gst::GstCommand),
    /// Shareholder loan ledger, balances and repayment deadlines
    Loans(cmd::loans::LoansCommand),
    /// Income statement for the fiscal year, a quarter or a date range
    Summary(cmd::summary::SummaryCommand),
    /// T5 slips for dividends paid in the fiscal year
    T5(cmd::t5::T5Command),
    /// List items needing manual review (exits 1 if any)
    Validate(cmd::validate::ValidateCommand),
    /// Print the configuration schema or input CSV formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    match opts.command {
        Command::Classify(cmd) => cmd.exec(),
        Command::Gst(cmd) => cmd.exec(),
        Command::Loans(cmd) => cmd.exec(),
        Command::Summary(cmd) => cmd.exec(),
        Command::T5(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
