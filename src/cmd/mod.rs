pub mod classify;
pub mod gst;
pub mod loans;
pub mod schema;
pub mod summary;
pub mod t5;
pub mod validate;

use crate::core::{
    read_bank_csv, read_cash_csv, ClassificationRun, FiscalYearBooks, ParsedRows, RuleSetConfig,
};
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Fiscal year and rule set selection shared by every command.
#[derive(Args, Debug)]
pub struct BooksArgs {
    /// Fiscal year label (e.g., 2024-2025 for Dec 2024 to Nov 2025)
    #[arg(short, long)]
    year: String,

    /// Rule-set configuration (JSON). Built-in CRA rules if not specified.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BooksArgs {
    pub fn open(&self) -> anyhow::Result<FiscalYearBooks> {
        let config = match &self.config {
            Some(path) => RuleSetConfig::load(path)?,
            None => RuleSetConfig::default(),
        };
        Ok(FiscalYearBooks::open(&self.year, config)?)
    }
}

/// Bank and cash inputs for commands that classify transactions.
#[derive(Args, Debug)]
pub struct InputArgs {
    #[command(flatten)]
    books: BooksArgs,

    /// Bank statement CSV (no header: date,description,debit,credit), or "-" for stdin
    #[arg(short, long)]
    bank: Option<PathBuf>,

    /// Cash expense CSV (header: date,description,amount[,category])
    #[arg(long)]
    cash: Option<PathBuf>,
}

impl InputArgs {
    /// Open the books and classify every input row dated in the fiscal year.
    pub fn classify(&self) -> anyhow::Result<(FiscalYearBooks, ClassificationRun)> {
        if self.bank.is_none() && self.cash.is_none() {
            anyhow::bail!("No input given. Provide --bank and/or --cash.");
        }
        let books = self.books.open()?;

        let mut parsed = ParsedRows::default();
        if let Some(path) = &self.bank {
            let bank = read_bank_csv(open_input(path)?)?;
            parsed.records.extend(bank.records);
            parsed.rejected.extend(bank.rejected);
        }
        if let Some(path) = &self.cash {
            let cash = read_cash_csv(open_input(path)?)?;
            parsed.records.extend(cash.records);
            parsed.rejected.extend(cash.rejected);
        }

        let run = books.classify(parsed);
        Ok((books, run))
    }
}

/// Open a file for reading, or stdin with "-".
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        BufReader::new(io::stdin().lock()).read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
        Ok(Box::new(io::Cursor::new(buffer)))
    } else {
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("cannot open {}: {}", path.display(), e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}
