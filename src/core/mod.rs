pub mod allocation;
pub mod books;
pub mod category;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gst;
pub mod income;
pub mod ledger;
pub mod money;
pub mod period;
pub mod receipts;
pub mod review;
pub mod rules;
pub mod t5;
pub mod transaction;

use serde::Serialize;

/// One column of a CSV input, generated by `#[derive(CsvSchema)]`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CsvColumn {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

// Flat surface used by the command layer.
pub use books::{ClassificationRun, FiscalYearBooks};
pub use classifier::ClassifiedTransaction;
pub use config::RuleSetConfig;
pub use error::CoreError;
pub use gst::{GstFilingSummary, NetPosition};
pub use income::IncomeStatement;
pub use ledger::{read_ledger_csv, DeadlineViolation, LedgerEntry, LedgerRow, ShareholderLoanLedger};
pub use money::{format_cad, parse_amount};
pub use review::ReviewItem;
pub use t5::{declare_dividend, read_dividends_csv, DividendRow, DividendType, T5Slip};
pub use transaction::{read_bank_csv, read_cash_csv, BankRow, CashExpenseRow, ParsedRows};
