use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unclassifiable transaction {id}: {reason}")]
    UnclassifiableTransaction { id: String, reason: String },
    #[error("period {period} incomplete: {} transaction(s) missing GST/HST portion ({})", missing.len(), missing.join(", "))]
    PeriodIncomplete { period: String, missing: Vec<String> },
    #[error("invalid dividend amount {amount} for {shareholder}")]
    InvalidDividendAmount { shareholder: String, amount: Decimal },
    #[error("allocation of {expected} does not reconcile: shares sum to {allocated}")]
    AllocationMismatch { expected: Decimal, allocated: Decimal },
    #[error("invalid split allocation: {0}")]
    InvalidSplit(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },
    #[error("invalid fiscal period: {0}")]
    InvalidPeriod(String),
    #[error("{date} is outside fiscal period {period}")]
    OutsidePeriod { date: NaiveDate, period: String },
    #[error("ledger entry dated {date} precedes last entry dated {last}")]
    LedgerOutOfOrder { date: NaiveDate, last: NaiveDate },
    #[error("ledger amount must be positive, got {0}")]
    InvalidLedgerAmount(Decimal),
    #[error("amount overflow computing {0}")]
    AmountOverflow(String),
}
