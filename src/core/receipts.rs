use super::transaction::{Source, TransactionRecord};
use rust_decimal::Decimal;
use serde::Serialize;

/// Documentation CRA expects for a cash expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceiptRequirement {
    None,
    Basic,
    /// Vendor, GST/HST registration number and itemization
    Detailed,
}

impl ReceiptRequirement {
    pub fn is_required(&self) -> bool {
        *self != ReceiptRequirement::None
    }

    pub fn display(&self) -> &'static str {
        match self {
            ReceiptRequirement::None => "-",
            ReceiptRequirement::Basic => "basic",
            ReceiptRequirement::Detailed => "detailed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolicy {
    pub basic_threshold: Decimal,
    pub detailed_threshold: Decimal,
}

impl ReceiptPolicy {
    pub fn new(basic_threshold: Decimal, detailed_threshold: Decimal) -> Self {
        ReceiptPolicy {
            basic_threshold,
            detailed_threshold,
        }
    }

    /// Bank transactions are documented by the statement itself; only cash
    /// expenses are evaluated.
    pub fn evaluate(&self, record: &TransactionRecord) -> ReceiptRequirement {
        match record.source {
            Source::Bank => ReceiptRequirement::None,
            Source::Cash => self.for_amount(record.gross()),
        }
    }

    pub fn for_amount(&self, amount: Decimal) -> ReceiptRequirement {
        let amount = amount.abs();
        if amount >= self.detailed_threshold {
            ReceiptRequirement::Detailed
        } else if amount >= self.basic_threshold {
            ReceiptRequirement::Basic
        } else {
            ReceiptRequirement::None
        }
    }
}
