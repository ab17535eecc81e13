use super::receipts::ReceiptRequirement;
use rust_decimal::Decimal;
use serde::Serialize;

/// Reasons a transaction should be looked at by a person before filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReviewFlag {
    /// No rule matched; GST/HST treatment is unknown.
    Uncategorized,
    /// Matched a rule marked as needing confirmation (e.g. generic deposits).
    RuleNeedsReview { rule: String },
    /// Equipment or vehicle purchase large enough to be a capital asset.
    LargePurchase { amount: Decimal },
    /// Cash expense needing a receipt on file.
    ReceiptRequired { requirement: ReceiptRequirement },
}

impl ReviewFlag {
    pub fn describe(&self) -> String {
        match self {
            ReviewFlag::Uncategorized => "no rule matched".to_string(),
            ReviewFlag::RuleNeedsReview { rule } => format!("rule '{rule}' needs confirmation"),
            ReviewFlag::LargePurchase { amount } => {
                format!("purchase of {amount} may need to be capitalized")
            }
            ReviewFlag::ReceiptRequired { requirement } => {
                format!("{} receipt required", requirement.display())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewKind {
    Rejected,
    Duplicate,
    Uncategorized,
    NeedsReview,
    LargePurchase,
    Receipt,
}

impl ReviewKind {
    pub fn display(&self) -> &'static str {
        match self {
            ReviewKind::Rejected => "rejected",
            ReviewKind::Duplicate => "duplicate",
            ReviewKind::Uncategorized => "uncategorized",
            ReviewKind::NeedsReview => "needs review",
            ReviewKind::LargePurchase => "large purchase",
            ReviewKind::Receipt => "receipt",
        }
    }
}

impl From<&ReviewFlag> for ReviewKind {
    fn from(flag: &ReviewFlag) -> Self {
        match flag {
            ReviewFlag::Uncategorized => ReviewKind::Uncategorized,
            ReviewFlag::RuleNeedsReview { .. } => ReviewKind::NeedsReview,
            ReviewFlag::LargePurchase { .. } => ReviewKind::LargePurchase,
            ReviewFlag::ReceiptRequired { .. } => ReviewKind::Receipt,
        }
    }
}

/// One line of the manual review list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewItem {
    pub kind: ReviewKind,
    /// Transaction id, when the problem is tied to one
    pub id: Option<String>,
    pub detail: String,
}
