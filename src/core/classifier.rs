use super::allocation::{allocate, Allocation, SplitShare};
use super::category::{Category, ItcGroup, TaxTreatment};
use super::config::RuleSetConfig;
use super::error::CoreError;
use super::money::{is_whole_cents, round_cents};
use super::receipts::{ReceiptPolicy, ReceiptRequirement};
use super::review::ReviewFlag;
use super::rules::{RuleSet, CATCH_ALL_RULE};
use super::transaction::{Flow, TransactionRecord};
use rust_decimal::Decimal;
use serde::Serialize;

/// GST/HST contained in a transaction and the rate it was derived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GstPortion {
    pub amount: Decimal,
    pub rate: Decimal,
}

impl GstPortion {
    fn zero() -> Self {
        GstPortion {
            amount: Decimal::ZERO,
            rate: Decimal::ZERO,
        }
    }
}

/// A transaction record with its category and tax consequences.
///
/// `gst` is `None` only when the treatment is undetermined. GST and deductible
/// amounts are unsigned; direction comes from the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedTransaction {
    pub record: TransactionRecord,
    pub category: Category,
    pub rule: String,
    pub treatment: TaxTreatment,
    pub gst: Option<GstPortion>,
    pub deductible: Decimal,
    pub receipt: ReceiptRequirement,
    pub allocation: Option<Allocation>,
    pub shareholder: Option<String>,
    pub flags: Vec<ReviewFlag>,
}

impl ClassifiedTransaction {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn gst_amount(&self) -> Decimal {
        self.gst.map(|g| g.amount).unwrap_or_default()
    }

    pub fn itc_group(&self) -> Option<ItcGroup> {
        match self.treatment {
            TaxTreatment::InputTaxCredit => self.category.itc_group(),
            _ => None,
        }
    }
}

pub struct Classifier {
    rules: RuleSet,
    receipts: ReceiptPolicy,
    gst_rate: Decimal,
    large_purchase_threshold: Decimal,
    splits: Vec<SplitShare>,
}

impl Classifier {
    pub fn new(config: &RuleSetConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let rules = RuleSet::compile(&config.rules)?;
        log::debug!("Compiled {} classification rules", rules.len());
        Ok(Classifier {
            rules,
            receipts: ReceiptPolicy::new(
                config.receipt_basic_threshold,
                config.receipt_detailed_threshold,
            ),
            gst_rate: config.gst_rate,
            large_purchase_threshold: config.large_purchase_threshold,
            splits: config.split_allocations.clone(),
        })
    }

    /// Classify a single record. Total for well-formed records; a zero amount
    /// or one with a fraction of a cent is rejected.
    pub fn classify(&self, record: &TransactionRecord) -> Result<ClassifiedTransaction, CoreError> {
        if record.amount.is_zero() {
            return Err(CoreError::UnclassifiableTransaction {
                id: record.id.clone(),
                reason: "zero amount".to_string(),
            });
        }
        if !is_whole_cents(record.amount) {
            return Err(CoreError::UnclassifiableTransaction {
                id: record.id.clone(),
                reason: format!("amount {} is not in whole cents", record.amount),
            });
        }

        let rule = self.rules.first_match(record);
        let category = rule.category;
        let treatment = category.treatment();
        let gross = record.gross();
        // GST-inclusive amounts: tax = gross * r / (1 + r)
        let tax_included = gross * self.gst_rate / (Decimal::ONE + self.gst_rate);
        let full_gst = round_cents(tax_included);

        let (gst, deductible) = match treatment {
            TaxTreatment::Collected => (
                Some(GstPortion {
                    amount: full_gst,
                    rate: self.gst_rate,
                }),
                Decimal::ZERO,
            ),
            TaxTreatment::InputTaxCredit => (
                Some(GstPortion {
                    amount: round_cents(tax_included * rule.itc_fraction),
                    rate: self.gst_rate,
                }),
                round_cents((gross - full_gst) * rule.deductible_fraction),
            ),
            TaxTreatment::Exempt => (
                Some(GstPortion::zero()),
                round_cents(gross * rule.deductible_fraction),
            ),
            TaxTreatment::Undetermined => (None, Decimal::ZERO),
        };
        // Refunds of expenses reduce ITCs but are not themselves deductions
        let deductible = match record.flow() {
            Flow::Out => deductible,
            Flow::In => Decimal::ZERO,
        };

        let allocation = if rule.split && !deductible.is_zero() {
            Some(allocate(deductible, &self.splits)?)
        } else {
            None
        };

        let receipt = self.receipts.evaluate(record);
        let mut flags = Vec::new();
        if category == Category::Uncategorized {
            flags.push(ReviewFlag::Uncategorized);
        } else if rule.needs_review {
            flags.push(ReviewFlag::RuleNeedsReview {
                rule: rule.name.clone(),
            });
        }
        if record.flow() == Flow::Out
            && category.itc_group() == Some(ItcGroup::Equipment)
            && gross >= self.large_purchase_threshold
        {
            flags.push(ReviewFlag::LargePurchase { amount: gross });
        }
        if receipt.is_required() {
            flags.push(ReviewFlag::ReceiptRequired {
                requirement: receipt,
            });
        }

        log::debug!(
            "{} '{}' {} -> {} via {} (gst {:?}, deductible {})",
            record.id,
            record.description,
            record.amount,
            category,
            rule.name,
            gst.map(|g| g.amount),
            deductible
        );

        Ok(ClassifiedTransaction {
            record: record.clone(),
            category,
            rule: rule.name.clone(),
            treatment,
            gst,
            deductible,
            receipt,
            allocation,
            shareholder: rule.shareholder.clone(),
            flags,
        })
    }

    /// Classify every record, keeping failures alongside successes.
    pub fn classify_all(
        &self,
        records: &[TransactionRecord],
    ) -> (Vec<ClassifiedTransaction>, Vec<CoreError>) {
        let mut classified = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for record in records {
            match self.classify(record) {
                Ok(c) => classified.push(c),
                Err(err) => {
                    log::warn!("{err}");
                    rejected.push(err);
                }
            }
        }
        let uncategorized = classified
            .iter()
            .filter(|c| c.rule == CATCH_ALL_RULE)
            .count();
        log::info!(
            "Classified {} transactions ({} uncategorized, {} rejected)",
            classified.len(),
            uncategorized,
            rejected.len()
        );
        (classified, rejected)
    }
}
