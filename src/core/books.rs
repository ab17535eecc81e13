use super::category::Category;
use super::classifier::{ClassifiedTransaction, Classifier};
use super::config::RuleSetConfig;
use super::error::CoreError;
use super::gst::{summarize_gst, GstFilingSummary};
use super::income::{income_statement, IncomeStatement};
use super::ledger::{postings_from_classified, LoanPosting, ShareholderLoanLedger};
use super::period::{FilingWindow, FiscalPeriod};
use super::review::{ReviewItem, ReviewKind};
use super::t5::{generate_t5_slips, DividendPayment, T5Rates, T5Slip};
use super::transaction::{dedup_records, ParsedRows};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The books of one fiscal year: the period plus the rule set applied to it.
/// Every derived artifact is computed from records dated inside the period.
pub struct FiscalYearBooks {
    pub period: FiscalPeriod,
    pub config: RuleSetConfig,
    classifier: Classifier,
}

/// Result of classifying one period's inputs.
#[derive(Debug, Default)]
pub struct ClassificationRun {
    pub classified: Vec<ClassifiedTransaction>,
    /// Malformed rows and records that could not be classified
    pub rejected: Vec<CoreError>,
    /// Ids of repeated rows that were dropped
    pub duplicates: Vec<String>,
    /// Ids of records dated in another fiscal year
    pub outside_period: Vec<String>,
}

impl FiscalYearBooks {
    /// Open the books for a labelled fiscal year, e.g. "2024-2025".
    pub fn open(label: &str, config: RuleSetConfig) -> Result<Self, CoreError> {
        let period = FiscalPeriod::from_label(label, config.year_end)?;
        Self::for_period(period, config)
    }

    pub fn for_period(period: FiscalPeriod, config: RuleSetConfig) -> Result<Self, CoreError> {
        let classifier = Classifier::new(&config)?;
        log::info!(
            "Opened fiscal year {} ({} to {})",
            period,
            period.start,
            period.end
        );
        Ok(FiscalYearBooks {
            period,
            config,
            classifier,
        })
    }

    /// Scope parsed rows to this period, drop duplicates and classify.
    pub fn classify(&self, parsed: ParsedRows) -> ClassificationRun {
        let ParsedRows {
            mut records,
            mut rejected,
        } = parsed;

        let mut outside_period = Vec::new();
        records.retain(|r| {
            let inside = self.period.contains(r.date);
            if !inside {
                log::debug!("{} dated {} is outside {}", r.id, r.date, self.period);
                outside_period.push(r.id.clone());
            }
            inside
        });
        if !outside_period.is_empty() {
            log::info!(
                "Skipped {} records outside fiscal year {}",
                outside_period.len(),
                self.period
            );
        }

        let duplicates = dedup_records(&mut records);
        let (classified, failed) = self.classifier.classify_all(&records);
        rejected.extend(failed);

        ClassificationRun {
            classified,
            rejected,
            duplicates,
            outside_period,
        }
    }

    /// GST/HST summary for the whole year, or for quarter 1-4.
    pub fn gst_summary(
        &self,
        run: &ClassificationRun,
        quarter: Option<u32>,
    ) -> Result<GstFilingSummary, CoreError> {
        summarize_gst(&run.classified, &self.filing_window(quarter)?)
    }

    /// The whole fiscal year, or quarter 1-4.
    pub fn filing_window(&self, quarter: Option<u32>) -> Result<FilingWindow, CoreError> {
        match quarter {
            Some(q) => self.period.quarter(q),
            None => Ok(self.period.window()),
        }
    }

    pub fn income_statement(
        &self,
        run: &ClassificationRun,
        window: &FilingWindow,
    ) -> Result<IncomeStatement, CoreError> {
        income_statement(&run.classified, window)
    }

    /// Loan ledger from the classified transactions plus any manual postings.
    pub fn loan_ledger(
        &self,
        run: &ClassificationRun,
        opening: BTreeMap<String, Decimal>,
        manual: Vec<LoanPosting>,
    ) -> Result<ShareholderLoanLedger, CoreError> {
        let mut postings = postings_from_classified(&run.classified, &self.config.split_allocations)?;
        postings.extend(manual);
        ShareholderLoanLedger::from_postings(self.period.clone(), opening, postings)
    }

    pub fn t5_slips(&self, payments: &[DividendPayment]) -> Result<Vec<T5Slip>, CoreError> {
        generate_t5_slips(
            payments,
            &T5Rates::from_config(&self.config),
            &self.period,
            self.config.payer.as_ref(),
        )
    }
}

impl ClassificationRun {
    /// Everything a person should look at before filing.
    pub fn review_items(&self) -> Vec<ReviewItem> {
        let mut items = Vec::new();
        for err in &self.rejected {
            let id = match err {
                CoreError::UnclassifiableTransaction { id, .. } => Some(id.clone()),
                _ => None,
            };
            items.push(ReviewItem {
                kind: ReviewKind::Rejected,
                id,
                detail: err.to_string(),
            });
        }
        for id in &self.duplicates {
            items.push(ReviewItem {
                kind: ReviewKind::Duplicate,
                id: Some(id.clone()),
                detail: "duplicate statement row dropped".to_string(),
            });
        }
        for c in &self.classified {
            for flag in &c.flags {
                items.push(ReviewItem {
                    kind: ReviewKind::from(flag),
                    id: Some(c.id().to_string()),
                    detail: format!("{} ({}): {}", c.record.description, c.record.amount, flag.describe()),
                });
            }
        }
        items.sort_by(|a, b| a.kind.cmp(&b.kind));
        items
    }

    /// Sum of deductible amounts per category.
    pub fn deductible_by_category(&self) -> BTreeMap<Category, Decimal> {
        let mut totals = BTreeMap::new();
        for c in self.classified.iter().filter(|c| !c.deductible.is_zero()) {
            *totals.entry(c.category).or_default() += c.deductible;
        }
        totals
    }
}
