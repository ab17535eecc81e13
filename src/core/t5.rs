use super::allocation::{allocate, SplitShare};
use super::config::{Payer, RuleSetConfig};
use super::error::CoreError;
use super::money::{checked_add, checked_mul, parse_amount, round_cents};
use super::period::FiscalPeriod;
use anyhow::Context;
use chrono::NaiveDate;
use rigbooks_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

/// Eligible dividends are paid from income taxed at the general rate;
/// everything else (small-business income) is other than eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DividendType {
    #[default]
    Eligible,
    NonEligible,
}

impl FromStr for DividendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eligible" => Ok(DividendType::Eligible),
            "non-eligible" | "noneligible" | "other" => Ok(DividendType::NonEligible),
            other => Err(format!("unknown dividend type '{other}' (eligible or non-eligible)")),
        }
    }
}

impl std::fmt::Display for DividendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DividendType::Eligible => write!(f, "eligible"),
            DividendType::NonEligible => write!(f, "non-eligible"),
        }
    }
}

/// Gross-up factor and federal dividend tax credit rate for one dividend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DividendRates {
    pub gross_up_factor: Decimal,
    /// Applied to the taxable (grossed-up) amount
    pub credit_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T5Rates {
    pub eligible: DividendRates,
    pub non_eligible: DividendRates,
}

impl T5Rates {
    pub fn from_config(config: &RuleSetConfig) -> Self {
        T5Rates {
            eligible: DividendRates {
                gross_up_factor: config.gross_up_factor,
                credit_rate: config.dividend_credit_rate,
            },
            non_eligible: DividendRates {
                gross_up_factor: config.non_eligible_gross_up_factor,
                credit_rate: config.non_eligible_credit_rate,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPayment {
    pub date: NaiveDate,
    pub shareholder: String,
    pub amount: Decimal,
    pub dividend_type: DividendType,
}

/// Actual, taxable and credit amounts for one dividend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendBoxes {
    pub actual: Decimal,
    pub gross_up: Decimal,
    pub taxable: Decimal,
    pub tax_credit: Decimal,
}

impl DividendBoxes {
    fn from_actual(actual: Decimal, rates: &DividendRates) -> Result<Self, CoreError> {
        let actual = round_cents(actual);
        let taxable = round_cents(checked_mul(actual, rates.gross_up_factor, "taxable dividends")?);
        let tax_credit = round_cents(checked_mul(taxable, rates.credit_rate, "dividend tax credit")?);
        Ok(DividendBoxes {
            actual,
            gross_up: taxable - actual,
            taxable,
            tax_credit,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_zero()
    }
}

/// Statement of Investment Income for one shareholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct T5Slip {
    pub shareholder: String,
    pub period: String,
    pub payer: Option<Payer>,
    /// Boxes 24, 25 and 26
    pub eligible: DividendBoxes,
    /// Boxes 10, 11 and 12
    pub other_than_eligible: DividendBoxes,
    pub payment_count: usize,
}

#[derive(Default)]
struct PaidTotals {
    eligible: Decimal,
    non_eligible: Decimal,
    count: usize,
}

/// One slip per shareholder paid in `period`, ordered by shareholder.
pub fn generate_t5_slips(
    payments: &[DividendPayment],
    rates: &T5Rates,
    period: &FiscalPeriod,
    payer: Option<&Payer>,
) -> Result<Vec<T5Slip>, CoreError> {
    if let Some(bad) = payments.iter().find(|p| p.amount < Decimal::ZERO) {
        return Err(CoreError::InvalidDividendAmount {
            shareholder: bad.shareholder.clone(),
            amount: bad.amount,
        });
    }

    let mut paid: BTreeMap<&str, PaidTotals> = BTreeMap::new();
    for payment in payments.iter().filter(|p| period.contains(p.date)) {
        let totals = paid.entry(payment.shareholder.as_str()).or_default();
        let total = match payment.dividend_type {
            DividendType::Eligible => &mut totals.eligible,
            DividendType::NonEligible => &mut totals.non_eligible,
        };
        *total = checked_add(*total, payment.amount, "dividends paid")?;
        totals.count += 1;
    }

    let slips = paid
        .into_iter()
        .map(|(shareholder, totals)| {
            Ok(T5Slip {
                shareholder: shareholder.to_string(),
                period: period.label.clone(),
                payer: payer.cloned(),
                eligible: DividendBoxes::from_actual(totals.eligible, &rates.eligible)?,
                other_than_eligible: DividendBoxes::from_actual(
                    totals.non_eligible,
                    &rates.non_eligible,
                )?,
                payment_count: totals.count,
            })
        })
        .collect::<Result<Vec<T5Slip>, CoreError>>()?;

    log::info!("Generated {} T5 slips for {}", slips.len(), period);
    Ok(slips)
}

/// Split a declared dividend across shareholders by ownership.
pub fn declare_dividend(
    total: Decimal,
    date: NaiveDate,
    dividend_type: DividendType,
    ownership: &[SplitShare],
) -> Result<Vec<DividendPayment>, CoreError> {
    if total < Decimal::ZERO {
        return Err(CoreError::InvalidDividendAmount {
            shareholder: "all shareholders".to_string(),
            amount: total,
        });
    }
    Ok(allocate(total, ownership)?
        .shares
        .into_iter()
        .map(|share| DividendPayment {
            date,
            shareholder: share.beneficiary,
            amount: share.amount,
            dividend_type,
        })
        .collect())
}

/// A dividend paid to one shareholder.
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct DividendRow {
    /// Payment date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Shareholder receiving the dividend
    pub shareholder: String,
    /// Actual amount paid
    pub amount: String,
    /// `eligible` or `non-eligible` (default eligible)
    #[serde(rename = "type", default)]
    pub dividend_type: Option<String>,
}

pub fn read_dividends_csv<R: Read>(reader: R) -> anyhow::Result<Vec<DividendPayment>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut payments = Vec::new();
    for (i, row) in rdr.deserialize::<DividendRow>().enumerate() {
        let row = row.with_context(|| format!("dividend row {}", i + 1))?;
        let amount = parse_amount(&row.amount)
            .with_context(|| format!("dividend row {}: invalid amount '{}'", i + 1, row.amount))?
            .ok_or_else(|| anyhow::anyhow!("dividend row {}: missing amount", i + 1))?;
        let dividend_type = match row.dividend_type.as_deref().map(str::trim) {
            None | Some("") => DividendType::default(),
            Some(raw) => raw
                .parse::<DividendType>()
                .map_err(|e| anyhow::anyhow!("dividend row {}: {}", i + 1, e))?,
        };
        payments.push(DividendPayment {
            date: row.date,
            shareholder: row.shareholder,
            amount,
            dividend_type,
        });
    }
    Ok(payments)
}
