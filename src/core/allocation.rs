use super::error::CoreError;
use super::money::{checked_mul, floor_cents};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One beneficiary's percentage of a shared amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SplitShare {
    pub beneficiary: String,
    #[schemars(with = "f64")]
    pub percentage: Decimal,
}

impl SplitShare {
    pub fn new(beneficiary: &str, percentage: Decimal) -> Self {
        SplitShare {
            beneficiary: beneficiary.to_string(),
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedShare {
    pub beneficiary: String,
    pub amount: Decimal,
}

/// Amount split across beneficiaries; shares always sum to `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub total: Decimal,
    pub shares: Vec<AllocatedShare>,
}

#[cfg(test)]
impl Allocation {
    pub fn share_of(&self, beneficiary: &str) -> Option<Decimal> {
        self.shares
            .iter()
            .find(|s| s.beneficiary == beneficiary)
            .map(|s| s.amount)
    }
}

/// Check a split definition: non-empty, unique beneficiaries, non-negative
/// percentages totalling exactly 100.
pub fn validate_splits(splits: &[SplitShare]) -> Result<(), CoreError> {
    if splits.is_empty() {
        return Err(CoreError::InvalidSplit("no beneficiaries".to_string()));
    }
    let mut seen = HashSet::new();
    for split in splits {
        if split.beneficiary.trim().is_empty() {
            return Err(CoreError::InvalidSplit("empty beneficiary name".to_string()));
        }
        if !seen.insert(split.beneficiary.as_str()) {
            return Err(CoreError::InvalidSplit(format!(
                "duplicate beneficiary {}",
                split.beneficiary
            )));
        }
        if split.percentage < Decimal::ZERO {
            return Err(CoreError::InvalidSplit(format!(
                "negative percentage for {}",
                split.beneficiary
            )));
        }
    }
    let total: Decimal = splits.iter().map(|s| s.percentage).sum();
    if total != dec!(100) {
        return Err(CoreError::InvalidSplit(format!(
            "percentages total {total}, expected 100"
        )));
    }
    Ok(())
}

/// Split `amount` by percentage.
///
/// Every beneficiary after the first receives its share truncated to the
/// cent; the first-listed beneficiary receives the remainder, so the shares
/// reconcile to `amount` exactly.
pub fn allocate(amount: Decimal, splits: &[SplitShare]) -> Result<Allocation, CoreError> {
    validate_splits(splits)?;

    let rest = splits[1..]
        .iter()
        .map(|s| {
            Ok(AllocatedShare {
                beneficiary: s.beneficiary.clone(),
                amount: floor_cents(checked_mul(amount, s.percentage / dec!(100), "split share")?),
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;
    let rest_total: Decimal = rest.iter().map(|s| s.amount).sum();

    let mut shares = Vec::with_capacity(splits.len());
    shares.push(AllocatedShare {
        beneficiary: splits[0].beneficiary.clone(),
        amount: amount - rest_total,
    });
    shares.extend(rest);

    let allocated: Decimal = shares.iter().map(|s| s.amount).sum();
    if allocated != amount {
        log::error!("Allocation of {} reconciled to {}", amount, allocated);
        return Err(CoreError::AllocationMismatch {
            expected: amount,
            allocated,
        });
    }

    Ok(Allocation {
        total: amount,
        shares,
    })
}
