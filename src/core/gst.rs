use super::category::{ItcGroup, TaxTreatment};
use super::classifier::ClassifiedTransaction;
use super::error::CoreError;
use super::money::checked_add;
use super::period::FilingWindow;
use super::transaction::Flow;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetPosition {
    Owing,
    Refund,
    Nil,
}

/// Totals for one GST/HST return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GstFilingSummary {
    pub window: FilingWindow,
    /// GST/HST charged on taxable revenue (line 105)
    pub collected: Decimal,
    /// Input tax credits claimed (line 108)
    pub itc: Decimal,
    /// collected - itc; positive is owing
    pub net: Decimal,
    /// Taxable revenue net of GST/HST (line 101)
    pub taxable_revenue: Decimal,
    pub exempt_revenue: Decimal,
    pub itc_by_group: BTreeMap<ItcGroup, Decimal>,
    pub collected_from: Vec<String>,
    pub itc_from: Vec<String>,
    pub transaction_count: usize,
}

impl GstFilingSummary {
    pub fn position(&self) -> NetPosition {
        if self.net > Decimal::ZERO {
            NetPosition::Owing
        } else if self.net < Decimal::ZERO {
            NetPosition::Refund
        } else {
            NetPosition::Nil
        }
    }
}

/// Aggregate GST/HST for the transactions dated inside `window`.
///
/// Fails if any of them has no GST/HST portion; the error lists every such id.
/// Tax on money flowing the "wrong" way (a refund from a supplier, a refund
/// paid to a customer) is subtracted from its total.
pub fn summarize_gst(
    classified: &[ClassifiedTransaction],
    window: &FilingWindow,
) -> Result<GstFilingSummary, CoreError> {
    let in_window: Vec<&ClassifiedTransaction> = classified
        .iter()
        .filter(|c| window.contains(c.record.date))
        .collect();

    let missing: Vec<String> = in_window
        .iter()
        .filter(|c| c.gst.is_none())
        .map(|c| c.id().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::PeriodIncomplete {
            period: window.label.clone(),
            missing,
        });
    }

    let mut summary = GstFilingSummary {
        window: window.clone(),
        collected: Decimal::ZERO,
        itc: Decimal::ZERO,
        net: Decimal::ZERO,
        taxable_revenue: Decimal::ZERO,
        exempt_revenue: Decimal::ZERO,
        itc_by_group: BTreeMap::new(),
        collected_from: Vec::new(),
        itc_from: Vec::new(),
        transaction_count: in_window.len(),
    };

    for c in in_window {
        let gst = c.gst_amount();
        let signed = |value: Decimal, positive: Flow| {
            if c.record.flow() == positive {
                value
            } else {
                -value
            }
        };

        match c.treatment {
            TaxTreatment::Collected => {
                summary.collected =
                    checked_add(summary.collected, signed(gst, Flow::In), "GST/HST collected")?;
                summary.taxable_revenue = checked_add(
                    summary.taxable_revenue,
                    signed(c.record.gross() - gst, Flow::In),
                    "taxable revenue",
                )?;
                summary.collected_from.push(c.id().to_string());
            }
            TaxTreatment::InputTaxCredit => {
                let itc = signed(gst, Flow::Out);
                summary.itc = checked_add(summary.itc, itc, "input tax credits")?;
                if let Some(group) = c.itc_group() {
                    let total = summary.itc_by_group.entry(group).or_default();
                    *total = checked_add(*total, itc, "input tax credits")?;
                }
                summary.itc_from.push(c.id().to_string());
            }
            TaxTreatment::Exempt => {
                if c.category.is_exempt_revenue() && c.record.flow() == Flow::In {
                    summary.exempt_revenue =
                        checked_add(summary.exempt_revenue, c.record.gross(), "exempt revenue")?;
                }
            }
            TaxTreatment::Undetermined => {}
        }
    }
    summary.net = summary
        .collected
        .checked_sub(summary.itc)
        .ok_or_else(|| CoreError::AmountOverflow("net tax".to_string()))?;

    log::info!(
        "GST/HST {}: collected {}, ITC {}, net {}",
        window.label,
        summary.collected,
        summary.itc,
        summary.net
    );
    Ok(summary)
}
