use super::category::{Category, TaxTreatment};
use super::classifier::ClassifiedTransaction;
use super::error::CoreError;
use super::money::checked_add;
use super::period::FilingWindow;
use super::transaction::Flow;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Book expense for one category, net of the ITCs claimed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLine {
    pub category: Category,
    pub amount: Decimal,
    pub deductible: Decimal,
    pub count: usize,
}

/// Revenue, operating expenses and net income for a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub window: FilingWindow,
    /// Revenue net of GST/HST collected
    pub revenue: Decimal,
    /// Interest and dividends received
    pub other_income: Decimal,
    pub expenses: Vec<ExpenseLine>,
    pub total_expenses: Decimal,
    pub total_deductible: Decimal,
    pub net_income: Decimal,
    /// Uncategorized transactions left out of every total
    pub excluded: Vec<String>,
}

/// Build the income statement for transactions dated inside `window`.
///
/// Shareholder, loan, capital and tax movements are not income or expense
/// and are skipped. Refunds reduce their category.
pub fn income_statement(
    classified: &[ClassifiedTransaction],
    window: &FilingWindow,
) -> Result<IncomeStatement, CoreError> {
    let mut revenue = Decimal::ZERO;
    let mut other_income = Decimal::ZERO;
    let mut by_category: BTreeMap<Category, ExpenseLine> = BTreeMap::new();
    let mut excluded = Vec::new();

    for c in classified.iter().filter(|c| window.contains(c.record.date)) {
        let sign = match c.record.flow() {
            Flow::In => Decimal::ONE,
            Flow::Out => Decimal::NEGATIVE_ONE,
        };
        let net_of_tax = c.record.gross() - c.gst_amount();

        match c.category {
            Category::Uncategorized => excluded.push(c.id().to_string()),
            Category::Revenue => {
                revenue = checked_add(revenue, sign * net_of_tax, "revenue")?;
            }
            Category::InvestmentIncome => {
                other_income = checked_add(other_income, c.record.amount, "other income")?;
            }
            category if category.is_expense() => {
                let cost = match c.treatment {
                    TaxTreatment::InputTaxCredit => net_of_tax,
                    _ => c.record.gross(),
                };
                let line = by_category.entry(category).or_insert(ExpenseLine {
                    category,
                    amount: Decimal::ZERO,
                    deductible: Decimal::ZERO,
                    count: 0,
                });
                line.amount = checked_add(line.amount, -sign * cost, "expenses")?;
                line.deductible = checked_add(line.deductible, c.deductible, "deductible expenses")?;
                line.count += 1;
            }
            _ => {}
        }
    }

    let expenses: Vec<ExpenseLine> = by_category.into_values().collect();
    let mut total_expenses = Decimal::ZERO;
    let mut total_deductible = Decimal::ZERO;
    for line in &expenses {
        total_expenses = checked_add(total_expenses, line.amount, "expenses")?;
        total_deductible = checked_add(total_deductible, line.deductible, "deductible expenses")?;
    }
    let income = checked_add(revenue, other_income, "income")?;
    let net_income = checked_add(income, -total_expenses, "net income")?;

    if !excluded.is_empty() {
        log::warn!(
            "{} uncategorized transaction(s) left out of the income statement",
            excluded.len()
        );
    }
    log::info!(
        "Income statement {}: revenue {}, expenses {}, net {}",
        window.label,
        revenue,
        total_expenses,
        net_income
    );

    Ok(IncomeStatement {
        window: window.clone(),
        revenue,
        other_income,
        expenses,
        total_expenses,
        total_deductible,
        net_income,
        excluded,
    })
}
