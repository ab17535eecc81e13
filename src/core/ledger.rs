use super::allocation::{allocate, SplitShare};
use super::category::LoanEffect;
use super::classifier::ClassifiedTransaction;
use super::error::CoreError;
use super::money::{checked_add, parse_amount};
use super::period::FiscalPeriod;
use super::transaction::Flow;
use anyhow::Context;
use chrono::{Months, NaiveDate};
use rigbooks_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanDirection {
    /// Corporation money paid to or for the shareholder
    Advance,
    /// Shareholder money paid back into the corporation
    Repayment,
}

impl LoanDirection {
    /// Effect on the balance owed by the shareholder.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            LoanDirection::Advance => amount,
            LoanDirection::Repayment => -amount,
        }
    }
}

impl From<LoanEffect> for LoanDirection {
    fn from(effect: LoanEffect) -> Self {
        match effect {
            LoanEffect::Advance => LoanDirection::Advance,
            LoanEffect::Repayment => LoanDirection::Repayment,
        }
    }
}

impl std::fmt::Display for LoanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanDirection::Advance => write!(f, "advance"),
            LoanDirection::Repayment => write!(f, "repayment"),
        }
    }
}

/// A movement to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanPosting {
    pub date: NaiveDate,
    pub shareholder: String,
    pub direction: LoanDirection,
    pub amount: Decimal,
    pub description: String,
    /// Transaction the posting was derived from
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub seq: usize,
    pub date: NaiveDate,
    pub shareholder: String,
    pub direction: LoanDirection,
    pub amount: Decimal,
    pub description: String,
    pub source_id: Option<String>,
    /// Shareholder's balance after this entry; positive means owed to the corporation
    pub balance_after: Decimal,
}

/// Advance not repaid by its CRA deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineViolation {
    pub shareholder: String,
    /// Date of the advance; the day before the period for an opening balance
    pub advanced_on: NaiveDate,
    pub deadline: NaiveDate,
    pub original: Decimal,
    pub outstanding: Decimal,
    /// Ledger sequence number, `None` for an opening balance
    pub seq: Option<usize>,
}

/// Append-only shareholder loan account for one fiscal period.
#[derive(Debug, Clone, Serialize)]
pub struct ShareholderLoanLedger {
    pub period: FiscalPeriod,
    pub opening: BTreeMap<String, Decimal>,
    entries: Vec<LedgerEntry>,
}

impl ShareholderLoanLedger {
    pub fn new(period: FiscalPeriod, opening: BTreeMap<String, Decimal>) -> Self {
        ShareholderLoanLedger {
            period,
            opening,
            entries: Vec::new(),
        }
    }

    /// Ledger for the following period, opening at this one's closing balances.
    pub fn continue_from(previous: &ShareholderLoanLedger) -> Result<Self, CoreError> {
        Ok(Self::new(previous.period.next()?, previous.closing_balances()))
    }

    /// Build a ledger from unordered postings; same-day postings keep their order.
    pub fn from_postings(
        period: FiscalPeriod,
        opening: BTreeMap<String, Decimal>,
        mut postings: Vec<LoanPosting>,
    ) -> Result<Self, CoreError> {
        postings.sort_by_key(|p| p.date);
        let mut ledger = Self::new(period, opening);
        for posting in postings {
            ledger.append(posting)?;
        }
        Ok(ledger)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn append(&mut self, posting: LoanPosting) -> Result<&LedgerEntry, CoreError> {
        if posting.amount <= Decimal::ZERO {
            return Err(CoreError::InvalidLedgerAmount(posting.amount));
        }
        self.period.check(posting.date)?;
        if let Some(last) = self.entries.last() {
            if posting.date < last.date {
                return Err(CoreError::LedgerOutOfOrder {
                    date: posting.date,
                    last: last.date,
                });
            }
        }

        let balance_after = checked_add(
            self.balance(&posting.shareholder),
            posting.direction.signed(posting.amount),
            "loan balance",
        )?;
        log::debug!(
            "Loan {} {} {} -> balance {}",
            posting.shareholder,
            posting.direction,
            posting.amount,
            balance_after
        );
        self.entries.push(LedgerEntry {
            seq: self.entries.len() + 1,
            date: posting.date,
            shareholder: posting.shareholder,
            direction: posting.direction,
            amount: posting.amount,
            description: posting.description,
            source_id: posting.source_id,
            balance_after,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn opening_balance(&self, shareholder: &str) -> Decimal {
        self.opening.get(shareholder).copied().unwrap_or_default()
    }

    /// Current balance for `shareholder`.
    pub fn balance(&self, shareholder: &str) -> Decimal {
        self.entries
            .iter()
            .rev()
            .find(|e| e.shareholder == shareholder)
            .map(|e| e.balance_after)
            .unwrap_or_else(|| self.opening_balance(shareholder))
    }

    /// Balance at the end of `date`, replayed from the opening balance.
    pub fn balance_as_of(&self, shareholder: &str, date: NaiveDate) -> Result<Decimal, CoreError> {
        replay(
            self.opening_balance(shareholder),
            self.entries
                .iter()
                .filter(|e| e.shareholder == shareholder && e.date <= date),
        )
    }

    pub fn shareholders(&self) -> BTreeSet<String> {
        self.opening
            .keys()
            .cloned()
            .chain(self.entries.iter().map(|e| e.shareholder.clone()))
            .collect()
    }

    /// Closing balances; these are the next period's opening balances.
    pub fn closing_balances(&self) -> BTreeMap<String, Decimal> {
        self.shareholders()
            .into_iter()
            .map(|s| {
                let balance = self.balance(&s);
                (s, balance)
            })
            .collect()
    }

    /// Advances still outstanding after their repayment deadline, as of `as_of`.
    ///
    /// The opening balance counts as an advance made in the prior year.
    /// Repayments settle the oldest advances first.
    pub fn pending_deadline_violations(&self, as_of: NaiveDate) -> Vec<DeadlineViolation> {
        let prior_year_end = self.period.start.pred_opt().unwrap_or(self.period.start);
        let prior_deadline = prior_year_end
            .checked_add_months(Months::new(12))
            .unwrap_or(NaiveDate::MAX);
        let deadline = self.period.repayment_deadline();

        let mut violations = Vec::new();
        for shareholder in self.shareholders() {
            let mut outstanding: VecDeque<DeadlineViolation> = VecDeque::new();
            let mut credit = Decimal::ZERO;

            let opening = self.opening_balance(&shareholder);
            if opening > Decimal::ZERO {
                outstanding.push_back(DeadlineViolation {
                    shareholder: shareholder.clone(),
                    advanced_on: prior_year_end,
                    deadline: prior_deadline,
                    original: opening,
                    outstanding: opening,
                    seq: None,
                });
            } else {
                credit = -opening;
            }

            let entries = self
                .entries
                .iter()
                .filter(|e| e.shareholder == shareholder && e.date <= as_of);
            for entry in entries {
                match entry.direction {
                    LoanDirection::Advance => outstanding.push_back(DeadlineViolation {
                        shareholder: shareholder.clone(),
                        advanced_on: entry.date,
                        deadline,
                        original: entry.amount,
                        outstanding: entry.amount,
                        seq: Some(entry.seq),
                    }),
                    LoanDirection::Repayment => credit += entry.amount,
                }
                settle(&mut outstanding, &mut credit);
            }

            violations.extend(
                outstanding
                    .into_iter()
                    .filter(|advance| as_of > advance.deadline),
            );
        }

        for v in &violations {
            log::warn!(
                "{} owes {} from {} past deadline {}",
                v.shareholder,
                v.outstanding,
                v.advanced_on,
                v.deadline
            );
        }
        violations
    }
}

fn settle(outstanding: &mut VecDeque<DeadlineViolation>, credit: &mut Decimal) {
    while *credit > Decimal::ZERO {
        let Some(oldest) = outstanding.front_mut() else {
            break;
        };
        if *credit >= oldest.outstanding {
            *credit -= oldest.outstanding;
            outstanding.pop_front();
        } else {
            oldest.outstanding -= *credit;
            *credit = Decimal::ZERO;
        }
    }
}

/// Replay entries on top of an opening balance.
pub fn replay<'a>(
    opening: Decimal,
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> Result<Decimal, CoreError> {
    entries.into_iter().try_fold(opening, |balance, e| {
        checked_add(balance, e.direction.signed(e.amount), "loan balance")
    })
}

/// Loan movements implied by classified transactions on loan-account
/// categories. Money out of the corporation is an advance and money in is a
/// repayment, so a reversed draw repays it. Without a named shareholder the
/// amount is split by ownership.
pub fn postings_from_classified(
    classified: &[ClassifiedTransaction],
    splits: &[SplitShare],
) -> Result<Vec<LoanPosting>, CoreError> {
    let mut postings = Vec::new();
    for c in classified {
        let Some(effect) = c.category.loan_effect() else {
            continue;
        };
        let direction = match c.record.flow() {
            Flow::Out => LoanDirection::Advance,
            Flow::In => LoanDirection::Repayment,
        };
        if direction != LoanDirection::from(effect) {
            log::info!("{} reverses a {} ({})", c.id(), c.category, direction);
        }
        let amount = c.record.gross();
        let shares = match &c.shareholder {
            Some(name) => vec![(name.clone(), amount)],
            None => allocate(amount, splits)?
                .shares
                .into_iter()
                .map(|s| (s.beneficiary, s.amount))
                .collect(),
        };
        for (shareholder, amount) in shares {
            if amount.is_zero() {
                continue;
            }
            postings.push(LoanPosting {
                date: c.record.date,
                shareholder,
                direction,
                amount,
                description: c.record.description.clone(),
                source_id: Some(c.id().to_string()),
            });
        }
    }
    Ok(postings)
}

/// A manual ledger row, e.g. a repayment made from a personal account.
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct LedgerRow {
    /// Date of the movement (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Shareholder name as used in splitAllocations
    pub shareholder: String,
    /// `advance` or `repayment`
    pub direction: LoanDirection,
    /// Positive amount
    pub amount: String,
    /// Free-form note
    #[serde(default)]
    pub description: String,
}

pub fn read_ledger_csv<R: Read>(reader: R) -> anyhow::Result<Vec<LoanPosting>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut postings = Vec::new();
    for (i, row) in rdr.deserialize::<LedgerRow>().enumerate() {
        let row = row.with_context(|| format!("ledger row {}", i + 1))?;
        let amount = parse_amount(&row.amount)
            .with_context(|| format!("ledger row {}: invalid amount '{}'", i + 1, row.amount))?
            .ok_or_else(|| anyhow::anyhow!("ledger row {}: missing amount", i + 1))?;
        postings.push(LoanPosting {
            date: row.date,
            shareholder: row.shareholder,
            direction: row.direction,
            amount,
            description: row.description,
            source_id: None,
        });
    }
    Ok(postings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::Category;
    use crate::core::classifier::Classifier;
    use crate::core::config::RuleSetConfig;
    use crate::core::transaction::{Source, TransactionRecord};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period() -> FiscalPeriod {
        FiscalPeriod::from_label("2024-2025", Default::default()).unwrap()
    }

    fn posting(d: NaiveDate, who: &str, direction: LoanDirection, amount: Decimal) -> LoanPosting {
        LoanPosting {
            date: d,
            shareholder: who.to_string(),
            direction,
            amount,
            description: String::new(),
            source_id: None,
        }
    }

    fn opening(entries: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn running_balances() {
        let mut ledger = ShareholderLoanLedger::new(period(), opening(&[("Greg", dec!(100))]));
        ledger
            .append(posting(date(2025, 1, 5), "Greg", LoanDirection::Advance, dec!(250)))
            .unwrap();
        let entry = ledger
            .append(posting(date(2025, 2, 5), "Greg", LoanDirection::Repayment, dec!(400)))
            .unwrap();
        assert_eq!(entry.balance_after, dec!(-50));
        assert_eq!(entry.seq, 2);
        assert_eq!(ledger.balance("Greg"), dec!(-50));
        assert_eq!(ledger.balance_as_of("Greg", date(2025, 1, 31)).unwrap(), dec!(350));
        assert_eq!(ledger.balance_as_of("Greg", date(2024, 12, 1)).unwrap(), dec!(100));
        assert_eq!(ledger.balance("Lilibeth"), Decimal::ZERO);
    }

    #[test]
    fn append_rejects_bad_entries() {
        let mut ledger = ShareholderLoanLedger::new(period(), BTreeMap::new());
        ledger
            .append(posting(date(2025, 3, 1), "Greg", LoanDirection::Advance, dec!(10)))
            .unwrap();
        assert_eq!(
            ledger
                .append(posting(date(2025, 2, 1), "Lilibeth", LoanDirection::Advance, dec!(10)))
                .unwrap_err(),
            CoreError::LedgerOutOfOrder {
                date: date(2025, 2, 1),
                last: date(2025, 3, 1)
            }
        );
        assert_eq!(
            ledger
                .append(posting(date(2025, 3, 2), "Greg", LoanDirection::Advance, dec!(0)))
                .unwrap_err(),
            CoreError::InvalidLedgerAmount(dec!(0))
        );
        assert!(matches!(
            ledger.append(posting(date(2025, 12, 1), "Greg", LoanDirection::Advance, dec!(5))),
            Err(CoreError::OutsidePeriod { .. })
        ));
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn replay_is_associative() {
        let ledger = ShareholderLoanLedger::from_postings(
            period(),
            opening(&[("Greg", dec!(75.25))]),
            vec![
                posting(date(2025, 1, 1), "Greg", LoanDirection::Advance, dec!(120.10)),
                posting(date(2025, 2, 1), "Greg", LoanDirection::Repayment, dec!(300)),
                posting(date(2025, 3, 1), "Greg", LoanDirection::Advance, dec!(42.42)),
            ],
        )
        .unwrap();
        let entries = ledger.entries();
        let all = replay(dec!(75.25), entries).unwrap();
        let after_first = replay(dec!(75.25), &entries[..1]).unwrap();
        assert_eq!(replay(after_first, &entries[1..]).unwrap(), all);
        assert_eq!(all, ledger.balance("Greg"));
    }

    #[test]
    fn postings_sorted_stably() {
        let ledger = ShareholderLoanLedger::from_postings(
            period(),
            BTreeMap::new(),
            vec![
                posting(date(2025, 3, 1), "Greg", LoanDirection::Advance, dec!(3)),
                posting(date(2025, 1, 1), "Greg", LoanDirection::Advance, dec!(1)),
                posting(date(2025, 3, 1), "Greg", LoanDirection::Repayment, dec!(2)),
            ],
        )
        .unwrap();
        let amounts: Vec<Decimal> = ledger.entries().iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![dec!(1), dec!(3), dec!(2)]);
    }

    #[test]
    fn closing_balances_open_next_period() {
        let ledger = ShareholderLoanLedger::from_postings(
            period(),
            opening(&[("Lilibeth", dec!(-20))]),
            vec![posting(date(2025, 5, 1), "Greg", LoanDirection::Advance, dec!(500))],
        )
        .unwrap();
        let next = ShareholderLoanLedger::continue_from(&ledger).unwrap();
        assert_eq!(next.period.label, "2025-2026");
        assert_eq!(next.opening_balance("Greg"), dec!(500));
        assert_eq!(next.opening_balance("Lilibeth"), dec!(-20));
    }

    #[test]
    fn unpaid_advance_violates_deadline() {
        let ledger = ShareholderLoanLedger::from_postings(
            period(),
            BTreeMap::new(),
            vec![posting(date(2025, 1, 15), "Greg", LoanDirection::Advance, dec!(1000))],
        )
        .unwrap();
        // deadline is 2026-11-30
        assert!(ledger.pending_deadline_violations(date(2026, 11, 30)).is_empty());
        let violations = ledger.pending_deadline_violations(date(2026, 12, 1));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].deadline, date(2026, 11, 30));
        assert_eq!(violations[0].outstanding, dec!(1000));
        assert_eq!(violations[0].seq, Some(1));
    }

    #[test]
    fn repayments_settle_oldest_first() {
        let ledger = ShareholderLoanLedger::from_postings(
            period(),
            opening(&[("Greg", dec!(300))]),
            vec![
                posting(date(2025, 1, 15), "Greg", LoanDirection::Advance, dec!(200)),
                posting(date(2025, 6, 1), "Greg", LoanDirection::Repayment, dec!(250)),
            ],
        )
        .unwrap();
        // Opening balance is due at the end of this period
        let violations = ledger.pending_deadline_violations(date(2025, 12, 1));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].seq, None);
        assert_eq!(violations[0].advanced_on, date(2024, 11, 30));
        assert_eq!(violations[0].outstanding, dec!(50));

        let later = ledger.pending_deadline_violations(date(2026, 12, 1));
        assert_eq!(later.len(), 2);
        assert_eq!(later[1].outstanding, dec!(200));
    }

    #[test]
    fn repaid_advance_is_not_a_violation() {
        let ledger = ShareholderLoanLedger::from_postings(
            period(),
            opening(&[("Greg", dec!(-100))]),
            vec![
                posting(date(2025, 1, 15), "Greg", LoanDirection::Advance, dec!(300)),
                posting(date(2025, 2, 15), "Greg", LoanDirection::Repayment, dec!(200)),
            ],
        )
        .unwrap();
        assert!(ledger.pending_deadline_violations(date(2027, 1, 1)).is_empty());
    }

    #[test]
    fn draws_and_contributions_become_postings() {
        let classifier = Classifier::new(&RuleSetConfig::default()).unwrap();
        let record = |id: &str, desc: &str, amount: Decimal| TransactionRecord {
            id: id.to_string(),
            date: date(2025, 2, 1),
            description: desc.to_string(),
            amount,
            source: Source::Bank,
            category_hint: None,
        };
        let classified: Vec<_> = [
            record("bank-0001", "ATM WITHDRAWAL", dec!(-100.01)),
            record("bank-0002", "SHELL C0001", dec!(-50)),
            record("bank-0003", "SHAREHOLDER DEPOSIT GREG", dec!(500)),
        ]
        .iter()
        .map(|r| classifier.classify(r).unwrap())
        .collect();

        let splits = RuleSetConfig::default().split_allocations;
        let postings = postings_from_classified(&classified, &splits).unwrap();
        assert_eq!(postings.len(), 4);
        assert_eq!(postings[0].shareholder, "Greg");
        assert_eq!(postings[0].amount, dec!(51.01));
        assert_eq!(postings[1].shareholder, "Lilibeth");
        assert_eq!(postings[1].amount, dec!(49.00));
        assert_eq!(postings[2].direction, LoanDirection::Repayment);
        assert_eq!(postings[2].source_id.as_deref(), Some("bank-0003"));
    }

    #[test]
    fn reversed_personal_expense_is_a_repayment() {
        let classifier = Classifier::new(&RuleSetConfig::default()).unwrap();
        let record = |id: &str, amount: Decimal| TransactionRecord {
            id: id.to_string(),
            date: date(2025, 2, 1),
            description: "LIQUOR DEPOT #4".to_string(),
            amount,
            source: Source::Bank,
            category_hint: None,
        };
        let classified: Vec<_> = [record("bank-0001", dec!(-40)), record("bank-0002", dec!(40))]
            .iter()
            .map(|r| classifier.classify(r).unwrap())
            .collect();
        assert!(classified.iter().all(|c| c.category == Category::ShareholderPersonal));

        let splits = RuleSetConfig::default().split_allocations;
        let postings = postings_from_classified(&classified, &splits).unwrap();
        let directions: Vec<LoanDirection> = postings.iter().map(|p| p.direction).collect();
        assert_eq!(
            directions,
            vec![
                LoanDirection::Advance,
                LoanDirection::Advance,
                LoanDirection::Repayment,
                LoanDirection::Repayment,
            ]
        );

        let ledger = ShareholderLoanLedger::from_postings(period(), BTreeMap::new(), postings).unwrap();
        assert_eq!(ledger.balance("Greg"), Decimal::ZERO);
        assert_eq!(ledger.balance("Lilibeth"), Decimal::ZERO);
    }

    #[test]
    fn overflowing_balance_is_rejected() {
        let mut ledger = ShareholderLoanLedger::new(period(), opening(&[("Greg", Decimal::MAX)]));
        assert_eq!(
            ledger.append(posting(date(2025, 1, 5), "Greg", LoanDirection::Advance, dec!(1))),
            Err(CoreError::AmountOverflow("loan balance".to_string()))
        );
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn reads_manual_ledger_csv() {
        let data = "date,shareholder,direction,amount,description\n\
                    2025-03-01,Greg,repayment,\"1,000.00\",From personal chequing\n\
                    2025-03-02,Lilibeth,advance,25.00,\n";
        let postings = read_ledger_csv(data.as_bytes()).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].amount, dec!(1000.00));
        assert_eq!(postings[1].direction, LoanDirection::Advance);

        let bad = "date,shareholder,direction,amount,description\n2025-03-01,Greg,gift,1,\n";
        assert!(read_ledger_csv(bad.as_bytes()).is_err());
    }
}
