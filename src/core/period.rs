use super::error::CoreError;
use chrono::{Datelike, Days, Months, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Month and day on which the corporation's fiscal year ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct YearEnd {
    pub month: u32,
    pub day: u32,
}

impl Default for YearEnd {
    fn default() -> Self {
        YearEnd { month: 11, day: 30 }
    }
}

impl YearEnd {
    /// The year-end date falling in `year`. A February 29 year-end is clamped
    /// to February 28 in common years.
    pub fn in_year(&self, year: i32) -> Result<NaiveDate, CoreError> {
        let first = NaiveDate::from_ymd_opt(year, self.month, 1)
            .ok_or_else(|| CoreError::InvalidPeriod(format!("invalid year-end month {}", self.month)))?;
        let last_of_month = first
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| CoreError::InvalidPeriod(format!("year {year} out of range")))?;
        if self.day == 0 || self.day > 31 {
            return Err(CoreError::InvalidPeriod(format!(
                "invalid year-end day {}",
                self.day
            )));
        }
        Ok(NaiveDate::from_ymd_opt(year, self.month, self.day).unwrap_or(last_of_month))
    }
}

/// A one-year fiscal period, e.g. "2024-2025" running 2024-12-01 to 2025-11-30.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl FiscalPeriod {
    /// The fiscal year whose year-end falls in `year`.
    pub fn ending_in(year: i32, year_end: YearEnd) -> Result<Self, CoreError> {
        let end = year_end.in_year(year)?;
        let start = year_end
            .in_year(year - 1)?
            .succ_opt()
            .ok_or_else(|| CoreError::InvalidPeriod(format!("year {year} out of range")))?;
        Ok(FiscalPeriod {
            label: label_for(start, end),
            start,
            end,
        })
    }

    /// Parse a label such as "2024-2025" (or "2025" for a December year-end).
    pub fn from_label(label: &str, year_end: YearEnd) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidPeriod(format!("unrecognised fiscal year '{label}'"));
        let end_year: i32 = match label.trim().split_once('-') {
            Some((start, end)) => {
                let start: i32 = start.trim().parse().map_err(|_| invalid())?;
                let end: i32 = end.trim().parse().map_err(|_| invalid())?;
                if end != start + 1 {
                    return Err(invalid());
                }
                end
            }
            None => label.trim().parse().map_err(|_| invalid())?,
        };
        let period = Self::ending_in(end_year, year_end)?;
        if period.label != label.trim() {
            return Err(CoreError::InvalidPeriod(format!(
                "'{label}' does not match a fiscal year ending {}-{:02}",
                year_end.month, year_end.day
            )));
        }
        Ok(period)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Ensure `date` falls in this period.
    pub fn check(&self, date: NaiveDate) -> Result<(), CoreError> {
        if self.contains(date) {
            Ok(())
        } else {
            Err(CoreError::OutsidePeriod {
                date,
                period: self.label.clone(),
            })
        }
    }

    pub fn next(&self) -> Result<Self, CoreError> {
        let start = self
            .end
            .succ_opt()
            .ok_or_else(|| CoreError::InvalidPeriod("no following period".to_string()))?;
        let end = start
            .checked_add_months(Months::new(12))
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| CoreError::InvalidPeriod("no following period".to_string()))?;
        Ok(FiscalPeriod {
            label: label_for(start, end),
            start,
            end,
        })
    }

    /// CRA repayment deadline for shareholder advances made in this period:
    /// one year after the fiscal year-end.
    pub fn repayment_deadline(&self) -> NaiveDate {
        self.end
            .checked_add_months(Months::new(12))
            .unwrap_or(NaiveDate::MAX)
    }

    /// The whole period as a filing window.
    pub fn window(&self) -> FilingWindow {
        FilingWindow {
            label: format!("FY {}", self.label),
            start: self.start,
            end: self.end,
        }
    }

    /// A window from `from` to `to` inside this period; each bound defaults to
    /// the period's own.
    pub fn range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<FilingWindow, CoreError> {
        if from.is_none() && to.is_none() {
            return Ok(self.window());
        }
        let start = from.unwrap_or(self.start);
        let end = to.unwrap_or(self.end);
        self.check(start)?;
        self.check(end)?;
        if start > end {
            return Err(CoreError::InvalidPeriod(format!("{start} is after {end}")));
        }
        Ok(FilingWindow {
            label: format!("FY {} {start} to {end}", self.label),
            start,
            end,
        })
    }

    /// Quarterly GST/HST filing window, 1 to 4, counted from the period start.
    pub fn quarter(&self, quarter: u32) -> Result<FilingWindow, CoreError> {
        if !(1..=4).contains(&quarter) {
            return Err(CoreError::InvalidPeriod(format!(
                "quarter must be 1-4, got {quarter}"
            )));
        }
        let start = self
            .start
            .checked_add_months(Months::new(3 * (quarter - 1)))
            .ok_or_else(|| CoreError::InvalidPeriod("quarter out of range".to_string()))?;
        let end = start
            .checked_add_months(Months::new(3))
            .and_then(|d| d.checked_sub_days(Days::new(1)))
            .ok_or_else(|| CoreError::InvalidPeriod("quarter out of range".to_string()))?;
        Ok(FilingWindow {
            label: format!("FY {} Q{quarter}", self.label),
            start,
            end,
        })
    }
}

impl std::fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

fn label_for(start: NaiveDate, end: NaiveDate) -> String {
    if start.year() == end.year() {
        end.year().to_string()
    } else {
        format!("{}-{}", start.year(), end.year())
    }
}

/// Date range a GST/HST return covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingWindow {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FilingWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
