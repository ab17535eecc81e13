use super::category::Category;
use super::config::RuleConfig;
use super::error::CoreError;
use super::transaction::{Flow, Source, TransactionRecord};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const CATCH_ALL_RULE: &str = "uncategorized";

/// A compiled classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pattern: Option<Regex>,
    hint: Option<String>,
    flow: Option<Flow>,
    source: Option<Source>,
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
    pub category: Category,
    pub itc_fraction: Decimal,
    pub deductible_fraction: Decimal,
    pub shareholder: Option<String>,
    pub split: bool,
    pub needs_review: bool,
}

impl Rule {
    pub fn compile(config: &RuleConfig) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::InvalidRule {
            rule: config.name.clone(),
            reason,
        };

        let pattern = config
            .pattern
            .as_deref()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| invalid(e.to_string()))
            })
            .transpose()?;

        if let (Some(min), Some(max)) = (config.min_amount, config.max_amount) {
            if min >= max {
                return Err(invalid(format!("minAmount {min} must be below maxAmount {max}")));
            }
        }

        let fraction = |percent: Option<Decimal>, default: Decimal, field: &str| match percent {
            None => Ok(default),
            Some(p) if p < Decimal::ZERO || p > dec!(100) => {
                Err(invalid(format!("{field} must be between 0 and 100, got {p}")))
            }
            Some(p) => Ok(p / dec!(100)),
        };

        Ok(Rule {
            name: config.name.clone(),
            pattern,
            hint: config.hint.as_ref().map(|h| h.trim().to_lowercase()),
            flow: config.flow,
            source: config.source,
            min_amount: config.min_amount,
            max_amount: config.max_amount,
            category: config.category,
            itc_fraction: fraction(config.itc_percent, config.category.itc_fraction(), "itcPercent")?,
            deductible_fraction: fraction(
                config.deductible_percent,
                config.category.deductible_fraction(),
                "deductiblePercent",
            )?,
            shareholder: config.shareholder.clone(),
            split: config.split,
            needs_review: config.needs_review,
        })
    }

    /// The tail rule: matches everything, deducts nothing.
    pub fn catch_all() -> Self {
        Rule {
            name: CATCH_ALL_RULE.to_string(),
            pattern: None,
            hint: None,
            flow: None,
            source: None,
            min_amount: None,
            max_amount: None,
            category: Category::Uncategorized,
            itc_fraction: Decimal::ZERO,
            deductible_fraction: Decimal::ZERO,
            shareholder: None,
            split: false,
            needs_review: true,
        }
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(flow) = self.flow {
            if record.flow() != flow {
                return false;
            }
        }
        if let Some(source) = self.source {
            if record.source != source {
                return false;
            }
        }
        let gross = record.gross();
        if self.min_amount.is_some_and(|min| gross < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| gross >= max) {
            return false;
        }
        if let Some(hint) = &self.hint {
            let matches_hint = record
                .category_hint
                .as_deref()
                .is_some_and(|h| h.trim().eq_ignore_ascii_case(hint));
            if !matches_hint {
                return false;
            }
        }
        match &self.pattern {
            Some(pattern) => pattern.is_match(&record.description),
            None => true,
        }
    }
}

/// Ordered rules, evaluated first-match-wins, with the catch-all always last.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    catch_all: Rule,
}

impl RuleSet {
    pub fn compile(configs: &[RuleConfig]) -> Result<Self, CoreError> {
        let rules = configs
            .iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet {
            rules,
            catch_all: Rule::catch_all(),
        })
    }

    pub fn first_match(&self, record: &TransactionRecord) -> &Rule {
        self.rules
            .iter()
            .find(|rule| rule.matches(record))
            .unwrap_or(&self.catch_all)
    }

    /// Number of rules, catch-all included.
    pub fn len(&self) -> usize {
        self.rules.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::default_rules;
    use chrono::NaiveDate;

    fn record(desc: &str, amount: Decimal, source: Source) -> TransactionRecord {
        TransactionRecord {
            id: "t".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            description: desc.to_string(),
            amount,
            source,
            category_hint: None,
        }
    }

    #[test]
    fn first_match_wins() {
        let rules = RuleSet::compile(&[
            RuleConfig::new("specific", Category::Capital).pattern("PRINCESS AUTO TRAILER"),
            RuleConfig::new("general", Category::EquipmentSupplies).pattern("PRINCESS AUTO"),
        ])
        .unwrap();
        let trailer = record("PRINCESS AUTO TRAILER #2", dec!(-2400), Source::Bank);
        let tools = record("PRINCESS AUTO #44", dec!(-80), Source::Bank);
        assert_eq!(rules.first_match(&trailer).name, "specific");
        assert_eq!(rules.first_match(&tools).name, "general");
    }

    #[test]
    fn order_is_the_priority() {
        let rules = RuleSet::compile(&[
            RuleConfig::new("general", Category::EquipmentSupplies).pattern("PRINCESS AUTO"),
            RuleConfig::new("specific", Category::Capital).pattern("PRINCESS AUTO TRAILER"),
        ])
        .unwrap();
        let trailer = record("PRINCESS AUTO TRAILER #2", dec!(-2400), Source::Bank);
        assert_eq!(rules.first_match(&trailer).name, "general");
    }

    #[test]
    fn catch_all_is_last() {
        let rules = RuleSet::compile(&default_rules()).unwrap();
        let unknown = record("ZZZ UNKNOWN VENDOR", dec!(-10), Source::Bank);
        let rule = rules.first_match(&unknown);
        assert_eq!(rule.name, CATCH_ALL_RULE);
        assert_eq!(rule.category, Category::Uncategorized);
        assert_eq!(rules.len(), default_rules().len() + 1);
    }

    #[test]
    fn predicates_combine() {
        let rule = Rule::compile(
            &RuleConfig::new("big-cash", Category::Capital)
                .pattern("saw")
                .source(Source::Cash)
                .flow(Flow::Out)
                .min_amount(dec!(500)),
        )
        .unwrap();
        assert!(rule.matches(&record("CHAIN SAW", dec!(-650), Source::Cash)));
        assert!(!rule.matches(&record("CHAIN SAW", dec!(-650), Source::Bank)));
        assert!(!rule.matches(&record("CHAIN SAW", dec!(-65), Source::Cash)));
        assert!(!rule.matches(&record("CHAIN SAW", dec!(650), Source::Cash)));
    }

    #[test]
    fn hint_matches_case_insensitively() {
        let rule = Rule::compile(&RuleConfig::new("cash-meals", Category::Meals).hint("Meals")).unwrap();
        let mut lunch = record("Lunch with client", dec!(-40), Source::Cash);
        assert!(!rule.matches(&lunch));
        lunch.category_hint = Some("MEALS".to_string());
        assert!(rule.matches(&lunch));
    }

    #[test]
    fn percent_overrides_become_fractions() {
        let mut config = RuleConfig::new("phone", Category::Phone).pattern("TELUS");
        config.deductible_percent = Some(dec!(80));
        let rule = Rule::compile(&config).unwrap();
        assert_eq!(rule.deductible_fraction, dec!(0.8));
        assert_eq!(rule.itc_fraction, Decimal::ONE);

        config.itc_percent = Some(dec!(120));
        assert!(matches!(
            Rule::compile(&config),
            Err(CoreError::InvalidRule { .. })
        ));
    }

    #[test]
    fn bad_regex_rejected() {
        let err = RuleSet::compile(&[RuleConfig::new("broken", Category::Fuel).pattern("SHELL(")])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRule { rule, .. } if rule == "broken"));
    }
}
