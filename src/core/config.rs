use super::allocation::{validate_splits, SplitShare};
use super::category::Category;
use super::error::CoreError;
use super::period::YearEnd;
use super::transaction::{Flow, Source};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Rule-set configuration: classification rules and every rate, threshold
/// and split the engine applies. Missing keys take the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSetConfig {
    /// Fiscal year-end (default November 30)
    pub year_end: YearEnd,
    /// Cash expenses at or above this need a basic receipt
    #[schemars(with = "f64")]
    pub receipt_basic_threshold: Decimal,
    /// Cash expenses at or above this need a detailed receipt
    #[schemars(with = "f64")]
    pub receipt_detailed_threshold: Decimal,
    /// Equipment and vehicle purchases at or above this are flagged for review
    #[schemars(with = "f64")]
    pub large_purchase_threshold: Decimal,
    /// GST/HST rate, e.g. 0.05
    #[schemars(with = "f64")]
    pub gst_rate: Decimal,
    /// T5 gross-up factor, e.g. 1.38
    #[schemars(with = "f64")]
    pub gross_up_factor: Decimal,
    /// T5 dividend tax credit rate applied to the taxable dividend, e.g. 0.15
    #[schemars(with = "f64")]
    pub dividend_credit_rate: Decimal,
    /// Gross-up factor for dividends other than eligible, e.g. 1.15
    #[schemars(with = "f64")]
    pub non_eligible_gross_up_factor: Decimal,
    /// Dividend tax credit rate for dividends other than eligible, e.g. 0.090301
    #[schemars(with = "f64")]
    pub non_eligible_credit_rate: Decimal,
    /// Ownership / shared-expense split; the first beneficiary absorbs rounding
    pub split_allocations: Vec<SplitShare>,
    /// Payer details printed on T5 slips
    pub payer: Option<Payer>,
    /// Ordered classification rules; first match wins
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    pub name: String,
    #[serde(default)]
    pub business_number: Option<String>,
}

/// One classification rule. All given predicates must hold for a match.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub name: String,
    /// Case-insensitive regular expression matched against the description
    #[serde(default)]
    pub pattern: Option<String>,
    /// Matches the category hint supplied with the entry (case-insensitive)
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub flow: Option<Flow>,
    #[serde(default)]
    pub source: Option<Source>,
    /// Inclusive lower bound on the unsigned amount
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub min_amount: Option<Decimal>,
    /// Exclusive upper bound on the unsigned amount
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub max_amount: Option<Decimal>,
    pub category: Category,
    /// Overrides the category's ITC percentage (0-100)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub itc_percent: Option<Decimal>,
    /// Overrides the category's deductible percentage (0-100), e.g. phone business use
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub deductible_percent: Option<Decimal>,
    /// Shareholder the transaction belongs to, for loan-account categories
    #[serde(default)]
    pub shareholder: Option<String>,
    /// Split the deductible amount using `splitAllocations`
    #[serde(default)]
    pub split: bool,
    #[serde(default)]
    pub needs_review: bool,
}

impl RuleConfig {
    pub fn new(name: &str, category: Category) -> Self {
        RuleConfig {
            name: name.to_string(),
            pattern: None,
            hint: None,
            flow: None,
            source: None,
            min_amount: None,
            max_amount: None,
            category,
            itc_percent: None,
            deductible_percent: None,
            shareholder: None,
            split: false,
            needs_review: false,
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    pub fn flow(mut self, flow: Flow) -> Self {
        self.flow = Some(flow);
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn min_amount(mut self, amount: Decimal) -> Self {
        self.min_amount = Some(amount);
        self
    }

    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }

    pub fn review(mut self) -> Self {
        self.needs_review = true;
        self
    }
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        RuleSetConfig {
            year_end: YearEnd::default(),
            receipt_basic_threshold: dec!(30),
            receipt_detailed_threshold: dec!(150),
            large_purchase_threshold: dec!(500),
            gst_rate: dec!(0.05),
            gross_up_factor: dec!(1.38),
            dividend_credit_rate: dec!(0.15),
            non_eligible_gross_up_factor: dec!(1.15),
            non_eligible_credit_rate: dec!(0.090301),
            split_allocations: vec![
                SplitShare::new("Greg", dec!(51)),
                SplitShare::new("Lilibeth", dec!(49)),
            ],
            payer: None,
            rules: default_rules(),
        }
    }
}

impl RuleSetConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let config: RuleSetConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        log::debug!(
            "Loaded rule set: {} rules, GST {}, gross-up {}",
            config.rules.len(),
            config.gst_rate,
            config.gross_up_factor
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.receipt_basic_threshold < Decimal::ZERO
            || self.receipt_detailed_threshold < self.receipt_basic_threshold
        {
            return Err(CoreError::InvalidConfig(format!(
                "receipt thresholds must satisfy 0 <= basic ({}) <= detailed ({})",
                self.receipt_basic_threshold, self.receipt_detailed_threshold
            )));
        }
        if self.gst_rate < Decimal::ZERO || self.gst_rate >= Decimal::ONE {
            return Err(CoreError::InvalidConfig(format!(
                "gstRate must be in [0, 1), got {}",
                self.gst_rate
            )));
        }
        let dividend_rates = [
            ("grossUpFactor", self.gross_up_factor, "dividendCreditRate", self.dividend_credit_rate),
            (
                "nonEligibleGrossUpFactor",
                self.non_eligible_gross_up_factor,
                "nonEligibleCreditRate",
                self.non_eligible_credit_rate,
            ),
        ];
        for (factor_key, factor, rate_key, rate) in dividend_rates {
            if factor < Decimal::ONE {
                return Err(CoreError::InvalidConfig(format!(
                    "{factor_key} must be at least 1, got {factor}"
                )));
            }
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(CoreError::InvalidConfig(format!(
                    "{rate_key} must be in [0, 1], got {rate}"
                )));
            }
        }
        validate_splits(&self.split_allocations)?;
        Ok(())
    }
}

/// Built-in CRA rule set. More specific rules come first.
pub fn default_rules() -> Vec<RuleConfig> {
    use Category::*;
    vec![
        // Government
        RuleConfig::new("gst-remittance", GstRemittance)
            .pattern(r"DEBIT MEMO.*GOVERNMENT|GPFS.*GOVERNMENT")
            .flow(Flow::Out),
        RuleConfig::new("government-credit", GstRefund)
            .pattern(r"GOVERNMENT CANADA|CANADA REVENUE")
            .flow(Flow::In),
        RuleConfig::new("tax-instalment", TaxInstalment)
            .pattern(r"GOVERNMENT CANADA|CANADA REVENUE")
            .flow(Flow::Out),
        // Revenue
        RuleConfig::new("wire-revenue", Revenue)
            .pattern(r"WIRE TSF|CONTRACTOR INV")
            .flow(Flow::In),
        RuleConfig::new("deposit-revenue", Revenue)
            .pattern(r"MOBILE DEP|BRANCH DEPOSIT|COUNTER DEPOSIT|DEPOSIT IN BRANCH")
            .flow(Flow::In)
            .review(),
        RuleConfig::new("investment-income", InvestmentIncome)
            .pattern(r"INTEREST (PAID|CREDIT|EARNED)|DIVIDEND")
            .flow(Flow::In),
        // Bank
        RuleConfig::new("bank-charges", BankCharges).pattern(
            r"ACCOUNT FEE|SERVICE CHARGE|MONTHLY.*FEE|BANK FEE|OVERDRAFT|NSF|OVER LIMIT|INTEREST CHARGE",
        ),
        // Shareholders
        RuleConfig::new("cash-withdrawal", ShareholderDraw)
            .pattern(r"ATM WITHDRAWAL|ABM WITHDRAWAL|BRANCH.*WITHDRAWAL")
            .flow(Flow::Out),
        RuleConfig::new("shareholder-contribution", ShareholderContribution)
            .pattern(r"SHAREHOLDER (DEPOSIT|CONTRIBUTION|LOAN)")
            .flow(Flow::In),
        // Loans
        RuleConfig::new("vehicle-loan", VehicleLoanPayment)
            .pattern(r"TD ON-LINE LOANS|LOAN PAYMENT.*TD"),
        RuleConfig::new("personal-loan", PersonalLoanPayment)
            .pattern(r"LOAN PAYMENT.*SCOTIA|SCOTIA.*LOAN"),
        // Premises and services
        RuleConfig::new("rent", Rent).pattern(r"RENT@|REALTY"),
        RuleConfig::new("insurance", Insurance)
            .pattern(r"MANULIFE|INSURANCE|WAWANESA|INTACT|AVIVA"),
        RuleConfig::new("phone", Phone)
            .pattern(r"KOODO|TELUS|BELL|ROGERS|FIDO|SHAW")
            .split(),
        RuleConfig::new("utilities", Utilities)
            .pattern(r"ATCO|ENMAX|EPCOR|DIRECT ENERGY|FORTIS"),
        // Vehicle and equipment
        RuleConfig::new("fuel", Fuel).pattern(
            r"PETRO-CANADA|PETRO CANADA|SHELL|ESSO|CHEVRON|HUSKY|CENTEX|MOBIL|DOMO|CIRCLE K|CO-OP|FAS GA",
        ),
        RuleConfig::new("vehicle-repairs", VehicleRepairs).pattern(
            r"OK TIRE|KAL TIRE|NAPA|PART SOURCE|LORDCO|JIFFY LUBE|CANADIAN TIRE|REGISTR|CARWASH|PARKING",
        ),
        RuleConfig::new("capital-equipment", Capital)
            .pattern(r"EQUIPMENT SALES|TRAILER SALES|TRUCK CENTRE")
            .flow(Flow::Out),
        RuleConfig::new("equipment", EquipmentSupplies).pattern(
            r"PRINCESS AUTO|HOME HARDWARE|HOME DEPOT|LOWES|MARKS WORK|COSTCO BUSINESS",
        ),
        RuleConfig::new("office", OfficeSupplies).pattern(r"STAPLES|OFFICE|QUICKBOOKS|INTUIT"),
        RuleConfig::new("professional", ProfessionalFees).pattern(
            r"NOTARY|LAWYER|LEGAL|ACCOUNTING|ACCOUNTANT|CPA|BOOKKEEP|WORKERS COMP|WCB",
        ),
        RuleConfig::new("meals", Meals).pattern(
            r"TIM HORTON|A&W|MCDON|WENDY|SUBWAY|RESTAURANT|BOSTON PIZZA|DENNY|SMITTY|DQ GRILL",
        ),
        // Personal spending through the corporation
        RuleConfig::new("personal", ShareholderPersonal).pattern(
            r"LIQUOR|WINE RACK|BEER STORE|CANNABIS|IKEA|DAYCARE|CHILD CARE|GROCERY|SUPERMARKET|SAFEWAY|SUPERSTORE|NETFLIX|SPOTIFY|SKIP THE DISHES|DOORDASH|UBER EATS|LOTTERY|BARBER|SALON",
        ),
        RuleConfig::new("personal-retail", ShareholderPersonal)
            .pattern(r"WALMART|DOLLARAMA|AMAZON|TEMU")
            .review(),
        // Transfers
        RuleConfig::new("transfer", Transfer)
            .pattern(r"E-TRANSFER|ETRANSFER|INTERNET TRANSFER|INTERAC|TRANSFER TO")
            .review(),
        RuleConfig::new("deposit", Transfer)
            .pattern(r"DEPOSIT")
            .flow(Flow::In)
            .review(),
        // Cash entries
        RuleConfig::new("cash-meals", Meals).source(Source::Cash).hint("meals"),
        RuleConfig::new("cash-fuel", Fuel).source(Source::Cash).hint("fuel"),
        RuleConfig::new("cash-office", OfficeSupplies)
            .source(Source::Cash)
            .hint("office"),
        RuleConfig::new("cash-expense", OtherExpense).source(Source::Cash),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RuleSetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.receipt_basic_threshold, dec!(30));
        assert_eq!(config.receipt_detailed_threshold, dec!(150));
        assert_eq!(config.split_allocations[0].beneficiary, "Greg");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "gstRate": "0.13", "grossUpFactor": "1.15" }"#;
        let config = RuleSetConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(config.gst_rate, dec!(0.13));
        assert_eq!(config.gross_up_factor, dec!(1.15));
        assert_eq!(config.dividend_credit_rate, dec!(0.15));
        assert_eq!(config.rules.len(), default_rules().len());
    }

    #[test]
    fn rules_from_json() {
        let json = r#"{
            "splitAllocations": [
                { "beneficiary": "A", "percentage": "60" },
                { "beneficiary": "B", "percentage": "40" }
            ],
            "rules": [
                { "name": "fuel", "pattern": "SHELL", "category": "fuel", "flow": "out" },
                { "name": "phone", "pattern": "TELUS", "category": "phone",
                  "deductiblePercent": "80", "split": true }
            ]
        }"#;
        let config = RuleSetConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].flow, Some(Flow::Out));
        assert_eq!(config.rules[1].deductible_percent, Some(dec!(80)));
        assert!(config.rules[1].split);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let config = RuleSetConfig {
            receipt_basic_threshold: dec!(200),
            ..RuleSetConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn non_eligible_rates_validated() {
        let config = RuleSetConfig {
            non_eligible_gross_up_factor: dec!(0.9),
            ..RuleSetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(CoreError::InvalidConfig(
                "nonEligibleGrossUpFactor must be at least 1, got 0.9".to_string()
            ))
        );
        let json = r#"{ "nonEligibleCreditRate": "0.0903" }"#;
        let config = RuleSetConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(config.non_eligible_credit_rate, dec!(0.0903));
        assert_eq!(config.non_eligible_gross_up_factor, dec!(1.15));
    }

    #[test]
    fn splits_must_total_one_hundred() {
        let config = RuleSetConfig {
            split_allocations: vec![SplitShare::new("A", dec!(50)), SplitShare::new("B", dec!(49))],
            ..RuleSetConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidSplit(_))));
    }
}
