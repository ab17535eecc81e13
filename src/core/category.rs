use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// CRA category assigned to a transaction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Revenue,
    InvestmentIncome,
    Fuel,
    VehicleRepairs,
    EquipmentSupplies,
    OfficeSupplies,
    Subcontractor,
    ProfessionalFees,
    Phone,
    Meals,
    Travel,
    Rent,
    Utilities,
    Insurance,
    BankCharges,
    Wages,
    /// Capital asset, claimed through CCA rather than expensed
    Capital,
    /// Cash taken out by a shareholder
    ShareholderDraw,
    /// Personal expense paid by the corporation
    ShareholderPersonal,
    /// Money put in by a shareholder
    ShareholderContribution,
    VehicleLoanPayment,
    PersonalLoanPayment,
    GstRemittance,
    GstRefund,
    TaxInstalment,
    Transfer,
    OtherExpense,
    #[default]
    Uncategorized,
}

/// How GST/HST applies to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaxTreatment {
    /// GST/HST charged to customers
    Collected,
    /// GST/HST paid on a business expense, reclaimable as an ITC
    InputTaxCredit,
    /// No GST/HST applies; portion is explicitly zero
    Exempt,
    /// Not known until the transaction is reviewed
    Undetermined,
}

/// ITC grouping used on the filing working papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItcGroup {
    Fuel,
    Equipment,
    Professional,
    Meals,
    Other,
}

impl ItcGroup {
    pub fn display(&self) -> &'static str {
        match self {
            ItcGroup::Fuel => "Fuel",
            ItcGroup::Equipment => "Equipment & vehicle",
            ItcGroup::Professional => "Professional fees",
            ItcGroup::Meals => "Meals (50%)",
            ItcGroup::Other => "Other",
        }
    }
}

/// Effect of a category on the shareholder loan account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanEffect {
    Advance,
    Repayment,
}

impl Category {
    pub fn treatment(&self) -> TaxTreatment {
        use Category::*;
        match self {
            Revenue => TaxTreatment::Collected,
            Fuel | VehicleRepairs | EquipmentSupplies | OfficeSupplies | Subcontractor
            | ProfessionalFees | Phone | Meals | Travel | Rent | Utilities | Capital
            | OtherExpense => TaxTreatment::InputTaxCredit,
            InvestmentIncome | Insurance | BankCharges | Wages | ShareholderDraw
            | ShareholderPersonal | ShareholderContribution | VehicleLoanPayment
            | PersonalLoanPayment | GstRemittance | GstRefund | TaxInstalment | Transfer => {
                TaxTreatment::Exempt
            }
            Uncategorized => TaxTreatment::Undetermined,
        }
    }

    /// Share of the GST/HST paid that may be claimed as an ITC.
    pub fn itc_fraction(&self) -> Decimal {
        match (self, self.treatment()) {
            (Category::Meals, _) => dec!(0.5),
            (_, TaxTreatment::InputTaxCredit) => Decimal::ONE,
            _ => Decimal::ZERO,
        }
    }

    /// Share of the pre-tax cost deductible as a current-year expense.
    pub fn deductible_fraction(&self) -> Decimal {
        use Category::*;
        match self {
            Meals => dec!(0.5),
            Fuel | VehicleRepairs | EquipmentSupplies | OfficeSupplies | Subcontractor
            | ProfessionalFees | Phone | Travel | Rent | Utilities | OtherExpense | Insurance
            | BankCharges | Wages => Decimal::ONE,
            _ => Decimal::ZERO,
        }
    }

    /// Operating expense reported on the income statement.
    pub fn is_expense(&self) -> bool {
        !self.deductible_fraction().is_zero()
    }

    pub fn itc_group(&self) -> Option<ItcGroup> {
        use Category::*;
        match self {
            Fuel => Some(ItcGroup::Fuel),
            EquipmentSupplies | VehicleRepairs | Capital => Some(ItcGroup::Equipment),
            ProfessionalFees => Some(ItcGroup::Professional),
            Meals => Some(ItcGroup::Meals),
            OfficeSupplies | Subcontractor | Phone | Travel | Rent | Utilities | OtherExpense => {
                Some(ItcGroup::Other)
            }
            _ => None,
        }
    }

    pub fn loan_effect(&self) -> Option<LoanEffect> {
        match self {
            Category::ShareholderDraw
            | Category::ShareholderPersonal
            | Category::PersonalLoanPayment => Some(LoanEffect::Advance),
            Category::ShareholderContribution => Some(LoanEffect::Repayment),
            _ => None,
        }
    }

    /// Revenue that attracts no GST/HST (reported separately on the return).
    pub fn is_exempt_revenue(&self) -> bool {
        matches!(
            self,
            Category::InvestmentIncome | Category::GstRefund | Category::Transfer
        )
    }

    pub fn display(&self) -> &'static str {
        use Category::*;
        match self {
            Revenue => "Revenue",
            InvestmentIncome => "Investment income",
            Fuel => "Fuel",
            VehicleRepairs => "Vehicle repairs",
            EquipmentSupplies => "Equipment & supplies",
            OfficeSupplies => "Office supplies",
            Subcontractor => "Subcontractors",
            ProfessionalFees => "Professional fees",
            Phone => "Phone",
            Meals => "Meals (50%)",
            Travel => "Travel",
            Rent => "Rent",
            Utilities => "Utilities",
            Insurance => "Insurance",
            BankCharges => "Bank charges",
            Wages => "Wages",
            Capital => "Capital asset (CCA)",
            ShareholderDraw => "Shareholder draw",
            ShareholderPersonal => "Shareholder personal",
            ShareholderContribution => "Shareholder contribution",
            VehicleLoanPayment => "Vehicle loan",
            PersonalLoanPayment => "Personal loan",
            GstRemittance => "GST remittance",
            GstRefund => "GST refund",
            TaxInstalment => "Tax instalment",
            Transfer => "Transfer",
            OtherExpense => "Other expense",
            Uncategorized => "Uncategorized",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
