use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pre-tax deductions for one payroll month.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deductions {
    pub retirement: Decimal,
    pub medical_aid: Decimal,
    pub other: Decimal,
}

/// Earnings snapshot for one payroll month.
///
/// Every field is a monthly amount except `taxable_bonus`, which is taken to
/// already be an annual (one-off) figure when annualizing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxableIncome {
    pub gross_salary: Decimal,
    pub taxable_allowances: Decimal,
    pub taxable_bonus: Decimal,
    pub deductions: Deductions,
}

/// Age and medical aid details that drive rebate eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxpayerProfile {
    pub age: u32,
    pub medical_aid_members: u32,
}

impl TaxpayerProfile {
    pub const DEFAULT_AGE: u32 = 30;

    pub fn new(
        age: u32,
        medical_aid_members: u32,
    ) -> Self {
        Self {
            age,
            medical_aid_members,
        }
    }
}

impl Default for TaxpayerProfile {
    fn default() -> Self {
        Self {
            age: Self::DEFAULT_AGE,
            medical_aid_members: 0,
        }
    }
}
