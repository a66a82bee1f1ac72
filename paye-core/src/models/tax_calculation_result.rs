use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxBracket;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RebateBreakdown {
    pub primary: Decimal,
    pub secondary: Decimal,
    pub tertiary: Decimal,
    pub medical_aid: Decimal,
    pub total: Decimal,
}

/// Share of the computed tax attributed to one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTax {
    pub bracket: TaxBracket,
    pub amount_in_bracket: Decimal,
    pub tax_for_bracket: Decimal,
}

/// Output of a tax calculation.
///
/// When produced by the monthly PAYE calculation the summary fields are
/// monthly while `effective_rate` and `tax_brackets` stay at annual scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub taxable_income: Decimal,
    pub tax_before_rebates: Decimal,
    pub rebates: RebateBreakdown,
    pub tax_payable: Decimal,
    /// Percentage of taxable income, unrounded.
    pub effective_rate: Decimal,
    pub tax_brackets: Vec<BracketTax>,
}

impl TaxCalculationResult {
    /// Sum of `tax_for_bracket` over the breakdown.
    pub fn breakdown_total(&self) -> Decimal {
        self.tax_brackets.iter().map(|b| b.tax_for_bracket).sum()
    }
}
