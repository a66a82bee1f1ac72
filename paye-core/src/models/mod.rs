mod tax_bracket;
mod tax_calculation_result;
mod tax_schedule;
mod taxable_income;

pub use tax_bracket::TaxBracket;
pub use tax_calculation_result::{BracketTax, RebateBreakdown, TaxCalculationResult};
pub use tax_schedule::{Rebates, ScheduleKey, TaxSchedule};
pub use taxable_income::{Deductions, TaxableIncome, TaxpayerProfile};
