use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One marginal-rate band of a [`TaxSchedule`](super::TaxSchedule).
///
/// `base_amount` is the cumulative tax owed at `from_amount`, so the tax on an
/// income inside this bracket is `base_amount + rate% * (income - from_amount)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub id: String,
    pub from_amount: Decimal,
    /// `None` marks the unbounded top bracket.
    pub to_amount: Option<Decimal>,
    /// Marginal rate as a percentage (0-100).
    pub rate: Decimal,
    pub base_amount: Decimal,
    pub description: String,
}

impl TaxBracket {
    /// Marginal rate as a fraction (e.g. `0.18` for 18%).
    pub fn rate_fraction(&self) -> Decimal {
        self.rate / Decimal::ONE_HUNDRED
    }

    pub fn is_unbounded(&self) -> bool {
        self.to_amount.is_none()
    }

    /// True when `income` falls inside `[from_amount, to_amount]`.
    pub fn contains(
        &self,
        income: Decimal,
    ) -> bool {
        income >= self.from_amount && self.to_amount.is_none_or(|to| income <= to)
    }
}
