use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxBracket;

/// Identifies a schedule. Both parts are matched exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub country: String,
    pub tax_year: String,
}

impl ScheduleKey {
    pub fn new(
        country: impl Into<String>,
        tax_year: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            tax_year: tax_year.into(),
        }
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} {}", self.country, self.tax_year)
    }
}

/// Fixed credits defined by a schedule. Only `primary` is mandatory; the
/// age-gated and medical aid rebates are optional per jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rebates {
    pub primary: Decimal,
    pub secondary: Option<Decimal>,
    pub tertiary: Option<Decimal>,
    /// Per medical aid member.
    pub medical_aid: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    pub id: String,
    pub name: String,
    pub country: String,
    pub tax_year: String,
    /// Ordered by `from_amount` ascending; the last bracket is unbounded.
    pub brackets: Vec<TaxBracket>,
    pub rebates: Option<Rebates>,
}

impl TaxSchedule {
    pub fn key(&self) -> ScheduleKey {
        ScheduleKey::new(&self.country, &self.tax_year)
    }
}
