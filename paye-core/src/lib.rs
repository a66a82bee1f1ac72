pub mod calculations;
pub mod db;
pub mod models;
pub mod schedules;

pub use calculations::{
    BracketTaxCalculator, PeriodAnnualizer, TaxCalculationError, calculate_monthly_paye,
    calculate_tax,
};
pub use db::repository::{RepositoryError, ScheduleRepository};
pub use models::*;
pub use schedules::{
    InMemoryScheduleSource, ScheduleSource, ScheduleValidationError, get_schedule,
    validate_schedule,
};
