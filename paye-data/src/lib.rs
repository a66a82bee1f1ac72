//! CSV loading of tax schedules into a [`paye_core::ScheduleRepository`].

pub mod loader;

pub use loader::{RebateRecord, TaxBracketRecord, TaxScheduleLoader, TaxScheduleLoaderError};
