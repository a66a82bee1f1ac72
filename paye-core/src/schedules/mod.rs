//! Tax schedule lookup.
//!
//! [`ScheduleSource`] is the seam the calculators depend on. The default
//! implementation, [`InMemoryScheduleSource`], is seeded from the built-in
//! tables or from a database snapshot (see [`crate::db::load_snapshot`]).

pub mod builtin;
mod source;
pub mod validation;

pub use source::{InMemoryScheduleSource, ScheduleSource, builtin_source, get_schedule};
pub use validation::{ScheduleValidationError, validate_schedule};
