pub mod app;
pub mod config;
pub mod logging;
pub mod payroll;
pub mod utils;
