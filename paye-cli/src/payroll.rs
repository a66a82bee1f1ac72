//! CSV loader for payroll batches.
//!
//! ## CSV Format
//!
//! Headers are matched by name, so column order does not matter. Whitespace
//! around values is ignored. All amounts are monthly. The bonus is not
//! annualized: it is added once to annual income, so its tax is spread
//! evenly over the year's PAYE.
//!
//! | Column               | Required | Type    | Notes                                  |
//! |----------------------|----------|---------|----------------------------------------|
//! | `employee`           | yes      | string  | Name or payroll number                 |
//! | `gross_salary`       | yes      | decimal | e.g. `25000.00`                        |
//! | `taxable_allowances` | no       | decimal | Empty or missing for 0                 |
//! | `taxable_bonus`      | no       | decimal | Added once to annual income            |
//! | `retirement`         | no       | decimal | Deduction                              |
//! | `medical_aid`        | no       | decimal | Deduction                              |
//! | `other`              | no       | decimal | Deduction                              |
//! | `age`                | no       | integer | Empty for the configured default       |
//! | `medical_aid_members`| no       | integer | Empty for the configured default       |
//!
//! ### Example
//!
//! ```csv
//! employee,gross_salary,taxable_bonus,retirement,age
//! E001,25000.00,,1500.00,
//! E002,42000.00,10000.00,,67
//! ```
use std::path::Path;

use paye_core::{Deductions, TaxableIncome, TaxpayerProfile};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PayrollRow {
    employee: String,
    gross_salary: Decimal,
    taxable_allowances: Option<Decimal>,
    taxable_bonus: Option<Decimal>,
    retirement: Option<Decimal>,
    medical_aid: Option<Decimal>,
    other: Option<Decimal>,
    age: Option<u32>,
    medical_aid_members: Option<u32>,
}

/// Errors that can occur while loading a payroll batch.
#[derive(Debug, thiserror::Error)]
pub enum PayrollLoadError {
    #[error("failed to read payroll file: {0}")]
    Io(#[from] std::io::Error),

    /// Bad structure, missing required column, or a type mismatch.
    #[error("CSV parse error on row {row}: {source}")]
    Parse {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("empty employee on row {row}")]
    MissingEmployee { row: usize },

    #[error("negative {column} on row {row}: {value}")]
    NegativeAmount {
        column: &'static str,
        value: Decimal,
        row: usize,
    },
}

/// One employee's monthly earnings, ready for PAYE.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollEntry {
    pub employee: String,
    pub earnings: TaxableIncome,
    pub age: Option<u32>,
    pub medical_aid_members: Option<u32>,
}

impl PayrollEntry {
    /// The row's profile, with empty cells taken from `defaults`.
    pub fn profile(
        &self,
        defaults: &TaxpayerProfile,
    ) -> TaxpayerProfile {
        TaxpayerProfile::new(
            self.age.unwrap_or(defaults.age),
            self.medical_aid_members.unwrap_or(defaults.medical_aid_members),
        )
    }
}

fn non_negative_amount(
    column: &'static str,
    value: Option<Decimal>,
    row: usize,
) -> Result<Decimal, PayrollLoadError> {
    let value = value.unwrap_or(Decimal::ZERO);
    if value < Decimal::ZERO {
        return Err(PayrollLoadError::NegativeAmount { column, value, row });
    }
    Ok(value)
}

/// row_number is 1-based (header excluded).
fn convert_row(
    row: PayrollRow,
    row_number: usize,
) -> Result<PayrollEntry, PayrollLoadError> {
    if row.employee.is_empty() {
        return Err(PayrollLoadError::MissingEmployee { row: row_number });
    }

    let earnings = TaxableIncome {
        gross_salary: non_negative_amount("gross_salary", Some(row.gross_salary), row_number)?,
        taxable_allowances: non_negative_amount("taxable_allowances", row.taxable_allowances, row_number)?,
        taxable_bonus: non_negative_amount("taxable_bonus", row.taxable_bonus, row_number)?,
        deductions: Deductions {
            retirement: non_negative_amount("retirement", row.retirement, row_number)?,
            medical_aid: non_negative_amount("medical_aid", row.medical_aid, row_number)?,
            other: non_negative_amount("other", row.other, row_number)?,
        },
    };

    Ok(PayrollEntry {
        employee: row.employee,
        earnings,
        age: row.age,
        medical_aid_members: row.medical_aid_members,
    })
}

/// Parses a payroll batch. Rows are returned in file order; the first bad
/// row fails the whole batch.
pub fn load_from_str(input: &str) -> Result<Vec<PayrollEntry>, PayrollLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<PayrollRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row_number = idx + 1;
            let row = result.map_err(|source| PayrollLoadError::Parse {
                row: row_number,
                source,
            })?;
            convert_row(row, row_number)
        })
        .collect()
}

/// Reads `path` and delegates to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Vec<PayrollEntry>, PayrollLoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}
