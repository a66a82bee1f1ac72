//! End-to-end checks of the payroll and configuration paths against on-disk
//! files.

use std::path::{Path, PathBuf};

use paye_cli::app::{self, PayrollReport};
use paye_cli::config::AppConfig;
use paye_cli::payroll;
use paye_core::schedules::builtin::namibia_2025;
use paye_core::{InMemoryScheduleSource, ScheduleKey, TaxpayerProfile};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("payroll_2025.csv")
}

fn south_africa() -> ScheduleKey {
    ScheduleKey::new("South Africa", "2025")
}

#[test]
fn test_load_fixture_file_succeeds() {
    let entries = payroll::load_from_file(&fixture_path()).expect("fixture file should load without error");

    let names: Vec<&str> = entries.iter().map(|e| e.employee.as_str()).collect();
    assert_eq!(names, vec!["E001", "E002", "E003", "E004"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = payroll::load_from_file(Path::new("/nonexistent/payroll.csv"));
    assert!(matches!(result, Err(payroll::PayrollLoadError::Io(_))));
}

#[test]
fn test_fixture_payroll_run() {
    let entries = payroll::load_from_file(&fixture_path()).unwrap();
    let source = InMemoryScheduleSource::builtin();

    let lines = app::run_payroll(&source, &south_africa(), &entries, &TaxpayerProfile::default()).unwrap();

    // E001: 300000 a year, primary rebate only.
    assert_eq!(lines[0].result.tax_payable, dec!(41796.74) / dec!(12));

    // E002: allowance and retirement cancel out; 216000 a year.
    assert_eq!(lines[1].result.taxable_income, dec!(18000));
    assert_eq!(lines[1].result.tax_payable, dec!(1803.75));

    // E003: bonus taken once; age 68 with two medical aid members.
    assert_eq!(lines[2].result.tax_before_rebates, dec!(103742.69) / dec!(12));
    assert_eq!(lines[2].result.rebates.secondary, dec!(9444) / dec!(12));
    assert_eq!(lines[2].result.rebates.medical_aid, dec!(694) / dec!(12));
    assert_eq!(lines[2].result.tax_payable, dec!(76369.69) / dec!(12));

    // E004: rebates exceed the tax.
    assert_eq!(lines[3].result.tax_payable, dec!(0));
}

#[test]
fn test_fixture_payroll_report_total() {
    let entries = payroll::load_from_file(&fixture_path()).unwrap();
    let source = InMemoryScheduleSource::builtin();
    let key = south_africa();
    let lines = app::run_payroll(&source, &key, &entries, &TaxpayerProfile::default()).unwrap();

    let report = PayrollReport {
        key: &key,
        lines: &lines,
    };
    let text = report.to_string();

    assert_eq!(report.total_paye(), dec!(139811.43) / dec!(12));
    assert_eq!(
        text.lines().last().map(|l| l.split_whitespace().collect::<Vec<_>>()),
        Some(vec!["Total", "11,650.95"])
    );
    assert!(text.contains("E003"));
    assert!(text.contains("37,966.67"));
    assert!(text.contains("16.76%"));
}

#[tokio::test]
async fn test_config_file_selects_sqlite_database() {
    let dir = std::env::temp_dir().join(format!("paye-cli-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("schedules.db");
    let config_path = dir.join("paye.toml");
    std::fs::write(
        &config_path,
        format!(
            "[database]\nbackend = \"sqlite\"\nconnection_string = \"{}\"\n\n[defaults]\ncountry = \"Namibia\"\n",
            db_path.display()
        ),
    )
    .unwrap();

    let config = AppConfig::load(&config_path).unwrap();
    {
        let repo = app::build_registry().create(&config.database).await.unwrap();
        repo.replace_schedule(&namibia_2025()).await.unwrap();
    }

    let source = app::load_source(&config.database).await.unwrap();
    let key = ScheduleKey::new(config.defaults.country.clone(), config.defaults.tax_year.clone());
    let result = app::annual_tax(&source, &key, dec!(150000), &config.defaults.profile()).unwrap();

    assert_eq!(source.len(), 1);
    assert_eq!(result.tax_payable, dec!(21499.75));

    std::fs::remove_dir_all(&dir).unwrap();
}
