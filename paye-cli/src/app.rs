use std::fmt;

use anyhow::{Context, Result, bail};
use paye_core::calculations::common::MONTHS_PER_YEAR;
use paye_core::db::{DbConfig, RepositoryRegistry, load_snapshot};
use paye_core::{
    BracketTaxCalculator, InMemoryScheduleSource, PeriodAnnualizer, ScheduleKey, ScheduleSource,
    TaxCalculationResult, TaxableIncome, TaxpayerProfile,
};
use paye_db_sqlite::SqliteRepositoryFactory;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::BUILTIN_BACKEND;
use crate::payroll::PayrollEntry;
use crate::utils::{format_money, format_rate};

/// Build a [`RepositoryRegistry`] with all compiled-in backends.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Resolves the schedule table for this run.
///
/// The `builtin` backend serves the compiled-in schedules. Any other backend
/// is created through the registry and read once into a validated snapshot.
pub async fn load_source(db: &DbConfig) -> Result<InMemoryScheduleSource> {
    if db.backend == BUILTIN_BACKEND {
        debug!("using built-in tax schedules");
        return Ok(InMemoryScheduleSource::builtin());
    }

    debug!(backend = %db.backend, "connecting to schedule repository");
    let repo = build_registry()
        .create(db)
        .await
        .with_context(|| format!("Failed to open {} database '{}'", db.backend, db.connection_string))?;
    let source = load_snapshot(repo.as_ref())
        .await
        .context("Failed to load tax schedules")?;

    if source.is_empty() {
        warn!(
            database = %db.connection_string,
            "database holds no tax schedules; load some with paye-data-loader"
        );
    }
    Ok(source)
}

// ─── calculations ────────────────────────────────────────────────────────────

/// Annual tax on `income` under the schedule for `key`.
pub fn annual_tax(
    source: &dyn ScheduleSource,
    key: &ScheduleKey,
    income: Decimal,
    profile: &TaxpayerProfile,
) -> Result<TaxCalculationResult> {
    let Some(schedule) = source.get_schedule(&key.country, &key.tax_year) else {
        bail!("no tax schedule for {key}");
    };
    BracketTaxCalculator::new(&schedule)
        .calculate(income, profile)
        .with_context(|| format!("Failed to calculate tax under {}", schedule.name))
}

/// Monthly PAYE for one payroll month under the schedule for `key`.
pub fn monthly_paye(
    source: &dyn ScheduleSource,
    key: &ScheduleKey,
    earnings: &TaxableIncome,
    profile: &TaxpayerProfile,
) -> Result<TaxCalculationResult> {
    PeriodAnnualizer::new(source)
        .calculate_monthly_paye(earnings, &key.country, &key.tax_year, profile)
        .with_context(|| format!("Failed to calculate PAYE under {key}"))?
        .with_context(|| format!("no tax schedule for {key}"))
}

/// One employee's line in a payroll run.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollLine {
    pub employee: String,
    pub result: TaxCalculationResult,
}

/// Monthly PAYE for every entry, in batch order. The first failure aborts
/// the run.
pub fn run_payroll(
    source: &dyn ScheduleSource,
    key: &ScheduleKey,
    entries: &[PayrollEntry],
    defaults: &TaxpayerProfile,
) -> Result<Vec<PayrollLine>> {
    if source.get_schedule(&key.country, &key.tax_year).is_none() {
        bail!("no tax schedule for {key}");
    }

    let lines = entries
        .iter()
        .map(|entry| {
            let result = monthly_paye(source, key, &entry.earnings, &entry.profile(defaults))
                .with_context(|| format!("employee {}", entry.employee))?;
            Ok(PayrollLine {
                employee: entry.employee.clone(),
                result,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(%key, employees = lines.len(), "payroll run complete");
    Ok(lines)
}

// ─── reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annual,
    Monthly,
}

impl Period {
    fn title(self) -> &'static str {
        match self {
            Period::Annual => "Annual Tax Summary",
            Period::Monthly => "Monthly Tax Summary",
        }
    }

    fn payable_label(self) -> &'static str {
        match self {
            Period::Annual => "Tax payable",
            Period::Monthly => "Monthly PAYE",
        }
    }

    /// Bracket figures are always annual; this scales them for display.
    fn bracket_divisor(self) -> Decimal {
        match self {
            Period::Annual => Decimal::ONE,
            Period::Monthly => MONTHS_PER_YEAR,
        }
    }
}

/// Printable summary and bracket table for one calculation.
pub struct TaxReport<'a> {
    pub key: &'a ScheduleKey,
    pub period: Period,
    pub result: &'a TaxCalculationResult,
}

fn summary_line(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    value: &str,
) -> fmt::Result {
    writeln!(f, "  {label:<22}{value:>16}")
}

impl fmt::Display for TaxReport<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let result = self.result;
        writeln!(f, "{}: {}", self.period.title(), self.key)?;
        summary_line(f, "Taxable income", &format_money(result.taxable_income))?;
        summary_line(f, "Tax before rebates", &format_money(result.tax_before_rebates))?;

        let rebates = [
            ("Primary rebate", result.rebates.primary),
            ("Secondary rebate", result.rebates.secondary),
            ("Tertiary rebate", result.rebates.tertiary),
            ("Medical aid credit", result.rebates.medical_aid),
        ];
        for (label, amount) in rebates {
            if amount > Decimal::ZERO {
                summary_line(f, label, &format_money(-amount))?;
            }
        }

        summary_line(f, self.period.payable_label(), &format_money(result.tax_payable))?;
        summary_line(f, "Effective rate", &format_rate(result.effective_rate))?;

        if result.tax_brackets.is_empty() {
            return Ok(());
        }

        let divisor = self.period.bracket_divisor();
        writeln!(f)?;
        writeln!(f, "  {:<32}{:>9}{:>16}{:>16}", "Bracket", "Rate", "Amount", "Tax")?;
        for line in &result.tax_brackets {
            let bracket = &line.bracket;
            let to = bracket
                .to_amount
                .map(|to| format_money(to / divisor))
                .unwrap_or_else(|| "∞".to_string());
            let range = format!("{} - {}", format_money(bracket.from_amount / divisor), to);
            writeln!(
                f,
                "  {:<32}{:>9}{:>16}{:>16}",
                range,
                format_rate(bracket.rate),
                format_money(line.amount_in_bracket / divisor),
                format_money(line.tax_for_bracket / divisor),
            )?;
        }
        Ok(())
    }
}

/// Printable payroll run with a PAYE total.
pub struct PayrollReport<'a> {
    pub key: &'a ScheduleKey,
    pub lines: &'a [PayrollLine],
}

impl PayrollReport<'_> {
    pub fn total_paye(&self) -> Decimal {
        self.lines.iter().map(|line| line.result.tax_payable).sum()
    }
}

impl fmt::Display for PayrollReport<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Payroll: {}", self.key)?;
        writeln!(f, "  {:<20}{:>16}{:>14}{:>10}", "Employee", "Taxable income", "PAYE", "Rate")?;
        for line in self.lines {
            writeln!(
                f,
                "  {:<20}{:>16}{:>14}{:>10}",
                line.employee,
                format_money(line.result.taxable_income),
                format_money(line.result.tax_payable),
                format_rate(line.result.effective_rate),
            )?;
        }
        writeln!(f, "  {:<20}{:>16}{:>14}", "Total", "", format_money(self.total_paye()))
    }
}

/// Printable list of the schedules a source can answer for.
pub struct ScheduleListing<'a>(pub &'a dyn ScheduleSource);

impl fmt::Display for ScheduleListing<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let keys = self.0.schedule_keys();
        if keys.is_empty() {
            return writeln!(f, "No tax schedules available.");
        }

        writeln!(f, "  {:<16}{:<6}{:>9}  {:<18}{}", "Country", "Year", "Brackets", "Rates", "Rebates")?;
        for key in keys {
            let Some(schedule) = self.0.get_schedule(&key.country, &key.tax_year) else {
                continue;
            };
            let lowest = schedule.brackets.iter().map(|b| b.rate).min().unwrap_or_default();
            let highest = schedule.brackets.iter().map(|b| b.rate).max().unwrap_or_default();
            let rates = format!("{} - {}", format_rate(lowest), format_rate(highest));
            let rebates = if schedule.rebates.is_some() { "yes" } else { "no" };
            writeln!(
                f,
                "  {:<16}{:<6}{:>9}  {:<18}{}",
                key.country,
                key.tax_year,
                schedule.brackets.len(),
                rates,
                rebates
            )?;
        }
        Ok(())
    }
}
