use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use paye_core::{Deductions, ScheduleKey, TaxableIncome, TaxpayerProfile};
use rust_decimal::Decimal;
use tracing::{debug, info};

use paye_cli::app::{self, Period, PayrollReport, ScheduleListing, TaxReport};
use paye_cli::config::{AppConfig, CONFIG_ENV, Defaults};
use paye_cli::utils::parse_amount;
use paye_cli::{logging, payroll};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Progressive income tax and monthly PAYE calculator.
///
/// Amounts accept a comma thousands separator, e.g. `25,000.00`.
#[derive(Debug, Parser)]
#[command(name = "paye", version)]
struct Cli {
    /// Schedule backend: `builtin`, or a database backend such as `sqlite`.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `paye.db`) or `:memory:`.
    /// Without `--backend`, selects `sqlite` over the builtin schedules.
    #[arg(long, global = true)]
    db: Option<String>,

    /// TOML configuration file.
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available tax schedules.
    Schedules,

    /// Annual tax on an annual taxable income.
    Annual {
        /// Annual taxable income.
        #[arg(long, value_parser = parse_amount)]
        income: Decimal,

        #[command(flatten)]
        jurisdiction: Jurisdiction,

        #[command(flatten)]
        profile: Profile,
    },

    /// PAYE for one payroll month.
    Monthly {
        #[command(flatten)]
        earnings: Earnings,

        #[command(flatten)]
        jurisdiction: Jurisdiction,

        #[command(flatten)]
        profile: Profile,
    },

    /// PAYE for every employee in a CSV payroll batch.
    Payroll {
        /// CSV file with one employee per row.
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        jurisdiction: Jurisdiction,
    },
}

#[derive(Debug, Args)]
struct Jurisdiction {
    /// Country name as it appears in the schedule, e.g. "South Africa".
    #[arg(long)]
    country: Option<String>,

    /// Tax year, e.g. 2025.
    #[arg(long)]
    tax_year: Option<String>,
}

impl Jurisdiction {
    fn key(
        self,
        defaults: &Defaults,
    ) -> ScheduleKey {
        ScheduleKey::new(
            self.country.unwrap_or_else(|| defaults.country.clone()),
            self.tax_year.unwrap_or_else(|| defaults.tax_year.clone()),
        )
    }
}

#[derive(Debug, Args)]
struct Profile {
    /// Taxpayer age in years.
    #[arg(long)]
    age: Option<u32>,

    /// Number of medical aid members, the taxpayer included.
    #[arg(long)]
    medical_aid_members: Option<u32>,
}

impl Profile {
    fn resolve(
        &self,
        defaults: &Defaults,
    ) -> TaxpayerProfile {
        TaxpayerProfile::new(
            self.age.unwrap_or(defaults.age),
            self.medical_aid_members.unwrap_or(defaults.medical_aid_members),
        )
    }
}

/// Monthly amounts.
#[derive(Debug, Args)]
struct Earnings {
    #[arg(long, value_parser = parse_amount)]
    gross_salary: Decimal,

    #[arg(long, value_parser = parse_amount, default_value = "0")]
    allowances: Decimal,

    /// Bonus paid this month. Added once to annual income, so its tax is
    /// spread over the twelve months.
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    bonus: Decimal,

    /// Retirement fund contribution.
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    retirement: Decimal,

    /// Medical aid contribution.
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    medical_aid: Decimal,

    /// Any other deductible amount.
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    other: Decimal,
}

impl From<Earnings> for TaxableIncome {
    fn from(earnings: Earnings) -> Self {
        TaxableIncome {
            gross_salary: earnings.gross_salary,
            taxable_allowances: earnings.allowances,
            taxable_bonus: earnings.bonus,
            deductions: Deductions {
                retirement: earnings.retirement,
                medical_aid: earnings.medical_aid,
                other: earnings.other,
            },
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.override_database(cli.backend, cli.db);
    if let Some(level) = &config.log_level
        && std::env::var_os("RUST_LOG").is_none()
    {
        logging::set_log_level(level)?;
    }

    debug!(backend = %config.database.backend, "loading tax schedules");
    let source = app::load_source(&config.database).await?;
    let defaults = &config.defaults;

    match cli.command {
        Command::Schedules => {
            print!("{}", ScheduleListing(&source));
        }
        Command::Annual {
            income,
            jurisdiction,
            profile,
        } => {
            let key = jurisdiction.key(defaults);
            let result = app::annual_tax(&source, &key, income, &profile.resolve(defaults))?;
            print!(
                "{}",
                TaxReport {
                    key: &key,
                    period: Period::Annual,
                    result: &result,
                }
            );
        }
        Command::Monthly {
            earnings,
            jurisdiction,
            profile,
        } => {
            let key = jurisdiction.key(defaults);
            let earnings = TaxableIncome::from(earnings);
            let result = app::monthly_paye(&source, &key, &earnings, &profile.resolve(defaults))?;
            print!(
                "{}",
                TaxReport {
                    key: &key,
                    period: Period::Monthly,
                    result: &result,
                }
            );
        }
        Command::Payroll {
            input,
            jurisdiction,
        } => {
            let key = jurisdiction.key(defaults);
            let entries = payroll::load_from_file(&input)
                .with_context(|| format!("Failed to load payroll: {}", input.display()))?;
            info!(employees = entries.len(), file = %input.display(), "loaded payroll batch");

            let lines = app::run_payroll(&source, &key, &entries, &defaults.profile())?;
            print!(
                "{}",
                PayrollReport {
                    key: &key,
                    lines: &lines,
                }
            );
        }
    }

    Ok(())
}
