use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use paye_data::TaxScheduleLoader;
use paye_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load tax schedules from CSV files into the database.
///
/// The brackets file has the columns
/// `country,tax_year,schedule_id,schedule_name,from_amount,to_amount,rate,base_amount,description`
/// (empty `to_amount` for the unbounded top bracket, `rate` as a percentage).
///
/// The optional rebates file has the columns
/// `country,tax_year,primary,secondary,tertiary,medical_aid`
/// (empty for rebates the schedule does not define).
#[derive(Parser, Debug)]
#[command(name = "paye-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing tax bracket data
    #[arg(short, long)]
    brackets: PathBuf,

    /// Path to the CSV file containing rebate data
    #[arg(short, long)]
    rebates: Option<PathBuf>,

    /// SQLite database file or URL; created if missing
    #[arg(short, long, default_value = "paye.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let bracket_records = TaxScheduleLoader::parse_brackets(open(&args.brackets)?)
        .with_context(|| format!("Failed to parse CSV: {}", args.brackets.display()))?;
    info!(records = bracket_records.len(), file = %args.brackets.display(), "parsed brackets");

    let rebate_records = match &args.rebates {
        Some(path) => {
            let records = TaxScheduleLoader::parse_rebates(open(path)?)
                .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
            info!(records = records.len(), file = %path.display(), "parsed rebates");
            records
        }
        None => Vec::new(),
    };

    let schedules = TaxScheduleLoader::build(&bracket_records, &rebate_records)
        .context("Failed to build tax schedules")?;

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        info!("running migrations");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
    }

    let stored = TaxScheduleLoader::load(&repo, &schedules)
        .await
        .context("Failed to load tax schedules into database")?;

    println!("Successfully loaded {} tax schedules into {}.", stored, args.database);
    for schedule in &schedules {
        println!("  {} ({} brackets)", schedule.key(), schedule.brackets.len());
    }

    Ok(())
}
