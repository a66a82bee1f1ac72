use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, info};

use paye_core::{Rebates, RepositoryError, ScheduleKey, ScheduleRepository, TaxBracket, TaxSchedule};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

/// Connection string for a private in-memory database.
pub const MEMORY: &str = ":memory:";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database`, which is either [`MEMORY`], a bare file path
    /// (created if missing) or a `sqlite:` URL.
    pub async fn new(database: &str) -> Result<Self, RepositoryError> {
        let connected = if database == MEMORY {
            // Every connection to `:memory:` is a separate database, so the
            // pool holds exactly one connection for its whole life.
            let options =
                SqliteConnectOptions::from_str("sqlite::memory:").map_err(connection_error)?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            let options = if database.starts_with("sqlite:") {
                SqliteConnectOptions::from_str(database).map_err(connection_error)?
            } else {
                SqliteConnectOptions::new().filename(database)
            };
            SqlitePool::connect_with(options.create_if_missing(true)).await
        };
        let pool = connected.map_err(|e| {
            RepositoryError::Connection(format!("Failed to connect to database '{}': {}", database, e))
        })?;

        debug!(database, "opened sqlite schedule store");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to run database migrations: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn get_brackets(
        &self,
        key: &ScheduleKey,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT bracket_id, from_amount, to_amount, rate, base_amount, description
             FROM tax_brackets
             WHERE country = ? AND tax_year = ?
             ORDER BY position",
        )
        .bind(&key.country)
        .bind(&key.tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_tax_bracket).collect()
    }
}

fn connection_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Connection(e.to_string())
}

fn row_to_schedule_key(row: &SqliteRow) -> Result<ScheduleKey, RepositoryError> {
    Ok(ScheduleKey {
        country: row
            .try_get("country")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        tax_year: row
            .try_get("tax_year")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

fn row_to_tax_bracket(row: &SqliteRow) -> Result<TaxBracket, RepositoryError> {
    Ok(TaxBracket {
        id: row
            .try_get("bracket_id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        from_amount: get_decimal(row, "from_amount")?,
        to_amount: get_optional_decimal(row, "to_amount")?,
        rate: get_decimal(row, "rate")?,
        base_amount: get_decimal(row, "base_amount")?,
        description: row
            .try_get("description")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

fn row_to_rebates(row: &SqliteRow) -> Result<Option<Rebates>, RepositoryError> {
    let Some(primary) = get_optional_decimal(row, "primary_rebate")? else {
        return Ok(None);
    };

    Ok(Some(Rebates {
        primary,
        secondary: get_optional_decimal(row, "secondary_rebate")?,
        tertiary: get_optional_decimal(row, "tertiary_rebate")?,
        medical_aid: get_optional_decimal(row, "medical_aid_rebate")?,
    }))
}

#[async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn get_schedule(
        &self,
        key: &ScheduleKey,
    ) -> Result<TaxSchedule, RepositoryError> {
        let row = sqlx::query(
            "SELECT schedule_id, name, primary_rebate, secondary_rebate,
                    tertiary_rebate, medical_aid_rebate
             FROM tax_schedules WHERE country = ? AND tax_year = ?",
        )
        .bind(&key.country)
        .bind(&key.tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxSchedule {
            id: row
                .try_get("schedule_id")
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
            name: row
                .try_get("name")
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
            country: key.country.clone(),
            tax_year: key.tax_year.clone(),
            brackets: self.get_brackets(key).await?,
            rebates: row_to_rebates(&row)?,
        })
    }

    async fn list_schedule_keys(&self) -> Result<Vec<ScheduleKey>, RepositoryError> {
        let rows = sqlx::query("SELECT country, tax_year FROM tax_schedules ORDER BY country, tax_year")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_schedule_key).collect()
    }

    async fn replace_schedule(
        &self,
        schedule: &TaxSchedule,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM tax_brackets WHERE country = ? AND tax_year = ?")
            .bind(&schedule.country)
            .bind(&schedule.tax_year)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let rebates = schedule.rebates.as_ref();
        sqlx::query(
            "INSERT INTO tax_schedules (country, tax_year, schedule_id, name, primary_rebate,
                                        secondary_rebate, tertiary_rebate, medical_aid_rebate)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (country, tax_year) DO UPDATE SET
                schedule_id = excluded.schedule_id,
                name = excluded.name,
                primary_rebate = excluded.primary_rebate,
                secondary_rebate = excluded.secondary_rebate,
                tertiary_rebate = excluded.tertiary_rebate,
                medical_aid_rebate = excluded.medical_aid_rebate,
                updated_at = datetime('now')",
        )
        .bind(&schedule.country)
        .bind(&schedule.tax_year)
        .bind(&schedule.id)
        .bind(&schedule.name)
        .bind(rebates.map(|r| decimal_to_text(r.primary)))
        .bind(rebates.and_then(|r| r.secondary).map(decimal_to_text))
        .bind(rebates.and_then(|r| r.tertiary).map(decimal_to_text))
        .bind(rebates.and_then(|r| r.medical_aid).map(decimal_to_text))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        for (position, bracket) in schedule.brackets.iter().enumerate() {
            sqlx::query(
                "INSERT INTO tax_brackets (country, tax_year, position, bracket_id, from_amount,
                                           to_amount, rate, base_amount, description)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&schedule.country)
            .bind(&schedule.tax_year)
            .bind(position as i64)
            .bind(&bracket.id)
            .bind(decimal_to_text(bracket.from_amount))
            .bind(bracket.to_amount.map(decimal_to_text))
            .bind(decimal_to_text(bracket.rate))
            .bind(decimal_to_text(bracket.base_amount))
            .bind(&bracket.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        info!(
            schedule = %schedule.id,
            key = %schedule.key(),
            brackets = schedule.brackets.len(),
            "stored tax schedule"
        );
        Ok(())
    }

    async fn delete_schedule(
        &self,
        key: &ScheduleKey,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM tax_brackets WHERE country = ? AND tax_year = ?")
            .bind(&key.country)
            .bind(&key.tax_year)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let result = sqlx::query("DELETE FROM tax_schedules WHERE country = ? AND tax_year = ?")
            .bind(&key.country)
            .bind(&key.tax_year)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        info!(%key, "deleted tax schedule");
        Ok(())
    }
}
