use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::Read;

use paye_core::{
    Rebates, RepositoryError, ScheduleKey, ScheduleRepository, ScheduleValidationError, TaxBracket,
    TaxSchedule, validate_schedule,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading tax schedule data.
#[derive(Debug, Error)]
pub enum TaxScheduleLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Bracket rows for {key} disagree on {field}: '{first}' vs '{other}'")]
    InconsistentSchedule {
        key: ScheduleKey,
        field: &'static str,
        first: String,
        other: String,
    },

    #[error("Rebates given for {0}, which has no brackets")]
    OrphanRebates(ScheduleKey),

    #[error("Rebates given more than once for {0}")]
    DuplicateRebates(ScheduleKey),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleValidationError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxScheduleLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxScheduleLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the tax brackets CSV file.
///
/// - `country`, `tax_year`: the schedule key, matched exactly
/// - `schedule_id`, `schedule_name`: repeated on every row of a schedule
/// - `from_amount`, `to_amount`: bracket bounds (empty `to_amount` = unbounded)
/// - `rate`: the marginal rate as a percentage (e.g. 18 for 18%)
/// - `base_amount`: tax accumulated below `from_amount`
/// - `description`: optional label
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub country: String,
    pub tax_year: String,
    pub schedule_id: String,
    pub schedule_name: String,
    pub from_amount: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub to_amount: Option<Decimal>,
    pub rate: Decimal,
    pub base_amount: Decimal,
    #[serde(default)]
    pub description: String,
}

/// A single record from the rebates CSV file. Empty optional columns mean the
/// rebate is not defined for the schedule.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RebateRecord {
    pub country: String,
    pub tax_year: String,
    pub primary: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub secondary: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub tertiary: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub medical_aid: Option<Decimal>,
}

impl RebateRecord {
    fn key(&self) -> ScheduleKey {
        ScheduleKey::new(self.country.as_str(), self.tax_year.as_str())
    }

    fn rebates(&self) -> Rebates {
        Rebates {
            primary: self.primary,
            secondary: self.secondary,
            tertiary: self.tertiary,
            medical_aid: self.medical_aid,
        }
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn parse_records<R: Read, T: for<'de> Deserialize<'de>>(
    reader: R
) -> Result<Vec<T>, TaxScheduleLoaderError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize() {
        let record: T = result?;
        records.push(record);
    }

    Ok(records)
}

/// Loader for tax schedules from CSV files.
///
/// Bracket rows are grouped into schedules by (country, tax_year) in file
/// order; rebate rows attach to the schedule with the same key. Every built
/// schedule is validated before anything is written, and writes go through
/// the [`ScheduleRepository`] trait so any backend works.
pub struct TaxScheduleLoader;

impl TaxScheduleLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse_brackets<R: Read>(
        reader: R
    ) -> Result<Vec<TaxBracketRecord>, TaxScheduleLoaderError> {
        parse_records(reader)
    }

    /// Parse rebate records from a CSV reader.
    pub fn parse_rebates<R: Read>(reader: R) -> Result<Vec<RebateRecord>, TaxScheduleLoaderError> {
        parse_records(reader)
    }

    /// Assemble and validate schedules, sorted by key.
    ///
    /// Bracket ids are the 1-based position of the row within its schedule.
    pub fn build(
        brackets: &[TaxBracketRecord],
        rebates: &[RebateRecord],
    ) -> Result<Vec<TaxSchedule>, TaxScheduleLoaderError> {
        let mut schedules: BTreeMap<ScheduleKey, TaxSchedule> = BTreeMap::new();

        for record in brackets {
            let key = ScheduleKey::new(record.country.as_str(), record.tax_year.as_str());
            let schedule = match schedules.entry(key) {
                Entry::Vacant(entry) => entry.insert(TaxSchedule {
                    id: record.schedule_id.clone(),
                    name: record.schedule_name.clone(),
                    country: record.country.clone(),
                    tax_year: record.tax_year.clone(),
                    brackets: Vec::new(),
                    rebates: None,
                }),
                Entry::Occupied(entry) => {
                    let schedule = entry.into_mut();
                    check_consistent(schedule, "schedule_id", &schedule.id, &record.schedule_id)?;
                    check_consistent(schedule, "schedule_name", &schedule.name, &record.schedule_name)?;
                    schedule
                }
            };

            schedule.brackets.push(TaxBracket {
                id: (schedule.brackets.len() + 1).to_string(),
                from_amount: record.from_amount,
                to_amount: record.to_amount,
                rate: record.rate,
                base_amount: record.base_amount,
                description: record.description.clone(),
            });
        }

        for record in rebates {
            let key = record.key();
            let Some(schedule) = schedules.get_mut(&key) else {
                return Err(TaxScheduleLoaderError::OrphanRebates(key));
            };
            if schedule.rebates.is_some() {
                return Err(TaxScheduleLoaderError::DuplicateRebates(key));
            }
            schedule.rebates = Some(record.rebates());
        }

        for schedule in schedules.values() {
            validate_schedule(schedule)?;
            debug!(
                key = %schedule.key(),
                brackets = schedule.brackets.len(),
                rebates = schedule.rebates.is_some(),
                "built tax schedule"
            );
        }

        Ok(schedules.into_values().collect())
    }

    /// Store `schedules` in the repository, replacing any with the same key.
    ///
    /// Loading is idempotent: running the same load twice leaves the same
    /// data. Returns the number of schedules stored.
    pub async fn load<R: ScheduleRepository + ?Sized>(
        repo: &R,
        schedules: &[TaxSchedule],
    ) -> Result<usize, TaxScheduleLoaderError> {
        for schedule in schedules {
            repo.replace_schedule(schedule).await?;
        }

        info!(schedules = schedules.len(), "loaded tax schedules");
        Ok(schedules.len())
    }
}

fn check_consistent(
    schedule: &TaxSchedule,
    field: &'static str,
    first: &str,
    other: &str,
) -> Result<(), TaxScheduleLoaderError> {
    if first == other {
        return Ok(());
    }
    Err(TaxScheduleLoaderError::InconsistentSchedule {
        key: schedule.key(),
        field,
        first: first.to_string(),
        other: other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use paye_core::schedules::builtin::{namibia_2025, south_africa_2025};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str =
        "country,tax_year,schedule_id,schedule_name,from_amount,to_amount,rate,base_amount,description\n";

    const NAMIBIA_CSV: &str = r#"country,tax_year,schedule_id,schedule_name,from_amount,to_amount,rate,base_amount,description
Namibia,2025,na-2025,Namibia 2025,0,50000,0,0,Tax exempt
Namibia,2025,na-2025,Namibia 2025,50001,100000,18,0,First bracket
Namibia,2025,na-2025,Namibia 2025,100001,300000,25,9000,Second bracket
Namibia,2025,na-2025,Namibia 2025,300001,500000,28,59000,Third bracket
Namibia,2025,na-2025,Namibia 2025,500001,800000,30,115000,Fourth bracket
Namibia,2025,na-2025,Namibia 2025,800001,1500000,32,205000,Fifth bracket
Namibia,2025,na-2025,Namibia 2025,1500001,,37,429000,Sixth bracket
"#;

    const SOUTH_AFRICA_CSV: &str = r#"country,tax_year,schedule_id,schedule_name,from_amount,to_amount,rate,base_amount,description
South Africa,2025,za-2025,South Africa 2025,0,237100,18,0,First bracket
South Africa,2025,za-2025,South Africa 2025,237101,370500,26,42678,Second bracket
South Africa,2025,za-2025,South Africa 2025,370501,512800,31,77362,Third bracket
South Africa,2025,za-2025,South Africa 2025,512801,673000,36,121475,Fourth bracket
South Africa,2025,za-2025,South Africa 2025,673001,857900,39,179147,Fifth bracket
South Africa,2025,za-2025,South Africa 2025,857901,1817000,41,251258,Sixth bracket
South Africa,2025,za-2025,South Africa 2025,1817001,,45,644489,Seventh bracket
"#;

    const REBATES_CSV: &str = "country,tax_year,primary,secondary,tertiary,medical_aid\n\
                               South Africa,2025,17235,9444,3145,347\n";

    fn brackets(csv: &str) -> Vec<TaxBracketRecord> {
        TaxScheduleLoader::parse_brackets(csv.as_bytes()).expect("Failed to parse CSV")
    }

    fn rebates(csv: &str) -> Vec<RebateRecord> {
        TaxScheduleLoader::parse_rebates(csv.as_bytes()).expect("Failed to parse CSV")
    }

    // =========================================================================
    // parse
    // =========================================================================

    #[test]
    fn test_parse_single_bracket() {
        let csv = format!("{HEADER}Namibia,2025,na-2025,Namibia 2025,0,50000,0,0,Tax exempt");

        let records = brackets(&csv);

        assert_eq!(
            records,
            vec![TaxBracketRecord {
                country: "Namibia".to_string(),
                tax_year: "2025".to_string(),
                schedule_id: "na-2025".to_string(),
                schedule_name: "Namibia 2025".to_string(),
                from_amount: dec!(0),
                to_amount: Some(dec!(50000)),
                rate: dec!(0),
                base_amount: dec!(0),
                description: "Tax exempt".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_unbounded_bracket() {
        let csv = format!("{HEADER}Namibia,2025,na-2025,Namibia 2025,1500001,,37,429000,Sixth bracket");

        let records = brackets(&csv);

        assert_eq!(records[0].to_amount, None);
        assert_eq!(records[0].base_amount, dec!(429000));
    }

    #[test]
    fn test_parse_trims_fields() {
        let csv = format!("{HEADER}Namibia , 2025 ,na-2025,Namibia 2025, 0 , 50000 ,0,0,Tax exempt");

        let records = brackets(&csv);

        assert_eq!(records[0].country, "Namibia");
        assert_eq!(records[0].tax_year, "2025");
        assert_eq!(records[0].to_amount, Some(dec!(50000)));
    }

    #[test]
    fn test_parse_empty_description() {
        let csv = format!("{HEADER}Namibia,2025,na-2025,Namibia 2025,0,50000,0,0,");

        assert_eq!(brackets(&csv)[0].description, "");
    }

    #[test]
    fn test_parse_rebates_with_missing_optional_columns() {
        let records = rebates("country,tax_year,primary,secondary,tertiary,medical_aid\nLesotho,2025,1000,,,\n");

        assert_eq!(
            records,
            vec![RebateRecord {
                country: "Lesotho".to_string(),
                tax_year: "2025".to_string(),
                primary: dec!(1000),
                secondary: None,
                tertiary: None,
                medical_aid: None,
            }]
        );
    }

    #[test]
    fn test_parse_invalid_csv_missing_column() {
        let csv = "country,tax_year,from_amount\nNamibia,2025,0";

        let err = TaxScheduleLoader::parse_brackets(csv.as_bytes())
            .expect_err("Should fail for missing column");

        let TaxScheduleLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "Expected 'missing field' in error, got: {}", msg);
    }

    #[test]
    fn test_parse_invalid_csv_bad_decimal() {
        let csv = format!("{HEADER}Namibia,2025,na-2025,Namibia 2025,0,fifty,0,0,Tax exempt");

        let err = TaxScheduleLoader::parse_brackets(csv.as_bytes())
            .expect_err("Should fail for invalid decimal");

        assert!(matches!(err, TaxScheduleLoaderError::CsvParse(_)), "got: {err:?}");
    }

    #[test]
    fn test_parse_empty_csv() {
        assert!(brackets(HEADER).is_empty());
    }

    // =========================================================================
    // build
    // =========================================================================

    #[test]
    fn test_build_matches_builtin_schedules() {
        let mut records = brackets(SOUTH_AFRICA_CSV);
        records.extend(brackets(NAMIBIA_CSV));

        let schedules = TaxScheduleLoader::build(&records, &rebates(REBATES_CSV)).unwrap();

        assert_eq!(schedules, vec![namibia_2025(), south_africa_2025()]);
    }

    #[test]
    fn test_build_without_rebates() {
        let schedules = TaxScheduleLoader::build(&brackets(SOUTH_AFRICA_CSV), &[]).unwrap();

        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].rebates, None);
    }

    #[test]
    fn test_build_numbers_brackets_per_schedule() {
        let mut records = brackets(NAMIBIA_CSV);
        records.extend(brackets(SOUTH_AFRICA_CSV));

        let schedules = TaxScheduleLoader::build(&records, &[]).unwrap();

        for schedule in &schedules {
            let ids: Vec<_> = schedule.brackets.iter().map(|b| b.id.as_str()).collect();
            assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7"], "{}", schedule.name);
        }
    }

    #[test]
    fn test_build_rejects_orphan_rebates() {
        let result = TaxScheduleLoader::build(&brackets(NAMIBIA_CSV), &rebates(REBATES_CSV));

        assert!(matches!(
            result,
            Err(TaxScheduleLoaderError::OrphanRebates(key)) if key == ScheduleKey::new("South Africa", "2025")
        ));
    }

    #[test]
    fn test_build_rejects_duplicate_rebates() {
        let mut records = rebates(REBATES_CSV);
        records.extend(rebates(REBATES_CSV));

        let result = TaxScheduleLoader::build(&brackets(SOUTH_AFRICA_CSV), &records);

        assert!(matches!(result, Err(TaxScheduleLoaderError::DuplicateRebates(_))));
    }

    #[test]
    fn test_build_rejects_inconsistent_schedule_name() {
        let mut records = brackets(NAMIBIA_CSV);
        records[3].schedule_name = "Namibia 2025/26".to_string();

        let result = TaxScheduleLoader::build(&records, &[]);

        match result {
            Err(TaxScheduleLoaderError::InconsistentSchedule { field, first, other, .. }) => {
                assert_eq!(field, "schedule_name");
                assert_eq!(first, "Namibia 2025");
                assert_eq!(other, "Namibia 2025/26");
            }
            other => panic!("expected InconsistentSchedule, got {other:?}"),
        }
    }

    #[test]
    fn test_build_rejects_invalid_schedule() {
        let mut records = brackets(NAMIBIA_CSV);
        records.pop();

        let result = TaxScheduleLoader::build(&records, &[]);

        assert!(matches!(
            result,
            Err(TaxScheduleLoaderError::InvalidSchedule(
                ScheduleValidationError::MissingUnboundedBracket(_)
            ))
        ));
    }

    #[test]
    fn test_build_keeps_file_order() {
        let mut records = brackets(NAMIBIA_CSV);
        records.swap(0, 1);

        let result = TaxScheduleLoader::build(&records, &[]);

        assert!(matches!(result, Err(TaxScheduleLoaderError::InvalidSchedule(_))));
    }

    #[test]
    fn test_build_empty_input() {
        assert!(TaxScheduleLoader::build(&[], &[]).unwrap().is_empty());
    }
}
