use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use tracing::debug;

use super::builtin::builtin_schedules;
use super::validation::{ScheduleValidationError, validate_schedule};
use crate::models::{ScheduleKey, TaxSchedule};

/// Read-only lookup of tax schedules by (country, tax year).
///
/// A miss is `None`: callers routinely probe for jurisdictions or years that
/// have not been published yet.
pub trait ScheduleSource: Send + Sync {
    /// Exact, case-sensitive lookup.
    fn get_schedule(
        &self,
        country: &str,
        tax_year: &str,
    ) -> Option<Arc<TaxSchedule>>;

    /// Every key this source can answer for, sorted.
    fn schedule_keys(&self) -> Vec<ScheduleKey>;
}

/// Immutable table of validated schedules.
///
/// Schedules are handed out as `Arc`s, so a calculation keeps seeing the
/// schedule it started with even if the caller swaps in a newer source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleSource {
    schedules: BTreeMap<ScheduleKey, Arc<TaxSchedule>>,
}

static BUILTIN: LazyLock<InMemoryScheduleSource> = LazyLock::new(|| {
    let mut source = InMemoryScheduleSource::new();
    for schedule in builtin_schedules() {
        source.insert_unchecked(schedule);
    }
    source
});

impl InMemoryScheduleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schedules shipped with the engine.
    pub fn builtin() -> Self {
        (*BUILTIN).clone()
    }

    /// Builds a source from `schedules`, validating each one.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScheduleValidationError`] encountered.
    pub fn from_schedules(
        schedules: impl IntoIterator<Item = TaxSchedule>
    ) -> Result<Self, ScheduleValidationError> {
        let mut source = Self::new();
        for schedule in schedules {
            source.insert(schedule)?;
        }
        Ok(source)
    }

    /// Adds `schedule`, replacing any schedule with the same key.
    ///
    /// Returns the replaced schedule, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleValidationError`] if the schedule is malformed; the
    /// source is left unchanged.
    pub fn insert(
        &mut self,
        schedule: TaxSchedule,
    ) -> Result<Option<Arc<TaxSchedule>>, ScheduleValidationError> {
        validate_schedule(&schedule)?;
        Ok(self.insert_unchecked(schedule))
    }

    // Built-in data is covered by tests instead of checked at startup.
    fn insert_unchecked(
        &mut self,
        schedule: TaxSchedule,
    ) -> Option<Arc<TaxSchedule>> {
        self.schedules.insert(schedule.key(), Arc::new(schedule))
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn schedules(&self) -> impl Iterator<Item = &Arc<TaxSchedule>> {
        self.schedules.values()
    }
}

impl ScheduleSource for InMemoryScheduleSource {
    fn get_schedule(
        &self,
        country: &str,
        tax_year: &str,
    ) -> Option<Arc<TaxSchedule>> {
        let schedule = self
            .schedules
            .get(&ScheduleKey::new(country, tax_year))
            .cloned();
        if schedule.is_none() {
            debug!(country, tax_year, "no tax schedule found");
        }
        schedule
    }

    fn schedule_keys(&self) -> Vec<ScheduleKey> {
        self.schedules.keys().cloned().collect()
    }
}

/// Looks up one of the built-in schedules.
///
/// ```
/// use paye_core::get_schedule;
///
/// assert!(get_schedule("Namibia", "2025").is_some());
/// assert!(get_schedule("namibia", "2025").is_none());
/// ```
pub fn get_schedule(
    country: &str,
    tax_year: &str,
) -> Option<Arc<TaxSchedule>> {
    BUILTIN.get_schedule(country, tax_year)
}

/// Shared handle to the built-in table.
pub fn builtin_source() -> &'static InMemoryScheduleSource {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::schedules::builtin::{namibia_2025, south_africa_2025};

    // =========================================================================
    // builtin lookup
    // =========================================================================

    #[test]
    fn builtin_finds_south_africa_2025() {
        let schedule = get_schedule("South Africa", "2025").expect("schedule");

        assert_eq!(schedule.id, "za-2025");
        assert_eq!(schedule.brackets.len(), 7);
        assert_eq!(schedule.rebates.as_ref().map(|r| r.primary), Some(dec!(17235)));
    }

    #[test]
    fn builtin_finds_namibia_2025() {
        let schedule = get_schedule("Namibia", "2025").expect("schedule");

        assert_eq!(schedule.id, "na-2025");
        assert!(schedule.rebates.is_none());
    }

    #[test]
    fn unknown_year_is_not_found() {
        assert!(get_schedule("Namibia", "2024").is_none());
    }

    #[test]
    fn unknown_country_is_not_found() {
        assert!(get_schedule("Botswana", "2025").is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(get_schedule("south africa", "2025").is_none());
        assert!(get_schedule("South Africa ", "2025").is_none());
    }

    #[test]
    fn builtin_keys_are_sorted() {
        let keys = InMemoryScheduleSource::builtin().schedule_keys();

        assert_eq!(
            keys,
            vec![
                ScheduleKey::new("Namibia", "2025"),
                ScheduleKey::new("South Africa", "2025"),
            ]
        );
    }

    #[test]
    fn builtin_handles_share_schedules() {
        let first = get_schedule("Namibia", "2025").expect("schedule");
        let second = builtin_source().get_schedule("Namibia", "2025").expect("schedule");

        assert!(Arc::ptr_eq(&first, &second));
    }

    // =========================================================================
    // insert / from_schedules
    // =========================================================================

    #[test]
    fn new_source_is_empty() {
        let source = InMemoryScheduleSource::new();

        assert!(source.is_empty());
        assert!(source.get_schedule("Namibia", "2025").is_none());
    }

    #[test]
    fn from_schedules_builds_lookup() {
        let source =
            InMemoryScheduleSource::from_schedules([namibia_2025(), south_africa_2025()]).unwrap();

        assert_eq!(source.len(), 2);
        assert!(source.get_schedule("South Africa", "2025").is_some());
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut source = InMemoryScheduleSource::from_schedules([namibia_2025()]).unwrap();
        let mut revised = namibia_2025();
        revised.name = "Namibia 2025 (revised)".to_string();

        let replaced = source.insert(revised).unwrap();

        assert_eq!(replaced.map(|s| s.name.clone()), Some("Namibia 2025".to_string()));
        assert_eq!(source.len(), 1);
        assert_eq!(
            source.get_schedule("Namibia", "2025").unwrap().name,
            "Namibia 2025 (revised)"
        );
    }

    #[test]
    fn insert_rejects_malformed_schedule() {
        let mut source = InMemoryScheduleSource::new();
        let mut malformed = namibia_2025();
        malformed.brackets.pop();

        let result = source.insert(malformed);

        assert_eq!(
            result,
            Err(ScheduleValidationError::MissingUnboundedBracket(ScheduleKey::new(
                "Namibia", "2025"
            )))
        );
        assert!(source.is_empty());
    }

    #[test]
    fn held_schedule_survives_replacement() {
        let mut source = InMemoryScheduleSource::from_schedules([namibia_2025()]).unwrap();
        let in_flight = source.get_schedule("Namibia", "2025").unwrap();

        let mut revised = namibia_2025();
        revised.name = "revised".to_string();
        source.insert(revised).unwrap();

        assert_eq!(in_flight.name, "Namibia 2025");
    }
}
