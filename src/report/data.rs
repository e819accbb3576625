use crate::errors::AggregationError;
use crate::profile::{EnergyProfile, Frequency, ProfileOptions};
use indexmap::IndexMap;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;
use tracing::debug;

/// The three meters summed into a heating load profile.
pub const HEATING_METERS: [&str; 3] = [
    "Heating:Electricity",
    "Heating:Gas",
    "Heating:DistrictHeating",
];

/// One row of the flat report table: a timestamped value joined with its
/// dictionary metadata, promoted with the archetype it belongs to.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportDataRow {
    pub archetype: String,
    pub report_data_index: i64,
    pub time_index: i64,
    pub report_data_dictionary_index: i64,
    /// Stored as reported; coerced on demand via [`Self::numeric_value`].
    pub value: String,
    pub is_meter: i64,
    #[serde(rename = "Type")]
    pub kind: String,
    pub index_group: String,
    pub timestep_type: String,
    pub key_value: String,
    pub name: String,
    pub reporting_frequency: String,
    #[serde(default)]
    pub schedule_name: String,
    pub units: String,
}

impl ReportDataRow {
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

/// A per-column condition: equality against one value, or a logical OR over a
/// set of values.
#[derive(Clone, Debug)]
pub enum Predicate<T> {
    Is(T),
    AnyOf(Vec<T>),
}

impl<T: PartialEq> Predicate<T> {
    pub fn matches(&self, candidate: &T) -> bool {
        match self {
            Self::Is(value) => candidate == value,
            Self::AnyOf(values) => values.contains(candidate),
        }
    }
}

impl From<&str> for Predicate<String> {
    fn from(value: &str) -> Self {
        Self::Is(value.to_string())
    }
}

impl From<String> for Predicate<String> {
    fn from(value: String) -> Self {
        Self::Is(value)
    }
}

impl<const N: usize> From<[&str; N]> for Predicate<String> {
    fn from(values: [&str; N]) -> Self {
        Self::AnyOf(values.iter().map(|value| value.to_string()).collect())
    }
}

impl From<i64> for Predicate<i64> {
    fn from(value: i64) -> Self {
        Self::Is(value)
    }
}

impl<const N: usize> From<[i64; N]> for Predicate<i64> {
    fn from(values: [i64; N]) -> Self {
        Self::AnyOf(values.to_vec())
    }
}

/// Conditions for the generic report filter. Per-column conditions are
/// combined with AND; a column without a predicate is unconstrained.
#[derive(Clone, Debug, Default)]
pub struct ReportDataFilter {
    archetype: Option<Predicate<String>>,
    report_data_index: Option<Predicate<i64>>,
    time_index: Option<Predicate<i64>>,
    report_data_dictionary_index: Option<Predicate<i64>>,
    value: Option<Predicate<String>>,
    is_meter: Option<Predicate<i64>>,
    kind: Option<Predicate<String>>,
    index_group: Option<Predicate<String>>,
    timestep_type: Option<Predicate<String>>,
    key_value: Option<Predicate<String>>,
    name: Option<Predicate<String>>,
    reporting_frequency: Option<Predicate<String>>,
    schedule_name: Option<Predicate<String>>,
    units: Option<Predicate<String>>,
}

macro_rules! filter_setter {
    ($setter:ident, $field:ident, $t:ty) => {
        pub fn $setter(mut self, predicate: impl Into<Predicate<$t>>) -> Self {
            self.$field = Some(predicate.into());
            self
        }
    };
}

impl ReportDataFilter {
    filter_setter!(archetype, archetype, String);
    filter_setter!(report_data_index, report_data_index, i64);
    filter_setter!(time_index, time_index, i64);
    filter_setter!(
        report_data_dictionary_index,
        report_data_dictionary_index,
        i64
    );
    filter_setter!(value, value, String);
    filter_setter!(is_meter, is_meter, i64);
    filter_setter!(kind, kind, String);
    filter_setter!(index_group, index_group, String);
    filter_setter!(timestep_type, timestep_type, String);
    filter_setter!(key_value, key_value, String);
    filter_setter!(name, name, String);
    filter_setter!(reporting_frequency, reporting_frequency, String);
    filter_setter!(schedule_name, schedule_name, String);
    filter_setter!(units, units, String);

    pub fn matches(&self, row: &ReportDataRow) -> bool {
        fn check<T: PartialEq>(predicate: &Option<Predicate<T>>, candidate: &T) -> bool {
            predicate
                .as_ref()
                .map(|predicate| predicate.matches(candidate))
                .unwrap_or(true)
        }
        check(&self.archetype, &row.archetype)
            && check(&self.report_data_index, &row.report_data_index)
            && check(&self.time_index, &row.time_index)
            && check(
                &self.report_data_dictionary_index,
                &row.report_data_dictionary_index,
            )
            && check(&self.value, &row.value)
            && check(&self.is_meter, &row.is_meter)
            && check(&self.kind, &row.kind)
            && check(&self.index_group, &row.index_group)
            && check(&self.timestep_type, &row.timestep_type)
            && check(&self.key_value, &row.key_value)
            && check(&self.name, &row.name)
            && check(&self.reporting_frequency, &row.reporting_frequency)
            && check(&self.schedule_name, &row.schedule_name)
            && check(&self.units, &row.units)
    }
}

/// Column used to order a recovered time series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum SortColumn {
    #[default]
    #[strum(serialize = "TimeIndex")]
    TimeIndex,
    #[strum(serialize = "Value")]
    Value,
}

/// The flat report table concatenated across archetypes. Rows are immutable
/// once loaded; filtering returns a new table unless [`Self::retain`] is used.
#[derive(Clone, Debug, Default)]
pub struct ReportData {
    rows: Vec<ReportDataRow>,
}

impl ReportData {
    pub fn new(rows: Vec<ReportDataRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ReportDataRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a new table with the rows matching all supplied predicates.
    pub fn filter(&self, filter: &ReportDataFilter) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| filter.matches(row))
                .cloned()
                .collect(),
        }
    }

    /// In-place variant of [`Self::filter`].
    pub fn retain(&mut self, filter: &ReportDataFilter) {
        self.rows.retain(|row| filter.matches(row));
    }

    /// All schedule-value signals. The schedule name lives in KeyValue.
    pub fn schedules(&self) -> Self {
        self.filter(&ReportDataFilter::default().name("Schedule Value"))
    }

    /// Recovers a clean per-archetype time series for one signal: filters to
    /// rows matching both `name` and `key_value`, sorts by `by`, and re-keys
    /// each archetype partition by consecutive time step.
    pub fn sorted_values(
        &self,
        key_value: &str,
        name: &str,
        by: SortColumn,
        ascending: bool,
    ) -> IndexMap<String, Vec<ReportDataRow>> {
        let filtered = self.filter(
            &ReportDataFilter::default()
                .name(name)
                .key_value(key_value),
        );
        let mut partitions: IndexMap<String, Vec<ReportDataRow>> = IndexMap::new();
        for row in filtered.rows {
            partitions.entry(row.archetype.clone()).or_default().push(row);
        }
        for rows in partitions.values_mut() {
            match by {
                SortColumn::TimeIndex => rows.sort_by_key(|row| row.time_index),
                SortColumn::Value => rows.sort_by_key(|row| {
                    OrderedFloat(row.numeric_value().unwrap_or(f64::NAN))
                }),
            }
            if !ascending {
                rows.reverse();
            }
        }
        partitions
    }

    /// Sums the three heating meters into one load series per archetype,
    /// keyed by (Archetype, TimeIndex). All matched rows must agree on their
    /// unit string; mixing units is a hard error, never a silent average.
    pub fn heating_load(
        &self,
        options: &ProfileOptions,
    ) -> Result<EnergyProfile, AggregationError> {
        let heating = self.filter(&ReportDataFilter::default().name(HEATING_METERS));
        let units: Vec<String> = heating
            .rows
            .iter()
            .map(|row| row.units.clone())
            .unique()
            .collect();
        if units.len() > 1 {
            return Err(AggregationError::MixedUnits { units });
        }
        let frequency = heating
            .rows
            .first()
            .map(|row| Frequency::from_report(&row.reporting_frequency))
            .unwrap_or_default();

        let mut sums: IndexMap<String, BTreeMap<i64, f64>> = IndexMap::new();
        for row in &heating.rows {
            if let Some(value) = row.numeric_value() {
                *sums
                    .entry(row.archetype.clone())
                    .or_default()
                    .entry(row.time_index)
                    .or_insert(0.0) += value;
            }
        }
        let partitions: IndexMap<String, Vec<f64>> = sums
            .into_iter()
            .map(|(archetype, by_time)| (archetype, by_time.into_values().collect()))
            .collect();

        let units = units.into_iter().next().unwrap_or_default();
        debug!("returned heating load in units of {units:?}");
        let mut profile =
            EnergyProfile::from_partitions("Heating Load", &units, frequency, partitions);
        profile
            .postprocess(options)
            .map_err(|error| AggregationError::FailureInAggregation(error.into()))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    pub(crate) fn meter_row(
        archetype: &str,
        index: i64,
        time_index: i64,
        name: &str,
        value: &str,
        units: &str,
    ) -> ReportDataRow {
        ReportDataRow {
            archetype: archetype.to_string(),
            report_data_index: index,
            time_index,
            report_data_dictionary_index: index,
            value: value.to_string(),
            is_meter: 1,
            kind: "Sum".to_string(),
            index_group: "Facility:HVAC".to_string(),
            timestep_type: "Zone".to_string(),
            key_value: String::new(),
            name: name.to_string(),
            reporting_frequency: "Hourly".to_string(),
            schedule_name: String::new(),
            units: units.to_string(),
        }
    }

    #[fixture]
    fn report() -> ReportData {
        ReportData::new(vec![
            meter_row("A1", 1, 1, "Heating:Electricity", "100", "J"),
            meter_row("A1", 2, 2, "Heating:Electricity", "200", "J"),
            meter_row("A1", 3, 1, "Heating:Gas", "50", "J"),
            meter_row("A1", 4, 2, "Heating:Gas", "0", "J"),
            meter_row("A1", 5, 1, "Cooling:Electricity", "75", "J"),
        ])
    }

    #[rstest]
    fn filter_combines_or_within_a_column_with_and_across_columns(report: ReportData) {
        let filtered = report.filter(
            &ReportDataFilter::default()
                .name(["Heating:Electricity", "Heating:Gas"])
                .time_index(1),
        );
        assert_eq!(filtered.rows().len(), 2);
        assert!(filtered.rows().iter().all(|row| row.time_index == 1));
    }

    #[rstest]
    fn unconstrained_filter_returns_everything(report: ReportData) {
        assert_eq!(
            report.filter(&ReportDataFilter::default()).rows().len(),
            report.rows().len()
        );
    }

    #[rstest]
    fn retain_filters_in_place(mut report: ReportData) {
        report.retain(&ReportDataFilter::default().name("Cooling:Electricity"));
        assert_eq!(report.rows().len(), 1);
    }

    #[rstest]
    fn heating_load_sums_meters_per_time_index(report: ReportData) {
        let profile = report.heating_load(&ProfileOptions::default()).unwrap();
        assert_eq!(profile.values("A1").unwrap(), &[150.0, 200.0]);
        assert_eq!(profile.units(), "J");
        assert_eq!(profile.frequency(), Frequency::Hourly);
    }

    #[rstest]
    fn heating_load_rejects_mixed_units(mut report: ReportData) {
        report = ReportData::new(
            report
                .rows()
                .iter()
                .cloned()
                .chain([meter_row("A1", 6, 3, "Heating:Gas", "10", "kWh")])
                .collect(),
        );
        let error = report.heating_load(&ProfileOptions::default()).unwrap_err();
        assert!(matches!(error, AggregationError::MixedUnits { .. }));
    }

    #[rstest]
    fn sorted_values_reindexes_per_archetype() {
        let report = ReportData::new(vec![
            {
                let mut row = meter_row("A1", 1, 3, "Schedule Value", "0.4", "");
                row.key_value = "OCCUPY-1".to_string();
                row
            },
            {
                let mut row = meter_row("A1", 2, 1, "Schedule Value", "0.9", "");
                row.key_value = "OCCUPY-1".to_string();
                row
            },
        ]);
        let sorted = report.sorted_values("OCCUPY-1", "Schedule Value", SortColumn::TimeIndex, true);
        let times: Vec<i64> = sorted["A1"].iter().map(|row| row.time_index).collect();
        assert_eq!(times, vec![1, 3]);
    }
}
