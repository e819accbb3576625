//! Accessors over raw simulation report output: the flat timestamped report
//! table and the string-keyed tabular summary dump, both concatenated across
//! archetypes with the archetype promoted into the row key.

pub mod data;
pub mod tabular;

pub use data::{
    Predicate, ReportData, ReportDataFilter, ReportDataRow, SortColumn, HEATING_METERS,
};
pub use tabular::{CellValue, RowKey, TabularData, TabularRow, WideTable};

use crate::errors::AggregationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw simulation output: one result object per archetype identifier.
pub type SimulationResults = IndexMap<String, ArchetypeResult>;

/// The named tables of one archetype's raw result, as produced by the
/// external result loader.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ArchetypeResult {
    #[serde(rename = "ReportData", default)]
    pub report_data: Vec<RawReportValue>,
    #[serde(rename = "ReportDataDictionary", default)]
    pub report_data_dictionary: Vec<RawDictionaryEntry>,
    #[serde(rename = "TabularDataWithStrings", default)]
    pub tabular_data: Vec<RawTabularRow>,
}

/// A timestamped value, foreign-keyed to the report data dictionary.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawReportValue {
    pub report_data_index: i64,
    pub time_index: i64,
    pub report_data_dictionary_index: i64,
    pub value: String,
}

/// Metadata describing one reported signal.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawDictionaryEntry {
    pub report_data_dictionary_index: i64,
    pub is_meter: i64,
    #[serde(rename = "Type")]
    pub kind: String,
    pub index_group: String,
    pub timestep_type: String,
    #[serde(default)]
    pub key_value: String,
    pub name: String,
    pub reporting_frequency: String,
    #[serde(default)]
    pub schedule_name: String,
    #[serde(default)]
    pub units: String,
}

/// A generic key-value record from a simulation summary section.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawTabularRow {
    pub report_name: String,
    pub table_name: String,
    pub row_name: String,
    pub column_name: String,
    pub value: String,
}

/// Joins each archetype's report values with their dictionary metadata and
/// concatenates the result into one flat [`ReportData`] table. A value row
/// referencing a missing dictionary entry is a structural error.
pub fn collect_report_data(results: &SimulationResults) -> Result<ReportData, AggregationError> {
    let mut rows = Vec::new();
    for (archetype, result) in results {
        let dictionary: IndexMap<i64, &RawDictionaryEntry> = result
            .report_data_dictionary
            .iter()
            .map(|entry| (entry.report_data_dictionary_index, entry))
            .collect();
        for value in &result.report_data {
            let entry = dictionary
                .get(&value.report_data_dictionary_index)
                .ok_or_else(|| AggregationError::MissingDictionaryEntry {
                    archetype: archetype.clone(),
                    index: value.report_data_index,
                    dictionary_index: value.report_data_dictionary_index,
                })?;
            rows.push(ReportDataRow {
                archetype: archetype.clone(),
                report_data_index: value.report_data_index,
                time_index: value.time_index,
                report_data_dictionary_index: value.report_data_dictionary_index,
                value: value.value.clone(),
                is_meter: entry.is_meter,
                kind: entry.kind.clone(),
                index_group: entry.index_group.clone(),
                timestep_type: entry.timestep_type.clone(),
                key_value: entry.key_value.clone(),
                name: entry.name.clone(),
                reporting_frequency: entry.reporting_frequency.clone(),
                schedule_name: entry.schedule_name.clone(),
                units: entry.units.clone(),
            });
        }
    }
    Ok(ReportData::new(rows))
}

/// Concatenates each archetype's TabularDataWithStrings rows into one flat
/// [`TabularData`] table.
pub fn collect_tabular_data(results: &SimulationResults) -> TabularData {
    TabularData::new(results.iter().flat_map(|(archetype, result)| {
        result.tabular_data.iter().map(|row| TabularRow {
            archetype: archetype.clone(),
            report_name: row.report_name.clone(),
            table_name: row.table_name.clone(),
            row_name: row.row_name.clone(),
            column_name: row.column_name.clone(),
            value: row.value.clone(),
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> SimulationResults {
        let raw = serde_json::json!({
            "A1": {
                "ReportData": [
                    {"ReportDataIndex": 1, "TimeIndex": 1,
                     "ReportDataDictionaryIndex": 10, "Value": "100"}
                ],
                "ReportDataDictionary": [
                    {"ReportDataDictionaryIndex": 10, "IsMeter": 1, "Type": "Sum",
                     "IndexGroup": "Facility:HVAC", "TimestepType": "Zone",
                     "Name": "Heating:Gas", "ReportingFrequency": "Hourly",
                     "Units": "J"}
                ],
                "TabularDataWithStrings": [
                    {"ReportName": "Initialization Summary", "TableName": "Zone Information",
                     "RowName": "1", "ColumnName": "Zone Name", "Value": " CORE_ZN "}
                ]
            }
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn report_rows_are_joined_with_dictionary_metadata() {
        let report = collect_report_data(&results()).unwrap();
        let row = &report.rows()[0];
        assert_eq!(row.archetype, "A1");
        assert_eq!(row.name, "Heating:Gas");
        assert_eq!(row.units, "J");
        assert_eq!(row.numeric_value(), Some(100.0));
    }

    #[test]
    fn dangling_dictionary_reference_is_a_structural_error() {
        let mut results = results();
        results["A1"].report_data_dictionary.clear();
        let error = collect_report_data(&results).unwrap_err();
        assert!(matches!(
            error,
            AggregationError::MissingDictionaryEntry { .. }
        ));
    }

    #[test]
    fn tabular_rows_are_stripped_and_keyed_by_archetype() {
        let tabular = collect_tabular_data(&results());
        let row = &tabular.rows()[0];
        assert_eq!(row.archetype, "A1");
        assert_eq!(row.value, "CORE_ZN");
    }
}
