//! Recovers building archetype templates from raw simulation report output.
//!
//! The pipeline joins each archetype's flat report tables, extracts nominal
//! component records per zone, classifies zones into types, reduces each
//! (archetype, zone type) group with floor-area-weighted statistics and
//! assembles the result into a referenced template document. Load series can
//! additionally be shaped into [`profile::EnergyProfile`] duration curves.

pub mod aggregation;
pub mod errors;
pub mod output;
pub mod profile;
pub mod report;
pub mod template;

pub use crate::aggregation::{CorePerimeterClassifier, ZoneClassifier};
pub use crate::profile::{EnergyProfile, Frequency, ProfileOptions};
pub use crate::report::{
    collect_report_data, collect_tabular_data, ArchetypeResult, ReportData, ReportDataFilter,
    SimulationResults, TabularData,
};
pub use crate::template::{AggregationOutputs, ScheduleLibrary, UmiTemplate};

use crate::aggregation::{
    zone_conditioning, zone_domestic_hot_water, zone_loads, zone_ventilation,
};
use crate::report::WideTable;

/// Runs the whole recovery pipeline over raw results: report join, zone
/// aggregation under `classifier`, and template assembly against the
/// schedule library. `water_use` carries the per-zone hot water records the
/// simulation reports do not tabulate; pass an empty table when absent.
pub fn build_template(
    name: &str,
    results: &SimulationResults,
    classifier: &dyn ZoneClassifier,
    schedules: &ScheduleLibrary,
    water_use: &WideTable,
) -> anyhow::Result<UmiTemplate> {
    let report = collect_report_data(results)?;
    let tabular = collect_tabular_data(results);
    let outputs = AggregationOutputs {
        loads: zone_loads(&tabular, classifier),
        ventilation: zone_ventilation(&tabular, classifier),
        conditioning: zone_conditioning(&report, &tabular, classifier),
        hot_water: zone_domestic_hot_water(&tabular, water_use, classifier),
    };
    Ok(UmiTemplate::from_aggregation(name, &outputs, schedules))
}
