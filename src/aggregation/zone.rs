//! Zone-level aggregation: the canonical zone-information table is joined
//! with the nominal component records on (archetype, zone name), each zone is
//! classified into a zone type by an injected strategy, and every group of
//! zones sharing (archetype, zone type) is reduced to one record with
//! floor-area-times-multiplier weighted statistics.
//!
//! Data sparsity is never fatal here: a missing section or column degrades
//! the affected statistic to NaN (or an absent schedule) with a logged
//! warning.

use crate::aggregation::nominal::{
    nominal_equipment, nominal_infiltration, nominal_lighting, nominal_people,
    nominal_ventilation,
};
use crate::aggregation::primitives::{combined_weight, top, weighted_mean};
use crate::report::{
    CellValue, ReportData, ReportDataFilter, RowKey, TabularData, WideTable,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

const FLOOR_AREA: &str = "Floor Area {m2}";
const WEIGHT_COLUMNS: &[&str] = &[FLOOR_AREA, "Zone Multiplier"];
const OCCUPANTS: &str = "# Zone Occupants";
const SETPOINT_AT_PEAK: &str = "Thermostat Setpoint Temperature at Peak Load";
const MIN_OUTDOOR_AIR: &str = "Minimum Outdoor Air Flow Rate";

/// The three meters feeding the cooling COP denominator.
pub const COOLING_METERS: [&str; 3] = [
    "Cooling:Electricity",
    "Cooling:Gas",
    "Cooling:DistrictCooling",
];

/// One zone of the canonical zone-information table, as seen by a
/// [`ZoneClassifier`].
pub struct ZoneRecord<'a> {
    pub archetype: &'a str,
    pub zone_name: &'a str,
    pub columns: &'a IndexMap<String, CellValue>,
}

/// Assigns each zone a zone-type label, or `None` to drop it from
/// aggregation entirely.
pub trait ZoneClassifier {
    fn classify(&self, record: &ZoneRecord<'_>) -> Option<String>;
}

/// Adapter letting a plain closure act as a classifier.
pub struct ClassifierFn<F>(pub F);

impl<F> ZoneClassifier for ClassifierFn<F>
where
    F: Fn(&ZoneRecord<'_>) -> Option<String>,
{
    fn classify(&self, record: &ZoneRecord<'_>) -> Option<String> {
        (self.0)(record)
    }
}

/// The default core/perimeter split: a zone whose name contains "core" or
/// whose exterior gross wall area is zero is "Core" (a basement counts as
/// core for the same reason), plenums and zones outside the total building
/// area are dropped, everything else is "Perimeter".
pub struct CorePerimeterClassifier;

impl ZoneClassifier for CorePerimeterClassifier {
    fn classify(&self, record: &ZoneRecord<'_>) -> Option<String> {
        let name = record.zone_name.to_lowercase();
        let exterior_wall = record
            .columns
            .get("Exterior Gross Wall Area {m2}")
            .and_then(CellValue::as_f64);
        if name.contains("core") || exterior_wall == Some(0.0) {
            return Some("Core".to_string());
        }
        let part_of_total = record
            .columns
            .get("Part of Total Building Area")
            .and_then(CellValue::as_str);
        if part_of_total == Some("No") || name.contains("plenum") {
            return None;
        }
        Some("Perimeter".to_string())
    }
}

/// The canonical zone table, keyed by (archetype, zone name). Zones flagged
/// as not part of the total building area are excluded from every aggregate.
pub fn zone_information(tabular: &TabularData) -> WideTable {
    let pivoted = tabular.pivot("Initialization Summary", "Zone Information");
    WideTable::from_rows(
        pivoted
            .rows()
            .iter()
            .filter(|(_, columns)| {
                columns
                    .get("Part of Total Building Area")
                    .and_then(CellValue::as_str)
                    == Some("Yes")
            })
            .map(|((archetype, row_name), columns)| {
                let zone = columns
                    .get("Zone Name")
                    .and_then(CellValue::as_str)
                    .unwrap_or(row_name.as_str());
                ((archetype.clone(), zone.to_string()), columns.clone())
            }),
    )
}

/// Internal loads of one (archetype, zone type) group: area-weighted power
/// and occupant densities with the schedule of the heaviest zone.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneLoadsRow {
    pub lighting_power_density: f64,
    pub lighting_schedule: Option<String>,
    pub people_density: f64,
    pub occupancy_schedule: Option<String>,
    pub equipment_power_density: f64,
    pub equipment_schedule: Option<String>,
}

pub fn zone_loads(
    tabular: &TabularData,
    classifier: &dyn ZoneClassifier,
) -> IndexMap<RowKey, ZoneLoadsRow> {
    let zones = zone_information(tabular);
    let lighting = nominal_lighting(tabular);
    let people = nominal_people(tabular);
    let equipment = nominal_equipment(tabular);

    classify_zones(&zones, classifier)
        .into_iter()
        .map(|((archetype, zone_type), group)| {
            let weights = zone_weights(&group);
            let row = ZoneLoadsRow {
                lighting_power_density: wmean_by_zone(&group, &weights, |zone| {
                    lighting
                        .cell(&archetype, zone, "Lights/Floor Area {W/m2}")
                        .as_f64()
                }),
                lighting_schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&lighting, &archetype, zone, "Schedule Name")
                }),
                people_density: wmean_by_zone(&group, &weights, |zone| {
                    people
                        .cell(&archetype, zone, "People/Floor Area {person/m2}")
                        .as_f64()
                }),
                occupancy_schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&people, &archetype, zone, "Schedule Name")
                }),
                equipment_power_density: wmean_by_zone(&group, &weights, |zone| {
                    equipment
                        .cell(&archetype, zone, "Equipment/Floor Area {W/m2}")
                        .as_f64()
                }),
                equipment_schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&equipment, &archetype, zone, "Schedule Name")
                }),
            };
            ((archetype, zone_type), row)
        })
        .collect()
}

/// Air exchange of one (archetype, zone type) group, split by mechanism.
/// Setpoint fields keep their [`CellValue`] shape: the simulation reports
/// either a temperature or a schedule name in the same column.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneVentilationRow {
    pub infiltration_ach: f64,
    pub infiltration_schedule: Option<String>,
    pub scheduled_ach: f64,
    pub scheduled_schedule: Option<String>,
    pub scheduled_setpoint: CellValue,
    pub natural_ach: f64,
    pub natural_schedule: Option<String>,
    pub natural_max_outdoor_temp: CellValue,
    pub natural_min_outdoor_temp: CellValue,
    pub natural_zone_setpoint: CellValue,
}

pub fn zone_ventilation(
    tabular: &TabularData,
    classifier: &dyn ZoneClassifier,
) -> IndexMap<RowKey, ZoneVentilationRow> {
    let zones = zone_information(tabular);
    let infiltration = nominal_infiltration(tabular);
    let ventilation = nominal_ventilation(tabular);

    classify_zones(&zones, classifier)
        .into_iter()
        .map(|((archetype, zone_type), group)| {
            let weights = zone_weights(&group);
            let ach = "ACH - Air Changes per Hour";
            let row = ZoneVentilationRow {
                infiltration_ach: wmean_by_zone(&group, &weights, |zone| {
                    infiltration.cell(&archetype, zone, ach).as_f64()
                }),
                infiltration_schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&infiltration, &archetype, zone, "Schedule Name")
                }),
                scheduled_ach: wmean_by_zone(&group, &weights, |zone| {
                    ventilation.scheduled.cell(&archetype, zone, ach).as_f64()
                }),
                scheduled_schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&ventilation.scheduled, &archetype, zone, "Schedule Name")
                }),
                scheduled_setpoint: top_cell(
                    &group,
                    &weights,
                    &ventilation.scheduled,
                    &archetype,
                    "Minimum Indoor Temperature{C}/Schedule",
                ),
                natural_ach: wmean_by_zone(&group, &weights, |zone| {
                    ventilation.natural.cell(&archetype, zone, ach).as_f64()
                }),
                natural_schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&ventilation.natural, &archetype, zone, "Schedule Name")
                }),
                natural_max_outdoor_temp: top_cell(
                    &group,
                    &weights,
                    &ventilation.natural,
                    &archetype,
                    "Maximum Outdoor Temperature{C}/Schedule",
                ),
                natural_min_outdoor_temp: top_cell(
                    &group,
                    &weights,
                    &ventilation.natural,
                    &archetype,
                    "Minimum Outdoor Temperature{C}/Schedule",
                ),
                natural_zone_setpoint: top_cell(
                    &group,
                    &weights,
                    &ventilation.natural,
                    &archetype,
                    "Minimum Indoor Temperature{C}/Schedule",
                ),
            };
            ((archetype, zone_type), row)
        })
        .collect()
}

/// Design-day setpoints per (archetype, zone name), one table per mode, from
/// the HVAC sizing summary.
#[derive(Clone, Debug, Default)]
pub struct ZoneSetpoints {
    pub cooling: WideTable,
    pub heating: WideTable,
}

pub fn zone_setpoint(tabular: &TabularData) -> ZoneSetpoints {
    ZoneSetpoints {
        cooling: tabular.pivot("HVACSizingSummary", "Zone Sensible Cooling"),
        heating: tabular.pivot("HVACSizingSummary", "Zone Sensible Heating"),
    }
}

/// Heating and cooling system COP mapped onto zones.
///
/// The system efficiency is the air-system total output energy over the
/// metered input energy of the archetype, apportioned per system by its
/// share of the total output. Zones are matched to their air loop through
/// the ventilation-parameters summary. Requires a full-year run with the
/// heating/cooling meters reported.
pub fn zone_cop(report: &ReportData, tabular: &TabularData) -> WideTable {
    let heating = system_cop(
        report,
        "Air System Total Heating Energy",
        &crate::report::HEATING_METERS,
    );
    let cooling = system_cop(report, "Air System Total Cooling Energy", &COOLING_METERS);

    WideTable::from_rows(tabular.rows().iter().filter_map(|row| {
        if row.report_name != "Standard62.1Summary"
            || row.table_name != "System Ventilation Parameters"
            || row.column_name != "AirLoop Name"
        {
            return None;
        }
        let key = (row.archetype.clone(), row.row_name.clone());
        let system = (row.archetype.clone(), row.value.clone());
        let mut columns = IndexMap::new();
        columns.insert(
            "COP Heating".to_string(),
            heating.get(&system).copied().map_or(CellValue::Missing, CellValue::Number),
        );
        columns.insert(
            "COP Cooling".to_string(),
            cooling.get(&system).copied().map_or(CellValue::Missing, CellValue::Number),
        );
        Some((key, columns))
    }))
}

fn system_cop(
    report: &ReportData,
    output_name: &str,
    meters: &[&str; 3],
) -> IndexMap<(String, String), f64> {
    let output = report.filter(&ReportDataFilter::default().name(output_name));
    let mut out_per_system: IndexMap<(String, String), f64> = IndexMap::new();
    let mut out_total: IndexMap<String, f64> = IndexMap::new();
    for row in output.rows() {
        let Some(value) = row.numeric_value() else {
            continue;
        };
        *out_per_system
            .entry((row.archetype.clone(), row.key_value.clone()))
            .or_insert(0.0) += value;
        *out_total.entry(row.archetype.clone()).or_insert(0.0) += value;
    }

    let input = report.filter(&ReportDataFilter::default().name(*meters));
    let mut in_total: IndexMap<String, f64> = IndexMap::new();
    for row in input.rows() {
        if let Some(value) = row.numeric_value() {
            *in_total.entry(row.archetype.clone()).or_insert(0.0) += value;
        }
    }

    out_per_system
        .into_iter()
        .map(|((archetype, system), out_system)| {
            let total = out_total.get(&archetype).copied().unwrap_or(0.0);
            let input = in_total.get(&archetype).copied().unwrap_or(0.0);
            // share of total output apportions the metered input per system
            let share = out_system / total;
            let cop = if share == 0.0 || input == 0.0 {
                f64::NAN
            } else {
                out_system / (share * input)
            };
            ((archetype, system), cop)
        })
        .collect()
}

/// Conditioning parameters of one (archetype, zone type) group. Design-day
/// setpoints are the plain mean of the strictly positive peak-load
/// setpoints; the minimum fresh air requirements take the more demanding of
/// the cooling-mode and heating-mode weighted means, never a mean of maxima.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneConditioningRow {
    pub cop_heating: f64,
    pub cop_cooling: f64,
    pub heating_setpoint: f64,
    pub cooling_setpoint: f64,
    pub min_fresh_air_per_area: f64,
    pub min_fresh_air_per_person: f64,
}

pub fn zone_conditioning(
    report: &ReportData,
    tabular: &TabularData,
    classifier: &dyn ZoneClassifier,
) -> IndexMap<RowKey, ZoneConditioningRow> {
    let zones = zone_information(tabular);
    let people = nominal_people(tabular);
    let cop = zone_cop(report, tabular);
    let setpoints = zone_setpoint(tabular);
    if cop.is_empty() {
        warn!("no zone-to-air-loop mapping, system COPs degrade to NaN");
    }

    classify_zones(&zones, classifier)
        .into_iter()
        .map(|((archetype, zone_type), group)| {
            let weights = zone_weights(&group);
            let fresh_air = |table: &WideTable, per: &dyn Fn(&str) -> Option<f64>| {
                wmean_by_zone(&group, &weights, |zone| {
                    let flow = table.cell(&archetype, zone, MIN_OUTDOOR_AIR).as_f64()?;
                    Some(flow / per(zone)?)
                })
            };
            let area_of = |zone: &str| {
                zones
                    .cell(&archetype, zone, FLOOR_AREA)
                    .as_f64()
                    .filter(|area| *area != 0.0)
            };
            let occupants_of = |zone: &str| {
                people
                    .cell(&archetype, zone, OCCUPANTS)
                    .as_f64()
                    .filter(|count| *count != 0.0)
            };

            let row = ZoneConditioningRow {
                cop_heating: wmean_by_zone(&group, &weights, |zone| {
                    cop.cell(&archetype, zone, "COP Heating").as_f64()
                }),
                cop_cooling: wmean_by_zone(&group, &weights, |zone| {
                    cop.cell(&archetype, zone, "COP Cooling").as_f64()
                }),
                heating_setpoint: design_day_setpoint(&setpoints.heating, &archetype, &group),
                cooling_setpoint: design_day_setpoint(&setpoints.cooling, &archetype, &group),
                min_fresh_air_per_area: nan_max(
                    fresh_air(&setpoints.cooling, &area_of),
                    fresh_air(&setpoints.heating, &area_of),
                ),
                min_fresh_air_per_person: nan_max(
                    fresh_air(&setpoints.cooling, &occupants_of),
                    fresh_air(&setpoints.heating, &occupants_of),
                ),
            };
            ((archetype, zone_type), row)
        })
        .collect()
}

/// Domestic hot water of one (archetype, zone type) group: flow rate per
/// floor area in m³/h and the schedule of the heaviest zone.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneDomesticHotWaterRow {
    pub flow_rate_per_floor_area: f64,
    pub schedule: Option<String>,
}

/// `water_use` holds one water-use record per (archetype, zone name) with a
/// "Peak Flow Rate {m3/s}" and a "Flow Rate Fraction Schedule Name" column;
/// several records per zone are expected to be already deduplicated keeping
/// the first.
pub fn zone_domestic_hot_water(
    tabular: &TabularData,
    water_use: &WideTable,
    classifier: &dyn ZoneClassifier,
) -> IndexMap<RowKey, ZoneDomesticHotWaterRow> {
    let zones = zone_information(tabular);
    if water_use.is_empty() {
        warn!("no water-use records, hot water flow rates degrade to NaN");
    }

    classify_zones(&zones, classifier)
        .into_iter()
        .map(|((archetype, zone_type), group)| {
            let weights = zone_weights(&group);
            let row = ZoneDomesticHotWaterRow {
                // m3/s to m3/h
                flow_rate_per_floor_area: wmean_by_zone(&group, &weights, |zone| {
                    water_use
                        .cell(&archetype, zone, "Peak Flow Rate {m3/s}")
                        .as_f64()
                        .map(|rate| rate * 3600.0)
                }),
                schedule: top_by_zone(&group, &weights, |zone| {
                    text_cell(&water_use, &archetype, zone, "Flow Rate Fraction Schedule Name")
                }),
            };
            ((archetype, zone_type), row)
        })
        .collect()
}

type ZoneGroup<'a> = Vec<(&'a str, &'a IndexMap<String, CellValue>)>;

fn classify_zones<'a>(
    zones: &'a WideTable,
    classifier: &dyn ZoneClassifier,
) -> IndexMap<RowKey, ZoneGroup<'a>> {
    let mut groups: IndexMap<RowKey, ZoneGroup<'a>> = IndexMap::new();
    for ((archetype, zone_name), columns) in zones.rows() {
        let record = ZoneRecord {
            archetype,
            zone_name,
            columns,
        };
        match classifier.classify(&record) {
            Some(zone_type) => groups
                .entry((archetype.clone(), zone_type))
                .or_default()
                .push((zone_name.as_str(), columns)),
            None => debug!("zone {zone_name:?} of {archetype:?} left unclassified, dropped"),
        }
    }
    groups
}

fn zone_weights(group: &ZoneGroup<'_>) -> Vec<Option<f64>> {
    group
        .iter()
        .map(|(_, columns)| combined_weight(columns, WEIGHT_COLUMNS))
        .collect()
}

fn wmean_by_zone(
    group: &ZoneGroup<'_>,
    weights: &[Option<f64>],
    value: impl Fn(&str) -> Option<f64>,
) -> f64 {
    let values: Vec<Option<f64>> = group.iter().map(|(zone, _)| value(zone)).collect();
    weighted_mean(&values, weights)
}

fn top_by_zone<T: Clone>(
    group: &ZoneGroup<'_>,
    weights: &[Option<f64>],
    value: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let values: Vec<Option<T>> = group.iter().map(|(zone, _)| value(zone)).collect();
    top(&values, weights)
}

fn top_cell(
    group: &ZoneGroup<'_>,
    weights: &[Option<f64>],
    table: &WideTable,
    archetype: &str,
    column: &str,
) -> CellValue {
    top_by_zone(group, weights, |zone| {
        let cell = table.cell(archetype, zone, column);
        (!cell.is_missing()).then_some(cell)
    })
    .unwrap_or(CellValue::Missing)
}

fn text_cell(table: &WideTable, archetype: &str, zone: &str, column: &str) -> Option<String> {
    match table.cell(archetype, zone, column) {
        CellValue::Text(text) => Some(text),
        _ => None,
    }
}

/// Mean of the strictly positive peak-load setpoints of the group.
fn design_day_setpoint(table: &WideTable, archetype: &str, group: &ZoneGroup<'_>) -> f64 {
    let positive: Vec<f64> = group
        .iter()
        .filter_map(|(zone, _)| table.cell(archetype, zone, SETPOINT_AT_PEAK).as_f64())
        .filter(|setpoint| *setpoint > 0.0)
        .collect();
    if positive.is_empty() {
        f64::NAN
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64
    }
}

/// Max of the two statistics, ignoring NaN unless both are NaN.
fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.max(b)
    }
}
