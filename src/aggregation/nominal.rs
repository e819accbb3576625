//! Extraction of the "Internal Gains Nominal" / "Airflow Stats Nominal"
//! initialization tables into one wide record per (archetype, zone name).
//!
//! A zone can carry several component instances of one category (two lights
//! definitions, three ventilation objects). Each category has a fixed
//! reduction recipe folding those instances into a single record: extensive
//! quantities are summed, fractions are averaged weighted by the component
//! power, categorical attributes take the value of the heaviest instance and
//! component names are `+`-joined.

use crate::aggregation::primitives::{top, weighted_mean};
use crate::report::{CellValue, TabularData, WideTable};
use indexmap::IndexMap;
use tracing::warn;

const REPORT_NAME: &str = "Initialization Summary";
const FAN_TYPE: &str = "Fan Type {Exhaust;Intake;Natural}";
const FLOOR_AREA: &str = "Zone Floor Area {m2}";

/// One reduction rule: how a named column folds across the component
/// instances of one zone.
enum Reduce {
    /// Numeric sum, skipping missing cells.
    Sum,
    /// Mean weighted by the named numeric column of the same record.
    WeightedMean(&'static str),
    /// Value of the record heaviest in the named column.
    Top(&'static str),
    /// `+`-joined component names.
    JoinNames,
}

const LIGHTING_RULES: &[(&str, Reduce)] = &[
    ("# Zone Occupants", Reduce::Sum),
    ("End-Use Category", Reduce::Top(FLOOR_AREA)),
    ("Fraction Convected", Reduce::WeightedMean("Lighting Level {W}")),
    ("Fraction Radiant", Reduce::WeightedMean("Lighting Level {W}")),
    ("Fraction Replaceable", Reduce::WeightedMean("Lighting Level {W}")),
    ("Fraction Return Air", Reduce::WeightedMean("Lighting Level {W}")),
    ("Fraction Short Wave", Reduce::WeightedMean("Lighting Level {W}")),
    ("Lighting Level {W}", Reduce::Sum),
    ("Lights per person {W/person}", Reduce::Sum),
    ("Lights/Floor Area {W/m2}", Reduce::Sum),
    ("Name", Reduce::JoinNames),
    ("Nominal Maximum Lighting Level {W}", Reduce::Sum),
    ("Nominal Minimum Lighting Level {W}", Reduce::Sum),
    ("Schedule Name", Reduce::Top("Lighting Level {W}")),
    (FLOOR_AREA, Reduce::Sum),
];

const PEOPLE_RULES: &[(&str, Reduce)] = &[
    ("# Zone Occupants", Reduce::Sum),
    ("Number of People {}", Reduce::Sum),
    ("People/Floor Area {person/m2}", Reduce::Sum),
    ("Fraction Radiant", Reduce::WeightedMean("Number of People {}")),
    ("Fraction Convected", Reduce::WeightedMean("Number of People {}")),
    ("Name", Reduce::JoinNames),
    ("Schedule Name", Reduce::Top("Number of People {}")),
    ("Activity Schedule Name", Reduce::Top("Number of People {}")),
    (FLOOR_AREA, Reduce::Sum),
];

const EQUIPMENT_RULES: &[(&str, Reduce)] = &[
    ("# Zone Occupants", Reduce::Sum),
    ("End-Use SubCategory", Reduce::Top(FLOOR_AREA)),
    ("Equipment Level {W}", Reduce::Sum),
    ("Equipment per person {W/person}", Reduce::Sum),
    ("Equipment/Floor Area {W/m2}", Reduce::Sum),
    ("Fraction Convected", Reduce::WeightedMean("Equipment Level {W}")),
    ("Fraction Latent", Reduce::WeightedMean("Equipment Level {W}")),
    ("Fraction Lost", Reduce::WeightedMean("Equipment Level {W}")),
    ("Fraction Radiant", Reduce::WeightedMean("Equipment Level {W}")),
    ("Name", Reduce::JoinNames),
    ("Nominal Maximum Equipment Level {W}", Reduce::Sum),
    ("Nominal Minimum Equipment Level {W}", Reduce::Sum),
    ("Schedule Name", Reduce::Top("Equipment Level {W}")),
    (FLOOR_AREA, Reduce::Sum),
];

const INFILTRATION_RULES: &[(&str, Reduce)] = &[
    ("# Zone Occupants", Reduce::Sum),
    ("ACH - Air Changes per Hour", Reduce::Sum),
    ("Design Volume Flow Rate {m3/s}", Reduce::Sum),
    ("Volume Flow Rate/Floor Area {m3/s/m2}", Reduce::Sum),
    ("Equation A - Constant Term Coefficient {}", Reduce::Top(FLOOR_AREA)),
    ("Equation B - Temperature Term Coefficient {1/C}", Reduce::Top(FLOOR_AREA)),
    ("Equation C - Velocity Term Coefficient {s/m}", Reduce::Top(FLOOR_AREA)),
    ("Equation D - Velocity Squared Term Coefficient {s2/m2}", Reduce::Top(FLOOR_AREA)),
    ("Name", Reduce::JoinNames),
    ("Schedule Name", Reduce::Top(FLOOR_AREA)),
    (FLOOR_AREA, Reduce::Sum),
];

const VENTILATION_RULES: &[(&str, Reduce)] = &[
    ("Name", Reduce::Top(FLOOR_AREA)),
    ("Schedule Name", Reduce::Top(FLOOR_AREA)),
    (FLOOR_AREA, Reduce::Top(FLOOR_AREA)),
    ("# Zone Occupants", Reduce::Top(FLOOR_AREA)),
    ("Design Volume Flow Rate {m3/s}", Reduce::WeightedMean(FLOOR_AREA)),
    ("Volume Flow Rate/Floor Area {m3/s/m2}", Reduce::WeightedMean(FLOOR_AREA)),
    ("Volume Flow Rate/person Area {m3/s/person}", Reduce::WeightedMean(FLOOR_AREA)),
    ("ACH - Air Changes per Hour", Reduce::WeightedMean(FLOOR_AREA)),
    ("Fan Pressure Rise {Pa}", Reduce::WeightedMean(FLOOR_AREA)),
    ("Fan Efficiency {}", Reduce::WeightedMean(FLOOR_AREA)),
    ("Equation A - Constant Term Coefficient {}", Reduce::Top(FLOOR_AREA)),
    ("Equation B - Temperature Term Coefficient {1/C}", Reduce::Top(FLOOR_AREA)),
    ("Equation C - Velocity Term Coefficient {s/m}", Reduce::Top(FLOOR_AREA)),
    ("Equation D - Velocity Squared Term Coefficient {s2/m2}", Reduce::Top(FLOOR_AREA)),
    ("Minimum Indoor Temperature{C}/Schedule", Reduce::Top(FLOOR_AREA)),
    ("Maximum Indoor Temperature{C}/Schedule", Reduce::Top(FLOOR_AREA)),
    ("Delta Temperature{C}/Schedule", Reduce::Top(FLOOR_AREA)),
    ("Minimum Outdoor Temperature{C}/Schedule", Reduce::Top(FLOOR_AREA)),
    ("Maximum Outdoor Temperature{C}/Schedule", Reduce::Top(FLOOR_AREA)),
    ("Maximum WindSpeed{m/s}", Reduce::Top(FLOOR_AREA)),
];

/// One nominal lighting record per (archetype, zone name).
pub fn nominal_lighting(tabular: &TabularData) -> WideTable {
    per_zone(tabular, "Lights Internal Gains Nominal", LIGHTING_RULES)
}

/// One nominal occupancy record per (archetype, zone name).
pub fn nominal_people(tabular: &TabularData) -> WideTable {
    per_zone(tabular, "People Internal Gains Nominal", PEOPLE_RULES)
}

/// One nominal electric-equipment record per (archetype, zone name).
pub fn nominal_equipment(tabular: &TabularData) -> WideTable {
    per_zone(tabular, "ElectricEquipment Internal Gains Nominal", EQUIPMENT_RULES)
}

/// One nominal infiltration record per (archetype, zone name).
pub fn nominal_infiltration(tabular: &TabularData) -> WideTable {
    per_zone(tabular, "ZoneInfiltration Airflow Stats Nominal", INFILTRATION_RULES)
}

/// The nominal ventilation records of one simulation batch, split by
/// mechanism. Scheduled (fan-driven) and natural ventilation behave as
/// distinct template attributes downstream, so they never fold together.
#[derive(Clone, Debug, Default)]
pub struct VentilationTables {
    pub scheduled: WideTable,
    pub natural: WideTable,
}

/// One nominal ventilation record per (archetype, zone name) and mechanism.
/// Components of one zone are first folded per fan type; a zone with both a
/// fan-driven and a natural ventilation object contributes one record to each
/// table. Natural means the fan type field contains "Natural"; everything
/// else (exhaust, intake, unlabeled) counts as scheduled.
pub fn nominal_ventilation(tabular: &TabularData) -> VentilationTables {
    let table_name = "ZoneVentilation Airflow Stats Nominal";
    let pivoted = tabular.pivot(REPORT_NAME, table_name);
    if pivoted.is_empty() {
        return VentilationTables::default();
    }

    let mut groups: IndexMap<(String, String, bool), Vec<&IndexMap<String, CellValue>>> =
        IndexMap::new();
    for ((archetype, row_name), columns) in pivoted.rows() {
        let zone = columns
            .get("Zone Name")
            .and_then(CellValue::as_str)
            .unwrap_or(row_name.as_str());
        let natural = columns
            .get(FAN_TYPE)
            .and_then(CellValue::as_str)
            .is_some_and(|fan_type| fan_type.contains("Natural"));
        groups
            .entry((archetype.clone(), zone.to_string(), natural))
            .or_default()
            .push(columns);
    }

    let mut tables = VentilationTables::default();
    for ((archetype, zone, natural), group) in groups {
        let record = reduce_group(&group, VENTILATION_RULES);
        let table = if natural {
            &mut tables.natural
        } else {
            &mut tables.scheduled
        };
        table.insert((archetype, zone), record);
    }
    tables
}

fn per_zone(tabular: &TabularData, table_name: &str, rules: &[(&str, Reduce)]) -> WideTable {
    let pivoted = tabular.pivot(REPORT_NAME, table_name);
    if pivoted.is_empty() {
        warn!("no \"{table_name}\" rows, returning an empty nominal table");
        return WideTable::default();
    }
    WideTable::from_rows(
        pivoted
            .group_by_column("Zone Name")
            .into_iter()
            .map(|(key, group)| (key, reduce_group(&group, rules))),
    )
}

fn reduce_group(
    group: &[&IndexMap<String, CellValue>],
    rules: &[(&str, Reduce)],
) -> IndexMap<String, CellValue> {
    rules
        .iter()
        .map(|(column, how)| {
            let reduced = match how {
                Reduce::Sum => sum_column(group, column),
                Reduce::WeightedMean(weight) => wmean_column(group, column, weight),
                Reduce::Top(weight) => top_column(group, column, weight),
                Reduce::JoinNames => join_column(group, column),
            };
            (column.to_string(), reduced)
        })
        .collect()
}

fn sum_column(group: &[&IndexMap<String, CellValue>], column: &str) -> CellValue {
    let mut sum = None;
    for row in group {
        if let Some(value) = row.get(column).and_then(CellValue::as_f64) {
            *sum.get_or_insert(0.0) += value;
        }
    }
    sum.map_or(CellValue::Missing, CellValue::Number)
}

fn wmean_column(group: &[&IndexMap<String, CellValue>], column: &str, weight: &str) -> CellValue {
    let values: Vec<Option<f64>> = group
        .iter()
        .map(|row| row.get(column).and_then(CellValue::as_f64))
        .collect();
    let weights: Vec<Option<f64>> = group
        .iter()
        .map(|row| row.get(weight).and_then(CellValue::as_f64))
        .collect();
    let mean = weighted_mean(&values, &weights);
    if mean.is_nan() {
        CellValue::Missing
    } else {
        CellValue::Number(mean)
    }
}

fn top_column(group: &[&IndexMap<String, CellValue>], column: &str, weight: &str) -> CellValue {
    let values: Vec<Option<&CellValue>> = group
        .iter()
        .map(|row| row.get(column).filter(|cell| !cell.is_missing()))
        .collect();
    let weights: Vec<Option<f64>> = group
        .iter()
        .map(|row| row.get(weight).and_then(CellValue::as_f64))
        .collect();
    top(&values, &weights).map_or(CellValue::Missing, |cell| cell.clone())
}

fn join_column(group: &[&IndexMap<String, CellValue>], column: &str) -> CellValue {
    let joined = group
        .iter()
        .filter_map(|row| row.get(column).and_then(CellValue::as_str))
        .collect::<Vec<_>>()
        .join("+");
    if joined.is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TabularRow;
    use approx::assert_relative_eq;
    use rstest::*;

    fn row(table: &str, row_name: &str, column: &str, value: &str) -> TabularRow {
        TabularRow {
            archetype: "A1".to_string(),
            report_name: REPORT_NAME.to_string(),
            table_name: table.to_string(),
            row_name: row_name.to_string(),
            column_name: column.to_string(),
            value: value.to_string(),
        }
    }

    #[fixture]
    fn lights() -> TabularData {
        // two lights components in one zone
        let table = "Lights Internal Gains Nominal";
        TabularData::new([
            row(table, "1", "Name", "ZONE-1 LIGHTS-1"),
            row(table, "1", "Zone Name", "ZONE-1"),
            row(table, "1", "Lighting Level {W}", "100"),
            row(table, "1", "Lights/Floor Area {W/m2}", "4"),
            row(table, "1", "Fraction Radiant", "0.4"),
            row(table, "1", "Schedule Name", "BLDG_LIGHT_SCH"),
            row(table, "1", "Zone Floor Area {m2}", "25"),
            row(table, "2", "Name", "ZONE-1 LIGHTS-2"),
            row(table, "2", "Zone Name", "ZONE-1"),
            row(table, "2", "Lighting Level {W}", "300"),
            row(table, "2", "Lights/Floor Area {W/m2}", "12"),
            row(table, "2", "Fraction Radiant", "0.8"),
            row(table, "2", "Schedule Name", "TASK_LIGHT_SCH"),
            row(table, "2", "Zone Floor Area {m2}", "25"),
        ])
    }

    #[rstest]
    fn lighting_components_fold_into_one_zone_record(lights: TabularData) {
        let nominal = nominal_lighting(&lights);
        assert_eq!(nominal.len(), 1);
        assert_eq!(
            nominal.cell("A1", "ZONE-1", "Lighting Level {W}"),
            CellValue::Number(400.0)
        );
        assert_eq!(
            nominal.cell("A1", "ZONE-1", "Lights/Floor Area {W/m2}"),
            CellValue::Number(16.0)
        );
        // weighted by lighting level: (0.4 * 100 + 0.8 * 300) / 400
        assert_relative_eq!(
            nominal
                .cell("A1", "ZONE-1", "Fraction Radiant")
                .as_f64()
                .unwrap(),
            0.7
        );
        // the 300 W component carries the schedule
        assert_eq!(
            nominal.cell("A1", "ZONE-1", "Schedule Name"),
            CellValue::Text("TASK_LIGHT_SCH".to_string())
        );
        assert_eq!(
            nominal.cell("A1", "ZONE-1", "Name"),
            CellValue::Text("ZONE-1 LIGHTS-1+ZONE-1 LIGHTS-2".to_string())
        );
    }

    #[rstest]
    fn missing_nominal_table_yields_an_empty_result(lights: TabularData) {
        assert!(nominal_people(&lights).is_empty());
    }

    #[rstest]
    fn ventilation_splits_on_fan_type() {
        let table = "ZoneVentilation Airflow Stats Nominal";
        let tabular = TabularData::new([
            row(table, "1", "Name", "VENT-1"),
            row(table, "1", "Zone Name", "ZONE-1"),
            row(table, "1", FAN_TYPE, "Intake"),
            row(table, "1", "ACH - Air Changes per Hour", "2.0"),
            row(table, "1", FLOOR_AREA, "25"),
            row(table, "2", "Name", "WINDOW-1"),
            row(table, "2", "Zone Name", "ZONE-1"),
            row(table, "2", FAN_TYPE, "Natural"),
            row(table, "2", "ACH - Air Changes per Hour", "0.5"),
            row(table, "2", FLOOR_AREA, "25"),
        ]);
        let tables = nominal_ventilation(&tabular);
        assert_eq!(
            tables.scheduled.cell("A1", "ZONE-1", "ACH - Air Changes per Hour"),
            CellValue::Number(2.0)
        );
        assert_eq!(
            tables.natural.cell("A1", "ZONE-1", "ACH - Air Changes per Hour"),
            CellValue::Number(0.5)
        );
    }

    #[rstest]
    fn absent_ventilation_table_is_empty_not_an_error() {
        let tables = nominal_ventilation(&TabularData::default());
        assert!(tables.scheduled.is_empty());
        assert!(tables.natural.is_empty());
    }
}
