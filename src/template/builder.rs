//! Builds a template document from the zone-level aggregation results: one
//! load/ventilation/conditioning/hot-water object per (archetype, zone
//! type), one zone tying them together, and one building template per
//! archetype wiring its core and perimeter zones.

use crate::aggregation::{
    ZoneConditioningRow, ZoneDomesticHotWaterRow, ZoneLoadsRow, ZoneVentilationRow,
};
use crate::report::{CellValue, RowKey};
use crate::template::objects::*;
use crate::template::UmiTemplate;
use indexmap::IndexMap;
use tracing::warn;

/// The per-(archetype, zone type) aggregates feeding the builder. Absent
/// entries fall back to the object defaults.
#[derive(Clone, Debug, Default)]
pub struct AggregationOutputs {
    pub loads: IndexMap<RowKey, ZoneLoadsRow>,
    pub ventilation: IndexMap<RowKey, ZoneVentilationRow>,
    pub conditioning: IndexMap<RowKey, ZoneConditioningRow>,
    pub hot_water: IndexMap<RowKey, ZoneDomesticHotWaterRow>,
}

impl AggregationOutputs {
    /// Union of the group keys across all four aggregates, first-seen order.
    fn group_keys(&self) -> Vec<RowKey> {
        let mut keys: Vec<RowKey> = Vec::new();
        for key in self
            .loads
            .keys()
            .chain(self.ventilation.keys())
            .chain(self.conditioning.keys())
            .chain(self.hot_water.keys())
        {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

/// Pre-built schedule objects the simulation schedules are matched against
/// by name. Aggregation recovers schedule names, not their values, so the
/// year/week/day chain has to come from a library.
#[derive(Clone, Debug, Default)]
pub struct ScheduleLibrary {
    pub day_schedules: Vec<DaySchedule>,
    pub week_schedules: Vec<WeekSchedule>,
    pub year_schedules: Vec<YearSchedule>,
}

impl ScheduleLibrary {
    /// Reference to the year schedule of the given name, matched case
    /// insensitively since report names arrive upper-cased.
    pub fn year_ref(&self, name: &str) -> Option<Reference> {
        self.year_schedules
            .iter()
            .find(|schedule| schedule.name.eq_ignore_ascii_case(name))
            .map(|schedule| Reference::to(schedule.id.clone()))
    }

    fn max_numeric_id(&self) -> u64 {
        self.day_schedules
            .iter()
            .map(|schedule| schedule.id.as_str())
            .chain(self.week_schedules.iter().map(|schedule| schedule.id.as_str()))
            .chain(self.year_schedules.iter().map(|schedule| schedule.id.as_str()))
            .filter_map(|id| id.parse().ok())
            .max()
            .unwrap_or(0)
    }
}

impl UmiTemplate {
    /// Assembles a template named `name` from the aggregation outputs,
    /// resolving recovered schedule names against `schedules`. A schedule
    /// name with no library counterpart degrades to no reference with a
    /// warning.
    pub fn from_aggregation(
        name: &str,
        outputs: &AggregationOutputs,
        schedules: &ScheduleLibrary,
    ) -> Self {
        let mut template = UmiTemplate::new(name);
        template.collections.day_schedules = schedules.day_schedules.clone();
        template.collections.week_schedules = schedules.week_schedules.clone();
        template.collections.year_schedules = schedules.year_schedules.clone();

        let mut next_id = schedules.max_numeric_id() + 1;
        let mut fresh = move || {
            let id = next_id.to_string();
            next_id += 1;
            id
        };
        let resolve = |schedule: &Option<String>| {
            schedule.as_deref().and_then(|name| {
                let reference = schedules.year_ref(name);
                if reference.is_none() {
                    warn!("schedule {name:?} not in the library, dropping the reference");
                }
                reference
            })
        };

        // (archetype, zone type) -> zone id, in creation order
        let mut zone_ids: IndexMap<RowKey, String> = IndexMap::new();
        for key in outputs.group_keys() {
            let (archetype, zone_type) = &key;
            let label = format!("{archetype} {zone_type}");

            let loads = outputs.loads.get(&key);
            let load = ZoneLoad {
                id: fresh(),
                lighting_power_density: or_value(
                    loads.map(|row| row.lighting_power_density),
                    ZoneLoad::default().lighting_power_density,
                ),
                lights_availability_schedule: loads
                    .and_then(|row| resolve(&row.lighting_schedule)),
                people_density: or_value(
                    loads.map(|row| row.people_density),
                    ZoneLoad::default().people_density,
                ),
                occupancy_schedule: loads.and_then(|row| resolve(&row.occupancy_schedule)),
                equipment_power_density: or_value(
                    loads.map(|row| row.equipment_power_density),
                    ZoneLoad::default().equipment_power_density,
                ),
                equipment_availability_schedule: loads
                    .and_then(|row| resolve(&row.equipment_schedule)),
                name: format!("{label} Loads"),
                ..ZoneLoad::default()
            };

            let vented = outputs.ventilation.get(&key);
            let defaults = VentilationSetting::default();
            let infiltration = or_value(
                vented.map(|row| row.infiltration_ach),
                defaults.infiltration,
            );
            let scheduled_ach = vented
                .map(|row| row.scheduled_ach)
                .filter(|ach| ach.is_finite());
            let ventilation = VentilationSetting {
                id: fresh(),
                infiltration,
                is_infiltration_on: infiltration > 0.0,
                is_scheduled_ventilation_on: scheduled_ach.is_some(),
                scheduled_ventilation_ach: scheduled_ach.unwrap_or(defaults.scheduled_ventilation_ach),
                scheduled_ventilation_schedule: vented
                    .and_then(|row| resolve(&row.scheduled_schedule)),
                scheduled_ventilation_setpoint: cell_number(
                    vented.map(|row| &row.scheduled_setpoint),
                    defaults.scheduled_ventilation_setpoint,
                ),
                is_nat_vent_on: vented
                    .map(|row| row.natural_ach.is_finite() && row.natural_ach > 0.0)
                    .unwrap_or(false),
                nat_vent_schedule: vented.and_then(|row| resolve(&row.natural_schedule)),
                nat_vent_max_outdoor_air_temp: cell_number(
                    vented.map(|row| &row.natural_max_outdoor_temp),
                    defaults.nat_vent_max_outdoor_air_temp,
                ),
                nat_vent_min_outdoor_air_temp: cell_number(
                    vented.map(|row| &row.natural_min_outdoor_temp),
                    defaults.nat_vent_min_outdoor_air_temp,
                ),
                nat_vent_zone_temp_setpoint: cell_number(
                    vented.map(|row| &row.natural_zone_setpoint),
                    defaults.nat_vent_zone_temp_setpoint,
                ),
                name: format!("{label} Ventilation"),
                ..defaults
            };

            let conditioned = outputs.conditioning.get(&key);
            let defaults = ZoneConditioning::default();
            let conditioning = ZoneConditioning {
                id: fresh(),
                heating_coeff_of_perf: or_value(
                    conditioned.map(|row| row.cop_heating),
                    defaults.heating_coeff_of_perf,
                ),
                cooling_coeff_of_perf: or_value(
                    conditioned.map(|row| row.cop_cooling),
                    defaults.cooling_coeff_of_perf,
                ),
                heating_setpoint: or_value(
                    conditioned.map(|row| row.heating_setpoint),
                    defaults.heating_setpoint,
                ),
                cooling_setpoint: or_value(
                    conditioned.map(|row| row.cooling_setpoint),
                    defaults.cooling_setpoint,
                ),
                min_fresh_air_per_area: or_value(
                    conditioned.map(|row| row.min_fresh_air_per_area),
                    defaults.min_fresh_air_per_area,
                ),
                min_fresh_air_per_person: or_value(
                    conditioned.map(|row| row.min_fresh_air_per_person),
                    defaults.min_fresh_air_per_person,
                ),
                name: format!("{label} Conditioning"),
                ..defaults
            };

            let watered = outputs.hot_water.get(&key);
            let defaults = DomesticHotWaterSetting::default();
            let hot_water = DomesticHotWaterSetting {
                id: fresh(),
                flow_rate_per_floor_area: or_value(
                    watered.map(|row| row.flow_rate_per_floor_area),
                    defaults.flow_rate_per_floor_area,
                ),
                water_schedule: watered.and_then(|row| resolve(&row.schedule)),
                name: format!("{label} Hot Water"),
                ..defaults
            };

            let zone = Zone {
                id: fresh(),
                conditioning: Reference::to(conditioning.id.clone()),
                constructions: None,
                daylight_mesh_resolution: 1.0,
                daylight_workplane_height: 0.8,
                domestic_hot_water: Reference::to(hot_water.id.clone()),
                internal_mass_construction: None,
                internal_mass_exposed_per_floor_area: 1.05,
                loads: Reference::to(load.id.clone()),
                ventilation: Reference::to(ventilation.id.clone()),
                category: DEFAULT_CATEGORY.to_string(),
                comments: None,
                data_source: Some(archetype.clone()),
                name: label,
            };
            zone_ids.insert(key.clone(), zone.id.clone());

            let c = &mut template.collections;
            c.zone_loads.push(load);
            c.ventilation_settings.push(ventilation);
            c.zone_conditionings.push(conditioning);
            c.domestic_hot_water_settings.push(hot_water);
            c.zones.push(zone);
        }

        // one building template per archetype, wiring core and perimeter
        let mut archetypes: Vec<&str> = Vec::new();
        for (archetype, _) in zone_ids.keys() {
            if !archetypes.contains(&archetype.as_str()) {
                archetypes.push(archetype);
            }
        }
        for archetype in archetypes {
            let find = |wanted: &str| {
                zone_ids.iter().find_map(|((candidate, zone_type), id)| {
                    (candidate == archetype && zone_type.eq_ignore_ascii_case(wanted))
                        .then(|| id.clone())
                })
            };
            let first = zone_ids
                .iter()
                .find_map(|((candidate, _), id)| (candidate == archetype).then(|| id.clone()));
            // a single-type building reuses that zone for both roles
            let core = find("Core").or_else(|| first.clone());
            let perimeter = find("Perimeter").or(first);
            let (Some(core), Some(perimeter)) = (core, perimeter) else {
                continue;
            };
            template.collections.building_templates.push(BuildingTemplate {
                id: fresh(),
                core: Reference::to(core),
                lifespan: 60.0,
                partition_ratio: 0.35,
                perimeter: Reference::to(perimeter),
                structure: None,
                windows: None,
                category: DEFAULT_CATEGORY.to_string(),
                comments: None,
                data_source: Some(archetype.to_string()),
                name: archetype.to_string(),
            });
        }
        template
    }
}

fn or_value(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(value) if value.is_finite() => value,
        _ => default,
    }
}

fn cell_number(cell: Option<&CellValue>, default: f64) -> f64 {
    cell.and_then(CellValue::as_f64).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ScheduleLibrary {
        let day = DaySchedule {
            id: "1".to_string(),
            category: "Day".to_string(),
            kind: "Fraction".to_string(),
            values: vec![1.0; 24],
            name: "BLDG_LIGHT_SCH".to_string(),
            ..DaySchedule::default()
        };
        let week = WeekSchedule {
            id: "2".to_string(),
            category: "Week".to_string(),
            days: vec![Reference::to("1"); 7],
            kind: "Fraction".to_string(),
            name: "BLDG_LIGHT_SCH".to_string(),
            ..WeekSchedule::default()
        };
        let year = YearSchedule {
            id: "3".to_string(),
            category: "Year".to_string(),
            parts: vec![YearSchedulePart {
                from_day: 1,
                from_month: 1,
                to_day: 31,
                to_month: 12,
                schedule: Reference::to("2"),
            }],
            kind: "Fraction".to_string(),
            name: "BLDG_LIGHT_SCH".to_string(),
            ..YearSchedule::default()
        };
        ScheduleLibrary {
            day_schedules: vec![day],
            week_schedules: vec![week],
            year_schedules: vec![year],
        }
    }

    fn outputs() -> AggregationOutputs {
        let mut outputs = AggregationOutputs::default();
        for (zone_type, density) in [("Perimeter", 12.5), ("Core", 8.0)] {
            outputs.loads.insert(
                ("A1".to_string(), zone_type.to_string()),
                ZoneLoadsRow {
                    lighting_power_density: density,
                    lighting_schedule: Some("bldg_light_sch".to_string()),
                    people_density: 0.05,
                    occupancy_schedule: None,
                    equipment_power_density: f64::NAN,
                    equipment_schedule: None,
                },
            );
        }
        outputs
    }

    #[test]
    fn builds_one_zone_per_group_and_one_template_per_archetype() {
        let template = UmiTemplate::from_aggregation("t", &outputs(), &library());
        assert_eq!(template.collections.zones.len(), 2);
        assert_eq!(template.collections.building_templates.len(), 1);
        assert!(template.validate().is_ok());

        let building = &template.collections.building_templates[0];
        let core = template
            .collections
            .zones
            .iter()
            .find(|zone| zone.id == building.core.id)
            .unwrap();
        assert_eq!(core.name, "A1 Core");
    }

    #[test]
    fn schedule_names_resolve_case_insensitively() {
        let template = UmiTemplate::from_aggregation("t", &outputs(), &library());
        let load = &template.collections.zone_loads[0];
        assert_eq!(
            load.lights_availability_schedule,
            Some(Reference::to("3"))
        );
    }

    #[test]
    fn nan_aggregates_fall_back_to_defaults() {
        let template = UmiTemplate::from_aggregation("t", &outputs(), &library());
        let load = &template.collections.zone_loads[0];
        assert_eq!(load.lighting_power_density, 12.5);
        assert_eq!(
            load.equipment_power_density,
            ZoneLoad::default().equipment_power_density
        );
    }

    #[test]
    fn built_template_serializes_and_reloads() {
        let template = UmiTemplate::from_aggregation("t", &outputs(), &library());
        let serialized = template.to_json().unwrap();
        let reloaded = UmiTemplate::from_json("t", &serialized).unwrap();
        assert_eq!(reloaded.collections.zones.len(), 2);
        assert_eq!(reloaded.collections.year_schedules.len(), 1);
    }
}
