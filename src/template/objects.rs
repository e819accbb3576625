//! The template object vocabulary: every object carries a document-unique
//! `$id` and points at other objects through `{"$ref": id}` values, never by
//! nesting. Field names follow the template JSON schema exactly.

use serde::{Deserialize, Serialize};

/// A by-id pointer to another object of the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub id: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

pub(crate) const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasMaterial {
    #[serde(rename = "$id")]
    pub id: String,
    pub category: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub conductivity: f64,
    pub cost: f64,
    pub density: f64,
    pub embodied_carbon: f64,
    pub embodied_energy: f64,
    pub substitution_rate_pattern: Vec<f64>,
    pub substitution_timestep: f64,
    pub transport_carbon: f64,
    pub transport_distance: f64,
    pub transport_energy: f64,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlazingMaterial {
    #[serde(rename = "$id")]
    pub id: String,
    pub dirt_factor: f64,
    #[serde(rename = "IREmissivityBack")]
    pub ir_emissivity_back: f64,
    #[serde(rename = "IREmissivityFront")]
    pub ir_emissivity_front: f64,
    #[serde(rename = "IRTransmittance")]
    pub ir_transmittance: f64,
    pub solar_reflectance_back: f64,
    pub solar_reflectance_front: f64,
    pub solar_transmittance: f64,
    pub visible_reflectance_back: f64,
    pub visible_reflectance_front: f64,
    pub visible_transmittance: f64,
    pub conductivity: f64,
    pub cost: f64,
    pub density: f64,
    pub embodied_carbon: f64,
    pub embodied_energy: f64,
    pub substitution_rate_pattern: Vec<f64>,
    pub substitution_timestep: f64,
    pub transport_carbon: f64,
    pub transport_distance: f64,
    pub transport_energy: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpaqueMaterial {
    #[serde(rename = "$id")]
    pub id: String,
    pub moisture_diffusion_resistance: f64,
    pub roughness: String,
    pub solar_absorptance: f64,
    pub specific_heat: f64,
    pub thermal_emittance: f64,
    pub visible_absorptance: f64,
    pub conductivity: f64,
    pub cost: f64,
    pub density: f64,
    pub embodied_carbon: f64,
    pub embodied_energy: f64,
    pub substitution_rate_pattern: Vec<f64>,
    pub substitution_timestep: f64,
    pub transport_carbon: f64,
    pub transport_distance: f64,
    pub transport_energy: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

/// One layer of a construction, by material reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaterialLayer {
    pub material: Reference,
    pub thickness: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpaqueConstruction {
    #[serde(rename = "$id")]
    pub id: String,
    pub layers: Vec<MaterialLayer>,
    pub assembly_carbon: f64,
    pub assembly_cost: f64,
    pub assembly_energy: f64,
    pub disassembly_carbon: f64,
    pub disassembly_energy: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WindowConstruction {
    #[serde(rename = "$id")]
    pub id: String,
    pub layers: Vec<MaterialLayer>,
    pub assembly_carbon: f64,
    pub assembly_cost: f64,
    pub assembly_energy: f64,
    pub disassembly_carbon: f64,
    pub disassembly_energy: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

/// Structural mass per conditioned floor area, by material reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MassRatio {
    pub high_load_ratio: f64,
    pub material: Reference,
    pub normal_ratio: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructureDefinition {
    #[serde(rename = "$id")]
    pub id: String,
    pub mass_ratios: Vec<MassRatio>,
    pub assembly_carbon: f64,
    pub assembly_cost: f64,
    pub assembly_energy: f64,
    pub disassembly_carbon: f64,
    pub disassembly_energy: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

/// 24 hourly values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaySchedule {
    #[serde(rename = "$id")]
    pub id: String,
    pub category: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub values: Vec<f64>,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

/// Seven day-schedule references, Sunday first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeekSchedule {
    #[serde(rename = "$id")]
    pub id: String,
    pub category: String,
    pub days: Vec<Reference>,
    #[serde(rename = "Type")]
    pub kind: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

/// One date span of a year schedule, by week-schedule reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct YearSchedulePart {
    pub from_day: u32,
    pub from_month: u32,
    pub to_day: u32,
    pub to_month: u32,
    pub schedule: Reference,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct YearSchedule {
    #[serde(rename = "$id")]
    pub id: String,
    pub category: String,
    pub parts: Vec<YearSchedulePart>,
    #[serde(rename = "Type")]
    pub kind: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomesticHotWaterSetting {
    #[serde(rename = "$id")]
    pub id: String,
    pub flow_rate_per_floor_area: f64,
    pub is_on: bool,
    pub water_schedule: Option<Reference>,
    pub water_supply_temperature: f64,
    pub water_temperature_inlet: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

impl Default for DomesticHotWaterSetting {
    fn default() -> Self {
        Self {
            id: String::new(),
            flow_rate_per_floor_area: 0.03,
            is_on: true,
            water_schedule: None,
            water_supply_temperature: 65.0,
            water_temperature_inlet: 10.0,
            category: DEFAULT_CATEGORY.to_string(),
            comments: None,
            data_source: None,
            name: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VentilationSetting {
    #[serde(rename = "$id")]
    pub id: String,
    pub afn: bool,
    pub is_buoyancy_on: bool,
    pub infiltration: f64,
    pub is_infiltration_on: bool,
    pub is_nat_vent_on: bool,
    pub is_scheduled_ventilation_on: bool,
    pub nat_vent_max_rel_humidity: f64,
    pub nat_vent_max_outdoor_air_temp: f64,
    pub nat_vent_min_outdoor_air_temp: f64,
    pub nat_vent_schedule: Option<Reference>,
    pub nat_vent_zone_temp_setpoint: f64,
    pub scheduled_ventilation_ach: f64,
    pub scheduled_ventilation_schedule: Option<Reference>,
    pub scheduled_ventilation_setpoint: f64,
    pub is_wind_on: bool,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

impl Default for VentilationSetting {
    fn default() -> Self {
        Self {
            id: String::new(),
            afn: false,
            is_buoyancy_on: true,
            infiltration: 0.1,
            is_infiltration_on: true,
            is_nat_vent_on: false,
            is_scheduled_ventilation_on: false,
            nat_vent_max_rel_humidity: 90.0,
            nat_vent_max_outdoor_air_temp: 30.0,
            nat_vent_min_outdoor_air_temp: 0.0,
            nat_vent_schedule: None,
            nat_vent_zone_temp_setpoint: 18.0,
            scheduled_ventilation_ach: 0.6,
            scheduled_ventilation_schedule: None,
            scheduled_ventilation_setpoint: 18.0,
            is_wind_on: false,
            category: DEFAULT_CATEGORY.to_string(),
            comments: None,
            data_source: None,
            name: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneConditioning {
    #[serde(rename = "$id")]
    pub id: String,
    pub cooling_schedule: Option<Reference>,
    pub cooling_coeff_of_perf: f64,
    pub cooling_setpoint: f64,
    pub cooling_limit_type: String,
    pub economizer_type: String,
    pub heating_coeff_of_perf: f64,
    pub heating_limit_type: String,
    pub heating_schedule: Option<Reference>,
    pub heating_setpoint: f64,
    pub heat_recovery_efficiency_latent: f64,
    pub heat_recovery_efficiency_sensible: f64,
    pub heat_recovery_type: String,
    pub is_cooling_on: bool,
    pub is_heating_on: bool,
    pub is_mech_vent_on: bool,
    pub max_cool_flow: f64,
    pub max_cooling_capacity: f64,
    pub max_heat_flow: f64,
    pub max_heating_capacity: f64,
    pub mech_vent_schedule: Option<Reference>,
    pub min_fresh_air_per_area: f64,
    pub min_fresh_air_per_person: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

impl Default for ZoneConditioning {
    fn default() -> Self {
        Self {
            id: String::new(),
            cooling_schedule: None,
            cooling_coeff_of_perf: 1.0,
            cooling_setpoint: 26.0,
            cooling_limit_type: "NoLimit".to_string(),
            economizer_type: "NoEconomizer".to_string(),
            heating_coeff_of_perf: 1.0,
            heating_limit_type: "NoLimit".to_string(),
            heating_schedule: None,
            heating_setpoint: 20.0,
            heat_recovery_efficiency_latent: 0.65,
            heat_recovery_efficiency_sensible: 0.7,
            heat_recovery_type: "None".to_string(),
            is_cooling_on: true,
            is_heating_on: true,
            is_mech_vent_on: true,
            max_cool_flow: 100.0,
            max_cooling_capacity: 100.0,
            max_heat_flow: 100.0,
            max_heating_capacity: 100.0,
            mech_vent_schedule: None,
            min_fresh_air_per_area: 0.001,
            min_fresh_air_per_person: 0.001,
            category: DEFAULT_CATEGORY.to_string(),
            comments: None,
            data_source: None,
            name: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneConstructionSet {
    #[serde(rename = "$id")]
    pub id: String,
    pub facade: Option<Reference>,
    pub ground: Option<Reference>,
    pub partition: Option<Reference>,
    pub roof: Option<Reference>,
    pub slab: Option<Reference>,
    pub is_facade_adiabatic: bool,
    pub is_ground_adiabatic: bool,
    pub is_partition_adiabatic: bool,
    pub is_roof_adiabatic: bool,
    pub is_slab_adiabatic: bool,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneLoad {
    #[serde(rename = "$id")]
    pub id: String,
    pub dimming_type: String,
    pub equipment_availability_schedule: Option<Reference>,
    pub equipment_power_density: f64,
    pub illuminance_target: f64,
    pub lighting_power_density: f64,
    pub lights_availability_schedule: Option<Reference>,
    pub occupancy_schedule: Option<Reference>,
    pub is_equipment_on: bool,
    pub is_lighting_on: bool,
    pub is_people_on: bool,
    pub people_density: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

impl Default for ZoneLoad {
    fn default() -> Self {
        Self {
            id: String::new(),
            dimming_type: "Continuous".to_string(),
            equipment_availability_schedule: None,
            equipment_power_density: 12.0,
            illuminance_target: 500.0,
            lighting_power_density: 12.0,
            lights_availability_schedule: None,
            occupancy_schedule: None,
            is_equipment_on: true,
            is_lighting_on: true,
            is_people_on: true,
            people_density: 0.2,
            category: DEFAULT_CATEGORY.to_string(),
            comments: None,
            data_source: None,
            name: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WindowSetting {
    #[serde(rename = "$id")]
    pub id: String,
    pub afn_discharge_c: f64,
    pub afn_temp_setpoint: f64,
    pub afn_window_availability: Option<Reference>,
    pub construction: Option<Reference>,
    pub is_shading_system_on: bool,
    pub is_virtual_partition: bool,
    pub is_zone_mixing_on: bool,
    pub operable_area: f64,
    pub shading_system_availability_schedule: Option<Reference>,
    pub shading_system_setpoint: f64,
    pub shading_system_transmittance: f64,
    pub shading_system_type: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub zone_mixing_availability_schedule: Option<Reference>,
    pub zone_mixing_delta_temperature: f64,
    pub zone_mixing_flow_rate: f64,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Zone {
    #[serde(rename = "$id")]
    pub id: String,
    pub conditioning: Reference,
    pub constructions: Option<Reference>,
    pub daylight_mesh_resolution: f64,
    pub daylight_workplane_height: f64,
    pub domestic_hot_water: Reference,
    pub internal_mass_construction: Option<Reference>,
    pub internal_mass_exposed_per_floor_area: f64,
    pub loads: Reference,
    pub ventilation: Reference,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildingTemplate {
    #[serde(rename = "$id")]
    pub id: String,
    pub core: Reference,
    pub lifespan: f64,
    pub partition_ratio: f64,
    pub perimeter: Reference,
    pub structure: Option<Reference>,
    pub windows: Option<Reference>,
    pub category: String,
    pub comments: Option<String>,
    pub data_source: Option<String>,
    pub name: String,
}
