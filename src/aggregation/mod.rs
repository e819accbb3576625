//! Turns the flat report tables into one record per (archetype, zone type):
//! nominal component records are extracted and folded per zone, joined with
//! the canonical zone-information table, classified into zone types and
//! reduced with floor-area-weighted statistics.

pub mod nominal;
pub mod primitives;
pub mod zone;

pub use nominal::{
    nominal_equipment, nominal_infiltration, nominal_lighting, nominal_people,
    nominal_ventilation, VentilationTables,
};
pub use primitives::{combined_weight, top, weighted_mean};
pub use zone::{
    zone_conditioning, zone_cop, zone_domestic_hot_water, zone_information, zone_loads,
    zone_setpoint, zone_ventilation, ClassifierFn, CorePerimeterClassifier, ZoneClassifier,
    ZoneConditioningRow, ZoneDomesticHotWaterRow, ZoneLoadsRow, ZoneRecord, ZoneSetpoints,
    ZoneVentilationRow, COOLING_METERS,
};
