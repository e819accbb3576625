//! The urban-building-energy-modelling template document: a name plus 17
//! named object collections serialized as one JSON object. Objects carry a
//! document-unique `$id` and point at each other with `{"$ref": id}` values.
//!
//! Loading resolves references strictly in dependency order (materials
//! before constructions before zones before building templates), so a
//! forward reference is a hard error. Saving walks the object graph
//! reachable from the building templates and writes each visited object
//! exactly once, dependencies first.

pub mod builder;
pub mod objects;

pub use builder::{AggregationOutputs, ScheduleLibrary};
pub use objects::*;

use crate::errors::TemplateError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// The 17 collections in dependency order. This is both the document field
/// order and the order references are validated in.
const COLLECTION_ORDER: [&str; 17] = [
    "GasMaterials",
    "GlazingMaterials",
    "OpaqueMaterials",
    "OpaqueConstructions",
    "WindowConstructions",
    "StructureDefinitions",
    "DaySchedules",
    "WeekSchedules",
    "YearSchedules",
    "DomesticHotWaterSettings",
    "VentilationSettings",
    "ZoneConditionings",
    "ZoneConstructionSets",
    "ZoneLoads",
    "Zones",
    "WindowSettings",
    "BuildingTemplates",
];

/// The serialized shape of a template file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TemplateDocument {
    pub gas_materials: Vec<GasMaterial>,
    pub glazing_materials: Vec<GlazingMaterial>,
    pub opaque_materials: Vec<OpaqueMaterial>,
    pub opaque_constructions: Vec<OpaqueConstruction>,
    pub window_constructions: Vec<WindowConstruction>,
    pub structure_definitions: Vec<StructureDefinition>,
    pub day_schedules: Vec<DaySchedule>,
    pub week_schedules: Vec<WeekSchedule>,
    pub year_schedules: Vec<YearSchedule>,
    pub domestic_hot_water_settings: Vec<DomesticHotWaterSetting>,
    pub ventilation_settings: Vec<VentilationSetting>,
    pub zone_conditionings: Vec<ZoneConditioning>,
    pub zone_construction_sets: Vec<ZoneConstructionSet>,
    pub zone_loads: Vec<ZoneLoad>,
    pub zones: Vec<Zone>,
    pub window_settings: Vec<WindowSetting>,
    pub building_templates: Vec<BuildingTemplate>,
}

/// A named template document.
#[derive(Clone, Debug, Default)]
pub struct UmiTemplate {
    pub name: String,
    pub collections: TemplateDocument,
}

impl UmiTemplate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: TemplateDocument::default(),
        }
    }

    /// Parses a template document and checks every reference against the
    /// objects of the collections loaded before it.
    pub fn from_json(name: &str, text: &str) -> Result<Self, TemplateError> {
        let collections: TemplateDocument =
            serde_json::from_str(text).map_err(|error| TemplateError::InvalidDocument(error.into()))?;
        let template = Self {
            name: name.to_string(),
            collections,
        };
        template.validate()?;
        Ok(template)
    }

    /// Checks that each object only references objects of collections
    /// earlier in the dependency order.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let document = serde_json::to_value(&self.collections)
            .map_err(|error| TemplateError::InvalidDocument(error.into()))?;
        let mut known: HashSet<String> = HashSet::new();
        for collection in COLLECTION_ORDER {
            let objects = document
                .get(collection)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for object in &objects {
                for id in collect_refs(object) {
                    if !known.contains(id) {
                        return Err(TemplateError::UnresolvedReference {
                            collection,
                            referrer: object_name(object),
                            id: id.to_string(),
                        });
                    }
                }
            }
            for object in &objects {
                if let Some(id) = object.get("$id").and_then(Value::as_str) {
                    known.insert(id.to_string());
                }
            }
        }
        Ok(())
    }

    /// Serializes the document, restricted to the objects transitively
    /// reachable from its building templates. Each object is written exactly
    /// once, dependencies before their dependents within each collection,
    /// with 2-space indentation.
    pub fn to_json(&self) -> Result<String, TemplateError> {
        let document = serde_json::to_value(&self.collections)
            .map_err(|error| TemplateError::InvalidDocument(error.into()))?;

        let mut registry: IndexMap<String, (usize, Value)> = IndexMap::new();
        for (index, collection) in COLLECTION_ORDER.iter().enumerate() {
            if let Some(objects) = document.get(*collection).and_then(Value::as_array) {
                for object in objects {
                    if let Some(id) = object.get("$id").and_then(Value::as_str) {
                        registry
                            .entry(id.to_string())
                            .or_insert((index, object.clone()));
                    }
                }
            }
        }

        let mut visited = HashSet::new();
        let mut collected = Vec::new();
        for template in &self.collections.building_templates {
            visit(
                &template.id,
                "BuildingTemplates",
                &template.name,
                &registry,
                &mut visited,
                &mut collected,
            )?;
        }
        debug!(
            "serializing template {:?} with {} reachable objects",
            self.name,
            collected.len()
        );

        let mut pruned = TemplateDocument::default();
        for (collection, object) in collected {
            pruned
                .adopt(collection, object)
                .map_err(|error| TemplateError::InvalidDocument(error.into()))?;
        }
        serde_json::to_string_pretty(&pruned)
            .map_err(|error| TemplateError::InvalidDocument(error.into()))
    }
}

impl TemplateDocument {
    /// Re-types a walked object back into the collection it came from.
    fn adopt(&mut self, collection: usize, object: Value) -> serde_json::Result<()> {
        match collection {
            0 => self.gas_materials.push(serde_json::from_value(object)?),
            1 => self.glazing_materials.push(serde_json::from_value(object)?),
            2 => self.opaque_materials.push(serde_json::from_value(object)?),
            3 => self.opaque_constructions.push(serde_json::from_value(object)?),
            4 => self.window_constructions.push(serde_json::from_value(object)?),
            5 => self.structure_definitions.push(serde_json::from_value(object)?),
            6 => self.day_schedules.push(serde_json::from_value(object)?),
            7 => self.week_schedules.push(serde_json::from_value(object)?),
            8 => self.year_schedules.push(serde_json::from_value(object)?),
            9 => self
                .domestic_hot_water_settings
                .push(serde_json::from_value(object)?),
            10 => self.ventilation_settings.push(serde_json::from_value(object)?),
            11 => self.zone_conditionings.push(serde_json::from_value(object)?),
            12 => self.zone_construction_sets.push(serde_json::from_value(object)?),
            13 => self.zone_loads.push(serde_json::from_value(object)?),
            14 => self.zones.push(serde_json::from_value(object)?),
            15 => self.window_settings.push(serde_json::from_value(object)?),
            _ => self.building_templates.push(serde_json::from_value(object)?),
        }
        Ok(())
    }
}

/// Depth-first post-order visit: children are collected before the object
/// itself, and a revisited id is skipped.
fn visit(
    id: &str,
    referrer_collection: &'static str,
    referrer: &str,
    registry: &IndexMap<String, (usize, Value)>,
    visited: &mut HashSet<String>,
    collected: &mut Vec<(usize, Value)>,
) -> Result<(), TemplateError> {
    if visited.contains(id) {
        return Ok(());
    }
    let Some((collection, object)) = registry.get(id) else {
        return Err(TemplateError::UnresolvedReference {
            collection: referrer_collection,
            referrer: referrer.to_string(),
            id: id.to_string(),
        });
    };
    visited.insert(id.to_string());
    let name = object_name(object);
    for child in collect_refs(object) {
        visit(
            child,
            COLLECTION_ORDER[*collection],
            &name,
            registry,
            visited,
            collected,
        )?;
    }
    collected.push((*collection, object.clone()));
    Ok(())
}

/// All `$ref` ids nested anywhere inside one object value.
fn collect_refs(object: &Value) -> Vec<&str> {
    fn walk<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
        match value {
            Value::Object(map) => {
                if let Some(id) = map.get("$ref").and_then(Value::as_str) {
                    out.push(id);
                } else {
                    for nested in map.values() {
                        walk(nested, out);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    walk(item, out);
                }
            }
            _ => {}
        }
    }
    let mut refs = Vec::new();
    if let Value::Object(map) = object {
        // the object's own fields, not the object as a ref
        for nested in map.values() {
            walk(nested, &mut refs);
        }
    }
    refs
}

fn object_name(object: &Value) -> String {
    object
        .get("Name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A minimal but complete document touching all 17 collections.
    fn populated() -> UmiTemplate {
        let mut template = UmiTemplate::new("library");
        let c = &mut template.collections;

        c.gas_materials.push(GasMaterial {
            id: "1".to_string(),
            kind: "Gas".to_string(),
            name: "AIR".to_string(),
            conductivity: 0.02,
            ..GasMaterial::default()
        });
        c.glazing_materials.push(GlazingMaterial {
            id: "2".to_string(),
            name: "Clear Glass".to_string(),
            conductivity: 0.9,
            ..GlazingMaterial::default()
        });
        c.opaque_materials.push(OpaqueMaterial {
            id: "3".to_string(),
            name: "Concrete".to_string(),
            conductivity: 1.7,
            density: 2300.0,
            ..OpaqueMaterial::default()
        });
        c.opaque_constructions.push(OpaqueConstruction {
            id: "4".to_string(),
            name: "Facade".to_string(),
            layers: vec![MaterialLayer {
                material: Reference::to("3"),
                thickness: 0.2,
            }],
            ..OpaqueConstruction::default()
        });
        c.window_constructions.push(WindowConstruction {
            id: "5".to_string(),
            name: "Double Glazing".to_string(),
            layers: vec![
                MaterialLayer {
                    material: Reference::to("2"),
                    thickness: 0.006,
                },
                MaterialLayer {
                    material: Reference::to("1"),
                    thickness: 0.012,
                },
            ],
            ..WindowConstruction::default()
        });
        c.structure_definitions.push(StructureDefinition {
            id: "6".to_string(),
            name: "Structure".to_string(),
            mass_ratios: vec![MassRatio {
                high_load_ratio: 1.0,
                material: Reference::to("3"),
                normal_ratio: 1.0,
            }],
            ..StructureDefinition::default()
        });
        c.day_schedules.push(DaySchedule {
            id: "7".to_string(),
            category: "Day".to_string(),
            kind: "Fraction".to_string(),
            values: vec![1.0; 24],
            name: "AllOnDay".to_string(),
            ..DaySchedule::default()
        });
        c.week_schedules.push(WeekSchedule {
            id: "8".to_string(),
            category: "Week".to_string(),
            days: vec![Reference::to("7"); 7],
            kind: "Fraction".to_string(),
            name: "AllOnWeek".to_string(),
            ..WeekSchedule::default()
        });
        c.year_schedules.push(YearSchedule {
            id: "9".to_string(),
            category: "Year".to_string(),
            parts: vec![YearSchedulePart {
                from_day: 1,
                from_month: 1,
                to_day: 31,
                to_month: 12,
                schedule: Reference::to("8"),
            }],
            kind: "Fraction".to_string(),
            name: "AllOn".to_string(),
            ..YearSchedule::default()
        });
        c.domestic_hot_water_settings.push(DomesticHotWaterSetting {
            id: "10".to_string(),
            water_schedule: Some(Reference::to("9")),
            name: "DHW".to_string(),
            ..DomesticHotWaterSetting::default()
        });
        c.ventilation_settings.push(VentilationSetting {
            id: "11".to_string(),
            nat_vent_schedule: Some(Reference::to("9")),
            scheduled_ventilation_schedule: Some(Reference::to("9")),
            name: "Ventilation".to_string(),
            ..VentilationSetting::default()
        });
        c.zone_conditionings.push(ZoneConditioning {
            id: "12".to_string(),
            cooling_schedule: Some(Reference::to("9")),
            heating_schedule: Some(Reference::to("9")),
            mech_vent_schedule: Some(Reference::to("9")),
            name: "Conditioning".to_string(),
            ..ZoneConditioning::default()
        });
        c.zone_construction_sets.push(ZoneConstructionSet {
            id: "13".to_string(),
            facade: Some(Reference::to("4")),
            ground: Some(Reference::to("4")),
            partition: Some(Reference::to("4")),
            roof: Some(Reference::to("4")),
            slab: Some(Reference::to("4")),
            name: "Constructions".to_string(),
            ..ZoneConstructionSet::default()
        });
        c.zone_loads.push(ZoneLoad {
            id: "14".to_string(),
            lights_availability_schedule: Some(Reference::to("9")),
            occupancy_schedule: Some(Reference::to("9")),
            equipment_availability_schedule: Some(Reference::to("9")),
            name: "Loads".to_string(),
            ..ZoneLoad::default()
        });
        let zone = |id: &str, name: &str| Zone {
            id: id.to_string(),
            conditioning: Reference::to("12"),
            constructions: Some(Reference::to("13")),
            daylight_mesh_resolution: 1.0,
            daylight_workplane_height: 0.8,
            domestic_hot_water: Reference::to("10"),
            internal_mass_construction: Some(Reference::to("4")),
            internal_mass_exposed_per_floor_area: 1.05,
            loads: Reference::to("14"),
            ventilation: Reference::to("11"),
            category: "Uncategorized".to_string(),
            comments: None,
            data_source: None,
            name: name.to_string(),
        };
        c.zones.push(zone("15", "Core"));
        c.zones.push(zone("16", "Perimeter"));
        c.window_settings.push(WindowSetting {
            id: "17".to_string(),
            construction: Some(Reference::to("5")),
            afn_window_availability: Some(Reference::to("9")),
            name: "Windows".to_string(),
            ..WindowSetting::default()
        });
        c.building_templates.push(BuildingTemplate {
            id: "18".to_string(),
            core: Reference::to("15"),
            lifespan: 60.0,
            partition_ratio: 0.35,
            perimeter: Reference::to("16"),
            structure: Some(Reference::to("6")),
            windows: Some(Reference::to("17")),
            category: "Office".to_string(),
            comments: None,
            data_source: None,
            name: "B1".to_string(),
        });
        template
    }

    #[test]
    fn round_trip_preserves_all_collections() {
        let template = populated();
        let serialized = template.to_json().unwrap();
        let reloaded = UmiTemplate::from_json("library", &serialized).unwrap();

        let before = serde_json::to_value(&template.collections).unwrap();
        let after = serde_json::to_value(&reloaded.collections).unwrap();
        assert_eq!(before, after);
        for collection in COLLECTION_ORDER {
            assert!(
                !after[collection].as_array().unwrap().is_empty(),
                "{collection} should survive the round trip"
            );
        }
    }

    #[test]
    fn forward_references_are_rejected_on_load() {
        let mut template = populated();
        // a layer pointing at an id that only exists later in the document
        template.collections.opaque_constructions[0].layers[0].material = Reference::to("18");
        let error = template.validate().unwrap_err();
        assert!(matches!(
            error,
            TemplateError::UnresolvedReference {
                collection: "OpaqueConstructions",
                ..
            }
        ));
    }

    #[test]
    fn dangling_reference_is_rejected_on_save() {
        let mut template = populated();
        template.collections.building_templates[0].core = Reference::to("999");
        let error = template.to_json().unwrap_err();
        assert!(matches!(error, TemplateError::UnresolvedReference { .. }));
    }

    #[test]
    fn save_prunes_objects_unreachable_from_building_templates() {
        let mut template = populated();
        template.collections.opaque_materials.push(OpaqueMaterial {
            id: "99".to_string(),
            name: "Orphan".to_string(),
            ..OpaqueMaterial::default()
        });
        let serialized = template.to_json().unwrap();
        let reloaded = UmiTemplate::from_json("library", &serialized).unwrap();
        assert!(reloaded
            .collections
            .opaque_materials
            .iter()
            .all(|material| material.name != "Orphan"));
    }

    #[test]
    fn shared_objects_are_written_exactly_once() {
        let template = populated();
        let serialized = template.to_json().unwrap();
        let reloaded = UmiTemplate::from_json("library", &serialized).unwrap();
        // the year schedule is referenced from five different objects
        assert_eq!(reloaded.collections.year_schedules.len(), 1);
        // dependencies come before their dependents
        let value: Value = serde_json::from_str(&serialized).unwrap();
        assert!(value["DaySchedules"][0]["$id"].as_str() == Some("7"));
    }
}
