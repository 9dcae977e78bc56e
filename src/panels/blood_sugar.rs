//! Post-prandial and serial blood sugar.
//!
//! Neither panel derives a value. The single result's reference range depends
//! on the hour-type modifier and is picked when the entry is built, so a
//! changed modifier always yields the range that matches it.

use log::warn;

use super::{field, FixedComponent, PanelForm, PanelKind, RawValues, ResultEntry};

pub const VALUE_KEY: &str = "value";
pub const MEAL_TYPE_KEY: &str = "mealType";
pub const HOUR_TYPE_KEY: &str = "hourType";

pub const ONE_HOUR: &str = "After 1 Hour";
pub const TWO_HOURS: &str = "After 2 Hours";

pub const MEAL_TYPES: [&str; 3] = ["After Breakfast", "After Lunch", "After Dinner"];

const ONE_HOUR_RANGE: &str = "< 160";
const DEFAULT_RANGE: &str = "< 140";

pub const PPBS_LAYOUT: &[FixedComponent] = &[FixedComponent::new(
    VALUE_KEY,
    "Post Prandial Blood Sugar",
    "mg/dL",
    DEFAULT_RANGE,
)];

pub const BSS_LAYOUT: &[FixedComponent] =
    &[FixedComponent::new(VALUE_KEY, "Blood Sugar Series", "mg/dL", DEFAULT_RANGE)];

/// Range for a post-prandial reading taken at `hour_type`.
pub fn reference_range_for(hour_type: &str) -> &'static str {
    if hour_type.trim().eq_ignore_ascii_case(ONE_HOUR) {
        ONE_HOUR_RANGE
    } else {
        DEFAULT_RANGE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BloodSugarValues {
    pub kind: PanelKind,
    pub value: String,
    pub meal_type: String,
    pub hour_type: String,
}

impl BloodSugarValues {
    pub fn from_raw(kind: PanelKind, raw: &RawValues) -> Self {
        let meal_type = field(raw, MEAL_TYPE_KEY);
        if !meal_type.is_empty() && !MEAL_TYPES.iter().any(|m| m.eq_ignore_ascii_case(&meal_type)) {
            warn!("Unrecognised meal type for {}: {}", kind.code(), meal_type);
        }

        Self {
            kind,
            value: field(raw, VALUE_KEY),
            meal_type,
            hour_type: field(raw, HOUR_TYPE_KEY),
        }
    }

    pub fn reference_range(&self) -> &'static str {
        reference_range_for(&self.hour_type)
    }
}

impl PanelForm for BloodSugarValues {
    fn kind(&self) -> PanelKind {
        self.kind
    }

    fn raw_value(&self, key: &str) -> String {
        match key {
            VALUE_KEY => self.value.clone(),
            _ => String::new(),
        }
    }

    fn entries(&self) -> Vec<ResultEntry> {
        self.kind
            .layout()
            .iter()
            .map(|component| {
                ResultEntry::new(
                    self.kind.code(),
                    component.name,
                    self.raw_value(component.key),
                    component.unit,
                    self.reference_range(),
                )
                .with_timing(&self.meal_type, &self.hour_type)
            })
            .collect()
    }
}
