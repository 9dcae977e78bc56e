//! Catalog-driven panels: everything without a fixed layout.

use log::warn;

use super::{blood_sugar, field, RawValues, ResultEntry};
use crate::catalog::TestPanel;

/// Form key holding a single-component test's value.
pub const VALUE_KEY: &str = "value";
pub const COMMENTS_KEY: &str = "comments";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericValues {
    pub code: String,
    pub raw: RawValues,
}

impl GenericValues {
    pub fn from_raw(code: &str, raw: &RawValues) -> Self {
        Self {
            code: code.trim().to_string(),
            raw: raw.clone(),
        }
    }

    fn value(&self, key: &str) -> String {
        field(&self.raw, key)
    }

    /// Expand into entries using the catalog definition of the test.
    ///
    /// Multi-component tests produce one entry per component in display
    /// order. Codes missing from the catalog produce one bare entry named
    /// after the code.
    pub fn entries(&self, panel: Option<&TestPanel>, population: Option<&str>) -> Vec<ResultEntry> {
        let Some(panel) = panel else {
            warn!("Test {} is not in the catalog; saving without unit or range", self.code);
            return vec![ResultEntry::new(
                self.code.as_str(),
                self.code.as_str(),
                self.value(VALUE_KEY),
                "",
                "",
            )
            .with_comments(&self.value(COMMENTS_KEY))];
        };

        let entries: Vec<ResultEntry> = if panel.is_multi_component() {
            panel
                .ordered_components()
                .into_iter()
                .map(|(component, range)| {
                    ResultEntry::new(
                        panel.code.as_str(),
                        component,
                        self.value(component),
                        panel.unit_for(component),
                        range.resolve(population),
                    )
                })
                .collect()
        } else {
            let range = panel
                .reference_range
                .as_ref()
                .map(|r| r.resolve(population))
                .unwrap_or_default();
            vec![ResultEntry::new(
                panel.code.as_str(),
                panel.name.as_str(),
                self.value(VALUE_KEY),
                panel.unit.as_str(),
                range,
            )
            .with_comments(&self.value(COMMENTS_KEY))]
        };

        for entry in entries.iter().filter(|e| !panel.accepts_result(&e.value)) {
            warn!(
                "Result '{}' for {} is not one of: {}",
                entry.value,
                entry.test_name,
                panel.result_options.join(", ")
            );
        }

        if panel.has_meal_options {
            let meal = self.value(blood_sugar::MEAL_TYPE_KEY);
            let hour = self.value(blood_sugar::HOUR_TYPE_KEY);
            entries
                .into_iter()
                .map(|e| e.with_timing(&meal, &hour))
                .collect()
        } else {
            entries
        }
    }
}
