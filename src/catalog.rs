pub mod flat;

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{LimsError, LimsResult};

/// Reference range text, optionally split by sub-population (e.g. sex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    Text(String),
    ByPopulation(BTreeMap<String, String>),
}

impl RangeSpec {
    /// Range text for a patient population.
    ///
    /// Unmatched populations render every option as `"Key: range"` joined by
    /// `"; "`; such text never classifies.
    pub fn resolve(&self, population: Option<&str>) -> String {
        match self {
            RangeSpec::Text(text) => text.clone(),
            RangeSpec::ByPopulation(ranges) => {
                if let Some(population) = population.map(str::trim).filter(|p| !p.is_empty()) {
                    if let Some((_, range)) = ranges
                        .iter()
                        .find(|(key, _)| key.trim().eq_ignore_ascii_case(population))
                    {
                        return range.clone();
                    }
                }
                ranges
                    .iter()
                    .map(|(key, range)| format!("{}: {}", key, range))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPanel {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub unit: String,
    /// Range of a single-component test.
    #[serde(default)]
    pub reference_range: Option<RangeSpec>,
    /// Component name to range, for multi-component tests.
    #[serde(default)]
    pub components: BTreeMap<String, RangeSpec>,
    #[serde(default)]
    pub unit_per_test: BTreeMap<String, String>,
    #[serde(default)]
    pub component_order: Vec<String>,
    #[serde(default)]
    pub qualitative: bool,
    #[serde(default)]
    pub result_options: Vec<String>,
    #[serde(default)]
    pub has_meal_options: bool,
}

impl TestPanel {
    pub fn single(code: &str, name: &str, unit: &str, range: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            category: String::new(),
            price: 0.0,
            unit: unit.to_string(),
            reference_range: Some(RangeSpec::Text(range.to_string())),
            components: BTreeMap::new(),
            unit_per_test: BTreeMap::new(),
            component_order: Vec::new(),
            qualitative: false,
            result_options: Vec::new(),
            has_meal_options: false,
        }
    }

    pub fn is_multi_component(&self) -> bool {
        !self.components.is_empty()
    }

    /// Components in display order: the operator-defined order first, then
    /// any remaining components by name.
    pub fn ordered_components(&self) -> Vec<(&str, &RangeSpec)> {
        let mut ordered: Vec<(&str, &RangeSpec)> = self
            .component_order
            .iter()
            .filter_map(|name| {
                self.components
                    .get_key_value(name.as_str())
                    .map(|(k, v)| (k.as_str(), v))
            })
            .collect();

        for (name, range) in &self.components {
            if !ordered.iter().any(|(n, _)| *n == name.as_str()) {
                ordered.push((name.as_str(), range));
            }
        }

        ordered
    }

    pub fn unit_for(&self, component: &str) -> &str {
        self.unit_per_test
            .get(component)
            .map(String::as_str)
            .unwrap_or(&self.unit)
    }

    /// Whether `value` is one of the listed outcomes of a qualitative test.
    ///
    /// Blank values, numeric tests and tests without listed outcomes accept
    /// anything.
    pub fn accepts_result(&self, value: &str) -> bool {
        let value = value.trim();
        if !self.qualitative || self.result_options.is_empty() || value.is_empty() {
            return true;
        }
        self.result_options
            .iter()
            .any(|option| option.trim().eq_ignore_ascii_case(value))
    }

    /// Range of a named component, or of the test itself when single-component.
    pub fn range_for(&self, component: &str, population: Option<&str>) -> Option<String> {
        if let Some(range) = self.components.get(component) {
            return Some(range.resolve(population));
        }
        if !self.is_multi_component() {
            return self.reference_range.as_ref().map(|r| r.resolve(population));
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCatalog {
    panels: Vec<TestPanel>,
}

impl TestCatalog {
    pub fn new(panels: Vec<TestPanel>) -> LimsResult<Self> {
        let catalog = Self { panels };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog; `.csv` files use the flat row format, anything else is JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LimsResult<Self> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let catalog = if is_csv {
            Self::new(flat::read_panels(std::fs::File::open(path)?)?)?
        } else {
            Self::from_json_str(&std::fs::read_to_string(path)?)?
        };

        debug!("Loaded {} test panels from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn from_json_str(content: &str) -> LimsResult<Self> {
        let catalog: TestCatalog = serde_json::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn get(&self, code: &str) -> Option<&TestPanel> {
        let code = code.trim();
        self.panels
            .iter()
            .find(|panel| panel.code.eq_ignore_ascii_case(code))
    }

    pub fn panels(&self) -> &[TestPanel] {
        &self.panels
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn validate(&self) -> LimsResult<()> {
        let mut seen = HashSet::new();

        for panel in &self.panels {
            let code = panel.code.trim();
            if code.is_empty() {
                return Err(LimsError::InvalidCatalog(
                    "Test code must not be empty".to_string(),
                ));
            }
            if !seen.insert(code.to_ascii_uppercase()) {
                return Err(LimsError::InvalidCatalog(format!(
                    "Duplicate test code: {}",
                    code
                )));
            }
            if panel.name.trim().is_empty() {
                return Err(LimsError::InvalidCatalog(format!(
                    "Test {} has no name",
                    code
                )));
            }
            if !panel.price.is_finite() || panel.price < 0.0 {
                return Err(LimsError::InvalidCatalog(format!(
                    "Test {} has an invalid price: {}",
                    code, panel.price
                )));
            }

            self.validate_components(panel)?;
        }

        Ok(())
    }

    fn validate_components(&self, panel: &TestPanel) -> LimsResult<()> {
        for name in &panel.component_order {
            if !panel.components.contains_key(name) {
                return Err(LimsError::InvalidCatalog(format!(
                    "Test {} orders unknown component: {}",
                    panel.code, name
                )));
            }
        }

        for name in panel.unit_per_test.keys() {
            if !panel.components.contains_key(name) {
                return Err(LimsError::InvalidCatalog(format!(
                    "Test {} sets a unit for unknown component: {}",
                    panel.code, name
                )));
            }
        }

        if !panel.qualitative && !panel.result_options.is_empty() {
            return Err(LimsError::InvalidCatalog(format!(
                "Test {} lists result options but is not qualitative",
                panel.code
            )));
        }

        Ok(())
    }
}
