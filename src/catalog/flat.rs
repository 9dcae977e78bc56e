//! Flat CSV catalog format, one row per test or per test component.
//!
//! ```text
//! code,name,category,price,unit,component,range,population,qualitative,mealOptions,resultOptions
//! TSH,Thyroid Stimulating Hormone,Hormones,2500,mIU/L,,0.4 - 4.0,,,,
//! LFT,Liver Function Test,Biochemistry,3200,U/L,SGPT,< 41,,,,
//! LFT,Liver Function Test,Biochemistry,3200,mg/dL,Total Bilirubin,0.3 - 1.2,,,,
//! DENGUE,Dengue NS1 Antigen,Serology,1800,,,Negative,,true,,Positive;Negative
//! ```
//!
//! Rows sharing a code build one panel. Component order follows row order,
//! and a component row whose unit differs from the panel's first row becomes
//! a per-component unit override. `resultOptions` is `;`-separated and the
//! column may be left out entirely.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

use super::{RangeSpec, TestPanel};
use crate::error::{LimsError, LimsResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRow {
    code: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    component: Option<String>,
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    population: Option<String>,
    #[serde(default)]
    qualitative: Option<bool>,
    #[serde(default)]
    meal_options: Option<bool>,
    #[serde(default)]
    result_options: Option<String>,
}

pub fn read_panels<R: Read>(reader: R) -> LimsResult<Vec<TestPanel>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut panels: Vec<TestPanel> = Vec::new();

    for (index, row) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        let row = row?;
        let line = index + 2;

        if row.code.is_empty() {
            return Err(LimsError::InvalidCatalog(format!(
                "Row {} has no test code",
                line
            )));
        }

        let position = panels.iter().position(|p| p.code == row.code);
        let panel = match position {
            Some(i) => &mut panels[i],
            None => {
                panels.push(new_panel(&row));
                let last = panels.len() - 1;
                &mut panels[last]
            }
        };

        apply_row(panel, row, line)?;
    }

    Ok(panels)
}

fn new_panel(row: &CatalogRow) -> TestPanel {
    TestPanel {
        code: row.code.clone(),
        name: row.name.clone(),
        category: row.category.clone().unwrap_or_default(),
        price: row.price.unwrap_or(0.0),
        unit: row.unit.clone().unwrap_or_default(),
        reference_range: None,
        components: BTreeMap::new(),
        unit_per_test: BTreeMap::new(),
        component_order: Vec::new(),
        qualitative: row.qualitative.unwrap_or(false),
        result_options: Vec::new(),
        has_meal_options: row.meal_options.unwrap_or(false),
    }
}

fn apply_row(panel: &mut TestPanel, row: CatalogRow, line: usize) -> LimsResult<()> {
    if let Some(options) = row.result_options.as_deref() {
        for option in options.split(';').map(str::trim).filter(|o| !o.is_empty()) {
            if !panel.result_options.iter().any(|o| o == option) {
                panel.result_options.push(option.to_string());
            }
        }
    }

    let range = row.range.unwrap_or_default();
    let population = row.population.filter(|p| !p.is_empty());

    match row.component.filter(|c| !c.is_empty()) {
        None => {
            if panel.is_multi_component() {
                return Err(LimsError::InvalidCatalog(format!(
                    "Row {}: test {} mixes component rows with a whole-test row",
                    line, panel.code
                )));
            }
            panel.reference_range = Some(merge_range(panel.reference_range.take(), population, range));
        }
        Some(component) => {
            if panel.reference_range.is_some() {
                return Err(LimsError::InvalidCatalog(format!(
                    "Row {}: test {} mixes component rows with a whole-test row",
                    line, panel.code
                )));
            }
            if let Some(unit) = row.unit.filter(|u| !u.is_empty() && *u != panel.unit) {
                panel.unit_per_test.insert(component.clone(), unit);
            }
            if !panel.component_order.contains(&component) {
                panel.component_order.push(component.clone());
            }
            let existing = panel.components.remove(&component);
            panel
                .components
                .insert(component, merge_range(existing, population, range));
        }
    }

    Ok(())
}

/// Fold a row's range into what earlier rows defined for the same target.
fn merge_range(existing: Option<RangeSpec>, population: Option<String>, range: String) -> RangeSpec {
    match (existing, population) {
        (_, None) => RangeSpec::Text(range),
        (Some(RangeSpec::ByPopulation(mut ranges)), Some(population)) => {
            ranges.insert(population, range);
            RangeSpec::ByPopulation(ranges)
        }
        (_, Some(population)) => {
            let mut ranges = BTreeMap::new();
            ranges.insert(population, range);
            RangeSpec::ByPopulation(ranges)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
code,name,category,price,unit,component,range,population,qualitative,mealOptions
TSH,Thyroid Stimulating Hormone,Hormones,2500,mIU/L,,0.4 - 4.0,,,
LFT,Liver Function Test,Biochemistry,3200,U/L,SGPT,< 41,,,
LFT,Liver Function Test,Biochemistry,3200,U/L,SGOT,< 40,,,
LFT,Liver Function Test,Biochemistry,3200,mg/dL,Total Bilirubin,0.3 - 1.2,,,
HB,Hemoglobin,Haematology,600,g/dL,,13.0 - 17.0,Male,,
HB,Hemoglobin,Haematology,600,g/dL,,11.5 - 15.5,Female,,
DENGUE,Dengue NS1 Antigen,Serology,1800,,,Negative,,true,
FBS,Fasting Blood Sugar,Biochemistry,400,mg/dL,,60 - 115,,,true
";

    #[test]
    fn test_read_flat_catalog() {
        let panels = read_panels(CSV.as_bytes()).unwrap();
        assert_eq!(panels.len(), 5);

        let lft = &panels[1];
        assert_eq!(lft.component_order, vec!["SGPT", "SGOT", "Total Bilirubin"]);
        assert_eq!(lft.unit_for("Total Bilirubin"), "mg/dL");
        assert_eq!(lft.unit_for("SGPT"), "U/L");
        assert_eq!(lft.range_for("SGOT", None).as_deref(), Some("< 40"));
    }

    #[test]
    fn test_population_rows_merge() {
        let panels = read_panels(CSV.as_bytes()).unwrap();
        let hb = &panels[2];
        assert_eq!(hb.range_for("HB", Some("Male")).as_deref(), Some("13.0 - 17.0"));
        assert_eq!(hb.range_for("HB", Some("Female")).as_deref(), Some("11.5 - 15.5"));
    }

    #[test]
    fn test_flags() {
        let panels = read_panels(CSV.as_bytes()).unwrap();
        assert!(panels[3].qualitative);
        assert!(panels[4].has_meal_options);
        assert!(!panels[0].qualitative);
    }

    #[test]
    fn test_result_options_column() {
        let csv = "\
code,name,category,price,unit,component,range,population,qualitative,mealOptions,resultOptions
DENGUE,Dengue NS1 Antigen,Serology,1800,,,Negative,,true,,Positive; Negative
";
        let panels = read_panels(csv.as_bytes()).unwrap();
        assert_eq!(panels[0].result_options, vec!["Positive", "Negative"]);
        assert!(panels[0].accepts_result("POSITIVE"));
        assert!(!panels[0].accepts_result("Equivocal"));
        assert!(panels[0].reference_range.is_some());
    }

    #[test]
    fn test_mixed_rows_rejected() {
        let csv = "\
code,name,category,price,unit,component,range,population,qualitative,mealOptions
LFT,Liver Function Test,,3200,U/L,SGPT,< 41,,,
LFT,Liver Function Test,,3200,U/L,,< 40,,,
";
        assert!(matches!(
            read_panels(csv.as_bytes()),
            Err(LimsError::InvalidCatalog(_))
        ));
    }
}
