pub mod report;
pub mod summary;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::catalog::TestCatalog;
use crate::config::RangeSource;
use crate::error::{LimsError, LimsResult};
use crate::panels::{restore_raw, PanelKind, PanelValues, RawValues, ResultEntry};
use crate::store::{NewReport, ReportStore};

pub use report::*;
pub use summary::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContext {
    pub patient_id: String,
    /// Sub-population key for catalog ranges, e.g. "Male" or "Female".
    #[serde(default)]
    pub sex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelSelection {
    pub code: String,
    #[serde(default)]
    pub values: RawValues,
}

impl PanelSelection {
    pub fn new(code: &str, values: RawValues) -> Self {
        Self {
            code: code.to_string(),
            values,
        }
    }
}

/// A report being authored: the patient, and the panels in the order the
/// operator selected them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub patient: PatientContext,
    #[serde(default)]
    pub reviewer: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub panels: Vec<PanelSelection>,
}

impl ReportDraft {
    pub fn from_file<P: AsRef<Path>>(path: P) -> LimsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let draft: ReportDraft = serde_json::from_str(&content)?;
        draft.validate()?;
        Ok(draft)
    }

    pub fn validate(&self) -> LimsResult<()> {
        if self.patient.patient_id.trim().is_empty() {
            return Err(LimsError::InvalidDraft(
                "Patient id must not be empty".to_string(),
            ));
        }
        if self.panels.is_empty() {
            return Err(LimsError::InvalidDraft(
                "At least one test must be selected".to_string(),
            ));
        }
        Ok(())
    }

    /// Rebuild a draft from a saved report so it can be edited and
    /// assembled again through the same path as a new report.
    pub fn from_saved(patient: PatientContext, entries: &[ResultEntry]) -> Self {
        let mut codes: Vec<&str> = Vec::new();
        for entry in entries {
            if !codes.iter().any(|c| c.eq_ignore_ascii_case(&entry.test_code)) {
                codes.push(entry.test_code.as_str());
            }
        }

        let panels = codes
            .into_iter()
            .map(|code| PanelSelection::new(code, restore_raw(code, entries)))
            .collect();

        Self {
            patient,
            panels,
            ..Self::default()
        }
    }

    /// Draft of a saved report with its patient, reviewer, remarks and date.
    pub fn from_report(report: &NewReport) -> Self {
        let patient = PatientContext {
            patient_id: report.patient_id.clone(),
            sex: report.sex.clone(),
        };
        Self {
            reviewer: report.reviewer.clone(),
            remarks: report.remarks.clone(),
            date: Some(report.date),
            ..Self::from_saved(patient, &report.results)
        }
    }

    /// The report to persist for these assembled results.
    ///
    /// `default_date` applies when the draft carries no date.
    pub fn to_report(&self, results: Vec<ResultEntry>, default_date: NaiveDate) -> NewReport {
        NewReport {
            patient_id: self.patient.patient_id.clone(),
            sex: self.patient.sex.clone(),
            reviewer: self.reviewer.clone(),
            remarks: self.remarks.clone(),
            date: self.date.unwrap_or(default_date),
            results,
        }
    }
}

/// Turns panel selections into the flat result list that gets persisted.
///
/// Create and edit flows share this one implementation.
pub struct Assembler<'a> {
    catalog: &'a TestCatalog,
    range_source: RangeSource,
}

impl<'a> Assembler<'a> {
    pub fn new(catalog: &'a TestCatalog, range_source: RangeSource) -> Self {
        Self {
            catalog,
            range_source,
        }
    }

    /// Entries for every selected panel in selection order, blanks dropped.
    ///
    /// Returns [`LimsError::NothingToSave`] when no panel has a value.
    pub fn assemble(&self, draft: &ReportDraft) -> LimsResult<Vec<ResultEntry>> {
        let population = draft.patient.sex.as_deref();
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for selection in &draft.panels {
            let code = selection.code.trim();
            if !seen.insert(code.to_ascii_uppercase()) {
                warn!("Test {} selected more than once; keeping the first selection", code);
                continue;
            }

            let entries = self.expand(selection, population);
            let before = results.len();
            results.extend(entries.into_iter().filter(ResultEntry::has_value));
            debug!("Test {} contributed {} results", code, results.len() - before);
        }

        if results.is_empty() {
            return Err(LimsError::NothingToSave);
        }

        info!(
            "Assembled {} results from {} selected tests for patient {}",
            results.len(),
            draft.panels.len(),
            draft.patient.patient_id
        );
        Ok(results)
    }

    /// Reassemble an edited draft and replace the stored report with it.
    ///
    /// The stored date is kept when the draft has none.
    pub fn save_edit(&self, store: &mut dyn ReportStore, id: &str, draft: &ReportDraft) -> LimsResult<()> {
        let stored = store.get(id)?;
        let results = self.assemble(draft)?;
        let report = draft.to_report(results, stored.report.date);

        if report.patient_id != stored.report.patient_id {
            warn!(
                "Report {} moves from patient {} to {}",
                id, stored.report.patient_id, report.patient_id
            );
        }

        store.update(id, report)?;
        info!("Report {} updated", id);
        Ok(())
    }

    /// All entries of one panel, blank ones included.
    pub fn expand(&self, selection: &PanelSelection, population: Option<&str>) -> Vec<ResultEntry> {
        let values = PanelValues::from_raw(&selection.code, &selection.values);

        match (&values, values.form()) {
            (PanelValues::Generic(generic), _) => {
                generic.entries(self.catalog.get(&selection.code), population)
            }
            (_, Some(form)) => {
                let entries = form.entries();
                match self.range_source {
                    RangeSource::Fixed => entries,
                    RangeSource::Catalog => self.apply_catalog_ranges(form.kind(), entries, population),
                }
            }
            (_, None) => Vec::new(),
        }
    }

    fn apply_catalog_ranges(
        &self,
        kind: PanelKind,
        entries: Vec<ResultEntry>,
        population: Option<&str>,
    ) -> Vec<ResultEntry> {
        let Some(panel) = self.catalog.get(kind.code()) else {
            return entries;
        };
        if kind.has_timed_range() || !panel.is_multi_component() {
            return entries;
        }

        entries
            .into_iter()
            .map(|mut entry| {
                if let Some(range) = panel.range_for(&entry.test_name, population) {
                    entry.reference_range = range;
                    let unit = panel.unit_for(&entry.test_name);
                    if !unit.is_empty() {
                        entry.unit = unit.to_string();
                    }
                }
                entry
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RangeSpec, TestPanel};
    use crate::range::Verdict;
    use crate::store::InMemoryStore;

    fn raw(pairs: &[(&str, &str)]) -> RawValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn catalog() -> TestCatalog {
        let tsh = TestPanel::single("TSH", "Thyroid Stimulating Hormone", "mIU/L", "0.4 - 4.0");

        let mut fbc = TestPanel::single("FBC", "Full Blood Count", "", "");
        fbc.reference_range = None;
        fbc.components.insert(
            "Hemoglobin".to_string(),
            RangeSpec::ByPopulation(
                [
                    ("Male".to_string(), "13.0 - 17.0".to_string()),
                    ("Female".to_string(), "11.5 - 15.5".to_string()),
                ]
                .into_iter()
                .collect(),
            ),
        );
        fbc.unit_per_test.insert("Hemoglobin".to_string(), "g/L".to_string());

        TestCatalog::new(vec![tsh, fbc]).unwrap()
    }

    fn draft(panels: Vec<PanelSelection>) -> ReportDraft {
        ReportDraft {
            patient: PatientContext {
                patient_id: "P-001".to_string(),
                sex: Some("Male".to_string()),
            },
            panels,
            ..ReportDraft::default()
        }
    }

    #[test]
    fn test_selection_order_is_kept() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![
            PanelSelection::new("TSH", raw(&[("value", "2.1")])),
            PanelSelection::new("OGTT", raw(&[("fasting", "92"), ("secondHour", "150")])),
            PanelSelection::new("BGRh", raw(&[("bloodGroup", "O"), ("rhesus", "POSITIVE")])),
        ]);

        let results = assembler.assemble(&draft).unwrap();
        let codes: Vec<&str> = results.iter().map(|e| e.test_code.as_str()).collect();
        assert_eq!(codes, vec!["TSH", "OGTT", "OGTT", "BGRh"]);
        assert_eq!(results[2].test_name, "Blood Sugar After 2 Hours");
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![
            PanelSelection::new(
                "FBC",
                raw(&[("wbc", "8.0"), ("neutrophils", "60"), ("hemoglobin", "14.0"), ("rbc", "5.0"), ("pcv", "42.0")]),
            ),
            PanelSelection::new("LIPID", raw(&[("totalCholesterol", "210"), ("triglycerides", "180"), ("hdl", "42")])),
        ]);

        let first = assembler.assemble(&draft).unwrap();
        let second = assembler.assemble(&draft).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_blank_panels_are_nothing_to_save() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![
            PanelSelection::new("FBC", raw(&[("wbc", "  ")])),
            PanelSelection::new("TSH", RawValues::new()),
            PanelSelection::new("PPBS", raw(&[("hourType", "After 1 Hour")])),
        ]);

        assert!(matches!(
            assembler.assemble(&draft),
            Err(LimsError::NothingToSave)
        ));
    }

    #[test]
    fn test_derived_fields_only_when_computable() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![PanelSelection::new("FBC", raw(&[("hemoglobin", "14.0")]))]);

        let results = assembler.assemble(&draft).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "Hemoglobin");
    }

    #[test]
    fn test_unknown_code_falls_through() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![PanelSelection::new("ESR", raw(&[("value", "12")]))]);

        let results = assembler.assemble(&draft).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_code, "ESR");
    }

    #[test]
    fn test_duplicate_selection_kept_once() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![
            PanelSelection::new("TSH", raw(&[("value", "2.1")])),
            PanelSelection::new("tsh", raw(&[("value", "9.9")])),
        ]);

        let results = assembler.assemble(&draft).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "2.1");
    }

    #[test]
    fn test_fixed_ranges_ignore_catalog_by_default() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let draft = draft(vec![PanelSelection::new("FBC", raw(&[("hemoglobin", "14.0")]))]);
        let results = assembler.assemble(&draft).unwrap();
        assert_eq!(results[0].reference_range, "11.5 - 16.5");
        assert_eq!(results[0].unit, "g/dL");
    }

    #[test]
    fn test_catalog_ranges_override_when_configured() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Catalog);
        let draft = draft(vec![PanelSelection::new(
            "FBC",
            raw(&[("hemoglobin", "14.0"), ("platelets", "250")]),
        )]);
        let results = assembler.assemble(&draft).unwrap();
        assert_eq!(results[0].reference_range, "13.0 - 17.0");
        assert_eq!(results[0].unit, "g/L");
        // components the catalog does not define keep the built-in row
        assert_eq!(results[1].reference_range, "150 - 450");
    }

    #[test]
    fn test_ppbs_range_derived_at_save_time() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let mut draft = draft(vec![PanelSelection::new(
            "PPBS",
            raw(&[("value", "150"), ("mealType", "After Lunch"), ("hourType", "After 2 Hours")]),
        )]);

        let mut ranges = Vec::new();
        for hour_type in ["After 2 Hours", "After 1 Hour", "After 2 Hours"] {
            draft.panels[0]
                .values
                .insert("hourType".to_string(), hour_type.to_string());
            ranges.push(assembler.assemble(&draft).unwrap()[0].reference_range.clone());
        }
        assert_eq!(ranges, vec!["< 140", "< 160", "< 140"]);
    }

    #[test]
    fn test_edit_round_trip() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let original = draft(vec![
            PanelSelection::new("LIPID", raw(&[("totalCholesterol", "260"), ("triglycerides", "450"), ("hdl", "38"), ("ldl", "160")])),
            PanelSelection::new("TSH", raw(&[("value", "5.2"), ("comments", "Recheck")])),
            PanelSelection::new("BGRh", raw(&[("bloodGroup", "A"), ("rhesus", "NEGATIVE")])),
            PanelSelection::new("PPBS", raw(&[("value", "150"), ("hourType", "After 1 Hour")])),
        ]);
        let saved = assembler.assemble(&original).unwrap();

        let reopened = ReportDraft::from_saved(original.patient.clone(), &saved);
        let codes: Vec<&str> = reopened.panels.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["LIPID", "TSH", "BGRh", "PPBS"]);

        assert_eq!(assembler.assemble(&reopened).unwrap(), saved);
    }

    #[test]
    fn test_edit_does_not_revive_computed_ldl() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let original = draft(vec![PanelSelection::new(
            "LIPID",
            raw(&[("totalCholesterol", "250"), ("triglycerides", "300"), ("hdl", "40")]),
        )]);
        let saved = assembler.assemble(&original).unwrap();
        let ldl = saved.iter().find(|e| e.test_name == "LDL Cholesterol");
        assert_eq!(ldl.map(|e| e.value.as_str()), Some("150.0"));

        let mut reopened = ReportDraft::from_saved(original.patient.clone(), &saved);
        reopened.panels[0]
            .values
            .insert("triglycerides".to_string(), "450".to_string());
        let edited = assembler.assemble(&reopened).unwrap();

        assert!(edited.iter().all(|e| e.test_name != "LDL Cholesterol"));
        let vldl = edited.iter().find(|e| e.test_name == "VLDL Cholesterol");
        assert_eq!(vldl.map(|e| e.value.as_str()), Some("90.0"));
    }

    fn hemoglobin_catalog() -> TestCatalog {
        let mut hb = TestPanel::single("HB", "Hemoglobin", "g/dL", "");
        hb.reference_range = Some(RangeSpec::ByPopulation(
            [
                ("Male".to_string(), "13.0 - 17.0".to_string()),
                ("Female".to_string(), "11.5 - 15.5".to_string()),
            ]
            .into_iter()
            .collect(),
        ));
        TestCatalog::new(vec![hb]).unwrap()
    }

    #[test]
    fn test_reopened_report_keeps_population_range() {
        let catalog = hemoglobin_catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let original = draft(vec![PanelSelection::new("HB", raw(&[("value", "12")]))]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut store = InMemoryStore::new();
        let report = original.to_report(assembler.assemble(&original).unwrap(), date);
        assert_eq!(report.results[0].reference_range, "13.0 - 17.0");
        assert_eq!(report.results[0].verdict(), Verdict::OutOfRange);
        let id = store.save(report).unwrap();

        let reopened = ReportDraft::from_report(&store.get(&id).unwrap().report);
        assert_eq!(reopened.patient.sex.as_deref(), Some("Male"));
        assert_eq!(reopened.date, Some(date));

        let results = assembler.assemble(&reopened).unwrap();
        assert_eq!(results[0].reference_range, "13.0 - 17.0");
        assert_eq!(results[0].verdict(), Verdict::OutOfRange);
    }

    #[test]
    fn test_save_edit_replaces_metadata() {
        let catalog = catalog();
        let assembler = Assembler::new(&catalog, RangeSource::Fixed);
        let original = draft(vec![PanelSelection::new("TSH", raw(&[("value", "2.1")]))]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut store = InMemoryStore::new();
        let id = store
            .save(original.to_report(assembler.assemble(&original).unwrap(), date))
            .unwrap();

        let mut edited = ReportDraft::from_report(&store.get(&id).unwrap().report);
        edited.reviewer = "Dr. Jayasinghe".to_string();
        edited.remarks = "Hypothyroid follow-up".to_string();
        edited.date = None;
        edited.panels[0]
            .values
            .insert("value".to_string(), "6.8".to_string());
        assembler.save_edit(&mut store, &id, &edited).unwrap();

        let stored = store.get(&id).unwrap().report;
        assert_eq!(stored.reviewer, "Dr. Jayasinghe");
        assert_eq!(stored.remarks, "Hypothyroid follow-up");
        assert_eq!(stored.date, date);
        assert_eq!(stored.results[0].value, "6.8");

        assert!(matches!(
            assembler.save_edit(&mut store, "RPT-99999", &edited),
            Err(LimsError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_draft_validation() {
        let mut empty = draft(Vec::new());
        assert!(matches!(empty.validate(), Err(LimsError::InvalidDraft(_))));
        empty.panels.push(PanelSelection::new("TSH", RawValues::new()));
        assert!(empty.validate().is_ok());
        empty.patient.patient_id.clear();
        assert!(empty.validate().is_err());
    }
}
