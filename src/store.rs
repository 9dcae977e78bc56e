//! Report persistence behind an explicit interface.
//!
//! One store is constructed at start-up and handed by reference to whatever
//! saves or loads reports.

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{LimsError, LimsResult};
use crate::panels::ResultEntry;

const ID_PREFIX: &str = "RPT-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub patient_id: String,
    /// Population key the ranges were resolved with, kept for editing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    pub reviewer: String,
    pub remarks: String,
    pub date: NaiveDate,
    pub results: Vec<ResultEntry>,
}

impl NewReport {
    pub fn validate(&self) -> LimsResult<()> {
        if self.results.iter().all(|r| !r.has_value()) {
            return Err(LimsError::NothingToSave);
        }
        if self.patient_id.trim().is_empty() {
            return Err(LimsError::InvalidDraft(
                "Patient id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub id: String,
    #[serde(flatten)]
    pub report: NewReport,
}

pub trait ReportStore {
    /// Persist a report and return its generated id.
    fn save(&mut self, report: NewReport) -> LimsResult<String>;

    fn get(&self, id: &str) -> LimsResult<StoredReport>;

    fn list(&self) -> LimsResult<Vec<StoredReport>>;

    /// Replace an existing report with its edited version, keeping the id.
    fn update(&mut self, id: &str, report: NewReport) -> LimsResult<()>;
}

pub fn open_store(config: &StoreConfig) -> LimsResult<Box<dyn ReportStore>> {
    match config {
        StoreConfig::Memory => Ok(Box::new(InMemoryStore::new())),
        StoreConfig::Json(path) => Ok(Box::new(JsonFileStore::open(path)?)),
    }
}

fn format_id(sequence: u64) -> String {
    format!("{}{:05}", ID_PREFIX, sequence)
}

fn parse_sequence(id: &str) -> Option<u64> {
    id.strip_prefix(ID_PREFIX)?.parse().ok()
}

#[derive(Debug)]
pub struct InMemoryStore {
    reports: BTreeMap<String, StoredReport>,
    next_sequence: u64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            reports: BTreeMap::new(),
            next_sequence: 1,
        }
    }
}

impl ReportStore for InMemoryStore {
    fn save(&mut self, report: NewReport) -> LimsResult<String> {
        report.validate()?;
        let id = format_id(self.next_sequence);
        self.next_sequence += 1;
        self.reports.insert(
            id.clone(),
            StoredReport {
                id: id.clone(),
                report,
            },
        );
        debug!("Stored report {} in memory", id);
        Ok(id)
    }

    fn get(&self, id: &str) -> LimsResult<StoredReport> {
        self.reports
            .get(id)
            .cloned()
            .ok_or_else(|| LimsError::ReportNotFound(id.to_string()))
    }

    fn list(&self) -> LimsResult<Vec<StoredReport>> {
        Ok(self.reports.values().cloned().collect())
    }

    fn update(&mut self, id: &str, report: NewReport) -> LimsResult<()> {
        let stored = self
            .reports
            .get_mut(id)
            .ok_or_else(|| LimsError::ReportNotFound(id.to_string()))?;
        report.validate()?;
        stored.report = report;
        debug!("Updated report {} in memory", id);
        Ok(())
    }
}

/// Whole-file JSON persistence, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    reports: Vec<StoredReport>,
}

impl JsonFileStore {
    /// Open the store file, starting empty when it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> LimsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let reports = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        debug!("Opened report store {:?} with {} reports", path, reports.len());
        Ok(Self { path, reports })
    }

    fn next_id(&self) -> String {
        let last = self
            .reports
            .iter()
            .filter_map(|r| parse_sequence(&r.id))
            .max()
            .unwrap_or(0);
        format_id(last + 1)
    }

    fn flush(&self) -> LimsResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &self.reports)?;
        Ok(())
    }
}

impl ReportStore for JsonFileStore {
    fn save(&mut self, report: NewReport) -> LimsResult<String> {
        report.validate()?;
        let id = self.next_id();
        self.reports.push(StoredReport {
            id: id.clone(),
            report,
        });
        self.flush()?;
        info!("Saved report {} to {:?}", id, self.path);
        Ok(id)
    }

    fn get(&self, id: &str) -> LimsResult<StoredReport> {
        self.reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| LimsError::ReportNotFound(id.to_string()))
    }

    fn list(&self) -> LimsResult<Vec<StoredReport>> {
        Ok(self.reports.clone())
    }

    fn update(&mut self, id: &str, report: NewReport) -> LimsResult<()> {
        let index = self
            .reports
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| LimsError::ReportNotFound(id.to_string()))?;

        report.validate()?;
        self.reports[index].report = report;
        self.flush()?;
        info!("Updated report {} in {:?}", id, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(value: &str) -> NewReport {
        NewReport {
            patient_id: "P-001".to_string(),
            sex: None,
            reviewer: "Dr. Perera".to_string(),
            remarks: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            results: vec![ResultEntry::new("TSH", "TSH", value, "mIU/L", "0.4 - 4.0")],
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lab_report_engine_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_memory_store_generates_ids() {
        let mut store = InMemoryStore::new();
        let first = store.save(report("2.1")).unwrap();
        let second = store.save(report("3.0")).unwrap();
        assert_eq!(first, "RPT-00001");
        assert_eq!(second, "RPT-00002");
        assert_eq!(store.get(&second).unwrap().report.results[0].value, "3.0");
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_report_rejected() {
        let mut store = InMemoryStore::new();
        let mut empty = report("");
        assert!(matches!(store.save(empty.clone()), Err(LimsError::NothingToSave)));
        empty.results.clear();
        assert!(matches!(store.save(empty), Err(LimsError::NothingToSave)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_whole_report() {
        let mut store = InMemoryStore::new();
        let id = store.save(report("2.1")).unwrap();

        let mut edited = report("4.5");
        edited.reviewer = "Dr. Fernando".to_string();
        edited.remarks = "Repeat after treatment".to_string();
        edited.sex = Some("Female".to_string());
        store.update(&id, edited).unwrap();

        let stored = store.get(&id).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.report.results[0].value, "4.5");
        assert_eq!(stored.report.reviewer, "Dr. Fernando");
        assert_eq!(stored.report.remarks, "Repeat after treatment");
        assert_eq!(stored.report.sex.as_deref(), Some("Female"));
        assert_eq!(store.list().unwrap().len(), 1);

        assert!(matches!(
            store.update(&id, report("")),
            Err(LimsError::NothingToSave)
        ));
        assert_eq!(store.get(&id).unwrap().report.reviewer, "Dr. Fernando");
        assert!(matches!(
            store.update("RPT-99999", report("1.0")),
            Err(LimsError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_json_store_update_persists() {
        let path = temp_path("update");
        let _ = std::fs::remove_file(&path);

        let id = {
            let mut store = JsonFileStore::open(&path).unwrap();
            let id = store.save(report("2.1")).unwrap();
            let mut edited = report("3.3");
            edited.remarks = "Edited".to_string();
            store.update(&id, edited).unwrap();
            id
        };

        let reopened = JsonFileStore::open(&path).unwrap();
        let stored = reopened.get(&id).unwrap();
        assert_eq!(stored.report.results[0].value, "3.3");
        assert_eq!(stored.report.remarks, "Edited");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_json_store_persists_across_opens() {
        let path = temp_path("persist");
        let _ = std::fs::remove_file(&path);

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            assert_eq!(store.save(report("2.1")).unwrap(), "RPT-00001");
        }

        let mut reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 1);
        assert_eq!(reopened.save(report("1.8")).unwrap(), "RPT-00002");
        assert_eq!(reopened.get("RPT-00001").unwrap().report.reviewer, "Dr. Perera");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_stored_report_json_shape() {
        let stored = StoredReport {
            id: "RPT-00001".to_string(),
            report: report("2.1"),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], "RPT-00001");
        assert_eq!(json["patientId"], "P-001");
        assert_eq!(json["date"], "2024-03-14");
        assert!(json.get("sex").is_none());
        assert_eq!(json["results"][0]["testName"], "TSH");
    }
}
