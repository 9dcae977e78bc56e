use serde::{Deserialize, Serialize};

use crate::panels::ResultEntry;
use crate::range::Verdict;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    pub entry: ResultEntry,
    pub verdict: Verdict,
}

impl ClassifiedEntry {
    pub fn badge(&self) -> &'static str {
        self.verdict.label().unwrap_or("")
    }
}

pub fn classify_report(entries: &[ResultEntry]) -> Vec<ClassifiedEntry> {
    entries
        .iter()
        .map(|entry| ClassifiedEntry {
            entry: entry.clone(),
            verdict: entry.verdict(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_report() {
        let entries = vec![
            ResultEntry::new("TSH", "TSH", "2.1", "mIU/L", "0.4 - 4.0"),
            ResultEntry::new("LIPID", "HDL Cholesterol", "35", "mg/dL", "> 40"),
            ResultEntry::new("UFR", "Colour", "Amber", "", "Pale Yellow"),
        ];
        let classified = classify_report(&entries);
        let badges: Vec<&str> = classified.iter().map(|c| c.badge()).collect();
        assert_eq!(badges, vec!["Normal", "Abnormal", ""]);
        assert_eq!(classified[1].entry, entries[1]);
    }
}
