use super::ClassifiedEntry;
use crate::range::Verdict;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub normal: usize,
    pub abnormal: usize,
    pub indeterminate: usize,
    /// Names of out-of-range results, in report order.
    pub abnormal_tests: Vec<String>,
}

impl ReportSummary {
    pub fn from_classified(classified: &[ClassifiedEntry]) -> Self {
        let count = |verdict: Verdict| classified.iter().filter(|c| c.verdict == verdict).count();

        Self {
            total: classified.len(),
            normal: count(Verdict::InRange),
            abnormal: count(Verdict::OutOfRange),
            indeterminate: count(Verdict::Indeterminate),
            abnormal_tests: classified
                .iter()
                .filter(|c| c.verdict.is_abnormal())
                .map(|c| c.entry.test_name.clone())
                .collect(),
        }
    }

    pub fn has_abnormal(&self) -> bool {
        self.abnormal > 0
    }
}
