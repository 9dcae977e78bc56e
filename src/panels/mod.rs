pub mod blood_group;
pub mod blood_sugar;
pub mod fbc;
pub mod generic;
pub mod lipid;
pub mod ogtt;
pub mod urinalysis;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::numeric::{parse_number, parse_positive, to_fixed};
use crate::range::{classify, Verdict};

pub use blood_group::BloodGroupValues;
pub use blood_sugar::BloodSugarValues;
pub use fbc::FbcValues;
pub use generic::GenericValues;
pub use lipid::LipidValues;
pub use ogtt::OgttValues;
pub use urinalysis::UrinalysisValues;

/// Field name to entered text, as collected from a panel's form.
pub type RawValues = BTreeMap<String, String>;

/// Derived fields of one panel, keyed by field name.
pub type DerivedFields = BTreeMap<String, Derived>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derived {
    /// Computed value; empty when an input is missing or unusable.
    Value(String),
    /// The formula is not valid for the current inputs and the operator must
    /// enter the value by hand.
    ManualEntry,
}

impl Derived {
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Derived::Value(v) => Some(v.as_str()),
            Derived::ManualEntry => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub test_code: String,
    pub test_name: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub reference_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour_type: Option<String>,
}

impl ResultEntry {
    pub fn new(
        test_code: impl Into<String>,
        test_name: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
        reference_range: impl Into<String>,
    ) -> Self {
        Self {
            test_code: test_code.into(),
            test_name: test_name.into(),
            value: value.into(),
            unit: unit.into(),
            reference_range: reference_range.into(),
            comments: None,
            meal_type: None,
            hour_type: None,
        }
    }

    pub fn with_comments(mut self, comments: &str) -> Self {
        self.comments = non_empty(comments);
        self
    }

    pub fn with_timing(mut self, meal_type: &str, hour_type: &str) -> Self {
        self.meal_type = non_empty(meal_type);
        self.hour_type = non_empty(hour_type);
        self
    }

    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }

    pub fn verdict(&self) -> Verdict {
        classify(&self.value, &self.reference_range)
    }
}

/// One row of a specially handled panel's fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedComponent {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub range: &'static str,
}

impl FixedComponent {
    pub const fn new(
        key: &'static str,
        name: &'static str,
        unit: &'static str,
        range: &'static str,
    ) -> Self {
        Self { key, name, unit, range }
    }
}

/// A panel form with a fixed layout and its own derivation rules.
pub trait PanelForm {
    fn kind(&self) -> PanelKind;

    /// Fields computed from sibling fields. Operator-entered fields are not included.
    fn derived(&self) -> DerivedFields {
        DerivedFields::new()
    }

    /// Operator-entered text for a layout key.
    fn raw_value(&self, key: &str) -> String;

    /// Every layout row as an entry, blank ones included.
    fn entries(&self) -> Vec<ResultEntry> {
        let kind = self.kind();
        let derived = self.derived();
        kind.layout()
            .iter()
            .map(|component| {
                let value = match derived.get(component.key) {
                    Some(Derived::Value(v)) => v.clone(),
                    Some(Derived::ManualEntry) | None => self.raw_value(component.key),
                };
                ResultEntry::new(kind.code(), component.name, value, component.unit, component.range)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelKind {
    Fbc,
    Lipid,
    Ufr,
    Ogtt,
    Ppbs,
    Bss,
    Bgrh,
}

impl PanelKind {
    pub const ALL: [PanelKind; 7] = [
        PanelKind::Fbc,
        PanelKind::Lipid,
        PanelKind::Ufr,
        PanelKind::Ogtt,
        PanelKind::Ppbs,
        PanelKind::Bss,
        PanelKind::Bgrh,
    ];

    /// Codes outside the specially handled set return `None` and go through
    /// catalog-driven assembly.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
    }

    pub fn code(&self) -> &'static str {
        match self {
            PanelKind::Fbc => "FBC",
            PanelKind::Lipid => "LIPID",
            PanelKind::Ufr => "UFR",
            PanelKind::Ogtt => "OGTT",
            PanelKind::Ppbs => "PPBS",
            PanelKind::Bss => "BSS",
            PanelKind::Bgrh => "BGRh",
        }
    }

    pub fn layout(&self) -> &'static [FixedComponent] {
        match self {
            PanelKind::Fbc => fbc::LAYOUT,
            PanelKind::Lipid => lipid::LAYOUT,
            PanelKind::Ufr => urinalysis::LAYOUT,
            PanelKind::Ogtt => ogtt::LAYOUT,
            PanelKind::Ppbs => blood_sugar::PPBS_LAYOUT,
            PanelKind::Bss => blood_sugar::BSS_LAYOUT,
            PanelKind::Bgrh => blood_group::LAYOUT,
        }
    }

    /// Post-prandial sugar ranges follow the hour-type rule, never a table.
    pub fn has_timed_range(&self) -> bool {
        matches!(self, PanelKind::Ppbs | PanelKind::Bss)
    }
}

/// Typed values of one selected panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelValues {
    Fbc(FbcValues),
    Lipid(LipidValues),
    Ufr(UrinalysisValues),
    Ogtt(OgttValues),
    Ppbs(BloodSugarValues),
    Bss(BloodSugarValues),
    Bgrh(BloodGroupValues),
    Generic(GenericValues),
}

impl PanelValues {
    pub fn from_raw(code: &str, raw: &RawValues) -> Self {
        match PanelKind::from_code(code) {
            Some(PanelKind::Fbc) => PanelValues::Fbc(FbcValues::from_raw(raw)),
            Some(PanelKind::Lipid) => PanelValues::Lipid(LipidValues::from_raw(raw)),
            Some(PanelKind::Ufr) => PanelValues::Ufr(UrinalysisValues::from_raw(raw)),
            Some(PanelKind::Ogtt) => PanelValues::Ogtt(OgttValues::from_raw(raw)),
            Some(PanelKind::Ppbs) => {
                PanelValues::Ppbs(BloodSugarValues::from_raw(PanelKind::Ppbs, raw))
            }
            Some(PanelKind::Bss) => {
                PanelValues::Bss(BloodSugarValues::from_raw(PanelKind::Bss, raw))
            }
            Some(PanelKind::Bgrh) => PanelValues::Bgrh(BloodGroupValues::from_raw(raw)),
            None => PanelValues::Generic(GenericValues::from_raw(code, raw)),
        }
    }

    pub fn form(&self) -> Option<&dyn PanelForm> {
        match self {
            PanelValues::Fbc(v) => Some(v),
            PanelValues::Lipid(v) => Some(v),
            PanelValues::Ufr(v) => Some(v),
            PanelValues::Ogtt(v) => Some(v),
            PanelValues::Ppbs(v) | PanelValues::Bss(v) => Some(v),
            PanelValues::Bgrh(v) => Some(v),
            PanelValues::Generic(_) => None,
        }
    }

    pub fn kind(&self) -> Option<PanelKind> {
        self.form().map(|f| f.kind())
    }
}

/// Derived fields for a panel given its raw form values.
///
/// Unknown codes have no derivations and yield an empty map.
pub fn compute_derived(panel_code: &str, raw: &RawValues) -> DerivedFields {
    match PanelValues::from_raw(panel_code, raw).form() {
        Some(form) => form.derived(),
        None => DerivedFields::new(),
    }
}

/// Rebuild a panel's raw form values from its stored entries.
///
/// Used when a saved report is reopened for editing. Rows the panel computes
/// from the restored inputs are left out, so a stored estimate never comes
/// back as an operator-entered value. A manual LDL survives because the
/// restored triglycerides still suspend the formula.
pub fn restore_raw(panel_code: &str, entries: &[ResultEntry]) -> RawValues {
    let mut raw = RawValues::new();
    let entries = entries
        .iter()
        .filter(|e| e.test_code.eq_ignore_ascii_case(panel_code.trim()));

    match PanelKind::from_code(panel_code) {
        Some(PanelKind::Bgrh) => {
            for entry in entries {
                raw.insert(blood_group::GROUP_KEY.to_string(), entry.value.clone());
                if let Some(rhesus) = &entry.comments {
                    raw.insert(blood_group::RHESUS_KEY.to_string(), rhesus.clone());
                }
            }
        }
        Some(kind) => {
            for entry in entries {
                if let Some(component) = kind.layout().iter().find(|c| c.name == entry.test_name) {
                    raw.insert(component.key.to_string(), entry.value.clone());
                }
                if kind.has_timed_range() {
                    insert_timing(&mut raw, entry);
                }
            }
            drop_computed(kind, &mut raw);
        }
        None => {
            let entries: Vec<&ResultEntry> = entries.collect();
            // a single stored row may be a single-component test
            if let [single] = entries.as_slice() {
                raw.insert(generic::VALUE_KEY.to_string(), single.value.clone());
            }
            for entry in entries {
                raw.insert(entry.test_name.clone(), entry.value.clone());
                if let Some(comments) = &entry.comments {
                    raw.insert(generic::COMMENTS_KEY.to_string(), comments.clone());
                }
                insert_timing(&mut raw, entry);
            }
        }
    }

    raw
}

fn drop_computed(kind: PanelKind, raw: &mut RawValues) {
    let derived = match PanelValues::from_raw(kind.code(), raw).form() {
        Some(form) => form.derived(),
        None => return,
    };
    for (key, value) in derived {
        if let Derived::Value(_) = value {
            raw.remove(&key);
        }
    }
}

fn insert_timing(raw: &mut RawValues, entry: &ResultEntry) {
    if let Some(meal) = &entry.meal_type {
        raw.insert(blood_sugar::MEAL_TYPE_KEY.to_string(), meal.clone());
    }
    if let Some(hour) = &entry.hour_type {
        raw.insert(blood_sugar::HOUR_TYPE_KEY.to_string(), hour.clone());
    }
}

/// Trimmed form value, empty when the field is absent.
pub(crate) fn field(raw: &RawValues, key: &str) -> String {
    raw.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `numerator / denominator * factor`, empty unless both inputs are usable.
pub(crate) fn ratio(numerator: &str, denominator: &str, factor: f64, decimals: usize) -> String {
    match (parse_number(numerator), parse_positive(denominator)) {
        (Some(n), Some(d)) => to_fixed(n / d * factor, decimals),
        _ => String::new(),
    }
}
