//! ABO group and Rhesus factor.
//!
//! Stored reports keep the Rhesus label in the `comments` field of the single
//! "Blood Group" entry. Existing data depends on that shape; no other panel
//! stores results in `comments`.

use std::fmt;
use std::str::FromStr;

use log::warn;

use super::{field, FixedComponent, PanelForm, PanelKind, RawValues, ResultEntry};

pub const GROUP_KEY: &str = "bloodGroup";
pub const RHESUS_KEY: &str = "rhesus";

pub const LAYOUT: &[FixedComponent] = &[FixedComponent::new(GROUP_KEY, "Blood Group", "", "")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AboGroup {
    A,
    B,
    AB,
    O,
}

impl FromStr for AboGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AboGroup::A),
            "B" => Ok(AboGroup::B),
            "AB" => Ok(AboGroup::AB),
            "O" => Ok(AboGroup::O),
            other => Err(format!("Unknown ABO group: {}", other)),
        }
    }
}

impl fmt::Display for AboGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AboGroup::A => "A",
            AboGroup::B => "B",
            AboGroup::AB => "AB",
            AboGroup::O => "O",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rhesus {
    Positive,
    Negative,
}

impl FromStr for Rhesus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" | "POS" | "+" => Ok(Rhesus::Positive),
            "NEGATIVE" | "NEG" | "-" => Ok(Rhesus::Negative),
            other => Err(format!("Unknown Rhesus factor: {}", other)),
        }
    }
}

impl fmt::Display for Rhesus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rhesus::Positive => f.write_str("POSITIVE"),
            Rhesus::Negative => f.write_str("NEGATIVE"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BloodGroupValues {
    pub blood_group: String,
    pub rhesus: String,
}

impl BloodGroupValues {
    pub fn from_raw(raw: &RawValues) -> Self {
        Self {
            blood_group: normalize::<AboGroup>(&field(raw, GROUP_KEY)),
            rhesus: normalize::<Rhesus>(&field(raw, RHESUS_KEY)),
        }
    }
}

/// Canonical label when recognised, otherwise the text as entered.
fn normalize<T>(value: &str) -> String
where
    T: FromStr<Err = String> + fmt::Display,
{
    if value.is_empty() {
        return String::new();
    }
    match value.parse::<T>() {
        Ok(parsed) => parsed.to_string(),
        Err(e) => {
            warn!("{}; keeping value as entered", e);
            value.to_string()
        }
    }
}

impl PanelForm for BloodGroupValues {
    fn kind(&self) -> PanelKind {
        PanelKind::Bgrh
    }

    fn raw_value(&self, key: &str) -> String {
        match key {
            GROUP_KEY => self.blood_group.clone(),
            RHESUS_KEY => self.rhesus.clone(),
            _ => String::new(),
        }
    }

    fn entries(&self) -> Vec<ResultEntry> {
        LAYOUT
            .iter()
            .map(|component| {
                ResultEntry::new(
                    PanelKind::Bgrh.code(),
                    component.name,
                    self.blood_group.clone(),
                    component.unit,
                    component.range,
                )
                .with_comments(&self.rhesus)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Verdict;

    fn raw(group: &str, rhesus: &str) -> RawValues {
        let mut raw = RawValues::new();
        raw.insert(GROUP_KEY.to_string(), group.to_string());
        raw.insert(RHESUS_KEY.to_string(), rhesus.to_string());
        raw
    }

    #[test]
    fn test_rhesus_stored_in_comments() {
        let entries = BloodGroupValues::from_raw(&raw("ab", "positive")).entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].test_name, "Blood Group");
        assert_eq!(entries[0].value, "AB");
        assert_eq!(entries[0].comments.as_deref(), Some("POSITIVE"));
        assert_eq!(entries[0].verdict(), Verdict::Indeterminate);
    }

    #[test]
    fn test_unknown_labels_kept_as_entered() {
        let values = BloodGroupValues::from_raw(&raw("Bombay", ""));
        assert_eq!(values.blood_group, "Bombay");
        assert_eq!(values.entries()[0].comments, None);
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("O".parse::<AboGroup>(), Ok(AboGroup::O));
        assert!("C".parse::<AboGroup>().is_err());
        assert_eq!("neg".parse::<Rhesus>(), Ok(Rhesus::Negative));
        assert_eq!(Rhesus::Positive.to_string(), "POSITIVE");
    }
}
