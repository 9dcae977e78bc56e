use super::{field, FixedComponent, PanelForm, PanelKind, RawValues};

/// Oral glucose tolerance test; three independent readings.
pub const LAYOUT: &[FixedComponent] = &[
    FixedComponent::new("fasting", "Fasting Blood Sugar", "mg/dL", "60 - 115"),
    FixedComponent::new("firstHour", "Blood Sugar After 1 Hour", "mg/dL", "< 180"),
    FixedComponent::new("secondHour", "Blood Sugar After 2 Hours", "mg/dL", "< 140"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OgttValues {
    pub fasting: String,
    pub first_hour: String,
    pub second_hour: String,
}

impl OgttValues {
    pub fn from_raw(raw: &RawValues) -> Self {
        Self {
            fasting: field(raw, "fasting"),
            first_hour: field(raw, "firstHour"),
            second_hour: field(raw, "secondHour"),
        }
    }
}

impl PanelForm for OgttValues {
    fn kind(&self) -> PanelKind {
        PanelKind::Ogtt
    }

    fn raw_value(&self, key: &str) -> String {
        match key {
            "fasting" => self.fasting.clone(),
            "firstHour" => self.first_hour.clone(),
            "secondHour" => self.second_hour.clone(),
            _ => String::new(),
        }
    }
}
