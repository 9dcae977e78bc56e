use super::{field, ratio, Derived, DerivedFields, FixedComponent, PanelForm, PanelKind, RawValues};
use crate::numeric::{parse_number, parse_positive, to_fixed};

/// Friedewald LDL is not valid from this triglyceride level upwards.
pub const FRIEDEWALD_TG_LIMIT: f64 = 400.0;

pub const LAYOUT: &[FixedComponent] = &[
    FixedComponent::new("totalCholesterol", "Total Cholesterol", "mg/dL", "< 200"),
    FixedComponent::new("triglycerides", "Triglycerides", "mg/dL", "< 150"),
    FixedComponent::new("hdl", "HDL Cholesterol", "mg/dL", "> 40"),
    FixedComponent::new("ldl", "LDL Cholesterol", "mg/dL", "< 130"),
    FixedComponent::new("vldl", "VLDL Cholesterol", "mg/dL", "< 30"),
    FixedComponent::new("tcHdlRatio", "Total Cholesterol / HDL Ratio", "", "< 5.0"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LipidValues {
    pub total_cholesterol: String,
    pub triglycerides: String,
    pub hdl: String,
    /// Operator-entered LDL, used only when the Friedewald formula is suspended.
    pub ldl: String,
}

impl LipidValues {
    pub fn from_raw(raw: &RawValues) -> Self {
        Self {
            total_cholesterol: field(raw, "totalCholesterol"),
            triglycerides: field(raw, "triglycerides"),
            hdl: field(raw, "hdl"),
            ldl: field(raw, "ldl"),
        }
    }

    /// True when LDL has to be entered by the operator.
    pub fn requires_manual_ldl(&self) -> bool {
        parse_number(&self.triglycerides).is_some_and(|tg| tg >= FRIEDEWALD_TG_LIMIT)
    }

    fn vldl_value(&self) -> Option<f64> {
        parse_number(&self.triglycerides).map(|tg| tg / 5.0)
    }

    /// `Triglycerides / 5`
    pub fn vldl(&self) -> String {
        self.vldl_value()
            .map(|v| to_fixed(v, 1))
            .unwrap_or_default()
    }

    /// Friedewald estimate `TC - HDL - VLDL`.
    pub fn ldl(&self) -> Derived {
        if self.requires_manual_ldl() {
            return Derived::ManualEntry;
        }

        let tc = parse_positive(&self.total_cholesterol);
        let hdl = parse_positive(&self.hdl);
        let vldl = self.vldl_value().filter(|v| *v > 0.0);
        match (tc, hdl, vldl) {
            (Some(tc), Some(hdl), Some(vldl)) => Derived::Value(to_fixed(tc - hdl - vldl, 1)),
            _ => Derived::Value(String::new()),
        }
    }

    /// `TC / HDL`, two decimals.
    pub fn tc_hdl_ratio(&self) -> String {
        if parse_positive(&self.total_cholesterol).is_none() {
            return String::new();
        }
        ratio(&self.total_cholesterol, &self.hdl, 1.0, 2)
    }
}

impl PanelForm for LipidValues {
    fn kind(&self) -> PanelKind {
        PanelKind::Lipid
    }

    fn derived(&self) -> DerivedFields {
        let mut derived = DerivedFields::new();
        derived.insert("vldl".to_string(), Derived::Value(self.vldl()));
        derived.insert("ldl".to_string(), self.ldl());
        derived.insert("tcHdlRatio".to_string(), Derived::Value(self.tc_hdl_ratio()));
        derived
    }

    fn raw_value(&self, key: &str) -> String {
        match key {
            "totalCholesterol" => self.total_cholesterol.clone(),
            "triglycerides" => self.triglycerides.clone(),
            "hdl" => self.hdl.clone(),
            // only reachable when LDL is in manual mode
            "ldl" => self.ldl.clone(),
            _ => String::new(),
        }
    }
}
