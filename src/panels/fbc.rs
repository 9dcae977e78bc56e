use super::{field, ratio, Derived, DerivedFields, FixedComponent, PanelForm, PanelKind, RawValues};
use crate::numeric::{parse_number, to_fixed};

/// Full blood count, in report order.
pub const LAYOUT: &[FixedComponent] = &[
    FixedComponent::new("wbc", "Total White Cell Count (WBC)", "x10³/µL", "4.0 - 11.0"),
    FixedComponent::new("neutrophils", "Neutrophils", "%", "40 - 75"),
    FixedComponent::new("lymphocytes", "Lymphocytes", "%", "20 - 45"),
    FixedComponent::new("monocytes", "Monocytes", "%", "2 - 10"),
    FixedComponent::new("eosinophils", "Eosinophils", "%", "1 - 6"),
    FixedComponent::new("basophils", "Basophils", "%", "0 - 1"),
    FixedComponent::new("neutrophilsAbs", "Neutrophils (Absolute)", "x10³/µL", "2.0 - 7.5"),
    FixedComponent::new("lymphocytesAbs", "Lymphocytes (Absolute)", "x10³/µL", "1.0 - 4.0"),
    FixedComponent::new("monocytesAbs", "Monocytes (Absolute)", "x10³/µL", "0.2 - 1.0"),
    FixedComponent::new("eosinophilsAbs", "Eosinophils (Absolute)", "x10³/µL", "0.02 - 0.5"),
    FixedComponent::new("basophilsAbs", "Basophils (Absolute)", "x10³/µL", "0.0 - 0.1"),
    FixedComponent::new("hemoglobin", "Hemoglobin", "g/dL", "11.5 - 16.5"),
    FixedComponent::new("rbc", "Red Blood Cells (RBC)", "x10⁶/µL", "4.0 - 5.5"),
    FixedComponent::new("pcv", "Packed Cell Volume (PCV)", "%", "36 - 46"),
    FixedComponent::new("mcv", "MCV", "fL", "80 - 100"),
    FixedComponent::new("mch", "MCH", "pg", "27 - 32"),
    FixedComponent::new("mchc", "MCHC", "g/dL", "32 - 36"),
    FixedComponent::new("rdw", "RDW", "%", "11.5 - 14.5"),
    FixedComponent::new("platelets", "Platelet Count", "x10³/µL", "150 - 450"),
];

/// Differential percentage field and the absolute count derived from it.
const DIFFERENTIALS: [(&str, &str); 5] = [
    ("neutrophils", "neutrophilsAbs"),
    ("lymphocytes", "lymphocytesAbs"),
    ("monocytes", "monocytesAbs"),
    ("eosinophils", "eosinophilsAbs"),
    ("basophils", "basophilsAbs"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FbcValues {
    pub wbc: String,
    pub neutrophils: String,
    pub lymphocytes: String,
    pub monocytes: String,
    pub eosinophils: String,
    pub basophils: String,
    pub hemoglobin: String,
    pub rbc: String,
    pub pcv: String,
    pub rdw: String,
    pub platelets: String,
}

impl FbcValues {
    pub fn from_raw(raw: &RawValues) -> Self {
        Self {
            wbc: field(raw, "wbc"),
            neutrophils: field(raw, "neutrophils"),
            lymphocytes: field(raw, "lymphocytes"),
            monocytes: field(raw, "monocytes"),
            eosinophils: field(raw, "eosinophils"),
            basophils: field(raw, "basophils"),
            hemoglobin: field(raw, "hemoglobin"),
            rbc: field(raw, "rbc"),
            pcv: field(raw, "pcv"),
            rdw: field(raw, "rdw"),
            platelets: field(raw, "platelets"),
        }
    }

    /// `(PCV / RBC) x 10`
    pub fn mcv(&self) -> String {
        ratio(&self.pcv, &self.rbc, 10.0, 1)
    }

    /// `(Hemoglobin / RBC) x 10`
    pub fn mch(&self) -> String {
        ratio(&self.hemoglobin, &self.rbc, 10.0, 1)
    }

    /// `(Hemoglobin / PCV) x 100`
    pub fn mchc(&self) -> String {
        ratio(&self.hemoglobin, &self.pcv, 100.0, 1)
    }

    /// `percentage / 100 x WBC`, two decimals.
    pub fn absolute_count(&self, percentage: &str) -> String {
        match (parse_number(percentage), parse_number(&self.wbc)) {
            (Some(pct), Some(wbc)) => to_fixed(pct / 100.0 * wbc, 2),
            _ => String::new(),
        }
    }
}

impl PanelForm for FbcValues {
    fn kind(&self) -> PanelKind {
        PanelKind::Fbc
    }

    fn derived(&self) -> DerivedFields {
        let mut derived = DerivedFields::new();
        derived.insert("mcv".to_string(), Derived::Value(self.mcv()));
        derived.insert("mch".to_string(), Derived::Value(self.mch()));
        derived.insert("mchc".to_string(), Derived::Value(self.mchc()));

        for (percentage_key, absolute_key) in DIFFERENTIALS {
            let count = self.absolute_count(&self.raw_value(percentage_key));
            derived.insert(absolute_key.to_string(), Derived::Value(count));
        }

        derived
    }

    fn raw_value(&self, key: &str) -> String {
        match key {
            "wbc" => self.wbc.clone(),
            "neutrophils" => self.neutrophils.clone(),
            "lymphocytes" => self.lymphocytes.clone(),
            "monocytes" => self.monocytes.clone(),
            "eosinophils" => self.eosinophils.clone(),
            "basophils" => self.basophils.clone(),
            "hemoglobin" => self.hemoglobin.clone(),
            "rbc" => self.rbc.clone(),
            "pcv" => self.pcv.clone(),
            "rdw" => self.rdw.clone(),
            "platelets" => self.platelets.clone(),
            _ => String::new(),
        }
    }
}
