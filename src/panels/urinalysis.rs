use super::{field, FixedComponent, PanelForm, PanelKind, RawValues};

/// Urine full report. Mostly qualitative; only the microscopy counts and
/// specific gravity carry classifiable ranges.
pub const LAYOUT: &[FixedComponent] = &[
    FixedComponent::new("colour", "Colour", "", "Pale Yellow"),
    FixedComponent::new("appearance", "Appearance", "", "Clear"),
    FixedComponent::new("reaction", "Reaction (pH)", "", "Acidic"),
    FixedComponent::new("specificGravity", "Specific Gravity", "", "1.005 - 1.030"),
    FixedComponent::new("protein", "Protein (Albumin)", "", "Nil"),
    FixedComponent::new("sugar", "Sugar", "", "Nil"),
    FixedComponent::new("ketoneBodies", "Ketone Bodies", "", "Nil"),
    FixedComponent::new("bilePigments", "Bile Pigments", "", "Nil"),
    FixedComponent::new("urobilinogen", "Urobilinogen", "", "Normal"),
    FixedComponent::new("pusCells", "Pus Cells", "/HPF", "0 - 5"),
    FixedComponent::new("redCells", "Red Cells", "/HPF", "0 - 2"),
    FixedComponent::new("epithelialCells", "Epithelial Cells", "/HPF", "Few"),
    FixedComponent::new("casts", "Casts", "", "Nil"),
    FixedComponent::new("crystals", "Crystals", "", "Nil"),
    FixedComponent::new("organisms", "Organisms", "", "Nil"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrinalysisValues {
    pub colour: String,
    pub appearance: String,
    pub reaction: String,
    pub specific_gravity: String,
    pub protein: String,
    pub sugar: String,
    pub ketone_bodies: String,
    pub bile_pigments: String,
    pub urobilinogen: String,
    pub pus_cells: String,
    pub red_cells: String,
    pub epithelial_cells: String,
    pub casts: String,
    pub crystals: String,
    pub organisms: String,
}

impl UrinalysisValues {
    pub fn from_raw(raw: &RawValues) -> Self {
        Self {
            colour: field(raw, "colour"),
            appearance: field(raw, "appearance"),
            reaction: field(raw, "reaction"),
            specific_gravity: field(raw, "specificGravity"),
            protein: field(raw, "protein"),
            sugar: field(raw, "sugar"),
            ketone_bodies: field(raw, "ketoneBodies"),
            bile_pigments: field(raw, "bilePigments"),
            urobilinogen: field(raw, "urobilinogen"),
            pus_cells: field(raw, "pusCells"),
            red_cells: field(raw, "redCells"),
            epithelial_cells: field(raw, "epithelialCells"),
            casts: field(raw, "casts"),
            crystals: field(raw, "crystals"),
            organisms: field(raw, "organisms"),
        }
    }
}

impl PanelForm for UrinalysisValues {
    fn kind(&self) -> PanelKind {
        PanelKind::Ufr
    }

    fn raw_value(&self, key: &str) -> String {
        let value = match key {
            "colour" => &self.colour,
            "appearance" => &self.appearance,
            "reaction" => &self.reaction,
            "specificGravity" => &self.specific_gravity,
            "protein" => &self.protein,
            "sugar" => &self.sugar,
            "ketoneBodies" => &self.ketone_bodies,
            "bilePigments" => &self.bile_pigments,
            "urobilinogen" => &self.urobilinogen,
            "pusCells" => &self.pus_cells,
            "redCells" => &self.red_cells,
            "epithelialCells" => &self.epithelial_cells,
            "casts" => &self.casts,
            "crystals" => &self.crystals,
            "organisms" => &self.organisms,
            _ => return String::new(),
        };
        value.clone()
    }
}
