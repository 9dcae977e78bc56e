use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LimsError, LimsResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Test catalog file, JSON or flat CSV.
    pub catalog: Option<PathBuf>,
    pub range_source: RangeSource,
    pub store: StoreConfig,
    pub currency: String,
    pub default_discount_percent: f64,
}

/// Where the specially handled panels take their units and ranges from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSource {
    /// Built-in tables, as stored reports have always used.
    #[default]
    Fixed,
    /// Catalog components with a matching name override the built-in row.
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Json(PathBuf),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            range_source: RangeSource::Fixed,
            store: StoreConfig::Memory,
            currency: "LKR".to_string(),
            default_discount_percent: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> LimsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LimsResult<()> {
        if self.currency.trim().is_empty() {
            return Err(LimsError::InvalidConfig(
                "Currency label must not be empty".to_string(),
            ));
        }

        validate_discount(self.default_discount_percent)
            .map_err(|e| LimsError::InvalidConfig(e.to_string()))?;

        if let StoreConfig::Json(path) = &self.store {
            if path.as_os_str().is_empty() {
                return Err(LimsError::InvalidConfig(
                    "JSON store path must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

pub(crate) fn validate_discount(percent: f64) -> LimsResult<()> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(LimsError::InvalidDraft(format!(
            "Discount must be between 0 and 100 percent, got {}",
            percent
        )));
    }
    Ok(())
}
