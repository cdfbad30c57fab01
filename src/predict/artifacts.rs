//! JSON model artifacts on disk.

use crate::error::PredictError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

use super::encoder::LabelEncoder;
use super::model::LinearModel;

pub const PRICE_MODEL_FILE: &str = "price_model.json";
pub const CITY_ENCODER_FILE: &str = "city_encoder.json";
pub const REGION_ENCODER_FILE: &str = "region_encoder.json";
pub const CROP_ENCODER_FILE: &str = "crop_encoder.json";

pub const YIELD_MODEL_FILE: &str = "yield_model.json";
pub const YIELD_REGION_ENCODER_FILE: &str = "yield_region_encoder.json";
pub const YIELD_CROP_ENCODER_FILE: &str = "yield_crop_encoder.json";

/// Price model plus the encoders its categorical features were coded with.
#[derive(Debug, Clone)]
pub struct PriceArtifacts {
    pub model: LinearModel,
    pub city: LabelEncoder,
    pub region: LabelEncoder,
    pub crop: LabelEncoder,
}

#[derive(Debug, Clone)]
pub struct YieldArtifacts {
    pub model: LinearModel,
    pub region: LabelEncoder,
    pub crop: LabelEncoder,
}

impl PriceArtifacts {
    pub fn load(dir: &Path) -> Result<Self, PredictError> {
        Ok(Self {
            model: read_json(&dir.join(PRICE_MODEL_FILE))?,
            city: read_json(&dir.join(CITY_ENCODER_FILE))?,
            region: read_json(&dir.join(REGION_ENCODER_FILE))?,
            crop: read_json(&dir.join(CROP_ENCODER_FILE))?,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<(), PredictError> {
        create_dir(dir)?;
        write_json(&dir.join(PRICE_MODEL_FILE), &self.model)?;
        write_json(&dir.join(CITY_ENCODER_FILE), &self.city)?;
        write_json(&dir.join(REGION_ENCODER_FILE), &self.region)?;
        write_json(&dir.join(CROP_ENCODER_FILE), &self.crop)?;
        info!("Price model artifacts written to {:?}", dir);
        Ok(())
    }
}

impl YieldArtifacts {
    /// `Ok(None)` when no yield model has been trained. A model file that
    /// exists but cannot be read, or lacks its encoders, is an `Err`.
    pub fn load_optional(dir: &Path) -> Result<Option<Self>, PredictError> {
        let model_path = dir.join(YIELD_MODEL_FILE);
        if !model_path.exists() {
            return Ok(None);
        }
        Ok(Some(Self {
            model: read_json(&model_path)?,
            region: read_json(&dir.join(YIELD_REGION_ENCODER_FILE))?,
            crop: read_json(&dir.join(YIELD_CROP_ENCODER_FILE))?,
        }))
    }

    #[cfg(test)]
    pub fn save(&self, dir: &Path) -> Result<(), PredictError> {
        create_dir(dir)?;
        write_json(&dir.join(YIELD_MODEL_FILE), &self.model)?;
        write_json(&dir.join(YIELD_REGION_ENCODER_FILE), &self.region)?;
        write_json(&dir.join(YIELD_CROP_ENCODER_FILE), &self.crop)?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PredictError> {
    let text = std::fs::read_to_string(path).map_err(|e| artifact_err(path, e))?;
    serde_json::from_str(&text).map_err(|e| artifact_err(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PredictError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| artifact_err(path, e))?;
    std::fs::write(path, text).map_err(|e| artifact_err(path, e))
}

fn create_dir(dir: &Path) -> Result<(), PredictError> {
    std::fs::create_dir_all(dir).map_err(|e| artifact_err(dir, e))
}

fn artifact_err(path: &Path, reason: impl ToString) -> PredictError {
    PredictError::Artifact {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
