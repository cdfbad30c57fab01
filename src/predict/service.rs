use crate::error::PredictError;
use serde::{Deserialize, Serialize};

use super::artifacts::{PriceArtifacts, YieldArtifacts};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceRequest {
    pub city: String,
    pub region: String,
    pub crop: String,
    pub month: u32,
    pub day_of_year: u32,
    pub year: i32,
}

/// Seasonal agro-meteorological aggregates; any of them may be absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct YieldRequest {
    pub region: String,
    pub crop: String,
    pub precip_oct_mar: Option<f64>,
    pub min_temp_winter: Option<f64>,
    pub precip_apr_may: Option<f64>,
    pub temp_sum_apr_may: Option<f64>,
    pub frost_risk_spring: Option<bool>,
    pub precip_jun_jul: Option<f64>,
    pub temp_sum_jun_jul: Option<f64>,
    pub heat_stress_jun_jul: Option<i32>,
    pub gtk_jun_jul: Option<f64>,
    pub precip_aug_sep: Option<f64>,
    pub temp_sum_aug_sep: Option<f64>,
    pub heat_stress_aug_sep: Option<i32>,
    pub gtk_apr_sep: Option<f64>,
    pub temp_sum_apr_sep: Option<f64>,
    pub total_heat_stress_days: Option<i32>,
    pub min_temp_vegetation: Option<f64>,
}

impl YieldRequest {
    /// Model input after the two category codes. Missing values become 0.
    fn weather_features(&self) -> [f64; 16] {
        let f = |v: Option<f64>| v.unwrap_or(0.0);
        let i = |v: Option<i32>| v.map(f64::from).unwrap_or(0.0);
        [
            f(self.precip_oct_mar),
            f(self.min_temp_winter),
            f(self.precip_apr_may),
            f(self.temp_sum_apr_may),
            if self.frost_risk_spring.unwrap_or(false) { 1.0 } else { 0.0 },
            f(self.precip_jun_jul),
            f(self.temp_sum_jun_jul),
            i(self.heat_stress_jun_jul),
            f(self.gtk_jun_jul),
            f(self.precip_aug_sep),
            f(self.temp_sum_aug_sep),
            i(self.heat_stress_aug_sep),
            f(self.gtk_apr_sep),
            f(self.temp_sum_apr_sep),
            i(self.total_heat_stress_days),
            f(self.min_temp_vegetation),
        ]
    }
}

/// Loaded models. The price model is mandatory; the yield model is not.
#[derive(Debug, Clone)]
pub struct PredictionService {
    price: PriceArtifacts,
    yield_model: Option<YieldArtifacts>,
}

impl PredictionService {
    pub fn new(price: PriceArtifacts, yield_model: Option<YieldArtifacts>) -> Self {
        Self { price, yield_model }
    }

    pub fn has_yield_model(&self) -> bool {
        self.yield_model.is_some()
    }

    pub fn predict_price(&self, req: &PriceRequest) -> Result<f64, PredictError> {
        let a = &self.price;
        let features = [
            a.city.transform(&req.city)? as f64,
            a.region.transform(&req.region)? as f64,
            a.crop.transform(&req.crop)? as f64,
            req.month as f64,
            req.day_of_year as f64,
            req.year as f64,
        ];
        Ok(round2(a.model.evaluate(&features)?))
    }

    pub fn predict_yield(&self, req: &YieldRequest) -> Result<f64, PredictError> {
        let a = self
            .yield_model
            .as_ref()
            .ok_or_else(|| PredictError::ArtifactMissing("yield model".into()))?;

        let mut features = vec![
            a.region.transform(&req.region)? as f64,
            a.crop.transform(&req.crop)? as f64,
        ];
        features.extend(req.weather_features());
        Ok(round2(a.model.evaluate(&features)?))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
