use crate::error::PredictError;
use crate::models::Dataset;
use chrono::Datelike;
use tracing::info;

use super::artifacts::PriceArtifacts;
use super::encoder::LabelEncoder;
use super::model::{OlsRegressor, Predictor};
use super::regions::region_for;

/// Feature order shared by training and the `/predict` endpoint.
pub const PRICE_FEATURES: [&str; 6] = ["city_code", "region_code", "crop_code", "month", "day_of_year", "year"];

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub rmse: f64,
}

/// Fit the price model on every observation that has a price.
pub fn train_price_model(dataset: &Dataset) -> Result<(PriceArtifacts, TrainReport), PredictError> {
    let priced: Vec<_> = dataset.rows().iter().filter(|r| r.price.is_some()).collect();
    let rows_dropped = dataset.len() - priced.len();

    let regions: Vec<&str> = priced.iter().map(|r| region_for(&r.city)).collect();

    let city = LabelEncoder::fit("city", priced.iter().map(|r| r.city.as_str()));
    let region = LabelEncoder::fit("region", regions.iter().copied());
    let crop = LabelEncoder::fit("crop", priced.iter().map(|r| r.crop_name.as_str()));

    let mut features = Vec::with_capacity(priced.len());
    let mut target = Vec::with_capacity(priced.len());
    for (row, reg) in priced.iter().zip(&regions) {
        features.push(vec![
            city.transform(&row.city)? as f64,
            region.transform(reg)? as f64,
            crop.transform(&row.crop_name)? as f64,
            row.date.month() as f64,
            row.date.ordinal() as f64,
            row.date.year() as f64,
        ]);
        target.extend(row.price);
    }

    let ols = OlsRegressor::new(&PRICE_FEATURES);
    let model = ols.train(&features, &target)?;

    let mut sq = 0.0;
    for (x, y) in features.iter().zip(&target) {
        let e = ols.predict(&model, x)? - y;
        sq += e * e;
    }
    let rmse = (sq / target.len() as f64).sqrt();

    info!(
        "Trained on {} rows ({} without price dropped), {} cities, {} regions, {} crops, RMSE {:.2}",
        target.len(),
        rows_dropped,
        city.len(),
        region.len(),
        crop.len(),
        rmse
    );

    let report = TrainReport {
        rows_used: target.len(),
        rows_dropped,
        rmse,
    };
    Ok((PriceArtifacts { model, city, region, crop }, report))
}
