//! JSON prediction API.
//!
//! Domain failures come back as HTTP 200 with an `{"error": ...}` body so
//! clients only ever branch on the payload shape.

use crate::config::ModelConfig;
use crate::error::PredictError;
use crate::predict::{PredictionService, PriceArtifacts, PriceRequest, YieldArtifacts, YieldRequest};
use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiResponse {
    Price { predicted_price: f64 },
    Yield { predicted_yield: f64 },
    Error { error: String },
}

impl ApiResponse {
    fn error(msg: impl Into<String>) -> Self {
        Self::Error { error: msg.into() }
    }
}

#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[post("/predict")]
async fn predict_price(
    svc: web::Data<PredictionService>,
    body: web::Json<PriceRequest>,
) -> impl Responder {
    let resp = match svc.predict_price(&body) {
        Ok(predicted_price) => ApiResponse::Price { predicted_price },
        Err(PredictError::UnknownCategory { field, value }) => {
            debug!("/predict rejected {} `{}`", field, value);
            ApiResponse::error("Unknown city, region or crop")
        }
        Err(e) => {
            warn!("/predict failed: {}", e);
            ApiResponse::error(e.to_string())
        }
    };
    HttpResponse::Ok().json(resp)
}

#[post("/predict/yield")]
async fn predict_yield(
    svc: web::Data<PredictionService>,
    body: web::Json<YieldRequest>,
) -> impl Responder {
    let resp = match svc.predict_yield(&body) {
        Ok(predicted_yield) => ApiResponse::Yield { predicted_yield },
        Err(PredictError::ArtifactMissing(_)) => ApiResponse::error("Yield model not loaded"),
        Err(e @ PredictError::UnknownCategory { .. }) => {
            ApiResponse::error(format!("Unknown region or crop: {}", e))
        }
        Err(e) => {
            warn!("/predict/yield failed: {}", e);
            ApiResponse::error(e.to_string())
        }
    };
    HttpResponse::Ok().json(resp)
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz).service(predict_price).service(predict_yield);
}

/// Load artifacts from `dir`. The price model must exist; a missing or
/// unreadable yield model only disables `/predict/yield`.
pub fn load_service(dir: &Path) -> Result<PredictionService> {
    let price = PriceArtifacts::load(dir)
        .with_context(|| format!("price model artifacts missing in {:?}; run `train` first", dir))?;
    let yield_model = match YieldArtifacts::load_optional(dir) {
        Ok(Some(model)) => Some(model),
        Ok(None) => {
            warn!("No yield model in {:?}; /predict/yield will report it as not loaded", dir);
            None
        }
        Err(e) => {
            warn!("Yield model unusable, /predict/yield disabled: {}", e);
            None
        }
    };
    Ok(PredictionService::new(price, yield_model))
}

pub async fn serve(config: &ModelConfig) -> Result<()> {
    let svc = web::Data::new(load_service(&config.artifact_dir)?);
    info!(
        "Serving predictions on {} (yield model: {})",
        config.bind_addr,
        if svc.has_yield_model() { "loaded" } else { "absent" }
    );

    HttpServer::new(move || App::new().app_data(svc.clone()).configure(routes))
        .bind(config.bind_addr.as_str())
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?
        .run()
        .await
        .context("HTTP server stopped with an error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::artifacts::YIELD_MODEL_FILE;
    use crate::predict::encoder::LabelEncoder;
    use crate::predict::model::LinearModel;
    use crate::predict::service::fixtures::{price_request, service};
    use crate::utils::scratch_dir;
    use actix_web::test;
    use serde_json::{Value, json};

    async fn post_json(with_yield: bool, path: &str, body: Value) -> Value {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service(with_yield)))
                .configure(routes),
        )
        .await;
        let req = test::TestRequest::post().uri(path).set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        test::read_body_json(resp).await
    }

    #[actix_web::test]
    async fn predicts_price() {
        let body = post_json(false, "/predict", json!(price_request("Курск"))).await;
        assert_eq!(body, json!({ "predicted_price": 10300.0 }));
    }

    #[actix_web::test]
    async fn unknown_city_yields_error_payload() {
        let body = post_json(false, "/predict", json!(price_request("Атлантида"))).await;
        assert_eq!(body["error"], "Unknown city, region or crop");
        assert!(body.get("predicted_price").is_none());
    }

    #[actix_web::test]
    async fn yield_without_model() {
        let req = json!({ "region": "Курская область", "crop": "Пшеница" });
        let body = post_json(false, "/predict/yield", req).await;
        assert_eq!(body["error"], "Yield model not loaded");
    }

    #[actix_web::test]
    async fn yield_with_partial_weather() {
        let req = json!({
            "region": "Курская область",
            "crop": "Пшеница",
            "precip_oct_mar": 120.0,
            "frost_risk_spring": true
        });
        let body = post_json(true, "/predict/yield", req).await;
        assert_eq!(body, json!({ "predicted_yield": 42.0 }));

        let unknown = json!({ "region": "Марс", "crop": "Пшеница" });
        let body = post_json(true, "/predict/yield", unknown).await;
        let msg = body["error"].as_str().unwrap();
        assert!(msg.starts_with("Unknown region or crop:"), "{}", msg);
    }

    #[actix_web::test]
    async fn health_check() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service(false)))
                .configure(routes),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/healthz").to_request()).await;
        assert!(resp.status().is_success());
        assert_eq!(test::read_body(resp).await, "ok");
    }

    #[actix_web::test]
    async fn broken_yield_model_only_disables_yield() {
        let dir = scratch_dir("server_broken_yield");
        let price = PriceArtifacts {
            model: LinearModel {
                feature_names: vec![],
                intercept: 9000.0,
                coefficients: vec![0.0; 6],
            },
            city: LabelEncoder::fit("city", ["Курск"]),
            region: LabelEncoder::fit("region", ["Курская область"]),
            crop: LabelEncoder::fit("crop", ["Пшеница"]),
        };
        price.save(&dir).unwrap();
        std::fs::write(dir.join(YIELD_MODEL_FILE), "not json").unwrap();

        let svc = load_service(&dir).unwrap();
        assert!(!svc.has_yield_model());

        let app = test::init_service(App::new().app_data(web::Data::new(svc)).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!(price_request("Курск")))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body, json!({ "predicted_price": 9000.0 }));

        let req = test::TestRequest::post()
            .uri("/predict/yield")
            .set_json(json!({ "region": "Курская область", "crop": "Пшеница" }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error"], "Yield model not loaded");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[actix_web::test]
    async fn missing_price_model_is_fatal() {
        let dir = scratch_dir("server_no_price");
        assert!(load_service(&dir).is_err());
    }
}
