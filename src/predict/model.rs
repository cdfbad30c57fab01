//! Least-squares regression behind the [`Predictor`] seam.

use crate::error::PredictError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Fit/predict boundary for the point models. Callers never look inside
/// `Model`; they only store it and hand it back.
pub trait Predictor {
    type Model;

    fn train(&self, features: &[Vec<f64>], target: &[f64]) -> Result<Self::Model, PredictError>;

    fn predict(&self, model: &Self::Model, features: &[f64]) -> Result<f64, PredictError>;
}

/// Fitted `y = intercept + Σ coefficients[i] * x[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn evaluate(&self, features: &[f64]) -> Result<f64, PredictError> {
        if features.len() != self.coefficients.len() {
            return Err(PredictError::Model(format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }
        let y = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(b, x)| b * x)
                .sum::<f64>();
        Ok(y)
    }
}

/// Ordinary least squares with an intercept column, solved by SVD so
/// rank-deficient designs (e.g. a constant feature) still get a
/// minimum-norm solution.
#[derive(Debug, Clone)]
pub struct OlsRegressor {
    pub feature_names: Vec<String>,
}

impl OlsRegressor {
    pub fn new(feature_names: &[&str]) -> Self {
        Self {
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Predictor for OlsRegressor {
    type Model = LinearModel;

    fn train(&self, features: &[Vec<f64>], target: &[f64]) -> Result<LinearModel, PredictError> {
        let n = features.len();
        let k = self.feature_names.len();
        if n == 0 || n != target.len() {
            return Err(PredictError::Model(format!(
                "need matching non-empty inputs, got {} rows and {} targets",
                n,
                target.len()
            )));
        }
        if let Some(bad) = features.iter().position(|r| r.len() != k) {
            return Err(PredictError::Model(format!("row {} has wrong width", bad)));
        }

        let x = DMatrix::from_fn(n, k + 1, |i, j| if j == 0 { 1.0 } else { features[i][j - 1] });
        let y = DVector::from_row_slice(target);

        let beta = solve_least_squares(&x, &y)
            .ok_or_else(|| PredictError::Model("least squares did not converge".into()))?;

        Ok(LinearModel {
            feature_names: self.feature_names.clone(),
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }

    fn predict(&self, model: &LinearModel, features: &[f64]) -> Result<f64, PredictError> {
        model.evaluate(features)
    }
}

fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_linear_relation() {
        // y = 2 + 3a - b
        let xs = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 3.0],
            vec![4.0, 1.0],
        ];
        let ys: Vec<f64> = xs.iter().map(|r| 2.0 + 3.0 * r[0] - r[1]).collect();

        let ols = OlsRegressor::new(&["a", "b"]);
        let model = ols.train(&xs, &ys).unwrap();
        assert!((model.intercept - 2.0).abs() < 1e-8);
        assert!((model.coefficients[0] - 3.0).abs() < 1e-8);
        assert!((model.coefficients[1] + 1.0).abs() < 1e-8);
        assert!((ols.predict(&model, &[10.0, 5.0]).unwrap() - 27.0).abs() < 1e-6);
    }

    #[test]
    fn constant_feature_does_not_break_fit() {
        let xs = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![1.0, 2.0]];
        let ys = vec![5.0, 7.0, 9.0];
        let ols = OlsRegressor::new(&["const", "x"]);
        let model = ols.train(&xs, &ys).unwrap();
        assert!((ols.predict(&model, &[1.0, 3.0]).unwrap() - 11.0).abs() < 1e-6);
    }

    #[test]
    fn width_mismatch_is_a_model_error() {
        let ols = OlsRegressor::new(&["a"]);
        assert!(ols.train(&[vec![1.0, 2.0]], &[1.0]).is_err());
        assert!(ols.train(&[], &[]).is_err());

        let model = ols.train(&[vec![1.0], vec![2.0]], &[1.0, 2.0]).unwrap();
        assert!(matches!(ols.predict(&model, &[]), Err(PredictError::Model(_))));
    }
}
