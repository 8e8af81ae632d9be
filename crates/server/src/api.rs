//! Request and response shapes of the prediction endpoint.
//!
//! The request body is a flat JSON object keyed by feature wire names
//! (`sqMeters`, `garden`, ...). Numbers are taken as is, booleans become
//! 0/1, `null` counts as absent, and keys that are not features (such as a
//! municipality name) are ignored.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use estate_core::types::{Feature, FeatureVector};
use estate_core::PredictionError;
use estate_ml::Prediction;

/// Build a feature vector from a request body.
///
/// Absent features are left unset; the pipeline reports them as
/// `MissingFeature`.
pub fn parse_features(body: &Map<String, Value>) -> Result<FeatureVector, PredictionError> {
    let mut vector = FeatureVector::new();
    for feature in Feature::ALL {
        match body.get(feature.name()) {
            None | Some(Value::Null) => {}
            Some(Value::Bool(flag)) => vector.set_flag(feature, *flag),
            Some(Value::Number(n)) => {
                let value = n
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .ok_or(PredictionError::InvalidFeatureValue { feature })?;
                vector.set(feature, value);
            }
            Some(_) => return Err(PredictionError::InvalidFeatureValue { feature }),
        }
    }
    Ok(vector)
}

/// Successful prediction.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predicted_price: f64,
    pub model_version: u64,
}

impl From<Prediction> for PredictionResponse {
    fn from(p: Prediction) -> Self {
        Self {
            predicted_price: p.predicted_price,
            model_version: p.model_version,
        }
    }
}

/// Error payload: `{ "error": { "kind", "message", "feature"? } }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl From<&PredictionError> for ErrorResponse {
    fn from(err: &PredictionError) -> Self {
        Self {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                message: err.to_string(),
                feature: err.feature().map(|f| f.name().to_string()),
            },
        }
    }
}

/// HTTP status for each error kind.
///
/// Bad input is a client error; a model that is not ready and unusable
/// population data are service-unavailable conditions, distinguishable by
/// `kind`; provider failures map to gateway errors.
pub fn status_for(err: &PredictionError) -> StatusCode {
    match err {
        PredictionError::MissingFeature { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::InvalidFeatureValue { .. } => StatusCode::BAD_REQUEST,
        PredictionError::InvalidStatistics { .. } | PredictionError::CoefficientsUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PredictionError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
        PredictionError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// A [`PredictionError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub PredictionError);

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(ErrorResponse::from(&self.0))).into_response()
    }
}
