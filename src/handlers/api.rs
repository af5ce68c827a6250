//! JSON prediction API

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use crate::models::{DiabetesLabel, PredictionRequest};
use crate::submission::{self, RecordStatus, Submission};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: u8,
    pub label: DiabetesLabel,
    pub message: String,
    pub timestamp: String,
    /// Tracking run the outcome was recorded under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_error: Option<String>,
}

/// Same flow as the form, for programmatic clients
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(request) = payload.map_err(|r| AppError::ValidationError(r.body_text()))?;
    request.check().map_err(AppError::ValidationError)?;

    let result = submission::submit(&state, request).await;
    let message = result.message();

    match result {
        Submission::Failed(err) => Err(err.into()),
        Submission::Succeeded { outcome, record } => {
            let (run_id, tracking_error) = match record {
                RecordStatus::Logged { run_id } => (Some(run_id), None),
                RecordStatus::NotLogged { reason } => (None, Some(reason)),
            };

            Ok(Json(PredictResponse {
                prediction: outcome.prediction,
                label: outcome.label,
                message,
                timestamp: outcome.timestamp_tag(),
                run_id,
                tracking_error,
            }))
        }
    }
}
