//! Submit flow: form record → inference → report
//!
//! ```text
//! Idle → Submitted → RequestSent ─┬─ Succeeded → Logged
//!                                 └─ Failed    → ErrorDisplayed
//! ```
//!
//! A failed prediction never touches the tracking store. A tracking failure
//! after a successful prediction is kept beside the outcome so it cannot
//! replace the result the user sees.

use std::time::Instant;

use crate::inference::InferenceError;
use crate::models::{PredictionOutcome, PredictionRequest};
use crate::tracking::record_outcome;
use crate::AppState;

/// Whether the outcome reached the tracking store
#[derive(Debug)]
pub enum RecordStatus {
    Logged { run_id: String },
    NotLogged { reason: String },
}

/// Terminal state of one submission
#[derive(Debug)]
pub enum Submission {
    Succeeded {
        outcome: PredictionOutcome,
        record: RecordStatus,
    },
    Failed(InferenceError),
}

impl Submission {
    /// Text for the result area
    pub fn message(&self) -> String {
        match self {
            Self::Succeeded { outcome, .. } => format!("Prediction: {}", outcome.label),
            Self::Failed(err) => format!("Error: {}", err),
        }
    }
}

/// Run one validated request through the model and the tracking store
pub async fn submit(state: &AppState, request: PredictionRequest) -> Submission {
    let started = Instant::now();

    let label = match state.inference.predict(&request).await {
        Ok(label) => label,
        Err(err) => {
            tracing::warn!("Prediction failed after {:?}: {}", started.elapsed(), err);
            return Submission::Failed(err);
        }
    };

    tracing::info!("Prediction: {} in {:?}", label, started.elapsed());

    let outcome = PredictionOutcome::new(request, label);
    let settings = state.config.run_settings();

    let record = match record_outcome(state.tracking.as_ref(), &settings, &outcome).await {
        Ok(run_id) => RecordStatus::Logged { run_id },
        Err(err) => {
            tracing::warn!("Could not record prediction in {}: {}", state.tracking.location(), err);
            RecordStatus::NotLogged { reason: err.to_string() }
        }
    };

    Submission::Succeeded { outcome, record }
}
