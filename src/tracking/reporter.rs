//! Prediction run recording

use super::{RunStatus, TrackingResult, TrackingStore};
use crate::models::PredictionOutcome;

/// Naming applied to every prediction run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub run_name: String,
    pub source: String,
}

/// Record one outcome as a run: 3 tags, 8 params, 1 metric.
///
/// The run is always closed once opened, FAILED if any write was rejected.
/// Returns the run id.
pub async fn record_outcome(
    store: &dyn TrackingStore,
    settings: &RunSettings,
    outcome: &PredictionOutcome,
) -> TrackingResult<String> {
    let run_id = store.start_run(&settings.run_name).await?;

    let written = write_run(store, &run_id, settings, outcome).await;
    let status = if written.is_ok() { RunStatus::Finished } else { RunStatus::Failed };
    let closed = store.end_run(&run_id, status).await;

    written?;
    closed?;

    tracing::info!("Recorded prediction run {} ({})", run_id, outcome.label.tag_value());
    Ok(run_id)
}

async fn write_run(
    store: &dyn TrackingStore,
    run_id: &str,
    settings: &RunSettings,
    outcome: &PredictionOutcome,
) -> TrackingResult<()> {
    store.set_tag(run_id, "source", &settings.source).await?;
    store.set_tag(run_id, "timestamp", &outcome.timestamp_tag()).await?;
    store.set_tag(run_id, "label", outcome.label.tag_value()).await?;

    for (column, value) in outcome.request.named_features() {
        store.log_param(run_id, column, &value.to_string()).await?;
    }

    store.log_metric(run_id, "prediction", f64::from(outcome.prediction)).await
}
