//! MLflow tracking server client (REST API 2.0)

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{validate_key, RunStatus, TrackingError, TrackingResult, TrackingStore};

const API_PREFIX: &str = "api/2.0/mlflow";

// Response types

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

/// Client for a remote MLflow tracking server
pub struct MlflowRestStore {
    base_url: String,
    experiment_name: String,
    experiment_id: OnceCell<String>,
    http_client: reqwest::Client,
}

impl MlflowRestStore {
    pub fn new(base_url: &str, experiment_name: &str, timeout: Duration) -> TrackingResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackingError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            experiment_name: experiment_name.to_string(),
            experiment_id: OnceCell::new(),
            http_client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, endpoint)
    }

    async fn experiment_id(&self) -> TrackingResult<&str> {
        self.experiment_id
            .get_or_try_init(|| self.resolve_experiment())
            .await
            .map(String::as_str)
    }

    /// Look the experiment up by name, creating it on RESOURCE_DOES_NOT_EXIST
    async fn resolve_experiment(&self) -> TrackingResult<String> {
        let response = self.http_client
            .get(self.url("experiments/get-by-name"))
            .query(&[("experiment_name", self.experiment_name.as_str())])
            .send()
            .await
            .map_err(|e| TrackingError::Network(e.to_string()))?;

        if response.status().is_success() {
            let found: GetExperimentResponse = response.json().await
                .map_err(|e| TrackingError::Parse(e.to_string()))?;
            return Ok(found.experiment.experiment_id);
        }

        let err = server_error(response).await;
        let missing = matches!(
            err,
            TrackingError::Server { status, .. } if status == StatusCode::NOT_FOUND.as_u16()
        );
        if !missing {
            return Err(err);
        }

        let created: CreateExperimentResponse = self
            .post("experiments/create", json!({ "name": self.experiment_name }))
            .await?;

        tracing::info!(
            "Created experiment '{}' (id {}) on {}",
            self.experiment_name, created.experiment_id, self.base_url
        );
        Ok(created.experiment_id)
    }

    async fn post<B, R>(&self, endpoint: &str, body: B) -> TrackingResult<R>
    where
        B: Serialize + Send,
        R: DeserializeOwned,
    {
        let response = self.http_client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| TrackingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(server_error(response).await);
        }

        response.json().await
            .map_err(|e| TrackingError::Parse(e.to_string()))
    }
}

async fn server_error(response: reqwest::Response) -> TrackingError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(err) if !err.message.is_empty() => format!("{}: {}", err.error_code, err.message),
        _ => text,
    };

    TrackingError::Server { status, message }
}

#[async_trait]
impl TrackingStore for MlflowRestStore {
    async fn start_run(&self, run_name: &str) -> TrackingResult<String> {
        let experiment_id = self.experiment_id().await?;

        let created: CreateRunResponse = self
            .post("runs/create", json!({
                "experiment_id": experiment_id,
                "run_name": run_name,
                "start_time": Utc::now().timestamp_millis(),
            }))
            .await?;

        Ok(created.run.info.run_id)
    }

    async fn set_tag(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        validate_key(key)?;
        let _: serde_json::Value = self
            .post("runs/set-tag", json!({ "run_id": run_id, "key": key, "value": value }))
            .await?;
        Ok(())
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        validate_key(key)?;
        let _: serde_json::Value = self
            .post("runs/log-parameter", json!({ "run_id": run_id, "key": key, "value": value }))
            .await?;
        Ok(())
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> TrackingResult<()> {
        validate_key(key)?;
        let _: serde_json::Value = self
            .post("runs/log-metric", json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
                "step": 0,
            }))
            .await?;
        Ok(())
    }

    async fn end_run(&self, run_id: &str, status: RunStatus) -> TrackingResult<()> {
        let _: serde_json::Value = self
            .post("runs/update", json!({
                "run_id": run_id,
                "status": status.as_str(),
                "end_time": Utc::now().timestamp_millis(),
            }))
            .await?;
        Ok(())
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}
