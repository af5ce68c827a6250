//! Inference API Client
//!
//! HTTP client for the MLflow model server's `/invocations` endpoint.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{DiabetesLabel, FeatureValue, PredictionRequest, COLUMNS};

// Request/Response types

/// `dataframe_split` body accepted by the model server
#[derive(Debug, Serialize)]
pub struct InvocationRequest {
    pub dataframe_split: DataframeSplit,
}

#[derive(Debug, Serialize)]
pub struct DataframeSplit {
    pub columns: [&'static str; 8],
    pub data: Vec<[FeatureValue; 8]>,
}

impl InvocationRequest {
    /// Single-row payload for one form submission
    pub fn single(request: &PredictionRequest) -> Self {
        Self {
            dataframe_split: DataframeSplit {
                columns: COLUMNS,
                data: vec![request.features()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvocationResponse {
    pub predictions: Vec<serde_json::Value>,
}

/// Ways a prediction round trip can fail
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference endpoint did not respond within {0:?}")]
    Timeout(Duration),

    #[error("could not reach inference endpoint: {0}")]
    Transport(String),

    /// Non-200 reply; the body is what the user sees
    #[error("{body}")]
    Application { status: u16, body: String },

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("model returned unexpected class {0}")]
    UnexpectedClass(serde_json::Value),
}

impl InferenceError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Inference API client
pub struct InferenceClient {
    endpoint: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl InferenceClient {
    /// Create new inference client
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request to the model server and classify the first prediction
    pub async fn predict(&self, request: &PredictionRequest) -> Result<DiabetesLabel, InferenceError> {
        let payload = InvocationRequest::single(request);

        tracing::debug!("Sending prediction request to {}", self.endpoint);

        let response = self.http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| InferenceError::from_reqwest(e, self.timeout))?;

        if status != StatusCode::OK {
            tracing::warn!("Inference endpoint returned {}: {}", status, body);
            return Err(InferenceError::Application {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: InvocationResponse = serde_json::from_str(&body)
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        let first = parsed.predictions.into_iter().next()
            .ok_or_else(|| InferenceError::MalformedResponse("empty predictions array".to_string()))?;

        first.as_f64()
            .and_then(DiabetesLabel::from_prediction)
            .ok_or(InferenceError::UnexpectedClass(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prediction::minimum_request;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> InferenceClient {
        InferenceClient::new(format!("{}/invocations", server.uri()), timeout)
            .expect("failed to create client")
    }

    async fn stub(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/invocations"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[test]
    fn test_payload_at_minimum_bounds() {
        let payload = serde_json::to_value(InvocationRequest::single(&minimum_request())).unwrap();
        assert_eq!(
            payload,
            json!({
                "dataframe_split": {
                    "columns": ["Pregnancies", "Glucose", "BloodPressure", "SkinThickness",
                                "Insulin", "BMI", "DiabetesPedigreeFunction", "Age"],
                    "data": [[0, 0, 0, 0, 0, 0.0, 0.0, 0]]
                }
            })
        );
    }

    #[test]
    fn test_column_order_independent_of_values() {
        let request = PredictionRequest {
            pregnancies: 9,
            glucose: 200,
            bmi: 51.2,
            age: 81,
            ..minimum_request()
        };
        let payload = serde_json::to_value(InvocationRequest::single(&request)).unwrap();
        assert_eq!(payload["dataframe_split"]["columns"], json!(COLUMNS));
        assert_eq!(payload["dataframe_split"]["data"][0][5], json!(51.2));
        assert_eq!(payload["dataframe_split"]["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_predict_sends_dataframe_split() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invocations"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "dataframe_split": {
                    "columns": COLUMNS,
                    "data": [[0, 0, 0, 0, 0, 0.0, 0.0, 0]]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": [1]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let label = assert_ok!(client.predict(&minimum_request()).await);
        assert_eq!(label, DiabetesLabel::Diabetic);
    }

    #[tokio::test]
    async fn test_predict_not_diabetic() {
        let server = MockServer::start().await;
        stub(&server, ResponseTemplate::new(200).set_body_json(json!({"predictions": [0, 1]}))).await;

        let client = client_for(&server, Duration::from_secs(5));
        let label = assert_ok!(client.predict(&minimum_request()).await);
        assert_eq!(label, DiabetesLabel::NotDiabetic);
    }

    #[tokio::test]
    async fn test_predict_server_error_keeps_body() {
        let server = MockServer::start().await;
        stub(&server, ResponseTemplate::new(500).set_body_string("model error")).await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = assert_err!(client.predict(&minimum_request()).await);
        assert!(matches!(err, InferenceError::Application { status: 500, .. }));
        assert_eq!(format!("Error: {}", err), "Error: model error");
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_failure() {
        let server = MockServer::start().await;
        stub(&server, ResponseTemplate::new(202).set_body_string("queued")).await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = assert_err!(client.predict(&minimum_request()).await);
        assert!(matches!(err, InferenceError::Application { status: 202, .. }));
    }

    #[tokio::test]
    async fn test_unexpected_class_is_error() {
        let server = MockServer::start().await;
        stub(&server, ResponseTemplate::new(200).set_body_json(json!({"predictions": [2]}))).await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = assert_err!(client.predict(&minimum_request()).await);
        assert!(matches!(err, InferenceError::UnexpectedClass(_)));
    }

    #[tokio::test]
    async fn test_empty_predictions_is_malformed() {
        let server = MockServer::start().await;
        stub(&server, ResponseTemplate::new(200).set_body_json(json!({"predictions": []}))).await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = assert_err!(client.predict(&minimum_request()).await);
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        stub(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({"predictions": [1]}))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let client = client_for(&server, Duration::from_millis(200));
        let err = assert_err!(client.predict(&minimum_request()).await);
        assert!(matches!(err, InferenceError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = InferenceClient::new("http://127.0.0.1:9/invocations", Duration::from_secs(2))
            .unwrap();
        let err = assert_err!(client.predict(&minimum_request()).await);
        assert!(matches!(err, InferenceError::Transport(_) | InferenceError::Timeout(_)));
    }
}
