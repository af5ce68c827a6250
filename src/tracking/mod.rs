//! Experiment Tracking
//!
//! Every successful prediction is appended to an MLflow-compatible tracking
//! store as one run:
//!
//! ```text
//! Diabetes_Monitoring/
//! └── run "User Prediction"
//!     ├── tags     source, timestamp, label
//!     ├── params   Pregnancies ... Age
//!     └── metrics  prediction
//! ```
//!
//! The store is opaque to the rest of the app: a local `mlruns` directory
//! ([`FileStore`]) or a tracking server reached over REST ([`MlflowRestStore`]).

pub mod file;
pub mod reporter;
pub mod rest;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use file::FileStore;
pub use reporter::{record_outcome, RunSettings};
pub use rest::MlflowRestStore;

pub type TrackingResult<T> = Result<T, TrackingError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("unsupported tracking URI: {0}")]
    UnsupportedUri(String),

    #[error("invalid tracking key '{0}'")]
    InvalidKey(String),

    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("tracking store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tracking metadata error: {0}")]
    Metadata(#[from] serde_yaml::Error),

    #[error("tracking server unreachable: {0}")]
    Network(String),

    #[error("tracking server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected tracking server response: {0}")]
    Parse(String),
}

/// Terminal state written when a run is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    /// Name used by the REST API
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }

    /// Numeric code stored in a file store's run `meta.yaml`
    pub fn code(self) -> i32 {
        match self {
            Self::Running => 1,
            Self::Finished => 3,
            Self::Failed => 4,
        }
    }
}

/// Append-only sink for prediction runs
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Open a run in the configured experiment, returning its id
    async fn start_run(&self, run_name: &str) -> TrackingResult<String>;

    async fn set_tag(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()>;

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()>;

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> TrackingResult<()>;

    async fn end_run(&self, run_id: &str, status: RunStatus) -> TrackingResult<()>;

    /// Human readable location, for logs
    fn location(&self) -> String;
}

/// Pick a store implementation from the tracking URI
pub fn connect(
    tracking_uri: &str,
    experiment_name: &str,
    timeout: Duration,
) -> TrackingResult<Arc<dyn TrackingStore>> {
    if tracking_uri.starts_with("http://") || tracking_uri.starts_with("https://") {
        let store = MlflowRestStore::new(tracking_uri, experiment_name, timeout)?;
        return Ok(Arc::new(store));
    }

    let path = match tracking_uri.strip_prefix("file://") {
        Some(path) => path,
        None if tracking_uri.contains("://") => {
            return Err(TrackingError::UnsupportedUri(tracking_uri.to_string()));
        }
        None => tracking_uri,
    };

    if path.is_empty() {
        return Err(TrackingError::UnsupportedUri(tracking_uri.to_string()));
    }

    Ok(Arc::new(FileStore::new(path, experiment_name)?))
}

/// Keys become file names in a file store; keep them to MLflow's safe set
pub(crate) fn validate_key(key: &str) -> TrackingResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '));

    if valid {
        Ok(())
    } else {
        Err(TrackingError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_selects_store() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().display());
        let store = connect(&uri, "Diabetes_Monitoring", Duration::from_secs(1)).unwrap();
        assert!(store.location().starts_with("file://"));

        let store = connect("http://127.0.0.1:5000", "Diabetes_Monitoring", Duration::from_secs(1)).unwrap();
        assert_eq!(store.location(), "http://127.0.0.1:5000");
    }

    #[test]
    fn test_connect_rejects_unknown_scheme() {
        let err = connect("databricks://profile", "x", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, TrackingError::UnsupportedUri(_)));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("DiabetesPedigreeFunction").is_ok());
        assert!(validate_key("mlflow.runName").is_ok());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RunStatus::Finished.code(), 3);
        assert_eq!(RunStatus::Failed.as_str(), "FAILED");
    }
}
