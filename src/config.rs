//! Configuration module

use std::env;
use std::time::Duration;

use crate::tracking::RunSettings;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the form server binds to
    pub host: String,

    /// Server port
    pub port: u16,

    /// Full URL of the model server's invocations endpoint
    pub inference_url: String,

    /// Upper bound for one inference round trip
    pub inference_timeout_secs: u64,

    /// Tracking store location (`file://...`, a bare path, or `http(s)://...`)
    pub tracking_uri: String,

    /// Experiment every prediction run is recorded under
    pub experiment_name: String,

    /// Name given to each prediction run
    pub run_name: String,

    /// Value of the `source` tag on each run
    pub run_source: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            inference_url: "http://127.0.0.1:1234/invocations".to_string(),
            inference_timeout_secs: 30,
            tracking_uri: "file://./mlruns".to_string(),
            experiment_name: "Diabetes_Monitoring".to_string(),
            run_name: "User Prediction".to_string(),
            run_source: "web_form".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            inference_url: env::var("INFERENCE_URL").unwrap_or(defaults.inference_url),

            inference_timeout_secs: env::var("INFERENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.inference_timeout_secs),

            tracking_uri: env::var("MLFLOW_TRACKING_URI").unwrap_or(defaults.tracking_uri),

            experiment_name: env::var("MLFLOW_EXPERIMENT_NAME")
                .unwrap_or(defaults.experiment_name),

            run_name: env::var("RUN_NAME").unwrap_or(defaults.run_name),

            run_source: env::var("RUN_SOURCE").unwrap_or(defaults.run_source),

            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// Naming applied to every run the reporter opens
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            run_name: self.run_name.clone(),
            source: self.run_source.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_local_deployment() {
        let config = Config::default();
        assert_eq!(config.inference_url, "http://127.0.0.1:1234/invocations");
        assert_eq!(config.experiment_name, "Diabetes_Monitoring");
        assert_eq!(config.inference_timeout(), Duration::from_secs(30));
        assert!(!config.is_production());
    }

    #[test]
    fn test_run_settings() {
        let config = Config {
            run_source: "kiosk".to_string(),
            ..Default::default()
        };
        let settings = config.run_settings();
        assert_eq!(settings.run_name, "User Prediction");
        assert_eq!(settings.source, "kiosk");
    }
}
