//! Local file store
//!
//! Writes runs in the on-disk layout of MLflow's file store so that
//! `mlflow ui --backend-store-uri <root>` can browse them:
//!
//! ```text
//! <root>/<experiment_id>/meta.yaml
//! <root>/<experiment_id>/<run_id>/meta.yaml
//! <root>/<experiment_id>/<run_id>/{tags,params,metrics,artifacts}/
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{validate_key, RunStatus, TrackingError, TrackingResult, TrackingStore};

const META_FILE: &str = "meta.yaml";

#[derive(Debug, Serialize, Deserialize)]
struct ExperimentMeta {
    artifact_location: String,
    #[serde(default)]
    creation_time: Option<i64>,
    experiment_id: String,
    #[serde(default)]
    last_update_time: Option<i64>,
    lifecycle_stage: String,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunMeta {
    artifact_uri: String,
    end_time: Option<i64>,
    entry_point_name: String,
    experiment_id: String,
    lifecycle_stage: String,
    run_id: String,
    run_name: String,
    run_uuid: String,
    source_name: String,
    source_type: i32,
    source_version: String,
    start_time: i64,
    status: i32,
    tags: Vec<String>,
    user_id: String,
}

/// MLflow-compatible `mlruns` directory
pub struct FileStore {
    root: PathBuf,
    experiment_name: String,
    experiment_id: OnceCell<String>,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>, experiment_name: &str) -> TrackingResult<Self> {
        Ok(Self {
            root: std::path::absolute(root.as_ref())?,
            experiment_name: experiment_name.to_string(),
            experiment_id: OnceCell::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn experiment_id(&self) -> TrackingResult<&str> {
        self.experiment_id
            .get_or_try_init(|| self.resolve_experiment())
            .await
            .map(String::as_str)
    }

    /// Find the active experiment by name, creating it when absent
    async fn resolve_experiment(&self) -> TrackingResult<String> {
        fs::create_dir_all(&self.root).await?;

        let mut max_id: u64 = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(id) = entry.file_name().to_string_lossy().parse::<u64>() {
                max_id = max_id.max(id);
            }

            let Ok(raw) = fs::read_to_string(entry.path().join(META_FILE)).await else {
                continue;
            };

            match serde_yaml::from_str::<ExperimentMeta>(&raw) {
                Ok(meta) if meta.name == self.experiment_name && meta.lifecycle_stage == "active" => {
                    return Ok(meta.experiment_id);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable experiment {:?}: {}", entry.path(), e),
            }
        }

        let experiment_id = (max_id + 1).to_string();
        let dir = self.root.join(&experiment_id);
        fs::create_dir_all(&dir).await?;

        let now = Utc::now().timestamp_millis();
        let meta = ExperimentMeta {
            artifact_location: file_uri(&dir),
            creation_time: Some(now),
            experiment_id: experiment_id.clone(),
            last_update_time: Some(now),
            lifecycle_stage: "active".to_string(),
            name: self.experiment_name.clone(),
        };
        fs::write(dir.join(META_FILE), serde_yaml::to_string(&meta)?).await?;

        tracing::info!("Created experiment '{}' (id {})", self.experiment_name, experiment_id);
        Ok(experiment_id)
    }

    async fn run_dir(&self, run_id: &str) -> TrackingResult<PathBuf> {
        validate_key(run_id)?;
        let dir = self.root.join(self.experiment_id().await?).join(run_id);

        if fs::try_exists(dir.join(META_FILE)).await? {
            Ok(dir)
        } else {
            Err(TrackingError::RunNotFound(run_id.to_string()))
        }
    }
}

#[async_trait]
impl TrackingStore for FileStore {
    async fn start_run(&self, run_name: &str) -> TrackingResult<String> {
        let experiment_id = self.experiment_id().await?.to_string();
        let run_id = Uuid::new_v4().simple().to_string();
        let dir = self.root.join(&experiment_id).join(&run_id);

        for sub in ["tags", "params", "metrics", "artifacts"] {
            fs::create_dir_all(dir.join(sub)).await?;
        }

        let meta = RunMeta {
            artifact_uri: file_uri(&dir.join("artifacts")),
            end_time: None,
            entry_point_name: String::new(),
            experiment_id,
            lifecycle_stage: "active".to_string(),
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
            run_uuid: run_id.clone(),
            source_name: String::new(),
            source_type: 4,
            source_version: String::new(),
            start_time: Utc::now().timestamp_millis(),
            status: RunStatus::Running.code(),
            tags: Vec::new(),
            user_id: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        };
        fs::write(dir.join(META_FILE), serde_yaml::to_string(&meta)?).await?;

        Ok(run_id)
    }

    async fn set_tag(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        validate_key(key)?;
        let dir = self.run_dir(run_id).await?;
        fs::write(dir.join("tags").join(key), value).await?;
        Ok(())
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        validate_key(key)?;
        let dir = self.run_dir(run_id).await?;
        fs::write(dir.join("params").join(key), value).await?;
        Ok(())
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> TrackingResult<()> {
        validate_key(key)?;
        let dir = self.run_dir(run_id).await?;

        // <timestamp> <value> <step>
        let line = format!("{} {:?} 0\n", Utc::now().timestamp_millis(), value);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics").join(key))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn end_run(&self, run_id: &str, status: RunStatus) -> TrackingResult<()> {
        let meta_path = self.run_dir(run_id).await?.join(META_FILE);

        let mut meta: RunMeta = serde_yaml::from_str(&fs::read_to_string(&meta_path).await?)?;
        meta.status = status.code();
        meta.end_time = Some(Utc::now().timestamp_millis());
        fs::write(&meta_path, serde_yaml::to_string(&meta)?).await?;
        Ok(())
    }

    fn location(&self) -> String {
        file_uri(&self.root)
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(path: PathBuf) -> String {
        fs::read_to_string(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_run_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("mlruns"), "Diabetes_Monitoring").unwrap();

        let run_id = store.start_run("User Prediction").await.unwrap();
        store.set_tag(&run_id, "label", "Not_Diabetic").await.unwrap();
        store.log_param(&run_id, "BMI", "33.6").await.unwrap();
        store.log_metric(&run_id, "prediction", 0.0).await.unwrap();
        store.end_run(&run_id, RunStatus::Finished).await.unwrap();

        let run_dir = store.root().join("1").join(&run_id);
        assert_eq!(read(run_dir.join("tags/label")).await, "Not_Diabetic");
        assert_eq!(read(run_dir.join("params/BMI")).await, "33.6");

        let metric = read(run_dir.join("metrics/prediction")).await;
        let fields: Vec<&str> = metric.split_whitespace().collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "0.0");
        assert_eq!(fields[2], "0");

        let meta: RunMeta = serde_yaml::from_str(&read(run_dir.join(META_FILE)).await).unwrap();
        assert_eq!(meta.run_name, "User Prediction");
        assert_eq!(meta.status, 3);
        assert!(meta.end_time.is_some());

        let experiment: ExperimentMeta =
            serde_yaml::from_str(&read(store.root().join("1").join(META_FILE)).await).unwrap();
        assert_eq!(experiment.name, "Diabetes_Monitoring");
    }

    #[tokio::test]
    async fn test_experiment_reused_across_stores() {
        let dir = tempfile::tempdir().unwrap();

        let first = FileStore::new(dir.path(), "Diabetes_Monitoring").unwrap();
        let run_a = first.start_run("User Prediction").await.unwrap();

        let other = FileStore::new(dir.path(), "Other").unwrap();
        other.start_run("User Prediction").await.unwrap();

        let second = FileStore::new(dir.path(), "Diabetes_Monitoring").unwrap();
        let run_b = second.start_run("User Prediction").await.unwrap();

        assert_ne!(run_a, run_b);
        assert!(dir.path().join("1").join(&run_a).is_dir());
        assert!(dir.path().join("1").join(&run_b).is_dir());
        assert!(dir.path().join("2").join(META_FILE).is_file());
    }

    #[tokio::test]
    async fn test_unknown_run_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "Diabetes_Monitoring").unwrap();

        let err = store.set_tag("deadbeef", "label", "Diabetic").await.unwrap_err();
        assert!(matches!(err, TrackingError::RunNotFound(_)));

        let run_id = store.start_run("User Prediction").await.unwrap();
        let err = store.log_param(&run_id, "../../etc", "x").await.unwrap_err();
        assert!(matches!(err, TrackingError::InvalidKey(_)));
    }
}
