//! Durable key-value store kept in a single JSON file.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use smartclinic_application::KeyValueStore;
use smartclinic_core::{AppError, AppResult};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

/// Key-value store persisted across restarts.
///
/// The whole map is rewritten on every change through a temporary file and a
/// rename.
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileKeyValueStore {
    /// Creates a store backed by `path`. Parent directories are created on
    /// the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn temp_path(&self) -> PathBuf {
        let mut file_name = self.path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }

    async fn read_map(&self) -> AppResult<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read '{}': {error}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str(contents.as_str()) {
            Ok(values) => Ok(values),
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "ignoring corrupt store file");
                Ok(BTreeMap::new())
            }
        }
    }

    async fn write_map(&self, values: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let encoded = serde_json::to_string_pretty(values)
            .map_err(|error| AppError::Internal(format!("failed to encode store: {error}")))?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, encoded).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write '{}': {error}",
                temp_path.display()
            ))
        })?;
        fs::rename(&temp_path, &self.path).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to replace '{}': {error}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.read_map().await?;
        values.insert(key.to_owned(), value);
        self.write_map(&values).await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.read_map().await?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&values).await
    }
}
