//! File-based storage backend.
//!
//! Each key is one JSON file under the configured directory. Writes go to a
//! temporary file that is renamed over the target, and every operation holds
//! an advisory lock on a directory-wide lock file so that two client
//! processes sharing a data directory do not interleave.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use std::future::Future;
use std::path::PathBuf;
use swap_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use tokio::fs;
use tracing::debug;

const DEFAULT_STORAGE_PATH: &str = "./data/swap";
const LOCK_FILE: &str = ".lock";

/// File-based storage implementation.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key to a filesystem-safe path inside the base directory.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':', '.'], "_");
		self.base_path.join(format!("{safe_key}.json"))
	}

	/// Runs `operation` while holding the directory lock.
	async fn with_lock<F, Fut, R>(&self, exclusive: bool, operation: F) -> Result<R, StorageError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<R, StorageError>>,
	{
		fs::create_dir_all(&self.base_path).await.map_err(|e| {
			StorageError::Backend(format!("Failed to create storage directory: {e}"))
		})?;

		let lock_path = self.base_path.join(LOCK_FILE);
		let lock_file = tokio::task::spawn_blocking(move || {
			let file = std::fs::OpenOptions::new()
				.create(true)
				.truncate(false)
				.write(true)
				.open(&lock_path)
				.map_err(|e| StorageError::Backend(format!("Failed to open lock file: {e}")))?;
			let locked = if exclusive {
				FileExt::lock_exclusive(&file)
			} else {
				FileExt::lock_shared(&file)
			};
			locked.map_err(|e| StorageError::Backend(format!("Failed to acquire lock: {e}")))?;
			Ok::<_, StorageError>(file)
		})
		.await
		.map_err(|e| StorageError::Backend(format!("Failed to spawn blocking task: {e}")))??;

		let result = operation().await;
		// Closing the handle releases the lock as well.
		let _ = FileExt::unlock(&lock_file);
		result
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);
		self.with_lock(false, move || async move {
			match fs::read(&path).await {
				Ok(data) => Ok(data),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
					Err(StorageError::NotFound(key.to_string()))
				},
				Err(e) => Err(StorageError::Backend(e.to_string())),
			}
		})
		.await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		self.with_lock(true, move || async move {
			let temp_path = path.with_extension("tmp");
			fs::write(&temp_path, value)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
			fs::rename(&temp_path, &path)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
			debug!(key = %key, path = %path.display(), "Stored value");
			Ok(())
		})
		.await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		self.with_lock(true, move || async move {
			match fs::remove_file(&path).await {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StorageError::Backend(e.to_string())),
			}
		})
		.await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);
		fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("must not be empty".to_string()),
				}
			})],
		)
		.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the data files (default: "./data/swap")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(format!("Invalid configuration: {e}")))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn create_test_storage() -> (FileStorage, TempDir) {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());
		(storage, temp_dir)
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let (storage, _temp_dir) = create_test_storage();

		storage.set_bytes("test_key", b"test_value".to_vec()).await.unwrap();
		assert_eq!(
			storage.get_bytes("test_key").await.unwrap(),
			b"test_value".to_vec()
		);
		assert!(storage.exists("test_key").await.unwrap());

		storage.delete("test_key").await.unwrap();
		assert!(!storage.exists("test_key").await.unwrap());
		assert!(matches!(
			storage.get_bytes("test_key").await,
			Err(StorageError::NotFound(_))
		));
		// Deleting again is fine.
		storage.delete("test_key").await.unwrap();
	}

	#[tokio::test]
	async fn test_keys_stay_inside_base_directory() {
		let (storage, temp_dir) = create_test_storage();

		storage
			.set_bytes("preferences:../../escape", b"{}".to_vec())
			.await
			.unwrap();

		let path = storage.get_file_path("preferences:../../escape");
		assert_eq!(path.parent(), Some(temp_dir.path()));
		assert!(path.exists());
	}

	#[tokio::test]
	async fn test_data_survives_new_instance() {
		let (storage, temp_dir) = create_test_storage();
		storage.set_bytes("preferences:swap", b"[1,2]".to_vec()).await.unwrap();
		drop(storage);

		let reopened = FileStorage::new(temp_dir.path().to_path_buf());
		assert_eq!(
			reopened.get_bytes("preferences:swap").await.unwrap(),
			b"[1,2]".to_vec()
		);
	}

	#[tokio::test]
	async fn test_concurrent_writers_leave_a_complete_value() {
		let (storage, _temp_dir) = create_test_storage();
		let storage = std::sync::Arc::new(storage);

		let mut handles = Vec::new();
		for i in 0..8u8 {
			let storage = storage.clone();
			handles.push(tokio::spawn(async move {
				storage.set_bytes("shared", vec![i; 1024]).await.unwrap();
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}

		let value = storage.get_bytes("shared").await.unwrap();
		assert_eq!(value.len(), 1024);
		assert!(value.iter().all(|b| *b == value[0]));
	}

	#[test]
	fn test_factory_reads_storage_path() {
		let temp_dir = TempDir::new().unwrap();
		let config = toml::Value::Table(toml::map::Map::from_iter([(
			"storage_path".to_string(),
			toml::Value::String(temp_dir.path().display().to_string()),
		)]));
		assert!(create_storage(&config).is_ok());

		let empty = toml::Value::Table(toml::map::Map::from_iter([(
			"storage_path".to_string(),
			toml::Value::String("  ".to_string()),
		)]));
		assert!(matches!(
			create_storage(&empty),
			Err(StorageError::Configuration(_))
		));
	}
}
