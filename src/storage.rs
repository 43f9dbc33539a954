use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Settings, SettingsFile};

const SETTINGS_FILE: &str = "settings.json";
const SCHEMA_VERSION: u32 = 1;
pub const API_URL_ENV: &str = "PLANNER_API_URL";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Settings persistence in the app data directory.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable, then applies the environment override for the API URL.
    pub fn load_settings_or_default(&self) -> Settings {
        let mut settings = match self.load_settings() {
            Ok(file) => file.settings,
            Err(StorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Settings::default()
            }
            Err(err) => {
                log::warn!("storage: settings unreadable, using defaults: {err}");
                Settings::default()
            }
        };
        if let Some(url) = std::env::var(API_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            settings.api_base_url = url.trim().to_string();
        }
        settings
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let file = SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: settings.clone(),
        };
        self.write_atomic(self.root.join(SETTINGS_FILE), &file)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}
