use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pkgstore_core::StorageConfig;

const CONFIG_FILE: &str = "pkgstore.toml";

const ENV_BUCKET: &str = "PKGSTORE_S3_BUCKET";
const ENV_REGION: &str = "PKGSTORE_S3_REGION";
const ENV_MOUNT_PATH: &str = "PKGSTORE_S3_MOUNT_PATH";
const ENV_ENDPOINT: &str = "PKGSTORE_S3_ENDPOINT";
const ENV_ACCESS_KEY: &str = "PKGSTORE_S3_ACCESS_KEY";
const ENV_SECRET_KEY: &str = "PKGSTORE_S3_SECRET_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pkgstore")
            .join(CONFIG_FILE)
    }

    /// Load the config file (if any) and apply environment overrides.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::config_path();
                if default.is_file() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("config not found at {}", path.display()))?;
        toml::from_str(&content).context("failed to parse config")
    }

    /// Overlay values from the environment. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let storage = &mut self.storage;

        if let Some(v) = get(ENV_BUCKET) {
            storage.bucket = Some(v);
        }
        if let Some(v) = get(ENV_REGION) {
            storage.region = Some(v);
        }
        if let Some(v) = get(ENV_MOUNT_PATH) {
            storage.mount_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_ENDPOINT) {
            storage.endpoint = Some(v);
        }
        if let Some(v) = get(ENV_ACCESS_KEY) {
            storage.access_key = Some(v);
        }
        if let Some(v) = get(ENV_SECRET_KEY) {
            storage.secret_key = Some(v);
        }
    }
}
