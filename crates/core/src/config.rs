use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 600;

/// Settings that decide where stored files live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Local mount point of the bucket, when it is mounted into the filesystem.
    pub mount_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub transfer_timeout_secs: Option<u64>,
}

/// Outcome of backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    CachedRemote {
        bucket: String,
        region: String,
        endpoint: Option<String>,
    },
    Mounted(PathBuf),
    Local,
}

impl StorageConfig {
    pub fn selection(&self) -> Selection {
        let bucket = non_empty(&self.bucket);
        let region = non_empty(&self.region);
        let mount = self
            .mount_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty());

        match (bucket, region, mount) {
            (Some(bucket), Some(region), None) => Selection::CachedRemote {
                bucket: bucket.to_string(),
                region: region.to_string(),
                endpoint: non_empty(&self.endpoint).map(str::to_string),
            },
            (Some(_), Some(_), Some(mount)) => Selection::Mounted(mount.clone()),
            _ => Selection::Local,
        }
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(
            self.transfer_timeout_secs
                .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_SECS),
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
