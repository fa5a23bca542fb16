use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{ObjectStore, TransferHandle, TransferStatus};

/// S3 (or S3-compatible) object store.
///
/// Credentials are resolved on first use, either from explicit keys or from
/// the default AWS credential chain.
pub struct S3Store {
    region: Region,
    path_style: bool,
    access_key: Option<String>,
    secret_key: Option<String>,
    credentials: OnceCell<Credentials>,
}

impl S3Store {
    pub fn new(
        region: &str,
        endpoint: Option<&str>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> Self {
        let (region, path_style) = match endpoint {
            Some(endpoint) => (
                Region::Custom {
                    region: region.to_string(),
                    endpoint: endpoint.to_string(),
                },
                true,
            ),
            None => (
                Region::Custom {
                    region: region.to_string(),
                    endpoint: format!("https://s3.{region}.amazonaws.com"),
                },
                false,
            ),
        };
        Self {
            region,
            path_style,
            access_key: access_key.map(str::to_string),
            secret_key: secret_key.map(str::to_string),
            credentials: OnceCell::new(),
        }
    }

    async fn credentials(&self) -> Result<Credentials> {
        let credentials = self
            .credentials
            .get_or_try_init(|| async {
                match (&self.access_key, &self.secret_key) {
                    (Some(access), Some(secret)) => {
                        Credentials::new(Some(access.as_str()), Some(secret.as_str()), None, None, None)
                            .context("invalid S3 credentials")
                    }
                    // The default chain may query instance metadata over blocking HTTP.
                    _ => tokio::task::spawn_blocking(Credentials::default)
                        .await?
                        .context("no S3 credentials found"),
                }
            })
            .await?;
        Ok(credentials.clone())
    }

    async fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials().await?)
            .with_context(|| format!("failed to open bucket: {name}"))?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<TransferHandle> {
        let bucket = self.bucket(bucket).await?;
        let key = key.to_string();
        let dest = dest.to_path_buf();
        debug!(key = %key, dest = %dest.display(), "S3 download started");
        Ok(TransferHandle::spawn(async move {
            match get_to_file(&bucket, &key, &dest).await {
                Ok(status) => status,
                Err(e) => TransferStatus::Failed(format!("{e:#}")),
            }
        }))
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: &str,
    ) -> Result<TransferHandle> {
        let bucket = self.bucket(bucket).await?;
        let key = key.to_string();
        let src = src.to_path_buf();
        let content_type = content_type.to_string();
        debug!(key = %key, src = %src.display(), "S3 upload started");
        Ok(TransferHandle::spawn(async move {
            match put_from_file(&bucket, &key, &src, &content_type).await {
                Ok(()) => TransferStatus::Succeeded,
                Err(e) => TransferStatus::Failed(format!("{e:#}")),
            }
        }))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let bucket = self.bucket(bucket).await?;
        let response = bucket
            .delete_object(key)
            .await
            .with_context(|| format!("S3 DELETE failed: {key}"))?;
        let code = response.status_code();
        if !(200..300).contains(&code) {
            anyhow::bail!("S3 DELETE {key} returned HTTP {code}");
        }
        Ok(())
    }
}

async fn get_to_file(bucket: &Bucket, key: &str, dest: &Path) -> Result<TransferStatus> {
    let response = match bucket.get_object(key).await {
        Ok(response) => response,
        Err(S3Error::HttpFailWithBody(404, _)) => return Ok(TransferStatus::Missing),
        Err(e) => return Err(e).with_context(|| format!("S3 GET failed: {key}")),
    };
    match response.status_code() {
        404 => return Ok(TransferStatus::Missing),
        code if !(200..300).contains(&code) => {
            anyhow::bail!("S3 GET {key} returned HTTP {code}")
        }
        _ => {}
    }
    tokio::fs::write(dest, response.bytes())
        .await
        .with_context(|| format!("failed to write: {}", dest.display()))?;
    Ok(TransferStatus::Succeeded)
}

async fn put_from_file(bucket: &Bucket, key: &str, src: &Path, content_type: &str) -> Result<()> {
    let data = tokio::fs::read(src)
        .await
        .with_context(|| format!("failed to read: {}", src.display()))?;
    let response = bucket
        .put_object_with_content_type(key, &data, content_type)
        .await
        .with_context(|| format!("S3 PUT failed: {key}"))?;
    let code = response.status_code();
    if !(200..300).contains(&code) {
        anyhow::bail!("S3 PUT {key} returned HTTP {code}");
    }
    Ok(())
}
