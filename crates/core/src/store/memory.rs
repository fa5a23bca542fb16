use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{ObjectStore, TransferHandle, TransferStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Download { bucket: String, key: String },
    Upload { bucket: String, key: String, content_type: String },
    Delete { bucket: String, key: String },
}

/// How transfers of a key misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Report failure before touching the destination.
    Fail,
    /// Report success without writing anything.
    SucceedWithoutWriting,
    /// Write part of the object, then report failure.
    WriteThenFail,
    /// Write part of the object, then never finish.
    Hang,
}

const PARTIAL: &[u8] = b"partial";

/// In-memory object store that records calls and can be told to fail.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    calls: Mutex<Vec<Call>>,
    faults: Mutex<HashMap<String, Fault>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Make every transfer and delete of `key` fail.
    pub fn fail_key(&self, key: &str) {
        self.set_fault(key, Fault::Fail);
    }

    pub fn set_fault(&self, key: &str, fault: Fault) {
        self.faults.lock().unwrap().insert(key.to_string(), fault);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fault(&self, key: &str) -> Option<Fault> {
        self.faults.lock().unwrap().get(key).copied()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<TransferHandle> {
        self.record(Call::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let dest = dest.to_path_buf();
        match self.fault(key) {
            None => {}
            Some(Fault::Fail) => {
                return Ok(TransferHandle::finished(TransferStatus::Failed(
                    "injected download failure".into(),
                )));
            }
            Some(Fault::SucceedWithoutWriting) => {
                return Ok(TransferHandle::finished(TransferStatus::Succeeded));
            }
            Some(Fault::WriteThenFail) => {
                return Ok(TransferHandle::spawn(async move {
                    let _ = tokio::fs::write(&dest, PARTIAL).await;
                    TransferStatus::Failed("connection reset mid-transfer".into())
                }));
            }
            Some(Fault::Hang) => {
                return Ok(TransferHandle::spawn(async move {
                    let _ = tokio::fs::write(&dest, PARTIAL).await;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    TransferStatus::Succeeded
                }));
            }
        }
        let Some(data) = self.get(bucket, key) else {
            return Ok(TransferHandle::finished(TransferStatus::Missing));
        };
        Ok(TransferHandle::spawn(async move {
            match tokio::fs::write(&dest, data).await {
                Ok(()) => TransferStatus::Succeeded,
                Err(e) => TransferStatus::Failed(e.to_string()),
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
        self.record(Call::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
        });
        match self.fault(key) {
            None => {}
            Some(Fault::Fail | Fault::WriteThenFail) => {
                return Ok(TransferHandle::finished(TransferStatus::Failed(
                    "injected upload failure".into(),
                )));
            }
            Some(Fault::SucceedWithoutWriting) => {
                return Ok(TransferHandle::finished(TransferStatus::Succeeded));
            }
            Some(Fault::Hang) => {
                return Ok(TransferHandle::spawn(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    TransferStatus::Succeeded
                }));
            }
        }
        let status = match tokio::fs::read(src).await {
            Ok(data) => {
                self.insert(bucket, key, &data);
                TransferStatus::Succeeded
            }
            Err(e) => TransferStatus::Failed(e.to_string()),
        };
        Ok(TransferHandle::finished(status))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.record(Call::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self.fault(key).is_some() {
            anyhow::bail!("injected delete failure");
        }
        let removed = self
            .objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        if removed.is_none() {
            anyhow::bail!("no such key: {key}");
        }
        Ok(())
    }
}
