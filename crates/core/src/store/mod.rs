//! Remote object store collaborator.
//!
//! The cached remote backend only needs three things from a store: start a
//! download, start an upload, and delete an object. Transfers are reported
//! through a [`TransferHandle`] that can be polled without blocking or
//! awaited with a deadline.

#[cfg(test)]
pub(crate) mod memory;
pub mod s3;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::AbortHandle;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Start downloading `bucket/key` into `dest`.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<TransferHandle>;

    /// Start uploading `src` to `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: &str,
    ) -> Result<TransferHandle>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    InProgress,
    Succeeded,
    /// The remote object does not exist.
    Missing,
    Failed(String),
}

impl TransferStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, TransferStatus::InProgress)
    }
}

/// Why a transfer did not succeed, as seen by [`TransferHandle::wait`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferFailure {
    #[error("remote object does not exist")]
    Missing,
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("transfer was cancelled")]
    Cancelled,
}

/// A pollable in-flight upload or download.
///
/// Dropping an unfinished handle aborts the transfer.
pub struct TransferHandle {
    status: watch::Receiver<TransferStatus>,
    abort: Option<AbortHandle>,
}

impl TransferHandle {
    /// Run `transfer` on the tokio runtime and track its outcome.
    pub fn spawn<F>(transfer: F) -> Self
    where
        F: Future<Output = TransferStatus> + Send + 'static,
    {
        let (tx, rx) = watch::channel(TransferStatus::InProgress);
        let task = tokio::spawn(async move {
            let status = transfer.await;
            let _ = tx.send(status);
        });
        Self {
            status: rx,
            abort: Some(task.abort_handle()),
        }
    }

    /// A handle for a transfer that already finished.
    pub fn finished(status: TransferStatus) -> Self {
        let (_tx, rx) = watch::channel(status);
        Self {
            status: rx,
            abort: None,
        }
    }

    pub fn status(&self) -> TransferStatus {
        self.status.borrow().clone()
    }

    pub fn is_done(&self) -> bool {
        self.status.borrow().is_done()
    }

    pub fn succeeded(&self) -> bool {
        matches!(*self.status.borrow(), TransferStatus::Succeeded)
    }

    pub fn failure_detail(&self) -> Option<String> {
        match &*self.status.borrow() {
            TransferStatus::Missing => Some(TransferFailure::Missing.to_string()),
            TransferStatus::Failed(detail) => Some(detail.clone()),
            _ => None,
        }
    }

    pub fn cancel(&self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    /// Wait until the transfer completes or `timeout` elapses.
    ///
    /// On timeout the transfer is aborted.
    pub async fn wait(mut self, timeout: Duration) -> Result<(), TransferFailure> {
        let outcome = tokio::time::timeout(timeout, self.status.wait_for(TransferStatus::is_done))
            .await
            .map(|res| res.map(|status| (*status).clone()));

        match outcome {
            Ok(Ok(TransferStatus::Succeeded)) => Ok(()),
            Ok(Ok(TransferStatus::Missing)) => Err(TransferFailure::Missing),
            Ok(Ok(TransferStatus::Failed(detail))) => Err(TransferFailure::Failed(detail)),
            // Sender dropped without a final status: the task was aborted or panicked.
            Ok(Ok(TransferStatus::InProgress)) | Ok(Err(_)) => Err(TransferFailure::Cancelled),
            Err(_) => {
                self.cancel();
                Err(TransferFailure::TimedOut(timeout))
            }
        }
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        if !self.is_done() {
            self.cancel();
        }
    }
}
