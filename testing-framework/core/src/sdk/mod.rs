//! File operations on allocations, driven through the storage SDK.

mod binary;
mod zbox;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
pub use binary::{SDK_BINARY_ENV, resolve_sdk_binary};
use thiserror::Error;
pub use zbox::ZboxCli;

use crate::models::{ListResult, Wallet};

/// One step of a multi-operation commit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FileOperation {
    Upload { local: PathBuf, remote: String },
    Update { local: PathBuf, remote: String },
    Delete { remote: String },
    Rename { remote: String, new_name: String },
    Move { remote: String, dest_dir: String },
    Copy { remote: String, dest_dir: String },
}

impl FileOperation {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "upload",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Rename { .. } => "rename",
            Self::Move { .. } => "move",
            Self::Copy { .. } => "copy",
        }
    }

    /// Remote path the operation acts on.
    #[must_use]
    pub fn remote(&self) -> &str {
        match self {
            Self::Upload { remote, .. }
            | Self::Update { remote, .. }
            | Self::Delete { remote }
            | Self::Rename { remote, .. }
            | Self::Move { remote, .. }
            | Self::Copy { remote, .. } => remote,
        }
    }
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("multi-operation batch is empty")]
    EmptyBatch,
    #[error("{0} is not supported by this SDK backend")]
    Unsupported(&'static str),
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status:?}: {stderr}")]
    Command {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("`{command}` did not finish within {limit:?}")]
    Timeout { command: String, limit: Duration },
    #[error("failed to decode output of `{command}`: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to prepare wallet file: {0}")]
    Wallet(#[source] std::io::Error),
}

/// Rejects empty multi-operation batches before anything reaches the network.
pub fn ensure_batch(ops: &[FileOperation]) -> Result<(), SdkError> {
    if ops.is_empty() {
        return Err(SdkError::EmptyBatch);
    }
    Ok(())
}

/// Storage SDK as seen by scenarios. Every call acts on behalf of `wallet`.
#[async_trait]
pub trait StorageSdk: Send + Sync {
    async fn list_files(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        remote_dir: &str,
    ) -> Result<ListResult, SdkError>;

    /// Applies `ops` as one batch. `repair_list` restricts the batch to the
    /// given blobber ids, leaving the others to be repaired later. Backends
    /// that cannot target blobbers return [`SdkError::Unsupported`].
    async fn multi_operation(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        ops: &[FileOperation],
        repair_list: Option<&[String]>,
    ) -> Result<(), SdkError>;

    async fn download(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), SdkError>;

    /// Brings every blobber of the allocation up to date below `remote_root`.
    async fn repair_allocation(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        remote_root: &str,
    ) -> Result<(), SdkError>;

    /// Reverts the allocation to its state before the latest batch, however
    /// many commits that batch took.
    async fn rollback_allocation(&self, wallet: &Wallet, allocation_id: &str)
    -> Result<(), SdkError>;
}
