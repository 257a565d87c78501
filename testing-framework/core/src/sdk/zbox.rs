use std::{
    collections::HashMap,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;
use testing_framework_config::SdkConfig;
use tokio::{process::Command, time::timeout};
use tracing::{debug, info, instrument};

use super::{FileOperation, SdkError, StorageSdk, binary::resolve_sdk_binary, ensure_batch};
use crate::models::{FileRef, ListResult, Wallet};

/// Files the CLI reads from its config dir besides the wallet.
const CONFIG_FILES: [&str; 2] = ["config.yaml", "network.yaml"];

/// [`StorageSdk`] backed by the `zbox` CLI, one process per operation.
///
/// Wallets are written into a private config dir so concurrent scenarios can
/// act for different clients without touching the user's CLI setup.
///
/// Every CLI call commits on its own, so a batch of `n` operations lands as
/// `n` commits. The number of commits the last batch produced is kept per
/// allocation and [`StorageSdk::rollback_allocation`] undoes all of them,
/// which gives callers the same batch-level rollback an atomic backend has.
#[derive(Debug)]
pub struct ZboxCli {
    binary: PathBuf,
    command_timeout: Duration,
    config_dir: TempDir,
    last_batch: Mutex<HashMap<String, usize>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawListing {
    Entries(Vec<FileRef>),
    Wrapped(ListResult),
}

impl ZboxCli {
    pub fn new(config: &SdkConfig) -> Result<Self, SdkError> {
        let config_dir = tempfile::Builder::new()
            .prefix("zbox-config-")
            .tempdir()
            .map_err(SdkError::Wallet)?;

        if let Some(source_dir) = &config.config_dir {
            for name in CONFIG_FILES {
                let source = source_dir.join(name);
                if source.is_file() {
                    fs::copy(&source, config_dir.path().join(name)).map_err(SdkError::Wallet)?;
                }
            }
        }

        let binary = resolve_sdk_binary(config);
        info!(
            binary = %binary.display(),
            config_dir = %config_dir.path().display(),
            "storage cli ready"
        );

        Ok(Self {
            binary,
            command_timeout: crate::adjust_timeout(config.command_timeout),
            config_dir,
            last_batch: Mutex::new(HashMap::new()),
        })
    }

    /// Commits the last batch on `allocation_id` produced, if any ran here.
    #[must_use]
    pub fn pending_commits(&self, allocation_id: &str) -> Option<usize> {
        self.batches().get(allocation_id).copied()
    }

    fn record_remaining(&self, allocation_id: &str, remaining: usize) {
        if remaining > 1 {
            self.batches().insert(allocation_id.to_owned(), remaining);
        } else {
            self.batches().remove(allocation_id);
        }
    }

    fn batches(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.last_batch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.config_dir.path()
    }

    fn wallet_file(&self, wallet: &Wallet) -> Result<String, SdkError> {
        let name = format!("{}.json", wallet.client_id);
        let path = self.config_dir.path().join(&name);
        if !path.exists() {
            let raw = serde_json::to_vec_pretty(wallet).map_err(|source| SdkError::Decode {
                command: "serialize wallet".to_owned(),
                source,
            })?;
            fs::write(&path, raw).map_err(SdkError::Wallet)?;
        }
        Ok(name)
    }

    async fn run(&self, wallet: &Wallet, args: Vec<OsString>) -> Result<Vec<u8>, SdkError> {
        let command = describe(&args);
        let wallet_file = self.wallet_file(wallet)?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .arg("--wallet")
            .arg(&wallet_file)
            .arg("--configDir")
            .arg(self.config_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command, "running storage cli");
        let output = match timeout(self.command_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(SdkError::Spawn { command, source }),
            Err(_) => {
                return Err(SdkError::Timeout {
                    command,
                    limit: self.command_timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(SdkError::Command {
                command,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(output.stdout)
    }
}

fn describe(args: &[OsString]) -> String {
    let mut command = String::from("zbox");
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}

fn allocation_args(subcommand: &str, allocation_id: &str) -> Vec<OsString> {
    vec![
        subcommand.into(),
        "--allocation".into(),
        allocation_id.into(),
    ]
}

fn operation_args(allocation_id: &str, op: &FileOperation) -> Vec<OsString> {
    let mut args = allocation_args(op.label(), allocation_id);
    match op {
        FileOperation::Upload { local, remote } | FileOperation::Update { local, remote } => {
            args.extend([
                "--localpath".into(),
                local.into(),
                "--remotepath".into(),
                remote.into(),
            ]);
        }
        FileOperation::Delete { remote } => {
            args.extend(["--remotepath".into(), remote.into()]);
        }
        FileOperation::Rename { remote, new_name } => {
            args.extend([
                "--remotepath".into(),
                remote.into(),
                "--destname".into(),
                new_name.into(),
            ]);
        }
        FileOperation::Move { remote, dest_dir } | FileOperation::Copy { remote, dest_dir } => {
            args.extend([
                "--remotepath".into(),
                remote.into(),
                "--destpath".into(),
                dest_dir.into(),
            ]);
        }
    }
    args
}

fn parse_listing(
    command: &str,
    allocation_id: &str,
    remote_dir: &str,
    stdout: &[u8],
) -> Result<ListResult, SdkError> {
    let raw: RawListing = serde_json::from_slice(stdout).map_err(|source| SdkError::Decode {
        command: command.to_owned(),
        source,
    })?;
    Ok(match raw {
        RawListing::Entries(list) => ListResult {
            allocation_id: allocation_id.to_owned(),
            path: remote_dir.to_owned(),
            list,
        },
        RawListing::Wrapped(result) => result,
    })
}

#[async_trait]
impl StorageSdk for ZboxCli {
    async fn list_files(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        remote_dir: &str,
    ) -> Result<ListResult, SdkError> {
        let mut args = allocation_args("list", allocation_id);
        args.extend(["--remotepath".into(), remote_dir.into(), "--json".into()]);
        let command = describe(&args);
        let stdout = self.run(wallet, args).await?;
        parse_listing(&command, allocation_id, remote_dir, &stdout)
    }

    #[instrument(skip_all, fields(allocation_id = %allocation_id, ops = ops.len()))]
    async fn multi_operation(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        ops: &[FileOperation],
        repair_list: Option<&[String]>,
    ) -> Result<(), SdkError> {
        ensure_batch(ops)?;
        if repair_list.is_some() {
            return Err(SdkError::Unsupported("per-blobber repair lists"));
        }

        let mut committed = 0;
        let mut outcome = Ok(());
        for op in ops {
            debug!(op = op.label(), remote = op.remote(), "applying file operation");
            if let Err(err) = self.run(wallet, operation_args(allocation_id, op)).await {
                outcome = Err(err);
                break;
            }
            committed += 1;
        }

        // A failed batch still leaves its earlier operations committed.
        if committed > 0 {
            self.batches().insert(allocation_id.to_owned(), committed);
        }
        if outcome.is_ok() {
            info!(commits = committed, "file operations applied");
        }
        outcome
    }

    async fn download(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), SdkError> {
        let mut args = allocation_args("download", allocation_id);
        args.extend([
            "--remotepath".into(),
            remote_path.into(),
            "--localpath".into(),
            local_path.into(),
        ]);
        self.run(wallet, args).await.map(|_| ())
    }

    async fn repair_allocation(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
        remote_root: &str,
    ) -> Result<(), SdkError> {
        let scratch = self.config_dir.path().join("repair").join(allocation_id);
        fs::create_dir_all(&scratch).map_err(SdkError::Wallet)?;

        let mut args = allocation_args("start-repair", allocation_id);
        args.extend([
            "--repairpath".into(),
            remote_root.into(),
            "--rootpath".into(),
            scratch.into(),
        ]);
        self.run(wallet, args).await.map(|_| ())
    }

    #[instrument(skip_all, fields(allocation_id = %allocation_id))]
    async fn rollback_allocation(
        &self,
        wallet: &Wallet,
        allocation_id: &str,
    ) -> Result<(), SdkError> {
        let commits = self.pending_commits(allocation_id).unwrap_or(1);
        for undone in 0..commits {
            if let Err(err) = self
                .run(wallet, allocation_args("rollback", allocation_id))
                .await
            {
                self.record_remaining(allocation_id, commits - undone);
                return Err(err);
            }
        }
        self.batches().remove(allocation_id);
        info!(commits, "allocation rolled back");
        Ok(())
    }
}
