//! Multi-operation file commits and rollback.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use testing_framework_core::{
    crypto::KeyPair,
    harness::{CaseResult, SystemTest},
    sdk::{FileOperation, SdkError},
};
use tracing::debug;

use super::util::{
    Shards, create_allocation, funded_wallet, remote_path, unique_suffix, wait_for_file_count,
    write_local_files, write_random_file,
};
use crate::Network;

const UPLOADED_FILES: usize = 4;
const DELETED_FILES: usize = 2;

pub fn multi_operation_tests(t: &SystemTest, network: Arc<Network>) {
    t.mark_smoke(["upload_delete_rollback"]);

    let shared = Arc::clone(&network);
    t.run_parallel("upload_delete_rollback", move |t| {
        upload_delete_rollback(t, shared)
    });
    let shared = Arc::clone(&network);
    t.run_parallel("rename_move_copy_update", move |t| {
        rename_move_copy_update(t, shared)
    });
    let shared = Arc::clone(&network);
    t.run_parallel("download_matches_upload", move |t| {
        download_matches_upload(t, shared)
    });
    t.run_parallel("empty_batch_rejected", move |t| empty_batch_rejected(t, network));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn uploads(remote_dir: &str, locals: &[PathBuf]) -> Vec<FileOperation> {
    locals
        .iter()
        .map(|local| FileOperation::Upload {
            local: local.clone(),
            remote: remote_path(remote_dir, &file_name(local)),
        })
        .collect()
}

/// Uploads a batch, deletes part of it in a second batch, then rolls the
/// allocation back to the commit before the delete.
async fn upload_delete_rollback(t: SystemTest, network: Arc<Network>) -> CaseResult {
    const REMOTE_DIR: &str = "/rollback";

    let wallet = funded_wallet(&t, &network).await?;
    let allocation = create_allocation(&t, &network, &wallet, Shards::TWO_TWO).await?;
    let local_dir = tempfile::tempdir()?;
    let locals = write_local_files(local_dir.path(), UPLOADED_FILES).await?;

    let batch = uploads(REMOTE_DIR, &locals);
    t.require_ok(
        network
            .sdk
            .multi_operation(&wallet, &allocation.id, &batch, None)
            .await,
        "upload batch",
    )?;
    let listing = wait_for_file_count(
        &t,
        &network,
        &wallet,
        &allocation.id,
        REMOTE_DIR,
        UPLOADED_FILES,
    )
    .await?;
    debug!(paths = ?listing.paths(), "uploaded");

    let deletes: Vec<FileOperation> = batch
        .iter()
        .take(DELETED_FILES)
        .map(|op| FileOperation::Delete {
            remote: op.remote().to_owned(),
        })
        .collect();
    t.require_ok(
        network
            .sdk
            .multi_operation(&wallet, &allocation.id, &deletes, None)
            .await,
        "delete batch",
    )?;
    let remaining = wait_for_file_count(
        &t,
        &network,
        &wallet,
        &allocation.id,
        REMOTE_DIR,
        UPLOADED_FILES - DELETED_FILES,
    )
    .await?;
    for op in &deletes {
        t.check(
            !remaining.paths().contains(&op.remote()),
            format!("{} still listed after delete", op.remote()),
        );
    }

    t.require_ok(
        network
            .sdk
            .rollback_allocation(&wallet, &allocation.id)
            .await,
        "rollback",
    )?;
    let restored = wait_for_file_count(
        &t,
        &network,
        &wallet,
        &allocation.id,
        REMOTE_DIR,
        UPLOADED_FILES,
    )
    .await?;
    let mut restored_paths = restored.paths();
    restored_paths.sort_unstable();
    let mut uploaded_paths: Vec<&str> = batch.iter().map(FileOperation::remote).collect();
    uploaded_paths.sort_unstable();
    t.require_eq(restored_paths, uploaded_paths, "paths after rollback")
}

async fn rename_move_copy_update(t: SystemTest, network: Arc<Network>) -> CaseResult {
    const SOURCE_DIR: &str = "/source";
    const MOVED_DIR: &str = "/moved";
    const COPIED_DIR: &str = "/copied";

    let wallet = funded_wallet(&t, &network).await?;
    let allocation = create_allocation(&t, &network, &wallet, Shards::TWO_TWO).await?;
    let local_dir = tempfile::tempdir()?;
    let locals = write_local_files(local_dir.path(), 3).await?;
    let batch = uploads(SOURCE_DIR, &locals);

    t.require_ok(
        network
            .sdk
            .multi_operation(&wallet, &allocation.id, &batch, None)
            .await,
        "upload batch",
    )?;
    wait_for_file_count(&t, &network, &wallet, &allocation.id, SOURCE_DIR, 3).await?;

    let [renamed, moved, copied] = [0, 1, 2].map(|index| batch[index].remote().to_owned());
    let updated_local = local_dir.path().join("updated.txt");
    write_random_file(&updated_local).await?;
    let changes = vec![
        FileOperation::Rename {
            remote: renamed.clone(),
            new_name: "renamed.txt".to_owned(),
        },
        FileOperation::Move {
            remote: moved.clone(),
            dest_dir: MOVED_DIR.to_owned(),
        },
        FileOperation::Copy {
            remote: copied.clone(),
            dest_dir: COPIED_DIR.to_owned(),
        },
        FileOperation::Update {
            local: updated_local,
            remote: copied.clone(),
        },
    ];
    t.require_ok(
        network
            .sdk
            .multi_operation(&wallet, &allocation.id, &changes, None)
            .await,
        "rename/move/copy/update batch",
    )?;

    let source = wait_for_file_count(&t, &network, &wallet, &allocation.id, SOURCE_DIR, 2).await?;
    let mut source_paths = source.paths();
    source_paths.sort_unstable();
    let mut expected = vec![remote_path(SOURCE_DIR, "renamed.txt"), copied.clone()];
    expected.sort_unstable();
    t.check_eq(
        source_paths,
        expected.iter().map(String::as_str).collect(),
        "source directory",
    );

    let moved_listing =
        wait_for_file_count(&t, &network, &wallet, &allocation.id, MOVED_DIR, 1).await?;
    t.check_eq(
        moved_listing.paths(),
        vec![remote_path(MOVED_DIR, &file_name(Path::new(&moved))).as_str()],
        "moved directory",
    );

    let copied_listing =
        wait_for_file_count(&t, &network, &wallet, &allocation.id, COPIED_DIR, 1).await?;
    t.check_eq(
        copied_listing.paths(),
        vec![remote_path(COPIED_DIR, &file_name(Path::new(&copied))).as_str()],
        "copied directory",
    );
    Ok(())
}

async fn download_matches_upload(t: SystemTest, network: Arc<Network>) -> CaseResult {
    const REMOTE_DIR: &str = "/download";

    let wallet = funded_wallet(&t, &network).await?;
    let allocation = create_allocation(&t, &network, &wallet, Shards::TWO_TWO).await?;
    let local_dir = tempfile::tempdir()?;
    let locals = write_local_files(local_dir.path(), 1).await?;
    let batch = uploads(REMOTE_DIR, &locals);

    t.require_ok(
        network
            .sdk
            .multi_operation(&wallet, &allocation.id, &batch, None)
            .await,
        "upload",
    )?;
    wait_for_file_count(&t, &network, &wallet, &allocation.id, REMOTE_DIR, 1).await?;

    let target = local_dir.path().join("downloaded.txt");
    t.require_ok(
        network
            .sdk
            .download(&wallet, &allocation.id, batch[0].remote(), &target)
            .await,
        "download",
    )?;

    let original = tokio::fs::read(&locals[0]).await?;
    let downloaded = tokio::fs::read(&target).await?;
    t.require(
        original == downloaded,
        format!(
            "downloaded {} bytes differ from the {} uploaded",
            downloaded.len(),
            original.len()
        ),
    )
}

/// Empty batches are refused before anything reaches the network, so neither
/// the wallet nor the allocation has to exist.
async fn empty_batch_rejected(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = KeyPair::generate().wallet();
    let allocation_id = format!("unallocated-{}", unique_suffix());

    let err = t.require_err(
        network
            .sdk
            .multi_operation(&wallet, &allocation_id, &[], None)
            .await,
        "empty batch",
    )?;
    t.require(
        matches!(err, SdkError::EmptyBatch),
        format!("unexpected error for an empty batch: {err}"),
    )
}
