use std::sync::Arc;

use testing_framework_core::{
    harness::{CaseResult, SystemTest},
    sdk::{FileOperation, SdkError},
};

use super::util::{
    Shards, create_allocation, funded_wallet, remote_path, wait_for_file_count, write_local_files,
};
use crate::Network;

const REMOTE_DIR: &str = "/repair";

pub fn repair_tests(t: &SystemTest, network: Arc<Network>) {
    t.run_parallel("repair_after_partial_upload", move |t| {
        repair_after_partial_upload(t, network)
    });
}

/// Uploads to every blobber but one, then repairs the allocation so the
/// skipped blobber catches up. Backends that cannot target blobbers upload to
/// all of them and the repair has nothing to heal.
async fn repair_after_partial_upload(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let wallet = funded_wallet(&t, &network).await?;
    let allocation = create_allocation(&t, &network, &wallet, Shards::TWO_TWO).await?;
    let blobbers = allocation.blobber_ids();
    let (skipped, repair_list) = t.require_some(
        blobbers.split_last(),
        format!("allocation {} has no blobbers", allocation.id),
    )?;

    let local_dir = tempfile::tempdir()?;
    let locals = write_local_files(local_dir.path(), 1).await?;
    let upload = FileOperation::Upload {
        local: locals[0].clone(),
        remote: remote_path(REMOTE_DIR, "partial.txt"),
    };

    match network
        .sdk
        .multi_operation(
            &wallet,
            &allocation.id,
            std::slice::from_ref(&upload),
            Some(repair_list),
        )
        .await
    {
        Ok(()) => t.log(format!("left out blobber {skipped}")),
        Err(SdkError::Unsupported(what)) => {
            t.log(format!("partial upload skipped, storage sdk cannot target {what}"));
            t.require_ok(
                network
                    .sdk
                    .multi_operation(&wallet, &allocation.id, &[upload], None)
                    .await,
                "full upload",
            )?;
        }
        Err(err) => return Err(t.fatal(format!("partial upload: {err}"))),
    }
    let before = wait_for_file_count(&t, &network, &wallet, &allocation.id, REMOTE_DIR, 1).await?;

    t.require_ok(
        network
            .sdk
            .repair_allocation(&wallet, &allocation.id, "/")
            .await,
        "repair allocation",
    )?;

    let after = wait_for_file_count(&t, &network, &wallet, &allocation.id, REMOTE_DIR, 1).await?;
    t.require_eq(after.paths(), before.paths(), "listing after repair")
}
