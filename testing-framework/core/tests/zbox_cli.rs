#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
    time::Duration,
};

use testing_framework_config::SdkConfig;
use testing_framework_core::{
    crypto::KeyPair,
    sdk::{FileOperation, SdkError, StorageSdk as _, ZboxCli},
};
use testing_framework_env as tf_env;

/// Stand-in for the storage CLI: logs its arguments and answers per
/// subcommand.
fn write_fake_cli(dir: &Path) -> (PathBuf, PathBuf) {
    let log = dir.join("calls.log");
    let script = dir.join("zbox");
    let body = format!(
        r#"#!/bin/sh
echo "$@" >> "{log}"
case "$1" in
  list) echo '[{{"path":"/docs/a.txt","name":"a.txt","type":"f","size":3}}]' ;;
  rollback) echo "rollback failed" >&2; exit 3 ;;
  download) sleep 30 ;;
  *) exit 0 ;;
esac
"#,
        log = log.display()
    );
    fs::write(&script, body).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    (script, log)
}

// Kept as one test: the fake binary is written once so no concurrent fork
// can hold it open for writing while it is executed.
#[tokio::test]
async fn cli_backend_maps_operations_and_failures() {
    if tf_env::system_test_sdk_bin().is_some() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let (script, log) = write_fake_cli(dir.path());
    let cli = ZboxCli::new(&SdkConfig {
        binary: script,
        config_dir: None,
        command_timeout: Duration::from_secs(1),
    })
    .unwrap();
    let wallet = KeyPair::generate().wallet();

    let listing = cli.list_files(&wallet, "alloc", "/docs").await.unwrap();
    assert_eq!(listing.allocation_id, "alloc");
    assert_eq!(listing.path, "/docs");
    assert_eq!(listing.paths(), vec!["/docs/a.txt"]);

    let wallet_file = cli.config_dir().join(format!("{}.json", wallet.client_id));
    let stored: serde_json::Value =
        serde_json::from_slice(&fs::read(&wallet_file).unwrap()).unwrap();
    assert_eq!(stored["client_id"], wallet.client_id.as_str());

    cli.multi_operation(
        &wallet,
        "alloc",
        &[
            FileOperation::Upload {
                local: dir.path().join("a.txt"),
                remote: "/docs/b.txt".to_owned(),
            },
            FileOperation::Delete {
                remote: "/docs/a.txt".to_owned(),
            },
        ],
        None,
    )
    .await
    .unwrap();

    let calls = fs::read_to_string(&log).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].starts_with("upload --allocation alloc --localpath"));
    assert!(calls[1].contains("--remotepath /docs/b.txt --wallet"));
    assert!(calls[2].starts_with("delete --allocation alloc --remotepath /docs/a.txt"));
    assert!(calls[2].contains(&format!("--configDir {}", cli.config_dir().display())));
    assert_eq!(cli.pending_commits("alloc"), Some(2));

    assert!(matches!(
        cli.multi_operation(&wallet, "alloc", &[], None).await,
        Err(SdkError::EmptyBatch)
    ));
    let repair_list = ["blobber-1".to_owned()];
    assert!(matches!(
        cli.multi_operation(
            &wallet,
            "alloc",
            &[FileOperation::Delete {
                remote: "/docs/b.txt".to_owned()
            }],
            Some(&repair_list),
        )
        .await,
        Err(SdkError::Unsupported(_))
    ));

    match cli.rollback_allocation(&wallet, "alloc").await {
        Err(SdkError::Command { status, stderr, .. }) => {
            assert_eq!(status, Some(3));
            assert_eq!(stderr, "rollback failed");
        }
        other => panic!("unexpected rollback result: {other:?}"),
    }
    // Nothing was undone, so the whole batch is still pending.
    assert_eq!(cli.pending_commits("alloc"), Some(2));

    let target = dir.path().join("out.txt");
    assert!(matches!(
        cli.download(&wallet, "alloc", "/docs/b.txt", &target).await,
        Err(SdkError::Timeout { .. })
    ));

    let missing = ZboxCli::new(&SdkConfig {
        binary: PathBuf::from("/nonexistent/zbox"),
        config_dir: None,
        command_timeout: Duration::from_secs(1),
    })
    .unwrap();
    assert!(matches!(
        missing.rollback_allocation(&wallet, "alloc").await,
        Err(SdkError::Spawn { .. })
    ));
}
