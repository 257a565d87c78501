//! Scenario groups against a deployed storage network.
//!
//! The network is described by the YAML file at `SYSTEM_TEST_CONFIG`
//! (default `config/system_test.yaml`). Run with:
//!
//! ```text
//! SYSTEM_TEST_CONFIG=config/system_test.yaml cargo test -p tests-system -- --ignored
//! ```
//!
//! `SYSTEM_TEST_SMOKE_ONLY=true` restricts every group to its smoke cases and
//! `SYSTEM_TEST_FILTER` narrows the run further by case name.

use std::sync::Arc;

use anyhow::{Context as _, ensure};
use serial_test::serial;
use testing_framework_config::NetworkConfig;
use testing_framework_core::{adjust_timeout, harness::Suite};
use testing_framework_workflows::{Network, register_groups};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn run_group(group: &str) -> anyhow::Result<()> {
    init_tracing();
    let config = NetworkConfig::from_env().context("loading network config")?;
    let case_timeout = adjust_timeout(config.default_test_timeout);
    let network = Arc::new(
        Network::connect(config)
            .await
            .context("connecting to the network")?,
    );

    let selected = vec![group.to_owned()];
    let report = Suite::from_env(format!("system-{group}"))
        .with_default_timeout(Some(case_timeout))
        .run(move |t| async move {
            let unknown = register_groups(&t, &network, &selected);
            t.require(unknown.is_empty(), format!("unknown groups {unknown:?}"))
        })
        .await;

    println!("{report}");
    ensure!(
        report.is_success(),
        "{} of {} cases failed",
        report.failed(),
        report.cases.len()
    );
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires a deployed storage network"]
async fn wallet_registration() -> anyhow::Result<()> {
    run_group("wallet").await
}

#[tokio::test]
#[serial]
#[ignore = "requires a deployed storage network"]
async fn faucet_pours() -> anyhow::Result<()> {
    run_group("faucet").await
}

#[tokio::test]
#[serial]
#[ignore = "requires a deployed storage network"]
async fn allocation_lifecycle() -> anyhow::Result<()> {
    run_group("allocation").await
}

#[tokio::test]
#[serial]
#[ignore = "requires a deployed storage network"]
async fn multi_operation_commits() -> anyhow::Result<()> {
    run_group("file_ops").await
}

#[tokio::test]
#[serial]
#[ignore = "requires a deployed storage network"]
async fn allocation_repair() -> anyhow::Result<()> {
    run_group("repair").await
}

#[tokio::test]
#[serial]
#[ignore = "requires a deployed storage network"]
async fn zs3_gateway() -> anyhow::Result<()> {
    run_group("zs3").await
}
