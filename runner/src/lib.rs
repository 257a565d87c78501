//! Command-line entry point that runs the scenario groups as one suite.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::Parser;
use testing_framework_config::{NetworkConfig, constants::DEFAULT_CONFIG_PATH};
use testing_framework_core::{
    adjust_timeout,
    harness::{Suite, SuiteReport},
};
use testing_framework_workflows::{Network, all_groups, register_groups};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SUITE_NAME: &str = "system";

#[derive(Parser, Debug)]
#[command(about = "Runs system test scenarios against a deployed storage network")]
pub struct Args {
    /// Network description (YAML).
    #[arg(long, env = "SYSTEM_TEST_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Run only the cases marked as smoke tests.
    #[arg(long)]
    pub smoke: bool,
    /// Substring matched against each level of a case's full name.
    #[arg(long)]
    pub filter: Option<String>,
    /// Scenario group to run; repeat for several. Runs every group when
    /// omitted.
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,
}

/// Installs the fmt subscriber, honoring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Rejects group names no scenario module registers.
pub fn check_groups(groups: &[String]) -> anyhow::Result<()> {
    let known: Vec<&str> = all_groups().into_iter().map(|(name, _)| name).collect();
    let unknown: Vec<&String> = groups
        .iter()
        .filter(|group| !known.contains(&group.as_str()))
        .collect();
    if !unknown.is_empty() {
        bail!("unknown groups {unknown:?}; known groups are {known:?}");
    }
    Ok(())
}

fn load_config(path: &PathBuf) -> anyhow::Result<NetworkConfig> {
    let mut config = NetworkConfig::load(path)
        .with_context(|| format!("failed to load network config from {}", path.display()))?;
    config.apply_env_overrides();
    config.validate().context("invalid network config")?;
    Ok(config)
}

/// Loads the config, connects to the network and runs the selected groups.
pub async fn run(args: Args) -> anyhow::Result<SuiteReport> {
    check_groups(&args.groups)?;
    let config = load_config(&args.config)?;
    let case_timeout = adjust_timeout(config.default_test_timeout);

    let mut suite = Suite::from_env(SUITE_NAME).with_default_timeout(Some(case_timeout));
    if args.smoke {
        suite = suite.smoke_only(true);
    }
    if args.filter.is_some() {
        suite = suite.with_filter(args.filter);
    }

    let network = Arc::new(
        Network::connect(config)
            .await
            .context("failed to connect to the network")?,
    );
    info!(groups = ?args.groups, "running scenario groups");

    let groups = args.groups;
    let report = suite
        .run(move |t| async move {
            register_groups(&t, &network, &groups);
            Ok(())
        })
        .await;
    Ok(report)
}
