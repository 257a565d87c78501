use std::time::Duration;

/// Config file used when `SYSTEM_TEST_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/system_test.yaml";

/// Chain id of the default development network.
pub const DEFAULT_CHAIN_ID: &str =
    "0afc093ffb509f059c55478bc1a60351cef7b4e9c008a53a6cc8241ca8617dfe";

/// Name of the storage CLI resolved from `PATH` when no override is given.
pub const DEFAULT_SDK_BINARY: &str = "zbox";

/// Tokens poured by a single faucet call unless a scenario asks otherwise.
pub const DEFAULT_FAUCET_TOKENS: f64 = 1.0;

/// Upper bound for a single test case when nothing else is configured.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Interval between eventual-consistency probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for a submitted transaction to show up on the sharders.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for a single storage CLI invocation.
pub const DEFAULT_SDK_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
