use std::{env, path::PathBuf};

use testing_framework_config::SdkConfig;
use testing_framework_env as tf_env;
use tracing::{debug, info};

pub const SDK_BINARY_ENV: &str = "SYSTEM_TEST_SDK_BIN";

/// Locate the storage CLI: env override, then the configured path if it
/// exists, then a lookup of the configured name on `PATH`.
pub fn resolve_sdk_binary(config: &SdkConfig) -> PathBuf {
    if let Some(resolved) = tf_env::system_test_sdk_bin() {
        info!(
            env = SDK_BINARY_ENV,
            path = %resolved.display(),
            "resolved sdk binary from env override"
        );
        return resolved;
    }

    if config.binary.components().count() > 1 && config.binary.is_file() {
        info!(path = %config.binary.display(), "resolved sdk binary from config");
        return config.binary.clone();
    }

    if let Some(path) = config
        .binary
        .to_str()
        .and_then(which_on_path)
    {
        info!(path = %path.display(), "resolved sdk binary from PATH");
        return path;
    }

    debug!(
        path = %config.binary.display(),
        "falling back to configured sdk binary"
    );
    config.binary.clone()
}

fn which_on_path(bin: &str) -> Option<PathBuf> {
    let path_env = env::var_os("PATH")?;
    env::split_paths(&path_env)
        .map(|p| p.join(bin))
        .find(|candidate| candidate.is_file())
}
