use std::{env, path::PathBuf};

#[must_use]
pub fn slow_test_env() -> bool {
    env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn system_test_config() -> Option<PathBuf> {
    env::var("SYSTEM_TEST_CONFIG").ok().map(PathBuf::from)
}

#[must_use]
pub fn system_test_smoke_only() -> bool {
    env::var("SYSTEM_TEST_SMOKE_ONLY")
        .is_ok_and(|val| val == "1" || val.eq_ignore_ascii_case("true"))
}

#[must_use]
pub fn system_test_filter() -> Option<String> {
    env::var("SYSTEM_TEST_FILTER")
        .ok()
        .filter(|val| !val.trim().is_empty())
}

#[must_use]
pub fn system_test_default_timeout_secs() -> Option<u64> {
    env::var("SYSTEM_TEST_DEFAULT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
}

#[must_use]
pub fn system_test_sdk_bin() -> Option<PathBuf> {
    env::var_os("SYSTEM_TEST_SDK_BIN").map(PathBuf::from)
}

#[must_use]
pub fn system_test_wallet_pool() -> Option<PathBuf> {
    env::var_os("SYSTEM_TEST_WALLET_POOL").map(PathBuf::from)
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}
