use std::time::Duration;

use testing_framework_env as tf_env;

use crate::{adjust_timeout, constants::DEFAULT_TEST_TIMEOUT};

/// Default per-case timeout, honoring `SYSTEM_TEST_DEFAULT_TIMEOUT_SECS` and
/// the slow-environment multiplier.
#[must_use]
pub fn default_test_timeout() -> Duration {
    let base = tf_env::system_test_default_timeout_secs()
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TEST_TIMEOUT);
    adjust_timeout(base)
}
