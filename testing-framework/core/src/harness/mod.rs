//! Case lifecycle for system tests.
//!
//! A [`Suite`] owns one root case. Bodies receive a [`SystemTest`] handle and
//! register nested cases through it:
//!
//! - `run` / `run_sequential` execute a case to completion before returning,
//!   so sequential siblings run in registration order.
//! - `run_parallel` queues a case; queued siblings start together once the
//!   registering body returns and the parent finishes after all of them.
//! - `run_with_timeout` bounds a case; on expiry it is reported as timed out
//!   and its task is aborted at the next await point.
//!
//! Panics inside a body are caught at the case boundary and reported as
//! [`CaseOutcome::Panicked`] for that case only.

mod case;
mod handle;
mod report;
mod runner;
mod selection;

use std::{future::Future, sync::Arc, time::Duration};

pub use case::{CaseOutcome, CaseResult, CaseState, ExecutionMode, Failure, Halt};
pub use handle::SystemTest;
pub use report::{CaseReport, SuiteReport};
use testing_framework_config::timeouts::default_test_timeout;
use testing_framework_env as tf_env;
use tracing::info;

use self::{
    case::CaseInner,
    runner::{boxed_body, execute},
    selection::SuiteShared,
};

/// Configuration of one suite run.
#[derive(Clone, Debug)]
pub struct Suite {
    name: String,
    smoke_only: bool,
    filter: Option<String>,
    default_timeout: Option<Duration>,
}

impl Suite {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            smoke_only: false,
            filter: None,
            default_timeout: None,
        }
    }

    /// Suite configured from `SYSTEM_TEST_SMOKE_ONLY`, `SYSTEM_TEST_FILTER`
    /// and the default case timeout.
    #[must_use]
    pub fn from_env(name: impl Into<String>) -> Self {
        Self::new(name)
            .smoke_only(tf_env::system_test_smoke_only())
            .with_filter(tf_env::system_test_filter())
            .with_default_timeout(Some(default_test_timeout()))
    }

    #[must_use]
    pub const fn smoke_only(mut self, enabled: bool) -> Self {
        self.smoke_only = enabled;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Bound applied to every nested case that has no explicit timeout. The
    /// root case itself is never bounded.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the root case and collects every case report.
    pub async fn run<F, Fut>(self, body: F) -> SuiteReport
    where
        F: FnOnce(SystemTest) -> Fut + Send + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        info!(
            suite = %self.name,
            smoke_only = self.smoke_only,
            filter = self.filter.as_deref().unwrap_or_default(),
            "starting suite"
        );

        let shared = Arc::new(SuiteShared::new(
            self.smoke_only,
            self.filter,
            self.default_timeout,
        ));
        let root = SystemTest::from_inner(Arc::new(CaseInner::new(
            self.name.clone(),
            0,
            ExecutionMode::Sequential,
            None,
            Arc::clone(&shared),
        )));

        execute(root, boxed_body(body)).await;

        let report = SuiteReport {
            suite: self.name,
            cases: shared.take_reports(),
            smoke_tests: shared.smoke_tests(),
        };
        info!(
            suite = %report.suite,
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "suite finished"
        );
        report
    }
}
