use std::{fmt, future::Future, sync::Arc, time::Duration};

use super::{
    case::{CaseInner, CaseOutcome, CaseResult, CaseState, ExecutionMode, Failure, Halt},
    runner::{PendingCase, boxed_body, execute},
};

/// Handle passed into every case body.
///
/// Registers nested cases, records assertions, and ends the body early
/// through [`Halt`] values returned with `?` or `return Err(..)`.
#[derive(Clone)]
pub struct SystemTest {
    pub(crate) inner: Arc<CaseInner>,
}

impl fmt::Debug for SystemTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemTest")
            .field("name", &self.inner.name)
            .field("mode", &self.inner.mode)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl SystemTest {
    pub(crate) const fn from_inner(inner: Arc<CaseInner>) -> Self {
        Self { inner }
    }

    /// Full name, `/`-separated from the suite root.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn state(&self) -> CaseState {
        self.inner.state()
    }

    /// Whether any failure was recorded so far.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.inner.has_failed()
    }

    fn child(&self, name: &str, mode: ExecutionMode, timeout: Option<Duration>) -> Self {
        let full_name = self.inner.child_name(name);
        let timeout = timeout.or(self.inner.suite.default_timeout);
        let child = Arc::new(CaseInner::new(
            full_name,
            self.inner.depth + 1,
            mode,
            timeout,
            Arc::clone(&self.inner.suite),
        ));
        self.inner.adopt(Arc::clone(&child));
        Self::from_inner(child)
    }

    /// Runs a nested case to completion before returning its outcome.
    pub async fn run<F, Fut>(&self, name: impl AsRef<str>, body: F) -> CaseOutcome
    where
        F: FnOnce(Self) -> Fut + Send + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        let child = self.child(name.as_ref(), ExecutionMode::Sequential, None);
        execute(child, boxed_body(body)).await
    }

    /// Same as [`Self::run`]; spells out that later steps depend on this one.
    pub async fn run_sequential<F, Fut>(&self, name: impl AsRef<str>, body: F) -> CaseOutcome
    where
        F: FnOnce(Self) -> Fut + Send + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.run(name, body).await
    }

    /// Queues a case that runs concurrently with its parallel siblings once
    /// the current body returns. The current case completes only after all
    /// of them finished.
    pub fn run_parallel<F, Fut>(&self, name: impl AsRef<str>, body: F)
    where
        F: FnOnce(Self) -> Fut + Send + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        let child = self.child(name.as_ref(), ExecutionMode::Parallel, None);
        self.inner.push_pending(PendingCase {
            case: child,
            body: boxed_body(body),
        });
    }

    /// Runs a nested case bounded by `limit`. When the limit elapses the case
    /// is reported as timed out and the harness moves on.
    pub async fn run_with_timeout<F, Fut>(
        &self,
        name: impl AsRef<str>,
        limit: Duration,
        body: F,
    ) -> CaseOutcome
    where
        F: FnOnce(Self) -> Fut + Send + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        let child = self.child(name.as_ref(), ExecutionMode::Sequential, Some(limit));
        execute(child, boxed_body(body)).await
    }

    /// Tags cases as members of the smoke subset. Names are resolved relative
    /// to this case; marking the same name twice has no effect.
    pub fn mark_smoke<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.inner
                .suite
                .mark_smoke(format!("{}/{}", self.inner.name, name.as_ref()));
        }
    }

    /// Smoke-tagged full names of the whole suite, each listed once.
    #[must_use]
    pub fn smoke_tests(&self) -> Vec<String> {
        self.inner.suite.smoke_tests()
    }

    /// Ends the case as skipped when returned from the body.
    pub fn skip(&self, reason: impl Into<String>) -> Halt {
        Halt::skip(reason)
    }

    pub fn log(&self, message: impl Into<String>) {
        self.inner.record_log(message.into());
    }

    /// Records a non-fatal failure; the body keeps running.
    #[track_caller]
    pub fn fail(&self, message: impl Into<String>) {
        self.inner.record_failure(Failure::here(message));
    }

    /// Builds a fatal failure. Return it to abort the rest of the body.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) -> Halt {
        Halt::fatal(message)
    }

    #[track_caller]
    pub fn check(&self, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            self.fail(message);
        }
        condition
    }

    #[track_caller]
    pub fn check_eq<T>(&self, actual: T, expected: T, message: impl fmt::Display) -> bool
    where
        T: PartialEq + fmt::Debug,
    {
        if actual == expected {
            return true;
        }
        self.fail(format!(
            "{message}: expected {expected:?}, actual {actual:?}"
        ));
        false
    }

    #[track_caller]
    pub fn require(&self, condition: bool, message: impl Into<String>) -> CaseResult {
        if condition {
            Ok(())
        } else {
            Err(Halt::fatal(message))
        }
    }

    #[track_caller]
    pub fn require_eq<T>(&self, actual: T, expected: T, message: impl fmt::Display) -> CaseResult
    where
        T: PartialEq + fmt::Debug,
    {
        if actual == expected {
            Ok(())
        } else {
            Err(Halt::fatal(format!(
                "{message}: expected {expected:?}, actual {actual:?}"
            )))
        }
    }

    /// Unwraps a remote call result, failing fatally with `context` and the
    /// error otherwise.
    #[track_caller]
    pub fn require_ok<T, E>(&self, result: Result<T, E>, context: impl fmt::Display) -> Result<T, Halt>
    where
        E: fmt::Display,
    {
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(Halt::fatal(format!("{context}: {err}"))),
        }
    }

    /// Expects a call to fail, e.g. in negative scenarios.
    #[track_caller]
    pub fn require_err<T, E>(&self, result: Result<T, E>, context: impl fmt::Display) -> Result<E, Halt>
    where
        T: fmt::Debug,
    {
        match result {
            Ok(value) => Err(Halt::fatal(format!(
                "{context}: expected an error, got {value:?}"
            ))),
            Err(err) => Ok(err),
        }
    }

    #[track_caller]
    pub fn require_some<T>(&self, value: Option<T>, message: impl Into<String>) -> Result<T, Halt> {
        match value {
            Some(value) => Ok(value),
            None => Err(Halt::fatal(message)),
        }
    }
}
