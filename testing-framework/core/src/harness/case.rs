use std::{
    collections::HashMap,
    fmt,
    panic::Location,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use super::{
    report::CaseReport,
    runner::PendingCase,
    selection::SuiteShared,
};

/// Result every case body returns. `Err` ends the body early.
pub type CaseResult = Result<(), Halt>;

/// How a case is scheduled relative to its siblings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl ExecutionMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

/// Terminal outcome of a case.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseOutcome {
    Passed,
    Failed,
    Skipped,
    TimedOut,
    Panicked,
}

impl CaseOutcome {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Skipped => "SKIP",
            Self::TimedOut => "TIMEOUT",
            Self::Panicked => "PANIC",
        }
    }

    /// Whether the outcome counts against the suite.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::Panicked)
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of a case. `Finished` is terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseState {
    Registered,
    Running,
    Finished(CaseOutcome),
}

/// A recorded assertion failure.
#[derive(Clone, Debug)]
pub struct Failure {
    pub message: String,
    pub location: Option<&'static Location<'static>>,
}

impl Failure {
    #[must_use]
    #[track_caller]
    pub fn here(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Some(Location::caller()),
        }
    }

    #[must_use]
    pub fn unlocated(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{}:{}: {}",
                location.file(),
                location.line(),
                self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}

/// Early exit from a case body: a fatal failure or a skip.
///
/// Any `std::error::Error` converts into a fatal halt, so remote calls can be
/// propagated with `?` from inside a body.
#[derive(Debug)]
#[must_use = "a halt only takes effect when returned from the case body"]
pub struct Halt(pub(crate) HaltReason);

#[derive(Debug)]
pub(crate) enum HaltReason {
    Fatal(Failure),
    Skip(String),
}

impl Halt {
    #[track_caller]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self(HaltReason::Fatal(Failure::here(message)))
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self(HaltReason::Skip(reason.into()))
    }

    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self.0, HaltReason::Skip(_))
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            HaltReason::Fatal(failure) => write!(f, "fatal: {failure}"),
            HaltReason::Skip(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

impl<E> From<E> for Halt
where
    E: std::error::Error,
{
    #[track_caller]
    fn from(err: E) -> Self {
        Self(HaltReason::Fatal(Failure::here(err.to_string())))
    }
}

#[derive(Debug)]
pub(crate) struct CaseRecord {
    pub(crate) state: CaseState,
    pub(crate) failures: Vec<Failure>,
    pub(crate) logs: Vec<String>,
    pub(crate) skip_reason: Option<String>,
    pub(crate) panicked: bool,
    pub(crate) timed_out: bool,
    pub(crate) started: Option<Instant>,
}

impl CaseRecord {
    const fn new() -> Self {
        Self {
            state: CaseState::Registered,
            failures: Vec::new(),
            logs: Vec::new(),
            skip_reason: None,
            panicked: false,
            timed_out: false,
            started: None,
        }
    }

    const fn is_finished(&self) -> bool {
        matches!(self.state, CaseState::Finished(_))
    }

    fn resolve_outcome(&self) -> CaseOutcome {
        if self.panicked {
            CaseOutcome::Panicked
        } else if self.timed_out {
            CaseOutcome::TimedOut
        } else if !self.failures.is_empty() {
            CaseOutcome::Failed
        } else if self.skip_reason.is_some() {
            CaseOutcome::Skipped
        } else {
            CaseOutcome::Passed
        }
    }
}

pub(crate) struct CaseInner {
    pub(crate) name: String,
    /// Zero for the suite root.
    pub(crate) depth: usize,
    pub(crate) mode: ExecutionMode,
    pub(crate) timeout: Option<Duration>,
    pub(crate) suite: Arc<SuiteShared>,
    record: Mutex<CaseRecord>,
    child_names: Mutex<HashMap<String, usize>>,
    children: Mutex<Vec<Arc<CaseInner>>>,
    pending: Mutex<Vec<PendingCase>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking body must not take the bookkeeping down with it.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CaseInner {
    pub(crate) fn new(
        name: String,
        depth: usize,
        mode: ExecutionMode,
        timeout: Option<Duration>,
        suite: Arc<SuiteShared>,
    ) -> Self {
        Self {
            name,
            depth,
            mode,
            timeout,
            suite,
            record: Mutex::new(CaseRecord::new()),
            child_names: Mutex::new(HashMap::new()),
            children: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Full name for a new child, disambiguating repeated sibling names.
    pub(crate) fn child_name(&self, name: &str) -> String {
        let mut names = lock(&self.child_names);
        let seen = names.entry(name.to_owned()).or_insert(0);
        let unique = if *seen == 0 {
            format!("{}/{name}", self.name)
        } else {
            format!("{}/{name}#{:02}", self.name, *seen)
        };
        *seen += 1;
        unique
    }

    pub(crate) fn state(&self) -> CaseState {
        lock(&self.record).state
    }

    pub(crate) fn has_failed(&self) -> bool {
        let record = lock(&self.record);
        !record.failures.is_empty() || record.panicked || record.timed_out
    }

    pub(crate) fn start(&self) {
        let mut record = lock(&self.record);
        if record.state != CaseState::Registered {
            debug!(case = %self.name, state = ?record.state, "case already started");
            return;
        }
        record.state = CaseState::Running;
        record.started = Some(Instant::now());
        drop(record);
        info!(case = %self.name, mode = self.mode.label(), "=== RUN");
    }

    pub(crate) fn record_failure(&self, failure: Failure) {
        let mut record = lock(&self.record);
        if record.is_finished() {
            debug!(case = %self.name, %failure, "ignoring failure recorded after case finished");
            return;
        }
        warn!(case = %self.name, %failure, "assertion failed");
        record.failures.push(failure);
    }

    pub(crate) fn record_log(&self, message: String) {
        let mut record = lock(&self.record);
        if record.is_finished() {
            debug!(case = %self.name, message, "ignoring log recorded after case finished");
            return;
        }
        info!(case = %self.name, "{message}");
        record.logs.push(message);
    }

    pub(crate) fn record_skip(&self, reason: String) {
        let mut record = lock(&self.record);
        if !record.is_finished() && record.skip_reason.is_none() {
            record.skip_reason = Some(reason);
        }
    }

    pub(crate) fn record_panic(&self, message: String) {
        let mut record = lock(&self.record);
        if record.is_finished() {
            debug!(case = %self.name, message, "ignoring panic after case finished");
            return;
        }
        record.panicked = true;
        record
            .failures
            .push(Failure::unlocated(format!("panicked: {message}")));
    }

    pub(crate) fn record_timeout(&self, limit: Duration) {
        let mut record = lock(&self.record);
        if record.is_finished() {
            return;
        }
        record.timed_out = true;
        record.failures.push(Failure::unlocated(format!(
            "timed out after {limit:?}"
        )));
    }

    pub(crate) fn record_abort(&self) {
        let mut record = lock(&self.record);
        if record.is_finished() {
            return;
        }
        record.timed_out = true;
        record.failures.push(Failure::unlocated(
            "aborted because an enclosing case timed out",
        ));
    }

    pub(crate) fn adopt(&self, child: Arc<CaseInner>) {
        lock(&self.children).push(child);
    }

    /// Finalizes every unfinished descendant after this case's task was
    /// cancelled: queued parallel cases are skipped, running ones aborted.
    pub(crate) fn abandon_descendants(&self) {
        for pending in self.take_pending() {
            pending
                .case
                .inner
                .record_skip("enclosing case ended before parallel cases started".to_owned());
        }

        let children = lock(&self.children).clone();
        for child in children {
            child.abandon_descendants();
            match child.state() {
                CaseState::Finished(_) => continue,
                CaseState::Registered => {
                    child.record_skip("enclosing case ended before this case started".to_owned());
                }
                CaseState::Running => child.record_abort(),
            }
            child.finish();
        }
    }

    pub(crate) fn push_pending(&self, pending: PendingCase) {
        lock(&self.pending).push(pending);
    }

    pub(crate) fn take_pending(&self) -> Vec<PendingCase> {
        std::mem::take(&mut *lock(&self.pending))
    }

    /// Moves the case into its terminal state. Returns the outcome that was
    /// already recorded if the case finished earlier.
    pub(crate) fn finish(&self) -> CaseOutcome {
        let mut record = lock(&self.record);
        if let CaseState::Finished(outcome) = record.state {
            return outcome;
        }

        let outcome = record.resolve_outcome();
        record.state = CaseState::Finished(outcome);
        let duration = record
            .started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        let report = CaseReport {
            name: self.name.clone(),
            mode: self.mode,
            timeout: self.timeout,
            outcome,
            failures: record.failures.clone(),
            logs: record.logs.clone(),
            skip_reason: record.skip_reason.clone(),
            duration,
            smoke: self.suite.is_smoke(&self.name),
        };
        drop(record);

        match outcome {
            CaseOutcome::Passed => {
                info!(case = %self.name, duration_ms = duration.as_millis(), "--- PASS");
            }
            CaseOutcome::Skipped => info!(
                case = %self.name,
                reason = report.skip_reason.as_deref().unwrap_or_default(),
                "--- SKIP"
            ),
            _ => warn!(
                case = %self.name,
                outcome = outcome.label(),
                failures = report.failures.len(),
                duration_ms = duration.as_millis(),
                "--- {}",
                outcome.label()
            ),
        }

        self.suite.push_report(report);
        outcome
    }
}
