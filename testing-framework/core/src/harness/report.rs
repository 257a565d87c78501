use std::{fmt, time::Duration};

use super::case::{CaseOutcome, ExecutionMode, Failure};

/// Final record of one case.
#[derive(Clone, Debug)]
pub struct CaseReport {
    pub name: String,
    pub mode: ExecutionMode,
    pub timeout: Option<Duration>,
    pub outcome: CaseOutcome,
    pub failures: Vec<Failure>,
    pub logs: Vec<String>,
    pub skip_reason: Option<String>,
    pub duration: Duration,
    pub smoke: bool,
}

/// Every case of a suite run, in completion order.
#[derive(Clone, Debug)]
pub struct SuiteReport {
    pub suite: String,
    pub cases: Vec<CaseReport>,
    pub smoke_tests: Vec<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|case| case.name == name)
    }

    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<CaseOutcome> {
        self.case(name).map(|case| case.outcome)
    }

    #[must_use]
    pub fn count(&self, outcome: CaseOutcome) -> usize {
        self.cases
            .iter()
            .filter(|case| case.outcome == outcome)
            .count()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(CaseOutcome::Passed)
    }

    /// Failed cases of every kind: assertion failures, timeouts and panics.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases
            .iter()
            .filter(|case| case.outcome.is_failure())
            .count()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(CaseOutcome::Skipped)
    }

    /// Skipped cases count neither as passed nor as failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|case| case.outcome.is_failure())
    }

    /// Panics with the summary when any case failed. Used to surface a suite
    /// run as a single `cargo test` result.
    #[track_caller]
    pub fn assert_success(&self) {
        assert!(self.is_success(), "{self}");
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "suite {}: {} passed, {} failed ({} timed out, {} panicked), {} skipped",
            self.suite,
            self.passed(),
            self.failed(),
            self.count(CaseOutcome::TimedOut),
            self.count(CaseOutcome::Panicked),
            self.skipped()
        )?;

        for case in self.failures() {
            writeln!(f, "--- {}: {} ({:.2?})", case.outcome, case.name, case.duration)?;
            for failure in &case.failures {
                writeln!(f, "    {failure}")?;
            }
            for line in &case.logs {
                writeln!(f, "    log: {line}")?;
            }
        }

        Ok(())
    }
}
