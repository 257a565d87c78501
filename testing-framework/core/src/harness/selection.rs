use std::{
    collections::BTreeSet,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use super::report::CaseReport;

pub(crate) const NOT_SMOKE_REASON: &str = "not a smoke test";
pub(crate) const FILTERED_REASON: &str = "does not match the case filter";

/// State shared by every case of one suite run.
#[derive(Debug)]
pub(crate) struct SuiteShared {
    pub(crate) smoke_only: bool,
    pub(crate) filter: Option<String>,
    pub(crate) default_timeout: Option<Duration>,
    smoke: Mutex<BTreeSet<String>>,
    reports: Mutex<Vec<CaseReport>>,
}

impl SuiteShared {
    pub(crate) fn new(
        smoke_only: bool,
        filter: Option<String>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            smoke_only,
            filter,
            default_timeout,
            smoke: Mutex::new(BTreeSet::new()),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn mark_smoke(&self, full_name: String) {
        self.smoke
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full_name);
    }

    pub(crate) fn is_smoke(&self, full_name: &str) -> bool {
        self.smoke
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(full_name)
    }

    pub(crate) fn smoke_tests(&self) -> Vec<String> {
        self.smoke
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn push_report(&self, report: CaseReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }

    pub(crate) fn take_reports(&self) -> Vec<CaseReport> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Reason a case is deselected by the smoke or name filter, if any.
    ///
    /// Top-level cases always pass the smoke check: their bodies are where
    /// the smoke subset gets declared.
    pub(crate) fn deselection(&self, full_name: &str, top_level: bool) -> Option<&'static str> {
        if self.smoke_only && !top_level && !self.touches_smoke_case(full_name) {
            return Some(NOT_SMOKE_REASON);
        }

        if let Some(filter) = self.filter.as_deref() {
            if !matches_filter(full_name, filter) {
                return Some(FILTERED_REASON);
            }
        }

        None
    }

    /// A case stays selected when it is smoke-marked, contains a smoke-marked
    /// descendant, or sits below a smoke-marked ancestor.
    fn touches_smoke_case(&self, full_name: &str) -> bool {
        let smoke = self.smoke.lock().unwrap_or_else(PoisonError::into_inner);
        smoke.iter().any(|marked| {
            marked == full_name
                || is_ancestor(full_name, marked)
                || is_ancestor(marked, full_name)
        })
    }
}

fn is_ancestor(ancestor: &str, name: &str) -> bool {
    name.len() > ancestor.len()
        && name.starts_with(ancestor)
        && name.as_bytes()[ancestor.len()] == b'/'
}

/// Matches `/`-separated filter elements against the case path below the
/// suite root, one level each. Levels deeper than the filter always match.
pub(crate) fn matches_filter(full_name: &str, filter: &str) -> bool {
    full_name
        .split('/')
        .skip(1)
        .zip(filter.split('/'))
        .all(|(element, pattern)| element.contains(pattern))
}
