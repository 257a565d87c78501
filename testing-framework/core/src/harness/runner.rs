use std::{any::Any, future::Future, panic::AssertUnwindSafe, time::Duration};

use futures::{FutureExt as _, future::BoxFuture};
use tokio::{
    task::{JoinHandle, JoinSet},
    time::timeout,
};
use tracing::{debug, warn};

use super::{
    SystemTest,
    case::{CaseOutcome, CaseResult, CaseState, Failure, Halt, HaltReason},
};

pub(crate) type CaseBody = Box<dyn FnOnce(SystemTest) -> BoxFuture<'static, CaseResult> + Send>;

type BodyOutcome = Result<CaseResult, Box<dyn Any + Send>>;

/// A parallel case waiting for its parent body to return.
pub(crate) struct PendingCase {
    pub(crate) case: SystemTest,
    pub(crate) body: CaseBody,
}

pub(crate) fn boxed_body<F, Fut>(body: F) -> CaseBody
where
    F: FnOnce(SystemTest) -> Fut + Send + 'static,
    Fut: Future<Output = CaseResult> + Send + 'static,
{
    Box::new(move |t| body(t).boxed())
}

/// Runs one case to a terminal state: selection, body, parallel children,
/// then the final report.
pub(crate) fn execute(case: SystemTest, body: CaseBody) -> BoxFuture<'static, CaseOutcome> {
    async move {
        let inner = &case.inner;
        if inner.depth > 0 {
            if let Some(reason) = inner.suite.deselection(&inner.name, inner.depth == 1) {
                inner.record_skip(reason.to_owned());
                return inner.finish();
            }
        }

        inner.start();
        match inner.timeout {
            Some(limit) => drive_with_timeout(case.clone(), body, limit).await,
            None => drive(case.clone(), body).await,
        }
    }
    .boxed()
}

/// Drives the body on its own task and stops waiting once `limit` elapses.
/// The task is aborted at its next await point and every descendant is
/// finalized before this returns; remote side effects already in flight are
/// not rolled back.
async fn drive_with_timeout(case: SystemTest, body: CaseBody, limit: Duration) -> CaseOutcome {
    let mut task = AbortOnDrop(tokio::spawn(drive(case.clone(), body)));

    match timeout(limit, &mut task.0).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => {
            case.inner.record_failure(Failure::unlocated(format!(
                "case task failed: {join_err}"
            )));
            case.inner.finish()
        }
        Err(_) => {
            warn!(case = %case.inner.name, ?limit, "case exceeded its timeout");
            case.inner.record_timeout(limit);
            let outcome = case.inner.finish();
            task.0.abort();
            let _ = (&mut task.0).await;
            // Cases on tasks the body spawned may still be unwinding.
            case.inner.abandon_descendants();
            outcome
        }
    }
}

async fn drive(case: SystemTest, body: CaseBody) -> CaseOutcome {
    let guard = AbandonGuard { case: case.clone() };

    let handle = case.clone();
    let result: BodyOutcome = AssertUnwindSafe(async move { body(handle).await })
        .catch_unwind()
        .await;
    absorb(&case, result);

    run_parallel_children(&case).await;

    let outcome = case.inner.finish();
    drop(guard);
    outcome
}

fn absorb(case: &SystemTest, result: BodyOutcome) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(Halt(HaltReason::Fatal(failure)))) => case.inner.record_failure(failure),
        Ok(Err(Halt(HaltReason::Skip(reason)))) => case.inner.record_skip(reason),
        Err(panic) => case.inner.record_panic(panic_message(panic)),
    }
}

/// Starts every queued parallel child at once and waits for all of them.
async fn run_parallel_children(case: &SystemTest) {
    let pending = case.inner.take_pending();
    if pending.is_empty() {
        return;
    }

    debug!(
        case = %case.inner.name,
        children = pending.len(),
        "starting parallel cases"
    );

    let mut children = JoinSet::new();
    for PendingCase { case, body } in pending {
        children.spawn(execute(case, body));
    }

    while let Some(result) = children.join_next().await {
        if let Err(join_err) = result {
            warn!(case = %case.inner.name, %join_err, "parallel case task failed");
        }
    }
}

/// Cancels a bounded case task when the case awaiting it is itself
/// abandoned, so nested timeouts unwind together.
struct AbortOnDrop(JoinHandle<CaseOutcome>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Finalizes a case whose future was dropped before it finished, which only
/// happens when an enclosing case timed out and its task was aborted.
struct AbandonGuard {
    case: SystemTest,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        let inner = &self.case.inner;
        if matches!(inner.state(), CaseState::Finished(_)) {
            return;
        }
        inner.abandon_descendants();
        inner.record_abort();
        inner.finish();
    }
}

/// Attempts to turn a panic payload into a readable string for diagnostics.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic.downcast::<String>().map_or_else(
        |panic| {
            panic.downcast::<&'static str>().map_or_else(
                |_| "unknown panic".to_owned(),
                |message| (*message).to_owned(),
            )
        },
        |message| *message,
    )
}
