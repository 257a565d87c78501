use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::debug;

#[derive(Clone, Debug, Error)]
pub enum WaitError {
    #[error("timed out after {bound:?} waiting for {what}")]
    Timeout { what: String, bound: Duration },
}

/// Polls `probe` every `interval` until it yields a value or `bound` elapses.
///
/// The first probe runs immediately. A probe that is still in flight when the
/// bound elapses is dropped.
pub async fn wait_until<T, F, Fut>(
    what: impl Into<String>,
    bound: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let what = what.into();
    debug!(
        what = %what,
        bound_secs = bound.as_secs_f32(),
        poll_ms = interval.as_millis(),
        "waiting"
    );

    let label = what.clone();
    let poll = async move {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            if let Some(value) = probe().await {
                debug!(what = %label, attempts, "wait satisfied");
                return value;
            }
            sleep(interval).await;
        }
    };

    timeout(bound, poll)
        .await
        .map_err(|_| WaitError::Timeout { what, bound })
}
