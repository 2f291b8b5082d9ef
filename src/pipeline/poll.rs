use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Exponential delay between readiness probes.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: u32,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            factor: 2,
            max: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        (current * self.factor).min(self.max)
    }
}

/// Probes until it yields a value or `timeout` elapses.
///
/// `Ok(None)` means "not ready yet"; an `Err` from the probe aborts at once.
/// On expiry the error is `PortalTimeout(what)`. The probe always runs at
/// least once.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    backoff: Backoff,
    mut probe: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    let mut delay = backoff.initial;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            debug!(what, attempts, "Condition met");
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(AppError::PortalTimeout(what.to_string()));
        }
        sleep(delay.min(deadline - now)).await;
        delay = backoff.next(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> Backoff {
        Backoff {
            initial: Duration::from_millis(1),
            factor: 2,
            max: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let b = Backoff::default();
        assert_eq!(b.next(Duration::from_millis(250)), Duration::from_millis(500));
        assert_eq!(b.next(Duration::from_secs(4)), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn returns_once_condition_holds() {
        let calls = AtomicU32::new(0);
        let value = poll_until("third call", Duration::from_secs(2), fast(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok((n >= 3).then_some(n)) }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn times_out_with_condition_name() {
        let result: AppResult<()> =
            poll_until("notice", Duration::from_millis(20), fast(), || async { Ok(None) }).await;
        match result {
            Err(AppError::PortalTimeout(what)) => assert_eq!(what, "notice"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_errors_abort_immediately() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = poll_until("x", Duration::from_secs(2), fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::Internal("boom".into())) }
        })
        .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_timeout_still_probes_once() {
        let value = poll_until("ready", Duration::ZERO, fast(), || async { Ok(Some(7)) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
