//! Poll-with-deadline primitive.
//!
//! The probe runs on its own task and reports through a single-use channel;
//! the caller races that channel against the deadline. On timeout the caller
//! simply stops listening, and the poller notices the closed channel at its
//! next tick and exits.

use devstart_shared::errors::DevstartError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("deadline of {0:?} elapsed")]
    TimedOut(Duration),

    #[error(transparent)]
    Probe(#[from] DevstartError),
}

/// Poll `probe` every `interval` until it yields `true`, fails, or `deadline`
/// elapses.
///
/// The first probe runs immediately.
pub async fn wait_until<F, Fut>(
    mut probe: F,
    interval: Duration,
    deadline: Duration,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, DevstartError>> + Send + 'static,
{
    let (mut tx, rx) = oneshot::channel::<Result<(), DevstartError>>();

    tokio::spawn(async move {
        loop {
            match probe().await {
                Ok(true) => {
                    let _ = tx.send(Ok(()));
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tx.closed() => {
                    tracing::trace!("Waiter gone, stopping poller");
                    return;
                }
            }
        }
    });

    match tokio::time::timeout(deadline, rx).await {
        Ok(Ok(result)) => result.map_err(WaitError::Probe),
        Ok(Err(_)) => Err(WaitError::Probe(DevstartError::Internal(
            "poller exited without reporting".into(),
        ))),
        Err(_) => Err(WaitError::TimedOut(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_probe(
        ready_after: usize,
    ) -> (
        Arc<AtomicUsize>,
        impl FnMut() -> std::future::Ready<Result<bool, DevstartError>> + Send + 'static,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let probe = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(Ok(n >= ready_after))
        };
        (calls, probe)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately() {
        let (calls, probe) = counting_probe(1);

        wait_until(probe, Duration::from_secs(3), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_several_polls() {
        let (calls, probe) = counting_probe(4);
        let started = tokio::time::Instant::now();

        wait_until(probe, Duration::from_secs(3), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(9) && elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline() {
        let (calls, probe) = counting_probe(usize::MAX);
        let started = tokio::time::Instant::now();

        let err = wait_until(probe, Duration::from_secs(3), Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::TimedOut(d) if d == Duration::from_secs(60)));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(calls.load(Ordering::SeqCst) >= 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_is_reported() {
        let probe = || std::future::ready(Err(DevstartError::Network("ipconfig failed".into())));

        let err = wait_until(probe, Duration::from_secs(3), Duration::from_secs(60))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "ipconfig failed");
    }
}
