//! Cached liveness gate for self-hosted backends.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// How long a probe result is trusted before the backend is probed again.
pub const HEALTH_CACHE_TTL: Duration = Duration::from_secs(60);

/// Outcome of the most recent probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    /// Whether the probe succeeded
    pub healthy: bool,
    /// When the probe ran
    pub checked_at: Instant,
}

/// Gates calls to a backend behind a probe whose result is cached for a TTL.
///
/// The cache lock is held for the duration of a probe, so concurrent callers
/// that find the cache stale wait for one probe instead of each sending their own.
#[derive(Debug)]
pub struct HealthGate {
    /// Probe path; `None` means the backend is always considered healthy
    path: Option<String>,
    /// Cache lifetime
    ttl: Duration,
    /// Last probe outcome
    status: Mutex<Option<HealthStatus>>,
}

impl HealthGate {
    /// Creates a gate for the given health-check path.
    pub fn new(path: Option<String>) -> Self {
        Self {
            path,
            ttl: HEALTH_CACHE_TTL,
            status: Mutex::new(None),
        }
    }

    /// Overrides the cache lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The configured probe path.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns whether the backend is healthy, probing only when the cache is stale.
    ///
    /// `probe` receives the configured path and resolves to the probe outcome.
    pub async fn check<F, Fut>(&self, probe: F) -> bool
    where
        F: FnOnce(String) -> Fut + Send,
        Fut: Future<Output = bool> + Send,
    {
        let Some(path) = &self.path else {
            return true;
        };

        let mut status = self.status.lock().await;
        if let Some(cached) = *status
            && cached.checked_at.elapsed() < self.ttl
        {
            tracing::debug!(path = %path, healthy = cached.healthy, "Health cache hit");
            return cached.healthy;
        }

        let healthy = probe(path.clone()).await;
        *status = Some(HealthStatus {
            healthy,
            checked_at: Instant::now(),
        });
        drop(status);

        if healthy {
            tracing::debug!(path = %path, "Health probe succeeded");
        } else {
            tracing::warn!(path = %path, "Health probe failed");
        }
        healthy
    }

    /// The cached status, if a probe has run.
    pub async fn last_status(&self) -> Option<HealthStatus> {
        *self.status.lock().await
    }

    /// Forgets the cached status so the next check probes again.
    pub async fn invalidate(&self) {
        *self.status.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{Ready, ready};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{advance, sleep};

    fn counting_probe(
        counter: &Arc<AtomicUsize>,
        outcome: bool,
    ) -> impl FnOnce(String) -> Ready<bool> + Send + use<> {
        let counter = Arc::clone(counter);
        move |_path| {
            counter.fetch_add(1, Ordering::SeqCst);
            ready(outcome)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_once_within_ttl() {
        let gate = HealthGate::new(Some("/health".to_owned()));
        let probes = Arc::new(AtomicUsize::new(0));

        assert!(gate.check(counting_probe(&probes, true)).await);
        advance(Duration::from_secs(30)).await;
        assert!(gate.check(counting_probe(&probes, false)).await);
        assert_eq!(probes.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(31)).await;
        assert!(!gate.check(counting_probe(&probes, false)).await);
        assert_eq!(probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_result_is_cached_too() {
        let gate = HealthGate::new(Some("/health".to_owned()));
        let probes = Arc::new(AtomicUsize::new(0));

        assert!(!gate.check(counting_probe(&probes, false)).await);
        assert!(!gate.check(counting_probe(&probes, true)).await);
        assert_eq!(probes.load(Ordering::SeqCst), 1);

        gate.invalidate().await;
        assert!(gate.check(counting_probe(&probes, true)).await);
        assert_eq!(probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_path_never_probes() {
        let gate = HealthGate::new(None);
        let probes = Arc::new(AtomicUsize::new(0));

        assert!(gate.check(counting_probe(&probes, false)).await);
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert!(gate.last_status().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_probe() {
        let gate = Arc::new(HealthGate::new(Some("/health".to_owned())));
        let probes = Arc::new(AtomicUsize::new(0));

        let slow_probe = |counter: Arc<AtomicUsize>| {
            move |_path: String| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(100)).await;
                true
            }
        };

        let first = tokio::spawn({
            let gate = Arc::clone(&gate);
            let probe = slow_probe(Arc::clone(&probes));
            async move { gate.check(probe).await }
        });
        let second = tokio::spawn({
            let gate = Arc::clone(&gate);
            let probe = slow_probe(Arc::clone(&probes));
            async move { gate.check(probe).await }
        });

        assert!(matches!(first.await, Ok(true)));
        assert!(matches!(second.await, Ok(true)));
        assert_eq!(probes.load(Ordering::SeqCst), 1);
    }
}
