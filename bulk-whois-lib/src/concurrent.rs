//! Concurrent lookup execution.
//!
//! A fixed number of worker tasks pull domains from one shared queue. Every
//! lookup passes through the shared [`RateLimiter`] before it is dispatched,
//! and every lookup ends in exactly one [`LookupOutcome`] sent back over a
//! channel, whatever the resolver did.

use crate::protocols::WhoisResolver;
use crate::rate_limit::RateLimiter;
use crate::types::{DomainTarget, FailureDetail, FailureKind, LookupOutcome, LookupStatus, WhoisRecord};
use crate::WhoisError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::Instant;
use tracing::{info, warn};

/// An outcome tagged with the input position of its domain.
pub(crate) type IndexedOutcome = (usize, LookupOutcome);

/// Shared queue of `(input index, target)` pairs.
type WorkQueue = Arc<Mutex<VecDeque<(usize, DomainTarget)>>>;

/// Manages the worker tasks for one batch.
pub(crate) struct WorkerPool {
    resolver: Arc<dyn WhoisResolver>,
    limiter: Arc<RateLimiter>,
    workers: usize,
    timeout: Duration,
}

impl WorkerPool {
    pub(crate) fn new(
        resolver: Arc<dyn WhoisResolver>,
        limiter: Arc<RateLimiter>,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            limiter,
            workers: workers.max(1),
            timeout,
        }
    }

    /// Start workers for the given targets.
    ///
    /// Outcomes arrive on the returned receiver in completion order. The
    /// channel closes once every worker has drained the queue. Dropping or
    /// shutting down the returned `JoinSet` abandons in-flight lookups.
    pub(crate) fn spawn(
        &self,
        targets: &[DomainTarget],
    ) -> (JoinSet<()>, mpsc::UnboundedReceiver<IndexedOutcome>) {
        let queue: WorkQueue = Arc::new(Mutex::new(
            targets.iter().cloned().enumerate().collect(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut set = JoinSet::new();

        // No point in idle workers for small batches
        let worker_count = self.workers.min(targets.len()).max(1);

        for worker_id in 0..worker_count {
            set.spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                tx.clone(),
                Arc::clone(&self.resolver),
                Arc::clone(&self.limiter),
                self.timeout,
            ));
        }

        (set, rx)
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: WorkQueue,
    tx: mpsc::UnboundedSender<IndexedOutcome>,
    resolver: Arc<dyn WhoisResolver>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
) {
    while let Some((index, domain)) = next_target(&queue) {
        limiter.acquire().await;
        info!(worker = worker_id, domain = %domain, "looking up");

        let outcome = lookup_one(Arc::clone(&resolver), domain, timeout).await;

        if tx.send((index, outcome)).is_err() {
            // Receiver is gone, nobody wants the remaining results
            break;
        }
    }
}

fn next_target(queue: &WorkQueue) -> Option<(usize, DomainTarget)> {
    match queue.lock() {
        Ok(mut queue) => queue.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Resolve one domain and classify the result.
///
/// The resolver runs in its own task: a panic becomes a failed outcome, and
/// a timeout (or the caller being dropped) aborts the resolver call.
pub(crate) async fn lookup_one(
    resolver: Arc<dyn WhoisResolver>,
    domain: DomainTarget,
    timeout: Duration,
) -> LookupOutcome {
    let started = Instant::now();
    let name = domain.as_str().to_string();

    let handle = tokio::spawn(async move { resolver.resolve(&name).await });
    let _guard = AbortOnDrop(handle.abort_handle());

    let status = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => classify(result),
        Ok(Err(join_error)) => {
            let message = if join_error.is_panic() {
                "resolver panicked during lookup"
            } else {
                "lookup task was cancelled"
            };
            LookupStatus::Failed(FailureDetail::new(FailureKind::ResolutionError, message))
        }
        Err(_) => LookupStatus::Failed(FailureDetail::new(
            FailureKind::Timeout,
            WhoisError::timeout("WHOIS lookup", timeout).to_string(),
        )),
    };

    match &status {
        LookupStatus::Failed(detail) => {
            warn!(domain = %domain, kind = %detail.kind, error = %detail.message, "lookup failed")
        }
        LookupStatus::NoData => info!(domain = %domain, "no WHOIS data"),
        LookupStatus::Success(record) => info!(
            domain = %domain,
            registrar = record.registrar.as_deref().unwrap_or("unknown registrar"),
            "lookup succeeded"
        ),
    }

    LookupOutcome::new(domain, status, started.elapsed())
}

/// Map a resolver result onto an outcome status.
pub(crate) fn classify(result: Result<Option<WhoisRecord>, WhoisError>) -> LookupStatus {
    match result {
        Ok(Some(record)) if !record.is_empty() => LookupStatus::Success(record),
        Ok(_) => LookupStatus::NoData,
        Err(e) => LookupStatus::Failed(FailureDetail::new(e.failure_kind(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedResolver(Result<Option<WhoisRecord>, WhoisError>);

    #[async_trait]
    impl WhoisResolver for FixedResolver {
        async fn resolve(&self, _domain: &str) -> Result<Option<WhoisRecord>, WhoisError> {
            self.0.clone()
        }
    }

    struct SlowResolver;

    #[async_trait]
    impl WhoisResolver for SlowResolver {
        async fn resolve(&self, _domain: &str) -> Result<Option<WhoisRecord>, WhoisError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    struct PanickingResolver;

    #[async_trait]
    impl WhoisResolver for PanickingResolver {
        async fn resolve(&self, domain: &str) -> Result<Option<WhoisRecord>, WhoisError> {
            panic!("resolver exploded on {}", domain);
        }
    }

    fn target(domain: &str) -> DomainTarget {
        DomainTarget::new_unchecked(domain.to_string())
    }

    #[test]
    fn test_classify() {
        let record = WhoisRecord {
            registrar: Some("Registrar".to_string()),
            ..Default::default()
        };
        assert!(classify(Ok(Some(record))).is_success());
        assert!(classify(Ok(Some(WhoisRecord::default()))).is_no_data());
        assert!(classify(Ok(None)).is_no_data());

        match classify(Err(WhoisError::not_found("x.com"))) {
            LookupStatus::Failed(detail) => assert_eq!(detail.kind, FailureKind::NotFound),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_timeout() {
        let outcome = lookup_one(
            Arc::new(SlowResolver),
            target("slow.com"),
            Duration::from_secs(2),
        )
        .await;

        let detail = outcome.failure().expect("timed out lookup should fail");
        assert_eq!(detail.kind, FailureKind::Timeout);
        assert_eq!(outcome.domain.as_str(), "slow.com");
    }

    #[tokio::test]
    async fn test_resolver_panic_is_contained() {
        let outcome = lookup_one(
            Arc::new(PanickingResolver),
            target("boom.com"),
            Duration::from_secs(5),
        )
        .await;

        let detail = outcome.failure().expect("panicking lookup should fail");
        assert_eq!(detail.kind, FailureKind::ResolutionError);
        assert!(detail.message.contains("panicked"));
    }

    #[tokio::test]
    async fn test_pool_emits_one_outcome_per_target() {
        let pool = WorkerPool::new(
            Arc::new(FixedResolver(Ok(None))),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            3,
            Duration::from_secs(5),
        );
        let targets: Vec<_> = ["a.com", "b.com", "c.com", "d.com", "e.com"]
            .iter()
            .map(|d| target(d))
            .collect();

        let (mut set, mut rx) = pool.spawn(&targets);
        let mut indices = Vec::new();
        while let Some((index, outcome)) = rx.recv().await {
            assert_eq!(outcome.domain, targets[index]);
            indices.push(index);
        }
        while set.join_next().await.is_some() {}

        indices.sort();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_worker_count_at_least_one() {
        let pool = WorkerPool::new(
            Arc::new(FixedResolver(Ok(None))),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            0,
            Duration::from_secs(1),
        );
        assert_eq!(pool.workers, 1);
    }
}
