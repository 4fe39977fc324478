//! Main bulk lookup implementation.
//!
//! This module provides the `WhoisChecker` struct that ties the rate limiter,
//! the worker pool and the result aggregator together into one batch run.

use crate::aggregate::ResultAggregator;
use crate::concurrent::{lookup_one, WorkerPool};
use crate::error::WhoisError;
use crate::protocols::WhoisResolver;
use crate::rate_limit::RateLimiter;
use crate::types::{BatchReport, DomainTarget, LookupConfig, LookupOutcome};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Progress notification for one finished lookup.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// The outcome that just arrived
    pub outcome: &'a LookupOutcome,
    /// How many lookups have finished, including this one
    pub completed: usize,
    /// Size of the batch
    pub total: usize,
}

/// Runs rate-limited bulk WHOIS lookups.
///
/// The checker owns one [`RateLimiter`], so every batch (and every single
/// lookup) started from the same checker shares the same dispatch spacing.
///
/// # Example
///
/// ```rust,no_run
/// use bulk_whois_lib::{normalize_domains, LookupConfig, WhoisChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = WhoisChecker::with_config(LookupConfig::default().with_workers(3));
///     let normalized = normalize_domains(["example.com", "rust-lang.org"])?;
///
///     let report = checker.lookup(normalized.targets).await?;
///     for outcome in &report.outcomes {
///         println!("{}: {}", outcome.domain, outcome.status.label());
///     }
///     Ok(())
/// }
/// ```
pub struct WhoisChecker {
    config: LookupConfig,
    resolver: Arc<dyn WhoisResolver>,
    limiter: Arc<RateLimiter>,
}

impl WhoisChecker {
    /// Create a checker with default configuration and the system resolver.
    ///
    /// Default settings:
    /// - Rate limit: 0.5 seconds between dispatches
    /// - Workers: 5
    /// - Timeout: 30 seconds per lookup
    #[cfg(feature = "system-whois")]
    pub fn new() -> Self {
        Self::with_config(LookupConfig::default())
    }

    /// Create a checker with custom configuration and the system resolver.
    #[cfg(feature = "system-whois")]
    pub fn with_config(config: LookupConfig) -> Self {
        Self::with_resolver(config, crate::protocols::SystemWhoisResolver::new())
    }

    /// Create a checker with custom configuration and resolver.
    pub fn with_resolver<R>(config: LookupConfig, resolver: R) -> Self
    where
        R: WhoisResolver + 'static,
    {
        Self::with_shared_resolver(config, Arc::new(resolver))
    }

    /// Create a checker around an already shared resolver.
    pub fn with_shared_resolver(config: LookupConfig, resolver: Arc<dyn WhoisResolver>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self {
            config,
            resolver,
            limiter,
        }
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Look up a single domain, honouring the shared rate limit.
    pub async fn lookup_domain(&self, domain: DomainTarget) -> LookupOutcome {
        self.limiter.acquire().await;
        lookup_one(Arc::clone(&self.resolver), domain, self.config.timeout).await
    }

    /// Look up every target and return the report in input order.
    ///
    /// # Errors
    ///
    /// Only setup problems are returned as errors:
    /// - [`WhoisError::NoValidDomains`] if `targets` is empty
    /// - [`WhoisError::ResolverUnavailable`] if the resolver cannot be used
    ///
    /// Failed lookups are reported inside the [`BatchReport`].
    pub async fn lookup(&self, targets: Vec<DomainTarget>) -> Result<BatchReport, WhoisError> {
        self.lookup_until(targets, std::future::pending()).await
    }

    /// Like [`lookup`](Self::lookup), but stops early when `shutdown` resolves.
    ///
    /// On shutdown the in-flight lookups are abandoned and a partial report
    /// is returned with `complete == false`.
    pub async fn lookup_until<F>(
        &self,
        targets: Vec<DomainTarget>,
        shutdown: F,
    ) -> Result<BatchReport, WhoisError>
    where
        F: Future<Output = ()>,
    {
        self.lookup_with_progress(targets, shutdown, |_| {}).await
    }

    /// Like [`lookup_until`](Self::lookup_until), calling `on_outcome` for
    /// every lookup as it finishes (in completion order).
    pub async fn lookup_with_progress<F, P>(
        &self,
        targets: Vec<DomainTarget>,
        shutdown: F,
        mut on_outcome: P,
    ) -> Result<BatchReport, WhoisError>
    where
        F: Future<Output = ()>,
        P: FnMut(Progress<'_>),
    {
        if targets.is_empty() {
            return Err(WhoisError::NoValidDomains { rejected: 0 });
        }

        self.resolver.ensure_available().await?;

        info!(
            domains = targets.len(),
            workers = self.config.workers,
            rate_limit_ms = self.config.rate_limit.as_millis() as u64,
            "starting WHOIS batch"
        );

        let started = Instant::now();
        let pool = WorkerPool::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.limiter),
            self.config.workers,
            self.config.timeout,
        );
        let (mut workers, mut outcomes) = pool.spawn(&targets);
        let mut aggregator = ResultAggregator::new(targets);
        let total = aggregator.total();
        let mut interrupted = false;

        tokio::pin!(shutdown);

        while !aggregator.is_complete() {
            tokio::select! {
                received = outcomes.recv() => match received {
                    Some((index, outcome)) => {
                        if aggregator.record(index, outcome) {
                            if let Some(outcome) = aggregator.get(index) {
                                on_outcome(Progress {
                                    outcome,
                                    completed: aggregator.received(),
                                    total,
                                });
                            }
                        }
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    interrupted = true;
                    break;
                }
            }
        }

        // Abandons whatever is still in flight
        workers.shutdown().await;

        if interrupted {
            warn!(
                completed = aggregator.received(),
                total,
                "batch interrupted, returning partial report"
            );
        } else if !aggregator.is_complete() {
            error!(
                completed = aggregator.received(),
                total,
                "workers stopped before reporting every domain"
            );
            aggregator.fail_remaining("lookup never completed: worker stopped unexpectedly");
        }

        let report = aggregator.finish(started.elapsed());
        info!(
            succeeded = report.summary.succeeded,
            no_data = report.summary.no_data,
            failed = report.summary.failed,
            elapsed_ms = report.elapsed_ms,
            complete = report.complete,
            "WHOIS batch finished"
        );

        Ok(report)
    }
}

#[cfg(feature = "system-whois")]
impl Default for WhoisChecker {
    fn default() -> Self {
        Self::new()
    }
}
