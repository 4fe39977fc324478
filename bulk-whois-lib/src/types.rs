//! Core data types for bulk WHOIS lookups.
//!
//! This module defines the lookup targets, the per-domain outcomes, the
//! batch report handed to presentation code, and the lookup configuration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Most workers a batch may use.
pub const MAX_WORKERS: usize = 100;

/// Longest accepted spacing between two lookup starts, in seconds.
pub const MAX_RATE_LIMIT_SECS: f64 = 3600.0;

/// A validated, lowercase domain ready to be looked up.
///
/// Only the normalizer creates these, so every value is non-empty, free of
/// whitespace, and unique within the batch it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DomainTarget(String);

impl DomainTarget {
    pub(crate) fn new_unchecked(domain: String) -> Self {
        Self(domain)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainTarget {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registration data for a domain.
///
/// Every field is optional because registries publish very different
/// subsets of data. A missing field is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WhoisRecord {
    /// The registrar that manages this domain
    pub registrar: Option<String>,

    /// When the domain was first registered
    pub creation_date: Option<String>,

    /// When the domain registration expires
    pub expiration_date: Option<String>,

    /// Last update date of the domain record
    pub updated_date: Option<String>,

    /// Nameservers in the order the registry reported them
    pub name_servers: Vec<String>,

    /// Domain status codes (e.g., "clientTransferProhibited"), unique
    ///
    /// Serialised as `status_codes` because outcomes flatten the record next
    /// to the `status` tag of [`LookupStatus`].
    #[serde(rename = "status_codes")]
    pub status: Vec<String>,

    pub registrant_name: Option<String>,
    pub registrant_organization: Option<String>,
    pub registrant_country: Option<String>,
    pub admin_email: Option<String>,
    pub tech_email: Option<String>,
}

impl WhoisRecord {
    /// True when the resolver reported nothing at all.
    pub fn is_empty(&self) -> bool {
        self.registrar.is_none()
            && self.creation_date.is_none()
            && self.expiration_date.is_none()
            && self.updated_date.is_none()
            && self.name_servers.is_empty()
            && self.status.is_empty()
            && self.registrant_name.is_none()
            && self.registrant_organization.is_none()
            && self.registrant_country.is_none()
            && self.admin_email.is_none()
            && self.tech_email.is_none()
    }

    /// Add a status code unless it is already present.
    pub fn add_status<S: Into<String>>(&mut self, status: S) {
        let status = status.into();
        if !self.status.iter().any(|s| s.eq_ignore_ascii_case(&status)) {
            self.status.push(status);
        }
    }

    /// Append a name server. Duplicates are kept as reported.
    pub fn add_name_server<S: Into<String>>(&mut self, server: S) {
        self.name_servers.push(server.into());
    }
}

/// Why a single lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The lookup did not finish within the configured timeout
    Timeout,
    /// Connection errors, malformed responses, refused queries
    ResolutionError,
    /// The registry has no record for the domain
    NotFound,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "Timeout"),
            FailureKind::ResolutionError => write!(f, "Resolution error"),
            FailureKind::NotFound => write!(f, "Not found"),
        }
    }
}

/// Error details attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureDetail {
    pub fn new<M: Into<String>>(kind: FailureKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The classified result of one lookup. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupStatus {
    /// The resolver returned a record with at least one populated field
    Success(WhoisRecord),

    /// The resolver answered but had nothing to report
    NoData,

    /// The lookup failed
    Failed(FailureDetail),
}

impl LookupStatus {
    /// Short human label used by tables and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            LookupStatus::Success(_) => "Success",
            LookupStatus::NoData => "No Data",
            LookupStatus::Failed(_) => "Error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LookupStatus::Success(_))
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, LookupStatus::NoData)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LookupStatus::Failed(_))
    }
}

/// Result of resolving a single domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupOutcome {
    /// The domain that was looked up
    pub domain: DomainTarget,

    #[serde(flatten)]
    pub status: LookupStatus,

    /// When the lookup finished
    pub completed_at: DateTime<Utc>,

    /// How long the resolver call took, in milliseconds
    pub duration_ms: u64,
}

impl LookupOutcome {
    /// Build an outcome stamped with the current time.
    pub fn new(domain: DomainTarget, status: LookupStatus, duration: Duration) -> Self {
        Self {
            domain,
            status,
            completed_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// The record, if the lookup succeeded.
    pub fn record(&self) -> Option<&WhoisRecord> {
        match &self.status {
            LookupStatus::Success(record) => Some(record),
            _ => None,
        }
    }

    /// The failure, if the lookup failed.
    pub fn failure(&self) -> Option<&FailureDetail> {
        match &self.status {
            LookupStatus::Failed(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Per-status counters for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl ReportSummary {
    /// Count the outcomes by status.
    pub fn from_outcomes(outcomes: &[LookupOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                summary.add(&outcome.status);
                summary
            })
    }

    fn add(&mut self, status: &LookupStatus) {
        self.total += 1;
        match status {
            LookupStatus::Success(_) => self.succeeded += 1,
            LookupStatus::NoData => self.no_data += 1,
            LookupStatus::Failed(_) => self.failed += 1,
        }
    }
}

/// Final result of a batch, in the order the domains were submitted.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: ReportSummary,

    /// Whether every submitted domain produced an outcome
    pub complete: bool,

    /// Wall-clock time for the whole batch, in milliseconds
    pub elapsed_ms: u64,

    pub outcomes: Vec<LookupOutcome>,

    /// Domains that never produced an outcome (only for interrupted runs)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unfinished: Vec<DomainTarget>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Configuration for a bulk lookup run.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupConfig {
    /// Minimum spacing between the start of two lookups, across all workers
    /// Default: 500ms
    pub rate_limit: Duration,

    /// Number of concurrent workers
    /// Default: 5, Range: 1-100
    pub workers: usize,

    /// Timeout for each individual lookup
    /// Default: 30 seconds
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_millis(500),
            workers: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

impl LookupConfig {
    /// Set the worker count, clamped to 1-100.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    /// Set the minimum spacing between dispatches.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the minimum spacing between dispatches from fractional seconds.
    ///
    /// Zero, negative, NaN and infinite values are rejected, as is anything
    /// above [`MAX_RATE_LIMIT_SECS`].
    pub fn with_rate_limit_secs(self, secs: f64) -> Result<Self, crate::WhoisError> {
        let rate_limit = parse_rate_limit_secs(secs)?;
        Ok(self.with_rate_limit(rate_limit))
    }

    /// Set the per-lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Convert a rate limit given in seconds into a `Duration`.
pub(crate) fn parse_rate_limit_secs(secs: f64) -> Result<Duration, crate::WhoisError> {
    if !secs.is_finite() || secs <= 0.0 || secs > MAX_RATE_LIMIT_SECS {
        return Err(crate::WhoisError::config(format!(
            "Rate limit must be between 0 and {} seconds, got {}",
            MAX_RATE_LIMIT_SECS, secs
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| {
        crate::WhoisError::config(format!("Invalid rate limit {}: {}", secs, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(domain: &str) -> DomainTarget {
        DomainTarget::new_unchecked(domain.to_string())
    }

    #[test]
    fn test_empty_record() {
        let mut record = WhoisRecord::default();
        assert!(record.is_empty());

        record.admin_email = Some("admin@example.com".to_string());
        assert!(!record.is_empty());
    }

    #[test]
    fn test_status_codes_are_unique() {
        let mut record = WhoisRecord::default();
        record.add_status("clientTransferProhibited");
        record.add_status("serverDeleteProhibited");
        record.add_status("clienttransferprohibited");

        assert_eq!(
            record.status,
            vec!["clientTransferProhibited", "serverDeleteProhibited"]
        );
    }

    #[test]
    fn test_name_servers_keep_duplicates() {
        let mut record = WhoisRecord::default();
        record.add_name_server("ns1.example.com");
        record.add_name_server("ns2.example.com");
        record.add_name_server("ns1.example.com");

        assert_eq!(record.name_servers.len(), 3);
        assert_eq!(record.name_servers[0], "ns1.example.com");
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            LookupOutcome::new(
                target("a.com"),
                LookupStatus::Success(WhoisRecord {
                    registrar: Some("Registrar".to_string()),
                    ..Default::default()
                }),
                Duration::from_millis(10),
            ),
            LookupOutcome::new(target("b.com"), LookupStatus::NoData, Duration::ZERO),
            LookupOutcome::new(
                target("c.com"),
                LookupStatus::Failed(FailureDetail::new(FailureKind::Timeout, "timed out")),
                Duration::ZERO,
            ),
            LookupOutcome::new(target("d.com"), LookupStatus::NoData, Duration::ZERO),
        ];

        let summary = ReportSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.no_data, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.succeeded + summary.no_data + summary.failed,
            summary.total
        );
    }

    #[test]
    fn test_success_json_keeps_tag_and_status_codes() {
        let record = WhoisRecord {
            registrar: Some("Example Registrar".to_string()),
            status: vec!["ok".to_string(), "clientHold".to_string()],
            ..Default::default()
        };
        let outcome = LookupOutcome::new(
            target("example.com"),
            LookupStatus::Success(record),
            Duration::from_millis(5),
        );

        let text = serde_json::to_string(&outcome).unwrap();
        assert_eq!(text.matches("\"status\":").count(), 1);

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["status_codes"][0], "ok");
        assert_eq!(json["status_codes"][1], "clientHold");
        assert_eq!(json["registrar"], "Example Registrar");
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = LookupOutcome::new(
            target("example.com"),
            LookupStatus::Failed(FailureDetail::new(FailureKind::NotFound, "no match")),
            Duration::from_millis(42),
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["domain"], "example.com");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["message"], "no match");
        assert_eq!(json["duration_ms"], 42);
    }

    #[test]
    fn test_config_defaults_and_builders() {
        let config = LookupConfig::default();
        assert_eq!(config.rate_limit, Duration::from_millis(500));
        assert_eq!(config.workers, 5);

        let config = config.with_workers(0);
        assert_eq!(config.workers, 1);

        let config = config.with_workers(500);
        assert_eq!(config.workers, MAX_WORKERS);

        let config = config.with_rate_limit_secs(1.5).unwrap();
        assert_eq!(config.rate_limit, Duration::from_millis(1500));

        assert!(LookupConfig::default().with_rate_limit_secs(0.0).is_err());
        assert!(LookupConfig::default().with_rate_limit_secs(-1.0).is_err());
        assert!(LookupConfig::default().with_rate_limit_secs(f64::NAN).is_err());
    }

    #[test]
    fn test_oversized_rate_limit_is_rejected() {
        for secs in [1e20, f64::MAX, MAX_RATE_LIMIT_SECS + 1.0] {
            let err = LookupConfig::default().with_rate_limit_secs(secs).unwrap_err();
            assert!(err.to_string().contains("Rate limit"));
        }

        let config = LookupConfig::default()
            .with_rate_limit_secs(MAX_RATE_LIMIT_SECS)
            .unwrap();
        assert_eq!(config.rate_limit, Duration::from_secs(3600));
    }
}
