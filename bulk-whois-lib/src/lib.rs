//! # Bulk WHOIS Library
//!
//! Concurrent, rate-limited WHOIS lookups for whole lists of domains.
//!
//! Raw input is normalised into canonical domain names, looked up by a pool of
//! workers that share one global dispatch rate limit, and collected into a
//! [`BatchReport`] that keeps the original input order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulk_whois_lib::{normalize_domains, WhoisChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = WhoisChecker::new();
//!     let normalized = normalize_domains(["https://Example.com/path", "rust-lang.org"])?;
//!
//!     let report = checker.lookup(normalized.targets).await?;
//!     println!(
//!         "{} succeeded, {} without data, {} failed",
//!         report.summary.succeeded, report.summary.no_data, report.summary.failed
//!     );
//!     println!("{}", report.to_csv());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Normalisation**: schemes, paths, ports and case are stripped before lookup
//! - **Global Rate Limit**: dispatch starts are spaced out across all workers
//! - **Ordered Reports**: results come back in input order with exact counters
//! - **Pluggable Resolver**: anything implementing [`WhoisResolver`] can be used
//! - **Export**: CSV and JSON renderings of every report

pub use aggregate::ResultAggregator;
pub use checker::{Progress, WhoisChecker};
pub use config::{
    load_env_config, load_env_config_from, parse_duration, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig,
};
pub use error::WhoisError;
pub use normalize::{normalize_domains, split_domain_text, Normalized, RejectedToken};
pub use protocols::{is_not_found_response, is_rate_limited, parse_whois_response, WhoisResolver};
pub use rate_limit::RateLimiter;
pub use report::{ReportRow, CSV_COLUMNS, LIST_SEPARATOR};
pub use types::{
    BatchReport, DomainTarget, FailureDetail, FailureKind, LookupConfig, LookupOutcome,
    LookupStatus, ReportSummary, WhoisRecord, MAX_RATE_LIMIT_SECS, MAX_WORKERS,
};

#[cfg(feature = "system-whois")]
pub use protocols::SystemWhoisResolver;

// Internal modules - these are not part of the public API
mod aggregate;
mod checker;
mod concurrent;
mod config;
mod error;
mod normalize;
mod protocols;
mod rate_limit;
mod report;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WhoisError>;
